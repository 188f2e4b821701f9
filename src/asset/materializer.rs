// Location: src/asset/materializer.rs

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use sha2::{Digest, Sha256};
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::{debug, info, warn};

use crate::error::{Result, SessionError};

use super::{AssetStore, ModelAsset, RefreshPolicy};

const HASH_BUFFER_SIZE: usize = 1024 * 1024;

/// Copies packaged model assets into a writable runtime directory.
pub struct AssetMaterializer {
    store: Arc<dyn AssetStore>,
    runtime_dir: PathBuf,
    refresh: RefreshPolicy,
}

impl AssetMaterializer {
    pub fn new(store: Arc<dyn AssetStore>, runtime_dir: impl Into<PathBuf>) -> Self {
        Self {
            store,
            runtime_dir: runtime_dir.into(),
            refresh: RefreshPolicy::IfAbsent,
        }
    }

    pub fn with_refresh(mut self, refresh: RefreshPolicy) -> Self {
        self.refresh = refresh;
        self
    }

    pub fn runtime_dir(&self) -> &Path {
        &self.runtime_dir
    }

    /// Where the writable copy of `asset` lives. Pure path computation.
    pub fn destination(&self, asset: &ModelAsset) -> PathBuf {
        self.runtime_dir.join(asset.file_name())
    }

    /// Ensure a writable copy of `asset` exists and return its path.
    ///
    /// Once the destination exists (and, under `IfChanged`, matches the
    /// source) this performs no writes.
    pub async fn materialize(&self, asset: &ModelAsset) -> Result<PathBuf> {
        let source = self.store.locate(asset).ok_or_else(|| SessionError::AssetNotFound {
            file_name: asset.source_file_name(),
            store: self.store.describe(),
        })?;

        self.ensure_runtime_dir().await?;

        let destination = self.destination(asset);
        let exists = fs::try_exists(&destination)
            .await
            .map_err(|e| SessionError::asset_io(&destination, "Failed to inspect destination", e))?;

        if !exists {
            copy_with_retry(&source, &destination).await?;
            info!(asset = %asset, path = %destination.display(), "Materialized model asset");
            return Ok(destination);
        }

        match self.refresh {
            RefreshPolicy::IfAbsent => {
                debug!(asset = %asset, "Materialized copy present, skipping copy");
            }
            RefreshPolicy::IfChanged => {
                if same_content(&source, &destination).await? {
                    debug!(asset = %asset, "Materialized copy up to date");
                } else {
                    info!(asset = %asset, "Materialized copy is stale, replacing");
                    copy_with_retry(&source, &destination).await?;
                }
            }
        }

        Ok(destination)
    }

    async fn ensure_runtime_dir(&self) -> Result<()> {
        match fs::create_dir_all(&self.runtime_dir).await {
            Ok(()) => Ok(()),
            // Another initializer won the race
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists && self.runtime_dir.is_dir() => Ok(()),
            Err(e) => Err(SessionError::asset_io(
                &self.runtime_dir,
                "Failed to create runtime directory",
                e,
            )),
        }
    }
}

/// Copy `source` onto `destination` through a sibling `.partial` file.
///
/// The destination only ever appears complete: the bytes land in the partial
/// file and are renamed into place after `sync_all`. A partial file left by
/// an interrupted copy is removed and the copy retried exactly once.
pub(crate) async fn copy_with_retry(source: &Path, destination: &Path) -> Result<u64> {
    let partial = partial_path(destination);
    let bytes = match copy_new(source, &partial).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
            warn!(path = %partial.display(), "Stale partial copy found, retrying once");
            remove_if_present(&partial).await?;
            copy_new(source, &partial)
                .await
                .map_err(|e| SessionError::asset_io(&partial, "Retried copy failed", e))?
        }
        Err(e) => return Err(SessionError::asset_io(&partial, "Failed to copy asset", e)),
    };

    if let Err(e) = fs::rename(&partial, destination).await {
        let _ = fs::remove_file(&partial).await;
        return Err(SessionError::asset_io(destination, "Failed to move copy into place", e));
    }
    Ok(bytes)
}

/// `<dir>/<file>.partial` next to the destination.
pub(crate) fn partial_path(destination: &Path) -> PathBuf {
    let mut name = destination.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".partial");
    destination.with_file_name(name)
}

/// Create-new copy. A partially written file is removed on failure.
async fn copy_new(source: &Path, destination: &Path) -> io::Result<u64> {
    let mut reader = fs::File::open(source).await?;
    let mut writer = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(destination)
        .await?;

    let copied = async {
        let bytes = tokio::io::copy(&mut reader, &mut writer).await?;
        writer.flush().await?;
        writer.sync_all().await?;
        Ok::<_, io::Error>(bytes)
    }
    .await;

    if copied.is_err() {
        drop(writer);
        let _ = fs::remove_file(destination).await;
    }
    copied
}

async fn remove_if_present(path: &Path) -> Result<()> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(SessionError::asset_io(path, "Failed to remove stale file", e)),
    }
}

async fn same_content(source: &Path, destination: &Path) -> Result<bool> {
    let source_len = fs::metadata(source)
        .await
        .map_err(|e| SessionError::asset_io(source, "Failed to stat source", e))?
        .len();
    let destination_len = fs::metadata(destination)
        .await
        .map_err(|e| SessionError::asset_io(destination, "Failed to stat destination", e))?
        .len();
    if source_len != destination_len {
        return Ok(false);
    }

    Ok(file_sha256(source).await? == file_sha256(destination).await?)
}

/// Hex encoded SHA-256 of a file.
pub async fn file_sha256(path: impl AsRef<Path>) -> Result<String> {
    let path = path.as_ref();
    let mut file = fs::File::open(path)
        .await
        .map_err(|e| SessionError::asset_io(path, "Failed to open for hashing", e))?;

    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; HASH_BUFFER_SIZE];
    loop {
        let read = file
            .read(&mut buffer)
            .await
            .map_err(|e| SessionError::asset_io(path, "Failed to read for hashing", e))?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }

    Ok(hex::encode(hasher.finalize()))
}
