//! Model asset resolution and materialization into writable storage

mod materializer;

pub use materializer::{file_sha256, AssetMaterializer};

use std::fmt;
use std::path::{Path, PathBuf};
use serde::{Deserialize, Serialize};

/// Subdirectory of the runtime data dir that holds materialized models.
pub(crate) const MODELS_SUBDIR: &str = "models";

/// A named model file shipped with the application.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModelAsset {
    name: String,
    extension: String,
    version: Option<String>,
}

impl ModelAsset {
    pub fn new(name: impl Into<String>, extension: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            extension: extension.into(),
            version: None,
        }
    }

    /// Tag the materialized copy with a version so a new release never
    /// reuses a copy left behind by an older one.
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// File name inside the read-only store.
    pub fn source_file_name(&self) -> String {
        format!("{}.{}", self.name, self.extension)
    }

    /// File name of the materialized copy.
    pub fn file_name(&self) -> String {
        match &self.version {
            Some(version) => format!("{}-{}.{}", self.name, version, self.extension),
            None => self.source_file_name(),
        }
    }
}

impl fmt::Display for ModelAsset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.file_name())
    }
}

/// When an already materialized copy gets replaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RefreshPolicy {
    /// Copy only when the destination is missing; never compare contents.
    #[default]
    IfAbsent,
    /// Replace the destination when its size or SHA-256 differs from the source.
    IfChanged,
}

/// Read-only lookup of packaged assets.
pub trait AssetStore: Send + Sync {
    /// Readable path of the asset, or `None` when it is not shipped.
    fn locate(&self, asset: &ModelAsset) -> Option<PathBuf>;

    /// Human readable description used in error messages.
    fn describe(&self) -> String;
}

/// Asset store backed by a plain directory.
#[derive(Debug, Clone)]
pub struct BundleAssetStore {
    root: PathBuf,
}

impl BundleAssetStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl AssetStore for BundleAssetStore {
    fn locate(&self, asset: &ModelAsset) -> Option<PathBuf> {
        let path = self.root.join(asset.source_file_name());
        path.is_file().then_some(path)
    }

    fn describe(&self) -> String {
        self.root.display().to_string()
    }
}

/// Per-user writable directory for materialized models.
pub fn default_runtime_dir(app_name: &str) -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(app_name)
        .join(MODELS_SUBDIR)
}
