use std::sync::Arc;

use crate::{
    asset::{AssetStore, BundleAssetStore},
    config::SessionConfig,
    engine::EngineFactory,
    error::{Result, SessionError},
};

use super::manager::SessionManager;

/// Builder for constructing a SessionManager instance
#[derive(Default)]
pub struct SessionBuilder {
    config: Option<SessionConfig>,
    store: Option<Arc<dyn AssetStore>>,
    factory: Option<Arc<dyn EngineFactory>>,
}

impl SessionBuilder {
    /// Create a new builder instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the session configuration
    pub fn with_config(mut self, config: SessionConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Use a custom read-only asset store instead of the configured bundle dir
    pub fn with_store(mut self, store: Arc<dyn AssetStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Set the engine backend
    pub fn with_factory(mut self, factory: Arc<dyn EngineFactory>) -> Self {
        self.factory = Some(factory);
        self
    }

    /// Build the manager. Nothing is loaded until the first request.
    pub fn build(self) -> Result<SessionManager> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        let factory = self
            .factory
            .ok_or_else(|| SessionError::configuration("factory", "An engine factory is required"))?;

        let store = match self.store {
            Some(store) => store,
            None => {
                if config.asset.bundle_dir.as_os_str().is_empty() {
                    return Err(SessionError::configuration(
                        "asset.bundle_dir",
                        "Bundle directory cannot be empty without a custom asset store",
                    ));
                }
                Arc::new(BundleAssetStore::new(&config.asset.bundle_dir))
            }
        };

        Ok(SessionManager::new(config, store, factory))
    }
}
