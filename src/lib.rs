//! Local Model Session - on-device language model sessions
//!
//! This crate copies a model file shipped in a read-only bundle into a
//! writable runtime directory, lazily constructs one inference engine handle
//! from it, and serves prompt/response requests through that handle.
//!
//! ```no_run
//! use std::sync::Arc;
//! use local_model_session::{CandleEngineFactory, CandleSettings, SessionConfig, SessionManager};
//!
//! # async fn run() -> local_model_session::Result<()> {
//! let mut config = SessionConfig::default();
//! config.asset.bundle_dir = "/opt/app/bundle".into();
//!
//! let factory = CandleEngineFactory::new(CandleSettings::new("/opt/app/bundle/tokenizer.json"));
//! let manager = SessionManager::builder()
//!     .with_config(config)
//!     .with_factory(Arc::new(factory))
//!     .build()?;
//!
//! let outcome = manager.generate_analysis("You are a coach.", "{\"hr\": 62}").await;
//! println!("{:?}", outcome.response);
//! # Ok(())
//! # }
//! ```

use std::fmt;

// Public modules
pub mod asset;
pub mod config;
pub mod engine;
pub mod error;
pub mod metrics;
pub mod session;
pub mod types;

// Internal modules
mod utils;

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const MIN_RUST_VERSION: &str = "1.70.0";

// Re-exports for public API
pub use asset::{AssetMaterializer, AssetStore, BundleAssetStore, ModelAsset, RefreshPolicy};
pub use config::{ConcurrencyPolicy, SessionConfig};
pub use engine::{EngineFactory, EngineHandle, EngineOptions};
#[cfg(feature = "candle")]
pub use engine::{CandleEngineFactory, CandleSettings};
pub use error::{ErrorExt, ErrorKind, Result, SessionError};
pub use metrics::{MetricsCollector, MetricsSnapshot};
pub use session::{SessionBuilder, SessionManager};
pub use types::{AnalysisOutcome, SessionEvent, SessionState};
pub use utils::{setup_logging, LogConfig};

/// Feature detection for supported backends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Features {
    /// Whether the candle backend is compiled in
    pub candle: bool,
    /// Whether CUDA support is enabled
    pub cuda: bool,
    /// Number of detected CUDA devices
    pub cuda_devices: usize,
}

impl Features {
    /// Detect available features at runtime
    pub fn detect() -> Self {
        #[cfg(feature = "cuda")]
        let cuda_devices = (0..8)
            .take_while(|&i| candle_core::Device::new_cuda(i).is_ok())
            .count();

        #[cfg(not(feature = "cuda"))]
        let cuda_devices = 0;

        Self {
            candle: cfg!(feature = "candle"),
            cuda: cuda_devices > 0,
            cuda_devices,
        }
    }
}

impl fmt::Display for Features {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Candle backend: {}", if self.candle { "yes" } else { "no" })?;
        writeln!(f, "CUDA support: {}", if self.cuda { "yes" } else { "no" })?;
        if self.cuda {
            writeln!(f, "CUDA devices: {}", self.cuda_devices)?;
        }
        Ok(())
    }
}
