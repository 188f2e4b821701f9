//! Inference engine boundary: construction and single request/response calls

#[cfg(feature = "candle")]
mod candle;

#[cfg(feature = "candle")]
pub use self::candle::{CandleEngineFactory, CandleSettings};

use std::path::PathBuf;
use std::sync::Arc;
use serde::{Deserialize, Serialize};

/// Options a handle is constructed from. Immutable once a handle exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineOptions {
    /// Materialized model file
    pub model_path: PathBuf,

    /// Maximum number of tokens a single generation may produce
    pub max_tokens: usize,

    pub temperature: Option<f64>,

    pub top_p: Option<f64>,

    pub seed: u64,

    pub repeat_penalty: f32,

    /// Engine-specific tunables, opaque to the session manager
    pub extensions: serde_json::Map<String, serde_json::Value>,
}

/// Builds engine handles from a materialized model.
///
/// Construction can take seconds for large weight files; implementations
/// must keep that work off the async executor.
#[async_trait::async_trait]
pub trait EngineFactory: Send + Sync {
    async fn construct(&self, options: &EngineOptions) -> anyhow::Result<Arc<dyn EngineHandle>>;
}

/// A loaded, ready-to-query model instance.
#[async_trait::async_trait]
pub trait EngineHandle: Send + Sync {
    /// Run one prompt through the model and return the generated text.
    async fn generate(&self, input: &str) -> anyhow::Result<String>;
}
