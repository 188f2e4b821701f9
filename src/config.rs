// Location: src/config.rs

use std::path::{Path, PathBuf};
use std::time::Duration;
use serde::{Serialize, Deserialize};

use crate::asset::{ModelAsset, RefreshPolicy};
use crate::engine::EngineOptions;
use crate::error::{Result, SessionError};

/// Default output token budget for a single generation.
pub const DEFAULT_MAX_TOKENS: usize = 200;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Application name, used to derive the default runtime directory
    pub app_name: String,
    pub asset: AssetConfig,
    pub generation: GenerationConfig,
    pub session: RuntimeConfig,
    pub monitoring: MonitoringConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetConfig {
    /// Logical model name (file stem)
    pub name: String,

    /// File extension / format tag, without the leading dot
    pub extension: String,

    /// Optional version tag baked into the materialized file name
    pub version: Option<String>,

    /// Read-only directory the asset is shipped in
    pub bundle_dir: PathBuf,

    /// Writable directory; `None` selects the platform default
    pub runtime_dir: Option<PathBuf>,

    /// When an existing materialized copy is replaced
    pub refresh: RefreshPolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Maximum number of tokens to generate
    pub max_tokens: usize,

    /// Temperature for sampling
    pub temperature: Option<f64>,

    /// Top-p sampling threshold
    pub top_p: Option<f64>,

    /// Sampling seed
    pub seed: u64,

    /// Repetition penalty
    pub repeat_penalty: f32,

    /// Engine-specific tunables, forwarded untouched
    pub extensions: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConcurrencyPolicy {
    /// Overlapping requests wait their turn
    #[default]
    Queue,
    /// Overlapping requests fail with `Busy`
    Reject,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub concurrency: ConcurrencyPolicy,

    /// Upper bound on a single inference call
    pub generation_timeout: Option<Duration>,

    /// Capacity of the session event channel
    pub event_capacity: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitoringConfig {
    /// Whether to collect metrics
    pub enable_metrics: bool,

    /// Log level
    pub log_level: LogLevel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            app_name: "local-model-session".to_string(),
            asset: AssetConfig::default(),
            generation: GenerationConfig::default(),
            session: RuntimeConfig::default(),
            monitoring: MonitoringConfig::default(),
        }
    }
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            name: "model".to_string(),
            extension: "gguf".to_string(),
            version: None,
            bundle_dir: PathBuf::new(),
            runtime_dir: None,
            refresh: RefreshPolicy::IfAbsent,
        }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: Some(0.7),
            top_p: Some(0.95),
            seed: 299792458,
            repeat_penalty: 1.1,
            extensions: serde_json::Map::new(),
        }
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            concurrency: ConcurrencyPolicy::Queue,
            generation_timeout: None,
            event_capacity: 16,
        }
    }
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            enable_metrics: true,
            log_level: LogLevel::Info,
        }
    }
}

impl AssetConfig {
    pub fn model_asset(&self) -> ModelAsset {
        let asset = ModelAsset::new(&self.name, &self.extension);
        match &self.version {
            Some(version) => asset.with_version(version),
            None => asset,
        }
    }

    /// The writable directory, falling back to the per-user data dir.
    pub fn resolved_runtime_dir(&self, app_name: &str) -> PathBuf {
        self.runtime_dir
            .clone()
            .unwrap_or_else(|| crate::asset::default_runtime_dir(app_name))
    }
}

impl GenerationConfig {
    pub fn to_engine_options(&self, model_path: PathBuf) -> EngineOptions {
        EngineOptions {
            model_path,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            top_p: self.top_p,
            seed: self.seed,
            repeat_penalty: self.repeat_penalty,
            extensions: self.extensions.clone(),
        }
    }
}

impl SessionConfig {
    /// Load a configuration from a JSON file; missing fields take defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            SessionError::configuration(path.display().to_string(), format!("Failed to read config: {}", e))
        })?;
        let config: SessionConfig = serde_json::from_str(&raw).map_err(|e| {
            SessionError::configuration(path.display().to_string(), format!("Invalid config JSON: {}", e))
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        // Validate asset configuration
        if self.asset.name.trim().is_empty() {
            return Err(SessionError::configuration("asset.name", "Asset name cannot be empty"));
        }
        if self.asset.extension.trim().is_empty() || self.asset.extension.starts_with('.') {
            return Err(SessionError::configuration(
                "asset.extension",
                "Extension must be non-empty and given without a leading dot",
            ));
        }

        // Validate generation configuration
        if self.generation.max_tokens == 0 {
            return Err(SessionError::configuration("generation.max_tokens", "Token budget must be positive"));
        }
        if let Some(temperature) = self.generation.temperature {
            if !(0.0..=2.0).contains(&temperature) {
                return Err(SessionError::configuration(
                    "generation.temperature",
                    "Temperature must be between 0 and 2",
                ));
            }
        }
        if let Some(top_p) = self.generation.top_p {
            if !(top_p > 0.0 && top_p <= 1.0) {
                return Err(SessionError::configuration("generation.top_p", "Top-p must be in (0, 1]"));
            }
        }

        if self.session.generation_timeout == Some(Duration::ZERO) {
            return Err(SessionError::configuration(
                "session.generation_timeout",
                "Timeout must be positive when set",
            ));
        }
        if self.session.event_capacity == 0 {
            return Err(SessionError::configuration("session.event_capacity", "Event capacity must be positive"));
        }

        Ok(())
    }
}
