use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// Add Result type alias
pub type Result<T> = std::result::Result<T, SessionError>;

/// Errors surfaced by the asset materializer and the session manager.
///
/// Every variant is `Clone` so the manager can keep the latest error around
/// while also handing it back to the caller.
#[derive(Debug, Clone, Error)]
pub enum SessionError {
    #[error("Model asset '{file_name}' not found in {store}")]
    AssetNotFound {
        file_name: String,
        store: String,
    },

    #[error("Asset I/O error at {}: {message}", .path.display())]
    AssetIo {
        path: PathBuf,
        message: String,
        #[source]
        source: Arc<io::Error>,
    },

    #[error("Engine construction failed for {}: {message}", .model_path.display())]
    EngineConstruction {
        model_path: PathBuf,
        message: String,
    },

    #[error("Engine not initialized: {cause}")]
    NotInitialized {
        cause: Box<SessionError>,
    },

    #[error("Generation failed: {message}")]
    Generation {
        message: String,
    },

    #[error("Generation timed out after {timeout:?}")]
    GenerationTimeout {
        timeout: Duration,
    },

    #[error("Another generation is already in flight")]
    Busy,

    #[error("Response parse error: {message}")]
    ResponseParse {
        message: String,
    },

    #[error("Configuration error for {parameter}: {message}")]
    Configuration {
        parameter: String,
        message: String,
    },
}

/// Flat classification of [`SessionError`], cheap to copy and compare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    AssetNotFound,
    AssetIo,
    EngineConstruction,
    EngineNotInitialized,
    EngineGeneration,
    GenerationTimeout,
    Busy,
    ResponseParse,
    Configuration,
}

impl SessionError {
    pub(crate) fn asset_io(path: impl Into<PathBuf>, message: impl Into<String>, source: io::Error) -> Self {
        SessionError::AssetIo {
            path: path.into(),
            message: message.into(),
            source: Arc::new(source),
        }
    }

    pub(crate) fn configuration(parameter: impl Into<String>, message: impl Into<String>) -> Self {
        SessionError::Configuration {
            parameter: parameter.into(),
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            SessionError::AssetNotFound { .. } => ErrorKind::AssetNotFound,
            SessionError::AssetIo { .. } => ErrorKind::AssetIo,
            SessionError::EngineConstruction { .. } => ErrorKind::EngineConstruction,
            SessionError::NotInitialized { .. } => ErrorKind::EngineNotInitialized,
            SessionError::Generation { .. } => ErrorKind::EngineGeneration,
            SessionError::GenerationTimeout { .. } => ErrorKind::GenerationTimeout,
            SessionError::Busy => ErrorKind::Busy,
            SessionError::ResponseParse { .. } => ErrorKind::ResponseParse,
            SessionError::Configuration { .. } => ErrorKind::Configuration,
        }
    }

    /// The initialization failure behind an `EngineNotInitialized` error.
    pub fn cause(&self) -> Option<&SessionError> {
        match self {
            SessionError::NotInitialized { cause } => Some(cause),
            _ => None,
        }
    }
}

/// Extension trait for error handling utilities
pub trait ErrorExt {
    /// Whether calling again without outside intervention can succeed.
    fn is_recoverable(&self) -> bool;
}

impl ErrorExt for SessionError {
    fn is_recoverable(&self) -> bool {
        match self {
            SessionError::AssetNotFound { .. } | SessionError::Configuration { .. } => false,
            SessionError::NotInitialized { cause } => cause.is_recoverable(),
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = SessionError::AssetNotFound {
            file_name: "model.task".to_string(),
            store: "/bundle".to_string(),
        };
        assert_eq!(error.to_string(), "Model asset 'model.task' not found in /bundle");

        let error = SessionError::Generation {
            message: "out of memory".to_string(),
        };
        assert_eq!(error.to_string(), "Generation failed: out of memory");
    }

    #[test]
    fn test_error_recovery_classification() {
        let missing = SessionError::AssetNotFound {
            file_name: "model.task".to_string(),
            store: "/bundle".to_string(),
        };
        assert!(!missing.is_recoverable());

        let io = SessionError::asset_io(
            "/data/model.task",
            "copy failed",
            io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(io.is_recoverable());
        assert_eq!(io.kind(), ErrorKind::AssetIo);

        let wrapped = SessionError::NotInitialized { cause: Box::new(missing) };
        assert_eq!(wrapped.kind(), ErrorKind::EngineNotInitialized);
        assert_eq!(wrapped.cause().map(SessionError::kind), Some(ErrorKind::AssetNotFound));
        assert!(!wrapped.is_recoverable());
    }

    #[test]
    fn test_asset_io_keeps_source() {
        use std::error::Error as _;

        let error = SessionError::asset_io(
            "/data",
            "create dir",
            io::Error::new(io::ErrorKind::Other, "disk full"),
        );
        let source = error.source().map(|s| s.to_string());
        assert_eq!(source.as_deref(), Some("disk full"));
    }
}
