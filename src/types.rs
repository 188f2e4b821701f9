//! Common type definitions shared by the session manager and its callers

use std::time::Duration;
use serde::{Serialize, Deserialize};

use crate::error::{ErrorKind, SessionError};

/// Lifecycle of a session. `Ready` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    /// No engine handle yet; the next call attempts initialization
    Uninitialized,
    /// An engine handle exists and serves every later request
    Ready,
}

/// Push notifications for observers such as a UI layer.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// The engine handle was constructed
    Ready {
        load_time: Duration,
    },
    /// A generation produced a response
    Response {
        text: String,
        latency: Duration,
    },
    /// An operation failed; the previous response is still current
    Failed {
        kind: ErrorKind,
        message: String,
    },
}

/// Result of `generate_analysis`: the latest response and error as they
/// stand after the call.
#[derive(Debug, Clone, Default)]
pub struct AnalysisOutcome {
    /// Latest successful response; stale when `error` is set
    pub response: Option<String>,
    pub error: Option<SessionError>,
}

impl AnalysisOutcome {
    pub fn is_success(&self) -> bool {
        self.error.is_none() && self.response.is_some()
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.error.as_ref().map(SessionError::kind)
    }
}
