use std::time::Duration;
use serde::{Serialize, Deserialize};

use crate::error::ErrorKind;

/// Snapshot of all metrics at a point in time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// When these metrics were collected
    pub timestamp: std::time::SystemTime,

    /// Time since the session manager was created
    pub uptime: Duration,

    pub model: ModelMetrics,

    pub processing: ProcessingMetrics,
}

/// Model acquisition metrics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelMetrics {
    /// Number of engine handles constructed (at most one per session)
    pub constructions: usize,

    /// Wall-clock time of the successful construction
    pub load_time: Option<Duration>,

    /// Size of the materialized model file
    pub asset_bytes: Option<u64>,

    /// Process RSS right after the engine was constructed
    pub rss_after_load: Option<u64>,
}

/// Generation performance metrics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingMetrics {
    /// Generate calls that reached the engine
    pub total_requests: usize,

    pub failed_requests: usize,

    pub error_rate: f32,

    pub average_latency: Duration,

    /// 95th percentile latency
    pub p95_latency: Duration,

    pub last_latency: Option<Duration>,

    /// Process RSS before and after the last successful generation
    pub rss_before_last: Option<u64>,
    pub rss_after_last: Option<u64>,

    /// Error counts by kind, most frequent first
    pub error_types: Vec<(ErrorKind, usize)>,
}
