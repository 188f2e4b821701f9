//! Session metrics collection

mod collector;
mod memory;
mod types;

pub use collector::MetricsCollector;
pub use memory::{as_gib, MemoryProbe};
pub use types::{
    MetricsSnapshot,
    ModelMetrics,
    ProcessingMetrics,
};

// Latency samples kept for percentile computation
pub(crate) const MAX_METRICS_HISTORY: usize = 1000;
