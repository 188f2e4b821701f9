use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::RwLock;

use crate::error::ErrorKind;

use super::memory::MemoryProbe;
use super::types::{MetricsSnapshot, ModelMetrics, ProcessingMetrics};
use super::MAX_METRICS_HISTORY;

/// Collects session performance metrics
pub struct MetricsCollector {
    enabled: bool,
    state: RwLock<MetricsState>,
    memory: MemoryProbe,
    start_time: Instant,
}

#[derive(Debug, Default)]
struct MetricsState {
    // Model metrics
    constructions: usize,
    load_time: Option<Duration>,
    asset_bytes: Option<u64>,
    rss_after_load: Option<u64>,

    // Processing metrics
    total_generations: usize,
    failed_generations: usize,
    latencies: Vec<Duration>,
    rss_before_last: Option<u64>,
    rss_after_last: Option<u64>,

    // Error metrics
    errors: HashMap<ErrorKind, usize>,
}

impl MetricsCollector {
    /// Create a new metrics collector
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            state: RwLock::new(MetricsState::default()),
            memory: MemoryProbe::new(),
            start_time: Instant::now(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Process RSS in bytes; `None` when disabled or unsupported
    pub fn sample_rss(&self) -> Option<u64> {
        if !self.enabled {
            return None;
        }
        self.memory.rss_bytes()
    }

    /// Record a successful engine construction
    pub fn record_model_load(&self, load_time: Duration, asset_bytes: Option<u64>, rss_after: Option<u64>) {
        if !self.enabled {
            return;
        }
        let mut state = self.state.write();
        state.constructions += 1;
        state.load_time = Some(load_time);
        state.asset_bytes = asset_bytes;
        state.rss_after_load = rss_after;
    }

    /// Record a successful generation with the RSS sampled around it
    pub fn record_generation(&self, latency: Duration, rss_before: Option<u64>, rss_after: Option<u64>) {
        if !self.enabled {
            return;
        }
        let mut state = self.state.write();
        state.total_generations += 1;
        state.rss_before_last = rss_before;
        state.rss_after_last = rss_after;
        state.latencies.push(latency);
        if state.latencies.len() > MAX_METRICS_HISTORY {
            let excess = state.latencies.len() - MAX_METRICS_HISTORY;
            state.latencies.drain(..excess);
        }
    }

    /// Record an error; generation failures also count as attempts
    pub fn record_error(&self, kind: ErrorKind, during_generation: bool) {
        if !self.enabled {
            return;
        }
        let mut state = self.state.write();
        *state.errors.entry(kind).or_insert(0) += 1;
        if during_generation {
            state.total_generations += 1;
            state.failed_generations += 1;
        }
    }

    /// Take a snapshot of current metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        let state = self.state.read();

        let mut sorted = state.latencies.clone();
        sorted.sort_unstable();
        let average_latency = if sorted.is_empty() {
            Duration::ZERO
        } else {
            sorted.iter().sum::<Duration>() / sorted.len() as u32
        };

        let mut error_types: Vec<(ErrorKind, usize)> =
            state.errors.iter().map(|(kind, count)| (*kind, *count)).collect();
        error_types.sort_by(|a, b| b.1.cmp(&a.1));

        MetricsSnapshot {
            timestamp: std::time::SystemTime::now(),
            uptime: self.start_time.elapsed(),
            model: ModelMetrics {
                constructions: state.constructions,
                load_time: state.load_time,
                asset_bytes: state.asset_bytes,
                rss_after_load: state.rss_after_load,
            },
            processing: ProcessingMetrics {
                total_requests: state.total_generations,
                failed_requests: state.failed_generations,
                error_rate: if state.total_generations == 0 {
                    0.0
                } else {
                    state.failed_generations as f32 / state.total_generations as f32
                },
                average_latency,
                p95_latency: percentile(&sorted, 0.95),
                last_latency: state.latencies.last().copied(),
                rss_before_last: state.rss_before_last,
                rss_after_last: state.rss_after_last,
                error_types,
            },
        }
    }
}

/// Nearest-rank percentile over an ascending slice
fn percentile(sorted: &[Duration], p: f64) -> Duration {
    if sorted.is_empty() {
        return Duration::ZERO;
    }
    let rank = (p * sorted.len() as f64).ceil() as usize;
    sorted[rank.clamp(1, sorted.len()) - 1]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_metrics() {
        let collector = MetricsCollector::new(true);

        for ms in 1..=20 {
            collector.record_generation(Duration::from_millis(ms * 10), None, None);
        }
        collector.record_error(ErrorKind::EngineGeneration, true);
        collector.record_error(ErrorKind::AssetNotFound, false);

        let snapshot = collector.snapshot();
        assert_eq!(snapshot.processing.total_requests, 21);
        assert_eq!(snapshot.processing.failed_requests, 1);
        assert_eq!(snapshot.processing.p95_latency, Duration::from_millis(190));
        assert_eq!(snapshot.processing.average_latency, Duration::from_millis(105));
        assert_eq!(snapshot.processing.last_latency, Some(Duration::from_millis(200)));
        assert_eq!(snapshot.processing.error_types.len(), 2);
    }

    #[test]
    fn test_model_load_metrics() {
        let collector = MetricsCollector::new(true);
        collector.record_model_load(Duration::from_secs(2), Some(1024), Some(4096));

        let snapshot = collector.snapshot();
        assert_eq!(snapshot.model.constructions, 1);
        assert_eq!(snapshot.model.load_time, Some(Duration::from_secs(2)));
        assert_eq!(snapshot.model.asset_bytes, Some(1024));
        assert_eq!(snapshot.model.rss_after_load, Some(4096));
    }

    #[test]
    fn test_memory_around_generation() {
        let collector = MetricsCollector::new(true);
        let before = collector.sample_rss();
        let after = collector.sample_rss();
        assert!(before.is_some());
        collector.record_generation(Duration::from_millis(3), before, after);

        let snapshot = collector.snapshot();
        assert_eq!(snapshot.processing.rss_before_last, before);
        assert_eq!(snapshot.processing.rss_after_last, after);
        assert!(snapshot.processing.rss_after_last.unwrap() > 0);
    }

    #[test]
    fn test_history_is_bounded() {
        let collector = MetricsCollector::new(true);
        for _ in 0..(MAX_METRICS_HISTORY + 10) {
            collector.record_generation(Duration::from_millis(1), None, None);
        }
        let state = collector.state.read();
        assert_eq!(state.latencies.len(), MAX_METRICS_HISTORY);
        assert_eq!(state.total_generations, MAX_METRICS_HISTORY + 10);
    }

    #[test]
    fn test_disabled_collector_records_nothing() {
        let collector = MetricsCollector::new(false);
        collector.record_generation(Duration::from_millis(5), Some(1), Some(2));
        collector.record_model_load(Duration::from_secs(1), None, None);
        assert_eq!(collector.sample_rss(), None);

        let snapshot = collector.snapshot();
        assert_eq!(snapshot.processing.total_requests, 0);
        assert_eq!(snapshot.model.constructions, 0);
    }
}
