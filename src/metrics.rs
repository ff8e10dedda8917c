// ABOUTME: Metric recording seam and the in-memory registry the binary reports from.
// ABOUTME: Counters only; the push byte counter is the one metric emitted.

use parking_lot::Mutex;
use std::collections::BTreeMap;

/// Name of the counter holding bytes pushed to registries.
pub const BYTES_PUSHED: &str = "bytes";

/// Receives metric updates from pipelines.
pub trait MetricsRecorder: Send + Sync {
    /// Add `value` to the counter `name`.
    fn increment(&self, name: &str, value: u64);
}

/// Counters kept in memory for the lifetime of the process.
#[derive(Debug, Default)]
pub struct MetricRegistry {
    counters: Mutex<BTreeMap<String, u64>>,
}

impl MetricRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current value of a counter, zero if it was never incremented.
    pub fn counter(&self, name: &str) -> u64 {
        self.counters.lock().get(name).copied().unwrap_or(0)
    }

    pub fn snapshot(&self) -> BTreeMap<String, u64> {
        self.counters.lock().clone()
    }
}

impl MetricsRecorder for MetricRegistry {
    fn increment(&self, name: &str, value: u64) {
        let mut counters = self.counters.lock();
        let counter = counters.entry(name.to_string()).or_insert(0);
        *counter = counter.saturating_add(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate() {
        let registry = MetricRegistry::new();
        registry.increment(BYTES_PUSHED, 10);
        registry.increment(BYTES_PUSHED, 5);
        assert_eq!(registry.counter(BYTES_PUSHED), 15);
        assert_eq!(registry.counter("missing"), 0);
    }
}
