//! Console logging backend.

use super::MetricLogger;
use std::collections::HashMap;

/// Logger that prints per-task metrics via tracing.
pub struct ConsoleLogger {
    prefix: &'static str,
}

impl Default for ConsoleLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl ConsoleLogger {
    pub fn new() -> Self {
        Self { prefix: "task" }
    }

    /// Label printed in front of the step index (e.g. "eval")
    pub fn with_prefix(mut self, prefix: &'static str) -> Self {
        self.prefix = prefix;
        self
    }
}

impl MetricLogger for ConsoleLogger {
    fn log_metrics(&self, metrics: &HashMap<String, f64>, step: u64) {
        // One line per task, keys in stable order
        let mut sorted: Vec<_> = metrics.iter().collect();
        sorted.sort_by(|a, b| a.0.cmp(b.0));

        let fields = sorted
            .iter()
            .map(|(key, value)| format!("{}={:.4}", key, value))
            .collect::<Vec<_>>()
            .join(", ");

        tracing::info!("{} {}: {}", self.prefix, step, fields);
    }
}
