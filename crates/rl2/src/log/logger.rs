//! Metric logger traits and composites.

use std::collections::HashMap;
use std::sync::Mutex;

/// Trait for logging metrics to various backends.
///
/// The optimizer steps call it once per task with the task index as `step`.
pub trait MetricLogger: Send + Sync {
    /// Log a set of metrics collected in a map.
    fn log_metrics(&self, metrics: &HashMap<String, f64>, step: u64);
}

/// A logger that does nothing (default).
pub struct NoOpLogger;

impl MetricLogger for NoOpLogger {
    fn log_metrics(&self, _metrics: &HashMap<String, f64>, _step: u64) {}
}

/// Keeps every logged value, in order, for later inspection.
#[derive(Default)]
pub struct MemoryLogger {
    records: Mutex<Vec<(u64, String, f64)>>,
}

impl MemoryLogger {
    pub fn new() -> Self {
        Self::default()
    }

    /// All values logged under `name`, as (step, value)
    pub fn series(&self, name: &str) -> Vec<(u64, f64)> {
        match self.records.lock() {
            Ok(records) => records
                .iter()
                .filter(|(_, key, _)| key == name)
                .map(|(step, _, value)| (*step, *value))
                .collect(),
            Err(_) => Vec::new(),
        }
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.records.lock().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl MetricLogger for MemoryLogger {
    fn log_metrics(&self, metrics: &HashMap<String, f64>, step: u64) {
        if let Ok(mut records) = self.records.lock() {
            let mut sorted: Vec<_> = metrics.iter().collect();
            sorted.sort_by(|a, b| a.0.cmp(b.0));
            for (name, value) in sorted {
                records.push((step, name.clone(), *value));
            }
        }
    }
}

/// A composite logger that dispatches to multiple backends.
pub struct CompositeLogger {
    loggers: Vec<Box<dyn MetricLogger>>,
}

impl CompositeLogger {
    pub fn new(loggers: Vec<Box<dyn MetricLogger>>) -> Self {
        Self { loggers }
    }

    pub fn add(&mut self, logger: Box<dyn MetricLogger>) {
        self.loggers.push(logger);
    }
}

impl MetricLogger for CompositeLogger {
    fn log_metrics(&self, metrics: &HashMap<String, f64>, step: u64) {
        for logger in &self.loggers {
            logger.log_metrics(metrics, step);
        }
    }
}

impl<L: MetricLogger + ?Sized> MetricLogger for std::sync::Arc<L> {
    fn log_metrics(&self, metrics: &HashMap<String, f64>, step: u64) {
        (**self).log_metrics(metrics, step)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_memory_logger_series() {
        let logger = MemoryLogger::new();
        let mut first = HashMap::new();
        first.insert("task_reward".to_string(), 1.0);
        first.insert("policy_loss".to_string(), 0.5);
        logger.log_metrics(&first, 0);

        let mut second = HashMap::new();
        second.insert("task_reward".to_string(), 3.0);
        logger.log_metrics(&second, 1);

        assert_eq!(logger.series("task_reward"), vec![(0, 1.0), (1, 3.0)]);
        assert_eq!(logger.len(), 3);
    }

    #[test]
    fn test_composite_dispatches_to_all() {
        let first = Arc::new(MemoryLogger::new());
        let second = Arc::new(MemoryLogger::new());
        let mut composite = CompositeLogger::new(vec![Box::new(first.clone())]);
        composite.add(Box::new(second.clone()));
        composite.add(Box::new(NoOpLogger));

        let mut metrics = HashMap::new();
        metrics.insert("entropy".to_string(), 1.5);
        metrics.insert("approx_kl".to_string(), 0.01);
        composite.log_metrics(&metrics, 2);

        assert_eq!(first.series("entropy"), vec![(2, 1.5)]);
        assert_eq!(second.series("approx_kl"), vec![(2, 0.01)]);
    }
}
