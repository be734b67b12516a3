//! Metric logging.
//!
//! Provides:
//! - `MetricLogger` trait for composable backends
//! - `ConsoleLogger` for per-task summaries through `tracing`
//! - `MemoryLogger` for collecting per-task metrics in memory
//! - `CompositeLogger` for multi-backend logging

mod console;
mod logger;

pub use console::ConsoleLogger;
pub use logger::{CompositeLogger, MemoryLogger, MetricLogger, NoOpLogger};
