//! Task environment trait and wrappers.
//!
//! Provides the `TaskEnv` trait every task family implements, plus the
//! `EpisodeStats` wrapper used to report per-episode returns.

mod traits;
mod wrappers;

pub use traits::{EnvInfo, StepResult, TaskEnv};
pub use wrappers::EpisodeStats;
