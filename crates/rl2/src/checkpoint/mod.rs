//! Persistence of trained policies and sampled task lists.
//!
//! Provides:
//! - `CheckpointMetadata`, the JSON sidecar written next to the weights
//! - `save_policy` / `load_policy` for VarStore checkpoints (torch feature)
//! - `save_tasks` / `load_tasks` for the task-file container

mod metadata;
mod tasks;

pub use metadata::{checkpoint_path, sidecar_path, CheckpointMetadata};
#[cfg(feature = "torch")]
pub use metadata::{load_policy, save_policy};
pub use tasks::{load_tasks, save_tasks, task_file_path};
