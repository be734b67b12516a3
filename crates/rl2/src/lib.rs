//! # rl2
//!
//! Meta-reinforcement learning in the RL2 style: a recurrent policy is trained
//! across many tasks sampled from a task family, carrying its hidden state
//! across episodes of the same task so that it learns to infer the task from
//! its own history.
//!
//! ## Overview
//!
//! rl2 provides:
//! - The `TaskEnv` trait and observation/action spaces for task environments
//! - Recurrent policies (`GruPolicy`, `GruActorCritic`) - requires `torch` feature
//! - Meta-episode trajectory collection with explicit hidden-state resets
//! - REINFORCE and PPO optimizer steps over task distributions - requires `torch` feature
//! - Checkpoint and task-file persistence
//!
//! ## Features
//!
//! - `torch` (default) - Enable policies and training (requires libtorch)
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use rl2::prelude::*;
//!
//! let config = Rl2Config::default().with_num_tasks(3);
//! let policy = GruPolicy::new(input_size, config.num_actions as i64, config.hidden_size, Device::Cpu);
//! let mut optimizer = OptimizerKind::Sgd.build(policy.var_store(), config.learning_rate)?;
//! let outcome = reinforce(policy, &mut optimizer, &tasks, |task| Ok(task.make_env(0)), &config)?;
//! println!("{:?}", outcome.rewards);
//! ```

pub mod checkpoint;
pub mod config;
pub mod env;
pub mod log;
pub mod spaces;
pub mod utils;

// Modules that require the tensor backend
#[cfg(feature = "torch")]
pub mod policy;
#[cfg(feature = "torch")]
pub mod training;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{Algorithm, Rl2Config};
    pub use crate::env::{EnvInfo, EpisodeStats, StepResult, TaskEnv};
    pub use crate::log::{CompositeLogger, ConsoleLogger, MemoryLogger, MetricLogger, NoOpLogger};
    pub use crate::spaces::{Box as BoxSpace, Discrete, DynSpace, Space};
    pub use crate::{Result, Rl2Error};

    pub use crate::checkpoint::{checkpoint_path, load_tasks, save_tasks, CheckpointMetadata};
    #[cfg(feature = "torch")]
    pub use crate::checkpoint::{load_policy, save_policy};

    #[cfg(feature = "torch")]
    pub use crate::policy::{
        Distribution, GruActorCritic, GruPolicy, HasVarStore, PolicyOutput, RecurrentPolicy,
    };
    #[cfg(feature = "torch")]
    pub use crate::training::{
        collect, ppo, reinforce, MetaTrainOutcome, OptimizerKind, PolicyOptimizer,
        TrajectoryBatch,
    };
    #[cfg(feature = "torch")]
    pub use tch::Device;
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Error types for the library
#[derive(Debug, thiserror::Error)]
pub enum Rl2Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    #[error("Task {task} produced an empty trajectory batch")]
    EmptyBatch { task: usize },

    #[error("Numerical error: {0}")]
    Numerical(String),

    #[error("Environment error: {0}")]
    EnvError(String),

    #[error("Invalid task file: {0}")]
    TaskFile(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[cfg(feature = "torch")]
    #[error("Tensor error: {0}")]
    TensorError(#[from] tch::TchError),
}

pub type Result<T> = core::result::Result<T, Rl2Error>;
