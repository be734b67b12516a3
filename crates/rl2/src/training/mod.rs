//! Meta-training over task distributions.
//!
//! Provides:
//! - `collect` / `collect_task` - meta-episode rollouts with hidden-state resets at task boundaries
//! - `discounted_returns`, `normalize_returns`, `compute_gae` - return and advantage estimation
//! - `reinforce` and `ppo` - the two optimizer steps
//! - `OptimizerKind` / `TorchOptimizer` - SGD and Adam over a policy's VarStore

mod buffer;
mod collector;
mod losses;
mod optimizer;
mod outcome;
mod ppo;
mod reinforce;
mod returns;

pub use buffer::{TrajectoryBatch, TrajectoryStep};
pub use collector::{check_env, collect, collect_task};
pub use losses::{clip_fraction, kl_divergence, ppo_policy_loss, reinforce_loss, value_loss};
pub use optimizer::{OptimizerKind, PolicyOptimizer, TorchOptimizer};
pub use outcome::{MetaTrainOutcome, TaskMetrics};
pub use ppo::{ppo, ppo_update, ppo_with_logger, PpoStats};
pub use reinforce::{reinforce, reinforce_task_loss, reinforce_with_logger};
pub use returns::{compute_gae, discounted_returns, normalize_returns};

use indicatif::{ProgressBar, ProgressStyle};

/// Progress bar over tasks, `None` when disabled
pub(crate) fn task_progress(num_tasks: usize, show: bool) -> Option<ProgressBar> {
    if !show {
        return None;
    }
    let pb = ProgressBar::new(num_tasks as u64);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} tasks ({eta}) {msg}")
    {
        pb.set_style(style.progress_chars("#>-"));
    }
    Some(pb)
}
