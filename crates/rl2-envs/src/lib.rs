//! Task families for rl2.
//!
//! Provides the task distributions meta-training samples from:
//! - `Bandit` - Bernoulli multi-armed bandit (`Bandit-K{k}-v0`)
//! - `TabularMdp` - random 10-state, 5-action MDP (`TabularMDP-v0`)
//! - `Navigation2d` - point navigation to a hidden goal (`2DNavigation-v0`)
//!
//! A [`Task`] is an immutable descriptor; [`Task::make_env`] turns it into a
//! fresh environment.

mod bandit;
mod navigation;
mod tabular_mdp;

pub use bandit::{Bandit, BanditTask};
pub use navigation::{Navigation2d, NavigationTask, NAV_HORIZON};
pub use tabular_mdp::{MdpTask, TabularMdp, MDP_HORIZON, MDP_NUM_ACTIONS, MDP_NUM_STATES};

use rand::Rng;
use rl2::env::TaskEnv;
use rl2::{Result, Rl2Error};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Task family selector
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskKind {
    #[serde(rename = "bandit")]
    Bandit,
    #[serde(rename = "mdp")]
    Mdp,
    #[serde(rename = "2dnav")]
    Nav2d,
}

impl TaskKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskKind::Bandit => "bandit",
            TaskKind::Mdp => "mdp",
            TaskKind::Nav2d => "2dnav",
        }
    }

    /// Registered environment id, e.g. `Bandit-K5-v0`
    pub fn env_id(&self, num_actions: usize) -> String {
        match self {
            TaskKind::Bandit => format!("Bandit-K{}-v0", num_actions),
            TaskKind::Mdp => "TabularMDP-v0".to_string(),
            TaskKind::Nav2d => "2DNavigation-v0".to_string(),
        }
    }

    /// Flattened observation size of the family's environments
    pub fn observation_dim(&self) -> usize {
        match self {
            TaskKind::Bandit => 1,
            TaskKind::Mdp => MDP_NUM_STATES,
            TaskKind::Nav2d => 2,
        }
    }

    /// Action count a categorical policy uses for this family.
    ///
    /// The MDP family always has [`MDP_NUM_ACTIONS`] actions; navigation has
    /// continuous actions and cannot be trained with a categorical policy.
    pub fn training_actions(&self, requested: usize) -> Result<usize> {
        match self {
            TaskKind::Bandit => Ok(requested),
            TaskKind::Mdp => {
                if requested != MDP_NUM_ACTIONS {
                    tracing::warn!(
                        requested,
                        used = MDP_NUM_ACTIONS,
                        "TabularMDP has a fixed action count"
                    );
                }
                Ok(MDP_NUM_ACTIONS)
            }
            TaskKind::Nav2d => Err(Rl2Error::Config(
                "2dnav has a continuous action space; only bandit and mdp can be trained".into(),
            )),
        }
    }

    /// Draw `num_tasks` task descriptors
    pub fn sample_tasks<R: Rng>(&self, num_actions: usize, num_tasks: usize, rng: &mut R) -> Vec<Task> {
        (0..num_tasks)
            .map(|_| match self {
                TaskKind::Bandit => Task::Bandit(BanditTask::sample(num_actions, rng)),
                TaskKind::Mdp => Task::Mdp(MdpTask::sample(rng)),
                TaskKind::Nav2d => Task::Nav2d(NavigationTask::sample(rng)),
            })
            .collect()
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskKind {
    type Err = Rl2Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "bandit" => Ok(TaskKind::Bandit),
            "mdp" => Ok(TaskKind::Mdp),
            "2dnav" => Ok(TaskKind::Nav2d),
            other => Err(Rl2Error::Config(format!(
                "invalid task '{}' (expected bandit, mdp or 2dnav)",
                other
            ))),
        }
    }
}

/// Descriptor of one sampled task
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "family", rename_all = "lowercase")]
pub enum Task {
    Bandit(BanditTask),
    Mdp(MdpTask),
    #[serde(rename = "2dnav")]
    Nav2d(NavigationTask),
}

impl Task {
    pub fn kind(&self) -> TaskKind {
        match self {
            Task::Bandit(_) => TaskKind::Bandit,
            Task::Mdp(_) => TaskKind::Mdp,
            Task::Nav2d(_) => TaskKind::Nav2d,
        }
    }

    /// Discrete action count, `None` for continuous families
    pub fn num_actions(&self) -> Option<usize> {
        match self {
            Task::Bandit(task) => Some(task.means.len()),
            Task::Mdp(task) => Some(task.num_actions()),
            Task::Nav2d(_) => None,
        }
    }

    /// Check the descriptor's tables; `num_actions` applies to the MDP family
    pub fn validate(&self, num_actions: usize) -> Result<()> {
        match self {
            Task::Bandit(task) => task.validate(),
            Task::Mdp(task) => task.validate(num_actions),
            Task::Nav2d(task) => task.validate(),
        }
    }

    /// Fresh environment for this task; `seed` drives its reward and
    /// transition noise
    pub fn make_env(&self, seed: u64) -> Box<dyn TaskEnv> {
        match self {
            Task::Bandit(task) => Box::new(Bandit::new(task.clone(), seed)),
            Task::Mdp(task) => Box::new(TabularMdp::new(task.clone(), seed)),
            Task::Nav2d(task) => Box::new(Navigation2d::new(task.clone())),
        }
    }
}

/// Check that every task in `tasks` belongs to `kind` with `num_actions`
/// discrete actions and well-formed tables.
pub fn check_tasks(tasks: &[Task], kind: TaskKind, num_actions: usize) -> Result<()> {
    for (index, task) in tasks.iter().enumerate() {
        if task.kind() != kind {
            return Err(Rl2Error::TaskFile(format!(
                "task {} is a {} task, expected {}",
                index,
                task.kind(),
                kind
            )));
        }
        if let Some(n) = task.num_actions() {
            if n != num_actions {
                return Err(Rl2Error::ShapeMismatch {
                    expected: vec![num_actions],
                    actual: vec![n],
                });
            }
        }
        task.validate(num_actions).map_err(|e| match e {
            Rl2Error::TaskFile(msg) => Rl2Error::TaskFile(format!("task {}: {}", index, msg)),
            other => other,
        })?;
    }
    Ok(())
}
