//! Meta-training configuration.

use crate::{Result, Rl2Error};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
#[cfg(feature = "torch")]
use tch::Device;

/// Policy-gradient algorithm used for the optimizer step
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Algorithm {
    /// Monte-Carlo policy gradient on normalized discounted returns
    Reinforce,
    /// Clipped-surrogate actor-critic with GAE
    Ppo,
}

impl Algorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            Algorithm::Reinforce => "reinforce",
            Algorithm::Ppo => "ppo",
        }
    }

    /// Whether the algorithm needs a value head
    pub fn needs_critic(&self) -> bool {
        matches!(self, Algorithm::Ppo)
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Algorithm {
    type Err = Rl2Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "reinforce" => Ok(Algorithm::Reinforce),
            "ppo" => Ok(Algorithm::Ppo),
            other => Err(Rl2Error::Config(format!(
                "unknown algorithm '{}' (expected reinforce or ppo)",
                other
            ))),
        }
    }
}

/// Configuration shared by the driver and both optimizer steps
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Rl2Config {
    // Task layout
    /// Size of the discrete action space
    pub num_actions: usize,
    /// Number of tasks visited per run
    pub num_tasks: usize,
    /// Episodes collected per task (the meta-episode length)
    pub max_num_traj: usize,
    /// Step cap of a single episode
    pub max_traj_len: usize,

    // Returns
    /// Discount factor
    pub gamma: f64,
    /// GAE lambda
    pub tau: f64,

    // Optimization
    /// Learning rate
    pub learning_rate: f64,
    /// PPO mini-batch size (steps)
    pub mini_batch_size: usize,
    /// PPO epochs per task
    pub ppo_epochs: usize,
    /// PPO clipping coefficient
    pub clip_coef: f64,
    /// Value loss coefficient
    pub vf_coef: f64,
    /// Entropy bonus coefficient
    pub ent_coef: f64,
    /// Global gradient-norm clip, disabled when `None`
    pub max_grad_norm: Option<f64>,
    /// Apply gradient updates; `false` holds the policy fixed
    pub update_params: bool,

    // Model
    /// GRU hidden size
    pub hidden_size: i64,

    // Misc
    /// Seed for task sampling and libtorch
    pub seed: u64,
    /// Draw a progress bar over tasks
    pub show_progress: bool,

    /// Device to run the policy on
    #[cfg(feature = "torch")]
    #[serde(skip, default = "default_device")]
    pub device: Device,
}

#[cfg(feature = "torch")]
fn default_device() -> Device {
    Device::Cpu
}

impl Default for Rl2Config {
    fn default() -> Self {
        Self {
            num_actions: 5,
            num_tasks: 5,
            max_num_traj: 10,
            max_traj_len: 1,
            gamma: 0.99,
            tau: 0.95,
            learning_rate: 1e-2,
            mini_batch_size: 1,
            ppo_epochs: 1,
            clip_coef: 0.2,
            vf_coef: 0.5,
            ent_coef: 0.0,
            max_grad_norm: None,
            update_params: true,
            hidden_size: 256,
            seed: 0,
            show_progress: false,
            #[cfg(feature = "torch")]
            device: default_device(),
        }
    }
}

impl Rl2Config {
    /// Set the number of actions
    pub fn with_num_actions(mut self, num_actions: usize) -> Self {
        self.num_actions = num_actions;
        self
    }

    /// Set the number of tasks
    pub fn with_num_tasks(mut self, num_tasks: usize) -> Self {
        self.num_tasks = num_tasks;
        self
    }

    /// Set episodes per task and the per-episode step cap
    pub fn with_trajectories(mut self, max_num_traj: usize, max_traj_len: usize) -> Self {
        self.max_num_traj = max_num_traj;
        self.max_traj_len = max_traj_len;
        self
    }

    /// Set discount factor
    pub fn with_gamma(mut self, gamma: f64) -> Self {
        self.gamma = gamma;
        self
    }

    /// Set GAE lambda
    pub fn with_tau(mut self, tau: f64) -> Self {
        self.tau = tau;
        self
    }

    /// Set learning rate
    pub fn with_lr(mut self, lr: f64) -> Self {
        self.learning_rate = lr;
        self
    }

    /// Set PPO mini-batch size and epoch count
    pub fn with_ppo(mut self, mini_batch_size: usize, ppo_epochs: usize) -> Self {
        self.mini_batch_size = mini_batch_size;
        self.ppo_epochs = ppo_epochs;
        self
    }

    /// Set hidden size
    pub fn with_hidden_size(mut self, hidden_size: i64) -> Self {
        self.hidden_size = hidden_size;
        self
    }

    /// Enable or disable parameter updates
    pub fn with_update_params(mut self, update_params: bool) -> Self {
        self.update_params = update_params;
        self
    }

    /// Set seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set device
    #[cfg(feature = "torch")]
    pub fn with_device(mut self, device: Device) -> Self {
        self.device = device;
        self
    }

    /// Upper bound on steps one task run can record
    pub fn max_steps_per_task(&self) -> usize {
        self.max_num_traj * self.max_traj_len
    }

    /// Check every constraint for `algorithm`. Called before any
    /// environment interaction.
    pub fn validate(&self, algorithm: Algorithm) -> Result<()> {
        let positive = [
            ("num_actions", self.num_actions),
            ("num_tasks", self.num_tasks),
            ("max_num_traj", self.max_num_traj),
            ("max_traj_len", self.max_traj_len),
        ];
        for (name, value) in positive {
            if value == 0 {
                return Err(Rl2Error::Config(format!("{} must be positive", name)));
            }
        }
        if !(0.0..=1.0).contains(&self.gamma) {
            return Err(Rl2Error::Config(format!(
                "gamma must be in [0, 1], got {}",
                self.gamma
            )));
        }
        if !(self.learning_rate > 0.0 && self.learning_rate.is_finite()) {
            return Err(Rl2Error::Config(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            )));
        }
        if self.hidden_size <= 0 {
            return Err(Rl2Error::Config("hidden_size must be positive".into()));
        }
        if let Some(norm) = self.max_grad_norm {
            if norm <= 0.0 {
                return Err(Rl2Error::Config("max_grad_norm must be positive".into()));
            }
        }

        if algorithm == Algorithm::Ppo {
            if !(0.0..=1.0).contains(&self.tau) {
                return Err(Rl2Error::Config(format!(
                    "tau must be in [0, 1], got {}",
                    self.tau
                )));
            }
            if self.mini_batch_size == 0 || self.ppo_epochs == 0 {
                return Err(Rl2Error::Config(
                    "mini_batch_size and ppo_epochs must be positive".into(),
                ));
            }
            if self.mini_batch_size > self.max_traj_len {
                return Err(Rl2Error::Config(format!(
                    "mini_batch_size ({}) must not exceed max_traj_len ({})",
                    self.mini_batch_size, self.max_traj_len
                )));
            }
            if self.clip_coef <= 0.0 {
                return Err(Rl2Error::Config("clip_coef must be positive".into()));
            }
        }

        Ok(())
    }
}
