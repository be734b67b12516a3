//! Command-line arguments.

use clap::Args;
use rl2::config::{Algorithm, Rl2Config};
use rl2_envs::TaskKind;
use std::path::PathBuf;

/// Arguments of `rl2 generate`
#[derive(Args, Debug, Clone)]
pub struct GenerateArgs {
    /// Number of arms for bandits or actions for MDPs
    #[arg(long = "num_actions", default_value_t = 5)]
    pub num_actions: usize,

    /// Number of tasks to sample
    #[arg(long = "num_tasks", default_value_t = 100)]
    pub num_tasks: usize,

    /// Task family [bandit, mdp, 2dnav]
    #[arg(long, default_value = "2dnav")]
    pub task: TaskKind,

    /// Directory the task file is written to
    #[arg(long = "result_folder", default_value = "./experiments")]
    pub result_folder: PathBuf,

    /// Seed of the task sampler
    #[arg(long, default_value_t = 0)]
    pub seed: u64,
}

/// Arguments shared by `rl2 train`, `rl2 eval` and `rl2 run`
#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Number of arms for bandits (MDPs always use 5 actions)
    #[arg(long = "num_actions", default_value_t = 5)]
    pub num_actions: usize,

    /// Trajectories per task during meta-training
    #[arg(long = "max_num_traj", default_value_t = 10)]
    pub max_num_traj: usize,

    /// Seed for task sampling and libtorch
    #[arg(long, default_value_t = 0)]
    pub seed: u64,

    /// Maximum trajectory length
    #[arg(long = "max_traj_len", default_value_t = 1)]
    pub max_traj_len: usize,

    /// Discount factor
    #[arg(long, default_value_t = 0.99)]
    pub gamma: f64,

    /// Lambda in GAE
    #[arg(long, default_value_t = 0.95)]
    pub tau: f64,

    /// Learning rate
    #[arg(long = "learning_rate", default_value_t = 1e-2)]
    pub learning_rate: f64,

    /// Number of tasks to meta-train on
    #[arg(long = "num_tasks", default_value_t = 5)]
    pub num_tasks: usize,

    /// Algorithm [reinforce, ppo]
    #[arg(long, default_value = "reinforce")]
    pub algo: Algorithm,

    /// PPO mini-batch size, must be <= max_traj_len
    #[arg(long = "mini_batch_size", default_value_t = 1)]
    pub mini_batch_size: usize,

    /// PPO epochs per task
    #[arg(long = "ppo_epochs", default_value_t = 1)]
    pub ppo_epochs: usize,

    /// Task family [bandit, mdp]
    #[arg(long, default_value = "bandit")]
    pub task: TaskKind,

    /// Trajectories during evaluation
    #[arg(long = "max_num_traj_eval", default_value_t = 1000)]
    pub max_num_traj_eval: usize,

    /// Checkpoint directory
    #[arg(long = "out_folder", default_value = "./saves/rl2")]
    pub out_folder: PathBuf,

    /// Reuse tasks from a generated task file instead of sampling
    #[arg(long = "tasks_file")]
    pub tasks_file: Option<PathBuf>,

    /// Keep updating parameters during evaluation (test-time fine-tuning)
    #[arg(long = "eval_update_params")]
    pub eval_update_params: bool,

    /// GRU hidden size
    #[arg(long = "hidden_size", default_value_t = 256)]
    pub hidden_size: i64,

    /// PPO clipping coefficient
    #[arg(long = "clip_coef", default_value_t = 0.2)]
    pub clip_coef: f64,

    /// Value loss coefficient
    #[arg(long = "vf_coef", default_value_t = 0.5)]
    pub vf_coef: f64,

    /// Entropy bonus coefficient
    #[arg(long = "ent_coef", default_value_t = 0.0)]
    pub ent_coef: f64,

    /// Clip the global gradient norm
    #[arg(long = "max_grad_norm")]
    pub max_grad_norm: Option<f64>,

    /// Show a progress bar over tasks
    #[arg(long)]
    pub progress: bool,
}

impl RunArgs {
    /// Meta-training configuration for a family with `num_actions` actions
    pub fn train_config(&self, num_actions: usize) -> Rl2Config {
        Rl2Config {
            num_actions,
            num_tasks: self.num_tasks,
            max_num_traj: self.max_num_traj,
            max_traj_len: self.max_traj_len,
            gamma: self.gamma,
            tau: self.tau,
            learning_rate: self.learning_rate,
            mini_batch_size: self.mini_batch_size,
            ppo_epochs: self.ppo_epochs,
            clip_coef: self.clip_coef,
            vf_coef: self.vf_coef,
            ent_coef: self.ent_coef,
            max_grad_norm: self.max_grad_norm,
            hidden_size: self.hidden_size,
            seed: self.seed,
            show_progress: self.progress,
            ..Rl2Config::default()
        }
    }

    /// Evaluation configuration: one task, `max_num_traj_eval` trajectories
    pub fn eval_config(&self, num_actions: usize) -> Rl2Config {
        Rl2Config {
            num_tasks: 1,
            max_num_traj: self.max_num_traj_eval,
            update_params: self.eval_update_params,
            show_progress: false,
            ..self.train_config(num_actions)
        }
    }
}
