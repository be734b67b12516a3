//! Meta-training and evaluation drivers.

use crate::args::RunArgs;
use anyhow::{Context, Result};
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rl2::checkpoint::{checkpoint_path, load_policy, load_tasks, save_policy, CheckpointMetadata};
use rl2::config::{Algorithm, Rl2Config};
use rl2::env::TaskEnv;
use rl2::log::{ConsoleLogger, MetricLogger};
use rl2::policy::{input_size, GruActorCritic, GruPolicy, HasVarStore};
use rl2::training::{ppo_with_logger, reinforce_with_logger, MetaTrainOutcome, OptimizerKind};
use rl2::utils::{format_duration, set_seed};
use rl2_envs::{check_tasks, Task};
use std::path::PathBuf;
use std::time::Instant;
use tch::Device;

/// Offset separating the evaluation task stream from the training one
const EVAL_SEED_OFFSET: u64 = 1_000_003;

/// Result of `rl2 train`
pub struct TrainReport {
    pub checkpoint: PathBuf,
    pub rewards: Vec<f32>,
}

/// Result of `rl2 eval`
pub struct EvalReport {
    pub rewards: Vec<f32>,
    pub actions: Vec<Vec<i64>>,
}

fn select_device() -> Device {
    if tch::Cuda::is_available() {
        tracing::info!("Using CUDA");
        Device::Cuda(0)
    } else {
        tracing::info!("Using CPU");
        Device::Cpu
    }
}

/// Environment factory with its own seed stream, independent of task sampling
fn env_factory(seed: u64) -> impl FnMut(&Task) -> rl2::Result<Box<dyn TaskEnv>> {
    let mut env_rng = ChaCha8Rng::seed_from_u64(seed);
    env_rng.set_stream(1);
    move |task: &Task| Ok(task.make_env(env_rng.next_u64()))
}

fn training_tasks(args: &RunArgs, num_actions: usize) -> Result<Vec<Task>> {
    match &args.tasks_file {
        Some(path) => {
            let tasks: Vec<Task> = load_tasks(path)
                .with_context(|| format!("reading task file {}", path.display()))?;
            check_tasks(&tasks, args.task, num_actions)?;
            if tasks.len() != args.num_tasks {
                tracing::warn!(
                    requested = args.num_tasks,
                    loaded = tasks.len(),
                    "Using every task in the task file"
                );
            }
            Ok(tasks)
        }
        None => {
            let mut rng = ChaCha8Rng::seed_from_u64(args.seed);
            Ok(args.task.sample_tasks(num_actions, args.num_tasks, &mut rng))
        }
    }
}

fn metadata(args: &RunArgs, num_actions: usize) -> CheckpointMetadata {
    CheckpointMetadata::new(
        args.algo,
        args.task.as_str(),
        num_actions,
        input_size(args.task.observation_dim(), num_actions),
        args.hidden_size,
    )
}

fn run_reinforce(
    policy: GruPolicy,
    tasks: &[Task],
    config: &Rl2Config,
    optimizer: OptimizerKind,
    logger: &dyn MetricLogger,
) -> Result<MetaTrainOutcome<GruPolicy>> {
    let mut optimizer = optimizer.build(policy.var_store(), config.learning_rate)?;
    let outcome = reinforce_with_logger(
        policy,
        &mut optimizer,
        tasks,
        env_factory(config.seed),
        config,
        logger,
    )?;
    Ok(outcome)
}

fn run_ppo(
    model: GruActorCritic,
    tasks: &[Task],
    config: &Rl2Config,
    logger: &dyn MetricLogger,
) -> Result<MetaTrainOutcome<GruActorCritic>> {
    let mut optimizer = OptimizerKind::Adam.build(model.var_store(), config.learning_rate)?;
    let outcome = ppo_with_logger(
        model,
        &mut optimizer,
        tasks,
        env_factory(config.seed),
        config,
        logger,
    )?;
    Ok(outcome)
}

/// Sample (or load) tasks, meta-train a fresh policy on them and save it to
/// `<out_folder>/<algo>_<task>.pt`.
pub fn meta_train(args: &RunArgs) -> Result<TrainReport> {
    let num_actions = args.task.training_actions(args.num_actions)?;
    let device = select_device();
    let mut config = args.train_config(num_actions).with_device(device);
    config.validate(args.algo)?;

    set_seed(args.seed);
    let tasks = training_tasks(args, num_actions)?;
    config.num_tasks = tasks.len();

    tracing::info!(
        algo = %args.algo,
        env_id = %args.task.env_id(num_actions),
        num_tasks = config.num_tasks,
        max_num_traj = config.max_num_traj,
        max_traj_len = config.max_traj_len,
        "Starting meta-training"
    );

    let start_time = Instant::now();
    let logger = ConsoleLogger::new();
    let meta = metadata(args, num_actions);
    let path = checkpoint_path(&args.out_folder, args.algo, args.task.as_str());

    let rewards = match args.algo {
        Algorithm::Reinforce => {
            let policy = GruPolicy::new(meta.input_size, num_actions as i64, args.hidden_size, device);
            let outcome = run_reinforce(policy, &tasks, &config, OptimizerKind::Sgd, &logger)?;
            save_policy(&outcome.policy, &meta, &path)?;
            outcome.rewards
        }
        Algorithm::Ppo => {
            let model =
                GruActorCritic::new(meta.input_size, num_actions as i64, args.hidden_size, device);
            let outcome = run_ppo(model, &tasks, &config, &logger)?;
            save_policy(&outcome.policy, &meta, &path)?;
            outcome.rewards
        }
    };

    tracing::info!(
        elapsed = %format_duration(start_time.elapsed().as_secs_f64()),
        "Meta-training complete"
    );

    Ok(TrainReport {
        checkpoint: path,
        rewards,
    })
}

/// Reload the checkpoint written by [`meta_train`] and run it on one fresh
/// task for `max_num_traj_eval` trajectories.
pub fn evaluate(args: &RunArgs) -> Result<EvalReport> {
    let num_actions = args.task.training_actions(args.num_actions)?;
    let device = select_device();
    let config = args.eval_config(num_actions).with_device(device);
    config.validate(args.algo)?;

    set_seed(args.seed.wrapping_add(EVAL_SEED_OFFSET));
    let mut rng = ChaCha8Rng::seed_from_u64(args.seed.wrapping_add(EVAL_SEED_OFFSET));
    let tasks = args.task.sample_tasks(num_actions, 1, &mut rng);

    let meta = metadata(args, num_actions);
    let path = checkpoint_path(&args.out_folder, args.algo, args.task.as_str());

    tracing::info!(
        algo = %args.algo,
        env_id = %args.task.env_id(num_actions),
        max_num_traj = config.max_num_traj,
        update_params = config.update_params,
        "Starting evaluation"
    );

    let logger = ConsoleLogger::new().with_prefix("eval");
    let eval_config = Rl2Config {
        seed: args.seed.wrapping_add(EVAL_SEED_OFFSET),
        ..config
    };

    let (rewards, actions) = match args.algo {
        Algorithm::Reinforce => {
            let mut policy =
                GruPolicy::new(meta.input_size, num_actions as i64, args.hidden_size, device);
            load_policy(&mut policy, &path, &meta)
                .with_context(|| format!("loading {}", path.display()))?;
            let outcome = run_reinforce(policy, &tasks, &eval_config, OptimizerKind::Adam, &logger)?;
            (outcome.rewards, outcome.actions)
        }
        Algorithm::Ppo => {
            let mut model =
                GruActorCritic::new(meta.input_size, num_actions as i64, args.hidden_size, device);
            load_policy(&mut model, &path, &meta)
                .with_context(|| format!("loading {}", path.display()))?;
            let outcome = run_ppo(model, &tasks, &eval_config, &logger)?;
            (outcome.rewards, outcome.actions)
        }
    };

    Ok(EvalReport { rewards, actions })
}
