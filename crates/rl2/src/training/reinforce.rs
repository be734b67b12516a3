//! REINFORCE over a task distribution.

use super::buffer::TrajectoryBatch;
use super::collector::collect_task;
use super::losses::reinforce_loss;
use super::optimizer::PolicyOptimizer;
use super::outcome::{MetaTrainOutcome, TaskMetrics};
use super::returns::{discounted_returns, normalize_returns};
use super::task_progress;
use crate::config::{Algorithm, Rl2Config};
use crate::env::TaskEnv;
use crate::log::{MetricLogger, NoOpLogger};
use crate::policy::RecurrentPolicy;
use crate::{Result, Rl2Error};
use std::time::Instant;
use tch::{Kind, Tensor};

/// Loss of one task run: `-sum(log_prob_t * normalized_return_t)`.
///
/// An empty batch has no defined loss and fails with `EmptyBatch`.
pub fn reinforce_task_loss(batch: &TrajectoryBatch, gamma: f64) -> Result<Tensor> {
    if batch.is_empty() {
        return Err(Rl2Error::EmptyBatch { task: batch.task });
    }
    let returns = normalize_returns(&discounted_returns(&batch.rewards(), gamma))?;
    let log_probs = batch.log_probs();
    let weights = Tensor::from_slice(&returns)
        .to_kind(Kind::Float)
        .to_device(log_probs.device());
    Ok(reinforce_loss(&log_probs, &weights))
}

/// Run REINFORCE over `tasks`, one gradient step per task.
pub fn reinforce<P, O, T, E, F>(
    policy: P,
    optimizer: &mut O,
    tasks: &[T],
    make_env: F,
    config: &Rl2Config,
) -> Result<MetaTrainOutcome<P>>
where
    P: RecurrentPolicy,
    O: PolicyOptimizer,
    E: TaskEnv,
    F: FnMut(&T) -> Result<E>,
{
    reinforce_with_logger(policy, optimizer, tasks, make_env, config, &NoOpLogger)
}

/// [`reinforce`] reporting per-task metrics to `logger`.
pub fn reinforce_with_logger<P, O, T, E, F>(
    mut policy: P,
    optimizer: &mut O,
    tasks: &[T],
    mut make_env: F,
    config: &Rl2Config,
    logger: &dyn MetricLogger,
) -> Result<MetaTrainOutcome<P>>
where
    P: RecurrentPolicy,
    O: PolicyOptimizer,
    E: TaskEnv,
    F: FnMut(&T) -> Result<E>,
{
    config.validate(Algorithm::Reinforce)?;
    check_run(&policy, tasks.len(), config)?;

    let start_time = Instant::now();
    let progress = task_progress(tasks.len(), config.show_progress);
    let mut rewards = Vec::with_capacity(tasks.len());
    let mut actions = Vec::with_capacity(tasks.len());
    let mut all_metrics = Vec::with_capacity(tasks.len());

    for (index, task) in tasks.iter().enumerate() {
        let mut env = make_env(task)?;
        let batch = collect_task(
            &mut policy,
            &mut env,
            index,
            config.max_num_traj,
            config.max_traj_len,
            config.update_params,
        )?;
        if batch.is_empty() {
            return Err(Rl2Error::EmptyBatch { task: index });
        }

        let mut metrics = TaskMetrics::from_batch(&batch);

        if config.update_params {
            let loss = reinforce_task_loss(&batch, config.gamma)?;
            let loss_value = loss.double_value(&[]);
            if !loss_value.is_finite() {
                return Err(Rl2Error::Numerical(format!(
                    "REINFORCE loss is {} on task {}",
                    loss_value, index
                )));
            }

            optimizer.zero_grad();
            loss.backward();
            if let Some(max_norm) = config.max_grad_norm {
                metrics.grad_norm = Some(optimizer.clip_grad_norm(max_norm));
            }
            optimizer.step();
            metrics.policy_loss = Some(loss_value);
        }

        // Release the graph held by the carried state
        let detached = policy.hidden_state().detach();
        policy.set_hidden_state(detached);

        tracing::debug!(
            task = index,
            reward = metrics.total_reward,
            steps = metrics.num_steps,
            loss = ?metrics.policy_loss,
            "REINFORCE task done"
        );
        logger.log_metrics(&metrics.to_map(), index as u64);

        rewards.push(metrics.total_reward);
        actions.push(batch.actions());
        all_metrics.push(metrics);

        if let Some(pb) = &progress {
            pb.inc(1);
        }
    }

    if let Some(pb) = &progress {
        pb.finish_with_message("done");
    }

    let outcome = MetaTrainOutcome {
        rewards,
        actions,
        metrics: all_metrics,
        policy,
    };
    tracing::info!(
        algo = "reinforce",
        tasks = tasks.len(),
        mean_reward = outcome.mean_reward(),
        updated = config.update_params,
        elapsed = %crate::utils::format_duration(start_time.elapsed().as_secs_f64()),
        "Run finished"
    );
    Ok(outcome)
}

/// Shared pre-flight checks of both optimizer steps
pub(crate) fn check_run<P: RecurrentPolicy>(
    policy: &P,
    num_tasks: usize,
    config: &Rl2Config,
) -> Result<()> {
    if num_tasks == 0 {
        return Err(Rl2Error::Config("no tasks to run".into()));
    }
    if policy.num_actions() as usize != config.num_actions {
        return Err(Rl2Error::ShapeMismatch {
            expected: vec![config.num_actions],
            actual: vec![policy.num_actions() as usize],
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::{input_size, GruPolicy, HasVarStore};
    use crate::training::collector::tests::FixedArms;
    use crate::training::OptimizerKind;
    use tch::Device;

    fn setup(num_actions: usize) -> (GruPolicy, Rl2Config) {
        let config = Rl2Config::default()
            .with_num_actions(num_actions)
            .with_num_tasks(3)
            .with_trajectories(10, 1)
            .with_gamma(0.99)
            .with_hidden_size(16);
        let policy = GruPolicy::new(
            input_size(1, num_actions),
            num_actions as i64,
            config.hidden_size,
            Device::Cpu,
        );
        (policy, config)
    }

    fn make_env(payouts: &Vec<f32>) -> Result<FixedArms> {
        Ok(FixedArms {
            payouts: payouts.clone(),
            steps: 0,
        })
    }

    fn snapshot(policy: &GruPolicy) -> Vec<Tensor> {
        policy
            .var_store()
            .trainable_variables()
            .iter()
            .map(|t| t.copy())
            .collect()
    }

    fn unchanged(before: &[Tensor], policy: &GruPolicy) -> bool {
        before
            .iter()
            .zip(policy.var_store().trainable_variables().iter())
            .all(|(a, b)| a.equal(b))
    }

    #[test]
    fn test_one_reward_per_task() {
        let (policy, config) = setup(2);
        let mut optimizer = OptimizerKind::Sgd
            .build(policy.var_store(), config.learning_rate)
            .unwrap();
        let tasks = vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![0.5, 0.5]];

        let outcome = reinforce(policy, &mut optimizer, &tasks, make_env, &config).unwrap();

        assert_eq!(outcome.rewards.len(), 3);
        assert_eq!(outcome.actions.len(), 3);
        assert!(outcome.actions.iter().all(|a| a.len() == 10));
        assert!(outcome.metrics.iter().all(|m| m.policy_loss.is_some()));
    }

    #[test]
    fn test_updates_parameters() {
        let (policy, config) = setup(2);
        let before = snapshot(&policy);
        let mut optimizer = OptimizerKind::Sgd
            .build(policy.var_store(), config.learning_rate)
            .unwrap();
        let tasks = vec![vec![1.0, 0.0]];

        let outcome = reinforce(policy, &mut optimizer, &tasks, make_env, &config).unwrap();
        assert!(!unchanged(&before, &outcome.policy));
    }

    #[test]
    fn test_fixed_policy_when_updates_disabled() {
        let (policy, config) = setup(2);
        let config = config.with_update_params(false);
        let before = snapshot(&policy);
        let mut optimizer = OptimizerKind::Adam
            .build(policy.var_store(), config.learning_rate)
            .unwrap();
        let tasks = vec![vec![1.0, 0.0], vec![0.0, 1.0]];

        let outcome = reinforce(policy, &mut optimizer, &tasks, make_env, &config).unwrap();
        assert!(unchanged(&before, &outcome.policy));
        assert!(outcome.metrics.iter().all(|m| m.policy_loss.is_none()));
        assert_eq!(outcome.rewards.len(), 2);
    }

    #[test]
    fn test_empty_batch_fails() {
        let batch = TrajectoryBatch::new(4);
        assert!(matches!(
            reinforce_task_loss(&batch, 0.99),
            Err(Rl2Error::EmptyBatch { task: 4 })
        ));
    }

    #[test]
    fn test_action_count_must_match_config() {
        let (policy, config) = setup(2);
        let config = config.with_num_actions(3);
        let mut optimizer = OptimizerKind::Sgd.build(policy.var_store(), 0.01).unwrap();
        let tasks = vec![vec![1.0, 0.0]];

        let result = reinforce(policy, &mut optimizer, &tasks, make_env, &config);
        assert!(matches!(result, Err(Rl2Error::ShapeMismatch { .. })));
    }
}
