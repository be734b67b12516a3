//! PPO over a task distribution.
//!
//! Each task's meta-episode is collected without gradients. Mini-batches are
//! then replayed one step at a time from the stored entering hidden states,
//! so gradients flow through a single GRU step per sample.

use super::buffer::TrajectoryBatch;
use super::collector::collect_task;
use super::losses::{clip_fraction, kl_divergence, ppo_policy_loss, value_loss};
use super::optimizer::PolicyOptimizer;
use super::outcome::{MetaTrainOutcome, TaskMetrics};
use super::reinforce::check_run;
use super::returns::compute_gae;
use super::task_progress;
use crate::config::{Algorithm, Rl2Config};
use crate::env::TaskEnv;
use crate::log::{MetricLogger, NoOpLogger};
use crate::policy::RecurrentPolicy;
use crate::{Result, Rl2Error};
use std::time::Instant;
use tch::{Kind, Tensor};

/// Mean statistics over the mini-batch updates of one task
#[derive(Clone, Debug, Default)]
pub struct PpoStats {
    pub policy_loss: f64,
    pub value_loss: f64,
    pub entropy: f64,
    pub approx_kl: f64,
    pub clip_fraction: f64,
    pub grad_norm: Option<f64>,
    pub num_updates: usize,
}

/// Run PPO over `tasks`.
pub fn ppo<P, O, T, E, F>(
    model: P,
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
    ppo_with_logger(model, optimizer, tasks, make_env, config, &NoOpLogger)
}

/// [`ppo`] reporting per-task metrics to `logger`.
pub fn ppo_with_logger<P, O, T, E, F>(
    mut model: P,
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
    config.validate(Algorithm::Ppo)?;
    if !model.has_critic() {
        return Err(Rl2Error::Config(
            "PPO requires a policy with a critic head".into(),
        ));
    }
    check_run(&model, tasks.len(), config)?;

    let start_time = Instant::now();
    let progress = task_progress(tasks.len(), config.show_progress);
    let mut rewards = Vec::with_capacity(tasks.len());
    let mut actions = Vec::with_capacity(tasks.len());
    let mut all_metrics = Vec::with_capacity(tasks.len());

    for (index, task) in tasks.iter().enumerate() {
        let mut env = make_env(task)?;
        let batch = collect_task(
            &mut model,
            &mut env,
            index,
            config.max_num_traj,
            config.max_traj_len,
            false,
        )?;
        if batch.is_empty() {
            return Err(Rl2Error::EmptyBatch { task: index });
        }

        let values = batch.values().ok_or_else(|| {
            Rl2Error::Config(format!("task {} was collected without value estimates", index))
        })?;
        let (advantages, returns) = compute_gae(
            &batch.rewards(),
            &values,
            &batch.dones(),
            config.gamma,
            config.tau,
        )?;

        let mut metrics = TaskMetrics::from_batch(&batch);

        if config.update_params {
            let stats = ppo_update(&model, optimizer, &batch, &advantages, &returns, config)?;
            metrics.policy_loss = Some(stats.policy_loss);
            metrics.value_loss = Some(stats.value_loss);
            metrics.approx_kl = Some(stats.approx_kl);
            metrics.clip_fraction = Some(stats.clip_fraction);
            metrics.update_entropy = Some(stats.entropy);
            metrics.grad_norm = stats.grad_norm;
        }

        tracing::debug!(
            task = index,
            reward = metrics.total_reward,
            steps = metrics.num_steps,
            policy_loss = ?metrics.policy_loss,
            value_loss = ?metrics.value_loss,
            approx_kl = ?metrics.approx_kl,
            "PPO task done"
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
        policy: model,
    };
    tracing::info!(
        algo = "ppo",
        tasks = tasks.len(),
        mean_reward = outcome.mean_reward(),
        updated = config.update_params,
        elapsed = %crate::utils::format_duration(start_time.elapsed().as_secs_f64()),
        "Run finished"
    );
    Ok(outcome)
}

/// `ppo_epochs` passes over shuffled mini-batches of one task's batch,
/// one optimizer step per mini-batch.
pub fn ppo_update<P, O>(
    model: &P,
    optimizer: &mut O,
    batch: &TrajectoryBatch,
    advantages: &[f32],
    returns: &[f32],
    config: &Rl2Config,
) -> Result<PpoStats>
where
    P: RecurrentPolicy + ?Sized,
    O: PolicyOptimizer,
{
    let device = model.device();
    let inputs = batch.inputs().to_device(device);
    let hiddens = batch.hidden_ins().to_device(device);
    let actions = batch.action_tensor().to_device(device);
    let old_log_probs = batch.log_probs().detach().to_device(device);
    let advantages = Tensor::from_slice(advantages)
        .to_kind(Kind::Float)
        .to_device(device);
    let returns = Tensor::from_slice(returns)
        .to_kind(Kind::Float)
        .to_device(device);

    let num_steps = batch.len() as i64;
    let mini_batch = (config.mini_batch_size as i64).clamp(1, num_steps.max(1));
    let mut stats = PpoStats::default();

    for _epoch in 0..config.ppo_epochs {
        let perm = Tensor::randperm(num_steps, (Kind::Int64, device));
        let mut start = 0;
        while start < num_steps {
            let len = mini_batch.min(num_steps - start);
            let idx = perm.narrow(0, start, len);
            start += len;

            let output = model.forward(
                &inputs.index_select(0, &idx),
                &hiddens.index_select(1, &idx),
            );
            let new_log_probs = output.dist.log_prob(&actions.index_select(0, &idx));
            let new_values = output.value.ok_or_else(|| {
                Rl2Error::Config("PPO requires a policy with a critic head".into())
            })?;
            let mb_old = old_log_probs.index_select(0, &idx);

            let pg_loss = ppo_policy_loss(
                &advantages.index_select(0, &idx),
                &new_log_probs,
                &mb_old,
                config.clip_coef,
            );
            let v_loss = value_loss(&new_values, &returns.index_select(0, &idx));
            let entropy = output.dist.entropy().mean(Kind::Float);
            let loss = &pg_loss + &v_loss * config.vf_coef - &entropy * config.ent_coef;

            let loss_value = loss.double_value(&[]);
            if !loss_value.is_finite() {
                return Err(Rl2Error::Numerical(format!(
                    "PPO loss is {} on task {}",
                    loss_value, batch.task
                )));
            }

            optimizer.zero_grad();
            loss.backward();
            if let Some(max_norm) = config.max_grad_norm {
                stats.grad_norm = Some(optimizer.clip_grad_norm(max_norm));
            }
            optimizer.step();

            let (kl, clipped) = tch::no_grad(|| {
                (
                    kl_divergence(&new_log_probs, &mb_old).double_value(&[]),
                    clip_fraction(&new_log_probs, &mb_old, config.clip_coef).double_value(&[]),
                )
            });

            stats.policy_loss += pg_loss.double_value(&[]);
            stats.value_loss += v_loss.double_value(&[]);
            stats.entropy += entropy.double_value(&[]);
            stats.approx_kl += kl;
            stats.clip_fraction += clipped;
            stats.num_updates += 1;
        }
    }

    if stats.num_updates > 0 {
        let n = stats.num_updates as f64;
        stats.policy_loss /= n;
        stats.value_loss /= n;
        stats.entropy /= n;
        stats.approx_kl /= n;
        stats.clip_fraction /= n;
    }
    Ok(stats)
}
