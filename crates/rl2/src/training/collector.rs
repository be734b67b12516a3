//! Meta-episode rollouts.
//!
//! A task run resets the policy's hidden state once, then plays
//! `max_num_traj` episodes back to back, resetting only the environment
//! between them. Each episode stops on the environment's done flag or after
//! `max_traj_len` steps.

use super::buffer::{TrajectoryBatch, TrajectoryStep};
use crate::env::{EpisodeStats, TaskEnv};
use crate::policy::{encode_input, input_size, RecurrentPolicy};
use crate::spaces::Discrete;
use crate::{Result, Rl2Error};
use ndarray::{ArrayD, IxDyn};
use tch::Kind;

/// Check that `env` fits the policy's action count and input layout.
pub fn check_env<P, E>(policy: &P, env: &E) -> Result<usize>
where
    P: RecurrentPolicy + ?Sized,
    E: TaskEnv + ?Sized,
{
    let num_actions = policy.num_actions() as usize;
    let action_space = env.action_space();
    match action_space.num_choices() {
        Some(n) if n == num_actions => {}
        Some(n) => {
            return Err(Rl2Error::ShapeMismatch {
                expected: vec![num_actions],
                actual: vec![n],
            })
        }
        None => {
            return Err(Rl2Error::ShapeMismatch {
                expected: vec![num_actions],
                actual: action_space.shape(),
            })
        }
    }

    let obs_dim = env.observation_space().flat_dim();
    let expected = policy.input_size();
    let actual = input_size(obs_dim, num_actions);
    if actual != expected {
        return Err(Rl2Error::ShapeMismatch {
            expected: vec![expected as usize],
            actual: vec![actual as usize],
        });
    }
    Ok(obs_dim)
}

/// Run one task's meta-episode.
///
/// With `track_grad` the recorded log-probabilities keep their graph through
/// the carried hidden state; otherwise the rollout runs under `no_grad`.
pub fn collect_task<P, E>(
    policy: &mut P,
    env: &mut E,
    task: usize,
    max_num_traj: usize,
    max_traj_len: usize,
    track_grad: bool,
) -> Result<TrajectoryBatch>
where
    P: RecurrentPolicy + ?Sized,
    E: TaskEnv + ?Sized,
{
    check_env(&*policy, &*env)?;

    if track_grad {
        rollout(policy, env, task, max_num_traj, max_traj_len)
    } else {
        tch::no_grad(|| rollout(policy, env, task, max_num_traj, max_traj_len))
    }
}

fn rollout<P, E>(
    policy: &mut P,
    env: &mut E,
    task: usize,
    max_num_traj: usize,
    max_traj_len: usize,
) -> Result<TrajectoryBatch>
where
    P: RecurrentPolicy + ?Sized,
    E: TaskEnv + ?Sized,
{
    let action_space = Discrete::new(policy.num_actions() as usize);
    let device = policy.device();
    let mut env = EpisodeStats::new(env);
    let mut batch = TrajectoryBatch::new(task);

    policy.reset_state();

    let mut prev_action: Option<usize> = None;
    let mut prev_reward = 0.0f32;
    let mut prev_boundary = false;

    for episode in 0..max_num_traj {
        let (mut observation, _) = env.reset(None);

        for t in 0..max_traj_len {
            let features: Vec<f32> = observation.iter().copied().collect();
            let input = encode_input(
                &features,
                &action_space,
                prev_action,
                prev_reward,
                prev_boundary,
                device,
            );
            let hidden_in = policy.hidden_state().detach();

            let output = policy.act(&input);
            let action_tensor = output.dist.sample();
            let action = action_tensor.int64_value(&[0]);
            let log_prob = output.dist.log_prob(&action_tensor).squeeze();
            let entropy = output.dist.entropy().double_value(&[0]) as f32;
            let value = output.value.as_ref().map(|v| v.double_value(&[0]) as f32);

            let action_array = ArrayD::from_elem(IxDyn(&[1]), action as f32);
            let result = env.step(&action_array);
            if !result.reward.is_finite() {
                return Err(Rl2Error::EnvError(format!(
                    "task {} returned non-finite reward {}",
                    task, result.reward
                )));
            }

            let capped = t + 1 == max_traj_len;
            batch.push(TrajectoryStep {
                input: input.to_kind(Kind::Float),
                hidden_in,
                action,
                log_prob,
                value,
                entropy,
                reward: result.reward,
                done: result.terminated,
                episode,
            });

            prev_action = Some(action as usize);
            prev_reward = result.reward;
            prev_boundary = result.done() || capped;
            observation = result.observation;

            if result.done() {
                break;
            }
        }
        env.finish();
    }

    batch.episode_returns = env.completed().iter().map(|(ret, _)| *ret).collect();

    tracing::debug!(
        task,
        steps = batch.len(),
        episodes = batch.num_episodes(),
        reward = batch.total_reward(),
        "Collected meta-episode"
    );
    Ok(batch)
}

/// Collect one batch per task, building each environment with `make_env`.
pub fn collect<P, T, E, F>(
    policy: &mut P,
    mut make_env: F,
    tasks: &[T],
    max_num_traj: usize,
    max_traj_len: usize,
    track_grad: bool,
) -> Result<Vec<TrajectoryBatch>>
where
    P: RecurrentPolicy + ?Sized,
    E: TaskEnv,
    F: FnMut(&T) -> Result<E>,
{
    tasks
        .iter()
        .enumerate()
        .map(|(index, task)| {
            let mut env = make_env(task)?;
            collect_task(policy, &mut env, index, max_num_traj, max_traj_len, track_grad)
        })
        .collect()
}
