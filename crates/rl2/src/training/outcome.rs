//! Results of a meta-training or evaluation run.

use super::buffer::TrajectoryBatch;
use serde::Serialize;
use std::collections::HashMap;

/// Per-task statistics of one optimizer-step run
#[derive(Clone, Debug, Default, Serialize)]
pub struct TaskMetrics {
    /// Task index within the run
    pub task: usize,
    /// Sum of rewards over the meta-episode
    pub total_reward: f32,
    /// Mean return of the finished episodes
    pub mean_episode_return: f32,
    /// Recorded steps
    pub num_steps: usize,
    /// Played episodes
    pub num_episodes: usize,
    /// Mean action entropy during collection
    pub entropy: f32,
    /// Policy loss (mean over mini-batches for PPO)
    pub policy_loss: Option<f64>,
    /// Critic loss (PPO)
    pub value_loss: Option<f64>,
    /// Approximate KL between collection and updated policy (PPO)
    pub approx_kl: Option<f64>,
    /// Fraction of clipped ratios (PPO)
    pub clip_fraction: Option<f64>,
    /// Mean entropy of the replayed mini-batches (PPO)
    pub update_entropy: Option<f64>,
    /// Gradient norm before clipping, when clipping is enabled
    pub grad_norm: Option<f64>,
}

impl TaskMetrics {
    /// Collection statistics of `batch`; loss fields start empty
    pub fn from_batch(batch: &TrajectoryBatch) -> Self {
        let mean_episode_return = if batch.episode_returns.is_empty() {
            0.0
        } else {
            batch.episode_returns.iter().sum::<f32>() / batch.episode_returns.len() as f32
        };
        Self {
            task: batch.task,
            total_reward: batch.total_reward(),
            mean_episode_return,
            num_steps: batch.len(),
            num_episodes: batch.num_episodes(),
            entropy: batch.mean_entropy(),
            ..Default::default()
        }
    }

    /// Flatten into a metric map for a `MetricLogger`
    pub fn to_map(&self) -> HashMap<String, f64> {
        let mut map = HashMap::new();
        map.insert("task_reward".to_string(), self.total_reward as f64);
        map.insert(
            "mean_episode_return".to_string(),
            self.mean_episode_return as f64,
        );
        map.insert("entropy".to_string(), self.entropy as f64);
        let optional = [
            ("policy_loss", self.policy_loss),
            ("value_loss", self.value_loss),
            ("approx_kl", self.approx_kl),
            ("clip_fraction", self.clip_fraction),
            ("update_entropy", self.update_entropy),
            ("grad_norm", self.grad_norm),
        ];
        for (name, value) in optional {
            if let Some(value) = value {
                map.insert(name.to_string(), value);
            }
        }
        map
    }
}

/// Reward and action logs of a run, plus the (possibly updated) policy
pub struct MetaTrainOutcome<P> {
    /// Summed reward per task
    pub rewards: Vec<f32>,
    /// Action sequence per task
    pub actions: Vec<Vec<i64>>,
    /// Per-task statistics
    pub metrics: Vec<TaskMetrics>,
    /// The policy after the run
    pub policy: P,
}

impl<P> MetaTrainOutcome<P> {
    /// Mean of the per-task rewards
    pub fn mean_reward(&self) -> f32 {
        crate::utils::mean(&self.rewards).unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_map_skips_missing() {
        let metrics = TaskMetrics {
            total_reward: 4.0,
            policy_loss: Some(0.25),
            ..Default::default()
        };
        let map = metrics.to_map();

        assert_eq!(map.get("task_reward"), Some(&4.0));
        assert_eq!(map.get("policy_loss"), Some(&0.25));
        assert!(!map.contains_key("approx_kl"));
        assert!(!map.contains_key("update_entropy"));
    }
}
