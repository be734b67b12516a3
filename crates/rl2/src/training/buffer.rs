//! Trajectory storage for one task run.

use tch::{Kind, Tensor};

/// One recorded environment step
#[derive(Debug)]
pub struct TrajectoryStep {
    /// Policy input row `[1, input_size]`
    pub input: Tensor,
    /// Detached hidden state that entered the step `[1, 1, hidden_size]`
    pub hidden_in: Tensor,
    /// Sampled action index
    pub action: i64,
    /// Log-probability of `action`; keeps its graph when collected with gradients
    pub log_prob: Tensor,
    /// Critic estimate, if the policy has one
    pub value: Option<f32>,
    /// Entropy of the action distribution at this step
    pub entropy: f32,
    /// Reward received
    pub reward: f32,
    /// Environment reported a terminal state (truncation is non-terminal)
    pub done: bool,
    /// Episode index within the task
    pub episode: usize,
}

/// Ordered steps of one task's meta-episode
#[derive(Debug, Default)]
pub struct TrajectoryBatch {
    /// Task index within the run
    pub task: usize,
    /// Steps in collection order
    pub steps: Vec<TrajectoryStep>,
    /// Return of each finished episode
    pub episode_returns: Vec<f32>,
}

impl TrajectoryBatch {
    /// Create an empty batch for `task`
    pub fn new(task: usize) -> Self {
        Self {
            task,
            steps: Vec::new(),
            episode_returns: Vec::new(),
        }
    }

    pub fn push(&mut self, step: TrajectoryStep) {
        self.steps.push(step);
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Number of episodes with at least one step
    pub fn num_episodes(&self) -> usize {
        self.episode_returns.len()
    }

    pub fn rewards(&self) -> Vec<f32> {
        self.steps.iter().map(|s| s.reward).collect()
    }

    pub fn dones(&self) -> Vec<bool> {
        self.steps.iter().map(|s| s.done).collect()
    }

    pub fn actions(&self) -> Vec<i64> {
        self.steps.iter().map(|s| s.action).collect()
    }

    /// Critic estimates, `None` if any step lacks one
    pub fn values(&self) -> Option<Vec<f32>> {
        self.steps.iter().map(|s| s.value).collect()
    }

    /// Sum of rewards over the whole meta-episode
    pub fn total_reward(&self) -> f32 {
        self.steps.iter().map(|s| s.reward).sum()
    }

    /// Mean per-step entropy
    pub fn mean_entropy(&self) -> f32 {
        if self.steps.is_empty() {
            return 0.0;
        }
        self.steps.iter().map(|s| s.entropy).sum::<f32>() / self.steps.len() as f32
    }

    /// Log-probabilities stacked to `[T]`
    pub fn log_probs(&self) -> Tensor {
        let parts: Vec<&Tensor> = self.steps.iter().map(|s| &s.log_prob).collect();
        Tensor::stack(&parts, 0)
    }

    /// Inputs concatenated to `[T, input_size]`
    pub fn inputs(&self) -> Tensor {
        let parts: Vec<&Tensor> = self.steps.iter().map(|s| &s.input).collect();
        Tensor::cat(&parts, 0)
    }

    /// Entering hidden states concatenated along the batch axis `[1, T, hidden_size]`
    pub fn hidden_ins(&self) -> Tensor {
        let parts: Vec<&Tensor> = self.steps.iter().map(|s| &s.hidden_in).collect();
        Tensor::cat(&parts, 1)
    }

    /// Actions as an index tensor `[T]`
    pub fn action_tensor(&self) -> Tensor {
        Tensor::from_slice(&self.actions()).to_kind(Kind::Int64)
    }
}
