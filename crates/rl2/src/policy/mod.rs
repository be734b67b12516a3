//! Recurrent policies.
//!
//! Provides the memory-carrying policies used for meta-training:
//! - `GruPolicy` - GRU with a categorical actor head (REINFORCE)
//! - `GruActorCritic` - GRU with actor and critic heads (PPO)
//!
//! The per-step input follows the RL2 layout built by [`encode_input`]:
//! flattened observation, one-hot previous action, previous reward and the
//! previous episode-boundary flag.

mod distribution;
mod gru;

pub use distribution::Distribution;
pub use gru::{GruActorCritic, GruPolicy};

use crate::spaces::Discrete;
use tch::{nn, Device, Kind, Tensor};

/// Trait for policies that have a VarStore for optimization
pub trait HasVarStore {
    /// Get mutable reference to the VarStore
    fn var_store_mut(&mut self) -> &mut nn::VarStore;

    /// Get reference to the VarStore
    fn var_store(&self) -> &nn::VarStore;
}

/// Output of one recurrent step
pub struct PolicyOutput {
    /// Action distribution, shape `[batch, num_actions]`
    pub dist: Distribution,
    /// Value estimate, shape `[batch]`; `None` for actor-only policies
    pub value: Option<Tensor>,
    /// Hidden state after the step, shape `[1, batch, hidden_size]`
    pub hidden: Tensor,
}

/// Policy whose hidden state carries task information across episodes.
///
/// The carried hidden state is reset only through [`RecurrentPolicy::reset_state`],
/// which the collector calls at every task boundary.
pub trait RecurrentPolicy: HasVarStore + Send {
    /// Pure step: `inputs` is `[batch, input_size]`, `hidden` is
    /// `[1, batch, hidden_size]`. Does not touch the carried state.
    fn forward(&self, inputs: &Tensor, hidden: &Tensor) -> PolicyOutput;

    /// The fixed initial hidden state, shape `[1, 1, hidden_size]`
    fn initial_state(&self) -> Tensor;

    /// Currently carried hidden state
    fn hidden_state(&self) -> &Tensor;

    /// Replace the carried hidden state
    fn set_hidden_state(&mut self, hidden: Tensor);

    /// Restore the carried hidden state to the initial value
    fn reset_state(&mut self) {
        let initial = self.initial_state();
        self.set_hidden_state(initial);
    }

    /// Step from the carried hidden state and advance it
    fn act(&mut self, inputs: &Tensor) -> PolicyOutput {
        let output = self.forward(inputs, self.hidden_state());
        self.set_hidden_state(output.hidden.shallow_clone());
        output
    }

    /// Size of the discrete action space
    fn num_actions(&self) -> i64;

    /// Width of the per-step input
    fn input_size(&self) -> i64;

    /// GRU hidden size
    fn hidden_size(&self) -> i64;

    /// Whether `forward` returns a value estimate
    fn has_critic(&self) -> bool;

    /// Device the parameters live on
    fn device(&self) -> Device;

    /// Number of trainable parameters
    fn num_parameters(&self) -> usize {
        self.var_store()
            .trainable_variables()
            .iter()
            .map(|t| t.numel())
            .sum()
    }
}

/// Input width for an observation of `obs_dim` features and `num_actions`
/// discrete actions.
pub fn input_size(obs_dim: usize, num_actions: usize) -> i64 {
    (obs_dim + num_actions + 2) as i64
}

/// Build one policy input row `[1, input_size]`.
///
/// `prev_action` is `None` at the first step of a task, which zeros the
/// action, reward and boundary features.
pub fn encode_input(
    observation: &[f32],
    action_space: &Discrete,
    prev_action: Option<usize>,
    prev_reward: f32,
    prev_done: bool,
    device: Device,
) -> Tensor {
    let mut features = Vec::with_capacity(observation.len() + action_space.n + 2);
    features.extend_from_slice(observation);

    match prev_action {
        Some(action) => {
            features.extend(action_space.one_hot(action));
            features.push(prev_reward);
            features.push(if prev_done { 1.0 } else { 0.0 });
        }
        None => features.resize(observation.len() + action_space.n + 2, 0.0),
    }

    Tensor::from_slice(&features)
        .to_kind(Kind::Float)
        .reshape([1, -1])
        .to_device(device)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_size() {
        assert_eq!(input_size(1, 5), 8);
        assert_eq!(input_size(10, 5), 17);
    }

    #[test]
    fn test_encode_first_step_is_zeroed() {
        let row = encode_input(&[1.0], &Discrete::new(3), None, 5.0, true, Device::Cpu);
        assert_eq!(row.size(), vec![1, 6]);
        let values: Vec<f32> = Vec::<f32>::try_from(row.reshape([-1])).unwrap();
        assert_eq!(values, vec![1.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_encode_previous_transition() {
        let row = encode_input(&[0.0, 1.0], &Discrete::new(3), Some(2), 0.5, true, Device::Cpu);
        let values: Vec<f32> = Vec::<f32>::try_from(row.reshape([-1])).unwrap();
        assert_eq!(values, vec![0.0, 1.0, 0.0, 0.0, 1.0, 0.5, 1.0]);
    }
}
