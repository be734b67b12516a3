//! GRU policies.

use super::{Distribution, HasVarStore, PolicyOutput, RecurrentPolicy};
use tch::{nn, nn::Module, nn::RNN, Device, Kind, Tensor};

/// GRU cell plus the fixed initial and the carried hidden state
struct GruCore {
    gru: nn::GRU,
    /// Drawn once from a standard normal; stored in the VarStore without
    /// gradients so checkpoints restore it exactly
    initial_hidden: Tensor,
    hidden: Tensor,
    input_size: i64,
    hidden_size: i64,
    device: Device,
}

impl GruCore {
    fn new(root: &nn::Path, input_size: i64, hidden_size: i64, device: Device) -> Self {
        let gru = nn::gru(root / "gru", input_size, hidden_size, Default::default());

        let mut initial_hidden = root.zeros_no_train("initial_hidden", &[1, 1, hidden_size]);
        tch::no_grad(|| {
            initial_hidden.copy_(&Tensor::randn([1, 1, hidden_size], (Kind::Float, device)))
        });
        let hidden = initial_hidden.copy();

        Self {
            gru,
            initial_hidden,
            hidden,
            input_size,
            hidden_size,
            device,
        }
    }

    /// One GRU step, returns the new hidden state `[1, batch, hidden_size]`
    fn step(&self, inputs: &Tensor, hidden: &Tensor) -> Tensor {
        let inputs = inputs.to_device(self.device).to_kind(Kind::Float);
        let state = self
            .gru
            .step(&inputs, &nn::GRUState(hidden.to_device(self.device)));
        state.0
    }

    fn initial_state(&self) -> Tensor {
        self.initial_hidden.detach().copy()
    }
}

/// Actor-only GRU policy
pub struct GruPolicy {
    vs: nn::VarStore,
    core: GruCore,
    actor: nn::Linear,
    num_actions: i64,
}

impl GruPolicy {
    /// Create a new GRU policy
    pub fn new(input_size: i64, num_actions: i64, hidden_size: i64, device: Device) -> Self {
        let vs = nn::VarStore::new(device);
        let root = vs.root();

        let core = GruCore::new(&root, input_size, hidden_size, device);
        let actor = nn::linear(
            &root / "actor",
            hidden_size,
            num_actions,
            Default::default(),
        );

        Self {
            vs,
            core,
            actor,
            num_actions,
        }
    }
}

impl HasVarStore for GruPolicy {
    fn var_store_mut(&mut self) -> &mut nn::VarStore {
        &mut self.vs
    }

    fn var_store(&self) -> &nn::VarStore {
        &self.vs
    }
}

impl RecurrentPolicy for GruPolicy {
    fn forward(&self, inputs: &Tensor, hidden: &Tensor) -> PolicyOutput {
        let hidden = self.core.step(inputs, hidden);
        let logits = self.actor.forward(&hidden.squeeze_dim(0));
        PolicyOutput {
            dist: Distribution::Categorical { logits },
            value: None,
            hidden,
        }
    }

    fn initial_state(&self) -> Tensor {
        self.core.initial_state()
    }

    fn hidden_state(&self) -> &Tensor {
        &self.core.hidden
    }

    fn set_hidden_state(&mut self, hidden: Tensor) {
        self.core.hidden = hidden;
    }

    fn num_actions(&self) -> i64 {
        self.num_actions
    }

    fn input_size(&self) -> i64 {
        self.core.input_size
    }

    fn hidden_size(&self) -> i64 {
        self.core.hidden_size
    }

    fn has_critic(&self) -> bool {
        false
    }

    fn device(&self) -> Device {
        self.core.device
    }
}

/// GRU with actor and critic heads on the shared hidden state
pub struct GruActorCritic {
    vs: nn::VarStore,
    core: GruCore,
    actor: nn::Linear,
    critic: nn::Linear,
    num_actions: i64,
}

impl GruActorCritic {
    /// Create a new GRU actor-critic
    pub fn new(input_size: i64, num_actions: i64, hidden_size: i64, device: Device) -> Self {
        let vs = nn::VarStore::new(device);
        let root = vs.root();

        let core = GruCore::new(&root, input_size, hidden_size, device);
        let actor = nn::linear(
            &root / "actor",
            hidden_size,
            num_actions,
            Default::default(),
        );
        let critic = nn::linear(&root / "critic", hidden_size, 1, Default::default());

        Self {
            vs,
            core,
            actor,
            critic,
            num_actions,
        }
    }
}

impl HasVarStore for GruActorCritic {
    fn var_store_mut(&mut self) -> &mut nn::VarStore {
        &mut self.vs
    }

    fn var_store(&self) -> &nn::VarStore {
        &self.vs
    }
}

impl RecurrentPolicy for GruActorCritic {
    fn forward(&self, inputs: &Tensor, hidden: &Tensor) -> PolicyOutput {
        let hidden = self.core.step(inputs, hidden);
        let features = hidden.squeeze_dim(0);
        let logits = self.actor.forward(&features);
        let value = self.critic.forward(&features).squeeze_dim(-1);
        PolicyOutput {
            dist: Distribution::Categorical { logits },
            value: Some(value),
            hidden,
        }
    }

    fn initial_state(&self) -> Tensor {
        self.core.initial_state()
    }

    fn hidden_state(&self) -> &Tensor {
        &self.core.hidden
    }

    fn set_hidden_state(&mut self, hidden: Tensor) {
        self.core.hidden = hidden;
    }

    fn num_actions(&self) -> i64 {
        self.num_actions
    }

    fn input_size(&self) -> i64 {
        self.core.input_size
    }

    fn hidden_size(&self) -> i64 {
        self.core.hidden_size
    }

    fn has_critic(&self) -> bool {
        true
    }

    fn device(&self) -> Device {
        self.core.device
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkpoint::{load_policy, save_policy, CheckpointMetadata};
    use crate::config::Algorithm;

    #[test]
    fn test_policy_forward_shapes() {
        let policy = GruPolicy::new(8, 5, 16, Device::Cpu);
        let inputs = Tensor::zeros([3, 8], (Kind::Float, Device::Cpu));
        let hidden = policy.initial_state().repeat([1, 3, 1]);

        let out = policy.forward(&inputs, &hidden);
        assert_eq!(out.dist.num_actions(), 5);
        assert_eq!(out.hidden.size(), vec![1, 3, 16]);
        assert!(out.value.is_none());
    }

    #[test]
    fn test_actor_critic_value_shape() {
        let model = GruActorCritic::new(8, 5, 16, Device::Cpu);
        let inputs = Tensor::zeros([4, 8], (Kind::Float, Device::Cpu));
        let hidden = model.initial_state().repeat([1, 4, 1]);

        let out = model.forward(&inputs, &hidden);
        assert_eq!(out.value.unwrap().size(), vec![4]);
        assert!(model.has_critic());
    }

    #[test]
    fn test_initial_hidden_not_trainable() {
        let policy = GruPolicy::new(8, 5, 16, Device::Cpu);
        let trainable: usize = policy.num_parameters();
        let all: usize = policy
            .var_store()
            .variables()
            .values()
            .map(|t| t.numel())
            .sum();
        assert_eq!(all - trainable, 16);
    }

    #[test]
    fn test_act_advances_and_reset_restores() {
        let mut policy = GruPolicy::new(8, 5, 16, Device::Cpu);
        let initial = policy.initial_state();
        assert!(policy.hidden_state().equal(&initial));

        let inputs = Tensor::ones([1, 8], (Kind::Float, Device::Cpu));
        tch::no_grad(|| policy.act(&inputs));
        assert!(!policy.hidden_state().equal(&initial));

        policy.reset_state();
        assert!(policy.hidden_state().equal(&initial));
    }

    #[test]
    fn test_checkpoint_restores_initial_hidden() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reinforce_bandit.pt");
        let meta = CheckpointMetadata::new(Algorithm::Reinforce, "bandit", 5, 8, 16);

        let policy = GruPolicy::new(8, 5, 16, Device::Cpu);
        save_policy(&policy, &meta, &path).unwrap();

        let mut restored = GruPolicy::new(8, 5, 16, Device::Cpu);
        assert!(!restored.initial_state().equal(&policy.initial_state()));

        load_policy(&mut restored, &path, &meta).unwrap();
        assert!(restored.initial_state().equal(&policy.initial_state()));
        assert!(restored.hidden_state().equal(&policy.initial_state()));
    }

    #[test]
    fn test_checkpoint_rejects_action_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reinforce_bandit.pt");
        let policy = GruPolicy::new(8, 5, 16, Device::Cpu);
        save_policy(
            &policy,
            &CheckpointMetadata::new(Algorithm::Reinforce, "bandit", 5, 8, 16),
            &path,
        )
        .unwrap();

        let mut other = GruPolicy::new(6, 3, 16, Device::Cpu);
        let requested = CheckpointMetadata::new(Algorithm::Reinforce, "bandit", 3, 6, 16);
        let result = load_policy(&mut other, &path, &requested);
        assert!(matches!(result, Err(crate::Rl2Error::ShapeMismatch { .. })));
    }
}
