//! Action distributions.

use tch::{Kind, Tensor};

/// Distribution over actions produced by a policy head
pub enum Distribution {
    /// Categorical distribution over `logits.size()[-1]` discrete actions
    Categorical { logits: Tensor },
}

impl Distribution {
    /// Number of discrete actions
    pub fn num_actions(&self) -> i64 {
        match self {
            Distribution::Categorical { logits } => logits.size().last().copied().unwrap_or(0),
        }
    }

    /// Action probabilities
    pub fn probs(&self) -> Tensor {
        match self {
            Distribution::Categorical { logits } => logits.softmax(-1, Kind::Float),
        }
    }

    /// Sample action indices, one per leading row
    pub fn sample(&self) -> Tensor {
        match self {
            Distribution::Categorical { logits } => logits
                .softmax(-1, Kind::Float)
                .multinomial(1, true)
                .squeeze_dim(-1),
        }
    }

    /// Most likely action per row
    pub fn mode(&self) -> Tensor {
        match self {
            Distribution::Categorical { logits } => logits.argmax(-1, false),
        }
    }

    /// Log probabilities of `actions`
    pub fn log_prob(&self, actions: &Tensor) -> Tensor {
        match self {
            Distribution::Categorical { logits } => {
                let log_probs = logits.log_softmax(-1, Kind::Float);
                let indices = if actions.dim() == log_probs.dim() {
                    actions.to_kind(Kind::Int64)
                } else {
                    actions.unsqueeze(-1).to_kind(Kind::Int64)
                };
                log_probs.gather(-1, &indices, false).squeeze_dim(-1)
            }
        }
    }

    /// Entropy per row
    pub fn entropy(&self) -> Tensor {
        match self {
            Distribution::Categorical { logits } => {
                let probs = logits.softmax(-1, Kind::Float);
                let log_probs = logits.log_softmax(-1, Kind::Float);
                -(probs * log_probs).sum_dim_intlist(Some(&[-1_i64][..]), false, Kind::Float)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tch::{Device, Kind, Tensor};

    #[test]
    fn test_categorical_sample() {
        let logits = Tensor::from_slice(&[1.0f32, 2.0, 10.0]).reshape([1, 3]);
        let dist = Distribution::Categorical { logits };
        let val = dist.sample().int64_value(&[0]);
        assert!((0..3).contains(&val));
        assert_eq!(dist.mode().int64_value(&[0]), 2);
        assert_eq!(dist.num_actions(), 3);
    }

    #[test]
    fn test_categorical_log_prob_uniform() {
        let logits = Tensor::zeros([2, 4], (Kind::Float, Device::Cpu));
        let dist = Distribution::Categorical { logits };
        let actions = Tensor::from_slice(&[0i64, 3]);

        let log_prob = dist.log_prob(&actions);
        assert_eq!(log_prob.size(), vec![2]);
        let expected = -(4.0f64).ln();
        assert!((log_prob.double_value(&[1]) - expected).abs() < 1e-5);
    }

    #[test]
    fn test_categorical_entropy() {
        let logits = Tensor::zeros([1, 4], (Kind::Float, Device::Cpu));
        let dist = Distribution::Categorical { logits };
        let val = dist.entropy().double_value(&[0]);
        assert!((val - (4.0f64).ln()).abs() < 1e-5);
    }
}
