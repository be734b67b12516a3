//! Policy-gradient losses.

use tch::{Kind, Tensor};

/// `-sum(log_prob_t * weight_t)`
pub fn reinforce_loss(log_probs: &Tensor, weights: &Tensor) -> Tensor {
    -(log_probs * weights).sum(Kind::Float)
}

/// Compute PPO clipped policy loss
pub fn ppo_policy_loss(
    advantages: &Tensor,
    log_probs: &Tensor,
    old_log_probs: &Tensor,
    clip_coef: f64,
) -> Tensor {
    let ratio = (log_probs - old_log_probs).exp();

    let surr1 = &ratio * advantages;
    let surr2 = ratio.clamp(1.0 - clip_coef, 1.0 + clip_coef) * advantages;

    -surr1.min_other(&surr2).mean(Kind::Float)
}

/// Mean squared error between value estimates and target returns
pub fn value_loss(values: &Tensor, returns: &Tensor) -> Tensor {
    (values - returns).pow_tensor_scalar(2).mean(Kind::Float)
}

/// Compute KL divergence between old and new log probabilities
pub fn kl_divergence(log_probs: &Tensor, old_log_probs: &Tensor) -> Tensor {
    (old_log_probs - log_probs).mean(Kind::Float)
}

/// Fraction of samples whose ratio left the clip range
pub fn clip_fraction(log_probs: &Tensor, old_log_probs: &Tensor, clip_coef: f64) -> Tensor {
    let ratio = (log_probs - old_log_probs).exp();
    (ratio - 1.0)
        .abs()
        .gt(clip_coef)
        .to_kind(Kind::Float)
        .mean(Kind::Float)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tch::Device;

    #[test]
    fn test_ratio_one_surrogate_is_negative_mean_advantage() {
        let advantages = Tensor::from_slice(&[1.0f32, -2.0, 0.5, 3.0]);
        let log_probs = Tensor::from_slice(&[-0.3f32, -1.2, -0.7, -2.0]);

        let loss = ppo_policy_loss(&advantages, &log_probs, &log_probs, 0.2);
        let expected = -advantages.mean(Kind::Float).double_value(&[]);
        assert!((loss.double_value(&[]) - expected).abs() < 1e-6);
        assert_eq!(
            clip_fraction(&log_probs, &log_probs, 0.2).double_value(&[]),
            0.0
        );
    }

    #[test]
    fn test_surrogate_clips_large_ratio() {
        let advantages = Tensor::from_slice(&[1.0f32]);
        let old = Tensor::from_slice(&[(0.1f32).ln()]);
        let new = Tensor::from_slice(&[(0.5f32).ln()]);

        // ratio 5 clipped to 1.2
        let loss = ppo_policy_loss(&advantages, &new, &old, 0.2);
        assert!((loss.double_value(&[]) + 1.2).abs() < 1e-5);
        assert_eq!(clip_fraction(&new, &old, 0.2).double_value(&[]), 1.0);
    }

    #[test]
    fn test_reinforce_loss() {
        let log_probs = Tensor::from_slice(&[-1.0f32, -0.5]);
        let weights = Tensor::from_slice(&[1.0f32, -1.0]);
        let loss = reinforce_loss(&log_probs, &weights);
        assert!((loss.double_value(&[]) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_value_loss() {
        let values = Tensor::zeros([2], (Kind::Float, Device::Cpu));
        let returns = Tensor::from_slice(&[1.0f32, 3.0]);
        assert!((value_loss(&values, &returns).double_value(&[]) - 5.0).abs() < 1e-6);
    }

    #[test]
    fn test_kl_zero_for_identical() {
        let lp = Tensor::from_slice(&[-0.1f32, -2.0]);
        assert_eq!(kl_divergence(&lp, &lp).double_value(&[]), 0.0);
    }
}
