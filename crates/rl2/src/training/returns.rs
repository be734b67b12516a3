//! Discounted returns and generalized advantage estimation.

use crate::{Result, Rl2Error};

/// `return_t = r_t + gamma * return_{t+1}`, with `return_T = 0`
pub fn discounted_returns(rewards: &[f32], gamma: f64) -> Vec<f32> {
    let mut returns = vec![0.0f32; rewards.len()];
    let mut running = 0.0f64;
    for t in (0..rewards.len()).rev() {
        running = rewards[t] as f64 + gamma * running;
        returns[t] = running as f32;
    }
    returns
}

/// Subtract the mean and divide by the population std plus f32 epsilon.
///
/// Constant returns map to zeros.
pub fn normalize_returns(returns: &[f32]) -> Result<Vec<f32>> {
    if returns.is_empty() {
        return Err(Rl2Error::Numerical(
            "cannot normalize an empty return sequence".into(),
        ));
    }
    let n = returns.len() as f64;
    let mean = returns.iter().map(|&r| r as f64).sum::<f64>() / n;
    let var = returns
        .iter()
        .map(|&r| (r as f64 - mean).powi(2))
        .sum::<f64>()
        / n;
    let denom = var.sqrt() + f32::EPSILON as f64;

    let normalized: Vec<f32> = returns
        .iter()
        .map(|&r| ((r as f64 - mean) / denom) as f32)
        .collect();
    if normalized.iter().any(|v| !v.is_finite()) {
        return Err(Rl2Error::Numerical("non-finite normalized return".into()));
    }
    Ok(normalized)
}

/// Generalized advantage estimation over one batch.
///
/// The value after the last step is taken as zero. Returns
/// `(advantages, target_returns)` with `target_t = advantage_t + v_t`.
pub fn compute_gae(
    rewards: &[f32],
    values: &[f32],
    dones: &[bool],
    gamma: f64,
    tau: f64,
) -> Result<(Vec<f32>, Vec<f32>)> {
    if rewards.len() != values.len() || rewards.len() != dones.len() {
        return Err(Rl2Error::ShapeMismatch {
            expected: vec![rewards.len()],
            actual: vec![values.len(), dones.len()],
        });
    }

    let steps = rewards.len();
    let mut advantages = vec![0.0f32; steps];
    let mut last_gae = 0.0f64;

    for t in (0..steps).rev() {
        let next_value = if t + 1 < steps { values[t + 1] as f64 } else { 0.0 };
        let not_done = if dones[t] { 0.0 } else { 1.0 };
        let v = values[t] as f64;

        let delta = rewards[t] as f64 + gamma * next_value * not_done - v;
        last_gae = delta + gamma * tau * not_done * last_gae;
        advantages[t] = last_gae as f32;
    }

    let returns = advantages
        .iter()
        .zip(values)
        .map(|(a, v)| a + v)
        .collect();
    Ok((advantages, returns))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: &[f32], b: &[f32]) {
        assert_eq!(a.len(), b.len());
        for (x, y) in a.iter().zip(b) {
            assert!((x - y).abs() < 1e-5, "{:?} != {:?}", a, b);
        }
    }

    #[test]
    fn test_discounted_returns_hand_built() {
        let returns = discounted_returns(&[1.0, 1.0, 1.0], 0.9);
        assert_close(&returns, &[2.71, 1.9, 1.0]);
    }

    #[test]
    fn test_discounted_recurrence() {
        let rewards = [0.5, -1.0, 2.0, 0.0, 1.0];
        let gamma = 0.95;
        let returns = discounted_returns(&rewards, gamma);
        for t in 0..rewards.len() - 1 {
            let expected = rewards[t] + gamma as f32 * returns[t + 1];
            assert!((returns[t] - expected).abs() < 1e-5);
        }
        assert_eq!(returns[4], 1.0);
    }

    #[test]
    fn test_normalize() {
        let normalized = normalize_returns(&[1.0, 2.0, 3.0]).unwrap();
        let mean: f32 = normalized.iter().sum::<f32>() / 3.0;
        assert!(mean.abs() < 1e-6);
        // population std of [1, 2, 3] is sqrt(2/3)
        let expected = 1.0 / (2.0f32 / 3.0).sqrt();
        assert!((normalized[2] - expected).abs() < 1e-4);
    }

    #[test]
    fn test_normalize_constant_and_single() {
        assert_close(&normalize_returns(&[4.0, 4.0]).unwrap(), &[0.0, 0.0]);
        assert_close(&normalize_returns(&[7.0]).unwrap(), &[0.0]);
    }

    #[test]
    fn test_normalize_empty_fails() {
        assert!(matches!(
            normalize_returns(&[]),
            Err(Rl2Error::Numerical(_))
        ));
    }

    #[test]
    fn test_gae_tau_one_zero_values_is_discounted_return() {
        let rewards = [1.0, 0.0, 2.0, 1.0];
        let dones = [false, false, false, false];
        let (advantages, returns) =
            compute_gae(&rewards, &[0.0; 4], &dones, 0.9, 1.0).unwrap();

        let expected = discounted_returns(&rewards, 0.9);
        assert_close(&advantages, &expected);
        assert_close(&returns, &expected);
    }

    #[test]
    fn test_gae_done_cuts_bootstrap() {
        let rewards = [1.0, 1.0];
        let values = [0.5, 10.0];
        let (advantages, returns) =
            compute_gae(&rewards, &values, &[true, false], 0.99, 0.95).unwrap();

        // step 0 terminal: delta = 1 - 0.5
        assert!((advantages[0] - 0.5).abs() < 1e-5);
        // last step bootstraps from zero
        assert!((advantages[1] - (1.0 - 10.0)).abs() < 1e-5);
        assert!((returns[0] - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_gae_length_mismatch() {
        assert!(compute_gae(&[1.0], &[0.0, 0.0], &[false], 0.9, 0.9).is_err());
    }
}
