//! Core environment trait definitions.

use crate::spaces::DynSpace;
use ndarray::ArrayD;

/// Information returned from environment steps
#[derive(Clone, Debug, Default)]
pub struct EnvInfo {
    /// Episode return (if done)
    pub episode_return: Option<f32>,
    /// Episode length (if done)
    pub episode_length: Option<f32>,
    /// Family-specific diagnostics (distance to goal, current state, ...)
    pub extra: smallvec::SmallVec<[(&'static str, f32); 4]>,
}

impl EnvInfo {
    /// Create empty info
    pub fn new() -> Self {
        Self::default()
    }

    /// Add episode stats
    pub fn with_episode_stats(mut self, ret: f32, len: u32) -> Self {
        self.episode_return = Some(ret);
        self.episode_length = Some(len as f32);
        self
    }

    /// Add a custom metric
    pub fn with_extra(mut self, key: &'static str, value: f32) -> Self {
        self.extra.push((key, value));
        self
    }

    /// Get a value by key (including defaults)
    pub fn get(&self, key: &str) -> Option<f32> {
        match key {
            "episode_return" => self.episode_return,
            "episode_length" => self.episode_length,
            _ => self.extra.iter().find(|(k, _)| k == &key).map(|(_, v)| *v),
        }
    }
}

/// Result from a single environment step
#[derive(Clone, Debug)]
pub struct StepResult {
    /// Observation after the step
    pub observation: ArrayD<f32>,
    /// Reward received
    pub reward: f32,
    /// Whether the episode reached a terminal state
    pub terminated: bool,
    /// Whether the episode was cut by the environment's horizon
    pub truncated: bool,
    /// Additional info
    pub info: EnvInfo,
}

impl StepResult {
    /// Check if episode is done (terminated or truncated)
    pub fn done(&self) -> bool {
        self.terminated || self.truncated
    }
}

/// Stateful interactive environment configured from one task descriptor.
///
/// Discrete actions are passed as a single-element array holding the action
/// index; continuous actions as a flat array matching the action space.
///
/// # Example
///
/// ```rust,ignore
/// use rl2::env::{EnvInfo, StepResult, TaskEnv};
/// use rl2::spaces::{Box as BoxSpace, Discrete, DynSpace};
///
/// struct CoinFlip {
///     bias: f32,
/// }
///
/// impl TaskEnv for CoinFlip {
///     fn observation_space(&self) -> DynSpace {
///         DynSpace::Box(BoxSpace::uniform(&[1], 0.0, 0.0))
///     }
///
///     fn action_space(&self) -> DynSpace {
///         DynSpace::Discrete(Discrete::new(2))
///     }
///
///     fn reset(&mut self, _seed: Option<u64>) -> (ArrayD<f32>, EnvInfo) {
///         (ArrayD::zeros(IxDyn(&[1])), EnvInfo::new())
///     }
///
///     fn step(&mut self, action: &ArrayD<f32>) -> StepResult {
///         // ... implement step logic
///     }
/// }
/// ```
pub trait TaskEnv: Send {
    /// Get the observation space
    fn observation_space(&self) -> DynSpace;

    /// Get the action space
    fn action_space(&self) -> DynSpace;

    /// Reset the environment to the start of a new episode of the same task
    ///
    /// # Arguments
    /// * `seed` - Optional random seed for reproducibility
    ///
    /// # Returns
    /// Tuple of (initial observation, info)
    fn reset(&mut self, seed: Option<u64>) -> (ArrayD<f32>, EnvInfo);

    /// Take a single step in the environment
    fn step(&mut self, action: &ArrayD<f32>) -> StepResult;

    /// Optional: Render the environment
    fn render(&self) -> Option<String> {
        None
    }
}

impl<E: TaskEnv + ?Sized> TaskEnv for std::boxed::Box<E> {
    fn observation_space(&self) -> DynSpace {
        (**self).observation_space()
    }

    fn action_space(&self) -> DynSpace {
        (**self).action_space()
    }

    fn reset(&mut self, seed: Option<u64>) -> (ArrayD<f32>, EnvInfo) {
        (**self).reset(seed)
    }

    fn step(&mut self, action: &ArrayD<f32>) -> StepResult {
        (**self).step(action)
    }

    fn render(&self) -> Option<String> {
        (**self).render()
    }
}

impl<E: TaskEnv + ?Sized> TaskEnv for &mut E {
    fn observation_space(&self) -> DynSpace {
        (**self).observation_space()
    }

    fn action_space(&self) -> DynSpace {
        (**self).action_space()
    }

    fn reset(&mut self, seed: Option<u64>) -> (ArrayD<f32>, EnvInfo) {
        (**self).reset(seed)
    }

    fn step(&mut self, action: &ArrayD<f32>) -> StepResult {
        (**self).step(action)
    }

    fn render(&self) -> Option<String> {
        (**self).render()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_info_lookup() {
        let info = EnvInfo::new()
            .with_episode_stats(3.0, 4)
            .with_extra("distance", 0.25);

        assert_eq!(info.get("episode_return"), Some(3.0));
        assert_eq!(info.get("episode_length"), Some(4.0));
        assert_eq!(info.get("distance"), Some(0.25));
        assert_eq!(info.get("missing"), None);
    }
}
