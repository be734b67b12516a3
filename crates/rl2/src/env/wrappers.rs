//! Environment wrappers.

use super::{EnvInfo, StepResult, TaskEnv};
use crate::spaces::DynSpace;
use ndarray::ArrayD;

/// Wrapper that tracks episode statistics (return and length).
///
/// Adds `episode_return` and `episode_length` to info when the environment
/// ends an episode on its own, and via [`EpisodeStats::finish`] when the
/// caller cuts it short.
pub struct EpisodeStats<E: TaskEnv> {
    env: E,
    episode_return: f32,
    episode_length: u32,
    completed: Vec<(f32, u32)>,
}

impl<E: TaskEnv> EpisodeStats<E> {
    /// Wrap an environment with episode statistics tracking
    pub fn new(env: E) -> Self {
        Self {
            env,
            episode_return: 0.0,
            episode_length: 0,
            completed: Vec::new(),
        }
    }

    /// Close the running episode early (caller-side step cap).
    /// Does nothing if no step was taken since the last boundary.
    pub fn finish(&mut self) {
        if self.episode_length > 0 {
            self.completed.push((self.episode_return, self.episode_length));
            self.episode_return = 0.0;
            self.episode_length = 0;
        }
    }

    /// (return, length) of every completed episode so far
    pub fn completed(&self) -> &[(f32, u32)] {
        &self.completed
    }
}

impl<E: TaskEnv> TaskEnv for EpisodeStats<E> {
    fn observation_space(&self) -> DynSpace {
        self.env.observation_space()
    }

    fn action_space(&self) -> DynSpace {
        self.env.action_space()
    }

    fn reset(&mut self, seed: Option<u64>) -> (ArrayD<f32>, EnvInfo) {
        self.episode_return = 0.0;
        self.episode_length = 0;
        self.env.reset(seed)
    }

    fn step(&mut self, action: &ArrayD<f32>) -> StepResult {
        let mut result = self.env.step(action);

        self.episode_return += result.reward;
        self.episode_length += 1;

        if result.done() {
            result.info = result
                .info
                .with_episode_stats(self.episode_return, self.episode_length);
            self.finish();
        }

        result
    }

    fn render(&self) -> Option<String> {
        self.env.render()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spaces::{Box as BoxSpace, Discrete};
    use ndarray::IxDyn;

    // Terminates every fifth step
    struct CountdownEnv {
        step_count: u32,
    }

    impl TaskEnv for CountdownEnv {
        fn observation_space(&self) -> DynSpace {
            DynSpace::Box(BoxSpace::uniform(&[2], 0.0, 1.0))
        }

        fn action_space(&self) -> DynSpace {
            DynSpace::Discrete(Discrete::new(2))
        }

        fn reset(&mut self, _seed: Option<u64>) -> (ArrayD<f32>, EnvInfo) {
            self.step_count = 0;
            (ArrayD::zeros(IxDyn(&[2])), EnvInfo::new())
        }

        fn step(&mut self, _action: &ArrayD<f32>) -> StepResult {
            self.step_count += 1;
            StepResult {
                observation: ArrayD::zeros(IxDyn(&[2])),
                reward: 1.0,
                terminated: self.step_count >= 5,
                truncated: false,
                info: EnvInfo::new(),
            }
        }
    }

    #[test]
    fn test_episode_stats() {
        let mut wrapped = EpisodeStats::new(CountdownEnv { step_count: 0 });
        wrapped.reset(None);

        let action = ArrayD::zeros(IxDyn(&[1]));
        for _ in 0..4 {
            let result = wrapped.step(&action);
            assert!(!result.done());
            assert!(result.info.get("episode_return").is_none());
        }

        let result = wrapped.step(&action);
        assert!(result.done());
        assert_eq!(result.info.get("episode_return"), Some(5.0));
        assert_eq!(result.info.get("episode_length"), Some(5.0));
        assert_eq!(wrapped.completed(), &[(5.0, 5)]);
    }

    #[test]
    fn test_finish_records_truncated_episode() {
        let mut wrapped = EpisodeStats::new(CountdownEnv { step_count: 0 });
        wrapped.reset(None);

        let action = ArrayD::zeros(IxDyn(&[1]));
        wrapped.step(&action);
        wrapped.step(&action);
        wrapped.finish();
        wrapped.finish();

        assert_eq!(wrapped.completed(), &[(2.0, 2)]);
    }
}
