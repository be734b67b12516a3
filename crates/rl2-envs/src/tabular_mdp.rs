//! Tabular MDP with random transitions and Gaussian rewards.

use ndarray::{ArrayD, IxDyn};
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Exp1, StandardNormal};
use rl2::env::{EnvInfo, StepResult, TaskEnv};
use rl2::spaces::{Box as BoxSpace, Discrete, DynSpace};
use rl2::{Result, Rl2Error};
use serde::{Deserialize, Serialize};

/// Number of states
pub const MDP_NUM_STATES: usize = 10;
/// Number of actions; fixed for this family
pub const MDP_NUM_ACTIONS: usize = 5;
/// Steps per episode
pub const MDP_HORIZON: usize = 10;
/// Allowed deviation of a transition row's sum from one
const ROW_SUM_TOLERANCE: f32 = 1e-3;

/// Transition and reward tables of one MDP task
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MdpTask {
    /// `transitions[s][a][s']`, each row sums to one
    pub transitions: Vec<Vec<Vec<f32>>>,
    /// `rewards_mean[s][a]`
    pub rewards_mean: Vec<Vec<f32>>,
}

impl MdpTask {
    /// Transitions drawn Dirichlet(1) per (state, action), reward means N(1, 1)
    pub fn sample<R: Rng>(rng: &mut R) -> Self {
        let transitions = (0..MDP_NUM_STATES)
            .map(|_| {
                (0..MDP_NUM_ACTIONS)
                    .map(|_| {
                        // Normalized Exp(1) draws are Dirichlet(1, ..., 1)
                        let draws: Vec<f32> = (0..MDP_NUM_STATES)
                            .map(|_| rng.sample::<f32, _>(Exp1))
                            .collect();
                        let total: f32 = draws.iter().sum();
                        draws.into_iter().map(|d| d / total).collect()
                    })
                    .collect()
            })
            .collect();

        let rewards_mean = (0..MDP_NUM_STATES)
            .map(|_| {
                (0..MDP_NUM_ACTIONS)
                    .map(|_| 1.0 + rng.sample::<f32, _>(StandardNormal))
                    .collect()
            })
            .collect();

        Self {
            transitions,
            rewards_mean,
        }
    }

    pub fn num_states(&self) -> usize {
        self.transitions.len()
    }

    pub fn num_actions(&self) -> usize {
        self.rewards_mean.first().map(|r| r.len()).unwrap_or(0)
    }

    /// Check the tables of a task read from outside the sampler.
    ///
    /// `transitions` must be `[MDP_NUM_STATES][num_actions][MDP_NUM_STATES]`
    /// with finite non-negative rows summing to one, `rewards_mean` must be
    /// `[MDP_NUM_STATES][num_actions]` and finite.
    pub fn validate(&self, num_actions: usize) -> Result<()> {
        if self.transitions.len() != MDP_NUM_STATES {
            return Err(Rl2Error::ShapeMismatch {
                expected: vec![MDP_NUM_STATES],
                actual: vec![self.transitions.len()],
            });
        }
        if self.rewards_mean.len() != MDP_NUM_STATES {
            return Err(Rl2Error::ShapeMismatch {
                expected: vec![MDP_NUM_STATES],
                actual: vec![self.rewards_mean.len()],
            });
        }

        for (state, (rows, means)) in self.transitions.iter().zip(&self.rewards_mean).enumerate() {
            if rows.len() != num_actions || means.len() != num_actions {
                return Err(Rl2Error::ShapeMismatch {
                    expected: vec![MDP_NUM_STATES, num_actions],
                    actual: vec![state, rows.len().min(means.len())],
                });
            }
            if let Some(mean) = means.iter().find(|m| !m.is_finite()) {
                return Err(Rl2Error::TaskFile(format!(
                    "state {} has non-finite reward mean {}",
                    state, mean
                )));
            }
            for (action, row) in rows.iter().enumerate() {
                if row.len() != MDP_NUM_STATES {
                    return Err(Rl2Error::ShapeMismatch {
                        expected: vec![MDP_NUM_STATES, num_actions, MDP_NUM_STATES],
                        actual: vec![state, action, row.len()],
                    });
                }
                let total: f32 = row.iter().sum();
                if row.iter().any(|p| !p.is_finite() || *p < 0.0)
                    || (total - 1.0).abs() > ROW_SUM_TOLERANCE
                {
                    return Err(Rl2Error::TaskFile(format!(
                        "transition row ({}, {}) is not a distribution",
                        state, action
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Tabular MDP environment
///
/// Episodes start in state 0 and are truncated after [`MDP_HORIZON`] steps.
pub struct TabularMdp {
    task: MdpTask,
    state: usize,
    tick: usize,
    horizon: usize,
    rng: ChaCha8Rng,
}

impl TabularMdp {
    pub fn new(task: MdpTask, seed: u64) -> Self {
        Self {
            task,
            state: 0,
            tick: 0,
            horizon: MDP_HORIZON,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Override the episode length
    pub fn with_horizon(mut self, horizon: usize) -> Self {
        self.horizon = horizon;
        self
    }

    pub fn state(&self) -> usize {
        self.state
    }

    fn observation(&self) -> ArrayD<f32> {
        let mut obs = ArrayD::zeros(IxDyn(&[self.task.num_states()]));
        if let Some(slot) = obs.get_mut(IxDyn(&[self.state])) {
            *slot = 1.0;
        }
        obs
    }

    fn next_state(&mut self, action: usize) -> usize {
        let probs = match self
            .task
            .transitions
            .get(self.state)
            .and_then(|rows| rows.get(action))
        {
            Some(probs) => probs,
            None => return self.state,
        };
        let u: f32 = self.rng.gen();
        let mut cumulative = 0.0;
        for (next, p) in probs.iter().enumerate() {
            cumulative += p;
            if u < cumulative {
                return next;
            }
        }
        // Rounding left u above the final cumulative sum
        probs.len().saturating_sub(1)
    }
}

impl TaskEnv for TabularMdp {
    fn observation_space(&self) -> DynSpace {
        DynSpace::Box(BoxSpace::unit(&[self.task.num_states()]))
    }

    fn action_space(&self) -> DynSpace {
        DynSpace::Discrete(Discrete::new(self.task.num_actions()))
    }

    fn reset(&mut self, seed: Option<u64>) -> (ArrayD<f32>, EnvInfo) {
        if let Some(s) = seed {
            self.rng = ChaCha8Rng::seed_from_u64(s);
        }
        self.state = 0;
        self.tick = 0;
        (self.observation(), EnvInfo::new())
    }

    fn step(&mut self, action: &ArrayD<f32>) -> StepResult {
        let action = action
            .iter()
            .next()
            .map(|a| a.round().max(0.0) as usize)
            .unwrap_or(0)
            .min(self.task.num_actions().saturating_sub(1));

        let mean = match self
            .task
            .rewards_mean
            .get(self.state)
            .and_then(|means| means.get(action))
        {
            Some(&mean) => mean,
            None => {
                tracing::warn!(state = self.state, action, "MDP table has no entry");
                0.0
            }
        };
        let reward = mean + self.rng.sample::<f32, _>(StandardNormal);
        self.state = self.next_state(action);
        self.tick += 1;

        StepResult {
            observation: self.observation(),
            reward,
            terminated: false,
            truncated: self.tick >= self.horizon,
            info: EnvInfo::new().with_extra("state", self.state as f32),
        }
    }

    fn render(&self) -> Option<String> {
        Some(format!("TabularMDP: state {} at step {}", self.state, self.tick))
    }
}
