//! Bernoulli multi-armed bandit.

use ndarray::{ArrayD, IxDyn};
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rl2::env::{EnvInfo, StepResult, TaskEnv};
use rl2::spaces::{Box as BoxSpace, Discrete, DynSpace};
use rl2::{Result, Rl2Error};
use serde::{Deserialize, Serialize};

/// Arm success probabilities of one bandit task
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BanditTask {
    pub means: Vec<f32>,
}

impl BanditTask {
    /// Draw each arm's mean uniformly from [0, 1)
    pub fn sample<R: Rng>(num_actions: usize, rng: &mut R) -> Self {
        Self {
            means: (0..num_actions).map(|_| rng.gen::<f32>()).collect(),
        }
    }

    /// Every arm mean must be a probability
    pub fn validate(&self) -> Result<()> {
        if self.means.is_empty() {
            return Err(Rl2Error::TaskFile("bandit task has no arms".into()));
        }
        match self.means.iter().position(|m| !(0.0..=1.0).contains(m)) {
            Some(arm) => Err(Rl2Error::TaskFile(format!(
                "arm {} has mean {}, expected a value in [0, 1]",
                arm, self.means[arm]
            ))),
            None => Ok(()),
        }
    }

    /// Index of the best arm
    pub fn best_arm(&self) -> usize {
        self.means
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
            .unwrap_or(0)
    }
}

/// Bandit environment
///
/// Every pull is a one-step episode paying 1 with the arm's probability.
/// The observation carries no information; the task has to be inferred
/// from the reward history.
pub struct Bandit {
    task: BanditTask,
    best_mean: f32,
    rng: ChaCha8Rng,
}

impl Bandit {
    pub fn new(task: BanditTask, seed: u64) -> Self {
        let best_mean = task.means.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        Self {
            task,
            best_mean,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    pub fn task(&self) -> &BanditTask {
        &self.task
    }

    fn observation() -> ArrayD<f32> {
        ArrayD::zeros(IxDyn(&[1]))
    }
}

impl TaskEnv for Bandit {
    fn observation_space(&self) -> DynSpace {
        DynSpace::Box(BoxSpace::uniform(&[1], 0.0, 0.0))
    }

    fn action_space(&self) -> DynSpace {
        DynSpace::Discrete(Discrete::new(self.task.means.len()))
    }

    fn reset(&mut self, seed: Option<u64>) -> (ArrayD<f32>, EnvInfo) {
        if let Some(s) = seed {
            self.rng = ChaCha8Rng::seed_from_u64(s);
        }
        (Self::observation(), EnvInfo::new())
    }

    fn step(&mut self, action: &ArrayD<f32>) -> StepResult {
        let arm = action
            .iter()
            .next()
            .map(|a| a.round().max(0.0) as usize)
            .unwrap_or(0);

        let (reward, mean) = match self.task.means.get(arm) {
            Some(&mean) => {
                let reward = if self.rng.gen::<f32>() < mean { 1.0 } else { 0.0 };
                (reward, mean)
            }
            None => {
                tracing::warn!(arm, "Bandit arm out of range");
                (0.0, 0.0)
            }
        };

        StepResult {
            observation: Self::observation(),
            reward,
            terminated: true,
            truncated: false,
            info: EnvInfo::new().with_extra("regret", self.best_mean - mean),
        }
    }

    fn render(&self) -> Option<String> {
        Some(format!("Bandit: means = {:?}", self.task.means))
    }
}
