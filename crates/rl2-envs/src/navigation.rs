//! 2D point navigation towards a hidden goal.

use ndarray::{ArrayD, IxDyn};
use rand::Rng;
use rl2::env::{EnvInfo, StepResult, TaskEnv};
use rl2::spaces::{Box as BoxSpace, DynSpace};
use rl2::{Result, Rl2Error};
use serde::{Deserialize, Serialize};

/// Steps per episode
pub const NAV_HORIZON: usize = 100;
/// Per-axis action bound
pub const NAV_MAX_STEP: f32 = 0.1;
/// Per-axis distance counted as reaching the goal
pub const NAV_GOAL_TOLERANCE: f32 = 0.01;

/// Goal position of one navigation task
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NavigationTask {
    pub goal: [f32; 2],
}

impl NavigationTask {
    /// Goal drawn uniformly from [-0.5, 0.5]^2
    pub fn sample<R: Rng>(rng: &mut R) -> Self {
        Self {
            goal: [rng.gen_range(-0.5..0.5), rng.gen_range(-0.5..0.5)],
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.goal.iter().all(|g| g.is_finite()) {
            Ok(())
        } else {
            Err(Rl2Error::TaskFile(format!("non-finite goal {:?}", self.goal)))
        }
    }
}

/// Point agent starting at the origin, rewarded by negative distance to the goal
pub struct Navigation2d {
    task: NavigationTask,
    position: [f32; 2],
    tick: usize,
    action_space: BoxSpace,
}

impl Navigation2d {
    pub fn new(task: NavigationTask) -> Self {
        Self {
            task,
            position: [0.0, 0.0],
            tick: 0,
            action_space: BoxSpace::uniform(&[2], -NAV_MAX_STEP, NAV_MAX_STEP),
        }
    }

    pub fn position(&self) -> [f32; 2] {
        self.position
    }

    fn observation(&self) -> ArrayD<f32> {
        ArrayD::from_shape_vec(IxDyn(&[2]), self.position.to_vec())
            .unwrap_or_else(|_| ArrayD::zeros(IxDyn(&[2])))
    }
}

impl TaskEnv for Navigation2d {
    fn observation_space(&self) -> DynSpace {
        DynSpace::Box(BoxSpace::unbounded(&[2]))
    }

    fn action_space(&self) -> DynSpace {
        DynSpace::Box(self.action_space.clone())
    }

    fn reset(&mut self, _seed: Option<u64>) -> (ArrayD<f32>, EnvInfo) {
        self.position = [0.0, 0.0];
        self.tick = 0;
        (self.observation(), EnvInfo::new())
    }

    fn step(&mut self, action: &ArrayD<f32>) -> StepResult {
        let mut delta = [0.0f32; 2];
        if action.len() == 2 {
            let clipped = self.action_space.clip(action);
            for (d, a) in delta.iter_mut().zip(clipped.iter()) {
                *d = *a;
            }
        } else {
            tracing::warn!(len = action.len(), "Navigation action must have two components");
        }

        self.position[0] += delta[0];
        self.position[1] += delta[1];
        self.tick += 1;

        let dx = self.position[0] - self.task.goal[0];
        let dy = self.position[1] - self.task.goal[1];
        let distance = (dx * dx + dy * dy).sqrt();
        let reached = dx.abs() < NAV_GOAL_TOLERANCE && dy.abs() < NAV_GOAL_TOLERANCE;

        StepResult {
            observation: self.observation(),
            reward: -distance,
            terminated: reached,
            truncated: !reached && self.tick >= NAV_HORIZON,
            info: EnvInfo::new().with_extra("distance", distance),
        }
    }

    fn render(&self) -> Option<String> {
        Some(format!(
            "Navigation2d: at ({:.3}, {:.3}), goal ({:.3}, {:.3})",
            self.position[0], self.position[1], self.task.goal[0], self.task.goal[1]
        ))
    }
}
