//! Gradient optimizers for the policy parameters.

use crate::Result;
use serde::{Deserialize, Serialize};
use tch::{nn, nn::OptimizerConfig, Kind, Tensor};

/// Interface the optimizer steps drive.
pub trait PolicyOptimizer: Send {
    /// Zero out gradients.
    fn zero_grad(&mut self);

    /// Perform an optimization step.
    fn step(&mut self);

    /// Rescale gradients so their global L2 norm is at most `max_norm`.
    /// Returns the norm before clipping.
    fn clip_grad_norm(&mut self, max_norm: f64) -> f64;

    /// Global L2 norm of the current gradients
    fn grad_norm(&self) -> f64;
}

/// Optimizer family
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptimizerKind {
    /// Plain stochastic gradient descent
    Sgd,
    /// Adam with default betas
    Adam,
}

impl OptimizerKind {
    /// Build an optimizer over the trainable variables of `vs`
    pub fn build(self, vs: &nn::VarStore, learning_rate: f64) -> Result<TorchOptimizer> {
        let inner = match self {
            OptimizerKind::Sgd => nn::Sgd::default().build(vs, learning_rate)?,
            OptimizerKind::Adam => nn::Adam::default().build(vs, learning_rate)?,
        };
        Ok(TorchOptimizer::new(inner, vs.trainable_variables()))
    }
}

/// Wrapper for Torch's nn::Optimizer.
pub struct TorchOptimizer {
    pub inner: nn::Optimizer,
    pub variables: Vec<Tensor>,
}

impl TorchOptimizer {
    pub fn new(inner: nn::Optimizer, variables: Vec<Tensor>) -> Self {
        Self { inner, variables }
    }

    /// Change the learning rate
    pub fn set_lr(&mut self, lr: f64) {
        self.inner.set_lr(lr);
    }
}

impl PolicyOptimizer for TorchOptimizer {
    fn zero_grad(&mut self) {
        self.inner.zero_grad();
    }

    fn step(&mut self) {
        self.inner.step();
    }

    fn clip_grad_norm(&mut self, max_norm: f64) -> f64 {
        let global_norm = self.grad_norm();

        if global_norm > max_norm {
            let clip_coef = max_norm / (global_norm + 1e-6);
            for var in &self.variables {
                let mut grad = var.grad();
                if grad.defined() {
                    let _ = grad.f_mul_scalar_(clip_coef);
                }
            }
        }
        global_norm
    }

    fn grad_norm(&self) -> f64 {
        let mut total = 0.0f64;
        for var in &self.variables {
            let grad = var.grad();
            if grad.defined() {
                total += grad.pow_tensor_scalar(2.0).sum(Kind::Float).double_value(&[]);
            }
        }
        total.sqrt()
    }
}
