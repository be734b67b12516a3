//! Observation and action spaces of task environments.
//!
//! Every task family exposes a flat observation space and either a discrete
//! (bandit, tabular MDP) or a continuous (2D navigation) action space.

mod r#box;
mod discrete;

pub use discrete::Discrete;
pub use r#box::Box;

/// Trait for observation and action spaces
pub trait Space: Clone + Send + Sync {
    /// Get the shape of samples from this space
    fn shape(&self) -> &[usize];

    /// Get the total number of elements in a sample
    fn num_elements(&self) -> usize {
        self.shape().iter().product()
    }
}

/// Enum for dynamic space types
#[derive(Clone, Debug)]
pub enum DynSpace {
    Discrete(Discrete),
    Box(Box),
}

impl DynSpace {
    /// Get the shape of this space
    pub fn shape(&self) -> Vec<usize> {
        match self {
            DynSpace::Discrete(s) => s.shape().to_vec(),
            DynSpace::Box(s) => s.shape().to_vec(),
        }
    }

    /// Size of the flattened feature vector a sample of this space occupies
    /// in a policy input. Discrete spaces are one-hot encoded.
    pub fn flat_dim(&self) -> usize {
        match self {
            DynSpace::Discrete(s) => s.n,
            DynSpace::Box(s) => s.num_elements(),
        }
    }

    /// Number of discrete choices, or `None` for continuous spaces
    pub fn num_choices(&self) -> Option<usize> {
        match self {
            DynSpace::Discrete(s) => Some(s.n),
            DynSpace::Box(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_dim() {
        assert_eq!(DynSpace::Discrete(Discrete::new(5)).flat_dim(), 5);
        assert_eq!(DynSpace::Box(Box::uniform(&[2], -0.1, 0.1)).flat_dim(), 2);
    }

    #[test]
    fn test_num_choices() {
        assert_eq!(DynSpace::Discrete(Discrete::new(3)).num_choices(), Some(3));
        assert_eq!(DynSpace::Box(Box::unit(&[1])).num_choices(), None);
    }
}
