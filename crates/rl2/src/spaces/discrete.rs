//! Discrete action/observation space

use super::Space;

/// Discrete space with n possible values: {0, 1, ..., n-1}
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Discrete {
    /// Number of possible values
    pub n: usize,
    /// Cached shape
    shape: Vec<usize>,
}

impl Discrete {
    /// Create a new discrete space with n values
    pub fn new(n: usize) -> Self {
        assert!(n > 0, "Discrete space must have at least 1 element");
        Self { n, shape: vec![1] }
    }

    /// One-hot encoding of `value`. Out-of-range values encode as all zeros.
    pub fn one_hot(&self, value: usize) -> Vec<f32> {
        let mut encoded = vec![0.0; self.n];
        if let Some(slot) = encoded.get_mut(value) {
            *slot = 1.0;
        }
        encoded
    }
}

impl Space for Discrete {
    fn shape(&self) -> &[usize] {
        &self.shape
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discrete_shape() {
        let space = Discrete::new(4);
        assert_eq!(space.shape(), &[1]);
        assert_eq!(space.n, 4);
    }

    #[test]
    fn test_one_hot() {
        let space = Discrete::new(4);
        assert_eq!(space.one_hot(2), vec![0.0, 0.0, 1.0, 0.0]);
        assert_eq!(space.one_hot(7), vec![0.0; 4]);
    }
}
