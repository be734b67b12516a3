//! Box (continuous) observation/action space

use super::Space;
use ndarray::{ArrayD, IxDyn, Zip};

/// Box space for continuous values with bounds
#[derive(Clone, Debug)]
pub struct Box {
    /// Lower bound for each element
    pub low: ArrayD<f32>,
    /// Upper bound for each element
    pub high: ArrayD<f32>,
    /// Shape of the space
    shape: Vec<usize>,
}

impl Box {
    /// Create a new box space with given bounds
    pub fn new(low: ArrayD<f32>, high: ArrayD<f32>) -> Self {
        assert_eq!(low.shape(), high.shape(), "Low and high must have same shape");
        let shape = low.shape().to_vec();
        Self { low, high, shape }
    }

    /// Create a box space with uniform bounds
    pub fn uniform(shape: &[usize], low: f32, high: f32) -> Self {
        let low_arr = ArrayD::from_elem(IxDyn(shape), low);
        let high_arr = ArrayD::from_elem(IxDyn(shape), high);
        Self::new(low_arr, high_arr)
    }

    /// Create a box space from -inf to +inf (unbounded)
    pub fn unbounded(shape: &[usize]) -> Self {
        Self::uniform(shape, f32::NEG_INFINITY, f32::INFINITY)
    }

    /// Create a unit box [0, 1] for all elements
    pub fn unit(shape: &[usize]) -> Self {
        Self::uniform(shape, 0.0, 1.0)
    }

    /// Clip `value` element-wise into the bounds. Shapes must match.
    pub fn clip(&self, value: &ArrayD<f32>) -> ArrayD<f32> {
        let mut clipped = value.clone();
        Zip::from(&mut clipped)
            .and(&self.low)
            .and(&self.high)
            .for_each(|v, &l, &h| *v = v.clamp(l, h));
        clipped
    }
}

impl Space for Box {
    fn shape(&self) -> &[usize] {
        &self.shape
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_box_shape() {
        let space = Box::unbounded(&[3]);
        assert_eq!(space.shape(), &[3]);
        assert_eq!(space.num_elements(), 3);
        assert!(space.low.iter().all(|l| l.is_infinite()));
    }

    #[test]
    fn test_box_clip() {
        let space = Box::uniform(&[2], -0.1, 0.1);
        let action = ArrayD::from_shape_vec(IxDyn(&[2]), vec![0.5, -0.05]).unwrap();
        let clipped = space.clip(&action);

        assert_eq!(clipped.as_slice().unwrap(), &[0.1, -0.05]);
    }
}
