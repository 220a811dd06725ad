//! Adaptation strategies: turning accumulated gradients into parameter deltas.

use std::fmt::Debug;

use serde::{Deserialize, Serialize};

use crate::algebra::{BiasesVector, WeightsMatrix};
use crate::error::{NetworkError, NetworkResult};

/// Converts a raw gradient summed over `batch_size` examples into the delta
/// that is added to the parameters.
pub trait AdaptationStrategy: Debug + Send + Sync {
    fn weights_update(&self, gradient: &WeightsMatrix, batch_size: usize) -> WeightsMatrix;

    fn biases_update(&self, gradient: &BiasesVector, batch_size: usize) -> BiasesVector;
}

fn validate_step(step_size: f64) -> NetworkResult<()> {
    if !step_size.is_finite() || step_size <= 0.0 {
        return Err(NetworkError::InvalidArgument(format!(
            "step size must be finite and positive, got {step_size}"
        )));
    }
    Ok(())
}

fn descent_factor(step_size: f64, batch_size: usize) -> f64 {
    -step_size / batch_size.max(1) as f64
}

/// Plain gradient descent.
///
/// ```text
/// delta = -(step_size / batch_size) * gradient
/// ```
///
/// # Examples
///
/// ```
/// use neurochain_core::neural::{AdaptationStrategy, GradientDescent};
/// use neurochain_core::WeightsMatrix;
///
/// let strategy = GradientDescent::new(0.5).unwrap();
/// let gradient = WeightsMatrix::from_rows(&[vec![2.0, -4.0]]).unwrap();
/// let delta = strategy.weights_update(&gradient, 2);
/// assert_eq!(delta, WeightsMatrix::from_rows(&[vec![-0.5, 1.0]]).unwrap());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GradientDescent {
    pub step_size: f64,
}

impl GradientDescent {
    pub fn new(step_size: f64) -> NetworkResult<Self> {
        validate_step(step_size)?;
        Ok(Self { step_size })
    }
}

impl AdaptationStrategy for GradientDescent {
    fn weights_update(&self, gradient: &WeightsMatrix, batch_size: usize) -> WeightsMatrix {
        gradient.scale(descent_factor(self.step_size, batch_size))
    }

    fn biases_update(&self, gradient: &BiasesVector, batch_size: usize) -> BiasesVector {
        gradient.scale(descent_factor(self.step_size, batch_size))
    }
}

/// Gradient descent that clamps every gradient entry to `±max_gradient`
/// before scaling.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClippedGradientDescent {
    pub step_size: f64,
    pub max_gradient: f64,
}

impl ClippedGradientDescent {
    pub fn new(step_size: f64, max_gradient: f64) -> NetworkResult<Self> {
        validate_step(step_size)?;
        if !max_gradient.is_finite() || max_gradient <= 0.0 {
            return Err(NetworkError::InvalidArgument(format!(
                "max gradient must be finite and positive, got {max_gradient}"
            )));
        }
        Ok(Self {
            step_size,
            max_gradient,
        })
    }
}

impl AdaptationStrategy for ClippedGradientDescent {
    fn weights_update(&self, gradient: &WeightsMatrix, batch_size: usize) -> WeightsMatrix {
        gradient
            .clip(self.max_gradient)
            .scale(descent_factor(self.step_size, batch_size))
    }

    fn biases_update(&self, gradient: &BiasesVector, batch_size: usize) -> BiasesVector {
        gradient
            .clip(self.max_gradient)
            .scale(descent_factor(self.step_size, batch_size))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descent_divides_by_batch_size() {
        let strategy = GradientDescent::new(0.3).unwrap();
        let gradient = BiasesVector::from_vec(vec![3.0, -6.0]);
        let delta = strategy.biases_update(&gradient, 3);
        assert!(delta
            .to_vector()
            .iter()
            .zip([-0.3, 0.6])
            .all(|(a, b)| (a - b).abs() < 1e-12));
    }

    #[test]
    fn zero_batch_is_treated_as_one() {
        let strategy = GradientDescent::new(1.0).unwrap();
        let gradient = BiasesVector::from_vec(vec![2.0]);
        assert_eq!(
            strategy.biases_update(&gradient, 0),
            BiasesVector::from_vec(vec![-2.0])
        );
    }

    #[test]
    fn clipping_happens_before_scaling() {
        let strategy = ClippedGradientDescent::new(0.5, 1.0).unwrap();
        let gradient = WeightsMatrix::from_rows(&[vec![10.0, -0.5]]).unwrap();
        assert_eq!(
            strategy.weights_update(&gradient, 1),
            WeightsMatrix::from_rows(&[vec![-0.5, 0.25]]).unwrap()
        );
    }

    #[test]
    fn invalid_step_sizes_are_rejected() {
        assert!(GradientDescent::new(0.0).is_err());
        assert!(GradientDescent::new(f64::NAN).is_err());
        assert!(ClippedGradientDescent::new(0.1, -1.0).is_err());
    }
}
