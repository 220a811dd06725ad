//! The differentiable unit contract shared by every pipeline stage.

use std::fmt::Debug;

use serde::{Deserialize, Serialize};

use crate::algebra::{BiasesVector, VectorBatch, WeightsMatrix};
use crate::error::{NetworkError, NetworkResult};
use crate::neural::optimizer::AdaptationStrategy;

/// A differentiable unit with fixed input and output widths.
///
/// `run` caches its input and output, overwriting whatever the previous call
/// left behind. `back_propagate` reads that cache, so it fails with
/// [`NetworkError::InvalidOperation`] until `run` has been called once.
pub trait Component: Debug + Send + Sync {
    fn number_of_inputs(&self) -> usize;

    fn number_of_outputs(&self) -> usize;

    /// Forward pass over a batch whose dimension equals `number_of_inputs`.
    fn run(&mut self, input: &VectorBatch) -> NetworkResult<VectorBatch>;

    /// Backward pass: returns the gradient with respect to the last input.
    fn back_propagate(&mut self, output_gradient: &VectorBatch) -> NetworkResult<VectorBatch>;

    /// Input cached by the last `run`.
    fn input(&self) -> Option<&VectorBatch>;

    /// Output cached by the last `run`.
    fn output(&self) -> Option<&VectorBatch>;

    fn clone_component(&self) -> Box<dyn Component>;
}

/// A [`Component`] that owns weights and biases.
///
/// Parameter gradients computed by `back_propagate` are summed into an
/// accumulator until `update` (or `take_gradients`) drains it. A component may
/// expose several parameter sets; a chain reports those of its trainable
/// members head to tail.
pub trait TrainableComponent: Component {
    /// Snapshot of the accumulated gradients, one entry per parameter set.
    fn gradients(&self) -> Vec<ParameterGradients>;

    /// Returns the accumulated gradients and resets the accumulator.
    fn take_gradients(&mut self) -> Vec<ParameterGradients>;

    /// Applies externally accumulated gradients through `strategy`.
    ///
    /// `gradients` must hold exactly `parameter_sets()` entries, in the order
    /// `gradients()` reports them.
    fn apply_gradients(
        &mut self,
        gradients: &[ParameterGradients],
        strategy: &dyn AdaptationStrategy,
    ) -> NetworkResult<()>;

    /// Number of weight/bias pairs this component owns.
    fn parameter_sets(&self) -> usize;

    fn clone_trainable(&self) -> Box<dyn TrainableComponent>;

    fn as_component(&self) -> &dyn Component;

    /// Converts the accumulated gradients into parameter deltas and resets the accumulator.
    fn update(&mut self, strategy: &dyn AdaptationStrategy) -> NetworkResult<()> {
        let gradients = self.take_gradients();
        self.apply_gradients(&gradients, strategy)
    }
}

/// Summed weight and bias gradients of one parameter set.
///
/// Starts at zero, grows with every back-propagated example, and records how
/// many examples contributed so that strategies can average.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ParameterGradients {
    pub weights: WeightsMatrix,
    pub biases: BiasesVector,
    pub examples: usize,
}

impl ParameterGradients {
    pub fn zeros(outputs: usize, inputs: usize) -> Self {
        Self {
            weights: WeightsMatrix::zeros(outputs, inputs),
            biases: BiasesVector::zeros(outputs),
            examples: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.examples == 0
    }

    pub fn accumulate(
        &mut self,
        weights: &WeightsMatrix,
        biases: &BiasesVector,
        examples: usize,
    ) -> NetworkResult<()> {
        self.weights = self.weights.add(weights)?;
        self.biases = self.biases.add(biases)?;
        self.examples += examples;
        Ok(())
    }

    /// Sum of two accumulators for the same parameter set.
    pub fn merge(&self, other: &ParameterGradients) -> NetworkResult<ParameterGradients> {
        let mut merged = self.clone();
        merged.accumulate(&other.weights, &other.biases, other.examples)?;
        Ok(merged)
    }

    /// Element-wise merge of two per-set gradient lists.
    pub fn merge_all(
        left: &[ParameterGradients],
        right: &[ParameterGradients],
    ) -> NetworkResult<Vec<ParameterGradients>> {
        if left.len() != right.len() {
            return Err(NetworkError::dimension(
                "parameter sets",
                left.len(),
                right.len(),
            ));
        }
        left.iter().zip(right).map(|(a, b)| a.merge(b)).collect()
    }
}

pub(crate) fn ensure_width(
    context: &str,
    expected: usize,
    batch: &VectorBatch,
) -> NetworkResult<()> {
    if batch.dimension() != expected {
        return Err(NetworkError::dimension(context, expected, batch.dimension()));
    }
    Ok(())
}

pub(crate) fn not_run(component: &str) -> NetworkError {
    NetworkError::InvalidOperation(format!("{component}: back_propagate called before run"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accumulator_starts_empty_and_sums() {
        let mut acc = ParameterGradients::zeros(1, 2);
        assert!(acc.is_empty());

        let w = WeightsMatrix::from_rows(&[vec![1.0, 2.0]]).unwrap();
        let b = BiasesVector::from_vec(vec![0.5]);
        acc.accumulate(&w, &b, 1).unwrap();
        acc.accumulate(&w, &b, 2).unwrap();

        assert_eq!(acc.examples, 3);
        assert_eq!(acc.weights, WeightsMatrix::from_rows(&[vec![2.0, 4.0]]).unwrap());
        assert_eq!(acc.biases, BiasesVector::from_vec(vec![1.0]));
    }

    #[test]
    fn merge_all_requires_matching_sets() {
        let a = vec![ParameterGradients::zeros(1, 1)];
        let b = vec![ParameterGradients::zeros(1, 1), ParameterGradients::zeros(1, 1)];
        assert!(ParameterGradients::merge_all(&a, &b).is_err());
        assert_eq!(ParameterGradients::merge_all(&a, &a).unwrap().len(), 1);
    }

    #[test]
    fn accumulate_rejects_other_shapes() {
        let mut acc = ParameterGradients::zeros(2, 2);
        let w = WeightsMatrix::zeros(1, 2);
        let b = BiasesVector::zeros(1);
        assert!(acc.accumulate(&w, &b, 1).is_err());
    }
}
