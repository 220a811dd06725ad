//! Softmax normalization as a fixed component.

use crate::algebra::VectorBatch;
use crate::error::{NetworkError, NetworkResult};
use crate::neural::component::{ensure_width, not_run, Component};

/// Row-wise softmax with max subtraction for numerical stability.
///
/// Backward uses only the diagonal of the softmax Jacobian:
///
/// ```text
/// ∂L/∂x_i = y_i (1 − y_i) ∂L/∂y_i
/// ```
///
/// The off-diagonal terms `−y_i y_j` are dropped. Paired with cross-entropy
/// on one-hot targets this still yields the exact gradient at the target
/// index; other entries receive zero instead of `y_j`.
///
/// A row containing `+inf` splits its probability evenly across the infinite
/// entries and gives every other entry zero.
#[derive(Debug, Clone)]
pub struct SoftMaxUnit {
    width: usize,
    input: Option<VectorBatch>,
    output: Option<VectorBatch>,
}

impl SoftMaxUnit {
    pub fn new(width: usize) -> Self {
        Self {
            width,
            input: None,
            output: None,
        }
    }
}

impl Component for SoftMaxUnit {
    fn number_of_inputs(&self) -> usize {
        self.width
    }

    fn number_of_outputs(&self) -> usize {
        self.width
    }

    fn run(&mut self, input: &VectorBatch) -> NetworkResult<VectorBatch> {
        ensure_width("softmax input", self.width, input)?;
        let output = input
            .subtract_row_maxima()
            .map(f64::exp)
            .divide_by_row_sums();
        self.input = Some(input.clone());
        self.output = Some(output.clone());
        Ok(output)
    }

    fn back_propagate(&mut self, output_gradient: &VectorBatch) -> NetworkResult<VectorBatch> {
        ensure_width("softmax output gradient", self.width, output_gradient)?;
        let output = self.output.as_ref().ok_or_else(|| not_run("SoftMaxUnit"))?;
        if output.count() != output_gradient.count() {
            return Err(NetworkError::dimension(
                "softmax gradient count",
                output.count(),
                output_gradient.count(),
            ));
        }
        output.map(|y| y * (1.0 - y)).hadamard(output_gradient)
    }

    fn input(&self) -> Option<&VectorBatch> {
        self.input.as_ref()
    }

    fn output(&self) -> Option<&VectorBatch> {
        self.output.as_ref()
    }

    fn clone_component(&self) -> Box<dyn Component> {
        Box::new(self.clone())
    }
}
