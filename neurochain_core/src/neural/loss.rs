//! Cost functions for training.

use std::fmt::Debug;

use ndarray::Zip;
use serde::{Deserialize, Serialize};

use crate::algebra::{Matrix, VectorBatch};
use crate::error::{NetworkError, NetworkResult};

/// Smallest output `CrossEntropy` takes the logarithm of.
pub const PROBABILITY_FLOOR: f64 = 1e-12;

/// Scores a prediction batch against a target batch.
///
/// `cost` sums over every example in the batch; `gradient` is taken with
/// respect to `output` and has the same shape.
pub trait CostFunction: Debug + Send + Sync {
    fn cost(&self, target: &VectorBatch, output: &VectorBatch) -> NetworkResult<f64>;

    fn gradient(&self, target: &VectorBatch, output: &VectorBatch) -> NetworkResult<VectorBatch>;
}

fn ensure_same_shape(target: &VectorBatch, output: &VectorBatch) -> NetworkResult<()> {
    if target.shape() != output.shape() {
        return Err(NetworkError::ShapeMismatch {
            operation: "cost",
            left: target.shape(),
            right: output.shape(),
        });
    }
    Ok(())
}

/// `½ Σ (target − output)²`, gradient `output − target`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SquaredError;

impl CostFunction for SquaredError {
    fn cost(&self, target: &VectorBatch, output: &VectorBatch) -> NetworkResult<f64> {
        ensure_same_shape(target, output)?;
        let diff = output.subtract(target)?;
        Ok(0.5 * diff.as_array().mapv(|d| d * d).sum())
    }

    fn gradient(&self, target: &VectorBatch, output: &VectorBatch) -> NetworkResult<VectorBatch> {
        ensure_same_shape(target, output)?;
        output.subtract(target)
    }
}

/// `−Σ target · ln(output)` with outputs clamped to [`PROBABILITY_FLOOR`].
///
/// Meant to follow a softmax; targets are usually one-hot rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CrossEntropy;

impl CostFunction for CrossEntropy {
    fn cost(&self, target: &VectorBatch, output: &VectorBatch) -> NetworkResult<f64> {
        ensure_same_shape(target, output)?;
        let mut total = 0.0;
        Zip::from(target.as_array())
            .and(output.as_array())
            .for_each(|&t, &o| total -= t * o.max(PROBABILITY_FLOOR).ln());
        Ok(total)
    }

    fn gradient(&self, target: &VectorBatch, output: &VectorBatch) -> NetworkResult<VectorBatch> {
        ensure_same_shape(target, output)?;
        let values = Zip::from(target.as_array())
            .and(output.as_array())
            .map_collect(|&t, &o| -t / o.max(PROBABILITY_FLOOR));
        Ok(VectorBatch::from_matrix(Matrix::from_array(values)))
    }
}

/// Cost function selector used by configuration files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CostKind {
    #[default]
    SquaredError,
    CrossEntropy,
}

impl CostKind {
    pub fn build(self) -> Box<dyn CostFunction> {
        match self {
            CostKind::SquaredError => Box::new(SquaredError),
            CostKind::CrossEntropy => Box::new(CrossEntropy),
        }
    }
}
