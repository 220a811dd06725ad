use std::ops::Deref;

use ndarray::{s, Array2, Axis};
use serde::{Deserialize, Serialize};

use crate::algebra::matrix::{BiasesVector, Matrix, WeightsMatrix};
use crate::algebra::vector::Vector;
use crate::error::{NetworkError, NetworkResult};

/// A matrix read as a batch of equal-width row vectors, one row per example.
///
/// Components always run on batches; a single example is a batch of count 1.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VectorBatch(Matrix);

impl VectorBatch {
    pub fn from_matrix(matrix: Matrix) -> Self {
        Self(matrix)
    }

    pub fn from_rows(rows: &[Vec<f64>]) -> NetworkResult<Self> {
        Matrix::from_rows(rows).map(Self)
    }

    /// Stacks vectors into a batch. Sparse vectors are materialized row by row.
    ///
    /// # Errors
    ///
    /// Fails with [`NetworkError::InvalidArgument`] on an empty slice and
    /// [`NetworkError::DimensionMismatch`] if the lengths differ.
    pub fn from_vectors(vectors: &[Vector]) -> NetworkResult<Self> {
        let first = vectors
            .first()
            .ok_or_else(|| {
                NetworkError::InvalidArgument("batch needs at least one vector".into())
            })?;
        let dimension = first.len();
        let mut values = Array2::zeros((vectors.len(), dimension));
        for (row, vector) in vectors.iter().enumerate() {
            if vector.len() != dimension {
                return Err(NetworkError::dimension("batch vector", dimension, vector.len()));
            }
            for (col, value) in vector.iter().enumerate() {
                values[[row, col]] = value;
            }
        }
        Ok(Self(Matrix::from_array(values)))
    }

    /// A batch holding the single example `vector`.
    pub fn from_vector(vector: &Vector) -> Self {
        let values = vector.to_array().insert_axis(Axis(0));
        Self(Matrix::from_array(values))
    }

    /// Number of examples (rows).
    pub fn count(&self) -> usize {
        self.0.rows()
    }

    /// Feature width (columns).
    pub fn dimension(&self) -> usize {
        self.0.cols()
    }

    pub fn as_matrix(&self) -> &Matrix {
        &self.0
    }

    pub fn into_matrix(self) -> Matrix {
        self.0
    }

    pub fn vectors(&self) -> impl Iterator<Item = Vector> + '_ {
        self.0
            .as_array()
            .outer_iter()
            .map(|row| Vector::from_array(row.to_owned()))
    }

    /// Rows `start..end` as a new batch.
    pub fn slice_rows(&self, start: usize, end: usize) -> NetworkResult<Self> {
        if start > end || end > self.count() {
            return Err(NetworkError::IndexOutOfRange {
                index: end,
                len: self.count(),
            });
        }
        Ok(Self(Matrix::from_array(
            self.0.as_array().slice(s![start..end, ..]).to_owned(),
        )))
    }

    /// Splits the batch into consecutive shards of at most `size` rows.
    pub fn chunks(&self, size: usize) -> Vec<Self> {
        let size = size.max(1);
        self.0
            .as_array()
            .axis_chunks_iter(Axis(0), size)
            .map(|chunk| Self(Matrix::from_array(chunk.to_owned())))
            .collect()
    }

    pub fn add(&self, other: &VectorBatch) -> NetworkResult<VectorBatch> {
        self.0.add(&other.0).map(Self)
    }

    pub fn subtract(&self, other: &VectorBatch) -> NetworkResult<VectorBatch> {
        self.0.subtract(&other.0).map(Self)
    }

    pub fn hadamard(&self, other: &VectorBatch) -> NetworkResult<VectorBatch> {
        self.0.hadamard(&other.0).map(Self)
    }

    pub fn scale(&self, factor: f64) -> VectorBatch {
        Self(self.0.scale(factor))
    }

    pub fn map(&self, f: impl Fn(f64) -> f64) -> VectorBatch {
        Self(self.0.map(f))
    }

    /// Pushes each row through `weights`: `X · Wᵀ`, one output row per example.
    pub fn transform(&self, weights: &WeightsMatrix) -> NetworkResult<VectorBatch> {
        if self.dimension() != weights.inputs() {
            return Err(NetworkError::dimension(
                "weights input width",
                weights.inputs(),
                self.dimension(),
            ));
        }
        self.0.multiply_transpose(weights.as_matrix()).map(Self)
    }

    /// Pulls output-space rows back through `weights`: `G · W`.
    pub fn transform_back(&self, weights: &WeightsMatrix) -> NetworkResult<VectorBatch> {
        if self.dimension() != weights.outputs() {
            return Err(NetworkError::dimension(
                "weights output width",
                weights.outputs(),
                self.dimension(),
            ));
        }
        self.0.multiply(weights.as_matrix()).map(Self)
    }

    /// Broadcasts the single row `biases` onto every row.
    pub fn add_to_each_vector(&self, biases: &BiasesVector) -> NetworkResult<VectorBatch> {
        if biases.width() != self.dimension() {
            return Err(NetworkError::dimension(
                "broadcast row",
                self.dimension(),
                biases.width(),
            ));
        }
        let row = biases.as_array().row(0);
        Ok(Self(Matrix::from_array(self.0.as_array() + &row)))
    }

    /// Subtracts each row's maximum from that row.
    ///
    /// A row whose maximum is `+inf` maps its infinite entries to `0.0` and
    /// every other entry to `-inf`, the limit of the shift. Rows with no
    /// finite or infinite maximum (all `-inf` or `NaN`) are left as they are.
    pub fn subtract_row_maxima(&self) -> VectorBatch {
        let mut values = self.0.as_array().clone();
        for mut row in values.outer_iter_mut() {
            let max = row.fold(f64::NEG_INFINITY, |m, &v| m.max(v));
            if max.is_finite() {
                row.mapv_inplace(|v| v - max);
            } else if max == f64::INFINITY {
                row.mapv_inplace(|v| if v == f64::INFINITY { 0.0 } else { f64::NEG_INFINITY });
            }
        }
        Self(Matrix::from_array(values))
    }

    /// Divides each row by its own sum. Rows summing to zero are left as they are.
    pub fn divide_by_row_sums(&self) -> VectorBatch {
        let mut values = self.0.as_array().clone();
        for mut row in values.outer_iter_mut() {
            let sum = row.sum();
            if sum != 0.0 {
                row.mapv_inplace(|v| v / sum);
            }
        }
        Self(Matrix::from_array(values))
    }

    /// Column sums as a single bias-shaped row.
    pub fn sum_columns_as_matrix(&self) -> BiasesVector {
        BiasesVector::from_column_sums(&self.0)
    }

    /// Index of the largest entry in every row.
    pub fn row_argmax(&self) -> Vec<usize> {
        self.0
            .as_array()
            .outer_iter()
            .map(|row| {
                row.iter()
                    .enumerate()
                    .fold((0, f64::NEG_INFINITY), |(best, max), (i, &v)| {
                        if v > max {
                            (i, v)
                        } else {
                            (best, max)
                        }
                    })
                    .0
            })
            .collect()
    }
}

impl Deref for VectorBatch {
    type Target = Matrix;

    fn deref(&self) -> &Matrix {
        &self.0
    }
}

impl From<&Vector> for VectorBatch {
    fn from(vector: &Vector) -> Self {
        Self::from_vector(vector)
    }
}
