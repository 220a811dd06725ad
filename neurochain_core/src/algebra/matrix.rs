use std::fmt::{self, Display};
use std::ops::Deref;

use ndarray::{Array1, Array2, Axis};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::algebra::batch::VectorBatch;
use crate::algebra::vector::Vector;
use crate::error::{NetworkError, NetworkResult};

/// A dense row-major matrix of reals.
///
/// Every arithmetic operation returns a new matrix; results never share row
/// storage with their operands. Binary operations require exact shape
/// agreement and report [`NetworkError::ShapeMismatch`] otherwise.
///
/// # Examples
///
/// ```
/// use neurochain_core::Matrix;
///
/// let a = Matrix::from_rows(&[vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();
/// let b = Matrix::from_rows(&[vec![5.0, 6.0], vec![7.0, 8.0]]).unwrap();
///
/// let product = a.multiply(&b).unwrap();
/// assert_eq!(product.get(1, 1).unwrap(), 50.0);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Matrix {
    values: Array2<f64>,
}

fn ensure_same_shape(operation: &'static str, a: &Matrix, b: &Matrix) -> NetworkResult<()> {
    if a.shape() != b.shape() {
        return Err(NetworkError::ShapeMismatch {
            operation,
            left: a.shape(),
            right: b.shape(),
        });
    }
    Ok(())
}

impl Matrix {
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            values: Array2::zeros((rows, cols)),
        }
    }

    pub fn from_array(values: Array2<f64>) -> Self {
        Self { values }
    }

    /// Builds a matrix from row vectors.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::DimensionMismatch`] if the rows are ragged.
    pub fn from_rows(rows: &[Vec<f64>]) -> NetworkResult<Self> {
        let cols = rows.first().map_or(0, Vec::len);
        let mut flat = Vec::with_capacity(rows.len() * cols);
        for row in rows {
            if row.len() != cols {
                return Err(NetworkError::dimension("matrix row", cols, row.len()));
            }
            flat.extend_from_slice(row);
        }
        Self::from_shape_vec(rows.len(), cols, flat)
    }

    /// Builds a `rows × cols` matrix from row-major data.
    pub fn from_shape_vec(rows: usize, cols: usize, data: Vec<f64>) -> NetworkResult<Self> {
        let len = data.len();
        let values = Array2::from_shape_vec((rows, cols), data)
            .map_err(|_| NetworkError::dimension("matrix data", rows * cols, len))?;
        Ok(Self { values })
    }

    /// Fills a matrix with values drawn uniformly from `[-limit, limit]`.
    pub fn random_uniform<R: Rng + ?Sized>(
        rows: usize,
        cols: usize,
        limit: f64,
        rng: &mut R,
    ) -> Self {
        Self {
            values: Array2::from_shape_fn((rows, cols), |_| (rng.gen::<f64>() - 0.5) * 2.0 * limit),
        }
    }

    pub fn rows(&self) -> usize {
        self.values.nrows()
    }

    pub fn cols(&self) -> usize {
        self.values.ncols()
    }

    pub fn shape(&self) -> (usize, usize) {
        self.values.dim()
    }

    pub fn as_array(&self) -> &Array2<f64> {
        &self.values
    }

    pub fn into_array(self) -> Array2<f64> {
        self.values
    }

    pub fn get(&self, row: usize, col: usize) -> NetworkResult<f64> {
        if row >= self.rows() {
            return Err(NetworkError::IndexOutOfRange {
                index: row,
                len: self.rows(),
            });
        }
        if col >= self.cols() {
            return Err(NetworkError::IndexOutOfRange {
                index: col,
                len: self.cols(),
            });
        }
        Ok(self.values[[row, col]])
    }

    /// Copies row `row` out as a dense [`Vector`].
    pub fn row(&self, row: usize) -> NetworkResult<Vector> {
        if row >= self.rows() {
            return Err(NetworkError::IndexOutOfRange {
                index: row,
                len: self.rows(),
            });
        }
        Ok(Vector::from_array(self.values.row(row).to_owned()))
    }

    pub fn add(&self, other: &Matrix) -> NetworkResult<Matrix> {
        ensure_same_shape("add", self, other)?;
        Ok(Self::from_array(&self.values + &other.values))
    }

    pub fn subtract(&self, other: &Matrix) -> NetworkResult<Matrix> {
        ensure_same_shape("subtract", self, other)?;
        Ok(Self::from_array(&self.values - &other.values))
    }

    /// Element-wise (Hadamard) product.
    pub fn hadamard(&self, other: &Matrix) -> NetworkResult<Matrix> {
        ensure_same_shape("hadamard", self, other)?;
        Ok(Self::from_array(&self.values * &other.values))
    }

    pub fn scale(&self, factor: f64) -> Matrix {
        Self::from_array(&self.values * factor)
    }

    /// Matrix product `self · other`.
    pub fn multiply(&self, other: &Matrix) -> NetworkResult<Matrix> {
        if self.cols() != other.rows() {
            return Err(NetworkError::ShapeMismatch {
                operation: "multiply",
                left: self.shape(),
                right: other.shape(),
            });
        }
        Ok(Self::from_array(self.values.dot(&other.values)))
    }

    /// Product `selfᵀ · other`, without materializing the transpose.
    pub fn transpose_multiply(&self, other: &Matrix) -> NetworkResult<Matrix> {
        if self.rows() != other.rows() {
            return Err(NetworkError::ShapeMismatch {
                operation: "transpose_multiply",
                left: self.shape(),
                right: other.shape(),
            });
        }
        Ok(Self::from_array(self.values.t().dot(&other.values)))
    }

    /// Product `self · otherᵀ`, without materializing the transpose.
    pub fn multiply_transpose(&self, other: &Matrix) -> NetworkResult<Matrix> {
        if self.cols() != other.cols() {
            return Err(NetworkError::ShapeMismatch {
                operation: "multiply_transpose",
                left: self.shape(),
                right: other.shape(),
            });
        }
        Ok(Self::from_array(self.values.dot(&other.values.t())))
    }

    pub fn transpose(&self) -> Matrix {
        Self::from_array(self.values.t().to_owned())
    }

    pub fn map(&self, f: impl Fn(f64) -> f64) -> Matrix {
        Self::from_array(self.values.mapv(f))
    }

    /// Clamps every element into `[-limit, limit]`.
    pub fn clip(&self, limit: f64) -> Matrix {
        self.map(|value| value.clamp(-limit, limit))
    }

    pub fn sum(&self) -> f64 {
        self.values.sum()
    }

    /// `true` when shapes agree and every element differs by at most `tolerance`.
    pub fn approx_eq(&self, other: &Matrix, tolerance: f64) -> bool {
        self.shape() == other.shape()
            && self
                .values
                .iter()
                .zip(other.values.iter())
                .all(|(a, b)| (a - b).abs() <= tolerance)
    }
}

impl Display for Matrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (rows, cols) = self.shape();
        write!(f, "Matrix {rows}x{cols} {}", self.values)
    }
}

/// Weights of an affine layer: one row per output, one column per input.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WeightsMatrix(Matrix);

impl WeightsMatrix {
    pub fn zeros(outputs: usize, inputs: usize) -> Self {
        Self(Matrix::zeros(outputs, inputs))
    }

    pub fn from_matrix(matrix: Matrix) -> Self {
        Self(matrix)
    }

    pub fn from_rows(rows: &[Vec<f64>]) -> NetworkResult<Self> {
        Matrix::from_rows(rows).map(Self)
    }

    /// Seeded Xavier-uniform initialization, limit `sqrt(6 / (inputs + outputs))`.
    ///
    /// The same seed always yields the same weights.
    pub fn xavier(inputs: usize, outputs: usize, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let fan = (inputs + outputs).max(1) as f64;
        let limit = (6.0 / fan).sqrt();
        Self(Matrix::random_uniform(outputs, inputs, limit, &mut rng))
    }

    /// Weight gradient of an affine layer, `∂L/∂Yᵀ · X`.
    ///
    /// Row `o`, column `i` is the sum over the batch of
    /// `output_gradient[n][o] * input[n][i]`.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::DimensionMismatch`] if the batches hold a
    /// different number of examples.
    pub fn from_vector_batch_pair(
        input: &VectorBatch,
        output_gradient: &VectorBatch,
    ) -> NetworkResult<Self> {
        if input.count() != output_gradient.count() {
            return Err(NetworkError::dimension(
                "weight gradient batch count",
                input.count(),
                output_gradient.count(),
            ));
        }
        output_gradient
            .as_matrix()
            .transpose_multiply(input.as_matrix())
            .map(Self)
    }

    pub fn outputs(&self) -> usize {
        self.0.rows()
    }

    pub fn inputs(&self) -> usize {
        self.0.cols()
    }

    pub fn as_matrix(&self) -> &Matrix {
        &self.0
    }

    pub fn add(&self, other: &WeightsMatrix) -> NetworkResult<WeightsMatrix> {
        self.0.add(&other.0).map(Self)
    }

    pub fn scale(&self, factor: f64) -> WeightsMatrix {
        Self(self.0.scale(factor))
    }

    pub fn clip(&self, limit: f64) -> WeightsMatrix {
        Self(self.0.clip(limit))
    }
}

impl Deref for WeightsMatrix {
    type Target = Matrix;

    fn deref(&self) -> &Matrix {
        &self.0
    }
}

/// Biases of an affine layer: a single `1 × outputs` row.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BiasesVector(Matrix);

impl BiasesVector {
    pub fn zeros(width: usize) -> Self {
        Self(Matrix::zeros(1, width))
    }

    pub fn from_vec(values: Vec<f64>) -> Self {
        Self(Matrix::from_array(
            Array1::from_vec(values).insert_axis(Axis(0)),
        ))
    }

    /// Wraps a matrix that must have exactly one row.
    pub fn from_matrix(matrix: Matrix) -> NetworkResult<Self> {
        if matrix.rows() != 1 {
            return Err(NetworkError::dimension("biases rows", 1, matrix.rows()));
        }
        Ok(Self(matrix))
    }

    pub(crate) fn from_column_sums(batch: &Matrix) -> Self {
        Self(Matrix::from_array(
            batch.as_array().sum_axis(Axis(0)).insert_axis(Axis(0)),
        ))
    }

    pub fn width(&self) -> usize {
        self.0.cols()
    }

    pub fn as_matrix(&self) -> &Matrix {
        &self.0
    }

    pub fn to_vector(&self) -> Vector {
        Vector::from_array(self.0.as_array().row(0).to_owned())
    }

    pub fn add(&self, other: &BiasesVector) -> NetworkResult<BiasesVector> {
        self.0.add(&other.0).map(Self)
    }

    pub fn scale(&self, factor: f64) -> BiasesVector {
        Self(self.0.scale(factor))
    }

    pub fn clip(&self, limit: f64) -> BiasesVector {
        Self(self.0.clip(limit))
    }
}

impl Deref for BiasesVector {
    type Target = Matrix;

    fn deref(&self) -> &Matrix {
        &self.0
    }
}
