//! Error types for algebra, component and training operations.
//!
//! Every error here signals a caller mistake (mismatched widths, bad indices,
//! misuse of an empty chain). None are transient and none are swallowed inside
//! the crate.

use thiserror::Error;

/// Result type alias for network operations.
pub type NetworkResult<T> = Result<T, NetworkError>;

/// Errors raised by vectors, matrices, components and trainers.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum NetworkError {
    /// A width or length did not match what the operation requires.
    #[error("dimension mismatch in {context}: expected {expected}, got {got}")]
    DimensionMismatch {
        context: String,
        expected: usize,
        got: usize,
    },

    /// Two matrices had incompatible shapes for a binary operation.
    #[error("shape mismatch in {operation}: {left:?} vs {right:?}")]
    ShapeMismatch {
        operation: &'static str,
        left: (usize, usize),
        right: (usize, usize),
    },

    /// Element access outside `[0, len)`.
    #[error("index {index} out of range for length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    /// A chain with no components was asked to run or back-propagate.
    #[error("cannot {operation} an empty component chain")]
    EmptyChain { operation: &'static str },

    /// An argument was malformed (empty rows, non-finite step size, ...).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The call is not valid in the component's current state.
    #[error("invalid operation: {0}")]
    InvalidOperation(String),
}

impl NetworkError {
    pub(crate) fn dimension(context: impl Into<String>, expected: usize, got: usize) -> Self {
        NetworkError::DimensionMismatch {
            context: context.into(),
            expected,
            got,
        }
    }

    /// Returns `true` for the argument-error family: width, length and shape mismatches
    /// and malformed arguments.
    pub fn is_argument_error(&self) -> bool {
        matches!(
            self,
            NetworkError::DimensionMismatch { .. }
                | NetworkError::ShapeMismatch { .. }
                | NetworkError::InvalidArgument(_)
        )
    }
}

/// Errors raised while driving a training run.
#[derive(Debug, Error)]
pub enum TrainingError {
    #[error(transparent)]
    Network(#[from] NetworkError),

    /// The JSON-lines epoch log could not be written.
    #[error("failed to write training log: {0}")]
    Log(#[from] std::io::Error),
}
