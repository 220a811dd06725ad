//! Numeric building blocks: sparse-aware vectors, dense matrices and batches.
//!
//! [`Vector`] hides several storage strategies behind one type. [`Matrix`]
//! is always dense; [`WeightsMatrix`], [`BiasesVector`] and [`VectorBatch`]
//! are named roles over it.

pub mod batch;
pub mod matrix;
pub mod vector;

pub use batch::VectorBatch;
pub use matrix::{BiasesVector, Matrix, WeightsMatrix};
pub use vector::{Representation, Vector};
