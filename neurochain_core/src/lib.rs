//! # Neurochain Core
//!
//! A from-scratch neural network training engine. Networks are pipelines of
//! differentiable components: affine layers, pointwise activations and
//! softmax units, composed into a [`ComponentChain`] that is itself a
//! trainable component. Training runs forward passes, back-propagates the
//! cost gradient and updates parameters online, per mini-batch, or across
//! parallel shards.
//!
//! ## Quick Start
//!
//! ```rust
//! use neurochain_core::neural::{Activation, ComponentChain, GradientDescent, Layer, SquaredError};
//! use neurochain_core::training::{Sample, Trainer, TrainingMode};
//!
//! let mut chain = ComponentChain::new();
//! chain.add_trainable(Layer::random(2, 4, Activation::Tanh, 1)).unwrap();
//! chain.add_trainable(Layer::random(4, 1, Activation::Identity, 2)).unwrap();
//!
//! let samples = vec![
//!     Sample::new(vec![0.0, 1.0], vec![1.0]),
//!     Sample::new(vec![1.0, 0.0], vec![-1.0]),
//! ];
//!
//! let mut trainer = Trainer::new(chain, SquaredError, GradientDescent::new(0.1).unwrap());
//! let first = trainer.train_epoch(&samples, TrainingMode::Online, 1, 1).unwrap();
//! for _ in 0..50 {
//!     trainer.train_epoch(&samples, TrainingMode::Online, 1, 1).unwrap();
//! }
//! assert!(trainer.cost() < first);
//! ```
//!
//! ## Core Modules
//!
//! - [`algebra`] - Sparse-aware vectors, dense matrices and vector batches
//! - [`neural`] - Components, layers, chains, costs and adaptation strategies
//! - [`training`] - Trainer, samples and training modes
//! - [`config`] - Training and network configuration via TOML
//! - [`logging`] - JSON line-delimited epoch logging

pub mod algebra;
pub mod config;
pub mod error;
pub mod logging;
pub mod neural;
pub mod training;

pub use algebra::{BiasesVector, Matrix, Representation, Vector, VectorBatch, WeightsMatrix};
pub use config::{ConfigError, LayerSpec, NetworkConfig, TrainingConfig};
pub use error::{NetworkError, NetworkResult, TrainingError};
pub use logging::EpochLogEntry;
pub use neural::{
    Activation, AdaptationStrategy, ClippedGradientDescent, Component, ComponentChain, ComponentId,
    CostFunction, CostKind, CrossEntropy, GradientDescent, Layer, ParameterGradients, SoftMaxUnit,
    SquaredError, TrainableComponent, WeightedCombiner,
};
pub use training::{EpochReport, Sample, Trainer, TrainingBatch, TrainingMode, TrainingReport};
