//! Differentiable components and the pipelines built from them.
//!
//! Every stage implements [`Component`]: a forward `run` and a backward
//! `back_propagate` over a [`VectorBatch`](crate::algebra::VectorBatch).
//! Stages that own weights additionally implement [`TrainableComponent`] and
//! accumulate parameter gradients until an [`AdaptationStrategy`] consumes
//! them.

pub mod activation;
pub mod chain;
pub mod component;
pub mod layer;
pub mod loss;
pub mod optimizer;
pub mod softmax;

pub use activation::Activation;
pub use chain::{ComponentChain, ComponentId};
pub use component::{Component, ParameterGradients, TrainableComponent};
pub use layer::{Layer, WeightedCombiner};
pub use loss::{CostFunction, CostKind, CrossEntropy, SquaredError};
pub use optimizer::{AdaptationStrategy, ClippedGradientDescent, GradientDescent};
pub use softmax::SoftMaxUnit;
