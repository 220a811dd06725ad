//! Drives run / cost / back-propagate / update cycles over a trainable root.

use std::time::Instant;

use crate::algebra::VectorBatch;
use crate::config::TrainingConfig;
use crate::error::{NetworkError, NetworkResult, TrainingError};
use crate::logging::{log_epoch, EpochLogEntry};
use crate::neural::{
    AdaptationStrategy, ClippedGradientDescent, Component, CostFunction, GradientDescent,
    TrainableComponent,
};
use crate::training::data::{self, Sample, TrainingBatch};
use crate::training::{EpochReport, TrainingMode, TrainingReport};

/// Trains a root component (usually a
/// [`ComponentChain`](crate::neural::ComponentChain)) with an injected cost
/// function and adaptation strategy.
///
/// `cost()` reads the accumulator, which sums the cost of every example seen
/// since the last [`reset_cost`](Trainer::reset_cost). Each epoch starts from
/// zero.
///
/// # Examples
///
/// ```
/// use neurochain_core::neural::{Activation, ComponentChain, GradientDescent, Layer, SquaredError};
/// use neurochain_core::training::{Sample, Trainer};
///
/// let mut chain = ComponentChain::new();
/// chain.add_trainable(Layer::random(2, 1, Activation::Identity, 7)).unwrap();
///
/// let mut trainer = Trainer::new(chain, SquaredError, GradientDescent::new(0.05).unwrap());
/// let sample = Sample::new(vec![1.0, 2.0], vec![3.0]);
/// let before = trainer.evaluate(std::slice::from_ref(&sample)).unwrap();
/// for _ in 0..50 {
///     trainer.train_example(&sample).unwrap();
/// }
/// assert!(trainer.evaluate(&[sample]).unwrap() < before);
/// ```
#[derive(Debug)]
pub struct Trainer<C> {
    pub(super) component: C,
    pub(super) cost_function: Box<dyn CostFunction>,
    pub(super) strategy: Box<dyn AdaptationStrategy>,
    cost: f64,
    examples: usize,
}

impl<C: TrainableComponent + Clone> Trainer<C> {
    pub fn new(
        component: C,
        cost_function: impl CostFunction + 'static,
        strategy: impl AdaptationStrategy + 'static,
    ) -> Self {
        Self::with_boxed(component, Box::new(cost_function), Box::new(strategy))
    }

    pub fn with_boxed(
        component: C,
        cost_function: Box<dyn CostFunction>,
        strategy: Box<dyn AdaptationStrategy>,
    ) -> Self {
        Self {
            component,
            cost_function,
            strategy,
            cost: 0.0,
            examples: 0,
        }
    }

    /// Builds the cost function and strategy named by `config`.
    ///
    /// A `max_gradient` selects [`ClippedGradientDescent`], otherwise plain
    /// [`GradientDescent`].
    pub fn from_config(component: C, config: &TrainingConfig) -> NetworkResult<Self> {
        let strategy: Box<dyn AdaptationStrategy> = match config.max_gradient {
            Some(max_gradient) => {
                Box::new(ClippedGradientDescent::new(config.step_size, max_gradient)?)
            }
            None => Box::new(GradientDescent::new(config.step_size)?),
        };
        Ok(Self::with_boxed(component, config.cost.build(), strategy))
    }

    pub fn component(&self) -> &C {
        &self.component
    }

    pub fn component_mut(&mut self) -> &mut C {
        &mut self.component
    }

    pub fn into_component(self) -> C {
        self.component
    }

    /// Cost accumulated since the last reset.
    pub fn cost(&self) -> f64 {
        self.cost
    }

    /// Examples contributing to [`cost`](Trainer::cost).
    pub fn examples(&self) -> usize {
        self.examples
    }

    pub fn reset_cost(&mut self) {
        self.cost = 0.0;
        self.examples = 0;
    }

    /// Output of the root component's most recent run.
    pub fn output(&self) -> Option<&VectorBatch> {
        self.component.output()
    }

    pub(super) fn record_cost(&mut self, cost: f64, examples: usize) {
        self.cost += cost;
        self.examples += examples;
    }

    fn forward_backward(
        &mut self,
        inputs: &VectorBatch,
        targets: &VectorBatch,
    ) -> NetworkResult<f64> {
        let output = self.component.run(inputs)?;
        let cost = self.cost_function.cost(targets, &output)?;
        let gradient = self.cost_function.gradient(targets, &output)?;
        self.component.back_propagate(&gradient)?;
        self.record_cost(cost, inputs.count());
        Ok(cost)
    }

    /// Online step: run, back-propagate and update on a single example.
    pub fn train_example(&mut self, sample: &Sample) -> NetworkResult<f64> {
        let inputs = VectorBatch::from_vector(&sample.input);
        let targets = VectorBatch::from_vector(&sample.target);
        let cost = self.forward_backward(&inputs, &targets)?;
        self.component.update(self.strategy.as_ref())?;
        Ok(cost)
    }

    /// Mini-batch step: one forward and backward pass over the whole batch,
    /// then a single update.
    pub fn train_batch(&mut self, batch: &TrainingBatch) -> NetworkResult<f64> {
        let cost = self.forward_backward(batch.inputs(), batch.targets())?;
        self.component.update(self.strategy.as_ref())?;
        Ok(cost)
    }

    /// One pass over `samples`, returning the epoch's accumulated cost.
    ///
    /// `batch_size` is ignored in online mode; `workers` only matters in
    /// parallel mode.
    pub fn train_epoch(
        &mut self,
        samples: &[Sample],
        mode: TrainingMode,
        batch_size: usize,
        workers: usize,
    ) -> NetworkResult<f64> {
        self.reset_cost();
        match mode {
            TrainingMode::Online => {
                for sample in samples {
                    self.train_example(sample)?;
                }
            }
            TrainingMode::Batch => {
                for batch in data::batches(samples, batch_size)? {
                    self.train_batch(&batch)?;
                }
            }
            TrainingMode::Parallel => {
                for batch in data::batches(samples, batch_size)? {
                    self.train_batch_parallel(&batch, workers)?;
                }
            }
        }
        Ok(self.cost)
    }

    /// Runs `config.epochs` epochs, shuffling with `seed + epoch` when enabled.
    ///
    /// Each epoch is reported through `tracing` and, if `log_path` is set,
    /// appended to the JSON-lines log.
    pub fn train(
        &mut self,
        samples: &[Sample],
        config: &TrainingConfig,
    ) -> Result<TrainingReport, TrainingError> {
        config
            .validate()
            .map_err(|err| NetworkError::InvalidArgument(err.to_string()))?;

        let mut report = TrainingReport::default();
        for epoch in 0..config.epochs {
            let shuffled;
            let order: &[Sample] = if config.shuffle {
                shuffled = data::shuffled(samples, config.seed.wrapping_add(epoch as u64));
                &shuffled
            } else {
                samples
            };

            let started = Instant::now();
            let cost = self.train_epoch(order, config.mode, config.batch_size, config.workers)?;
            let elapsed = started.elapsed();

            if !cost.is_finite() {
                tracing::warn!(epoch, cost, "epoch cost is not finite; check the step size");
            }
            tracing::info!(
                epoch,
                cost,
                examples = self.examples,
                mode = config.mode.as_str(),
                elapsed_ms = elapsed.as_millis() as u64,
                "epoch complete"
            );

            if let Some(path) = &config.log_path {
                let entry = EpochLogEntry::new(epoch, config.mode, cost, self.examples, elapsed);
                log_epoch(path, &entry)?;
            }

            report.epochs.push(EpochReport {
                epoch,
                cost,
                examples: self.examples,
                elapsed,
            });
        }
        Ok(report)
    }

    /// Total cost over `samples`.
    ///
    /// Parameters and accumulated gradients are left alone, but the forward
    /// pass replaces the cached input and output of the root component (and
    /// of every component inside it), so [`Trainer::output`] reports the
    /// evaluation batch afterwards.
    pub fn evaluate(&mut self, samples: &[Sample]) -> NetworkResult<f64> {
        if samples.is_empty() {
            return Ok(0.0);
        }
        let batch = TrainingBatch::from_samples(samples)?;
        let output = self.component.run(batch.inputs())?;
        self.cost_function.cost(batch.targets(), &output)
    }

    /// Fraction of samples whose output argmax matches the target argmax.
    ///
    /// Like [`Trainer::evaluate`], this overwrites the cached activations.
    pub fn accuracy(&mut self, samples: &[Sample]) -> NetworkResult<f64> {
        if samples.is_empty() {
            return Ok(0.0);
        }
        let batch = TrainingBatch::from_samples(samples)?;
        let output = self.component.run(batch.inputs())?;
        let predicted = output.row_argmax();
        let expected = batch.targets().row_argmax();
        let correct = predicted.iter().zip(&expected).filter(|(p, e)| p == e).count();
        Ok(correct as f64 / samples.len() as f64)
    }
}
