//! Affine combiners and activated layers.

use ndarray::Zip;

use crate::algebra::{BiasesVector, Matrix, VectorBatch, WeightsMatrix};
use crate::error::{NetworkError, NetworkResult};
use crate::neural::activation::Activation;
use crate::neural::component::{
    ensure_width, not_run, Component, ParameterGradients, TrainableComponent,
};
use crate::neural::optimizer::AdaptationStrategy;

/// Affine transform `output = weights · input + biases`, applied per row.
///
/// # Architecture
///
/// ```text
/// input (n × inputs) → X · Wᵀ → + b (broadcast) → output (n × outputs)
/// ```
///
/// Backward computes `∂L/∂W = ∂L/∂Yᵀ · X`, `∂L/∂b = Σ_rows ∂L/∂Y` and
/// returns `∂L/∂X = ∂L/∂Y · W`.
#[derive(Debug, Clone)]
pub struct WeightedCombiner {
    weights: WeightsMatrix,
    biases: BiasesVector,
    accumulator: ParameterGradients,
    input: Option<VectorBatch>,
    output: Option<VectorBatch>,
}

impl WeightedCombiner {
    /// A combiner with all-zero weights and biases.
    pub fn new(inputs: usize, outputs: usize) -> Self {
        Self::with_parameters(WeightsMatrix::zeros(outputs, inputs), BiasesVector::zeros(outputs))
    }

    /// Seeded Xavier-uniform weights and zero biases.
    ///
    /// # Examples
    ///
    /// ```
    /// use neurochain_core::neural::{Component, WeightedCombiner};
    ///
    /// let combiner = WeightedCombiner::random(4, 2, 42);
    /// assert_eq!(combiner.number_of_inputs(), 4);
    /// assert_eq!(combiner.number_of_outputs(), 2);
    /// ```
    pub fn random(inputs: usize, outputs: usize, seed: u64) -> Self {
        Self::with_parameters(
            WeightsMatrix::xavier(inputs, outputs, seed),
            BiasesVector::zeros(outputs),
        )
    }

    /// Builds a combiner from explicit parameters.
    ///
    /// # Errors
    ///
    /// Fails if the bias width differs from the number of weight rows.
    pub fn from_parameters(weights: WeightsMatrix, biases: BiasesVector) -> NetworkResult<Self> {
        if biases.width() != weights.outputs() {
            return Err(NetworkError::dimension(
                "biases width",
                weights.outputs(),
                biases.width(),
            ));
        }
        Ok(Self::with_parameters(weights, biases))
    }

    fn with_parameters(weights: WeightsMatrix, biases: BiasesVector) -> Self {
        let accumulator = ParameterGradients::zeros(weights.outputs(), weights.inputs());
        Self {
            weights,
            biases,
            accumulator,
            input: None,
            output: None,
        }
    }

    pub fn weights(&self) -> &WeightsMatrix {
        &self.weights
    }

    pub fn biases(&self) -> &BiasesVector {
        &self.biases
    }

    fn reset_accumulator(&mut self) -> ParameterGradients {
        let fresh = ParameterGradients::zeros(self.weights.outputs(), self.weights.inputs());
        std::mem::replace(&mut self.accumulator, fresh)
    }
}

impl Component for WeightedCombiner {
    fn number_of_inputs(&self) -> usize {
        self.weights.inputs()
    }

    fn number_of_outputs(&self) -> usize {
        self.weights.outputs()
    }

    fn run(&mut self, input: &VectorBatch) -> NetworkResult<VectorBatch> {
        ensure_width("combiner input", self.number_of_inputs(), input)?;
        let output = input.transform(&self.weights)?.add_to_each_vector(&self.biases)?;
        self.input = Some(input.clone());
        self.output = Some(output.clone());
        Ok(output)
    }

    fn back_propagate(&mut self, output_gradient: &VectorBatch) -> NetworkResult<VectorBatch> {
        ensure_width("combiner output gradient", self.number_of_outputs(), output_gradient)?;
        let input = self.input.as_ref().ok_or_else(|| not_run("WeightedCombiner"))?;

        let weight_gradient = WeightsMatrix::from_vector_batch_pair(input, output_gradient)?;
        let bias_gradient = output_gradient.sum_columns_as_matrix();
        self.accumulator
            .accumulate(&weight_gradient, &bias_gradient, output_gradient.count())?;

        output_gradient.transform_back(&self.weights)
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

impl TrainableComponent for WeightedCombiner {
    fn gradients(&self) -> Vec<ParameterGradients> {
        vec![self.accumulator.clone()]
    }

    fn take_gradients(&mut self) -> Vec<ParameterGradients> {
        vec![self.reset_accumulator()]
    }

    fn apply_gradients(
        &mut self,
        gradients: &[ParameterGradients],
        strategy: &dyn AdaptationStrategy,
    ) -> NetworkResult<()> {
        let [gradient] = gradients else {
            return Err(NetworkError::dimension("parameter sets", 1, gradients.len()));
        };
        if gradient.is_empty() {
            return Ok(());
        }
        let weights_delta = strategy.weights_update(&gradient.weights, gradient.examples);
        let biases_delta = strategy.biases_update(&gradient.biases, gradient.examples);
        let weights = self.weights.add(&weights_delta)?;
        let biases = self.biases.add(&biases_delta)?;
        self.weights = weights;
        self.biases = biases;
        Ok(())
    }

    fn parameter_sets(&self) -> usize {
        1
    }

    fn clone_trainable(&self) -> Box<dyn TrainableComponent> {
        Box::new(self.clone())
    }

    fn as_component(&self) -> &dyn Component {
        self
    }
}

/// A [`WeightedCombiner`] followed by a pointwise [`Activation`].
///
/// Backward scales the incoming gradient by the activation derivative,
/// evaluated at the cached pre- and post-activation values, then hands the
/// result to the combiner. With [`Activation::Identity`] the layer is a
/// plain affine transform.
#[derive(Debug, Clone)]
pub struct Layer {
    combiner: WeightedCombiner,
    activation: Activation,
    output: Option<VectorBatch>,
}

impl Layer {
    pub fn new(combiner: WeightedCombiner, activation: Activation) -> Self {
        Self {
            combiner,
            activation,
            output: None,
        }
    }

    /// Seeded random layer, see [`WeightedCombiner::random`].
    pub fn random(inputs: usize, outputs: usize, activation: Activation, seed: u64) -> Self {
        Self::new(WeightedCombiner::random(inputs, outputs, seed), activation)
    }

    /// A layer without a nonlinearity.
    pub fn linear(combiner: WeightedCombiner) -> Self {
        Self::new(combiner, Activation::Identity)
    }

    pub fn activation(&self) -> Activation {
        self.activation
    }

    pub fn combiner(&self) -> &WeightedCombiner {
        &self.combiner
    }

    pub fn weights(&self) -> &WeightsMatrix {
        self.combiner.weights()
    }

    pub fn biases(&self) -> &BiasesVector {
        self.combiner.biases()
    }
}

impl Component for Layer {
    fn number_of_inputs(&self) -> usize {
        self.combiner.number_of_inputs()
    }

    fn number_of_outputs(&self) -> usize {
        self.combiner.number_of_outputs()
    }

    fn run(&mut self, input: &VectorBatch) -> NetworkResult<VectorBatch> {
        let activation = self.activation;
        let pre_activation = self.combiner.run(input)?;
        let output = pre_activation.map(|x| activation.apply(x));
        self.output = Some(output.clone());
        Ok(output)
    }

    fn back_propagate(&mut self, output_gradient: &VectorBatch) -> NetworkResult<VectorBatch> {
        ensure_width("layer output gradient", self.number_of_outputs(), output_gradient)?;
        let (Some(pre_activation), Some(post_activation)) =
            (self.combiner.output(), self.output.as_ref())
        else {
            return Err(not_run("Layer"));
        };
        if output_gradient.count() != post_activation.count() {
            return Err(NetworkError::dimension(
                "layer gradient count",
                post_activation.count(),
                output_gradient.count(),
            ));
        }

        let activation = self.activation;
        let activation_gradient = Zip::from(pre_activation.as_array())
            .and(post_activation.as_array())
            .and(output_gradient.as_array())
            .map_collect(|&pre, &post, &g| activation.derivative(pre, post) * g);

        self.combiner
            .back_propagate(&VectorBatch::from_matrix(Matrix::from_array(activation_gradient)))
    }

    fn input(&self) -> Option<&VectorBatch> {
        self.combiner.input()
    }

    fn output(&self) -> Option<&VectorBatch> {
        self.output.as_ref()
    }

    fn clone_component(&self) -> Box<dyn Component> {
        Box::new(self.clone())
    }
}

impl TrainableComponent for Layer {
    fn gradients(&self) -> Vec<ParameterGradients> {
        self.combiner.gradients()
    }

    fn take_gradients(&mut self) -> Vec<ParameterGradients> {
        self.combiner.take_gradients()
    }

    fn apply_gradients(
        &mut self,
        gradients: &[ParameterGradients],
        strategy: &dyn AdaptationStrategy,
    ) -> NetworkResult<()> {
        self.combiner.apply_gradients(gradients, strategy)
    }

    fn parameter_sets(&self) -> usize {
        1
    }

    fn clone_trainable(&self) -> Box<dyn TrainableComponent> {
        Box::new(self.clone())
    }

    fn as_component(&self) -> &dyn Component {
        self
    }
}
