//! Ordered composition of components.

use std::fmt;

use tracing::debug;

use crate::algebra::VectorBatch;
use crate::error::{NetworkError, NetworkResult};
use crate::neural::component::{ensure_width, Component, ParameterGradients, TrainableComponent};
use crate::neural::optimizer::AdaptationStrategy;

/// Stable handle to a component appended to a [`ComponentChain`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentId(usize);

impl ComponentId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

enum Node {
    Fixed(Box<dyn Component>),
    Trainable(Box<dyn TrainableComponent>),
}

impl Node {
    fn component(&self) -> &dyn Component {
        match self {
            Node::Fixed(component) => component.as_ref(),
            Node::Trainable(component) => component.as_component(),
        }
    }

    fn run(&mut self, input: &VectorBatch) -> NetworkResult<VectorBatch> {
        match self {
            Node::Fixed(component) => component.run(input),
            Node::Trainable(component) => component.run(input),
        }
    }

    fn back_propagate(&mut self, gradient: &VectorBatch) -> NetworkResult<VectorBatch> {
        match self {
            Node::Fixed(component) => component.back_propagate(gradient),
            Node::Trainable(component) => component.back_propagate(gradient),
        }
    }
}

impl Clone for Node {
    fn clone(&self) -> Self {
        match self {
            Node::Fixed(component) => Node::Fixed(component.clone_component()),
            Node::Trainable(component) => Node::Trainable(component.clone_trainable()),
        }
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Fixed(component) => f.debug_tuple("Fixed").field(component).finish(),
            Node::Trainable(component) => f.debug_tuple("Trainable").field(component).finish(),
        }
    }
}

/// A pipeline of components that is itself a trainable component.
///
/// Forward runs head to tail, backward tail to head. Every append checks
/// that the new component's input width equals the current tail's output
/// width. Components live in an arena and are visited through an ordered
/// index list.
///
/// # Examples
///
/// ```
/// use neurochain_core::neural::{Activation, Component, ComponentChain, Layer, SoftMaxUnit};
/// use neurochain_core::VectorBatch;
///
/// let mut chain = ComponentChain::new();
/// chain.add_trainable(Layer::random(4, 3, Activation::Tanh, 1)).unwrap();
/// chain.add_fixed(SoftMaxUnit::new(3)).unwrap();
///
/// let input = VectorBatch::from_rows(&[vec![0.1, 0.2, 0.3, 0.4]]).unwrap();
/// let output = chain.run(&input).unwrap();
/// assert_eq!(output.dimension(), 3);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ComponentChain {
    nodes: Vec<Node>,
    order: Vec<usize>,
    input: Option<VectorBatch>,
    output: Option<VectorBatch>,
}

impl ComponentChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Appends a component without parameters.
    pub fn add_fixed(&mut self, component: impl Component + 'static) -> NetworkResult<ComponentId> {
        self.push(Node::Fixed(Box::new(component)))
    }

    /// Appends a component whose parameters are updated during training.
    pub fn add_trainable(
        &mut self,
        component: impl TrainableComponent + 'static,
    ) -> NetworkResult<ComponentId> {
        self.push(Node::Trainable(Box::new(component)))
    }

    fn push(&mut self, node: Node) -> NetworkResult<ComponentId> {
        let inputs = node.component().number_of_inputs();
        if let Some(tail) = self.tail() {
            let expected = tail.number_of_outputs();
            if expected != inputs {
                return Err(NetworkError::dimension("chain append", expected, inputs));
            }
        }

        let id = ComponentId(self.nodes.len());
        debug!(
            component = %id,
            trainable = matches!(node, Node::Trainable(_)),
            inputs,
            outputs = node.component().number_of_outputs(),
            "appended component to chain"
        );
        self.nodes.push(node);
        self.order.push(id.0);
        Ok(id)
    }

    fn tail(&self) -> Option<&dyn Component> {
        self.order.last().map(|&index| self.nodes[index].component())
    }

    fn head(&self) -> Option<&dyn Component> {
        self.order.first().map(|&index| self.nodes[index].component())
    }

    pub fn component(&self, id: ComponentId) -> Option<&dyn Component> {
        self.nodes.get(id.0).map(Node::component)
    }

    /// Component ids head to tail.
    pub fn ids(&self) -> impl Iterator<Item = ComponentId> + '_ {
        self.order.iter().map(|&index| ComponentId(index))
    }

    pub fn is_trainable(&self, id: ComponentId) -> bool {
        matches!(self.nodes.get(id.0), Some(Node::Trainable(_)))
    }

    /// Trainable members, head to tail.
    pub fn trainable_components(
        &self,
    ) -> impl Iterator<Item = (ComponentId, &dyn TrainableComponent)> + '_ {
        self.order.iter().filter_map(|&index| match &self.nodes[index] {
            Node::Trainable(component) => Some((ComponentId(index), component.as_ref())),
            Node::Fixed(_) => None,
        })
    }

    fn trainable_components_mut(&mut self) -> Vec<&mut Box<dyn TrainableComponent>> {
        let mut slots: Vec<Option<&mut Node>> = self.nodes.iter_mut().map(Some).collect();
        self.order
            .iter()
            .filter_map(|&index| match slots[index].take() {
                Some(Node::Trainable(component)) => Some(component),
                _ => None,
            })
            .collect()
    }
}

impl Component for ComponentChain {
    fn number_of_inputs(&self) -> usize {
        self.head().map_or(0, |head| head.number_of_inputs())
    }

    fn number_of_outputs(&self) -> usize {
        self.tail().map_or(0, |tail| tail.number_of_outputs())
    }

    fn run(&mut self, input: &VectorBatch) -> NetworkResult<VectorBatch> {
        if self.is_empty() {
            return Err(NetworkError::EmptyChain { operation: "run" });
        }
        ensure_width("chain input", self.number_of_inputs(), input)?;

        let mut activation = input.clone();
        for &index in &self.order {
            activation = self.nodes[index].run(&activation)?;
        }

        self.input = Some(input.clone());
        self.output = Some(activation.clone());
        Ok(activation)
    }

    fn back_propagate(&mut self, output_gradient: &VectorBatch) -> NetworkResult<VectorBatch> {
        if self.is_empty() {
            return Err(NetworkError::EmptyChain {
                operation: "back-propagate",
            });
        }
        ensure_width("chain output gradient", self.number_of_outputs(), output_gradient)?;

        let mut gradient = output_gradient.clone();
        for &index in self.order.iter().rev() {
            gradient = self.nodes[index].back_propagate(&gradient)?;
        }
        Ok(gradient)
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

impl TrainableComponent for ComponentChain {
    fn gradients(&self) -> Vec<ParameterGradients> {
        self.trainable_components()
            .flat_map(|(_, component)| component.gradients())
            .collect()
    }

    fn take_gradients(&mut self) -> Vec<ParameterGradients> {
        self.trainable_components_mut()
            .into_iter()
            .flat_map(|component| component.take_gradients())
            .collect()
    }

    fn apply_gradients(
        &mut self,
        gradients: &[ParameterGradients],
        strategy: &dyn AdaptationStrategy,
    ) -> NetworkResult<()> {
        let expected = self.parameter_sets();
        if gradients.len() != expected {
            return Err(NetworkError::dimension("parameter sets", expected, gradients.len()));
        }

        let mut rest = gradients;
        for component in self.trainable_components_mut() {
            let (own, tail) = rest.split_at(component.parameter_sets());
            component.apply_gradients(own, strategy)?;
            rest = tail;
        }
        Ok(())
    }

    fn parameter_sets(&self) -> usize {
        self.trainable_components()
            .map(|(_, component)| component.parameter_sets())
            .sum()
    }

    fn clone_trainable(&self) -> Box<dyn TrainableComponent> {
        Box::new(self.clone())
    }

    fn as_component(&self) -> &dyn Component {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algebra::{BiasesVector, WeightsMatrix};
    use crate::neural::activation::Activation;
    use crate::neural::layer::{Layer, WeightedCombiner};
    use crate::neural::optimizer::GradientDescent;
    use crate::neural::softmax::SoftMaxUnit;

    fn batch(rows: &[Vec<f64>]) -> VectorBatch {
        VectorBatch::from_rows(rows).unwrap()
    }

    fn layer(rows: &[Vec<f64>], biases: Vec<f64>, activation: Activation) -> Layer {
        let combiner = WeightedCombiner::from_parameters(
            WeightsMatrix::from_rows(rows).unwrap(),
            BiasesVector::from_vec(biases),
        )
        .unwrap();
        Layer::new(combiner, activation)
    }

    #[test]
    fn empty_chain_refuses_to_run() {
        let mut chain = ComponentChain::new();
        assert!(chain.is_empty());
        assert_eq!(chain.number_of_inputs(), 0);
        assert!(matches!(
            chain.run(&batch(&[vec![1.0]])),
            Err(NetworkError::EmptyChain { operation: "run" })
        ));
        assert!(matches!(
            chain.back_propagate(&batch(&[vec![1.0]])),
            Err(NetworkError::EmptyChain { .. })
        ));
    }

    #[test]
    fn append_checks_widths() {
        let mut chain = ComponentChain::new();
        chain.add_trainable(Layer::random(3, 2, Activation::Tanh, 1)).unwrap();
        let err = chain.add_fixed(SoftMaxUnit::new(3)).unwrap_err();
        assert!(err.is_argument_error());
        assert_eq!(chain.len(), 1);

        chain.add_fixed(SoftMaxUnit::new(2)).unwrap();
        assert_eq!(chain.number_of_inputs(), 3);
        assert_eq!(chain.number_of_outputs(), 2);
    }

    #[test]
    fn forward_threads_components() {
        let first = layer(&[vec![1.0, 1.0], vec![1.0, -1.0]], vec![0.0, 1.0], Activation::Identity);
        let second = layer(&[vec![2.0, 0.0]], vec![0.5], Activation::Identity);

        let mut chain = ComponentChain::new();
        chain.add_trainable(first).unwrap();
        chain.add_trainable(second).unwrap();

        let output = chain.run(&batch(&[vec![3.0, 1.0]])).unwrap();
        // first: [4, 3]; second: 2 * 4 + 0.5
        assert_eq!(output, batch(&[vec![8.5]]));
        assert_eq!(chain.output(), Some(&output));
    }

    #[test]
    fn backward_runs_tail_to_head() {
        let first = layer(&[vec![1.0, 1.0], vec![1.0, -1.0]], vec![0.0, 0.0], Activation::Identity);
        let second = layer(&[vec![2.0, 3.0]], vec![0.0], Activation::Identity);

        let mut chain = ComponentChain::new();
        chain.add_trainable(first).unwrap();
        chain.add_trainable(second).unwrap();
        chain.run(&batch(&[vec![1.0, 2.0]])).unwrap();

        let input_gradient = chain.back_propagate(&batch(&[vec![1.0]])).unwrap();
        // d/dx of 2(x0 + x1) + 3(x0 - x1)
        assert_eq!(input_gradient, batch(&[vec![5.0, -1.0]]));

        let wrong = chain.back_propagate(&batch(&[vec![1.0, 1.0]])).unwrap_err();
        assert!(wrong.is_argument_error());
    }

    #[test]
    fn trainable_enumeration_skips_fixed() {
        let mut chain = ComponentChain::new();
        let a = chain.add_trainable(Layer::random(2, 2, Activation::Logistic, 3)).unwrap();
        let s = chain.add_fixed(SoftMaxUnit::new(2)).unwrap();
        let ids: Vec<_> = chain.trainable_components().map(|(id, _)| id).collect();
        assert_eq!(ids, vec![a]);
        assert!(!chain.is_trainable(s));
        assert_eq!(chain.component(s).map(|c| c.number_of_inputs()), Some(2));
        assert_eq!(chain.parameter_sets(), 1);
    }

    #[test]
    fn update_reaches_every_trainable_member() {
        let first = layer(&[vec![1.0]], vec![0.0], Activation::Identity);
        let second = layer(&[vec![1.0]], vec![0.0], Activation::Identity);
        let mut chain = ComponentChain::new();
        chain.add_trainable(first).unwrap();
        chain.add_trainable(second).unwrap();

        chain.run(&batch(&[vec![1.0]])).unwrap();
        chain.back_propagate(&batch(&[vec![1.0]])).unwrap();
        assert_eq!(chain.gradients().len(), 2);

        chain.update(&GradientDescent::new(1.0).unwrap()).unwrap();
        assert!(chain.gradients().iter().all(ParameterGradients::is_empty));

        let output = chain.run(&batch(&[vec![1.0]])).unwrap();
        // both weights and biases moved to 0 and -1: (1*0 - 1) * 0 - 1
        assert_eq!(output, batch(&[vec![-1.0]]));
    }

    #[test]
    fn apply_gradients_checks_set_count() {
        let mut chain = ComponentChain::new();
        chain.add_trainable(Layer::random(1, 1, Activation::Identity, 0)).unwrap();
        let strategy = GradientDescent::new(0.1).unwrap();
        assert!(chain.apply_gradients(&[], &strategy).is_err());
    }

    #[test]
    fn clones_are_independent() {
        let mut chain = ComponentChain::new();
        chain.add_trainable(layer(&[vec![1.0]], vec![0.0], Activation::Identity)).unwrap();
        let mut copy = chain.clone();

        copy.run(&batch(&[vec![2.0]])).unwrap();
        copy.back_propagate(&batch(&[vec![1.0]])).unwrap();
        copy.update(&GradientDescent::new(1.0).unwrap()).unwrap();

        let original = chain.run(&batch(&[vec![2.0]])).unwrap();
        assert_eq!(original, batch(&[vec![2.0]]));
    }
}
