use neurochain_core::{
    Activation, BiasesVector, Component, ComponentChain, GradientDescent, Layer, NetworkError,
    SoftMaxUnit, TrainableComponent, VectorBatch, WeightedCombiner, WeightsMatrix,
};

fn batch(rows: &[Vec<f64>]) -> VectorBatch {
    VectorBatch::from_rows(rows).unwrap()
}

fn linear(rows: &[Vec<f64>], biases: Vec<f64>) -> Layer {
    Layer::linear(
        WeightedCombiner::from_parameters(
            WeightsMatrix::from_rows(rows).unwrap(),
            BiasesVector::from_vec(biases),
        )
        .unwrap(),
    )
}

#[test]
fn chain_output_equals_manual_threading() {
    let mut first = Layer::random(3, 5, Activation::Tanh, 21);
    let mut second = Layer::random(5, 2, Activation::Logistic, 22);
    let mut softmax = SoftMaxUnit::new(2);

    let mut chain = ComponentChain::new();
    chain.add_trainable(first.clone()).unwrap();
    chain.add_trainable(second.clone()).unwrap();
    chain.add_fixed(softmax.clone()).unwrap();

    let x = batch(&[vec![0.2, -0.4, 0.9], vec![1.0, 0.0, -1.0]]);
    let expected = softmax
        .run(&second.run(&first.run(&x).unwrap()).unwrap())
        .unwrap();
    let actual = chain.run(&x).unwrap();
    assert!(actual.approx_eq(&expected, 1e-12));
}

#[test]
fn chain_backward_equals_manual_threading() {
    let mut first = Layer::random(2, 3, Activation::Relu, 5);
    let mut second = Layer::random(3, 1, Activation::Identity, 6);

    let mut chain = ComponentChain::new();
    chain.add_trainable(first.clone()).unwrap();
    chain.add_trainable(second.clone()).unwrap();

    let x = batch(&[vec![0.5, -0.25]]);
    let g = batch(&[vec![1.0]]);

    second.run(&first.run(&x).unwrap()).unwrap();
    let expected = first.back_propagate(&second.back_propagate(&g).unwrap()).unwrap();

    chain.run(&x).unwrap();
    let actual = chain.back_propagate(&g).unwrap();
    assert!(actual.approx_eq(&expected, 1e-12));

    let mut manual = first.gradients();
    manual.extend(second.gradients());
    assert_eq!(chain.gradients(), manual);
}

#[test]
fn width_incompatible_append_fails() {
    let mut chain = ComponentChain::new();
    chain.add_trainable(Layer::random(4, 3, Activation::Tanh, 1)).unwrap();

    let err = chain.add_trainable(Layer::random(2, 1, Activation::Tanh, 2)).unwrap_err();
    assert!(err.is_argument_error());
    let err = chain.add_fixed(SoftMaxUnit::new(4)).unwrap_err();
    assert!(err.is_argument_error());
}

#[test]
fn wrong_width_input_fails() {
    let mut chain = ComponentChain::new();
    chain.add_trainable(Layer::random(4, 3, Activation::Tanh, 1)).unwrap();
    let err = chain.run(&batch(&[vec![1.0, 2.0]])).unwrap_err();
    assert!(err.is_argument_error());
}

#[test]
fn empty_chain_is_structural_misuse() {
    let mut chain = ComponentChain::new();
    let err = chain.run(&batch(&[vec![1.0]])).unwrap_err();
    assert_eq!(err, NetworkError::EmptyChain { operation: "run" });
    assert!(!err.is_argument_error());
}

#[test]
fn nested_chains_compose() {
    let mut inner = ComponentChain::new();
    inner.add_trainable(linear(&[vec![2.0]], vec![0.0])).unwrap();
    inner.add_trainable(linear(&[vec![3.0]], vec![1.0])).unwrap();

    let mut outer = ComponentChain::new();
    outer.add_trainable(inner).unwrap();
    outer.add_trainable(linear(&[vec![-1.0]], vec![0.0])).unwrap();
    assert_eq!(outer.parameter_sets(), 3);

    let out = outer.run(&batch(&[vec![1.0]])).unwrap();
    assert_eq!(out, batch(&[vec![-7.0]]));

    outer.back_propagate(&batch(&[vec![1.0]])).unwrap();
    outer.update(&GradientDescent::new(0.1).unwrap()).unwrap();
    assert!(outer.gradients().iter().all(|g| g.is_empty()));
    assert_ne!(outer.run(&batch(&[vec![1.0]])).unwrap(), out);
}

#[test]
fn softmax_classifier_output_is_a_distribution() {
    let mut chain = ComponentChain::new();
    chain.add_trainable(Layer::random(3, 4, Activation::SoftPlus, 8)).unwrap();
    chain.add_fixed(SoftMaxUnit::new(4)).unwrap();

    let out = chain
        .run(&batch(&[vec![1.0, 2.0, 3.0], vec![-3.0, 0.5, 9.0]]))
        .unwrap();
    for row in out.vectors() {
        assert!((row.sum() - 1.0).abs() < 1e-12);
        assert!(row.iter().all(|p| p > 0.0));
    }
}
