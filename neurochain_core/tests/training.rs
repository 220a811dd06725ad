use neurochain_core::{
    Activation, BiasesVector, ComponentChain, CrossEntropy, GradientDescent, Layer, NetworkConfig,
    Sample, SoftMaxUnit, SquaredError, Trainer, TrainingConfig, TrainingMode, Vector,
    WeightedCombiner, WeightsMatrix,
};

fn descent(step: f64) -> GradientDescent {
    GradientDescent::new(step).unwrap()
}

fn affine_chain() -> ComponentChain {
    let mut chain = ComponentChain::new();
    chain
        .add_trainable(Layer::linear(
            WeightedCombiner::from_parameters(WeightsMatrix::zeros(1, 2), BiasesVector::zeros(1))
                .unwrap(),
        ))
        .unwrap();
    chain
}

/// Targets follow `y = 3a - 2b + 1`.
fn plane_samples() -> Vec<Sample> {
    let mut samples = Vec::new();
    for a in [-1.0, -0.5, 0.0, 0.5, 1.0] {
        for b in [-1.0, 0.0, 1.0] {
            samples.push(Sample::new(vec![a, b], vec![3.0 * a - 2.0 * b + 1.0]));
        }
    }
    samples
}

#[test]
fn online_descent_decreases_cost_across_epochs() {
    let mut trainer = Trainer::new(affine_chain(), SquaredError, descent(0.05));
    let samples = plane_samples();
    let costs: Vec<f64> = (0..8)
        .map(|_| trainer.train_epoch(&samples, TrainingMode::Online, 1, 1).unwrap())
        .collect();
    assert!(costs.windows(2).all(|w| w[1] < w[0]), "{costs:?}");
}

#[test]
fn every_mode_learns_the_plane() {
    for mode in [TrainingMode::Online, TrainingMode::Batch, TrainingMode::Parallel] {
        let mut trainer = Trainer::new(affine_chain(), SquaredError, descent(0.2));
        let config = TrainingConfig {
            epochs: 200,
            mode,
            batch_size: 5,
            workers: 2,
            step_size: 0.2,
            shuffle: true,
            ..TrainingConfig::default()
        };
        let samples = plane_samples();
        let report = trainer.train(&samples, &config).unwrap();
        let last = report.final_cost().unwrap();
        assert!(last < 1e-3, "{mode:?} ended at {last}");
    }
}

#[test]
fn parallel_mode_matches_batch_mode() {
    let samples = plane_samples();
    let config = |mode| TrainingConfig {
        epochs: 5,
        mode,
        batch_size: 6,
        workers: 3,
        step_size: 0.1,
        shuffle: false,
        ..TrainingConfig::default()
    };

    let mut batch = Trainer::new(affine_chain(), SquaredError, descent(0.1));
    let mut parallel = Trainer::new(affine_chain(), SquaredError, descent(0.1));
    let a = batch.train(&samples, &config(TrainingMode::Batch)).unwrap();
    let b = parallel.train(&samples, &config(TrainingMode::Parallel)).unwrap();

    for (x, y) in a.costs().iter().zip(b.costs()) {
        assert!((x - y).abs() < 1e-9);
    }
}

#[test]
fn softmax_classifier_reaches_full_accuracy() {
    let network = NetworkConfig::from_str(
        r#"
        [network]
        inputs = 2
        softmax = true
        seed = 3

        [[network.layers]]
        outputs = 3
        "#,
    )
    .unwrap();

    let samples: Vec<Sample> = [
        ([1.0, 0.0], 0),
        ([0.9, 0.1], 0),
        ([0.0, 1.0], 1),
        ([0.1, 0.9], 1),
        ([-1.0, -1.0], 2),
        ([-0.8, -0.9], 2),
    ]
    .into_iter()
    .map(|(x, class)| Sample::new(Vector::from_vec(x.to_vec()), Vector::unit(3, class).unwrap()))
    .collect();

    let chain = network.build().unwrap();
    let mut trainer = Trainer::new(chain, CrossEntropy, descent(0.5));
    let before = trainer.evaluate(&samples).unwrap();
    for _ in 0..300 {
        trainer.train_epoch(&samples, TrainingMode::Online, 1, 1).unwrap();
    }
    assert!(trainer.evaluate(&samples).unwrap() < before);
    assert_eq!(trainer.accuracy(&samples).unwrap(), 1.0);
}

#[test]
fn epoch_log_is_written_when_configured() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("run.jsonl");
    let config = TrainingConfig {
        epochs: 3,
        log_path: Some(path.clone()),
        ..TrainingConfig::default()
    };

    let mut trainer = Trainer::new(affine_chain(), SquaredError, descent(0.05));
    trainer.train(&plane_samples(), &config).unwrap();

    let contents = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<serde_json::Value> = contents
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[1]["epoch"], 1);
    assert_eq!(lines[1]["mode"], "online");
    assert_eq!(lines[1]["examples"], 15);
}

#[test]
fn invalid_config_is_rejected_before_training() {
    let mut trainer = Trainer::new(affine_chain(), SquaredError, descent(0.05));
    let config = TrainingConfig {
        batch_size: 0,
        ..TrainingConfig::default()
    };
    assert!(trainer.train(&plane_samples(), &config).is_err());
}

#[test]
fn multilayer_network_trains_with_clipping() {
    let mut chain = ComponentChain::new();
    chain.add_trainable(Layer::random(2, 6, Activation::Tanh, 12)).unwrap();
    chain.add_trainable(Layer::random(6, 1, Activation::Identity, 13)).unwrap();

    let config = TrainingConfig {
        epochs: 40,
        mode: TrainingMode::Batch,
        batch_size: 3,
        step_size: 0.1,
        max_gradient: Some(5.0),
        ..TrainingConfig::default()
    };
    let mut trainer = Trainer::from_config(chain, &config).unwrap();
    let samples = plane_samples();
    let before = trainer.evaluate(&samples).unwrap();
    trainer.train(&samples, &config).unwrap();
    assert!(trainer.evaluate(&samples).unwrap() < before);
}
