//! Training samples and their batched form.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::algebra::{Vector, VectorBatch};
use crate::error::{NetworkError, NetworkResult};

/// One `(input, target)` pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub input: Vector,
    pub target: Vector,
}

impl Sample {
    pub fn new(input: impl Into<Vector>, target: impl Into<Vector>) -> Self {
        Self {
            input: input.into(),
            target: target.into(),
        }
    }
}

/// Inputs and targets of several samples, stacked row-aligned.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingBatch {
    inputs: VectorBatch,
    targets: VectorBatch,
}

impl TrainingBatch {
    /// Pairs an input batch with a target batch of the same count.
    pub fn new(inputs: VectorBatch, targets: VectorBatch) -> NetworkResult<Self> {
        if inputs.count() != targets.count() {
            return Err(NetworkError::dimension(
                "target count",
                inputs.count(),
                targets.count(),
            ));
        }
        Ok(Self { inputs, targets })
    }

    pub fn from_samples(samples: &[Sample]) -> NetworkResult<Self> {
        let inputs: Vec<Vector> = samples.iter().map(|s| s.input.clone()).collect();
        let targets: Vec<Vector> = samples.iter().map(|s| s.target.clone()).collect();
        Self::new(
            VectorBatch::from_vectors(&inputs)?,
            VectorBatch::from_vectors(&targets)?,
        )
    }

    pub fn inputs(&self) -> &VectorBatch {
        &self.inputs
    }

    pub fn targets(&self) -> &VectorBatch {
        &self.targets
    }

    pub fn count(&self) -> usize {
        self.inputs.count()
    }

    /// Splits into at most `shards` consecutive pieces of near-equal size.
    pub fn split(&self, shards: usize) -> Vec<TrainingBatch> {
        let size = self.count().div_ceil(shards.max(1)).max(1);
        self.inputs
            .chunks(size)
            .into_iter()
            .zip(self.targets.chunks(size))
            .map(|(inputs, targets)| Self { inputs, targets })
            .collect()
    }
}

/// Copy of `samples` in a seeded random order.
pub fn shuffled(samples: &[Sample], seed: u64) -> Vec<Sample> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut order = samples.to_vec();
    order.shuffle(&mut rng);
    order
}

/// Groups samples into consecutive batches of `batch_size`; the last may be shorter.
pub fn batches(samples: &[Sample], batch_size: usize) -> NetworkResult<Vec<TrainingBatch>> {
    if batch_size == 0 {
        return Err(NetworkError::InvalidArgument("batch size must be positive".into()));
    }
    samples.chunks(batch_size).map(TrainingBatch::from_samples).collect()
}
