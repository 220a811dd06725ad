//! Training loop: online, mini-batch and sharded parallel gradient descent.

pub mod data;
pub mod parallel;
pub mod trainer;

use std::time::Duration;

use serde::{Deserialize, Serialize};

pub use data::{batches, shuffled, Sample, TrainingBatch};
pub use trainer::Trainer;

/// When parameter updates happen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrainingMode {
    /// Update after every example.
    #[default]
    Online,
    /// Update once per mini-batch.
    Batch,
    /// Shard each mini-batch across worker copies, merge gradients, update once.
    Parallel,
}

impl TrainingMode {
    pub fn as_str(self) -> &'static str {
        match self {
            TrainingMode::Online => "online",
            TrainingMode::Batch => "batch",
            TrainingMode::Parallel => "parallel",
        }
    }
}

/// Outcome of one epoch.
#[derive(Debug, Clone, PartialEq)]
pub struct EpochReport {
    pub epoch: usize,
    /// Cost accumulated over the epoch's examples.
    pub cost: f64,
    pub examples: usize,
    pub elapsed: Duration,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrainingReport {
    pub epochs: Vec<EpochReport>,
}

impl TrainingReport {
    pub fn final_cost(&self) -> Option<f64> {
        self.epochs.last().map(|epoch| epoch.cost)
    }

    pub fn costs(&self) -> Vec<f64> {
        self.epochs.iter().map(|epoch| epoch.cost).collect()
    }
}
