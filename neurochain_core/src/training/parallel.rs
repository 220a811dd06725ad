//! Sharded mini-batch training on worker copies of the root component.
//!
//! Each shard runs on its own clone, so workers never share cached
//! activations or accumulators. Shard gradients are merged in shard order,
//! which keeps the result independent of thread scheduling.

use rayon::prelude::*;

use crate::error::NetworkResult;
use crate::neural::{Component, ParameterGradients, TrainableComponent};
use crate::training::data::TrainingBatch;
use crate::training::trainer::Trainer;

struct ShardOutcome {
    cost: f64,
    gradients: Vec<ParameterGradients>,
}

impl<C: TrainableComponent + Clone> Trainer<C> {
    /// Splits `batch` into `workers` shards, back-propagates each on a clone
    /// of the root component in parallel, sums the shard gradients and
    /// applies one update to the root.
    ///
    /// Any gradients already pending on the root are folded in first. They
    /// stay on the root if a shard fails.
    pub fn train_batch_parallel(
        &mut self,
        batch: &TrainingBatch,
        workers: usize,
    ) -> NetworkResult<f64> {
        let shards = batch.split(workers);

        let template = &self.component;
        let cost_function = self.cost_function.as_ref();
        let outcomes: Vec<NetworkResult<ShardOutcome>> = shards
            .par_iter()
            .map(|shard| {
                let mut worker = template.clone();
                worker.take_gradients();
                let output = worker.run(shard.inputs())?;
                let cost = cost_function.cost(shard.targets(), &output)?;
                let gradient = cost_function.gradient(shard.targets(), &output)?;
                worker.back_propagate(&gradient)?;
                Ok(ShardOutcome {
                    cost,
                    gradients: worker.take_gradients(),
                })
            })
            .collect();

        let outcomes = outcomes.into_iter().collect::<NetworkResult<Vec<_>>>()?;
        let mut total_cost = 0.0;
        let mut merged = self.component.gradients();
        for outcome in &outcomes {
            total_cost += outcome.cost;
            merged = ParameterGradients::merge_all(&merged, &outcome.gradients)?;
        }
        self.component.take_gradients();

        tracing::debug!(
            shards = shards.len(),
            examples = batch.count(),
            cost = total_cost,
            "merged shard gradients"
        );

        self.component.apply_gradients(&merged, self.strategy.as_ref())?;
        self.record_cost(total_cost, batch.count());
        Ok(total_cost)
    }
}
