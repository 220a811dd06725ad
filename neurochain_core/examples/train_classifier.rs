//! Trains a small softmax classifier on three noisy point clouds.
//!
//! Run with: cargo run --example train_classifier -- [config.toml]
//! Set RUST_LOG=debug to see chain assembly and shard merges.

use anyhow::Context;
use neurochain_core::config::{NetworkConfig, TrainingConfig};
use neurochain_core::training::{Sample, Trainer};
use neurochain_core::Vector;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing_subscriber::EnvFilter;

const CENTERS: [[f64; 2]; 3] = [[1.5, 0.0], [-1.0, 1.2], [-0.5, -1.5]];

fn point_clouds(per_class: usize, seed: u64) -> anyhow::Result<Vec<Sample>> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut samples = Vec::with_capacity(per_class * CENTERS.len());
    for (class, center) in CENTERS.iter().enumerate() {
        for _ in 0..per_class {
            let x = center[0] + rng.gen_range(-0.6..0.6);
            let y = center[1] + rng.gen_range(-0.6..0.6);
            let target = Vector::unit(CENTERS.len(), class)?;
            samples.push(Sample::new(vec![x, y], target));
        }
    }
    Ok(samples)
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let default_path = concat!(env!("CARGO_MANIFEST_DIR"), "/config/training.toml");
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| default_path.to_string());
    let training =
        TrainingConfig::load_from_file(&path).with_context(|| format!("loading {path}"))?;
    let network =
        NetworkConfig::load_from_file(&path).with_context(|| format!("loading {path}"))?;

    let chain = network.build()?;
    let mut trainer = Trainer::from_config(chain, &training)?;

    let train = point_clouds(40, training.seed)?;
    let validation = point_clouds(10, training.seed.wrapping_add(1))?;

    let report = trainer.train(&train, &training)?;
    let final_cost = report.final_cost().unwrap_or(f64::NAN);

    println!("epochs:              {}", report.epochs.len());
    println!("final training cost: {final_cost:.4}");
    println!("validation cost:     {:.4}", trainer.evaluate(&validation)?);
    println!("validation accuracy: {:.1}%", trainer.accuracy(&validation)? * 100.0);

    Ok(())
}
