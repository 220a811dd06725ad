//! Training and network configuration loaded from TOML.
//!
//! Both documents may live in one file: `[training]` and `[network]` are
//! read independently. Missing training keys fall back to defaults; the
//! network section is required when a network is loaded.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::NetworkResult;
use crate::neural::{Activation, ComponentChain, CostKind, Layer, SoftMaxUnit};
use crate::training::TrainingMode;

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// How a training run is driven.
///
/// # Examples
///
/// ```
/// use neurochain_core::config::TrainingConfig;
/// use neurochain_core::training::TrainingMode;
///
/// let config = TrainingConfig::from_str(
///     r#"
///     [training]
///     epochs = 20
///     mode = "batch"
///     batch_size = 8
///     "#,
/// )
/// .unwrap();
/// assert_eq!(config.mode, TrainingMode::Batch);
/// assert_eq!(config.step_size, 0.1);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrainingConfig {
    pub epochs: usize,
    pub mode: TrainingMode,
    /// Examples per update in batch and parallel modes
    pub batch_size: usize,
    /// Shards per mini-batch in parallel mode
    pub workers: usize,
    pub step_size: f64,
    /// Clamp gradient entries to `±max_gradient` before scaling
    pub max_gradient: Option<f64>,
    pub cost: CostKind,
    /// Base seed for per-epoch shuffling
    pub seed: u64,
    pub shuffle: bool,
    /// JSON-lines epoch log, disabled when `None`
    pub log_path: Option<PathBuf>,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            epochs: default_epochs(),
            mode: TrainingMode::default(),
            batch_size: default_batch_size(),
            workers: default_workers(),
            step_size: default_step_size(),
            max_gradient: None,
            cost: CostKind::default(),
            seed: default_seed(),
            shuffle: true,
            log_path: None,
        }
    }
}

impl TrainingConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Self::from_str(&contents)
    }

    /// Parses the `[training]` table; an absent table yields the defaults.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(toml_str: &str) -> Result<Self, ConfigError> {
        let raw: RawConfigFile =
            toml::from_str(toml_str).map_err(|err| ConfigError::Parse(err.to_string()))?;
        let config = Self::from(raw.training.unwrap_or_default());
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.epochs == 0 {
            return Err(ConfigError::Invalid("training.epochs must be positive".into()));
        }
        if self.batch_size == 0 {
            return Err(ConfigError::Invalid("training.batch_size must be positive".into()));
        }
        if self.workers == 0 {
            return Err(ConfigError::Invalid("training.workers must be positive".into()));
        }
        if !self.step_size.is_finite() || self.step_size <= 0.0 {
            return Err(ConfigError::Invalid(
                "training.step_size must be finite and positive".into(),
            ));
        }
        if let Some(max) = self.max_gradient {
            if !max.is_finite() || max <= 0.0 {
                return Err(ConfigError::Invalid(
                    "training.max_gradient must be finite and positive".into(),
                ));
            }
        }
        Ok(())
    }
}

impl From<RawTraining> for TrainingConfig {
    fn from(raw: RawTraining) -> Self {
        Self {
            epochs: raw.epochs,
            mode: raw.mode,
            batch_size: raw.batch_size,
            workers: raw.workers,
            step_size: raw.step_size,
            max_gradient: raw.max_gradient,
            cost: raw.cost,
            seed: raw.seed,
            shuffle: raw.shuffle,
            log_path: raw.log_path,
        }
    }
}

/// One `[[network.layers]]` entry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LayerSpec {
    pub outputs: usize,
    #[serde(default)]
    pub activation: Activation,
}

/// Topology of a layered network, built imperatively into a [`ComponentChain`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NetworkConfig {
    pub inputs: usize,
    pub layers: Vec<LayerSpec>,
    /// Append a softmax after the last layer
    pub softmax: bool,
    /// Layer `i` is initialized with `seed + i`
    pub seed: u64,
}

impl NetworkConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Self::from_str(&contents)
    }

    /// Parses the required `[network]` table.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(toml_str: &str) -> Result<Self, ConfigError> {
        let raw: RawConfigFile =
            toml::from_str(toml_str).map_err(|err| ConfigError::Parse(err.to_string()))?;
        let raw = raw
            .network
            .ok_or_else(|| ConfigError::Invalid("missing [network] section".into()))?;
        let config = Self {
            inputs: raw.inputs,
            layers: raw.layers,
            softmax: raw.softmax,
            seed: raw.seed,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.inputs == 0 {
            return Err(ConfigError::Invalid("network.inputs must be positive".into()));
        }
        if self.layers.is_empty() {
            return Err(ConfigError::Invalid("network needs at least one layer".into()));
        }
        if let Some(index) = self.layers.iter().position(|layer| layer.outputs == 0) {
            return Err(ConfigError::Invalid(format!(
                "network.layers[{index}].outputs must be positive"
            )));
        }
        Ok(())
    }

    /// Width of the last layer.
    pub fn outputs(&self) -> usize {
        self.layers.last().map_or(self.inputs, |layer| layer.outputs)
    }

    /// Appends one seeded [`Layer`] per entry, head to tail, then the
    /// optional [`SoftMaxUnit`].
    pub fn build(&self) -> NetworkResult<ComponentChain> {
        let mut chain = ComponentChain::new();
        let mut width = self.inputs;
        for (index, spec) in self.layers.iter().enumerate() {
            let seed = self.seed.wrapping_add(index as u64);
            chain.add_trainable(Layer::random(width, spec.outputs, spec.activation, seed))?;
            width = spec.outputs;
        }
        if self.softmax {
            chain.add_fixed(SoftMaxUnit::new(width))?;
        }
        Ok(chain)
    }
}

#[derive(Debug, Default, Deserialize)]
struct RawConfigFile {
    #[serde(default)]
    training: Option<RawTraining>,
    #[serde(default)]
    network: Option<RawNetwork>,
}

#[derive(Debug, Deserialize)]
struct RawTraining {
    #[serde(default = "default_epochs")]
    epochs: usize,
    #[serde(default)]
    mode: TrainingMode,
    #[serde(default = "default_batch_size")]
    batch_size: usize,
    #[serde(default = "default_workers")]
    workers: usize,
    #[serde(default = "default_step_size")]
    step_size: f64,
    #[serde(default)]
    max_gradient: Option<f64>,
    #[serde(default)]
    cost: CostKind,
    #[serde(default = "default_seed")]
    seed: u64,
    #[serde(default = "default_shuffle")]
    shuffle: bool,
    #[serde(default)]
    log_path: Option<PathBuf>,
}

impl Default for RawTraining {
    fn default() -> Self {
        Self {
            epochs: default_epochs(),
            mode: TrainingMode::default(),
            batch_size: default_batch_size(),
            workers: default_workers(),
            step_size: default_step_size(),
            max_gradient: None,
            cost: CostKind::default(),
            seed: default_seed(),
            shuffle: default_shuffle(),
            log_path: None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawNetwork {
    inputs: usize,
    #[serde(default)]
    layers: Vec<LayerSpec>,
    #[serde(default)]
    softmax: bool,
    #[serde(default = "default_seed")]
    seed: u64,
}

fn default_epochs() -> usize {
    10
}

fn default_batch_size() -> usize {
    16
}

fn default_workers() -> usize {
    4
}

fn default_step_size() -> f64 {
    0.1
}

fn default_seed() -> u64 {
    42
}

fn default_shuffle() -> bool {
    true
}
