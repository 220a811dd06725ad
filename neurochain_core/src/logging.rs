use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::training::TrainingMode;

fn append_json_line<P: AsRef<Path>, T: Serialize>(path: P, value: &T) -> io::Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    serde_json::to_writer(&mut file, value).map_err(io::Error::other)?;
    file.write_all(b"\n")
}

/// One line of the training log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochLogEntry {
    pub epoch: usize,
    pub mode: TrainingMode,
    pub cost: f64,
    pub examples: usize,
    pub elapsed_ms: u128,
    pub timestamp_ms: u128,
}

impl EpochLogEntry {
    pub fn new(
        epoch: usize,
        mode: TrainingMode,
        cost: f64,
        examples: usize,
        elapsed: Duration,
    ) -> Self {
        Self {
            epoch,
            mode,
            cost,
            examples,
            elapsed_ms: elapsed.as_millis(),
            timestamp_ms: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_millis(),
        }
    }
}

/// Appends `entry` to the JSON-lines file at `path`, creating parent directories.
pub fn log_epoch<P: AsRef<Path>>(path: P, entry: &EpochLogEntry) -> io::Result<()> {
    append_json_line(path, entry)
}
