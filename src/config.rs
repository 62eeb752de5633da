//! Engine configuration
//!
//! Host-facing settings that are fixed for the lifetime of a prepared engine.
//! Loaded from JSON; every field is optional and falls back to its default.
//!
//! ```json
//! {
//!   "sample_rate": 44100,
//!   "max_block_size": 256,
//!   "layout": "stereo",
//!   "tuning_hz": 440.0,
//!   "params": { "noiseType": "brown", "osc1Detune": 12.0 }
//! }
//! ```

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::engine::buffer::{ChannelLayout, DEFAULT_SAMPLE_RATE};
use crate::engine::notes::DEFAULT_TUNING_HZ;
use crate::error::{Result, StrataError};

/// Default maximum block size in samples
pub const DEFAULT_MAX_BLOCK_SIZE: usize = 512;

/// Accepted tuning reference range (Hz)
pub const MIN_TUNING_HZ: f32 = 400.0;
pub const MAX_TUNING_HZ: f32 = 480.0;

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Output sample rate in Hz
    pub sample_rate: u32,
    /// Largest block the host will hand to `process`
    pub max_block_size: usize,
    /// Output channel layout
    pub layout: ChannelLayout,
    /// Frequency of A4 in Hz
    pub tuning_hz: f32,
    /// Initial parameter values by name, applied on top of the defaults
    pub params: Map<String, Value>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            max_block_size: DEFAULT_MAX_BLOCK_SIZE,
            layout: ChannelLayout::Stereo,
            tuning_hz: DEFAULT_TUNING_HZ,
            params: Map::new(),
        }
    }
}

impl EngineConfig {
    /// Check that the engine can be prepared with these settings
    pub fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 {
            return Err(StrataError::InvalidConfig {
                reason: "sample rate must be greater than zero".to_string(),
            });
        }
        if self.max_block_size == 0 {
            return Err(StrataError::InvalidConfig {
                reason: "max block size must be greater than zero".to_string(),
            });
        }
        if !(MIN_TUNING_HZ..=MAX_TUNING_HZ).contains(&self.tuning_hz) {
            return Err(StrataError::InvalidConfig {
                reason: format!(
                    "tuning reference {} Hz outside {}..{} Hz",
                    self.tuning_hz, MIN_TUNING_HZ, MAX_TUNING_HZ
                ),
            });
        }
        Ok(())
    }

    /// Load and validate a configuration file
    ///
    /// # Arguments
    /// * `path` - Path to a JSON configuration file
    pub fn from_json_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(StrataError::FileNotFound {
                path: path.display().to_string(),
                source: None,
            });
        }

        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let config: EngineConfig = serde_json::from_reader(reader)?;
        config.validate()?;

        Ok(config)
    }

    /// Write the configuration as pretty-printed JSON
    pub fn save(&self, path: &Path) -> Result<()> {
        let file = File::create(path)?;
        let writer = BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }
}
