//! Performance configuration
//!
//! Every field has a default, so a JSON file only needs the values it
//! changes.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::animation::key::KeySpeeds;
use crate::animation::striker::StrikerConfig;
use crate::error::{Error, Result};
use crate::pipeline::visibility::VisibilityWindows;

/// Configuration for a performance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceConfig {
    /// Frames per second used by headless runs
    pub frame_rate: f64,
    /// Most clones a monophonic instrument may open
    pub clone_pool_size: usize,
    /// Overlap tolerance for clone assignment, as a fraction of a beat
    pub clone_tolerance_beats: f64,
    /// Stick and mallet tuning
    pub striker: StrikerConfig,
    /// Piano key speeds
    pub keys: KeySpeeds,
    /// When instruments appear and leave
    pub visibility: VisibilityWindows,
    /// Keep every instrument on stage for the whole performance
    pub always_visible: bool,
    /// Base size of steam clouds
    pub puffer_scale: f64,
    /// Seed for anything randomized, so runs are repeatable
    pub seed: u64,
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            frame_rate: 60.0,
            clone_pool_size: 8,
            clone_tolerance_beats: 0.125,
            striker: StrikerConfig::default(),
            keys: KeySpeeds::default(),
            visibility: VisibilityWindows::default(),
            always_visible: false,
            puffer_scale: 1.0,
            seed: 0x6a61_6d63,
        }
    }
}

impl PerformanceConfig {
    /// Parse from JSON and check ranges
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.frame_rate > 0.0) {
            return Err(Error::Config(format!(
                "frame_rate must be positive, got {}",
                self.frame_rate
            )));
        }
        if self.clone_pool_size == 0 {
            return Err(Error::Config("clone_pool_size must be at least 1".to_string()));
        }
        if self.clone_tolerance_beats < 0.0 {
            return Err(Error::Config(
                "clone_tolerance_beats must not be negative".to_string(),
            ));
        }
        if !(self.striker.max_idle_angle > 0.0) {
            return Err(Error::Config(
                "striker.max_idle_angle must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Seconds per frame
    pub fn frame_delta(&self) -> f64 {
        1.0 / self.frame_rate
    }

    /// Clone overlap tolerance in ticks
    pub fn clone_tolerance_ticks(&self, division: u16) -> u64 {
        (division as f64 * self.clone_tolerance_beats).round() as u64
    }
}
