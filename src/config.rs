//! Configuration loading for lakshya-aim.
//!
//! Read once at startup into an immutable struct; everything is
//! overridable from a TOML file and falls back to the defaults below.

use std::path::Path;

use serde::Deserialize;

use crate::error::{AimError, Result};
use crate::estimation::EkfConfig;
use crate::tracking::TrackerConfig;

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AimConfig {
    /// World frame observations are transformed into (default: "odom")
    #[serde(default = "default_target_frame")]
    pub target_frame: String,

    /// Tracker gates and thresholds
    #[serde(default)]
    pub tracker: TrackerConfig,

    /// Filter noise parameters
    #[serde(default)]
    pub ekf: EkfConfig,
}

// Default value functions
fn default_target_frame() -> String {
    "odom".to_string()
}

impl Default for AimConfig {
    fn default() -> Self {
        Self {
            target_frame: default_target_frame(),
            tracker: TrackerConfig::default(),
            ekf: EkfConfig::default(),
        }
    }
}

impl AimConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AimError::Config(format!("failed to read config file: {e}")))?;
        let config: AimConfig = toml::from_str(&content)?;
        Ok(config)
    }
}
