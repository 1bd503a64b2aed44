//! JSON application configuration.

use crate::AnimationParams;
use artrack_calib::CalibrationConfig;
use artrack_core::DEFAULT_CALIBRATION_PATH;
use artrack_gesture::{GestureConfig, TriggerParams};
use artrack_pose::{FrameConverter, MarkerPoseEstimator, ModelPlacement};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Read and parse a JSON document.
pub fn load_json_file<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T, ConfigError> {
    let raw = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

fn default_calibration_path() -> PathBuf {
    PathBuf::from(DEFAULT_CALIBRATION_PATH)
}

fn default_marker_side() -> f64 {
    0.05
}

fn default_true() -> bool {
    true
}

/// Everything tunable about a tracking session. Missing fields take their
/// defaults, so `{}` is a valid config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_calibration_path")]
    pub calibration_path: PathBuf,
    /// Physical side length of the tracked marker.
    #[serde(default = "default_marker_side")]
    pub marker_side: f64,
    #[serde(default)]
    pub calibration: CalibrationConfig,
    #[serde(default)]
    pub pose: MarkerPoseEstimator,
    #[serde(default)]
    pub frames: FrameConverter,
    #[serde(default)]
    pub model: ModelPlacement,
    #[serde(default)]
    pub gestures: GestureConfig,
    #[serde(default)]
    pub trigger: TriggerParams,
    #[serde(default)]
    pub animation: AnimationParams,
    /// Only look for the fist trigger while a marker is tracked.
    #[serde(default = "default_true")]
    pub require_marker_for_trigger: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            calibration_path: default_calibration_path(),
            marker_side: default_marker_side(),
            calibration: CalibrationConfig::default(),
            pose: MarkerPoseEstimator::default(),
            frames: FrameConverter::default(),
            model: ModelPlacement::default(),
            gestures: GestureConfig::default(),
            trigger: TriggerParams::default(),
            animation: AnimationParams::default(),
            require_marker_for_trigger: true,
        }
    }
}

impl AppConfig {
    /// Load a JSON config from disk.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        load_json_file(path)
    }

    /// Write this config to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}
