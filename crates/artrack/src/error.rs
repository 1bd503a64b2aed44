use crate::ConfigError;
use artrack_calib::CalibrationError;
use artrack_core::{CaptureError, StoreError};
use std::path::PathBuf;

/// Failures that end a session or a command.
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("no usable calibration at {0}")]
    NotCalibrated(PathBuf),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Calibration(#[from] CalibrationError),
    #[error(transparent)]
    Capture(#[from] CaptureError),
    #[cfg(feature = "image")]
    #[error(transparent)]
    Image(#[from] image::ImageError),
}
