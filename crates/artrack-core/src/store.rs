//! The durable calibration record.

use crate::{CameraIntrinsics, Distortion};
use serde::{Deserialize, Serialize};
use std::{
    fs, io,
    path::{Path, PathBuf},
};

pub const DEFAULT_CALIBRATION_PATH: &str = "calibration_data.json";

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("distortion vector has {0} coefficients, at most 5 are supported")]
    InvalidCoefficients(usize),
}

/// On-disk layout: a row-major camera matrix and a distortion vector.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CalibrationRecord {
    #[serde(rename = "cameraMatrix")]
    pub camera_matrix: [[f64; 3]; 3],
    #[serde(rename = "distCoeffs")]
    pub dist_coeffs: Vec<f64>,
}

impl CalibrationRecord {
    pub fn from_intrinsics(intr: &CameraIntrinsics) -> Self {
        let k = intr.k_matrix();
        Self {
            camera_matrix: [
                [k[(0, 0)], k[(0, 1)], k[(0, 2)]],
                [k[(1, 0)], k[(1, 1)], k[(1, 2)]],
                [k[(2, 0)], k[(2, 1)], k[(2, 2)]],
            ],
            dist_coeffs: intr.distortion.to_vec(),
        }
    }

    /// `Ok(None)` when the record does not describe a usable calibration.
    pub fn to_intrinsics(&self) -> Result<Option<CameraIntrinsics>, StoreError> {
        if self.dist_coeffs.is_empty() {
            return Ok(None);
        }
        let distortion = Distortion::from_slice(&self.dist_coeffs)
            .ok_or(StoreError::InvalidCoefficients(self.dist_coeffs.len()))?;
        let m = &self.camera_matrix;
        let intr = CameraIntrinsics {
            fx: m[0][0],
            fy: m[1][1],
            cx: m[0][2],
            cy: m[1][2],
            distortion,
        };
        Ok(intr.is_valid().then_some(intr))
    }
}

/// Loads and saves the single calibration record of a session.
#[derive(Clone, Debug)]
pub struct IntrinsicsStore {
    path: PathBuf,
}

impl Default for IntrinsicsStore {
    fn default() -> Self {
        Self::new(DEFAULT_CALIBRATION_PATH)
    }
}

impl IntrinsicsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the stored intrinsics.
    ///
    /// A missing file, or a record without usable values, yields `Ok(None)`:
    /// the camera needs calibrating. A file that exists but cannot be read
    /// or parsed is an error.
    pub fn load(&self) -> Result<Option<CameraIntrinsics>, StoreError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                log::info!("no calibration record at {}", self.path.display());
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };
        let record: CalibrationRecord = serde_json::from_str(&raw)?;
        let intr = record.to_intrinsics()?;
        match &intr {
            Some(i) => log::info!(
                "loaded calibration from {}: fx={:.2} fy={:.2} cx={:.2} cy={:.2}",
                self.path.display(),
                i.fx,
                i.fy,
                i.cx,
                i.cy
            ),
            None => log::warn!(
                "calibration record at {} is incomplete, recalibrating",
                self.path.display()
            ),
        }
        Ok(intr)
    }

    /// Write the record as pretty JSON, replacing any previous one.
    pub fn save(&self, intrinsics: &CameraIntrinsics) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(&CalibrationRecord::from_intrinsics(intrinsics))?;
        fs::write(&self.path, json)?;
        log::info!("saved calibration to {}", self.path.display());
        Ok(())
    }
}
