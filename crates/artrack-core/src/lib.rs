//! Core types and utilities for marker-tracked augmented reality.
//!
//! This crate is intentionally small and purely geometric. It does *not*
//! depend on any concrete camera backend, marker detector or renderer.
//!
//! ## API map
//! - [`CameraIntrinsics`] / [`Distortion`]: pinhole + Brown–Conrady lens model.
//! - [`Pose`], [`MarkerObservation`], [`ViewProjectionPair`]: per-frame tracking data.
//! - [`Homography`]: normalized DLT and 4-point solvers.
//! - [`RgbImageView`], [`GrayImageView`]: borrowed frame buffers.
//! - [`FrameSource`]: the pull-based capture boundary.
//! - [`IntrinsicsStore`]: the single durable calibration record.
//! - [`solve_least_squares`]: Levenberg–Marquardt driver used by calibration and pose refinement.

mod camera;
mod capture;
mod homography;
mod image;
mod least_squares;
mod logger;
mod pose;
mod store;

pub use camera::{CameraIntrinsics, Distortion};
pub use capture::{CaptureError, FrameSource, ReplaySource};
pub use homography::{estimate_homography, homography_from_4pt, Homography};
pub use image::{sample_bilinear, GrayImage, GrayImageView, Rect, RgbImage, RgbImageView};
pub use least_squares::{
    numeric_jacobian, solve_least_squares, LeastSquaresParams, LeastSquaresReport, ResidualModel,
};
pub use pose::{MarkerObservation, Pose, ViewProjectionPair};
pub use store::{CalibrationRecord, IntrinsicsStore, StoreError, DEFAULT_CALIBRATION_PATH};

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::{init_with_level, set_log_frame};
