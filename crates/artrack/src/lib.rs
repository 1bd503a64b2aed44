//! High-level facade for the `artrack-*` workspace.
//!
//! This crate provides:
//! - re-exports of the calibration, pose and gesture crates
//! - the per-frame [`FramePipeline`] combining marker pose, renderer
//!   matrices, gestures and the fist-triggered animation
//! - the [`ArSession`] main loop and [`bootstrap_intrinsics`], which drive
//!   the external collaborators (camera, marker detector, renderer) through
//!   traits
//! - (feature `image`) frame loading from image files
//!
//! ## Quickstart
//!
//! ```no_run
//! use artrack::{AppConfig, FramePipeline};
//! use artrack::core::{CameraIntrinsics, RgbImage};
//! use std::time::Duration;
//!
//! let config = AppConfig::default();
//! let intrinsics = CameraIntrinsics::new(800.0, 800.0, 320.0, 240.0);
//! let mut pipeline = FramePipeline::new(intrinsics, &config);
//!
//! let frame = RgbImage::filled(640, 480, [0, 0, 0]);
//! let out = pipeline.process(&frame.view(), &[], Duration::ZERO);
//! assert!(out.pose.is_absent());
//! ```
//!
//! ## API map
//! - `artrack::core`: intrinsics, poses, frames, the calibration store.
//! - `artrack::calib`: interactive checkerboard calibration.
//! - `artrack::pose`: marker pose and renderer matrices.
//! - `artrack::gesture`: hand shape, swipes and the fist trigger.

pub use artrack_calib as calib;
pub use artrack_core as core;
pub use artrack_gesture as gesture;
pub use artrack_pose as pose;

pub use artrack_calib::{BoardDetector, CameraCalibrator, OperatorCommand, OperatorInput};
pub use artrack_core::{CameraIntrinsics, FrameSource, IntrinsicsStore, Pose};
pub use artrack_gesture::{GestureEvent, GestureKind};

mod boundary;
mod config;
mod error;
mod interaction;
mod pipeline;
mod session;

#[cfg(feature = "image")]
pub mod io;

pub use boundary::{Clock, FixedRateClock, MarkerDetector, MonotonicClock, Renderer};
pub use config::{load_json_file, AppConfig, ConfigError};
pub use error::AppError;
pub use interaction::{AnimationParams, AnimationState, InteractionStateMachine};
pub use pipeline::{FrameOutput, FramePipeline, RenderState};
pub use session::{bootstrap_intrinsics, ArSession, SessionSummary};
