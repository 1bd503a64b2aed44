//! Interactive checkerboard calibration of a single camera.
//!
//! The capture loop ([`CameraCalibrator::calibrate`]) pulls frames, asks an
//! external [`BoardDetector`] for the inner corners, refines them to
//! sub-pixel precision and lets the operator accept or abort. Once the
//! configured number of views is collected, [`solve_calibration`] runs
//! Zhang's closed form followed by a joint Levenberg–Marquardt refinement.
//!
//! Recorded views can be solved without a camera through
//! [`CalibrationSession`].

mod calibrator;
mod config;
mod error;
mod session;
mod solver;
mod subpix;
mod zhang;

pub use calibrator::{
    BoardDetector, CalibrationProgress, CameraCalibrator, OperatorCommand, OperatorInput,
};
pub use config::{BoardSpec, CalibrationConfig, SolverParams, SubPixParams};
pub use error::CalibrationError;
pub use session::{CalibrationSession, CalibrationState};
pub use solver::{solve_calibration, CalibrationResult, CalibrationSample};
pub use subpix::refine_corners;
pub use zhang::intrinsics_from_homographies;
