//! Camera pose from a square fiducial marker, and the matrices a renderer
//! needs to draw content anchored on it.
//!
//! ```no_run
//! use artrack_core::{CameraIntrinsics, MarkerObservation};
//! use artrack_pose::{FrameConverter, MarkerPoseEstimator};
//! # fn demo(obs: MarkerObservation) -> Result<(), artrack_pose::PoseError> {
//! let intr = CameraIntrinsics::new(500.0, 500.0, 320.0, 240.0);
//! let pose = MarkerPoseEstimator::default().estimate(&obs, 0.05, &intr)?;
//! let matrices = FrameConverter::default().matrices(&intr, &pose, 640, 480);
//! let (_view, _proj) = matrices.to_gl_arrays();
//! # Ok(())
//! # }
//! ```

mod estimator;
mod frames;
mod planar;

pub use estimator::{marker_object_points, reprojection_rms, MarkerPoseEstimator, PoseError};
pub use frames::{
    projection_matrix, view_matrix, view_projection, FrameConverter, ModelPlacement,
};
pub use planar::pose_from_homography;
