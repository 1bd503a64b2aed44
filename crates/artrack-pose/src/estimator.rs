use crate::planar::pose_from_homography;
use artrack_core::{
    homography_from_4pt, solve_least_squares, CameraIntrinsics, LeastSquaresParams,
    MarkerObservation, Pose, ResidualModel,
};
use nalgebra::{DVector, Point2, Point3, Rotation3, Vector3};
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum PoseError {
    #[error("marker corners are degenerate (collinear or coincident)")]
    Degenerate,
    #[error("marker side length must be positive, got {0}")]
    InvalidSideLength(f64),
    #[error("camera intrinsics are not usable")]
    InvalidIntrinsics,
}

/// Corners of a square marker of side `side` in its own frame, centred at
/// the origin on `z = 0`, in image order TL, TR, BR, BL.
pub fn marker_object_points(side: f64) -> [Point3<f64>; 4] {
    let h = side / 2.0;
    [
        Point3::new(-h, h, 0.0),
        Point3::new(h, h, 0.0),
        Point3::new(h, -h, 0.0),
        Point3::new(-h, -h, 0.0),
    ]
}

/// Value pushed for a point that falls behind the camera during refinement.
const BEHIND_CAMERA_RESIDUAL: f64 = 1e6;

struct MarkerReprojection<'a> {
    object: [Point3<f64>; 4],
    image: &'a [Point2<f64>; 4],
    intrinsics: &'a CameraIntrinsics,
}

fn pose_from_params(p: &DVector<f64>) -> Pose {
    Pose::new(
        Vector3::new(p[0], p[1], p[2]),
        Vector3::new(p[3], p[4], p[5]),
    )
}

impl ResidualModel for MarkerReprojection<'_> {
    fn residuals(&self, params: &DVector<f64>) -> DVector<f64> {
        let pose = pose_from_params(params);
        let rot = pose.rotation_matrix();
        let mut r = DVector::zeros(8);
        for (k, (obj, img)) in self.object.iter().zip(self.image).enumerate() {
            let pc = rot * obj + pose.translation;
            match self.intrinsics.project(&pc) {
                Some(px) => {
                    r[2 * k] = px.x - img.x;
                    r[2 * k + 1] = px.y - img.y;
                }
                None => {
                    r[2 * k] = BEHIND_CAMERA_RESIDUAL;
                    r[2 * k + 1] = BEHIND_CAMERA_RESIDUAL;
                }
            }
        }
        r
    }
}

/// Recovers the marker-to-camera pose of one square marker.
///
/// A closed-form homography solution seeds a Levenberg–Marquardt
/// refinement of the pixel reprojection error under the full lens model.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkerPoseEstimator {
    pub refine: LeastSquaresParams,
}

impl MarkerPoseEstimator {
    pub fn new(refine: LeastSquaresParams) -> Self {
        Self { refine }
    }

    #[cfg_attr(
        feature = "tracing",
        instrument(
            level = "debug",
            skip(self, observation, intrinsics),
            fields(id = observation.id)
        )
    )]
    pub fn estimate(
        &self,
        observation: &MarkerObservation,
        side_length: f64,
        intrinsics: &CameraIntrinsics,
    ) -> Result<Pose, PoseError> {
        if !(side_length > 0.0 && side_length.is_finite()) {
            return Err(PoseError::InvalidSideLength(side_length));
        }
        if !intrinsics.is_valid() {
            return Err(PoseError::InvalidIntrinsics);
        }
        if is_degenerate_quad(&observation.corners) {
            return Err(PoseError::Degenerate);
        }

        let object = marker_object_points(side_length);
        let plane = object.map(|p| Point2::new(p.x, p.y));
        let normalized = observation
            .corners
            .map(|c| Point2::from(intrinsics.undistort_point(&c)));
        let h = homography_from_4pt(&plane, &normalized).ok_or(PoseError::Degenerate)?;
        let init = pose_from_homography(&h).ok_or(PoseError::Degenerate)?;

        let model = MarkerReprojection {
            object,
            image: &observation.corners,
            intrinsics,
        };
        let start = DVector::from_iterator(
            6,
            init.rotation.iter().chain(init.translation.iter()).copied(),
        );
        let (refined, report) = solve_least_squares(&model, start, &self.refine);
        let pose = pose_from_params(&refined);

        log::trace!(
            "marker {}: rms {:.4} -> {:.4} px after {} iterations",
            observation.id,
            report.initial_rms,
            report.final_rms,
            report.iterations
        );

        // Keep the closed-form pose if refinement wandered behind the camera.
        if pose.is_in_front() {
            Ok(pose)
        } else {
            Ok(init)
        }
    }

    /// Solve every observed marker independently, in input order.
    pub fn estimate_all(
        &self,
        observations: &[MarkerObservation],
        side_length: f64,
        intrinsics: &CameraIntrinsics,
    ) -> Vec<(i32, Result<Pose, PoseError>)> {
        observations
            .iter()
            .map(|obs| (obs.id, self.estimate(obs, side_length, intrinsics)))
            .collect()
    }
}

/// RMS pixel distance between the observed corners and the corners
/// re-projected through `pose`. Infinite if a corner falls behind the camera.
pub fn reprojection_rms(
    pose: &Pose,
    observation: &MarkerObservation,
    side_length: f64,
    intrinsics: &CameraIntrinsics,
) -> f64 {
    let rot: Rotation3<f64> = pose.rotation_matrix();
    let mut sum = 0.0;
    for (obj, img) in marker_object_points(side_length)
        .iter()
        .zip(&observation.corners)
    {
        match intrinsics.project(&(rot * obj + pose.translation)) {
            Some(px) => sum += (px - img).norm_squared(),
            None => return f64::INFINITY,
        }
    }
    (sum / 4.0).sqrt()
}

fn is_degenerate_quad(c: &[Point2<f64>; 4]) -> bool {
    if c.iter().any(|p| !p.x.is_finite() || !p.y.is_finite()) {
        return true;
    }
    let extent = c
        .iter()
        .flat_map(|a| c.iter().map(move |b| (a - b).norm()))
        .fold(0.0, f64::max);
    if extent <= 1e-9 {
        return true;
    }
    // Any three corners (nearly) collinear.
    let tol = 1e-9 * extent * extent;
    (0..4).any(|i| {
        let a = c[i];
        let b = c[(i + 1) % 4];
        let d = c[(i + 2) % 4];
        let cross = (b - a).perp(&(d - a));
        cross.abs() <= tol
    })
}
