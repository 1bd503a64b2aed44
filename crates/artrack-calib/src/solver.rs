//! Intrinsics + distortion from a set of planar board views.

use crate::{zhang::intrinsics_from_homographies, CalibrationError, SolverParams};
use artrack_core::{
    estimate_homography, numeric_jacobian, solve_least_squares, CameraIntrinsics, Distortion,
    Homography, Pose, ResidualModel,
};
use artrack_pose::pose_from_homography;
use nalgebra::{DMatrix, DVector, Point2, Point3, Rotation3, Vector3};
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// One accepted board view: detected pixel corners and the matching board
/// points, in the same order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CalibrationSample {
    pub image_points: Vec<Point2<f64>>,
    pub object_points: Vec<Point3<f64>>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CalibrationResult {
    pub intrinsics: CameraIntrinsics,
    /// RMS reprojection error over all corners, in pixels.
    pub rms_error: f64,
    pub per_view_rms: Vec<f64>,
    pub iterations: usize,
    pub image_size: (u32, u32),
}

/// `[fx, fy, cx, cy, k1, k2, p1, p2, k3]`
const N_INTR: usize = 9;
const N_POSE: usize = 6;
const BEHIND_CAMERA_RESIDUAL: f64 = 1e6;

fn intrinsics_from_params(p: &[f64]) -> CameraIntrinsics {
    CameraIntrinsics::new(p[0], p[1], p[2], p[3]).with_distortion(Distortion {
        k1: p[4],
        k2: p[5],
        p1: p[6],
        p2: p[7],
        k3: p[8],
    })
}

fn intrinsics_to_params(intr: &CameraIntrinsics) -> [f64; N_INTR] {
    let d = &intr.distortion;
    [
        intr.fx, intr.fy, intr.cx, intr.cy, d.k1, d.k2, d.p1, d.p2, d.k3,
    ]
}

fn view_residuals(
    intr: &CameraIntrinsics,
    pose: &[f64],
    sample: &CalibrationSample,
    out: &mut [f64],
) {
    let rot = Rotation3::from_scaled_axis(Vector3::new(pose[0], pose[1], pose[2]));
    let t = Vector3::new(pose[3], pose[4], pose[5]);
    for (k, (obj, img)) in sample
        .object_points
        .iter()
        .zip(&sample.image_points)
        .enumerate()
    {
        match intr.project(&(rot * obj + t)) {
            Some(px) => {
                out[2 * k] = px.x - img.x;
                out[2 * k + 1] = px.y - img.y;
            }
            None => {
                out[2 * k] = BEHIND_CAMERA_RESIDUAL;
                out[2 * k + 1] = BEHIND_CAMERA_RESIDUAL;
            }
        }
    }
}

struct BoardReprojection<'a> {
    samples: &'a [CalibrationSample],
    /// First residual row of every view.
    row_offsets: Vec<usize>,
    rows: usize,
    fixed: [bool; N_INTR],
}

impl<'a> BoardReprojection<'a> {
    fn new(samples: &'a [CalibrationSample], fixed: [bool; N_INTR]) -> Self {
        let mut row_offsets = Vec::with_capacity(samples.len());
        let mut rows = 0;
        for s in samples {
            row_offsets.push(rows);
            rows += 2 * s.image_points.len();
        }
        Self {
            samples,
            row_offsets,
            rows,
            fixed,
        }
    }

    fn pose_params<'p>(&self, params: &'p [f64], view: usize) -> &'p [f64] {
        let base = N_INTR + N_POSE * view;
        &params[base..base + N_POSE]
    }

    fn residuals_with(&self, intr: &CameraIntrinsics, params: &[f64]) -> DVector<f64> {
        let mut r = DVector::zeros(self.rows);
        for (v, sample) in self.samples.iter().enumerate() {
            let start = self.row_offsets[v];
            let len = 2 * sample.image_points.len();
            view_residuals(
                intr,
                self.pose_params(params, v),
                sample,
                &mut r.as_mut_slice()[start..start + len],
            );
        }
        r
    }
}

impl ResidualModel for BoardReprojection<'_> {
    fn residuals(&self, params: &DVector<f64>) -> DVector<f64> {
        let p = params.as_slice();
        self.residuals_with(&intrinsics_from_params(&p[..N_INTR]), p)
    }

    /// Block structure: intrinsics touch every row, a view pose only its own.
    fn jacobian(&self, params: &DVector<f64>) -> DMatrix<f64> {
        let p = params.as_slice();
        let mut jac = DMatrix::zeros(self.rows, params.len());

        let intr_block = numeric_jacobian(
            |q| self.residuals_with(&intrinsics_from_params(q.as_slice()), p),
            &DVector::from_column_slice(&p[..N_INTR]),
        );
        for j in (0..N_INTR).filter(|&j| !self.fixed[j]) {
            jac.set_column(j, &intr_block.column(j));
        }

        let intr = intrinsics_from_params(&p[..N_INTR]);
        for (v, sample) in self.samples.iter().enumerate() {
            let len = 2 * sample.image_points.len();
            let block = numeric_jacobian(
                |q| {
                    let mut out = DVector::zeros(len);
                    view_residuals(&intr, q.as_slice(), sample, out.as_mut_slice());
                    out
                },
                &DVector::from_column_slice(self.pose_params(p, v)),
            );
            jac.view_mut((self.row_offsets[v], N_INTR + N_POSE * v), (len, N_POSE))
                .copy_from(&block);
        }
        jac
    }
}

fn rms(sum_sq: f64, points: usize) -> f64 {
    if points == 0 {
        0.0
    } else {
        (sum_sq / points as f64).sqrt()
    }
}

/// Solve intrinsics from accepted views.
///
/// Zhang's closed form seeds per-view poses and a pinhole camera; a joint
/// Levenberg–Marquardt over intrinsics, distortion and all poses then
/// minimises pixel reprojection error.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "info", skip(samples, params), fields(views = samples.len()))
)]
pub fn solve_calibration(
    samples: &[CalibrationSample],
    image_size: (u32, u32),
    params: &SolverParams,
) -> Result<CalibrationResult, CalibrationError> {
    if samples.len() < 3 {
        return Err(CalibrationError::Degenerate("at least three views are required"));
    }

    let homographies = samples
        .iter()
        .map(|s| {
            let plane: Vec<Point2<f64>> =
                s.object_points.iter().map(|p| Point2::new(p.x, p.y)).collect();
            estimate_homography(&plane, &s.image_points)
        })
        .collect::<Option<Vec<Homography>>>()
        .ok_or(CalibrationError::Degenerate("board homography could not be estimated"))?;

    let init = intrinsics_from_homographies(&homographies, image_size)
        .ok_or(CalibrationError::Degenerate("closed-form intrinsics are singular"))?;
    log::debug!(
        "initial intrinsics fx={:.2} fy={:.2} cx={:.2} cy={:.2}",
        init.fx,
        init.fy,
        init.cx,
        init.cy
    );

    let k_inv = init
        .k_matrix()
        .try_inverse()
        .ok_or(CalibrationError::Degenerate("camera matrix is singular"))?;
    let poses = homographies
        .iter()
        .map(|h| pose_from_homography(&Homography::new(k_inv * h.h)))
        .collect::<Option<Vec<Pose>>>()
        .ok_or(CalibrationError::Degenerate("view pose could not be recovered"))?;

    let mut start = Vec::with_capacity(N_INTR + N_POSE * poses.len());
    start.extend_from_slice(&intrinsics_to_params(&init));
    for pose in &poses {
        start.extend(pose.rotation.iter().chain(pose.translation.iter()));
    }

    let mut fixed = [false; N_INTR];
    if !params.estimate_distortion {
        fixed[4..].fill(true);
    } else if params.fix_k3 {
        fixed[8] = true;
    }

    let model = BoardReprojection::new(samples, fixed);
    let (refined, report) =
        solve_least_squares(&model, DVector::from_vec(start), &params.least_squares);
    let intrinsics = intrinsics_from_params(&refined.as_slice()[..N_INTR]);
    if !intrinsics.is_valid() {
        return Err(CalibrationError::Degenerate("refinement diverged"));
    }

    let residuals = model.residuals(&refined);
    let mut per_view_rms = Vec::with_capacity(samples.len());
    let mut total_sq = 0.0;
    let mut total_points = 0;
    for (v, sample) in samples.iter().enumerate() {
        let start = model.row_offsets[v];
        let n = sample.image_points.len();
        let sq = residuals.rows(start, 2 * n).norm_squared();
        per_view_rms.push(rms(sq, n));
        total_sq += sq;
        total_points += n;
    }
    let rms_error = rms(total_sq, total_points);

    log::info!(
        "calibrated {} views: fx={:.3} fy={:.3} cx={:.3} cy={:.3}, rms {:.4} px ({} iterations)",
        samples.len(),
        intrinsics.fx,
        intrinsics.fy,
        intrinsics.cx,
        intrinsics.cy,
        rms_error,
        report.iterations
    );

    Ok(CalibrationResult {
        intrinsics,
        rms_error,
        per_view_rms,
        iterations: report.iterations,
        image_size,
    })
}
