//! Closed-form intrinsics from plane homographies (Zhang, 2000).

use artrack_core::{CameraIntrinsics, Distortion, Homography};
use nalgebra::{DMatrix, Matrix3, SVector};

/// The 6-vector `v_ij(H)` with `v_ijᵀ b = h_iᵀ B h_j`.
fn v_ij(h: &Matrix3<f64>, i: usize, j: usize) -> SVector<f64, 6> {
    let hi = h.column(i);
    let hj = h.column(j);
    SVector::<f64, 6>::from_row_slice(&[
        hi[0] * hj[0],
        hi[0] * hj[1] + hi[1] * hj[0],
        hi[1] * hj[1],
        hi[2] * hj[0] + hi[0] * hj[2],
        hi[2] * hj[1] + hi[1] * hj[2],
        hi[2] * hj[2],
    ])
}

/// Conditioning transform for pixel coordinates: centre the image and scale
/// by its larger side.
fn pixel_conditioning(width: u32, height: u32) -> Matrix3<f64> {
    let s = width.max(height).max(1) as f64;
    Matrix3::new(
        1.0 / s,
        0.0,
        -(width as f64) / (2.0 * s),
        0.0,
        1.0 / s,
        -(height as f64) / (2.0 * s),
        0.0,
        0.0,
        1.0,
    )
}

/// Estimate pinhole intrinsics (zero skew, no distortion) from at least
/// three board→pixel homographies. `None` for degenerate view sets.
pub fn intrinsics_from_homographies(
    homographies: &[Homography],
    image_size: (u32, u32),
) -> Option<CameraIntrinsics> {
    if homographies.len() < 3 {
        return None;
    }
    let t = pixel_conditioning(image_size.0, image_size.1);
    let t_inv = t.try_inverse()?;

    let m = homographies.len();
    let mut v = DMatrix::<f64>::zeros(2 * m, 6);
    for (k, h) in homographies.iter().enumerate() {
        let hc = t * h.h;
        let hc = hc / hc.norm();
        let v11 = v_ij(&hc, 0, 0);
        let v22 = v_ij(&hc, 1, 1);
        let v12 = v_ij(&hc, 0, 1);
        v.row_mut(2 * k).copy_from(&v12.transpose());
        v.row_mut(2 * k + 1).copy_from(&(v11 - v22).transpose());
    }

    let svd = v.svd(false, true);
    let v_t = svd.v_t?;
    let mut order: Vec<usize> = (0..svd.singular_values.len()).collect();
    order.sort_by(|&a, &b| svd.singular_values[a].total_cmp(&svd.singular_values[b]));
    // The null space of V must be one-dimensional.
    let s_max = svd.singular_values.max();
    if order.len() < 6 || svd.singular_values[order[1]] <= 1e-9 * s_max {
        return None;
    }
    let b = v_t.row(order[0]);
    let (b11, b12, b22, b13, b23, b33) = (b[0], b[1], b[2], b[3], b[4], b[5]);

    let denom = b11 * b22 - b12 * b12;
    let denom_norm = b11 * b11 + b22 * b22;
    if denom_norm <= 0.0 || denom.abs() / denom_norm <= 1e-9 {
        return None;
    }

    let v0 = (b12 * b13 - b11 * b23) / denom;
    let lambda = b33 - (b13 * b13 + v0 * (b12 * b13 - b11 * b23)) / b11;
    if lambda.signum() != b11.signum() {
        return None;
    }

    let alpha = (lambda / b11).sqrt();
    let beta = (lambda * b11 / denom).sqrt();
    let gamma = -b12 * alpha * alpha * beta / lambda;
    let u0 = gamma * v0 / beta - b13 * alpha * alpha / lambda;

    // Skew is dropped: the lens model has none.
    let kc = Matrix3::new(alpha, 0.0, u0, 0.0, beta, v0, 0.0, 0.0, 1.0);
    let k = t_inv * kc;
    let intr = CameraIntrinsics::from_k_matrix(&k, Distortion::default());
    intr.is_valid().then_some(intr)
}
