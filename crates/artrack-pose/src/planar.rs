//! Pose of a plane from its homography.

use artrack_core::{Homography, Pose};
use nalgebra::{Matrix3, Rotation3, Vector3};

/// Decompose a homography from the plane `Z = 0` into *normalised* image
/// coordinates (`K^{-1} H` for a pixel homography) into the plane's pose.
///
/// The rotation is projected onto SO(3) and the sign is chosen so the plane
/// lies in front of the camera. Returns `None` for degenerate input.
pub fn pose_from_homography(h: &Homography) -> Option<Pose> {
    let h1 = h.column(0);
    let h2 = h.column(1);
    let h3 = h.column(2);

    let norm1 = h1.norm();
    let norm2 = h2.norm();
    if norm1 <= 1e-12 || norm2 <= 1e-12 {
        return None;
    }
    let lambda = 2.0 / (norm1 + norm2);

    let mut r1 = h1 * lambda;
    let mut r2 = h2 * lambda;
    let mut t: Vector3<f64> = h3 * lambda;
    if t.z < 0.0 {
        r1 = -r1;
        r2 = -r2;
        t = -t;
    }
    let r3 = r1.cross(&r2);
    if r3.norm() <= 1e-12 {
        return None;
    }

    let r = Matrix3::from_columns(&[r1, r2, r3]);
    let svd = r.svd(true, true);
    let (u, v_t) = (svd.u?, svd.v_t?);
    let mut rot = u * v_t;
    if rot.determinant() < 0.0 {
        let mut u_fixed = u;
        u_fixed.set_column(2, &(-u.column(2)));
        rot = u_fixed * v_t;
    }
    if !rot.iter().chain(t.iter()).all(|v| v.is_finite()) {
        return None;
    }

    Some(Pose::from_rotation(
        &Rotation3::from_matrix_unchecked(rot),
        t,
    ))
}
