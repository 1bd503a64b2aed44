use nalgebra::{DMatrix, Matrix3, Point2, SMatrix, SVector, Vector3};

/// Plane-to-plane projective map, `dst ~ H * src`, normalised so `H[2][2] = 1`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Homography {
    pub h: Matrix3<f64>,
}

impl Homography {
    pub fn new(h: Matrix3<f64>) -> Self {
        Self { h }
    }

    #[inline]
    pub fn apply(&self, p: Point2<f64>) -> Point2<f64> {
        let v = self.h * Vector3::new(p.x, p.y, 1.0);
        Point2::new(v[0] / v[2], v[1] / v[2])
    }

    pub fn inverse(&self) -> Option<Self> {
        self.h.try_inverse().map(Self::new)
    }

    /// Columns `h1, h2, h3` as used by plane-pose decomposition and Zhang's method.
    pub fn column(&self, j: usize) -> Vector3<f64> {
        self.h.column(j).into_owned()
    }
}

/// Translate to the centroid and scale so the mean distance is `sqrt(2)`.
///
/// Returns `None` when all points coincide.
fn normalize_points(pts: &[Point2<f64>]) -> Option<(Vec<Point2<f64>>, Matrix3<f64>)> {
    let n = pts.len() as f64;
    let (sx, sy) = pts.iter().fold((0.0, 0.0), |(sx, sy), p| (sx + p.x, sy + p.y));
    let (cx, cy) = (sx / n, sy / n);

    let mean_dist = pts
        .iter()
        .map(|p| ((p.x - cx).powi(2) + (p.y - cy).powi(2)).sqrt())
        .sum::<f64>()
        / n;
    if mean_dist <= 1e-12 {
        return None;
    }

    let s = std::f64::consts::SQRT_2 / mean_dist;
    let t = Matrix3::new(s, 0.0, -s * cx, 0.0, s, -s * cy, 0.0, 0.0, 1.0);
    let out = pts
        .iter()
        .map(|p| Point2::new(s * (p.x - cx), s * (p.y - cy)))
        .collect();
    Some((out, t))
}

fn finish(hn: Matrix3<f64>, t_src: Matrix3<f64>, t_dst: Matrix3<f64>) -> Option<Homography> {
    // H = T_dst^{-1} * Hn * T_src, scaled so h33 = 1.
    let h = t_dst.try_inverse()? * hn * t_src;
    let s = h[(2, 2)];
    if s.abs() < 1e-12 || !h.iter().all(|v| v.is_finite()) {
        return None;
    }
    Some(Homography::new(h / s))
}

/// Normalised DLT estimate of `H` with `dst ~ H * src` from `N >= 4` pairs.
///
/// Four correspondences go through [`homography_from_4pt`]. Returns `None`
/// for mismatched lengths or degenerate input.
pub fn estimate_homography(src: &[Point2<f64>], dst: &[Point2<f64>]) -> Option<Homography> {
    if src.len() != dst.len() || src.len() < 4 {
        return None;
    }
    if src.len() == 4 {
        let s: &[Point2<f64>; 4] = src.try_into().ok()?;
        let d: &[Point2<f64>; 4] = dst.try_into().ok()?;
        return homography_from_4pt(s, d);
    }

    let (s, ts) = normalize_points(src)?;
    let (d, td) = normalize_points(dst)?;

    let n = src.len();
    let mut a = DMatrix::<f64>::zeros(2 * n, 9);
    for k in 0..n {
        let (x, y) = (s[k].x, s[k].y);
        let (u, v) = (d[k].x, d[k].y);

        // [ -x -y -1   0  0  0   u*x u*y u ]
        a[(2 * k, 0)] = -x;
        a[(2 * k, 1)] = -y;
        a[(2 * k, 2)] = -1.0;
        a[(2 * k, 6)] = u * x;
        a[(2 * k, 7)] = u * y;
        a[(2 * k, 8)] = u;

        // [ 0  0  0  -x -y -1   v*x v*y v ]
        a[(2 * k + 1, 3)] = -x;
        a[(2 * k + 1, 4)] = -y;
        a[(2 * k + 1, 5)] = -1.0;
        a[(2 * k + 1, 6)] = v * x;
        a[(2 * k + 1, 7)] = v * y;
        a[(2 * k + 1, 8)] = v;
    }

    // Null vector of A: right singular vector of the smallest singular value.
    // N >= 5 here, so A has at least 10 rows and V^T is full.
    let svd = a.svd(false, true);
    let vt = svd.v_t?;
    let (min_idx, _) = svd
        .singular_values
        .iter()
        .enumerate()
        .min_by(|a, b| a.1.total_cmp(b.1))?;
    let h = vt.row(min_idx);
    let hn = Matrix3::from_row_slice(&[h[0], h[1], h[2], h[3], h[4], h[5], h[6], h[7], h[8]]);

    finish(hn, ts, td)
}

/// Exact homography from four correspondences (8×8 linear system, `h33 = 1`).
///
/// Corner order must be consistent between `src` and `dst`.
pub fn homography_from_4pt(src: &[Point2<f64>; 4], dst: &[Point2<f64>; 4]) -> Option<Homography> {
    let (s, ts) = normalize_points(src)?;
    let (d, td) = normalize_points(dst)?;

    let mut a = SMatrix::<f64, 8, 8>::zeros();
    let mut b = SVector::<f64, 8>::zeros();
    for k in 0..4 {
        let (x, y) = (s[k].x, s[k].y);
        let (u, v) = (d[k].x, d[k].y);

        let r0 = 2 * k;
        a[(r0, 0)] = x;
        a[(r0, 1)] = y;
        a[(r0, 2)] = 1.0;
        a[(r0, 6)] = -u * x;
        a[(r0, 7)] = -u * y;
        b[r0] = u;

        let r1 = 2 * k + 1;
        a[(r1, 3)] = x;
        a[(r1, 4)] = y;
        a[(r1, 5)] = 1.0;
        a[(r1, 6)] = -v * x;
        a[(r1, 7)] = -v * y;
        b[r1] = v;
    }

    // Collinear configurations make the system singular.
    let x = a.lu().solve(&b)?;
    let hn = Matrix3::new(
        x[0], x[1], x[2], //
        x[3], x[4], x[5], //
        x[6], x[7], 1.0,
    );
    finish(hn, ts, td)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: Point2<f64>, b: Point2<f64>, tol: f64) {
        assert!(
            (a - b).norm() < tol,
            "expected ({:.6},{:.6}) ~ ({:.6},{:.6}) within {}",
            a.x,
            a.y,
            b.x,
            b.y,
            tol
        );
    }

    fn perspective() -> Homography {
        Homography::new(Matrix3::new(
            480.0, 12.0, 330.0, //
            -8.0, 470.0, 250.0, //
            0.4, -0.2, 1.0,
        ))
    }

    #[test]
    fn four_marker_corners_recover_map() {
        let h = perspective();
        let half = 0.025;
        let marker = [
            Point2::new(-half, half),
            Point2::new(half, half),
            Point2::new(half, -half),
            Point2::new(-half, -half),
        ];
        let img = marker.map(|p| h.apply(p));

        let est = homography_from_4pt(&marker, &img).expect("solvable");
        for p in [Point2::new(0.0, 0.0), Point2::new(0.01, -0.02)] {
            assert_close(est.apply(p), h.apply(p), 1e-6);
        }
    }

    #[test]
    fn board_grid_overdetermined() {
        let h = perspective();
        let board: Vec<Point2<f64>> = (0..6)
            .flat_map(|r| (0..9).map(move |c| Point2::new(c as f64 * 0.025, r as f64 * 0.025)))
            .collect();
        let img: Vec<Point2<f64>> = board.iter().map(|&p| h.apply(p)).collect();

        let est = estimate_homography(&board, &img).expect("estimate");
        let inv = est.inverse().expect("invertible");
        for &p in &board {
            assert_close(est.apply(p), h.apply(p), 1e-6);
            assert_close(inv.apply(est.apply(p)), p, 1e-9);
        }
    }

    #[test]
    fn collinear_corners_are_rejected() {
        let src = [
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(2.0, 0.0),
            Point2::new(3.0, 0.0),
        ];
        let dst = [
            Point2::new(10.0, 10.0),
            Point2::new(20.0, 10.0),
            Point2::new(30.0, 10.0),
            Point2::new(40.0, 10.0),
        ];
        assert!(homography_from_4pt(&src, &dst).is_none());
        let same = [Point2::new(5.0, 5.0); 4];
        assert!(homography_from_4pt(&same, &dst).is_none());
    }

    #[test]
    fn mismatched_lengths_fail() {
        let a = [Point2::new(0.0, 0.0); 5];
        let b = [Point2::new(1.0, 1.0); 4];
        assert!(estimate_homography(&a, &b).is_none());
    }
}
