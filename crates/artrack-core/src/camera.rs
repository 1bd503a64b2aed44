use nalgebra::{Matrix3, Point2, Point3, Vector2};
use serde::{Deserialize, Serialize};

/// Five-coefficient Brown–Conrady lens distortion, in the usual
/// `(k1, k2, p1, p2, k3)` order.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Distortion {
    pub k1: f64,
    pub k2: f64,
    pub p1: f64,
    pub p2: f64,
    pub k3: f64,
}

impl Distortion {
    pub const COUNT: usize = 5;

    pub fn to_vec(&self) -> Vec<f64> {
        vec![self.k1, self.k2, self.p1, self.p2, self.k3]
    }

    /// Build from a coefficient vector; shorter vectors are zero-padded.
    ///
    /// Returns `None` for more than five coefficients.
    pub fn from_slice(coeffs: &[f64]) -> Option<Self> {
        if coeffs.len() > Self::COUNT {
            return None;
        }
        let mut c = [0.0; Self::COUNT];
        c[..coeffs.len()].copy_from_slice(coeffs);
        Some(Self {
            k1: c[0],
            k2: c[1],
            p1: c[2],
            p2: c[3],
            k3: c[4],
        })
    }

    pub fn is_zero(&self) -> bool {
        self.to_vec().iter().all(|&c| c == 0.0)
    }

    /// Apply distortion to an undistorted normalised point.
    pub fn distort(&self, n: Vector2<f64>) -> Vector2<f64> {
        let (x, y) = (n.x, n.y);
        let r2 = x * x + y * y;
        let r4 = r2 * r2;
        let r6 = r4 * r2;
        let radial = 1.0 + self.k1 * r2 + self.k2 * r4 + self.k3 * r6;

        let xy = x * y;
        let x_tan = 2.0 * self.p1 * xy + self.p2 * (r2 + 2.0 * x * x);
        let y_tan = self.p1 * (r2 + 2.0 * y * y) + 2.0 * self.p2 * xy;
        Vector2::new(x * radial + x_tan, y * radial + y_tan)
    }

    /// Fixed-point inverse of [`Distortion::distort`].
    pub fn undistort(&self, nd: Vector2<f64>) -> Vector2<f64> {
        if self.is_zero() {
            return nd;
        }
        let mut n = nd;
        for _ in 0..20 {
            let err = self.distort(n) - nd;
            n -= err;
            if err.norm_squared() < 1e-24 {
                break;
            }
        }
        n
    }
}

/// Pinhole intrinsics with lens distortion. Pixel coordinates have the
/// origin at the top-left, x right, y down.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CameraIntrinsics {
    pub fx: f64,
    pub fy: f64,
    pub cx: f64,
    pub cy: f64,
    #[serde(default)]
    pub distortion: Distortion,
}

impl CameraIntrinsics {
    pub fn new(fx: f64, fy: f64, cx: f64, cy: f64) -> Self {
        Self {
            fx,
            fy,
            cx,
            cy,
            distortion: Distortion::default(),
        }
    }

    pub fn with_distortion(self, distortion: Distortion) -> Self {
        Self { distortion, ..self }
    }

    pub fn k_matrix(&self) -> Matrix3<f64> {
        Matrix3::new(
            self.fx, 0.0, self.cx, //
            0.0, self.fy, self.cy, //
            0.0, 0.0, 1.0,
        )
    }

    /// Read `fx, fy, cx, cy` from a camera matrix; skew is ignored.
    pub fn from_k_matrix(k: &Matrix3<f64>, distortion: Distortion) -> Self {
        Self {
            fx: k[(0, 0)],
            fy: k[(1, 1)],
            cx: k[(0, 2)],
            cy: k[(1, 2)],
            distortion,
        }
    }

    /// Focal lengths positive and every parameter finite.
    pub fn is_valid(&self) -> bool {
        let finite = [self.fx, self.fy, self.cx, self.cy]
            .into_iter()
            .chain(self.distortion.to_vec())
            .all(f64::is_finite);
        finite && self.fx > 0.0 && self.fy > 0.0
    }

    /// Project a camera-frame point to pixels. `None` behind the camera.
    pub fn project(&self, p: &Point3<f64>) -> Option<Point2<f64>> {
        if p.z <= f64::EPSILON {
            return None;
        }
        let n = Vector2::new(p.x / p.z, p.y / p.z);
        Some(self.normalized_to_pixel(self.distortion.distort(n)))
    }

    pub fn normalized_to_pixel(&self, n: Vector2<f64>) -> Point2<f64> {
        Point2::new(self.fx * n.x + self.cx, self.fy * n.y + self.cy)
    }

    /// Pixel to undistorted normalised image coordinates.
    pub fn undistort_point(&self, px: &Point2<f64>) -> Vector2<f64> {
        let nd = Vector2::new((px.x - self.cx) / self.fx, (px.y - self.cy) / self.fy);
        self.distortion.undistort(nd)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn cam() -> CameraIntrinsics {
        CameraIntrinsics::new(500.0, 510.0, 320.0, 240.0).with_distortion(Distortion {
            k1: -0.12,
            k2: 0.03,
            p1: 0.001,
            p2: -0.0005,
            k3: 0.0,
        })
    }

    #[test]
    fn undistort_inverts_projection() {
        let c = cam();
        let p = Point3::new(0.08, -0.05, 0.6);
        let px = c.project(&p).expect("in front");
        let n = c.undistort_point(&px);
        assert_relative_eq!(n.x, p.x / p.z, epsilon = 1e-9);
        assert_relative_eq!(n.y, p.y / p.z, epsilon = 1e-9);
    }

    #[test]
    fn points_behind_camera_do_not_project() {
        assert!(cam().project(&Point3::new(0.0, 0.0, -1.0)).is_none());
    }

    #[test]
    fn coefficient_vector_padding() {
        let d = Distortion::from_slice(&[0.1, 0.2]).expect("short ok");
        assert_eq!(d.to_vec(), vec![0.1, 0.2, 0.0, 0.0, 0.0]);
        assert!(Distortion::from_slice(&[0.0; 8]).is_none());
    }

    #[test]
    fn k_matrix_round_trip() {
        let c = cam();
        let back = CameraIntrinsics::from_k_matrix(&c.k_matrix(), c.distortion);
        assert_eq!(back, c);
        assert!(c.is_valid());
        assert!(!CameraIntrinsics::new(0.0, 500.0, 1.0, 1.0).is_valid());
    }
}
