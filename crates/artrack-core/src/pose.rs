use nalgebra::{Isometry3, Matrix4, Point2, Point3, Rotation3, Translation3, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

/// Rigid transform from the marker frame into the camera frame.
///
/// `rotation` is an axis-angle vector (direction = axis, norm = angle in
/// radians), `translation` is in the same unit as the marker side length.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub rotation: Vector3<f64>,
    pub translation: Vector3<f64>,
}

impl Default for Pose {
    fn default() -> Self {
        Self::absent()
    }
}

impl Pose {
    /// Sentinel used for frames without a marker.
    pub const ABSENT: Pose = Pose {
        rotation: Vector3::new(0.0, 0.0, 0.0),
        translation: Vector3::new(0.0, 0.0, 0.0),
    };

    pub fn absent() -> Self {
        Self::ABSENT
    }

    pub fn new(rotation: Vector3<f64>, translation: Vector3<f64>) -> Self {
        Self {
            rotation,
            translation,
        }
    }

    pub fn is_absent(&self) -> bool {
        *self == Self::ABSENT
    }

    pub fn rotation_matrix(&self) -> Rotation3<f64> {
        Rotation3::from_scaled_axis(self.rotation)
    }

    pub fn to_isometry(&self) -> Isometry3<f64> {
        Isometry3::from_parts(
            Translation3::from(self.translation),
            UnitQuaternion::from_scaled_axis(self.rotation),
        )
    }

    pub fn from_isometry(iso: &Isometry3<f64>) -> Self {
        Self {
            rotation: iso.rotation.scaled_axis(),
            translation: iso.translation.vector,
        }
    }

    pub fn from_rotation(r: &Rotation3<f64>, t: Vector3<f64>) -> Self {
        Self {
            rotation: r.scaled_axis(),
            translation: t,
        }
    }

    pub fn transform_point(&self, p: &Point3<f64>) -> Point3<f64> {
        self.rotation_matrix() * p + self.translation
    }

    /// Marker origin lies in front of the camera (`t.z > 0`).
    pub fn is_in_front(&self) -> bool {
        self.translation.z > 0.0
    }
}

/// One detected square marker with its corners in image order
/// top-left, top-right, bottom-right, bottom-left.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MarkerObservation {
    pub id: i32,
    pub corners: [Point2<f64>; 4],
}

/// Renderer-ready matrices in mathematical (row, column) layout.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ViewProjectionPair {
    pub view: Matrix4<f64>,
    pub projection: Matrix4<f64>,
}

impl ViewProjectionPair {
    /// Column-major `f32` arrays `(view, projection)` for GL-style uploads.
    pub fn to_gl_arrays(&self) -> ([f32; 16], [f32; 16]) {
        (column_major(&self.view), column_major(&self.projection))
    }
}

fn column_major(m: &Matrix4<f64>) -> [f32; 16] {
    // nalgebra storage is already column-major.
    let mut out = [0.0f32; 16];
    for (dst, src) in out.iter_mut().zip(m.as_slice()) {
        *dst = *src as f32;
    }
    out
}
