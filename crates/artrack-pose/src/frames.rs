//! Vision camera frame to renderer clip space.
//!
//! The vision camera looks down `+z` with `y` pointing down the image; the
//! renderer looks down `-z` with `y` up. All matrices here use mathematical
//! (row, column) indexing; flatten with [`ViewProjectionPair::to_gl_arrays`].

use artrack_core::{CameraIntrinsics, Pose, ViewProjectionPair};
use nalgebra::{Matrix4, Rotation3, Vector3};
use serde::{Deserialize, Serialize};

/// Perspective projection reproducing the physical camera's field of view
/// and principal point for a `width × height` viewport.
pub fn projection_matrix(
    intrinsics: &CameraIntrinsics,
    width: u32,
    height: u32,
    near: f64,
    far: f64,
) -> Matrix4<f64> {
    let (w, h) = (width as f64, height as f64);
    let mut p = Matrix4::zeros();
    p[(0, 0)] = 2.0 * intrinsics.fx / w;
    p[(1, 1)] = 2.0 * intrinsics.fy / h;
    p[(0, 2)] = 1.0 - 2.0 * intrinsics.cx / w;
    p[(1, 2)] = 2.0 * intrinsics.cy / h - 1.0;
    p[(2, 2)] = -(far + near) / (far - near);
    p[(2, 3)] = -2.0 * far * near / (far - near);
    p[(3, 2)] = -1.0;
    p
}

/// `diag(1, -1, -1, 1)`: vision camera axes to renderer camera axes.
fn vision_to_renderer() -> Matrix4<f64> {
    Matrix4::from_diagonal(&nalgebra::Vector4::new(1.0, -1.0, -1.0, 1.0))
}

/// View matrix for content anchored on the marker.
pub fn view_matrix(pose: &Pose) -> Matrix4<f64> {
    let r = pose.rotation_matrix();
    let mut rt = Matrix4::identity();
    rt.fixed_view_mut::<3, 3>(0, 0).copy_from(r.matrix());
    rt.fixed_view_mut::<3, 1>(0, 3).copy_from(&pose.translation);
    vision_to_renderer() * rt
}

pub fn view_projection(
    intrinsics: &CameraIntrinsics,
    pose: &Pose,
    width: u32,
    height: u32,
    near: f64,
    far: f64,
) -> ViewProjectionPair {
    ViewProjectionPair {
        view: view_matrix(pose),
        projection: projection_matrix(intrinsics, width, height, near, far),
    }
}

/// Clip planes for the renderer.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameConverter {
    pub near: f64,
    pub far: f64,
}

impl Default for FrameConverter {
    fn default() -> Self {
        Self {
            near: 0.1,
            far: 100.0,
        }
    }
}

impl FrameConverter {
    pub fn matrices(
        &self,
        intrinsics: &CameraIntrinsics,
        pose: &Pose,
        width: u32,
        height: u32,
    ) -> ViewProjectionPair {
        view_projection(intrinsics, pose, width, height, self.near, self.far)
    }
}

/// Stands a mesh up on the marker: `T(offset) · Rx(angle) · S(scale)`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelPlacement {
    pub rotation_x_deg: f64,
    pub scale: f64,
}

impl Default for ModelPlacement {
    fn default() -> Self {
        Self {
            rotation_x_deg: 90.0,
            scale: 0.001,
        }
    }
}

impl ModelPlacement {
    pub fn model_matrix(&self, offset: Vector3<f64>) -> Matrix4<f64> {
        let rx = Rotation3::from_axis_angle(&Vector3::x_axis(), self.rotation_x_deg.to_radians());
        Matrix4::new_translation(&offset) * rx.to_homogeneous() * Matrix4::new_scaling(self.scale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::{Point3, Vector4};

    fn cam() -> CameraIntrinsics {
        CameraIntrinsics::new(500.0, 500.0, 320.0, 240.0)
    }

    fn to_ndc(clip: Vector4<f64>) -> Vector3<f64> {
        Vector3::new(clip.x / clip.w, clip.y / clip.w, clip.z / clip.w)
    }

    #[test]
    fn focal_terms_match_viewport() {
        let p = projection_matrix(&cam(), 640, 480, 0.1, 100.0);
        assert_relative_eq!(p[(0, 0)], 2.0 * 500.0 / 640.0);
        assert_relative_eq!(p[(1, 1)], 2.0 * 500.0 / 480.0);
        assert_relative_eq!(p[(0, 2)], 0.0);
        assert_relative_eq!(p[(1, 2)], 0.0);
    }

    #[test]
    fn image_centre_maps_to_clip_origin() {
        let pose = Pose::new(Vector3::new(0.2, -0.1, 0.05), Vector3::new(0.0, 0.0, 0.8));
        let vp = FrameConverter::default().matrices(&cam(), &pose, 640, 480);
        let clip = vp.projection * vp.view * Vector4::new(0.0, 0.0, 0.0, 1.0);
        let ndc = to_ndc(clip);
        assert_relative_eq!(ndc.x, 0.0, epsilon = 1e-12);
        assert_relative_eq!(ndc.y, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn pixels_land_on_matching_ndc() {
        let intr = CameraIntrinsics::new(610.0, 590.0, 300.0, 250.0);
        let pose = Pose::new(Vector3::new(-0.3, 0.15, 0.4), Vector3::new(0.03, -0.02, 0.5));
        let vp = view_projection(&intr, &pose, 640, 480, 0.1, 100.0);
        for m in [Point3::new(0.025, 0.025, 0.0), Point3::new(-0.02, 0.01, 0.03)] {
            let px = intr.project(&pose.transform_point(&m)).expect("visible");
            let ndc = to_ndc(vp.projection * vp.view * m.to_homogeneous());
            assert_relative_eq!(ndc.x, 2.0 * px.x / 640.0 - 1.0, epsilon = 1e-9);
            assert_relative_eq!(ndc.y, 1.0 - 2.0 * px.y / 480.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn near_and_far_bound_depth() {
        let p = projection_matrix(&cam(), 640, 480, 0.1, 100.0);
        let near = to_ndc(p * Vector4::new(0.0, 0.0, -0.1, 1.0));
        let far = to_ndc(p * Vector4::new(0.0, 0.0, -100.0, 1.0));
        assert_relative_eq!(near.z, -1.0, epsilon = 1e-9);
        assert_relative_eq!(far.z, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn view_flips_y_and_z_rows() {
        let pose = Pose::new(Vector3::zeros(), Vector3::new(0.0, 0.0, 1.0));
        let v = view_matrix(&pose);
        let expected = Matrix4::new(
            1.0, 0.0, 0.0, 0.0, //
            0.0, -1.0, 0.0, 0.0, //
            0.0, 0.0, -1.0, -1.0, //
            0.0, 0.0, 0.0, 1.0,
        );
        assert_relative_eq!(v, expected);
    }

    #[test]
    fn model_placement_stands_mesh_up() {
        let m = ModelPlacement::default().model_matrix(Vector3::new(0.0, 0.02, 0.0));
        // Mesh +y (up) becomes marker +z after the 90 degree turn about x.
        let up = m * Vector4::new(0.0, 1000.0, 0.0, 1.0);
        assert_relative_eq!(up, Vector4::new(0.0, 0.02, 1.0, 1.0), epsilon = 1e-12);
    }
}
