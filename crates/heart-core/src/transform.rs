//! Placement transform and camera math.
//!
//! All functions here are pure. Matrices are glam's column-major `Mat4`/`Mat3`
//! in a right-handed, OpenGL-style clip convention.

use glam::{Mat3, Mat4, Vec2, Vec3};
use log::debug;
use nalgebra::Matrix3;

use crate::config::CameraConfig;
use crate::constants::{CAMERA_FAR, CAMERA_FOV_DEGREES, CAMERA_NEAR};

const DEGENERATE_EPS: f32 = 1e-8;

/// `translation(position) * rotation * scale`, with the uniform scale folded
/// into the upper 3x3 block.
pub fn build_transform(position: Vec3, rotation: Mat3, scale: f32) -> Mat4 {
    let m = rotation * scale;
    Mat4::from_cols(
        m.x_axis.extend(0.0),
        m.y_axis.extend(0.0),
        m.z_axis.extend(0.0),
        position.extend(1.0),
    )
}

/// Symmetric-frustum perspective projection (OpenGL depth range \[-1, 1\]).
pub fn perspective(fov_degrees: f32, aspect: f32, near: f32, far: f32) -> Mat4 {
    Mat4::perspective_rh_gl(fov_degrees.to_radians(), aspect, near, far)
}

/// Right-handed look-at view matrix. Falls back to identity when `eye` and
/// `target` coincide or `up` is parallel to the view direction.
pub fn look_at(eye: Vec3, target: Vec3, up: Vec3) -> Mat4 {
    let forward = target - eye;
    if forward.length_squared() < DEGENERATE_EPS
        || forward.cross(up).length_squared() < DEGENERATE_EPS
    {
        debug!("look_at: degenerate basis, using identity view");
        return Mat4::IDENTITY;
    }
    Mat4::look_at_rh(eye, target, up)
}

/// Orthonormal basis from a forward and an up hint.
///
/// Columns are `[right, up, -forward]` with `right = forward x up` and `up`
/// re-derived as `right x forward`. Returns identity for degenerate input.
pub fn rotation_from_forward_up(forward: Vec3, up: Vec3) -> Mat3 {
    let forward = forward.normalize_or_zero();
    let right = forward.cross(up.normalize_or_zero()).normalize_or_zero();
    if right == Vec3::ZERO {
        return Mat3::IDENTITY;
    }
    let up = right.cross(forward).normalize_or_zero();
    Mat3::from_cols(right, up, -forward)
}

/// Midpoint of the shoulders, pulled `offset_z` toward the camera (negative z).
pub fn chest_position(left_shoulder: Vec3, right_shoulder: Vec3, offset_z: f32) -> Vec3 {
    let mut center = (left_shoulder + right_shoulder) * 0.5;
    center.z -= offset_z;
    center
}

/// Chest orientation from shoulders and hips.
///
/// The averaged shoulder/hip lateral vector is turned a quarter in the xy
/// plane to get the forward direction; world up is +z for metric landmarks.
pub fn chest_rotation(
    left_shoulder: Vec3,
    right_shoulder: Vec3,
    left_hip: Vec3,
    right_hip: Vec3,
) -> Mat3 {
    let torso = ((right_shoulder - left_shoulder) + (right_hip - left_hip)) * 0.5;
    let forward = Vec3::new(-torso.y, torso.x, 0.0);
    rotation_from_forward_up(forward, Vec3::Z)
}

/// Orientation when only the shoulders are visible: facing the camera.
pub fn shoulder_rotation(left_shoulder: Vec3, right_shoulder: Vec3) -> Mat3 {
    if (right_shoulder - left_shoulder).length_squared() > 0.0 {
        rotation_from_forward_up(Vec3::NEG_Z, Vec3::Y)
    } else {
        Mat3::IDENTITY
    }
}

/// Projects `m` onto the nearest proper rotation (`U * V^T` from its SVD,
/// with the last column of `U` flipped when the determinant comes out negative).
///
/// Returns `None` for non-finite input or if the decomposition fails.
pub fn orthonormalize(m: Mat3) -> Option<Mat3> {
    if !m.is_finite() {
        return None;
    }
    let a = Matrix3::from_column_slice(&m.to_cols_array());
    let svd = a.try_svd(true, true, f32::EPSILON, 0)?;
    let mut u = svd.u?;
    let v_t = svd.v_t?;

    let mut r = u * v_t;
    if r.determinant() < 0.0 {
        u.column_mut(2).neg_mut();
        r = u * v_t;
    }
    Some(Mat3::from_cols_slice(r.as_slice()))
}

/// Component-wise blend `alpha * prev + (1 - alpha) * next`.
pub fn blend_rotation(prev: Mat3, next: Mat3, alpha: f32) -> Mat3 {
    prev * alpha + next * (1.0 - alpha)
}

/// Lifts a pixel anchor to a world point `distance` in front of a camera at
/// the origin looking down -z with the given vertical field of view.
pub fn screen_to_world(
    anchor_px: Vec2,
    frame_width: u32,
    frame_height: u32,
    fov_degrees: f32,
    distance: f32,
) -> Vec3 {
    let w = frame_width.max(1) as f32;
    let h = frame_height.max(1) as f32;
    let ndc_x = anchor_px.x / w * 2.0 - 1.0;
    let ndc_y = 1.0 - anchor_px.y / h * 2.0;
    let half_height = distance * (fov_degrees.to_radians() * 0.5).tan();
    let aspect = w / h;
    Vec3::new(ndc_x * half_height * aspect, ndc_y * half_height, -distance)
}

/// Simple right-handed camera description with perspective projection.
#[derive(Clone, Debug, PartialEq)]
pub struct Camera {
    pub eye: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    pub aspect: f32,
    pub fov_degrees: f32,
    pub znear: f32,
    pub zfar: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            eye: Vec3::ZERO,
            target: Vec3::NEG_Z,
            up: Vec3::Y,
            aspect: 16.0 / 9.0,
            fov_degrees: CAMERA_FOV_DEGREES,
            znear: CAMERA_NEAR,
            zfar: CAMERA_FAR,
        }
    }
}

impl Camera {
    pub fn from_config(config: &CameraConfig, aspect: f32) -> Self {
        Self {
            eye: Vec3::from(config.eye),
            target: Vec3::from(config.target),
            up: Vec3::from(config.up),
            aspect,
            fov_degrees: config.fov_degrees,
            znear: config.near,
            zfar: config.far,
        }
    }

    /// Aspect ratio for a frame size; a zero height is treated as one pixel.
    pub fn aspect_for(width: u32, height: u32) -> f32 {
        width as f32 / height.max(1) as f32
    }

    /// Compute the clip-space projection matrix.
    pub fn projection_matrix(&self) -> Mat4 {
        perspective(self.fov_degrees, self.aspect, self.znear, self.zfar)
    }

    /// Compute the view matrix that transforms world to view space.
    pub fn view_matrix(&self) -> Mat4 {
        look_at(self.eye, self.target, self.up)
    }
}
