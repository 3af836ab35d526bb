//! Camera matrices derived from the viewport, the audio level and the spin.

use glam::{Mat4, Quat, Vec3, Vec4};

use crate::animation::{reduce_angle, AnimationState};
use crate::params::CameraParams;

/// Projection and view matrices for one frame (never cached across frames)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraMatrices {
    pub projection: Mat4,
    pub view: Mat4,
}

impl CameraMatrices {
    /// Derive both matrices
    ///
    /// # Arguments
    /// * `params` - Frustum and dolly parameters
    /// * `aspect_ratio` - Viewport width / height
    /// * `sensitivity` - Latest audio sensitivity scalar
    /// * `animation` - Current animation state (only the spin is used)
    pub fn derive(
        params: &CameraParams,
        aspect_ratio: f32,
        sensitivity: f32,
        animation: &AnimationState,
    ) -> Self {
        Self {
            projection: projection_matrix(params, aspect_ratio),
            view: view_matrix(params, sensitivity, animation.rotation_angle),
        }
    }
}

/// Perspective frustum with a fixed near-plane half-width.
///
/// The half-height follows the viewport so the image is never stretched.
pub fn projection_matrix(params: &CameraParams, aspect_ratio: f32) -> Mat4 {
    let aspect = if aspect_ratio.is_finite() && aspect_ratio > 0.0 {
        aspect_ratio
    } else {
        1.0
    };
    let w = params.frustum_half_width;
    let h = w / aspect;
    frustum_rh(-w, w, -h, h, params.near_plane, params.far_plane)
}

/// Distance from the camera to the mesh for a given sensitivity
pub fn dolly_distance(params: &CameraParams, sensitivity: f32) -> f32 {
    let level = if sensitivity.is_finite() { sensitivity } else { 0.0 };
    params.base_distance - level * params.dolly_gain
}

/// Dolly translation composed with a quaternion spin about the configured axis
pub fn view_matrix(params: &CameraParams, sensitivity: f32, rotation_angle: f32) -> Mat4 {
    let axis = Vec3::from_array(params.rotation_axis).normalize_or(Vec3::Y);
    let spin = Quat::from_axis_angle(axis, reduce_angle(rotation_angle)).normalize();
    let translation = Vec3::new(0.0, params.lift, -dolly_distance(params, sensitivity));

    Mat4::from_translation(translation) * Mat4::from_quat(spin)
}

/// Right-handed off-axis frustum with a `[0, 1]` depth range
pub fn frustum_rh(left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32) -> Mat4 {
    let inv_width = 1.0 / (right - left);
    let inv_height = 1.0 / (top - bottom);
    let r = far / (near - far);

    Mat4::from_cols(
        Vec4::new(2.0 * near * inv_width, 0.0, 0.0, 0.0),
        Vec4::new(0.0, 2.0 * near * inv_height, 0.0, 0.0),
        Vec4::new((right + left) * inv_width, (top + bottom) * inv_height, r, -1.0),
        Vec4::new(0.0, 0.0, r * near, 0.0),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symmetric_frustum_matches_perspective() {
        let (w, h, near, far) = (0.9, 0.6, 4.0, 30.0);
        let frustum = frustum_rh(-w, w, -h, h, near, far);
        let fov_y = 2.0 * (h / near).atan();
        let perspective = Mat4::perspective_rh(fov_y, w / h, near, far);

        assert!(frustum.abs_diff_eq(perspective, 1e-5));
    }

    #[test]
    fn test_silence_dolly_equals_base_distance() {
        let params = CameraParams::default();
        let matrices =
            CameraMatrices::derive(&params, 1.0, 0.0, &AnimationState::default());

        assert_eq!(matrices.view.w_axis.z, -params.base_distance);
        assert_eq!(dolly_distance(&params, 0.0), params.base_distance);
    }

    #[test]
    fn test_sensitivity_moves_camera_closer() {
        let params = CameraParams::default();
        let quiet = view_matrix(&params, 0.0, 0.3);
        let loud = view_matrix(&params, 0.8, 0.3);

        assert!(loud.w_axis.z > quiet.w_axis.z);
        assert!((loud.w_axis.z - (-(params.base_distance - 0.8))).abs() < 1e-6);
    }

    #[test]
    fn test_rotation_is_periodic() {
        let params = CameraParams::default();
        let a = view_matrix(&params, 0.2, 1.0);
        let b = view_matrix(&params, 0.2, 1.0 + std::f32::consts::TAU);
        assert!(a.abs_diff_eq(b, 1e-4));
    }

    #[test]
    fn test_view_rotation_stays_orthonormal() {
        let params = CameraParams::default();
        for i in 0..64 {
            let view = view_matrix(&params, 0.5, i as f32 * 0.37);
            let det = glam::Mat3::from_mat4(view).determinant();
            assert!((det - 1.0).abs() < 1e-4);
        }
    }

    #[test]
    fn test_projection_follows_aspect() {
        let params = CameraParams::default();
        let square = projection_matrix(&params, 1.0);
        let wide = projection_matrix(&params, 2.0);

        // Same horizontal scale, doubled vertical scale
        assert_eq!(square.x_axis.x, wide.x_axis.x);
        assert!((wide.y_axis.y - 2.0 * square.y_axis.y).abs() < 1e-5);

        // Degenerate viewport falls back to square
        assert_eq!(projection_matrix(&params, 0.0), square);
    }
}
