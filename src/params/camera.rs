//! Camera framing for the spinning mesh.

use super::{ensure_positive, ConfigError};

/// Perspective frustum and audio-reactive dolly parameters
#[derive(Debug, Clone)]
pub struct CameraParams {
    /// Half-width of the frustum at the near plane (world units)
    pub frustum_half_width: f32,

    /// Near clipping plane (world units)
    pub near_plane: f32,

    /// Far clipping plane (world units)
    pub far_plane: f32,

    /// Camera distance from the mesh when the input is silent
    pub base_distance: f32,

    /// World units the camera dollies in per unit of sensitivity
    pub dolly_gain: f32,

    /// Vertical offset of the mesh in view space
    pub lift: f32,

    /// Axis the mesh spins about (normalized before use)
    pub rotation_axis: [f32; 3],
}

impl Default for CameraParams {
    fn default() -> Self {
        Self {
            frustum_half_width: 0.9,
            near_plane: 4.0,
            far_plane: 30.0,
            base_distance: 10.0,
            dolly_gain: 1.0,
            lift: 1.0,
            rotation_axis: [1.0, 1.0, -0.3],
        }
    }
}

impl CameraParams {
    pub fn validate(&self) -> Result<(), ConfigError> {
        ensure_positive("frustum_half_width", self.frustum_half_width as f64)?;
        ensure_positive("near_plane", self.near_plane as f64)?;
        ensure_positive("base_distance", self.base_distance as f64)?;
        if self.near_plane >= self.far_plane {
            return Err(ConfigError::ClipPlanes {
                near: self.near_plane,
                far: self.far_plane,
            });
        }
        let axis_len_sq: f32 = self.rotation_axis.iter().map(|c| c * c).sum();
        ensure_positive("rotation_axis length", axis_len_sq as f64)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_inverted_clip_planes() {
        let params = CameraParams {
            near_plane: 40.0,
            ..Default::default()
        };
        assert!(matches!(
            params.validate(),
            Err(ConfigError::ClipPlanes { .. })
        ));
    }

    #[test]
    fn test_rejects_zero_axis() {
        let params = CameraParams {
            rotation_axis: [0.0; 3],
            ..Default::default()
        };
        assert!(params.validate().is_err());
    }
}
