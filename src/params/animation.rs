//! Time-driven animation parameters.

use super::ConfigError;

/// Rotation and bounce oscillator parameters
#[derive(Debug, Clone)]
pub struct AnimationParams {
    /// Mesh spin rate (radians per second)
    pub rotation_speed_rad_per_s: f32,

    /// Range the bounce speed is drawn from (triangle-wave units per millisecond)
    pub bounce_speed_range: (f64, f64),
}

impl Default for AnimationParams {
    fn default() -> Self {
        Self {
            rotation_speed_rad_per_s: 0.6,
            bounce_speed_range: (0.0004, 0.0011),
        }
    }
}

impl AnimationParams {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.rotation_speed_rad_per_s.is_finite() {
            return Err(ConfigError::NotFinite {
                name: "rotation_speed_rad_per_s",
                value: self.rotation_speed_rad_per_s as f64,
            });
        }
        let (min, max) = self.bounce_speed_range;
        if !(min > 0.0 && min <= max && max.is_finite()) {
            return Err(ConfigError::BounceSpeed { min, max });
        }
        Ok(())
    }
}
