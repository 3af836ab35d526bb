//! Parameter definitions with physical units and documented semantics.
//!
//! All tunable numbers live here with:
//! - Units (seconds, radians, world units, etc.)
//! - Documented ranges and meanings
//! - A `validate()` that rejects values the real-time paths cannot handle

mod animation;
mod audio;
mod camera;
mod render;

// Re-export all types
pub use animation::AnimationParams;
pub use audio::{AnalysisConfig, MAX_FFT_ORDER, MIN_FFT_ORDER};
pub use camera::CameraParams;
pub use render::RenderConfig;

use thiserror::Error;

/// Rejected parameter value
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("FFT order must be in {min}..={max}, got {got}")]
    FftOrder { got: u32, min: u32, max: u32 },

    #[error("level range must satisfy 0 < floor < ceiling, got floor={floor} ceiling={ceiling}")]
    LevelRange { floor: f32, ceiling: f32 },

    #[error("{name} must be > 0, got {value}")]
    NotPositive { name: &'static str, value: f64 },

    #[error("{name} must be finite, got {value}")]
    NotFinite { name: &'static str, value: f64 },

    #[error("near plane ({near}) must be closer than far plane ({far})")]
    ClipPlanes { near: f32, far: f32 },

    #[error("bounce speed range must satisfy 0 < min <= max, got {min}..{max}")]
    BounceSpeed { min: f64, max: f64 },
}

pub(crate) fn ensure_positive(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if !value.is_finite() {
        return Err(ConfigError::NotFinite { name, value });
    }
    if value <= 0.0 {
        return Err(ConfigError::NotPositive { name, value });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        AnalysisConfig::default().validate().unwrap();
        AnimationParams::default().validate().unwrap();
        CameraParams::default().validate().unwrap();
        RenderConfig::default().validate().unwrap();
    }

    #[test]
    fn test_ensure_positive() {
        assert!(ensure_positive("x", 1.0).is_ok());
        assert_eq!(
            ensure_positive("x", 0.0),
            Err(ConfigError::NotPositive {
                name: "x",
                value: 0.0
            })
        );
        assert!(matches!(
            ensure_positive("x", f64::NAN),
            Err(ConfigError::NotFinite { .. })
        ));
    }
}
