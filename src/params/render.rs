//! Rendering configuration.

use super::{ensure_positive, ConfigError};

/// Rendering configuration
#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Initial window width (pixels)
    pub window_width: u32,

    /// Initial window height (pixels)
    pub window_height: u32,

    /// Background colour (linear RGBA)
    pub clear_colour: [f64; 4],

    /// Light position handed to shaders (homogeneous, w = 0 for a direction)
    pub light_position: [f32; 4],

    /// Wait for vertical blank (Fifo) instead of presenting immediately
    pub vsync: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            window_width: 500,
            window_height: 500,
            clear_colour: [0.3, 0.3, 0.3, 1.0],
            light_position: [-15.0, 10.0, 15.0, 0.0],
            vsync: true,
        }
    }
}

impl RenderConfig {
    pub fn aspect_ratio(&self) -> f32 {
        self.window_width as f32 / self.window_height as f32
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        ensure_positive("window_width", self.window_width as f64)?;
        ensure_positive("window_height", self.window_height as f64)?;
        Ok(())
    }
}
