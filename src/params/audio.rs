//! Spectrum analysis configuration.

use super::{ensure_positive, ConfigError};

/// Smallest accepted FFT order (64-sample window)
pub const MIN_FFT_ORDER: u32 = 6;

/// Largest accepted FFT order (32768-sample window)
pub const MAX_FFT_ORDER: u32 = 15;

/// FFT analysis configuration and level mapping
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    /// Window size exponent: one analysis window holds `2^fft_order` samples
    pub fft_order: u32,

    /// Number of low bins scanned for the peak magnitude (clamped to N/2)
    pub level_bins: usize,

    /// Magnitude mapped to sensitivity 0.0 (also the log floor for silence)
    pub level_floor: f32,

    /// Magnitude mapped to sensitivity 1.0
    pub level_ceiling: f32,

    /// Analysis worker period (milliseconds)
    /// 16 ms ≈ 60 Hz, matching the display rate
    pub analysis_interval_ms: u64,

    /// Apply a Hann window before the transform (off: plain rectangular window)
    pub apply_hann_window: bool,

    /// Number of perceptually spaced bar levels derived per window
    pub bar_count: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            fft_order: 10,
            level_bins: 256,
            level_floor: 1e-5,
            level_ceiling: 1e2,
            analysis_interval_ms: 16,
            apply_hann_window: false,
            bar_count: 16,
        }
    }
}

impl AnalysisConfig {
    /// Samples per analysis window (always a power of two once validated)
    pub fn fft_size(&self) -> usize {
        1 << self.fft_order
    }

    /// Bins scanned for min/max magnitude, never past the Nyquist bin
    pub fn scan_bins(&self) -> usize {
        self.level_bins.clamp(1, self.fft_size() / 2)
    }

    /// Validate configuration (window size in range, level range ordered, etc.)
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(MIN_FFT_ORDER..=MAX_FFT_ORDER).contains(&self.fft_order) {
            return Err(ConfigError::FftOrder {
                got: self.fft_order,
                min: MIN_FFT_ORDER,
                max: MAX_FFT_ORDER,
            });
        }
        let ordered = self.level_floor > 0.0 && self.level_floor < self.level_ceiling;
        if !ordered || !self.level_ceiling.is_finite() {
            return Err(ConfigError::LevelRange {
                floor: self.level_floor,
                ceiling: self.level_ceiling,
            });
        }
        ensure_positive("analysis_interval_ms", self.analysis_interval_ms as f64)?;
        ensure_positive("bar_count", self.bar_count as f64)?;
        Ok(())
    }
}
