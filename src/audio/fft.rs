//! Spectrum analysis: magnitude-only FFT, log-mapped sensitivity and
//! perceptually spaced bar levels.

use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::f32::consts::PI;
use std::sync::Arc;

use crate::params::{AnalysisConfig, ConfigError};

/// Exponent of the skew curve used for bar spacing (smaller = more low bins)
const SKEW_EXPONENT: f32 = 0.2;

/// Magnitude spectrum of one analysis window.
///
/// Holds `N` magnitudes; only the first `N/2 + 1` bins carry information,
/// the rest mirror them.
#[derive(Debug, Clone)]
pub struct SpectrumFrame {
    magnitudes: Vec<f32>,
    scan_bins: usize,
    min: f32,
    max: f32,
}

impl SpectrumFrame {
    fn new(size: usize, scan_bins: usize) -> Self {
        Self {
            magnitudes: vec![0.0; size],
            scan_bins,
            min: 0.0,
            max: 0.0,
        }
    }

    /// All `N` magnitudes
    pub fn magnitudes(&self) -> &[f32] {
        &self.magnitudes
    }

    /// Bins `0..=N/2`
    pub fn meaningful_bins(&self) -> &[f32] {
        &self.magnitudes[..self.magnitudes.len() / 2 + 1]
    }

    /// Smallest magnitude among the scanned low bins
    pub fn min(&self) -> f32 {
        self.min
    }

    /// Largest magnitude among the scanned low bins
    pub fn max(&self) -> f32 {
        self.max
    }

    /// Index of the Nyquist bin (`N/2`)
    pub fn nyquist_bin(&self) -> usize {
        self.magnitudes.len() / 2
    }

    fn update_range(&mut self) {
        let scanned = &self.magnitudes[..self.scan_bins];
        let (min, max) = scanned
            .iter()
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &m| {
                (lo.min(m), hi.max(m))
            });
        self.min = min;
        self.max = max;
    }
}

/// Forward FFT over one window plus the level mappings built on it.
///
/// Scratch buffers are allocated once; `analyze` itself does not allocate.
/// One instance must only be driven from a single thread at a time.
pub struct SpectrumAnalyzer {
    fft: Arc<dyn Fft<f32>>,
    buffer: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
    window_coefficients: Option<Vec<f32>>,
    frame: SpectrumFrame,
    level_floor: f32,
    level_ceiling: f32,
}

impl SpectrumAnalyzer {
    /// Create an analyzer for the configured window size
    pub fn new(config: &AnalysisConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let size = config.fft_size();
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(size);
        let scratch = vec![Complex::new(0.0, 0.0); fft.get_inplace_scratch_len()];

        let window_coefficients = config
            .apply_hann_window
            .then(|| (0..size).map(|i| hann_window(i, size)).collect());

        Ok(Self {
            fft,
            buffer: vec![Complex::new(0.0, 0.0); size],
            scratch,
            window_coefficients,
            frame: SpectrumFrame::new(size, config.scan_bins()),
            level_floor: config.level_floor,
            level_ceiling: config.level_ceiling,
        })
    }

    pub fn window_size(&self) -> usize {
        self.buffer.len()
    }

    /// Transform `window` and return its sensitivity scalar in `[0, 1]`.
    ///
    /// The spectrum stays available through [`Self::frame`] until the next call.
    pub fn analyze(&mut self, window: &[f32]) -> f32 {
        self.transform(window);
        self.sensitivity()
    }

    /// Magnitude-only forward transform of `window`.
    ///
    /// Shorter input is zero-padded, longer input is truncated to `N`.
    pub fn transform(&mut self, window: &[f32]) -> &SpectrumFrame {
        for (i, slot) in self.buffer.iter_mut().enumerate() {
            let sample = window.get(i).copied().unwrap_or(0.0);
            let weight = self.window_coefficients.as_ref().map_or(1.0, |w| w[i]);
            *slot = Complex::new(sample * weight, 0.0);
        }

        self.fft
            .process_with_scratch(&mut self.buffer, &mut self.scratch);

        for (magnitude, bin) in self.frame.magnitudes.iter_mut().zip(&self.buffer) {
            *magnitude = bin.norm();
        }
        self.frame.update_range();

        &self.frame
    }

    /// Spectrum produced by the last transform
    pub fn frame(&self) -> &SpectrumFrame {
        &self.frame
    }

    /// Log-mapped peak of the last transform
    pub fn sensitivity(&self) -> f32 {
        log_level(self.frame.max, self.level_floor, self.level_ceiling)
    }
}

/// Map a magnitude onto `[0, 1]` on a log10 scale between `floor` and `ceiling`.
///
/// Magnitudes at or below the floor (silence, NaN) map to exactly 0.0.
pub fn log_level(magnitude: f32, floor: f32, ceiling: f32) -> f32 {
    let clamped = magnitude.max(floor);
    let span = ceiling.log10() - floor.log10();
    ((clamped.log10() - floor.log10()) / span).clamp(0.0, 1.0)
}

/// Spectrum bin shown at row `y` of `total_rows` on a skewed frequency axis.
///
/// Proportion `1 - exp(ln(y / total_rows) * 0.2)` of the Nyquist range, so
/// low rows spread over the upper spectrum and high rows zoom into the bass.
pub fn skewed_bin(y: usize, total_rows: usize, nyquist_bin: usize) -> usize {
    if total_rows == 0 {
        return 0;
    }
    let proportion = y as f32 / total_rows as f32;
    let skewed = 1.0 - (proportion.ln() * SKEW_EXPONENT).exp();
    let index = (skewed * nyquist_bin as f32) as isize;
    index.clamp(0, nyquist_bin as isize) as usize
}

/// Level of row `y` normalized against the frame's scanned peak, in `[0, 1]`
pub fn skewed_level(y: usize, total_rows: usize, frame: &SpectrumFrame) -> f32 {
    let bin = skewed_bin(y, total_rows, frame.nyquist_bin());
    let reference = frame.max().max(1e-5);
    (frame.magnitudes()[bin] / reference).clamp(0.0, 1.0)
}

/// Fill `bars` with skewed levels, lowest frequency first
pub fn bar_levels(frame: &SpectrumFrame, bars: &mut [f32]) {
    let count = bars.len();
    let total_rows = count + 1;
    for (i, bar) in bars.iter_mut().enumerate() {
        *bar = skewed_level(count - i, total_rows, frame);
    }
}

/// Hann window function for FFT analysis
pub fn hann_window(index: usize, size: usize) -> f32 {
    0.5 * (1.0 - ((2.0 * PI * index as f32) / (size as f32 - 1.0)).cos())
}
