//! Command-line argument parsing.

use clap::Parser;
use std::path::PathBuf;

use crate::params::{AnalysisConfig, AnimationParams};
use crate::shader::find_preset;
use crate::watch::ShaderFiles;

/// Command line arguments
#[derive(Parser, Debug)]
#[command(name = "vibecrate")]
#[command(about = "Audio-reactive 3D crate with hot-swappable WGSL shaders", long_about = None)]
pub struct Args {
    /// Shader preset to start with (name or 1-based number)
    #[arg(long, value_name = "PRESET", default_value = "1")]
    pub preset: String,

    /// Print the shader presets and exit
    #[arg(long)]
    pub list_presets: bool,

    /// Print the audio input devices and exit
    #[arg(long)]
    pub list_devices: bool,

    /// Audio input device name (default input device otherwise)
    #[arg(long, value_name = "NAME")]
    pub device: Option<String>,

    /// Spin speed (radians per second)
    #[arg(long, value_name = "RAD_PER_S")]
    pub rotation_speed: Option<f32>,

    /// FFT window size exponent (window = 2^ORDER samples)
    #[arg(long, value_name = "ORDER")]
    pub fft_order: Option<u32>,

    /// Apply a Hann window before the FFT
    #[arg(long)]
    pub hann: bool,

    /// Texture image (a checkerboard is used otherwise)
    #[arg(long, value_name = "PATH")]
    pub texture: Option<PathBuf>,

    /// Custom WGSL vertex shader (requires --fragment-shader)
    #[arg(long, value_name = "PATH", requires = "fragment_shader")]
    pub vertex_shader: Option<PathBuf>,

    /// Custom WGSL fragment shader (requires --vertex-shader)
    #[arg(long, value_name = "PATH", requires = "vertex_shader")]
    pub fragment_shader: Option<PathBuf>,

    /// Reload the custom shaders whenever they change
    #[arg(long, requires = "vertex_shader")]
    pub watch: bool,
}

impl Args {
    /// Index of the starting preset, falling back to the first
    pub fn preset_index(&self) -> usize {
        match find_preset(&self.preset) {
            Some((index, _)) => index,
            None => {
                log::warn!("Unknown preset '{}', using the first", self.preset);
                0
            }
        }
    }

    /// Analysis config with command-line overrides applied
    pub fn analysis_config(&self) -> AnalysisConfig {
        let mut config = AnalysisConfig::default();
        if let Some(order) = self.fft_order {
            config.fft_order = order;
        }
        config.apply_hann_window = self.hann;
        config
    }

    pub fn animation_params(&self) -> AnimationParams {
        let mut params = AnimationParams::default();
        if let Some(speed) = self.rotation_speed {
            params.rotation_speed_rad_per_s = speed;
        }
        params
    }

    pub fn shader_files(&self) -> Option<ShaderFiles> {
        match (&self.vertex_shader, &self.fragment_shader) {
            (Some(vertex), Some(fragment)) => Some(ShaderFiles::new(vertex, fragment)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::parse_from(["vibecrate"]);
        assert_eq!(args.preset_index(), 0);
        assert!(!args.analysis_config().apply_hann_window);
        assert_eq!(args.analysis_config().fft_order, AnalysisConfig::default().fft_order);
        assert!(args.shader_files().is_none());
    }

    #[test]
    fn test_overrides() {
        let args = Args::parse_from([
            "vibecrate",
            "--preset",
            "toon shader",
            "--fft-order",
            "11",
            "--hann",
            "--rotation-speed",
            "1.5",
        ]);
        assert_eq!(args.preset_index(), 7);
        assert_eq!(args.analysis_config().fft_size(), 2048);
        assert!(args.analysis_config().apply_hann_window);
        assert_eq!(args.animation_params().rotation_speed_rad_per_s, 1.5);
    }

    #[test]
    fn test_unknown_preset_falls_back() {
        let args = Args::parse_from(["vibecrate", "--preset", "nope"]);
        assert_eq!(args.preset_index(), 0);
    }

    #[test]
    fn test_shader_files_come_in_pairs() {
        assert!(Args::try_parse_from(["vibecrate", "--vertex-shader", "a.wgsl"]).is_err());

        let args = Args::try_parse_from([
            "vibecrate",
            "--vertex-shader",
            "a.wgsl",
            "--fragment-shader",
            "b.wgsl",
            "--watch",
        ])
        .unwrap();
        let files = args.shader_files().unwrap();
        assert_eq!(files.vertex, PathBuf::from("a.wgsl"));
        assert!(args.watch);
    }
}
