//! Live audio capture and spectrum analysis.
//!
//! The input callback pushes channel 0 into a [`SpectrumFifo`]; each completed
//! window is handed to the analysis worker through a double-buffered
//! [`shared::WindowSlot`], and the worker publishes a sensitivity scalar and bar
//! levels for the render thread.

pub mod device;
pub mod fft;
pub mod fifo;
pub mod shared;
mod system;
pub mod worker;

use thiserror::Error;

use crate::params::ConfigError;

// Re-export public types
pub use device::{DeviceEvent, DeviceListener};
pub use fft::{SpectrumAnalyzer, SpectrumFrame};
pub use fifo::{PushOutcome, SpectrumFifo};
pub use system::AudioSystem;
pub use worker::SpectrumLevels;

/// Audio capture setup failure
#[derive(Debug, Error)]
pub enum AudioError {
    #[error("no audio input device found")]
    NoInputDevice,

    #[error("audio input device '{0}' not found")]
    DeviceNotFound(String),

    #[error("audio input device '{0}' reports no channels")]
    NoChannels(String),

    #[error("unsupported sample format {0:?}")]
    UnsupportedFormat(cpal::SampleFormat),

    #[error("invalid analysis config: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to enumerate devices: {0}")]
    Devices(#[from] cpal::DevicesError),

    #[error("failed to get input config: {0}")]
    StreamConfig(#[from] cpal::DefaultStreamConfigError),

    #[error("failed to build input stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[error("failed to start input stream: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),

    #[error("failed to spawn analysis worker: {0}")]
    Worker(std::io::Error),
}
