//! Input device discovery and device-change notification.

use cpal::traits::{DeviceTrait, HostTrait};

use super::AudioError;

/// Change in the state of the capture device
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceEvent {
    /// Capture started on a device
    Opened {
        name: String,
        sample_rate: u32,
        channels: u16,
    },
    /// The device disappeared (unplugged, reconfigured by the OS, ...)
    Lost,
    /// Backend-specific stream error
    Error(String),
}

/// Observer notified when the capture device changes state.
///
/// Passed to [`super::AudioSystem::start`]; called from the audio backend's
/// threads, so implementations must be cheap and thread-safe.
pub trait DeviceListener: Send + Sync {
    fn on_device_changed(&self, event: &DeviceEvent);
}

/// Log a device event at a level matching its severity
pub fn log_device_event(event: &DeviceEvent) {
    match event {
        DeviceEvent::Opened {
            name,
            sample_rate,
            channels,
        } => log::info!("Audio input: {} @ {}Hz, {} ch", name, sample_rate, channels),
        DeviceEvent::Lost => log::warn!("Audio input device lost"),
        DeviceEvent::Error(message) => log::warn!("Audio input error: {}", message),
    }
}

/// Names of all input devices on the default host
pub fn input_device_names() -> Result<Vec<String>, AudioError> {
    let host = cpal::default_host();
    let names = host
        .input_devices()?
        .map(|device| device.name().unwrap_or_else(|_| "Unknown".to_string()))
        .collect();
    Ok(names)
}

/// Find an input device by exact name, or the default input device
pub fn find_input_device(name: Option<&str>) -> Result<cpal::Device, AudioError> {
    let host = cpal::default_host();

    let Some(wanted) = name else {
        return host.default_input_device().ok_or(AudioError::NoInputDevice);
    };

    host.input_devices()?
        .find(|device| device.name().map(|n| n == wanted).unwrap_or(false))
        .ok_or_else(|| AudioError::DeviceNotFound(wanted.to_string()))
}
