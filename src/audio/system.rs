//! Audio capture system: input stream feeding the FIFO plus the analysis worker.

use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{FromSample, Sample, SizedSample};
use std::sync::Arc;

use super::device::{find_input_device, DeviceEvent, DeviceListener};
use super::fifo::{PushOutcome, SpectrumFifo};
use super::shared::WindowSlot;
use super::worker::{AnalysisWorker, SpectrumLevels};
use super::AudioError;
use crate::params::AnalysisConfig;
use crate::task::PeriodicTask;

/// Audio system managing live capture and spectrum analysis
pub struct AudioSystem {
    /// Input stream (kept alive; dropped before the worker)
    _stream: cpal::Stream,

    /// Analysis worker thread
    analysis: PeriodicTask,

    levels: Arc<SpectrumLevels>,
    slot: Arc<WindowSlot>,
    device_name: String,
}

impl AudioSystem {
    /// Open the named (or default) input device and start analysing it
    pub fn start(
        config: &AnalysisConfig,
        device_name: Option<&str>,
        listener: Arc<dyn DeviceListener>,
    ) -> Result<Self, AudioError> {
        config.validate()?;

        let device = find_input_device(device_name)?;
        let name = device.name().unwrap_or_else(|_| "Unknown".to_string());
        let supported = device.default_input_config()?;
        let sample_rate = supported.sample_rate().0;
        let channels = supported.channels();
        if channels == 0 {
            return Err(AudioError::NoChannels(name));
        }

        let slot = Arc::new(WindowSlot::new(config.fft_size()));
        let levels = Arc::new(SpectrumLevels::new(config.bar_count));

        let worker = AnalysisWorker::new(config, Arc::clone(&slot), Arc::clone(&levels))?;
        let analysis = worker.spawn(config).map_err(AudioError::Worker)?;

        let stream_config = supported.config();
        let fifo = SpectrumFifo::new(config.fft_size());
        let capture_slot = Arc::clone(&slot);

        let stream = match supported.sample_format() {
            cpal::SampleFormat::F32 => {
                build_capture_stream::<f32>(&device, &stream_config, fifo, capture_slot, listener.clone())
            }
            cpal::SampleFormat::I16 => {
                build_capture_stream::<i16>(&device, &stream_config, fifo, capture_slot, listener.clone())
            }
            cpal::SampleFormat::U16 => {
                build_capture_stream::<u16>(&device, &stream_config, fifo, capture_slot, listener.clone())
            }
            cpal::SampleFormat::I32 => {
                build_capture_stream::<i32>(&device, &stream_config, fifo, capture_slot, listener.clone())
            }
            other => return Err(AudioError::UnsupportedFormat(other)),
        }?;

        stream.play()?;

        listener.on_device_changed(&DeviceEvent::Opened {
            name: name.clone(),
            sample_rate,
            channels,
        });

        Ok(Self {
            _stream: stream,
            analysis,
            levels,
            slot,
            device_name: name,
        })
    }

    /// Levels published by the analysis worker
    pub fn levels(&self) -> Arc<SpectrumLevels> {
        Arc::clone(&self.levels)
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    /// Windows dropped because the worker had not consumed the previous one
    pub fn dropped_windows(&self) -> u64 {
        self.slot.dropped_windows()
    }

    /// False once the analysis thread has exited
    pub fn is_analysing(&self) -> bool {
        self.analysis.is_running()
    }
}

/// Build an input stream that pushes channel 0 into the FIFO.
///
/// The data callback never allocates, never blocks and never logs.
fn build_capture_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    mut fifo: SpectrumFifo,
    slot: Arc<WindowSlot>,
    listener: Arc<dyn DeviceListener>,
) -> Result<cpal::Stream, AudioError>
where
    T: SizedSample,
    f32: FromSample<T>,
{
    let channels = config.channels as usize;

    let stream = device.build_input_stream(
        config,
        move |data: &[T], _: &cpal::InputCallbackInfo| {
            for frame in data.chunks(channels) {
                if fifo.push(frame[0].to_sample::<f32>()) == PushOutcome::WindowReady {
                    slot.offer(fifo.completed_window());
                }
            }
        },
        move |err| {
            let event = match err {
                cpal::StreamError::DeviceNotAvailable => DeviceEvent::Lost,
                cpal::StreamError::BackendSpecific { err } => DeviceEvent::Error(err.description),
            };
            listener.on_device_changed(&event);
        },
        None,
    )?;

    Ok(stream)
}
