//! Microphone input stream feeding a lock-free ring buffer. The cpal
//! stream is not Send, so the owning `MicStream` must be created and
//! dropped on the capture thread.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use ringbuf::traits::Producer;
use tracing::{error, info};

use super::recorder::RecordError;

pub struct MicStream {
    _stream: cpal::Stream,
    pub sample_rate: u32,
}

impl MicStream {
    pub fn open<P>(mut producer: P) -> Result<Self, RecordError>
    where
        P: Producer<Item = f32> + Send + 'static,
    {
        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or(RecordError::PermissionDenied)?;

        info!("audio input device: {}", device.name().unwrap_or_default());

        // Prefer 16kHz; fall back to the device default rate.
        let mut selected = None;
        if let Ok(configs) = device.supported_input_configs() {
            for range in configs {
                if range.min_sample_rate().0 <= 16_000 && range.max_sample_rate().0 >= 16_000 {
                    selected = Some(range.with_sample_rate(cpal::SampleRate(16_000)));
                    break;
                }
            }
        }
        let config = match selected {
            Some(c) => c,
            None => device
                .default_input_config()
                .map_err(|_| RecordError::Unsupported)?,
        };
        let sample_rate = config.sample_rate().0;
        info!(
            "capture config: rate={}Hz channels={}",
            sample_rate,
            config.channels()
        );

        let err_fn = |err| error!("capture stream error: {}", err);

        let stream = match config.sample_format() {
            cpal::SampleFormat::F32 => device
                .build_input_stream(
                    &config.into(),
                    move |data: &[f32], _: &_| {
                        // Ring buffer full means we drop samples (lossy).
                        producer.push_slice(data);
                    },
                    err_fn,
                    None,
                )
                .map_err(map_build_error)?,
            cpal::SampleFormat::I16 => device
                .build_input_stream(
                    &config.into(),
                    move |data: &[i16], _: &_| {
                        for &sample in data {
                            let _ = producer.try_push(sample as f32 / i16::MAX as f32);
                        }
                    },
                    err_fn,
                    None,
                )
                .map_err(map_build_error)?,
            other => {
                error!("unsupported sample format: {:?}", other);
                return Err(RecordError::Unsupported);
            }
        };

        stream
            .play()
            .map_err(|e| RecordError::Setup(e.to_string()))?;

        Ok(Self {
            _stream: stream,
            sample_rate,
        })
    }
}

fn map_build_error(err: cpal::BuildStreamError) -> RecordError {
    match err {
        cpal::BuildStreamError::DeviceNotAvailable => RecordError::PermissionDenied,
        cpal::BuildStreamError::StreamConfigNotSupported => RecordError::Unsupported,
        other => RecordError::Setup(other.to_string()),
    }
}
