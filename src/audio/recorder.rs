//! Recording controller: owns one capture session at a time, buffers raw
//! audio and stops on the VAD's end-of-utterance signal (or cancellation).

use std::future::Future;
use std::io::Cursor;
use std::pin::Pin;
use std::time::{Duration, Instant};

use ringbuf::traits::{Consumer, Split};
use ringbuf::HeapRb;
use thiserror::Error;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::capture::MicStream;
use super::vad::{VadSignal, VoiceActivityDetector};

/// Hard cap on a single capture session. The VAD never stops on
/// pre-voice silence, so pause/destroy are the normal outs; this bounds
/// a session where the user walks away.
const MAX_CAPTURE: Duration = Duration::from_secs(120);

const POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Debug, Error)]
pub enum RecordError {
    #[error("microphone permission refused or device absent")]
    PermissionDenied,
    #[error("no usable audio input configuration")]
    Unsupported,
    #[error("recording setup failed: {0}")]
    Setup(String),
    #[error("capture cancelled")]
    Cancelled,
}

/// Raw captured audio handed to transcription.
#[derive(Debug, Clone)]
pub struct Utterance {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

pub type CaptureFuture = Pin<Box<dyn Future<Output = Result<Utterance, RecordError>> + Send>>;

/// Seam between the engine and the capture hardware. The engine only ever
/// holds one in-flight capture; cancelling the token tears it down.
pub trait Recorder: Send + Sync {
    fn capture(&self, cancel: CancellationToken) -> CaptureFuture;
}

/// Real microphone recorder: cpal stream on a dedicated thread polling a
/// ring buffer every 50ms and feeding the VAD.
#[derive(Default)]
pub struct MicRecorder;

impl Recorder for MicRecorder {
    fn capture(&self, cancel: CancellationToken) -> CaptureFuture {
        Box::pin(async move {
            let (done_tx, done_rx) = oneshot::channel();
            std::thread::spawn(move || {
                let result = run_capture(cancel);
                let _ = done_tx.send(result);
            });
            done_rx
                .await
                .map_err(|_| RecordError::Setup("capture thread exited".to_string()))?
        })
    }
}

fn run_capture(cancel: CancellationToken) -> Result<Utterance, RecordError> {
    let rb = HeapRb::<f32>::new(16_384);
    let (producer, mut consumer) = rb.split();

    let stream = MicStream::open(producer)?;
    let sample_rate = stream.sample_rate;

    let mut vad = VoiceActivityDetector::new(sample_rate);
    let mut buffered: Vec<f32> = Vec::new();
    let mut chunk = vec![0.0f32; sample_rate as usize / 20];
    let started = Instant::now();

    info!("capture session started at {}Hz", sample_rate);

    loop {
        if cancel.is_cancelled() {
            info!("capture cancelled");
            return Err(RecordError::Cancelled);
        }
        if started.elapsed() >= MAX_CAPTURE {
            warn!("capture hit hard cap, returning buffered audio");
            break;
        }

        std::thread::sleep(POLL_INTERVAL);

        let n = consumer.pop_slice(&mut chunk);
        if n == 0 {
            continue;
        }
        let samples = &chunk[..n];
        buffered.extend_from_slice(samples);

        match vad.process(samples) {
            Some(VadSignal::VoiceStart) => info!("voice detected"),
            Some(VadSignal::UtteranceEnd) => {
                info!(
                    samples = buffered.len(),
                    "utterance complete, stopping capture"
                );
                break;
            }
            _ => {}
        }
    }

    Ok(Utterance {
        samples: buffered,
        sample_rate,
    })
}

/// Package an utterance as an in-memory 16-bit mono WAV for the STT request.
pub fn encode_wav(utterance: &Utterance) -> Result<Vec<u8>, hound::Error> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: utterance.sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)?;
        for &sample in &utterance.samples {
            writer.write_sample((sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)?;
        }
        writer.finalize()?;
    }
    Ok(cursor.into_inner())
}
