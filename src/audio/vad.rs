//! Calibrated energy VAD for end-of-utterance detection.
//!
//! Fed raw sample chunks; internal time advances from sample counts so the
//! detector is exactly reproducible on synthetic traces. One instance per
//! recording session. Silence only ends the utterance AFTER voice has been
//! heard at least once, so a hesitating speaker is never cut off before
//! they start.

use tracing::{debug, info};

const CALIBRATION_MS: u64 = 500;
const SILENCE_AFTER_VOICE_MS: u64 = 2000;
const ADAPTIVE_MULTIPLIER: f32 = 1.5;
const MIN_THRESHOLD: f32 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VadSignal {
    /// Noise floor established; voice/silence decisions begin.
    Calibrated,
    /// Energy first crossed the threshold this session.
    VoiceStart,
    /// Sustained silence after voice; the utterance is over.
    UtteranceEnd,
}

pub struct VoiceActivityDetector {
    sample_rate: u32,
    elapsed_ms: u64,
    calibration_rms: Vec<f32>,
    noise_floor: f32,
    calibrated: bool,
    voice_started: bool,
    silence_ms: u64,
    ended: bool,
}

impl VoiceActivityDetector {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            elapsed_ms: 0,
            calibration_rms: Vec::new(),
            noise_floor: 0.0,
            calibrated: false,
            voice_started: false,
            silence_ms: 0,
            ended: false,
        }
    }

    pub fn noise_floor(&self) -> f32 {
        self.noise_floor
    }

    pub fn threshold(&self) -> f32 {
        (self.noise_floor * ADAPTIVE_MULTIPLIER).max(MIN_THRESHOLD)
    }

    pub fn voice_started(&self) -> bool {
        self.voice_started
    }

    /// Process one chunk of samples. Returns a signal only on a state
    /// transition; `UtteranceEnd` fires at most once per session.
    pub fn process(&mut self, samples: &[f32]) -> Option<VadSignal> {
        if samples.is_empty() || self.ended {
            return None;
        }

        let sq_sum: f32 = samples.iter().map(|&x| x * x).sum();
        let rms = (sq_sum / samples.len() as f32).sqrt();

        let chunk_ms = (samples.len() as u64 * 1000) / self.sample_rate as u64;
        self.elapsed_ms += chunk_ms;

        if !self.calibrated {
            if self.elapsed_ms < CALIBRATION_MS {
                self.calibration_rms.push(rms);
                return None;
            }
            // Mean of calibration window, floored to avoid near-zero floors
            // on very quiet rooms.
            let mean = if self.calibration_rms.is_empty() {
                MIN_THRESHOLD
            } else {
                self.calibration_rms.iter().sum::<f32>() / self.calibration_rms.len() as f32
            };
            self.noise_floor = mean.max(MIN_THRESHOLD);
            self.calibrated = true;
            info!(
                noise_floor = self.noise_floor,
                threshold = self.threshold(),
                samples = self.calibration_rms.len(),
                "VAD calibrated"
            );
            return Some(VadSignal::Calibrated);
        }

        if rms > self.threshold() {
            self.silence_ms = 0;
            if !self.voice_started {
                self.voice_started = true;
                debug!(rms, "voice onset");
                return Some(VadSignal::VoiceStart);
            }
        } else if self.voice_started {
            self.silence_ms += chunk_ms;
            if self.silence_ms >= SILENCE_AFTER_VOICE_MS {
                self.ended = true;
                info!(silence_ms = self.silence_ms, "sustained silence after voice");
                return Some(VadSignal::UtteranceEnd);
            }
        }
        // Silence before any voice never ends the utterance.

        None
    }
}
