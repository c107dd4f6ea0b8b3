//! Core turn-taking state machine. Owns all session state on one task:
//! commands and async completions are drained from channels, so there is
//! no parallel mutation of the phase or the cue cursor. Destruction is a
//! root cancellation token checked before every event.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::audio::recorder::{encode_wav, RecordError, Recorder, Utterance};
use crate::media::path::{resolve_paths, MediaSettings};
use crate::media::playback::{PlaybackController, PlaybackOutcome};
use crate::script::{opponent_line_number, Cue, Script};
use crate::services::adlib::LineGenerator;
use crate::services::stt::{SttError, Transcriber};
use crate::similarity::{meets_main_threshold, meets_variation_threshold, similarity};

use super::events::{Command, EngineEvent};
use super::{
    ConfirmPolicy, EngineConfig, EngineObserver, ErrorKind, Phase, SessionResults,
    SimilarityVerdict, SubtitleKind,
};

/// Cushion between a finished turn and the next cue.
const WAITING_CUSHION: Duration = Duration::from_millis(200);
/// Display time for a stage-direction-only user cue.
const SKIP_TURN_DELAY: Duration = Duration::from_millis(2000);

pub(crate) struct EngineCore {
    script: Script,
    user_role: String,
    adlib_mode: bool,
    confirm_policy: ConfirmPolicy,
    settings: MediaSettings,
    language: String,

    phase: Phase,
    index: usize,
    paused: bool,
    /// In-flight transcription requests. `Done` must not fire while this
    /// is non-empty.
    pending: HashSet<Uuid>,
    finish_when_drained: bool,
    /// Frozen media position from a pause mid-`AiPlaying`.
    resume_position: Option<Duration>,
    playback_pause: Option<CancellationToken>,
    capture_cancel: Option<CancellationToken>,

    observer: Arc<dyn EngineObserver>,
    recorder: Arc<dyn Recorder>,
    transcriber: Arc<dyn Transcriber>,
    adlib: Option<Arc<dyn LineGenerator>>,
    playback: PlaybackController,

    shared_index: Arc<AtomicUsize>,
    results: Arc<Mutex<SessionResults>>,
    cancel: CancellationToken,
    cmd_rx: mpsc::Receiver<Command>,
    event_tx: mpsc::Sender<EngineEvent>,
    event_rx: mpsc::Receiver<EngineEvent>,
}

impl EngineCore {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        config: EngineConfig,
        observer: Arc<dyn EngineObserver>,
        recorder: Arc<dyn Recorder>,
        transcriber: Arc<dyn Transcriber>,
        adlib: Option<Arc<dyn LineGenerator>>,
        playback: PlaybackController,
        cancel: CancellationToken,
        cmd_rx: mpsc::Receiver<Command>,
        shared_index: Arc<AtomicUsize>,
        results: Arc<Mutex<SessionResults>>,
    ) -> Self {
        let (event_tx, event_rx) = mpsc::channel(64);
        Self {
            script: config.script,
            user_role: config.user_role,
            adlib_mode: config.adlib_mode,
            confirm_policy: config.confirm_policy,
            settings: config.settings,
            language: config.language,
            phase: Phase::Idle,
            index: 0,
            paused: false,
            pending: HashSet::new(),
            finish_when_drained: false,
            resume_position: None,
            playback_pause: None,
            capture_cancel: None,
            observer,
            recorder,
            transcriber,
            adlib,
            playback,
            shared_index,
            results,
            cancel,
            cmd_rx,
            event_tx,
            event_rx,
        }
    }

    pub(crate) async fn run(mut self) {
        info!(
            cues = self.script.len(),
            user_role = %self.user_role,
            "turn engine started"
        );

        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    info!("turn engine destroyed");
                    break;
                }
                cmd = self.cmd_rx.recv() => match cmd {
                    Some(cmd) => self.handle_command(cmd),
                    None => {
                        // Handle dropped: same as destroy.
                        self.cancel.cancel();
                        break;
                    }
                },
                Some(event) = self.event_rx.recv() => self.handle_event(event),
            }
        }
        // Child tokens (playback pause, capture) are cancelled with the
        // root; kill_on_drop reaps any player process.
    }

    fn handle_command(&mut self, command: Command) {
        debug!(?command, phase = ?self.phase, "engine command");
        match command {
            Command::Start => {
                self.paused = false;
                match self.phase {
                    Phase::Idle => {
                        self.set_phase(Phase::Entry);
                        self.process_current_cue();
                    }
                    Phase::Waiting => self.process_current_cue(),
                    _ => debug!(phase = ?self.phase, "start ignored"),
                }
            }
            Command::Pause => {
                self.paused = true;
                match self.phase {
                    Phase::UserRecording => {
                        // Tear down capture immediately; no transcription
                        // is dispatched for a paused turn.
                        if let Some(token) = self.capture_cancel.take() {
                            token.cancel();
                        }
                        self.set_phase(Phase::Waiting);
                    }
                    Phase::AiPlaying => {
                        // Freeze the media but stay in AiPlaying: a paused
                        // mid-turn is not a completed turn.
                        if let Some(token) = &self.playback_pause {
                            token.cancel();
                        }
                    }
                    Phase::Entry => self.set_phase(Phase::Idle),
                    _ => {}
                }
            }
            Command::Resume => {
                self.paused = false;
                match self.phase {
                    Phase::Waiting => self.process_current_cue(),
                    Phase::AiPlaying => {
                        if let Some(position) = self.resume_position.take() {
                            // Paths re-resolve with the latest settings.
                            self.start_playback(position);
                        } else if self.playback_pause.is_none() {
                            // Media finished while paused: the turn is done.
                            self.set_phase(Phase::Waiting);
                        }
                        // Pause not yet acknowledged: `paused` is clear, so
                        // the PlaybackPaused handler restarts playback.
                    }
                    Phase::WaitingForConfirmation => {
                        // The display timer that fired while paused was
                        // dropped; restart it.
                        if let ConfirmPolicy::AutoAdvance(display) = self.confirm_policy {
                            self.schedule(
                                display,
                                EngineEvent::ConfirmTimeout { index: self.index },
                            );
                        }
                    }
                    _ => debug!(phase = ?self.phase, "resume ignored"),
                }
            }
            Command::ManualNext => {
                if self.phase == Phase::Done {
                    return;
                }
                if let Some(token) = self.capture_cancel.take() {
                    token.cancel();
                }
                if let Some(token) = self.playback_pause.take() {
                    token.cancel();
                }
                self.next_cue();
            }
            Command::ConfirmAndAdvance => {
                if self.phase == Phase::WaitingForConfirmation {
                    self.next_cue();
                }
            }
            Command::UpdateSettings(settings) => {
                debug!(?settings, "playback settings updated");
                self.settings = settings;
            }
        }
    }

    fn handle_event(&mut self, event: EngineEvent) {
        match event {
            EngineEvent::PlaybackFinished { index } => {
                if index != self.index || self.phase != Phase::AiPlaying {
                    return;
                }
                self.playback_pause = None;
                self.resume_position = None;
                if !self.paused {
                    self.set_phase(Phase::Waiting);
                }
                // Paused: stay in AiPlaying; resume() treats it as complete.
            }
            EngineEvent::PlaybackPaused { index, position } => {
                if index != self.index || self.phase != Phase::AiPlaying {
                    return;
                }
                self.playback_pause = None;
                if self.paused {
                    self.resume_position = Some(position);
                } else {
                    // Resume arrived before this acknowledgment; pick the
                    // turn back up from where the media stopped.
                    self.start_playback(position);
                }
            }
            EngineEvent::RecordingFinished { index, utterance } => {
                if index != self.index || self.phase != Phase::UserRecording {
                    return;
                }
                self.capture_cancel = None;
                self.dispatch_transcription(index, utterance);
                // Advancement never waits on the transcription result.
                self.set_phase(Phase::WaitingForConfirmation);
                if let ConfirmPolicy::AutoAdvance(display) = self.confirm_policy {
                    self.schedule(display, EngineEvent::ConfirmTimeout { index });
                }
            }
            EngineEvent::RecordingFailed { index, error } => {
                if index != self.index || self.phase != Phase::UserRecording {
                    return;
                }
                self.capture_cancel = None;
                let kind = match &error {
                    RecordError::PermissionDenied => ErrorKind::MicPermissionDenied,
                    RecordError::Unsupported | RecordError::Setup(_) => ErrorKind::RecordingSetup,
                    RecordError::Cancelled => return,
                };
                self.observer.on_error(kind, Some(&error.to_string()));
                // Degraded turn: no capture, but the session moves on.
                self.set_phase(Phase::Waiting);
            }
            EngineEvent::TranscriptReady {
                request,
                index,
                text,
            } => {
                self.pending.remove(&request);
                self.score_transcript(index, &text);
                if !text.is_empty() {
                    self.observer
                        .on_subtitle(&text, SubtitleKind::UserFinal, Some(index));
                }
                if self.adlib_mode {
                    self.request_adlib(index, text);
                }
                self.finish_if_drained();
            }
            EngineEvent::TranscriptFailed {
                request,
                index,
                error,
            } => {
                self.pending.remove(&request);
                let kind = match error {
                    SttError::Unsupported => ErrorKind::SttUnsupported,
                    SttError::Failed(_) => ErrorKind::SttFailed,
                };
                self.observer.on_error(kind, Some(&error.to_string()));
                debug!(index, "transcription failed, turn already advanced");
                self.finish_if_drained();
            }
            EngineEvent::AdlibReady { lines } => {
                if self.phase == Phase::Done || lines.is_empty() {
                    return;
                }
                info!(count = lines.len(), "appending ad-lib cues to script");
                self.script.extend(lines);
            }
            EngineEvent::AdlibFailed { error } => {
                self.observer
                    .on_error(ErrorKind::AdlibFailed, Some(&error.to_string()));
            }
            EngineEvent::AdvanceFromWaiting { index } => {
                if self.phase == Phase::Waiting && index == self.index && !self.paused {
                    self.next_cue();
                }
            }
            EngineEvent::SkipTurnElapsed { index } => {
                if self.phase == Phase::UserRecording && index == self.index && !self.paused {
                    self.next_cue();
                }
            }
            EngineEvent::ConfirmTimeout { index } => {
                if self.phase == Phase::WaitingForConfirmation && index == self.index && !self.paused
                {
                    self.next_cue();
                }
            }
        }
    }

    fn set_phase(&mut self, phase: Phase) {
        if self.phase == Phase::Done {
            return;
        }
        debug!(from = ?self.phase, to = ?phase, "phase change");
        self.phase = phase;
        self.observer.on_phase_changed(phase);

        if phase == Phase::Waiting {
            self.schedule(
                WAITING_CUSHION,
                EngineEvent::AdvanceFromWaiting { index: self.index },
            );
        }
    }

    fn process_current_cue(&mut self) {
        let Some(cue) = self.script.get(self.index).cloned() else {
            // Nothing at the cursor (empty script): the session is over.
            debug!(index = self.index, "no cue at cursor, finishing");
            self.try_finish();
            return;
        };
        info!(index = self.index, role = %cue.role, "processing cue");

        if cue.role == self.user_role {
            // Exact role match only; anything else is an opponent turn.
            self.set_phase(Phase::UserRecording);
            self.observer
                .on_subtitle(&cue.text, SubtitleKind::Ai, Some(self.index));
            if cue.skip_recording {
                self.schedule(
                    SKIP_TURN_DELAY,
                    EngineEvent::SkipTurnElapsed { index: self.index },
                );
            } else {
                self.begin_recording();
            }
        } else {
            self.set_phase(Phase::AiPlaying);
            self.observer
                .on_subtitle(&cue.text, SubtitleKind::Ai, Some(self.index));
            self.start_playback(Duration::ZERO);
        }
    }

    fn start_playback(&mut self, from: Duration) {
        let line = opponent_line_number(&self.script, &self.user_role, self.index);
        let paths = resolve_paths(&self.settings, line);

        // Resolved playback target, recomputed per turn start and per
        // resume; the one sanctioned mutation of script data.
        let cue = match self.script.get_mut(self.index) {
            Some(cue) => {
                cue.video_url = Some(paths.video);
                cue.audio_url = if paths.audio.is_empty() {
                    None
                } else {
                    Some(paths.audio)
                };
                cue.clone()
            }
            None => return,
        };

        let pause = self.cancel.child_token();
        self.playback_pause = Some(pause.clone());
        self.resume_position = None;

        let playback = self.playback.clone();
        let tx = self.event_tx.clone();
        let index = self.index;
        tokio::spawn(async move {
            let event = match playback.play(&cue, from, &pause).await {
                PlaybackOutcome::Completed => EngineEvent::PlaybackFinished { index },
                PlaybackOutcome::Paused { position } => {
                    EngineEvent::PlaybackPaused { index, position }
                }
            };
            let _ = tx.send(event).await;
        });
    }

    fn begin_recording(&mut self) {
        let cancel = self.cancel.child_token();
        self.capture_cancel = Some(cancel.clone());

        let recorder = self.recorder.clone();
        let tx = self.event_tx.clone();
        let index = self.index;
        tokio::spawn(async move {
            match recorder.capture(cancel).await {
                Ok(utterance) => {
                    let _ = tx
                        .send(EngineEvent::RecordingFinished { index, utterance })
                        .await;
                }
                Err(RecordError::Cancelled) => {
                    debug!(index, "capture cancelled, no transcription");
                }
                Err(error) => {
                    let _ = tx.send(EngineEvent::RecordingFailed { index, error }).await;
                }
            }
        });
    }

    fn dispatch_transcription(&mut self, index: usize, utterance: Utterance) {
        let wav = match encode_wav(&utterance) {
            Ok(wav) => wav,
            Err(e) => {
                warn!("failed to encode capture: {}", e);
                self.observer
                    .on_error(ErrorKind::SttFailed, Some(&e.to_string()));
                return;
            }
        };

        let request = Uuid::new_v4();
        self.pending.insert(request);
        info!(%request, index, "transcription dispatched");

        let future = self.transcriber.transcribe(wav, &self.language);
        let tx = self.event_tx.clone();
        tokio::spawn(async move {
            let event = match future.await {
                Ok(text) => EngineEvent::TranscriptReady {
                    request,
                    index,
                    text,
                },
                Err(error) => EngineEvent::TranscriptFailed {
                    request,
                    index,
                    error,
                },
            };
            let _ = tx.send(event).await;
        });
    }

    fn score_transcript(&mut self, index: usize, text: &str) {
        let Some(cue) = self.script.get(index) else {
            return;
        };
        let score = similarity(text, &cue.text);
        info!(index, score, "line scored");
        let verdict = SimilarityVerdict {
            score,
            passes_main: meets_main_threshold(score),
            passes_variation: meets_variation_threshold(score),
        };
        if let Ok(mut results) = self.results.lock() {
            results.record(index, verdict);
        }
    }

    fn request_adlib(&self, index: usize, user_text: String) {
        let Some(generator) = self.adlib.clone() else {
            return;
        };
        let history: Vec<Cue> = self.script.iter().take(index + 1).cloned().collect();
        let tx = self.event_tx.clone();
        tokio::spawn(async move {
            let event = match generator.next_lines(history, user_text).await {
                Ok(lines) => EngineEvent::AdlibReady { lines },
                Err(error) => EngineEvent::AdlibFailed { error },
            };
            let _ = tx.send(event).await;
        });
    }

    fn next_cue(&mut self) {
        if self.index + 1 >= self.script.len() {
            self.try_finish();
            return;
        }
        self.index += 1;
        self.shared_index.store(self.index, Ordering::SeqCst);
        self.process_current_cue();
    }

    fn try_finish(&mut self) {
        if self.pending.is_empty() {
            self.set_phase(Phase::Done);
        } else {
            info!(
                pending = self.pending.len(),
                "script exhausted, draining transcriptions before done"
            );
            self.finish_when_drained = true;
        }
    }

    fn finish_if_drained(&mut self) {
        if self.finish_when_drained && self.pending.is_empty() && self.phase != Phase::Done {
            self.set_phase(Phase::Done);
        }
    }

    /// Fire an event after a delay unless the engine is destroyed first.
    /// Receipt is re-validated against live phase/index, so stale timers
    /// are harmless.
    fn schedule(&self, after: Duration, event: EngineEvent) {
        let tx = self.event_tx.clone();
        let cancel = self.cancel.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {}
                _ = tokio::time::sleep(after) => {
                    let _ = tx.send(event).await;
                }
            }
        });
    }
}
