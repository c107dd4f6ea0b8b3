//! Turn engine public surface: the handle the host UI drives, the phase
//! and error vocabulary, and the observer seam for phase/subtitle/error
//! callbacks. All engine state lives on one spawned task; the handle only
//! sends commands and reads shared atomics.

mod core;
mod events;

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::audio::recorder::Recorder;
use crate::media::path::MediaSettings;
use crate::media::playback::PlaybackController;
use crate::script::Script;
use crate::services::adlib::LineGenerator;
use crate::services::stt::Transcriber;

use events::Command;

/// Engine phase. Exactly one value at any time; `Done` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Entry,
    AiPlaying,
    Waiting,
    UserRecording,
    WaitingForConfirmation,
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubtitleKind {
    /// The scripted line being performed (opponent's, or the user's prompt).
    Ai,
    /// Final recognition result for a user turn.
    UserFinal,
}

/// Error taxonomy surfaced through `on_error`. None of these end the
/// session; each recording/service failure degrades the turn and moves on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    MicPermissionDenied,
    SttUnsupported,
    SttFailed,
    RecordingSetup,
    AdlibFailed,
}

/// What happens after a user turn's capture stops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmPolicy {
    /// Show the result for the given duration, then advance on its own.
    AutoAdvance(Duration),
    /// Hold until the host calls `confirm_and_advance`.
    Manual,
}

impl Default for ConfirmPolicy {
    fn default() -> Self {
        ConfirmPolicy::AutoAdvance(Duration::from_secs(4))
    }
}

/// Callbacks the host supplies. Invoked only from the engine task; a
/// destroyed engine never calls these again.
pub trait EngineObserver: Send + Sync {
    fn on_phase_changed(&self, phase: Phase);
    fn on_subtitle(&self, text: &str, kind: SubtitleKind, cue_index: Option<usize>);
    fn on_error(&self, kind: ErrorKind, detail: Option<&str>);
}

#[derive(Debug, Clone, Copy)]
pub struct SimilarityVerdict {
    pub score: f32,
    pub passes_main: bool,
    pub passes_variation: bool,
}

/// Per-cue similarity verdicts, filled in as transcriptions resolve
/// (possibly after the turn that produced them has advanced).
#[derive(Default)]
pub struct SessionResults {
    scores: HashMap<usize, SimilarityVerdict>,
}

impl SessionResults {
    pub fn score_for(&self, cue_index: usize) -> Option<SimilarityVerdict> {
        self.scores.get(&cue_index).copied()
    }

    pub(crate) fn record(&mut self, cue_index: usize, verdict: SimilarityVerdict) {
        self.scores.insert(cue_index, verdict);
    }
}

pub struct EngineConfig {
    pub script: Script,
    pub user_role: String,
    pub adlib_mode: bool,
    pub confirm_policy: ConfirmPolicy,
    pub settings: MediaSettings,
    /// Language hint forwarded to the STT service.
    pub language: String,
}

impl EngineConfig {
    pub fn new(script: Script, user_role: impl Into<String>) -> Self {
        Self {
            script,
            user_role: user_role.into(),
            adlib_mode: false,
            confirm_policy: ConfirmPolicy::default(),
            settings: MediaSettings::default(),
            language: "ko".to_string(),
        }
    }
}

/// Host-side handle. One handle per active rehearsal; dropping it (or
/// calling `destroy`) tears the engine down and suppresses all further
/// callbacks.
pub struct TurnEngine {
    cmd_tx: mpsc::Sender<Command>,
    cancel: CancellationToken,
    index: Arc<AtomicUsize>,
    results: Arc<Mutex<SessionResults>>,
}

impl TurnEngine {
    pub fn spawn(
        config: EngineConfig,
        observer: Arc<dyn EngineObserver>,
        recorder: Arc<dyn Recorder>,
        transcriber: Arc<dyn Transcriber>,
        adlib: Option<Arc<dyn LineGenerator>>,
        playback: PlaybackController,
    ) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel(16);
        let cancel = CancellationToken::new();
        let index = Arc::new(AtomicUsize::new(0));
        let results = Arc::new(Mutex::new(SessionResults::default()));

        let core = core::EngineCore::new(
            config,
            observer,
            recorder,
            transcriber,
            adlib,
            playback,
            cancel.clone(),
            cmd_rx,
            index.clone(),
            results.clone(),
        );
        tokio::spawn(core.run());

        Self {
            cmd_tx,
            cancel,
            index,
            results,
        }
    }

    fn send(&self, command: Command) {
        if let Err(e) = self.cmd_tx.try_send(command) {
            warn!("engine command dropped: {}", e);
        }
    }

    pub fn start(&self) {
        self.send(Command::Start);
    }

    pub fn pause(&self) {
        self.send(Command::Pause);
    }

    pub fn resume(&self) {
        self.send(Command::Resume);
    }

    /// Skip the current turn immediately, discarding any in-flight capture.
    pub fn manual_next(&self) {
        self.send(Command::ManualNext);
    }

    /// Advance out of `WaitingForConfirmation` under the manual policy.
    pub fn confirm_and_advance(&self) {
        self.send(Command::ConfirmAndAdvance);
    }

    /// New settings take effect at the next turn start or resume.
    pub fn update_settings(&self, settings: MediaSettings) {
        self.send(Command::UpdateSettings(settings));
    }

    /// Terminal: stops media and capture, cancels timers, and guarantees
    /// no further observer callbacks.
    pub fn destroy(&self) {
        self.cancel.cancel();
    }

    pub fn current_index(&self) -> usize {
        self.index.load(Ordering::SeqCst)
    }

    pub fn score_for(&self, cue_index: usize) -> Option<SimilarityVerdict> {
        self.results.lock().ok()?.score_for(cue_index)
    }
}

impl Drop for TurnEngine {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
