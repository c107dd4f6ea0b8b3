//! Engine-internal messages. Commands come from the host handle; events
//! are completions of async work (playback, capture, transcription) and
//! timer expiries, all drained on the single core task.

use std::time::Duration;

use uuid::Uuid;

use crate::audio::recorder::{RecordError, Utterance};
use crate::media::path::MediaSettings;
use crate::script::Cue;
use crate::services::adlib::AdlibError;
use crate::services::stt::SttError;

#[derive(Debug)]
pub(crate) enum Command {
    Start,
    Pause,
    Resume,
    ManualNext,
    ConfirmAndAdvance,
    UpdateSettings(MediaSettings),
}

/// Events carry the cue index they belong to, captured when the async work
/// was dispatched. Handlers validate against the live index/phase so stale
/// completions from an earlier turn are ignored.
#[derive(Debug)]
pub(crate) enum EngineEvent {
    PlaybackFinished { index: usize },
    PlaybackPaused { index: usize, position: Duration },
    RecordingFinished { index: usize, utterance: Utterance },
    RecordingFailed { index: usize, error: RecordError },
    TranscriptReady { request: Uuid, index: usize, text: String },
    TranscriptFailed { request: Uuid, index: usize, error: SttError },
    AdlibReady { lines: Vec<Cue> },
    AdlibFailed { error: AdlibError },
    AdvanceFromWaiting { index: usize },
    SkipTurnElapsed { index: usize },
    ConfirmTimeout { index: usize },
}
