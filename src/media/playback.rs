//! Opponent media playback with a fallback chain that always resolves:
//! authoritative audio, else video, else a time-based simulation.
//! Real media runs as an external player process killed on pause/destroy.

use std::path::Path;
use std::process::ExitStatus;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::script::Cue;

const SIMULATED_FLOOR: Duration = Duration::from_millis(2000);
const SIMULATED_MS_PER_CHAR: u64 = 100;

/// A player process failing this early is treated as a load error and
/// falls through the chain instead of counting as a finished turn.
const EARLY_EXIT_WINDOW: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackOutcome {
    Completed,
    Paused { position: Duration },
}

enum Supervised {
    Exited(std::io::Result<ExitStatus>),
    PauseRequested,
    Wedged,
}

/// Plays one opponent turn at a time. Cloneable handle; holds no state
/// between turns, so the previous turn's process is fully gone (killed on
/// drop) before the next one spawns.
#[derive(Clone, Default)]
pub struct PlaybackController {
    player: Option<String>,
}

impl PlaybackController {
    /// No external player: every cue resolves by simulated duration.
    pub fn simulated() -> Self {
        Self { player: None }
    }

    /// Use an ffplay-compatible external player binary for real assets.
    pub fn with_player(program: impl Into<String>) -> Self {
        Self {
            player: Some(program.into()),
        }
    }

    pub fn simulated_duration(text: &str) -> Duration {
        let by_length = Duration::from_millis(text.chars().count() as u64 * SIMULATED_MS_PER_CHAR);
        by_length.max(SIMULATED_FLOOR)
    }

    /// Play the cue's media starting at `from`. Resolves with `Completed`
    /// when the turn is over, or `Paused` (with the frozen position) when
    /// the pause token fires. Never hangs: every source in the chain has a
    /// bounded path to resolution.
    pub async fn play(&self, cue: &Cue, from: Duration, pause: &CancellationToken) -> PlaybackOutcome {
        // Audio is authoritative for timing when present (video is muted
        // and visually driven by it); otherwise the video carries timing.
        let audio = cue.audio_url.as_deref().filter(|u| !u.is_empty());
        let video = cue.video_url.as_deref().filter(|u| !u.is_empty());

        if let Some(program) = &self.player {
            let candidates = [(audio, true), (video, false)];
            for (url, audio_only) in candidates {
                let Some(url) = url else { continue };
                if !Path::new(url).exists() {
                    warn!("media asset missing: {}", url);
                    continue;
                }
                match self.supervise(program, url, audio_only, cue, from, pause).await {
                    Some(outcome) => return outcome,
                    None => continue,
                }
            }
        }

        self.simulate(cue, from, pause).await
    }

    /// Run one player process to completion. `None` means the source failed
    /// to play and the caller should fall through the chain.
    async fn supervise(
        &self,
        program: &str,
        url: &str,
        audio_only: bool,
        cue: &Cue,
        from: Duration,
        pause: &CancellationToken,
    ) -> Option<PlaybackOutcome> {
        let mut cmd = tokio::process::Command::new(program);
        cmd.arg("-autoexit").arg("-loglevel").arg("quiet");
        if audio_only {
            cmd.arg("-nodisp");
        }
        if !from.is_zero() {
            cmd.arg("-ss").arg(format!("{:.2}", from.as_secs_f64()));
        }
        cmd.arg(url).kill_on_drop(true);

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                warn!("failed to spawn player for {}: {}", url, e);
                return None;
            }
        };

        info!(url, ?from, "playback started");
        let started = Instant::now();
        let ceiling = Self::simulated_duration(&cue.text) * 4 + Duration::from_secs(30);

        let supervised = tokio::select! {
            status = child.wait() => Supervised::Exited(status),
            _ = pause.cancelled() => Supervised::PauseRequested,
            _ = tokio::time::sleep(ceiling) => Supervised::Wedged,
        };

        match supervised {
            Supervised::Exited(Ok(status)) => {
                if !status.success() && started.elapsed() < EARLY_EXIT_WINDOW {
                    warn!("player exited early with {} for {}", status, url);
                    return None;
                }
                debug!(url, "playback finished");
                Some(PlaybackOutcome::Completed)
            }
            Supervised::Exited(Err(e)) => {
                warn!("player wait failed for {}: {}", url, e);
                None
            }
            Supervised::PauseRequested => {
                let _ = child.kill().await;
                let position = from + started.elapsed();
                info!(?position, "playback paused");
                Some(PlaybackOutcome::Paused { position })
            }
            Supervised::Wedged => {
                warn!("player exceeded playback ceiling, killing: {}", url);
                let _ = child.kill().await;
                Some(PlaybackOutcome::Completed)
            }
        }
    }

    async fn simulate(&self, cue: &Cue, from: Duration, pause: &CancellationToken) -> PlaybackOutcome {
        let duration = Self::simulated_duration(&cue.text);
        let remaining = duration.saturating_sub(from);
        debug!(?remaining, "simulating playback");

        let started = Instant::now();
        tokio::select! {
            _ = tokio::time::sleep(remaining) => PlaybackOutcome::Completed,
            _ = pause.cancelled() => PlaybackOutcome::Paused {
                position: from + started.elapsed(),
            },
        }
    }
}
