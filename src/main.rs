use std::sync::Arc;

use tracing_subscriber::{EnvFilter, FmtSubscriber};

use rehearse::audio::recorder::MicRecorder;
use rehearse::engine::{EngineConfig, EngineObserver, ErrorKind, Phase, SubtitleKind};
use rehearse::media::playback::PlaybackController;
use rehearse::services::stt::{SttClient, Transcriber, UnsupportedTranscriber};
use rehearse::{parse_script, TurnEngine};

/// Prints the session to the console and flips a watch flag on `Done` so
/// the driver knows when to exit.
struct ConsoleObserver {
    done: tokio::sync::watch::Sender<bool>,
}

impl EngineObserver for ConsoleObserver {
    fn on_phase_changed(&self, phase: Phase) {
        tracing::info!(?phase, "phase");
        if phase == Phase::Done {
            let _ = self.done.send(true);
        }
    }

    fn on_subtitle(&self, text: &str, kind: SubtitleKind, cue_index: Option<usize>) {
        match kind {
            SubtitleKind::Ai => println!("  [{}] {}", cue_index.unwrap_or_default(), text),
            SubtitleKind::UserFinal => {
                println!("  [{}] you said: {}", cue_index.unwrap_or_default(), text)
            }
        }
    }

    fn on_error(&self, kind: ErrorKind, detail: Option<&str>) {
        tracing::warn!(?kind, detail, "engine error");
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let mut args = std::env::args().skip(1);
    let (Some(script_path), Some(user_role)) = (args.next(), args.next()) else {
        eprintln!("usage: rehearse <script file> <user role>");
        std::process::exit(2);
    };

    let text = std::fs::read_to_string(&script_path)?;
    let script = parse_script(&text);
    anyhow::ensure!(!script.is_empty(), "script '{}' has no cues", script_path);
    tracing::info!(cues = script.len(), %user_role, "script loaded");

    let transcriber: Arc<dyn Transcriber> = match std::env::var("REHEARSE_STT_URL") {
        Ok(url) => Arc::new(SttClient::new(url)),
        Err(_) => {
            tracing::warn!("REHEARSE_STT_URL not set, recognition disabled");
            Arc::new(UnsupportedTranscriber)
        }
    };

    let (done_tx, mut done_rx) = tokio::sync::watch::channel(false);
    let observer = Arc::new(ConsoleObserver { done: done_tx });

    let config = EngineConfig::new(script, &user_role);
    let engine = TurnEngine::spawn(
        config,
        observer,
        Arc::new(MicRecorder),
        transcriber,
        None,
        PlaybackController::simulated(),
    );

    engine.start();
    while !*done_rx.borrow_and_update() {
        done_rx.changed().await?;
    }

    println!("rehearsal complete ({} cues)", engine.current_index() + 1);
    engine.destroy();
    Ok(())
}
