use std::time::Duration;

use tokio_util::sync::CancellationToken;

use rehearse::media::path::{resolve_paths, Gender, MediaSettings, Tone};
use rehearse::media::playback::{PlaybackController, PlaybackOutcome};
use rehearse::script::Cue;

fn settings() -> MediaSettings {
    MediaSettings {
        work: "work1".to_string(),
        opponent_gender: Gender::Male,
        has_custom_image: false,
        tone: Tone::Neutral,
        speed: 0,
    }
}

#[test]
fn test_video_path_convention() {
    let paths = resolve_paths(&settings(), 3);
    assert_eq!(paths.video, "work1/basic_man/basic_tone/3.mp4");
    assert_eq!(paths.audio, "", "speed 0 uses the video's embedded audio");
}

#[test]
fn test_custom_character_and_tone_folders() {
    let mut s = settings();
    s.opponent_gender = Gender::Female;
    s.has_custom_image = true;
    s.tone = Tone::Warm;
    let paths = resolve_paths(&s, 1);
    assert_eq!(paths.video, "work1/custom_woman/warm_tone/1.mp4");
}

#[test]
fn test_speed_selects_suffixed_audio() {
    let mut s = settings();
    s.speed = 2;
    assert_eq!(resolve_paths(&s, 4).audio, "work1/basic_man/basic_tone/4_+2.mp3");

    s.speed = -1;
    assert_eq!(resolve_paths(&s, 4).audio, "work1/basic_man/basic_tone/4_-1.mp3");
}

#[test]
fn test_unknown_tone_label_falls_back_to_neutral() {
    assert_eq!(Tone::from_label("까칠"), Tone::Curt);
    assert_eq!(Tone::from_label("다정"), Tone::Warm);
    assert_eq!(Tone::from_label("basic"), Tone::Neutral);
    assert_eq!(Tone::from_label("무언가 이상한 값"), Tone::Neutral);
}

#[tokio::test(start_paused = true)]
async fn test_simulated_duration_floor_and_scaling() {
    // Short lines get the 2s floor, long lines 100ms per char.
    assert_eq!(PlaybackController::simulated_duration("hi"), Duration::from_millis(2000));
    assert_eq!(
        PlaybackController::simulated_duration(&"a".repeat(35)),
        Duration::from_millis(3500)
    );

    let playback = PlaybackController::simulated();
    let cue = Cue::new("A", "hello");
    let pause = CancellationToken::new();

    let started = tokio::time::Instant::now();
    let outcome = playback.play(&cue, Duration::ZERO, &pause).await;
    assert_eq!(outcome, PlaybackOutcome::Completed);
    assert_eq!(started.elapsed(), Duration::from_millis(2000));
}

#[tokio::test(start_paused = true)]
async fn test_pause_preserves_position_and_resume_continues_from_it() {
    let playback = PlaybackController::simulated();
    // 80 chars -> 8s simulated turn.
    let cue = Cue::new("A", "a".repeat(80));

    let pause = CancellationToken::new();
    let pause_trigger = pause.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(3000)).await;
        pause_trigger.cancel();
    });

    let outcome = playback.play(&cue, Duration::ZERO, &pause).await;
    let PlaybackOutcome::Paused { position } = outcome else {
        panic!("expected pause, got {outcome:?}");
    };
    assert_eq!(position, Duration::from_millis(3000));

    // Resume from the frozen position: only the remainder plays.
    let pause = CancellationToken::new();
    let started = tokio::time::Instant::now();
    let outcome = playback.play(&cue, position, &pause).await;
    assert_eq!(outcome, PlaybackOutcome::Completed);
    assert_eq!(started.elapsed(), Duration::from_millis(5000));
}

#[tokio::test(start_paused = true)]
async fn test_missing_assets_fall_back_to_simulation() {
    // Player configured but no files exist at the resolved paths: the
    // chain must still resolve by simulation rather than hang or error.
    let playback = PlaybackController::with_player("ffplay");
    let mut cue = Cue::new("A", "hello");
    cue.video_url = Some("definitely/not/here/1.mp4".to_string());
    cue.audio_url = Some("definitely/not/here/1_+1.mp3".to_string());

    let pause = CancellationToken::new();
    let outcome = playback.play(&cue, Duration::ZERO, &pause).await;
    assert_eq!(outcome, PlaybackOutcome::Completed);
}
