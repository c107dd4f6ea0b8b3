use rehearse::audio::vad::{VadSignal, VoiceActivityDetector};

const RATE: u32 = 16_000;

/// 50ms of constant-amplitude samples (RMS == amplitude).
fn chunk(amplitude: f32) -> Vec<f32> {
    vec![amplitude; RATE as usize / 20]
}

fn calibrate(vad: &mut VoiceActivityDetector, amplitude: f32) {
    // 10 chunks x 50ms cross the 500ms calibration window.
    for i in 0..10 {
        let signal = vad.process(&chunk(amplitude));
        if i < 9 {
            assert_eq!(signal, None, "no decision during calibration");
        } else {
            assert_eq!(signal, Some(VadSignal::Calibrated));
        }
    }
}

#[test]
fn test_silence_before_voice_never_stops() {
    let mut vad = VoiceActivityDetector::new(RATE);
    calibrate(&mut vad, 0.001);

    // 5 seconds of silence with no voice ever detected.
    for _ in 0..100 {
        assert_eq!(vad.process(&chunk(0.001)), None);
    }
    assert!(!vad.voice_started());
}

#[test]
fn test_silence_after_voice_stops_at_two_seconds() {
    let mut vad = VoiceActivityDetector::new(RATE);
    calibrate(&mut vad, 0.001);

    assert_eq!(vad.process(&chunk(0.5)), Some(VadSignal::VoiceStart));

    // 39 chunks of silence: 1950ms, still short of the cutoff.
    for _ in 0..39 {
        assert_eq!(vad.process(&chunk(0.001)), None);
    }
    // 40th chunk reaches 2000ms.
    assert_eq!(vad.process(&chunk(0.001)), Some(VadSignal::UtteranceEnd));

    // The end signal fires once; the detector is spent.
    assert_eq!(vad.process(&chunk(0.001)), None);
    assert_eq!(vad.process(&chunk(0.5)), None);
}

#[test]
fn test_intermittent_voice_resets_the_silence_clock() {
    let mut vad = VoiceActivityDetector::new(RATE);
    calibrate(&mut vad, 0.001);

    assert_eq!(vad.process(&chunk(0.5)), Some(VadSignal::VoiceStart));

    // 1.5s of silence, then voice again, then 1.5s of silence: never stops.
    for _ in 0..30 {
        assert_eq!(vad.process(&chunk(0.001)), None);
    }
    assert_eq!(vad.process(&chunk(0.5)), None, "voice resumed, no new onset signal");
    for _ in 0..30 {
        assert_eq!(vad.process(&chunk(0.001)), None);
    }

    // Now let the silence run out.
    for _ in 0..10 {
        vad.process(&chunk(0.001));
    }
    assert!(vad.voice_started());
}

#[test]
fn test_noise_floor_is_floored_in_quiet_rooms() {
    let mut vad = VoiceActivityDetector::new(RATE);
    calibrate(&mut vad, 0.0001);

    assert_eq!(vad.noise_floor(), 0.01);
    assert!((vad.threshold() - 0.015).abs() < 1e-6);
}

#[test]
fn test_threshold_adapts_to_noisy_calibration() {
    let mut vad = VoiceActivityDetector::new(RATE);
    calibrate(&mut vad, 0.2);

    // Threshold sits at 1.5x the measured floor: quiet speech below it
    // does not register, louder speech does.
    assert_eq!(vad.process(&chunk(0.25)), None);
    assert_eq!(vad.process(&chunk(0.5)), Some(VadSignal::VoiceStart));
}
