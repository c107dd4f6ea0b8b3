//! Deterministic mapping from playback settings to asset locations.
//! Pure functions: the asset tree is keyed by work, character variant,
//! tone folder and the opponent's 1-based line number.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    fn folder(self) -> &'static str {
        match self {
            Gender::Male => "man",
            Gender::Female => "woman",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Tone {
    Neutral,
    Curt,
    Warm,
}

impl Tone {
    /// Map a user-facing tone label to its enum. Unrecognized labels fall
    /// back to the neutral tone rather than failing.
    pub fn from_label(label: &str) -> Self {
        match label {
            "까칠" | "curt" => Tone::Curt,
            "다정" | "warm" => Tone::Warm,
            _ => Tone::Neutral,
        }
    }

    fn folder(self) -> &'static str {
        match self {
            Tone::Neutral => "basic_tone",
            Tone::Curt => "grumpy_tone",
            Tone::Warm => "warm_tone",
        }
    }
}

/// Playback settings the host may change mid-session. Changes take effect
/// at the next path resolution (turn start or resume), never retroactively.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaSettings {
    pub work: String,
    pub opponent_gender: Gender,
    pub has_custom_image: bool,
    pub tone: Tone,
    /// Speed slider value. 0 means "use the video's embedded audio track";
    /// any other value selects a separately speed-adjusted audio file.
    pub speed: i8,
}

impl Default for MediaSettings {
    fn default() -> Self {
        Self {
            work: "work1".to_string(),
            opponent_gender: Gender::Male,
            has_custom_image: false,
            tone: Tone::Neutral,
            speed: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaPaths {
    pub video: String,
    /// Empty when speed is 0 (the video's embedded audio is authoritative).
    pub audio: String,
}

fn character_folder(settings: &MediaSettings) -> String {
    let variant = if settings.has_custom_image {
        "custom"
    } else {
        "basic"
    };
    format!("{}_{}", variant, settings.opponent_gender.folder())
}

/// Resolve the video/audio locations for the opponent's `line_number`-th
/// spoken line (1-based, skip-recording lines excluded by the caller).
pub fn resolve_paths(settings: &MediaSettings, line_number: usize) -> MediaPaths {
    let character = character_folder(settings);
    let tone = settings.tone.folder();

    let video = format!(
        "{}/{}/{}/{}.mp4",
        settings.work, character, tone, line_number
    );

    let audio = if settings.speed == 0 {
        String::new()
    } else {
        let suffix = if settings.speed > 0 {
            format!("+{}", settings.speed)
        } else {
            settings.speed.to_string()
        };
        format!(
            "{}/{}/{}/{}_{}.mp3",
            settings.work, character, tone, line_number, suffix
        )
    };

    MediaPaths { video, audio }
}
