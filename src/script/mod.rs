pub mod parser;

use serde::{Deserialize, Serialize};

/// One line of dialogue with an assigned speaking role.
///
/// Immutable after parsing except for `audio_url`/`video_url`, which the
/// engine rewrites when it resolves playback targets for an opponent turn
/// (tone/speed/customization may change between turns).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cue {
    pub role: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    /// True when the line carries no speakable text (stage direction only).
    /// The turn is still displayed as the user's, but no capture happens.
    #[serde(default)]
    pub skip_recording: bool,
}

impl Cue {
    pub fn new(role: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            text: text.into(),
            audio_url: None,
            video_url: None,
            skip_recording: false,
        }
    }
}

/// Ordered dialogue. Order is significant and never shuffled; ad-lib mode
/// may append cues at the tail mid-session.
pub type Script = Vec<Cue>;

/// 1-based count of opponent-role lines with real speech up to and
/// including `index`. This is the line number the media asset tree is
/// keyed by, so it must be recomputed from the script every time a path
/// is resolved.
pub fn opponent_line_number(script: &[Cue], user_role: &str, index: usize) -> usize {
    script
        .iter()
        .take(index + 1)
        .filter(|cue| cue.role != user_role && !cue.skip_recording)
        .count()
}
