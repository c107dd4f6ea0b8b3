//! Plain-text transcript parsing. One `role : dialogue` pair per line;
//! the first colon is the separator, so dialogue may itself contain colons.

use tracing::{debug, warn};

use super::{Cue, Script};

fn has_speakable_text(dialogue: &str) -> bool {
    let mut in_paren = false;
    for c in dialogue.chars() {
        match c {
            '(' => in_paren = true,
            ')' => in_paren = false,
            _ if !in_paren => {
                if ('\u{AC00}'..='\u{D7A3}').contains(&c) || c.is_ascii_alphanumeric() {
                    return true;
                }
            }
            _ => {}
        }
    }
    false
}

/// Parse a transcript into cues. Malformed lines are skipped, never fatal.
pub fn parse_script(text: &str) -> Script {
    let mut cues = Vec::new();

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let Some(colon) = line.find(':') else {
            warn!("script line has no role separator, skipping: '{}'", line);
            continue;
        };

        let role = line[..colon].trim();
        let dialogue = line[colon + 1..].trim();
        if role.is_empty() || dialogue.is_empty() {
            warn!("script line missing role or dialogue, skipping: '{}'", line);
            continue;
        }

        let skip_recording = !has_speakable_text(dialogue);
        debug!(
            role,
            skip_recording,
            "parsed cue: '{}'",
            dialogue
        );

        cues.push(Cue {
            role: role.to_string(),
            text: dialogue.to_string(),
            audio_url: None,
            video_url: None,
            skip_recording,
        });
    }

    cues
}
