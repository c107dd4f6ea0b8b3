//! Front-biased text similarity for scoring recognized speech against a
//! script line. Korean-aware: common mis-transcription pairs get a reduced
//! substitution penalty.

/// Score at or above which a delivered line counts as a clean match.
pub const MAIN_THRESHOLD: f32 = 0.78;
/// Looser threshold for alternate acceptance policies.
pub const VARIATION_THRESHOLD: f32 = 0.60;

/// Fraction of each normalized string that participates in the comparison.
/// The tail is dropped on BOTH sides so a speaker cut short by the VAD is
/// not penalized, and a short guess is not rewarded against a long line.
const FRONT_BIAS: f32 = 0.7;

/// Hangul syllable pairs that speech recognition confuses often enough that
/// a full substitution penalty would be unfair.
const CONFUSED_PAIRS: &[(char, char)] = &[
    ('소', '어'),
    ('소', '요'),
    ('어', '요'),
    ('헌', '근'),
    ('거', '것'),
    ('는', '은'),
    ('데', '대'),
];

const CONFUSED_SUBSTITUTION_COST: f32 = 0.3;

fn is_script_char(c: char) -> bool {
    ('\u{AC00}'..='\u{D7A3}').contains(&c) || c.is_ascii_alphanumeric()
}

/// Normalize a line for comparison: drop parenthetical stage directions,
/// keep only Hangul/ASCII alphanumerics and whitespace, collapse whitespace
/// runs to single spaces. Idempotent.
pub fn normalize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_paren = false;
    let mut pending_space = false;
    for c in text.chars() {
        if in_paren {
            if c == ')' {
                in_paren = false;
            }
            continue;
        }
        if c == '(' {
            in_paren = true;
            continue;
        }
        if c.is_whitespace() {
            pending_space = !out.is_empty();
            continue;
        }
        if is_script_char(c) {
            if pending_space {
                out.push(' ');
                pending_space = false;
            }
            out.push(c);
        }
    }
    out
}

fn substitution_cost(a: char, b: char) -> f32 {
    if CONFUSED_PAIRS
        .iter()
        .any(|&(x, y)| (a == x && b == y) || (a == y && b == x))
    {
        CONFUSED_SUBSTITUTION_COST
    } else {
        1.0
    }
}

/// Weighted Levenshtein distance over chars. Insertions and deletions cost
/// 1.0; substitutions cost 1.0 unless the pair is in the confusion table.
fn weighted_distance(a: &[char], b: &[char]) -> f32 {
    let mut prev: Vec<f32> = (0..=a.len()).map(|i| i as f32).collect();
    let mut curr = vec![0.0f32; a.len() + 1];

    for (j, &cb) in b.iter().enumerate() {
        curr[0] = (j + 1) as f32;
        for (i, &ca) in a.iter().enumerate() {
            let sub = if ca == cb {
                prev[i]
            } else {
                prev[i] + substitution_cost(ca, cb)
            };
            curr[i + 1] = sub.min(prev[i + 1] + 1.0).min(curr[i] + 1.0);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[a.len()]
}

fn truncate_front(chars: &[char]) -> &[char] {
    let keep = (chars.len() as f32 * FRONT_BIAS).ceil() as usize;
    &chars[..keep.min(chars.len())]
}

/// Front-biased similarity in [0, 1] between recognized speech and the
/// expected line. Two empty strings are fully similar; empty vs non-empty
/// is zero.
pub fn similarity(recognized: &str, expected: &str) -> f32 {
    let a: Vec<char> = normalize(recognized).chars().collect();
    let b: Vec<char> = normalize(expected).chars().collect();

    let a = truncate_front(&a);
    let b = truncate_front(&b);

    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let distance = weighted_distance(a, b);
    let max_len = a.len().max(b.len()) as f32;
    (1.0 - distance / max_len).clamp(0.0, 1.0)
}

pub fn meets_main_threshold(score: f32) -> bool {
    score >= MAIN_THRESHOLD
}

pub fn meets_variation_threshold(score: f32) -> bool {
    score >= VARIATION_THRESHOLD
}
