/// Podcast script shaping
///
/// Turns raw model output into words a host would actually say, then derives
/// the byte-bounded plain-text payload handed to speech synthesis.
use lazy_static::lazy_static;
use regex::Regex;

use crate::config::constants::MAX_TTS_BYTES;

lazy_static! {
    /// Only at the very start of the output
    static ref PREAMBLE_REGEX: Regex = Regex::new(
        r"(?i)^(here's the podcast script|podcast script|here it is|here's your script|here is the script)[:\s]*"
    ).unwrap();

    static ref SPEAKER_LABEL_REGEX: Regex = Regex::new(r"(?im)^(host|narrator|speaker)[:\s]*").unwrap();
    static ref BOLD_SPAN_REGEX: Regex = Regex::new(r"\*\*[^*]+\*\*").unwrap();
    static ref ITALIC_SPAN_REGEX: Regex = Regex::new(r"\*[^*]+\*").unwrap();
    static ref HEADER_LINE_REGEX: Regex = Regex::new(r"#{1,6}\s[^\n]+").unwrap();
    static ref BRACKETED_REGEX: Regex = Regex::new(r"\[.*?\]").unwrap();
    static ref STAGE_ASIDE_REGEX: Regex = Regex::new(r"(?i)\(.*?(pause|music|sound|effect).*?\)").unwrap();
    static ref RULE_REGEX: Regex = Regex::new(r"---+").unwrap();
    static ref BLANK_LINE_REGEX: Regex = Regex::new(r"(?m)^\s*$").unwrap();
    static ref EXCESS_NEWLINES_REGEX: Regex = Regex::new(r"\n{3,}").unwrap();

    static ref HEADER_MARKER_REGEX: Regex = Regex::new(r"#{1,6}\s").unwrap();
    static ref PAUSE_MARKER_REGEX: Regex = Regex::new(r"(?i)\[pause\]").unwrap();
}

/// Strip everything from model output that should not be read aloud
///
/// Order matters: the newline passes at the end assume labels, markup and
/// stage directions are already gone.
pub fn shape_script(raw: &str) -> String {
    let text = PREAMBLE_REGEX.replace(raw, "");
    let text = SPEAKER_LABEL_REGEX.replace_all(&text, "");
    let text = BOLD_SPAN_REGEX.replace_all(&text, "");
    let text = ITALIC_SPAN_REGEX.replace_all(&text, "");
    let text = HEADER_LINE_REGEX.replace_all(&text, "");
    let text = BRACKETED_REGEX.replace_all(&text, "");
    let text = STAGE_ASIDE_REGEX.replace_all(&text, "");
    let text = RULE_REGEX.replace_all(&text, "");
    let text = BLANK_LINE_REGEX.replace_all(&text, "");
    let text = EXCESS_NEWLINES_REGEX.replace_all(&text, "\n\n");

    text.trim().to_string()
}

/// Derive the plain-text synthesis payload, bounded to `max_bytes` of UTF-8
///
/// Oversized text is cut at the byte budget and then back to the last
/// sentence terminator, so speech never stops mid-sentence unless the text
/// has no terminator at all.
pub fn to_tts_payload(script: &str, max_bytes: usize) -> String {
    let text = script.replace("**", "");
    let text = HEADER_MARKER_REGEX.replace_all(&text, "");
    let text = PAUSE_MARKER_REGEX.replace_all(&text, "");
    let text = EXCESS_NEWLINES_REGEX.replace_all(&text, "\n\n");
    let clean = text.trim();

    if clean.len() <= max_bytes {
        return clean.to_string();
    }

    tracing::debug!(
        bytes = clean.len(),
        max_bytes = max_bytes,
        "TTS text too long, truncating"
    );

    let cut = floor_char_boundary(clean, max_bytes);
    let mut truncated = &clean[..cut];

    if let Some(end) = truncated.rfind(&['.', '!', '?'][..]) {
        if end > 0 {
            truncated = &truncated[..=end];
        }
    }

    let result = truncated.trim().to_string();
    tracing::debug!(bytes = result.len(), "Truncated TTS text");
    result
}

/// Payload with the default byte budget
pub fn to_tts_payload_default(script: &str) -> String {
    to_tts_payload(script, MAX_TTS_BYTES)
}

/// Largest index <= `index` that falls on a char boundary
fn floor_char_boundary(s: &str, index: usize) -> usize {
    if index >= s.len() {
        return s.len();
    }
    let mut idx = index;
    while !s.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}
