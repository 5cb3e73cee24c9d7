/// Input sanitization for user-supplied notes and summaries
///
/// Removes the usual script-injection vectors before text is embedded in a
/// prompt or echoed back to the browser.
use lazy_static::lazy_static;
use regex::Regex;

use crate::config::constants::MAX_INPUT_LENGTH;

lazy_static! {
    static ref SCRIPT_BLOCK_REGEX: Regex = Regex::new(r"(?i)<script[^>]*>.*?</script>").unwrap();
    static ref IFRAME_BLOCK_REGEX: Regex = Regex::new(r"(?i)<iframe[^>]*>.*?</iframe>").unwrap();
    static ref JS_SCHEME_REGEX: Regex = Regex::new(r"(?i)javascript:").unwrap();
    /// Inline event handlers: onclick=, onload =, ...
    static ref EVENT_HANDLER_REGEX: Regex = Regex::new(r"(?i)on\w+\s*=").unwrap();
}

/// Sanitize free text, truncating to `max_length` characters
///
/// Removal is repeated until nothing matches, so fragments that join into a
/// new match after a removal ("javajavascript:script:") are caught as well.
/// The result is a fixed point: sanitizing it again changes nothing.
pub fn sanitize(text: &str, max_length: usize) -> String {
    let mut current = text.to_string();

    loop {
        let next = strip_unsafe(&current);
        if next == current {
            break;
        }
        current = next;
    }

    let trimmed = current.trim();
    let truncated = match trimmed.char_indices().nth(max_length) {
        Some((byte_idx, _)) => &trimmed[..byte_idx],
        None => trimmed,
    };

    // Truncation can expose trailing whitespace
    truncated.trim_end().to_string()
}

/// Sanitize with the default input length limit
pub fn sanitize_default(text: &str) -> String {
    sanitize(text, MAX_INPUT_LENGTH)
}

/// Sanitize a JSON value; anything that is not a string becomes empty
pub fn sanitize_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => sanitize_default(s),
        _ => String::new(),
    }
}

fn strip_unsafe(text: &str) -> String {
    let result = SCRIPT_BLOCK_REGEX.replace_all(text, "");
    let result = IFRAME_BLOCK_REGEX.replace_all(&result, "");
    let result = JS_SCHEME_REGEX.replace_all(&result, "");
    let result = EVENT_HANDLER_REGEX.replace_all(&result, "");
    result.into_owned()
}
