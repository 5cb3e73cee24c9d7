/// Maximum accepted length of notes or summaries (in characters)
///
/// Requests over this limit are rejected before sanitization.
pub const MAX_INPUT_LENGTH: usize = 10_000;

/// Minimum length of sanitized, trimmed input (in characters)
pub const MIN_INPUT_LENGTH: usize = 10;

/// Byte budget for the plain-text TTS payload
///
/// SSML adds roughly 15-20% on top, which keeps the markup under the
/// provider's 5000 byte request limit most of the time.
pub const MAX_TTS_BYTES: usize = 4000;

/// SSML documents larger than this are never sent to the provider
pub const SSML_BYTE_LIMIT: usize = 5000;

/// Maximum request body size
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Voice used when the podcast request does not name one
pub const DEFAULT_VOICE: &str = "en-US-Neural2-F";

/// Default number of flashcards per request
pub const DEFAULT_FLASHCARD_COUNT: u32 = 8;

/// Upper bound for the requested flashcard count
pub const MAX_FLASHCARD_COUNT: u32 = 50;

/// Filename prefix for generated podcast audio
pub const AUDIO_FILE_PREFIX: &str = "podcast";

/// Extension of generated podcast audio (MP3 encoding)
pub const AUDIO_FILE_EXTENSION: &str = "mp3";

/// URL path under which audio files are served
pub const AUDIO_URL_PREFIX: &str = "/audio";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_bounds_are_consistent() {
        assert!(MIN_INPUT_LENGTH < MAX_INPUT_LENGTH);
        assert!(MAX_INPUT_LENGTH * 4 < MAX_BODY_BYTES);
    }

    #[test]
    fn test_tts_budget_below_ssml_limit() {
        assert!(MAX_TTS_BYTES < SSML_BYTE_LIMIT);
    }

    #[test]
    fn test_default_voice_has_language_prefix() {
        assert_eq!(&DEFAULT_VOICE[..5], "en-US");
    }
}
