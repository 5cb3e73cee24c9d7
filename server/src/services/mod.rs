//! Generation pipelines behind the three API endpoints.

pub mod flashcards;
pub mod prompts;
pub mod synthesis;

pub use synthesis::{FallbackReason, SpeechSynthesis, SynthesisPath, SynthesizedAudio};

use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use crate::audio::{audio_url, AudioStore};
use crate::config::constants::{
    DEFAULT_FLASHCARD_COUNT, MAX_FLASHCARD_COUNT, MAX_INPUT_LENGTH, MIN_INPUT_LENGTH,
};
use crate::error::{ApiError, Operation, Result};
use crate::models::Flashcard;
use crate::providers::{
    SpeechSynthesizer, SynthesisError, SynthesisErrorKind, TextGenerator, TextProviderError,
};
use crate::text_processing::{build_ssml, sanitize_value, shape_script, to_tts_payload_default};

/// Which field is being validated; only changes the error wording
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputField {
    Notes,
    Summary,
}

/// Length-check and sanitize a user-supplied text field
///
/// The raw length is checked before sanitization so oversized input is
/// rejected rather than silently truncated.
pub fn validate_input(raw: &Value, field: InputField) -> Result<String> {
    if let Value::String(s) = raw {
        if s.chars().count() > MAX_INPUT_LENGTH {
            let label = match field {
                InputField::Notes => "Notes",
                InputField::Summary => "Summary",
            };
            return Err(ApiError::Validation(format!(
                "{} too long. Maximum {} characters allowed.",
                label, MAX_INPUT_LENGTH
            )));
        }
    }

    let clean = sanitize_value(raw);
    if clean.trim().chars().count() < MIN_INPUT_LENGTH {
        let message = match field {
            InputField::Notes => format!(
                "Please provide at least {} characters of notes.",
                MIN_INPUT_LENGTH
            ),
            InputField::Summary => "Please provide a summary to convert to audio.".to_string(),
        };
        return Err(ApiError::Validation(message));
    }

    Ok(clean)
}

/// Resolve the requested flashcard count
pub fn validate_count(count: Option<i64>) -> Result<u32> {
    match count {
        None => Ok(DEFAULT_FLASHCARD_COUNT),
        Some(n) if (1..=i64::from(MAX_FLASHCARD_COUNT)).contains(&n) => Ok(n as u32),
        Some(_) => Err(ApiError::Validation(format!(
            "count must be between 1 and {}.",
            MAX_FLASHCARD_COUNT
        ))),
    }
}

/// Sanitize, prompt, post-process: one method per endpoint
pub struct StudyPipeline {
    text: Arc<dyn TextGenerator>,
    speech: SpeechSynthesis,
    audio: Arc<AudioStore>,
    provider_timeout: Duration,
    default_voice: String,
}

impl StudyPipeline {
    pub fn new(
        text: Arc<dyn TextGenerator>,
        speech: Arc<dyn SpeechSynthesizer>,
        audio: Arc<AudioStore>,
        provider_timeout: Duration,
        default_voice: impl Into<String>,
    ) -> Self {
        Self {
            text,
            speech: SpeechSynthesis::new(speech, provider_timeout),
            audio,
            provider_timeout,
            default_voice: default_voice.into(),
        }
    }

    pub fn tts_configured(&self) -> bool {
        self.speech.is_configured()
    }

    pub fn audio_store(&self) -> &AudioStore {
        &self.audio
    }

    /// Notes in, markdown study guide out
    pub async fn summarize(&self, notes: &Value) -> Result<String> {
        let notes = validate_input(notes, InputField::Notes)?;
        tracing::info!(chars = notes.chars().count(), "Generating summary");

        let summary = self
            .generate(Operation::Summary, &prompts::summary_prompt(&notes))
            .await?;

        tracing::info!(chars = summary.len(), "Summary generated");
        Ok(summary)
    }

    /// Summary in, URL of the persisted MP3 out
    pub async fn podcast(&self, summary: &Value, voice: Option<&str>) -> Result<String> {
        let summary = validate_input(summary, InputField::Summary)?;
        let voice = voice.unwrap_or(&self.default_voice);
        tracing::info!(chars = summary.chars().count(), voice = %voice, "Generating podcast");

        let raw = self
            .generate(Operation::Podcast, &prompts::podcast_script_prompt(&summary))
            .await?;
        tracing::debug!(chars = raw.len(), "Generated script");

        let script = shape_script(&raw);
        if script.is_empty() {
            return Err(ApiError::provider(
                Operation::Podcast,
                "model output contained no speakable text",
            ));
        }

        let payload = to_tts_payload_default(&script);
        let ssml = build_ssml(&payload);
        tracing::debug!(
            script_bytes = script.len(),
            payload_bytes = payload.len(),
            ssml_bytes = ssml.len(),
            "Prepared speech input"
        );

        let audio = self
            .speech
            .synthesize(&ssml, &payload, voice)
            .await
            .map_err(synthesis_error)?;

        if let SynthesisPath::PlainText(reason) = &audio.path {
            tracing::info!(reason = %reason, "Podcast synthesized from plain text");
        }

        let filename = self.audio.persist(&audio.bytes).await?;
        Ok(audio_url(&filename))
    }

    /// Notes in, up to `count` flashcards out
    pub async fn flashcards(&self, notes: &Value, count: Option<i64>) -> Result<Vec<Flashcard>> {
        let notes = validate_input(notes, InputField::Notes)?;
        let count = validate_count(count)?;
        tracing::info!(chars = notes.chars().count(), count = count, "Generating flashcards");

        let raw = self
            .generate(Operation::Flashcards, &prompts::flashcards_prompt(&notes, count))
            .await?;

        flashcards::parse_flashcards(&raw, count)
            .map_err(|e| ApiError::FlashcardParse(e.to_string()))
    }

    async fn generate(&self, operation: Operation, prompt: &str) -> Result<String> {
        match tokio::time::timeout(self.provider_timeout, self.text.generate(prompt)).await {
            Ok(Ok(text)) => Ok(text),
            Ok(Err(TextProviderError::Request(e))) if e.is_timeout() => {
                Err(ApiError::timeout(operation, self.provider_timeout))
            }
            Ok(Err(e)) => Err(ApiError::provider(operation, e)),
            Err(_) => Err(ApiError::timeout(operation, self.provider_timeout)),
        }
    }
}

fn synthesis_error(err: SynthesisError) -> ApiError {
    match err.kind {
        SynthesisErrorKind::Timeout => ApiError::Timeout {
            operation: Operation::Podcast,
            details: err.message,
        },
        _ => ApiError::provider(Operation::Podcast, err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_validate_input_accepts_and_sanitizes() {
        let clean = validate_input(&json!("  <script>x</script>Cell biology notes  "), InputField::Notes)
            .unwrap();
        assert_eq!(clean, "Cell biology notes");
    }

    #[test]
    fn test_validate_input_too_short() {
        let err = validate_input(&json!("too short"), InputField::Notes).unwrap_err();
        assert_eq!(err.to_string(), "Please provide at least 10 characters of notes.");

        let err = validate_input(&json!("   "), InputField::Summary).unwrap_err();
        assert_eq!(err.to_string(), "Please provide a summary to convert to audio.");
    }

    #[test]
    fn test_validate_input_short_after_sanitizing() {
        let raw = json!("<script>a long script body</script>hi");
        assert!(matches!(
            validate_input(&raw, InputField::Notes),
            Err(ApiError::Validation(_))
        ));
    }

    #[test]
    fn test_validate_input_non_string() {
        assert!(validate_input(&json!(12345678901_u64), InputField::Notes).is_err());
        assert!(validate_input(&Value::Null, InputField::Notes).is_err());
    }

    #[test]
    fn test_validate_input_too_long() {
        let raw = json!("a".repeat(MAX_INPUT_LENGTH + 1));
        let err = validate_input(&raw, InputField::Summary).unwrap_err();
        assert_eq!(err.to_string(), "Summary too long. Maximum 10000 characters allowed.");
    }

    #[test]
    fn test_validate_input_at_max_length() {
        let raw = json!("a".repeat(MAX_INPUT_LENGTH));
        assert_eq!(validate_input(&raw, InputField::Notes).unwrap().len(), MAX_INPUT_LENGTH);
    }

    #[test]
    fn test_validate_count() {
        assert_eq!(validate_count(None).unwrap(), 8);
        assert_eq!(validate_count(Some(1)).unwrap(), 1);
        assert_eq!(validate_count(Some(50)).unwrap(), 50);
        assert!(validate_count(Some(0)).is_err());
        assert!(validate_count(Some(51)).is_err());
        assert!(validate_count(Some(-3)).is_err());
    }
}
