//! External AI providers: text generation and speech synthesis.

pub mod credentials;
pub mod gemini;
pub mod google_tts;

pub use gemini::GeminiClient;
pub use google_tts::GoogleTtsClient;

use async_trait::async_trait;
use std::fmt;

#[derive(Debug, thiserror::Error)]
pub enum TextProviderError {
    #[error("HTTP error: {0}")]
    Request(#[from] reqwest::Error),
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },
    #[error("provider returned no text")]
    EmptyResponse,
}

/// Prompt in, text out
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, TextProviderError>;
}

/// Classification of speech synthesis failures
///
/// The synthesis adapter decides whether to retry with plain text based on
/// this, so providers must map their native error codes onto it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SynthesisErrorKind {
    /// The request was malformed, typically SSML the engine rejected
    InvalidArgument,
    /// The voice or resource does not exist (e.g. voice lacks SSML support)
    NotFound,
    /// Credentials missing or rejected
    Unauthenticated,
    /// Quota exhausted
    ResourceExhausted,
    /// Provider temporarily unavailable
    Unavailable,
    /// The call did not finish before its deadline
    Timeout,
    /// Transport failures and anything unclassified
    Other,
}

impl SynthesisErrorKind {
    /// Map a gRPC-style status name (`"INVALID_ARGUMENT"`, ...) to a kind
    pub fn from_status(status: &str) -> Self {
        match status.trim().to_ascii_uppercase().as_str() {
            "INVALID_ARGUMENT" => Self::InvalidArgument,
            "NOT_FOUND" => Self::NotFound,
            "UNAUTHENTICATED" | "PERMISSION_DENIED" => Self::Unauthenticated,
            "RESOURCE_EXHAUSTED" => Self::ResourceExhausted,
            "UNAVAILABLE" => Self::Unavailable,
            "DEADLINE_EXCEEDED" => Self::Timeout,
            _ => Self::Other,
        }
    }

    /// Map an HTTP status code when the body carries no status name
    pub fn from_http_status(code: u16) -> Self {
        match code {
            400 => Self::InvalidArgument,
            401 | 403 => Self::Unauthenticated,
            404 => Self::NotFound,
            408 | 504 => Self::Timeout,
            429 => Self::ResourceExhausted,
            503 => Self::Unavailable,
            _ => Self::Other,
        }
    }

    /// Whether a failed SSML attempt may be retried once as plain text
    pub fn allows_plain_text_fallback(self) -> bool {
        matches!(self, Self::InvalidArgument | Self::NotFound)
    }
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("{kind:?}: {message}")]
pub struct SynthesisError {
    pub kind: SynthesisErrorKind,
    pub message: String,
}

impl SynthesisError {
    pub fn new(kind: SynthesisErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for SynthesisError {
    fn from(err: reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            SynthesisErrorKind::Timeout
        } else {
            SynthesisErrorKind::Other
        };
        SynthesisError::new(kind, err.to_string())
    }
}

/// What is being spoken
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SynthesisInput {
    Ssml(String),
    Text(String),
}

impl SynthesisInput {
    pub fn is_ssml(&self) -> bool {
        matches!(self, SynthesisInput::Ssml(_))
    }
}

/// Voice selection sent to the provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceParams {
    pub language_code: String,
    pub name: String,
}

impl VoiceParams {
    /// Derive the language code from the voice id prefix ("en-US-Neural2-F" → "en-US")
    pub fn from_voice_id(voice_id: &str) -> Self {
        Self {
            language_code: voice_id.chars().take(5).collect(),
            name: voice_id.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SynthesisRequest {
    pub input: SynthesisInput,
    pub voice: VoiceParams,
    pub speaking_rate: f32,
}

impl fmt::Display for SynthesisRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (mode, len) = match &self.input {
            SynthesisInput::Ssml(s) => ("ssml", s.len()),
            SynthesisInput::Text(s) => ("text", s.len()),
        };
        write!(f, "{} ({} bytes) voice={}", mode, len, self.voice.name)
    }
}

/// Text or SSML in, MP3 bytes out
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(&self, request: &SynthesisRequest) -> Result<Vec<u8>, SynthesisError>;

    /// Whether credentials are present; reported by the health endpoint
    fn is_configured(&self) -> bool {
        true
    }
}
