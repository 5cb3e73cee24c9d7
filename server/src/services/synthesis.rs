use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::config::constants::SSML_BYTE_LIMIT;
use crate::providers::{
    SpeechSynthesizer, SynthesisError, SynthesisErrorKind, SynthesisInput, SynthesisRequest,
    VoiceParams,
};

const SPEAKING_RATE: f32 = 1.0;

/// Why the plain-text path was taken
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FallbackReason {
    /// The markup was over the provider's request limit
    SsmlTooLarge { bytes: usize },
    /// The provider rejected the markup with a fallback-eligible error
    Rejected(SynthesisErrorKind),
    /// The markup request succeeded but returned no audio
    EmptyAudio,
}

impl fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FallbackReason::SsmlTooLarge { bytes } => write!(f, "ssml too large ({} bytes)", bytes),
            FallbackReason::Rejected(kind) => write!(f, "ssml rejected ({:?})", kind),
            FallbackReason::EmptyAudio => write!(f, "ssml returned no audio"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SynthesisPath {
    Ssml,
    PlainText(FallbackReason),
}

#[derive(Debug)]
pub struct SynthesizedAudio {
    pub bytes: Vec<u8>,
    pub path: SynthesisPath,
}

/// Markup-first speech synthesis with a single plain-text fallback
#[derive(Clone)]
pub struct SpeechSynthesis {
    provider: Arc<dyn SpeechSynthesizer>,
    deadline: Duration,
}

impl SpeechSynthesis {
    pub fn new(provider: Arc<dyn SpeechSynthesizer>, deadline: Duration) -> Self {
        Self { provider, deadline }
    }

    pub fn is_configured(&self) -> bool {
        self.provider.is_configured()
    }

    pub async fn synthesize(
        &self,
        ssml: &str,
        plain_text: &str,
        voice_id: &str,
    ) -> Result<SynthesizedAudio, SynthesisError> {
        let voice = VoiceParams::from_voice_id(voice_id);

        let reason = if ssml.len() > SSML_BYTE_LIMIT {
            FallbackReason::SsmlTooLarge { bytes: ssml.len() }
        } else {
            let request = SynthesisRequest {
                input: SynthesisInput::Ssml(ssml.to_string()),
                voice: voice.clone(),
                speaking_rate: SPEAKING_RATE,
            };

            match self.call(&request).await {
                Ok(bytes) if !bytes.is_empty() => {
                    tracing::debug!(bytes = bytes.len(), "SSML synthesis OK");
                    return Ok(SynthesizedAudio {
                        bytes,
                        path: SynthesisPath::Ssml,
                    });
                }
                Ok(_) => FallbackReason::EmptyAudio,
                Err(e) if e.kind.allows_plain_text_fallback() => FallbackReason::Rejected(e.kind),
                Err(e) => return Err(e),
            }
        };

        tracing::warn!(reason = %reason, "Falling back to plain text synthesis");

        let request = SynthesisRequest {
            input: SynthesisInput::Text(plain_text.to_string()),
            voice,
            speaking_rate: SPEAKING_RATE,
        };
        let bytes = self.call(&request).await?;

        if bytes.is_empty() {
            return Err(SynthesisError::new(
                SynthesisErrorKind::Other,
                "speech provider returned no audio",
            ));
        }

        tracing::debug!(bytes = bytes.len(), "Plain text synthesis OK");
        Ok(SynthesizedAudio {
            bytes,
            path: SynthesisPath::PlainText(reason),
        })
    }

    async fn call(&self, request: &SynthesisRequest) -> Result<Vec<u8>, SynthesisError> {
        tracing::debug!(request = %request, "Calling speech provider");
        match tokio::time::timeout(self.deadline, self.provider.synthesize(request)).await {
            Ok(result) => result,
            Err(_) => Err(SynthesisError::new(
                SynthesisErrorKind::Timeout,
                format!(
                    "speech synthesis did not finish within {}s",
                    self.deadline.as_secs_f32()
                ),
            )),
        }
    }
}
