use async_trait::async_trait;
use base64::Engine;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tokio::sync::Mutex;

use super::credentials::ServiceAccountKey;
use super::{
    SpeechSynthesizer, SynthesisError, SynthesisErrorKind, SynthesisInput, SynthesisRequest,
};

const SYNTHESIZE_URL: &str = "https://texttospeech.googleapis.com/v1/text:synthesize";
const SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
/// Refresh access tokens this long before they expire
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);

/// Google Cloud Text-to-Speech over REST, authenticated with a service account
pub struct GoogleTtsClient {
    client: Client,
    credentials: Option<ServiceAccountKey>,
    endpoint: String,
    token: Mutex<Option<CachedToken>>,
}

struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

#[derive(Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: u64,
    exp: u64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

fn default_expires_in() -> u64 {
    3600
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SynthesizeBody<'a> {
    input: InputBody<'a>,
    voice: VoiceBody<'a>,
    audio_config: AudioConfigBody,
}

#[derive(Serialize)]
#[serde(rename_all = "lowercase")]
enum InputBody<'a> {
    Ssml(&'a str),
    Text(&'a str),
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct VoiceBody<'a> {
    language_code: &'a str,
    name: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AudioConfigBody {
    audio_encoding: &'static str,
    speaking_rate: f32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SynthesizeResponse {
    #[serde(default)]
    audio_content: String,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
}

impl GoogleTtsClient {
    pub fn new(credentials: Option<ServiceAccountKey>) -> Self {
        Self {
            client: Client::new(),
            credentials,
            endpoint: SYNTHESIZE_URL.to_string(),
            token: Mutex::new(None),
        }
    }

    pub fn with_endpoint(mut self, url: impl Into<String>) -> Self {
        self.endpoint = url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| Client::new());
        self
    }

    async fn access_token(&self) -> Result<String, SynthesisError> {
        let credentials = self.credentials.as_ref().ok_or_else(|| {
            SynthesisError::new(
                SynthesisErrorKind::Unauthenticated,
                "speech credentials are not configured",
            )
        })?;

        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            if Instant::now() + TOKEN_REFRESH_MARGIN < token.expires_at {
                return Ok(token.access_token.clone());
            }
        }

        let assertion = sign_assertion(credentials)?;
        let resp = self
            .client
            .post(&credentials.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(SynthesisError::new(
                SynthesisErrorKind::Unauthenticated,
                format!("token exchange failed ({}): {}", status.as_u16(), body),
            ));
        }

        let token: TokenResponse = resp.json().await?;
        tracing::debug!(expires_in = token.expires_in, "Obtained speech access token");

        *cached = Some(CachedToken {
            access_token: token.access_token.clone(),
            expires_at: Instant::now() + Duration::from_secs(token.expires_in),
        });

        Ok(token.access_token)
    }
}

fn sign_assertion(credentials: &ServiceAccountKey) -> Result<String, SynthesisError> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();

    let claims = Claims {
        iss: &credentials.client_email,
        scope: SCOPE,
        aud: &credentials.token_uri,
        iat: now,
        exp: now + 3600,
    };

    let key = EncodingKey::from_rsa_pem(credentials.private_key.as_bytes()).map_err(|e| {
        SynthesisError::new(
            SynthesisErrorKind::Unauthenticated,
            format!("invalid service account private key: {}", e),
        )
    })?;

    jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &key).map_err(|e| {
        SynthesisError::new(
            SynthesisErrorKind::Unauthenticated,
            format!("failed to sign token request: {}", e),
        )
    })
}

fn build_body(request: &SynthesisRequest) -> SynthesizeBody<'_> {
    let input = match &request.input {
        SynthesisInput::Ssml(ssml) => InputBody::Ssml(ssml),
        SynthesisInput::Text(text) => InputBody::Text(text),
    };

    SynthesizeBody {
        input,
        voice: VoiceBody {
            language_code: &request.voice.language_code,
            name: &request.voice.name,
        },
        audio_config: AudioConfigBody {
            audio_encoding: "MP3",
            speaking_rate: request.speaking_rate,
        },
    }
}

/// Turn a non-success response into a classified error
fn classify_error(http_status: u16, raw: &str) -> SynthesisError {
    match serde_json::from_str::<ErrorEnvelope>(raw) {
        Ok(envelope) => {
            let kind = if envelope.error.status.is_empty() {
                SynthesisErrorKind::from_http_status(http_status)
            } else {
                SynthesisErrorKind::from_status(&envelope.error.status)
            };
            SynthesisError::new(kind, envelope.error.message)
        }
        Err(_) => SynthesisError::new(SynthesisErrorKind::from_http_status(http_status), raw),
    }
}

fn decode_audio(response: SynthesizeResponse) -> Result<Vec<u8>, SynthesisError> {
    base64::engine::general_purpose::STANDARD
        .decode(response.audio_content.as_bytes())
        .map_err(|e| {
            SynthesisError::new(
                SynthesisErrorKind::Other,
                format!("audio content is not valid base64: {}", e),
            )
        })
}

#[async_trait]
impl SpeechSynthesizer for GoogleTtsClient {
    async fn synthesize(&self, request: &SynthesisRequest) -> Result<Vec<u8>, SynthesisError> {
        let token = self.access_token().await?;

        let resp = self
            .client
            .post(&self.endpoint)
            .bearer_auth(token)
            .json(&build_body(request))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let raw = resp.text().await.unwrap_or_default();
            return Err(classify_error(status.as_u16(), &raw));
        }

        let parsed: SynthesizeResponse = resp.json().await?;
        decode_audio(parsed)
    }

    fn is_configured(&self) -> bool {
        self.credentials.is_some()
    }
}
