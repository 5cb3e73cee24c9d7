pub mod constants;

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::audio::retention::RetentionPolicy;
use crate::providers::credentials::{resolve_credentials, ServiceAccountKey};
use crate::rate_limit::RateLimitConfig;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} not found in environment (create a .env file with {0}=your_key_here)")]
    MissingVariable(&'static str),
    #[error("invalid value for {name}: {value}")]
    InvalidValue { name: &'static str, value: String },
}

/// Server configuration, loaded once at startup
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Port to bind (default: 3000)
    pub port: u16,
    /// Deployment environment name (default: "development")
    pub environment: String,
    /// API key for the text generation provider (required)
    pub gemini_api_key: String,
    /// Text generation model (default: "gemini-2.5-flash")
    pub gemini_model: String,
    /// Override for the text provider base URL
    pub gemini_base_url: Option<String>,
    /// Service account used for speech synthesis, if configured
    pub tts_credentials: Option<ServiceAccountKey>,
    /// CORS allow-list; `None` allows any origin
    pub cors_allowed_origins: Option<Vec<String>>,
    /// Voice used when a podcast request does not name one
    pub default_voice: String,
    /// Directory holding generated audio
    pub audio_dir: PathBuf,
    /// Directory holding the static front-end
    pub public_dir: PathBuf,
    /// Deadline for each call to an external provider
    pub provider_timeout: Duration,
    /// Outer deadline for a whole HTTP request
    pub request_timeout: Duration,
    pub rate_limit: RateLimitConfig,
    pub audio_retention: RetentionPolicy,
    /// How often the audio sweep runs (default: 6 hours)
    pub cleanup_interval: Duration,
    /// Non-fatal problems found while loading
    pub warnings: Vec<String>,
}

impl AppConfig {
    /// Defaults for everything except the provider key
    pub fn with_api_key(gemini_api_key: impl Into<String>) -> Self {
        Self {
            port: 3000,
            environment: "development".to_string(),
            gemini_api_key: gemini_api_key.into(),
            gemini_model: "gemini-2.5-flash".to_string(),
            gemini_base_url: None,
            tts_credentials: None,
            cors_allowed_origins: None,
            default_voice: constants::DEFAULT_VOICE.to_string(),
            audio_dir: PathBuf::from("audio"),
            public_dir: PathBuf::from("public"),
            provider_timeout: Duration::from_secs(90),
            request_timeout: Duration::from_secs(300),
            rate_limit: RateLimitConfig::default(),
            audio_retention: RetentionPolicy::audio_default(),
            cleanup_interval: Duration::from_secs(6 * 3600),
            warnings: Vec::new(),
        }
    }

    /// Load configuration from environment variables
    ///
    /// Fails only when the text provider key is missing or a numeric
    /// setting cannot be parsed; everything else falls back to defaults and
    /// is reported through `warnings`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_key = env::var("GEMINI_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or(ConfigError::MissingVariable("GEMINI_API_KEY"))?;

        Self::load(api_key.trim())
    }

    /// Load configuration for maintenance commands that never call a
    /// provider, so a missing API key is not an error
    pub fn from_env_without_key() -> Result<Self, ConfigError> {
        let api_key = env::var("GEMINI_API_KEY").unwrap_or_default();
        Self::load(api_key.trim())
    }

    fn load(api_key: &str) -> Result<Self, ConfigError> {
        let mut config = Self::with_api_key(api_key);

        match env::var("PORT") {
            Ok(port) => config.port = parse_var("PORT", &port)?,
            Err(_) => config
                .warnings
                .push(format!("PORT not set, defaulting to {}", config.port)),
        }

        // NODE_ENV is what existing deployments of the front-end already set
        let environment = ["APP_ENV", "NODE_ENV"]
            .iter()
            .filter_map(|name| env::var(name).ok())
            .map(|name| name.trim().to_string())
            .find(|name| !name.is_empty());
        match environment {
            Some(name) => config.environment = name,
            None => config.warnings.push(format!(
                "APP_ENV not set, defaulting to {}",
                config.environment
            )),
        }

        if let Ok(model) = env::var("GEMINI_MODEL") {
            config.gemini_model = model;
        }
        config.gemini_base_url = env::var("GEMINI_API_BASE_URL").ok();

        if let Ok(voice) = env::var("DEFAULT_VOICE") {
            if !voice.trim().is_empty() {
                config.default_voice = voice.trim().to_string();
            }
        }

        if let Ok(dir) = env::var("AUDIO_DIR") {
            config.audio_dir = PathBuf::from(dir);
        }
        if let Ok(dir) = env::var("PUBLIC_DIR") {
            config.public_dir = PathBuf::from(dir);
        }

        config.cors_allowed_origins = env::var("ALLOWED_ORIGINS").ok().map(|origins| {
            origins
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        });

        if let Ok(v) = env::var("PROVIDER_TIMEOUT_SECONDS") {
            config.provider_timeout = Duration::from_secs(parse_var("PROVIDER_TIMEOUT_SECONDS", &v)?);
        }
        if let Ok(v) = env::var("REQUEST_TIMEOUT_SECONDS") {
            config.request_timeout = Duration::from_secs(parse_var("REQUEST_TIMEOUT_SECONDS", &v)?);
        }

        if let Ok(v) = env::var("RATE_LIMIT_MAX_REQUESTS") {
            config.rate_limit.max_requests = parse_var("RATE_LIMIT_MAX_REQUESTS", &v)?;
        }
        if let Ok(v) = env::var("TRUST_PROXY_HEADERS") {
            config.rate_limit.trust_proxy_headers = parse_var("TRUST_PROXY_HEADERS", &v)?;
        }
        if let Ok(v) = env::var("RATE_LIMIT_WINDOW_SECONDS") {
            config.rate_limit.window = Duration::from_secs(parse_var("RATE_LIMIT_WINDOW_SECONDS", &v)?);
        }

        if let Ok(v) = env::var("AUDIO_RETENTION_HOURS") {
            let hours: u64 = parse_var("AUDIO_RETENTION_HOURS", &v)?;
            config.audio_retention.max_age = Duration::from_secs(hours * 3600);
        }
        if let Ok(v) = env::var("AUDIO_MAX_STORAGE_MB") {
            config.audio_retention.max_total_size_mb = parse_var("AUDIO_MAX_STORAGE_MB", &v)?;
        }
        if let Ok(v) = env::var("AUDIO_CLEANUP_INTERVAL_HOURS") {
            let hours: u64 = parse_var("AUDIO_CLEANUP_INTERVAL_HOURS", &v)?;
            config.cleanup_interval = Duration::from_secs(hours.max(1) * 3600);
        }

        let inline_json = env::var("GOOGLE_APPLICATION_CREDENTIALS_JSON").ok();
        let primary = env::var("GOOGLE_APPLICATION_CREDENTIALS").ok();

        if inline_json.is_none() && primary.is_none() {
            config.warnings.push(
                "GOOGLE_APPLICATION_CREDENTIALS not set; podcast generation will fail until speech credentials are provided"
                    .to_string(),
            );
        }

        match resolve_credentials(inline_json.as_deref(), primary.as_deref()) {
            Ok(credentials) => config.tts_credentials = credentials,
            Err(e) => config
                .warnings
                .push(format!("Speech credentials could not be loaded: {}", e)),
        }

        Ok(config)
    }

    pub fn tts_configured(&self) -> bool {
        self.tts_credentials.is_some()
    }

    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }
}

fn parse_var<T: std::str::FromStr>(name: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        name,
        value: value.to_string(),
    })
}
