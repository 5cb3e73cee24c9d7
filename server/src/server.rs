use axum::{
    extract::{rejection::JsonRejection, DefaultBodyLimit, State},
    http::{header, HeaderValue, Method, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::timeout::TimeoutLayer;

use crate::config::constants::{AUDIO_URL_PREFIX, MAX_BODY_BYTES};
use crate::config::AppConfig;
use crate::error::{ApiError, Result};
use crate::logging::{access_log_middleware, request_id_middleware, SlowRequestThreshold};
use crate::models::{
    FlashcardsRequest, FlashcardsResponse, HealthResponse, PodcastRequest, PodcastResponse,
    SummaryRequest, SummaryResponse,
};
use crate::rate_limit::{rate_limit_middleware, SlidingWindowLimiter};
use crate::services::StudyPipeline;

// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<StudyPipeline>,
    pub limiter: SlidingWindowLimiter,
    pub environment: String,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(pipeline: StudyPipeline, limiter: SlidingWindowLimiter, environment: impl Into<String>) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            limiter,
            environment: environment.into(),
            started_at: Instant::now(),
        }
    }
}

/// HTTP-level settings that shape the router rather than the pipeline
#[derive(Debug, Clone)]
pub struct RouterConfig {
    pub cors_allowed_origins: Option<Vec<String>>,
    pub audio_dir: PathBuf,
    pub public_dir: PathBuf,
    pub request_timeout: Duration,
    pub slow_request_threshold: SlowRequestThreshold,
}

impl From<&AppConfig> for RouterConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            cors_allowed_origins: config.cors_allowed_origins.clone(),
            audio_dir: config.audio_dir.clone(),
            public_dir: config.public_dir.clone(),
            request_timeout: config.request_timeout,
            slow_request_threshold: SlowRequestThreshold::default(),
        }
    }
}

// HTTP Handlers

/// Turn lecture notes into a study guide
async fn generate_summary(
    State(state): State<AppState>,
    payload: std::result::Result<Json<SummaryRequest>, JsonRejection>,
) -> Result<Json<SummaryResponse>> {
    let Json(req) = payload?;
    let summary = state.pipeline.summarize(&req.notes).await?;

    Ok(Json(SummaryResponse {
        success: true,
        summary,
    }))
}

/// Turn a summary into a narrated MP3
async fn generate_podcast(
    State(state): State<AppState>,
    payload: std::result::Result<Json<PodcastRequest>, JsonRejection>,
) -> Result<Json<PodcastResponse>> {
    let Json(req) = payload?;
    let audio_url = state.pipeline.podcast(&req.summary, req.voice()).await?;

    Ok(Json(PodcastResponse {
        success: true,
        audio_url,
        message: "Podcast generated successfully!".to_string(),
    }))
}

/// Turn lecture notes into question/answer cards
async fn generate_flashcards(
    State(state): State<AppState>,
    payload: std::result::Result<Json<FlashcardsRequest>, JsonRejection>,
) -> Result<Json<FlashcardsResponse>> {
    let Json(req) = payload?;
    let flashcards = state.pipeline.flashcards(&req.notes, req.count).await?;

    tracing::info!(count = flashcards.len(), "Flashcards generated");
    Ok(Json(FlashcardsResponse {
        success: true,
        flashcards,
    }))
}

/// Health check endpoint
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let tts_configured = state.pipeline.tts_configured();

    Json(HealthResponse {
        status: if tts_configured { "ok" } else { "degraded" }.to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        uptime: state.started_at.elapsed().as_secs_f64(),
        environment: state.environment.clone(),
        tts: if tts_configured {
            "configured"
        } else {
            "not_configured"
        }
        .to_string(),
    })
}

fn cors_layer(allowed_origins: Option<&[String]>) -> CorsLayer {
    match allowed_origins {
        Some(origins) => {
            let origins: Vec<HeaderValue> = origins
                .iter()
                .filter_map(|origin| match HeaderValue::from_str(origin) {
                    Ok(value) => Some(value),
                    Err(_) => {
                        tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                        None
                    }
                })
                .collect();

            CorsLayer::new()
                .allow_origin(origins)
                .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
                .allow_credentials(true)
        }
        // Credentials cannot be combined with a wildcard origin
        None => CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any),
    }
}

/// `TimeoutLayer` answers with an empty 408; give it the usual `{error}` body
async fn json_request_timeout(response: Response) -> Response {
    if response.status() == StatusCode::REQUEST_TIMEOUT
        && !response.headers().contains_key(header::CONTENT_TYPE)
    {
        return ApiError::RequestTimeout.into_response();
    }
    response
}

pub fn create_router(state: AppState, config: &RouterConfig) -> Router<()> {
    let limiter = state.limiter.clone();

    let generate = Router::new()
        .route("/api/generate-summary", post(generate_summary))
        .route("/api/generate-podcast", post(generate_podcast))
        .route("/api/generate-flashcards", post(generate_flashcards))
        .route_layer(middleware::from_fn_with_state(limiter, rate_limit_middleware));

    Router::new()
        .merge(generate)
        .route("/api/health", get(health_check))
        .with_state(state)
        .nest_service(AUDIO_URL_PREFIX, ServeDir::new(&config.audio_dir))
        .fallback_service(ServeDir::new(&config.public_dir))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TimeoutLayer::new(config.request_timeout))
        .layer(middleware::map_response(json_request_timeout))
        .layer(cors_layer(config.cors_allowed_origins.as_deref()))
        .layer(middleware::from_fn_with_state(
            config.slow_request_threshold,
            access_log_middleware,
        ))
        .layer(middleware::from_fn(request_id_middleware))
}
