use axum::{
    extract::{Request, State},
    http::HeaderValue,
    middleware::Next,
    response::Response,
};
use std::time::{Duration, Instant};
use uuid::Uuid;

use super::LogConfig;
use crate::utils::header_utils::{forwarded_client_ip, peer_ip, UNKNOWN_CLIENT};

const REQUEST_ID_HEADER: &str = "X-Request-ID";

/// Requests taking longer than this are also logged as warnings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlowRequestThreshold(pub Duration);

impl Default for SlowRequestThreshold {
    fn default() -> Self {
        SlowRequestThreshold::from(&LogConfig::default())
    }
}

impl From<&LogConfig> for SlowRequestThreshold {
    fn from(config: &LogConfig) -> Self {
        SlowRequestThreshold(Duration::from_millis(config.slow_request_threshold_ms))
    }
}

/// Request ID wrapper for tracking requests through the system
#[derive(Clone, Debug)]
pub struct RequestId(pub String);

/// Middleware to generate unique request IDs for correlation
pub async fn request_id_middleware(mut req: Request, next: Next) -> Response {
    let request_id = req
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    req.extensions_mut().insert(RequestId(request_id.clone()));

    let mut response = next.run(req).await;

    if let Ok(header_value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, header_value);
    }

    response
}

/// Middleware to log all HTTP requests to access log
pub async fn access_log_middleware(
    State(slow): State<SlowRequestThreshold>,
    req: Request,
    next: Next,
) -> Response {
    let start = Instant::now();

    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let request_id = req
        .extensions()
        .get::<RequestId>()
        .map(|id| id.0.clone())
        .unwrap_or_else(|| "unknown".to_string());

    let client_ip = peer_ip(&req).unwrap_or_else(|| UNKNOWN_CLIENT.to_string());
    // Logged as reported; never used for identity decisions here
    let forwarded_for = forwarded_client_ip(req.headers()).unwrap_or_default();
    let user_agent = req
        .headers()
        .get("user-agent")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string();

    let response = next.run(req).await;

    let status = response.status();
    let duration_ms = start.elapsed().as_millis() as u64;
    let bytes_sent = response
        .headers()
        .get("content-length")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(0);

    tracing::info!(
        target: "access_log",
        request_id = %request_id,
        client_ip = %client_ip,
        forwarded_for = %forwarded_for,
        method = %method,
        path = %path,
        status = status.as_u16(),
        duration_ms = duration_ms,
        bytes_sent = bytes_sent,
        user_agent = %user_agent,
        "HTTP request completed"
    );

    let threshold_ms = slow.0.as_millis() as u64;
    if duration_ms > threshold_ms {
        tracing::warn!(
            request_id = %request_id,
            path = %path,
            duration_ms = duration_ms,
            threshold_ms = threshold_ms,
            "Slow request detected"
        );
    }

    response
}
