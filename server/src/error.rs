use axum::extract::rejection::JsonRejection;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use serde_json::json;
use std::fmt;
use std::time::Duration;

use crate::rate_limit::ReleaseRateLimitSlot;

/// Which generation endpoint an error came from; picks the user-facing noun
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Summary,
    Podcast,
    Flashcards,
}

impl Operation {
    pub fn noun(self) -> &'static str {
        match self {
            Operation::Summary => "summary",
            Operation::Podcast => "podcast",
            Operation::Flashcards => "flashcards",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.noun())
    }
}

#[derive(Debug)]
pub enum ApiError {
    // Request validation errors
    Validation(String),
    PayloadTooLarge(String),

    // Throttling
    RateLimited { retry_after: Duration, window: Duration },

    // Upstream provider errors
    Provider { operation: Operation, details: String },
    Timeout { operation: Operation, details: String },
    FlashcardParse(String),

    // Whole request exceeded the outer deadline
    RequestTimeout,

    // Local failures
    Persistence(std::io::Error),
    Internal(String),
}

impl ApiError {
    pub fn provider(operation: Operation, details: impl fmt::Display) -> Self {
        ApiError::Provider {
            operation,
            details: details.to_string(),
        }
    }

    pub fn timeout(operation: Operation, deadline: Duration) -> Self {
        ApiError::Timeout {
            operation,
            details: format!("provider did not respond within {}s", deadline.as_secs()),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::RequestTimeout => StatusCode::REQUEST_TIMEOUT,
            ApiError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            ApiError::Provider { .. }
            | ApiError::FlashcardParse(_)
            | ApiError::Persistence(_)
            | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Validation(msg) => write!(f, "{}", msg),
            ApiError::PayloadTooLarge(_) => write!(f, "Request body too large. Maximum size is 1MB."),
            ApiError::RequestTimeout => write!(f, "Request timed out. Please try again."),
            ApiError::RateLimited { window, .. } => {
                let minutes = window_minutes(*window);
                write!(
                    f,
                    "Rate limit exceeded. Please try again in {} minute{}.",
                    minutes,
                    if minutes == 1 { "" } else { "s" }
                )
            }
            ApiError::Provider { operation, .. } => {
                write!(f, "Failed to generate {}. Please try again.", operation)
            }
            ApiError::Timeout { operation, .. } => {
                write!(f, "Generating the {} took too long. Please try again.", operation)
            }
            ApiError::FlashcardParse(_) => write!(f, "Failed to parse flashcards. Please try again."),
            ApiError::Persistence(_) => write!(f, "Failed to generate podcast. Please try again."),
            ApiError::Internal(_) => write!(f, "Internal server error"),
        }
    }
}

impl std::error::Error for ApiError {}

fn window_minutes(window: Duration) -> u64 {
    window.as_secs().div_ceil(60).max(1)
}

// Conversions
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::PayloadTooLarge(rejection.body_text())
        } else {
            ApiError::Validation(rejection.body_text())
        }
    }
}

impl From<std::io::Error> for ApiError {
    fn from(err: std::io::Error) -> Self {
        ApiError::Persistence(err)
    }
}

// Axum integration
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = self.to_string();

        let body = match &self {
            ApiError::Validation(_) | ApiError::RateLimited { .. } | ApiError::RequestTimeout => {
                json!({ "error": message })
            }
            ApiError::PayloadTooLarge(details) => {
                tracing::warn!(details = %details, "Rejected oversized request body");
                json!({ "error": message })
            }
            ApiError::Provider { operation, details } => {
                tracing::error!(operation = %operation, details = %details, "Provider call failed");
                json!({ "error": message, "details": details })
            }
            ApiError::Timeout { operation, details } => {
                tracing::warn!(operation = %operation, details = %details, "Provider call timed out");
                json!({ "error": message, "details": details })
            }
            ApiError::FlashcardParse(details) => {
                tracing::error!(details = %details, "Flashcard parsing error");
                json!({ "success": false, "error": message, "flashcards": [] })
            }
            ApiError::Persistence(e) => {
                tracing::error!(error = %e, "Failed to persist audio");
                json!({ "error": message, "details": e.to_string() })
            }
            ApiError::Internal(details) => {
                tracing::error!("Internal error: {}", details);
                json!({ "error": message })
            }
        };

        let mut response = (status, axum::Json(body)).into_response();

        match &self {
            ApiError::RateLimited { retry_after, .. } => {
                // Round up so clients never retry a second early
                let secs = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);
                if let Ok(value) = HeaderValue::from_str(&secs.to_string()) {
                    response.headers_mut().insert(header::RETRY_AFTER, value);
                }
            }
            ApiError::Timeout { .. } => {
                response.extensions_mut().insert(ReleaseRateLimitSlot);
            }
            _ => {}
        }

        response
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ApiError::Validation("bad".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::timeout(Operation::Summary, Duration::from_secs(90)).status_code(),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            ApiError::provider(Operation::Podcast, "boom").status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError::FlashcardParse("eof".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_rate_limit_message_uses_window() {
        let err = ApiError::RateLimited {
            retry_after: Duration::from_secs(30),
            window: Duration::from_secs(900),
        };
        assert_eq!(
            err.to_string(),
            "Rate limit exceeded. Please try again in 15 minutes."
        );

        let short = ApiError::RateLimited {
            retry_after: Duration::from_secs(30),
            window: Duration::from_secs(45),
        };
        assert_eq!(
            short.to_string(),
            "Rate limit exceeded. Please try again in 1 minute."
        );
    }

    #[test]
    fn test_provider_message_names_operation() {
        let err = ApiError::provider(Operation::Flashcards, "quota");
        assert_eq!(
            err.to_string(),
            "Failed to generate flashcards. Please try again."
        );
    }

    #[test]
    fn test_rate_limited_response_has_retry_after() {
        let response = ApiError::RateLimited {
            retry_after: Duration::from_millis(1500),
            window: Duration::from_secs(900),
        }
        .into_response();

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers().get(header::RETRY_AFTER).unwrap(), "2");
    }

    #[test]
    fn test_timeout_response_marks_slot_for_release() {
        let response = ApiError::timeout(Operation::Podcast, Duration::from_secs(1)).into_response();
        assert!(response.extensions().get::<ReleaseRateLimitSlot>().is_some());

        let response = ApiError::provider(Operation::Podcast, "boom").into_response();
        assert!(response.extensions().get::<ReleaseRateLimitSlot>().is_none());
    }

    #[test]
    fn test_payload_too_large_and_request_timeout_statuses() {
        assert_eq!(
            ApiError::PayloadTooLarge("limit".into()).status_code(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(ApiError::RequestTimeout.status_code(), StatusCode::REQUEST_TIMEOUT);
        assert_eq!(
            ApiError::RequestTimeout.to_string(),
            "Request timed out. Please try again."
        );
    }
}
