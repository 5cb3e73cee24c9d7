use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::DashMap;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::ApiError;
use crate::utils::header_utils::client_identity;

/// Configuration for rate limiting
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Requests allowed per client inside one window
    pub max_requests: u32,
    /// Length of the trailing window
    pub window: Duration,
    /// Key clients on `X-Forwarded-For`/`X-Real-IP` instead of the peer
    /// address. Only safe behind a proxy that overwrites those headers.
    pub trust_proxy_headers: bool,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 10,
            window: Duration::from_secs(15 * 60),
            trust_proxy_headers: false,
        }
    }
}

/// Response extension asking the rate-limit middleware to hand the request's
/// slot back to the client. Set on provider timeouts.
#[derive(Debug, Clone, Copy)]
pub struct ReleaseRateLimitSlot;

/// Sliding-window limiter keyed by client identity
///
/// Each client keeps the instants of its accepted requests inside the
/// trailing window. Check-and-record runs under the DashMap shard lock for
/// that key, so concurrent requests from one client cannot both take the
/// last slot.
#[derive(Clone)]
pub struct SlidingWindowLimiter {
    windows: Arc<DashMap<String, VecDeque<Instant>>>,
    config: RateLimitConfig,
}

impl SlidingWindowLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            windows: Arc::new(DashMap::new()),
            config,
        }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Record a request for `client` if it is under the limit
    ///
    /// Rejected requests are not recorded; the error carries the time until
    /// the oldest entry leaves the window.
    pub fn check(&self, client: &str) -> Result<(), Duration> {
        self.check_at(client, Instant::now())
    }

    pub fn check_at(&self, client: &str, now: Instant) -> Result<(), Duration> {
        let window = self.config.window;
        let mut entry = self.windows.entry(client.to_string()).or_default();
        let timestamps = entry.value_mut();

        while let Some(&oldest) = timestamps.front() {
            if now.saturating_duration_since(oldest) >= window {
                timestamps.pop_front();
            } else {
                break;
            }
        }

        if timestamps.len() >= self.config.max_requests as usize {
            let wait = timestamps
                .front()
                .map(|&oldest| (oldest + window).saturating_duration_since(now))
                .unwrap_or(window);
            return Err(wait);
        }

        timestamps.push_back(now);
        Ok(())
    }

    /// Give back the most recent slot recorded for `client`
    pub fn release(&self, client: &str) {
        if let Some(mut entry) = self.windows.get_mut(client) {
            entry.value_mut().pop_back();
        }
    }

    /// Drop clients whose every entry has aged out of the window
    pub fn prune_idle(&self) -> usize {
        self.prune_idle_at(Instant::now())
    }

    pub fn prune_idle_at(&self, now: Instant) -> usize {
        let window = self.config.window;
        let before = self.windows.len();
        self.windows.retain(|_, timestamps| {
            timestamps
                .back()
                .is_some_and(|&newest| now.saturating_duration_since(newest) < window)
        });
        before.saturating_sub(self.windows.len())
    }

    /// Number of clients currently tracked
    pub fn tracked_clients(&self) -> usize {
        self.windows.len()
    }

    /// Requests currently counted against `client`
    pub fn in_window(&self, client: &str) -> usize {
        self.windows.get(client).map(|w| w.len()).unwrap_or(0)
    }
}

/// Periodically evict idle clients so the map does not grow without bound
pub fn spawn_idle_pruner(limiter: SlidingWindowLimiter) -> tokio::task::JoinHandle<()> {
    let period = limiter.config.window;
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        // First tick completes immediately; nothing to prune yet
        interval.tick().await;
        loop {
            interval.tick().await;
            let removed = limiter.prune_idle();
            if removed > 0 {
                tracing::debug!(removed = removed, "Pruned idle rate-limit entries");
            }
        }
    })
}

/// Middleware to enforce the per-client sliding window
pub async fn rate_limit_middleware(
    State(limiter): State<SlidingWindowLimiter>,
    request: Request,
    next: Next,
) -> Response {
    let client = client_identity(&request, limiter.config.trust_proxy_headers);

    match limiter.check(&client) {
        Ok(()) => {
            let response = next.run(request).await;
            if response.extensions().get::<ReleaseRateLimitSlot>().is_some() {
                limiter.release(&client);
                tracing::debug!(client = %client, "Released rate-limit slot after timeout");
            }
            response
        }
        Err(retry_after) => {
            tracing::warn!(
                client = %client,
                retry_after_secs = retry_after.as_secs(),
                "Rate limit exceeded"
            );

            ApiError::RateLimited {
                retry_after,
                window: limiter.config.window,
            }
            .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(max_requests: u32, window_secs: u64) -> SlidingWindowLimiter {
        SlidingWindowLimiter::new(RateLimitConfig {
            max_requests,
            window: Duration::from_secs(window_secs),
            ..RateLimitConfig::default()
        })
    }

    #[test]
    fn test_default_config() {
        let config = RateLimitConfig::default();
        assert_eq!(config.max_requests, 10);
        assert_eq!(config.window, Duration::from_secs(900));
        assert!(!config.trust_proxy_headers);
    }

    #[test]
    fn test_allows_up_to_max_then_rejects() {
        let limiter = limiter(10, 900);
        let now = Instant::now();

        for i in 0..10 {
            assert!(
                limiter.check_at("client", now + Duration::from_secs(i)).is_ok(),
                "Request {} should be allowed",
                i
            );
        }

        let result = limiter.check_at("client", now + Duration::from_secs(10));
        assert_eq!(result, Err(Duration::from_secs(890)));
    }

    #[test]
    fn test_rejected_requests_are_not_recorded() {
        let limiter = limiter(2, 60);
        let now = Instant::now();

        assert!(limiter.check_at("c", now).is_ok());
        assert!(limiter.check_at("c", now).is_ok());
        for _ in 0..5 {
            assert!(limiter.check_at("c", now).is_err());
        }
        assert_eq!(limiter.in_window("c"), 2);
    }

    #[test]
    fn test_allows_again_after_window() {
        let limiter = limiter(10, 900);
        let now = Instant::now();

        for _ in 0..10 {
            assert!(limiter.check_at("client", now).is_ok());
        }
        assert!(limiter.check_at("client", now).is_err());

        let later = now + Duration::from_secs(900);
        assert!(limiter.check_at("client", later).is_ok());
        assert_eq!(limiter.in_window("client"), 1);
    }

    #[test]
    fn test_window_slides() {
        let limiter = limiter(2, 10);
        let now = Instant::now();

        assert!(limiter.check_at("c", now).is_ok());
        assert!(limiter.check_at("c", now + Duration::from_secs(5)).is_ok());
        assert!(limiter.check_at("c", now + Duration::from_secs(9)).is_err());
        // First entry expired, second still counts
        assert!(limiter.check_at("c", now + Duration::from_secs(10)).is_ok());
        assert!(limiter.check_at("c", now + Duration::from_secs(11)).is_err());
    }

    #[test]
    fn test_clients_are_independent() {
        let limiter = limiter(1, 60);
        let now = Instant::now();

        assert!(limiter.check_at("a", now).is_ok());
        assert!(limiter.check_at("a", now).is_err());
        assert!(limiter.check_at("b", now).is_ok());
        assert_eq!(limiter.tracked_clients(), 2);
    }

    #[test]
    fn test_release_frees_slot() {
        let limiter = limiter(1, 60);
        let now = Instant::now();

        assert!(limiter.check_at("c", now).is_ok());
        assert!(limiter.check_at("c", now).is_err());
        limiter.release("c");
        assert!(limiter.check_at("c", now).is_ok());
    }

    #[test]
    fn test_release_unknown_client_is_noop() {
        let limiter = limiter(1, 60);
        limiter.release("nobody");
        assert_eq!(limiter.tracked_clients(), 0);
    }

    #[test]
    fn test_prune_idle() {
        let limiter = limiter(5, 60);
        let now = Instant::now();

        assert!(limiter.check_at("old", now).is_ok());
        assert!(limiter.check_at("fresh", now + Duration::from_secs(50)).is_ok());

        let removed = limiter.prune_idle_at(now + Duration::from_secs(70));
        assert_eq!(removed, 1);
        assert_eq!(limiter.in_window("old"), 0);
        assert_eq!(limiter.in_window("fresh"), 1);
    }

    #[test]
    fn test_concurrent_checks_never_exceed_limit() {
        let limiter = limiter(10, 900);
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let limiter = limiter.clone();
                std::thread::spawn(move || {
                    (0..10).filter(|_| limiter.check("shared").is_ok()).count()
                })
            })
            .collect();

        let allowed: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(allowed, 10);
    }
}
