use axum::extract::ConnectInfo;
use axum::http::{HeaderMap, Request};
use std::net::SocketAddr;

/// Identity used when no usable address is known
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Client address reported by a reverse proxy
///
/// Takes the first hop of `X-Forwarded-For`, then `X-Real-IP`.
///
/// # Examples
///
/// ```
/// use axum::http::HeaderMap;
/// use studyhive_server::utils::header_utils::forwarded_client_ip;
///
/// let mut headers = HeaderMap::new();
/// headers.insert("x-forwarded-for", "203.0.113.7, 10.0.0.1".parse().unwrap());
/// assert_eq!(forwarded_client_ip(&headers), Some("203.0.113.7".to_string()));
/// ```
pub fn forwarded_client_ip(headers: &HeaderMap) -> Option<String> {
    if let Some(forwarded) = headers.get("x-forwarded-for") {
        if let Ok(value) = forwarded.to_str() {
            if let Some(first) = value.split(',').map(str::trim).find(|hop| !hop.is_empty()) {
                return Some(first.to_string());
            }
        }
    }

    if let Some(real_ip) = headers.get("x-real-ip") {
        if let Ok(value) = real_ip.to_str() {
            let value = value.trim();
            if !value.is_empty() {
                return Some(value.to_string());
            }
        }
    }

    None
}

/// IP of the socket peer, present when the server runs with connect info
pub fn peer_ip<B>(req: &Request<B>) -> Option<String> {
    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
}

/// Per-client identity for rate limiting
///
/// Proxy headers are caller-controlled, so they are only consulted when
/// `trust_proxy_headers` is set (the server sits behind a proxy that
/// overwrites them). Otherwise the socket peer is the identity.
pub fn client_identity<B>(req: &Request<B>, trust_proxy_headers: bool) -> String {
    let forwarded = if trust_proxy_headers {
        forwarded_client_ip(req.headers())
    } else {
        None
    };

    forwarded
        .or_else(|| peer_ip(req))
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}
