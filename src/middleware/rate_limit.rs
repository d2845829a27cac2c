use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use axum::body::Body;
use axum::extract::{ConnectInfo, State};
use axum::http::{header, HeaderMap, Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Json, Response};
use serde_json::json;

/// Requests with no known peer address share this bucket.
const ANONYMOUS: &str = "anonymous";

#[derive(Debug)]
struct Window {
    start: Instant,
    count: u32,
}

/// Fixed-window limiter, one window per client address.
#[derive(Clone, Debug)]
pub struct RateLimiter {
    max: u32,
    window_len: Duration,
    trust_proxy_headers: bool,
    clients: Arc<Mutex<HashMap<String, Window>>>,
}

impl RateLimiter {
    pub fn new(max: u32, window_len: Duration) -> Self {
        Self {
            max: max.max(1),
            window_len,
            trust_proxy_headers: false,
            clients: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Key clients on the forwarding headers instead of the socket peer.
    pub fn trust_proxy_headers(mut self, trust: bool) -> Self {
        self.trust_proxy_headers = trust;
        self
    }

    /// Counts one request for `client`. On refusal returns how long until
    /// its window reopens.
    fn check(&self, client: &str) -> Result<(), Duration> {
        let mut clients = self.clients.lock().unwrap_or_else(PoisonError::into_inner);
        let now = Instant::now();

        if clients.len() > 10_000 {
            let window_len = self.window_len;
            clients.retain(|_, w| now.duration_since(w.start) < window_len);
        }

        let window = clients.entry(client.to_string()).or_insert(Window {
            start: now,
            count: 0,
        });
        let elapsed = now.duration_since(window.start);
        if elapsed >= self.window_len {
            window.start = now;
            window.count = 0;
        }
        if window.count < self.max {
            window.count += 1;
            Ok(())
        } else {
            Err(self.window_len.saturating_sub(now.duration_since(window.start)))
        }
    }
}

fn forwarded_for(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .or_else(|| {
            headers
                .get("x-real-ip")
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
        })
}

/// Forwarding headers are client-controlled, so they only count when a
/// trusted proxy sets them. Otherwise the socket peer is the key.
fn client_key(headers: &HeaderMap, peer: Option<SocketAddr>, trust_proxy_headers: bool) -> String {
    if trust_proxy_headers {
        if let Some(forwarded) = forwarded_for(headers) {
            return forwarded.to_string();
        }
    }
    peer.map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| ANONYMOUS.to_string())
}

pub async fn rate_limit_middleware(
    State(limiter): State<RateLimiter>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let peer = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let client = client_key(req.headers(), peer, limiter.trust_proxy_headers);
    if let Err(retry_after) = limiter.check(&client) {
        tracing::debug!(client = %client, "rate limit exceeded");
        return (
            StatusCode::TOO_MANY_REQUESTS,
            [(header::RETRY_AFTER, retry_after.as_secs().max(1).to_string())],
            Json(json!({"error": "Too many requests, please try again later"})),
        )
            .into_response();
    }
    next.run(req).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn blocks_after_max_within_window() {
        let limiter = RateLimiter::new(2, Duration::from_secs(60));
        assert!(limiter.check("a").is_ok());
        assert!(limiter.check("a").is_ok());
        let wait = limiter.check("a").unwrap_err();
        assert!(wait <= Duration::from_secs(60));
    }

    #[test]
    fn clients_are_counted_separately() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60));
        assert!(limiter.check("a").is_ok());
        assert!(limiter.check("b").is_ok());
        assert!(limiter.check("a").is_err());
    }

    #[test]
    fn window_resets() {
        let limiter = RateLimiter::new(1, Duration::from_millis(10));
        assert!(limiter.check("a").is_ok());
        assert!(limiter.check("a").is_err());
        std::thread::sleep(Duration::from_millis(20));
        assert!(limiter.check("a").is_ok());
    }

    fn forwarded_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", HeaderValue::from_static("10.0.0.9"));
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.7, 10.0.0.1"),
        );
        headers
    }

    #[test]
    fn untrusted_forwarding_headers_are_ignored() {
        let peer: SocketAddr = "198.51.100.4:52000".parse().unwrap();
        let headers = forwarded_headers();

        assert_eq!(client_key(&headers, Some(peer), false), "198.51.100.4");
        assert_eq!(client_key(&headers, None, false), ANONYMOUS);
    }

    #[test]
    fn rotating_forwarded_for_does_not_reset_the_window() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60));
        let peer: SocketAddr = "198.51.100.4:52000".parse().unwrap();

        for spoofed in ["1.1.1.1", "2.2.2.2"] {
            let mut headers = HeaderMap::new();
            headers.insert("x-forwarded-for", HeaderValue::from_static(spoofed));
            let key = client_key(&headers, Some(peer), limiter.trust_proxy_headers);
            let allowed = limiter.check(&key).is_ok();
            assert_eq!(allowed, spoofed == "1.1.1.1");
        }
    }

    #[test]
    fn trusted_proxy_supplies_the_client_address() {
        let peer: SocketAddr = "10.0.0.1:443".parse().unwrap();
        let mut headers = forwarded_headers();
        assert_eq!(client_key(&headers, Some(peer), true), "203.0.113.7");

        headers.remove("x-forwarded-for");
        assert_eq!(client_key(&headers, Some(peer), true), "10.0.0.9");

        headers.remove("x-real-ip");
        assert_eq!(client_key(&headers, Some(peer), true), "10.0.0.1");
    }
}
