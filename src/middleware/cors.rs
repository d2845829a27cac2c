use axum::http::{header, HeaderValue, Method};
use tower_http::cors::{Any, CorsLayer};

/// `*` allows any origin without credentials. Anything else is treated as
/// the single trusted frontend origin.
pub fn cors_layer(client_url: &str) -> CorsLayer {
    if client_url.trim() == "*" {
        return CorsLayer::new()
            .allow_methods(Any)
            .allow_headers(Any)
            .allow_origin(Any);
    }

    match client_url.trim_end_matches('/').parse::<HeaderValue>() {
        Ok(origin) => CorsLayer::new()
            .allow_origin(origin)
            .allow_credentials(true)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::PATCH,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT]),
        Err(e) => {
            tracing::warn!(error = %e, client_url, "CLIENT_URL is not a valid origin, CORS disabled");
            CorsLayer::new()
        }
    }
}
