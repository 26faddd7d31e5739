use axum::http::{header, HeaderName, Method};
use tower_http::cors::{Any, CorsLayer};

/// Operator UI runs on another origin; webhooks are server to server.
pub fn api_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            HeaderName::from_static("x-webhook-secret"),
        ])
}
