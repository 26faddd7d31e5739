pub mod calls;
pub mod candidates;
pub mod connections;
pub mod health;
pub mod jobs;
pub mod screening;
pub mod sync;
pub mod webhooks;

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
    Router,
};
use tower_http::{compression::CompressionLayer, trace::TraceLayer};

use crate::middleware::{
    auth::require_bearer_auth,
    cors::api_cors,
    rate_limit::{rps_middleware, RateLimiter},
};
use crate::AppState;

const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

pub fn app_router(state: AppState) -> Router {
    let config = state.config.clone();

    let base_routes = Router::new().route("/health", get(health::health));

    let operator_api = Router::new()
        .route("/api/jobs", get(jobs::list_jobs).post(jobs::create_job))
        .route(
            "/api/jobs/:id",
            get(jobs::get_job)
                .patch(jobs::update_job)
                .delete(jobs::delete_job),
        )
        .route(
            "/api/candidates",
            get(candidates::list_candidates).post(candidates::create_candidate),
        )
        .route(
            "/api/candidates/:id",
            get(candidates::get_candidate).delete(candidates::delete_candidate),
        )
        .route(
            "/api/screening/questions",
            get(screening::generate_questions),
        )
        .route("/api/calls", get(calls::list_calls).post(calls::request_call))
        .route("/api/calls/:id", get(calls::get_call))
        .route("/api/calls/:id/refresh", post(calls::refresh_call))
        .route("/api/calls/:id/cancel", post(calls::cancel_call))
        .route("/api/calls/:id/events", post(calls::apply_call_event))
        .route(
            "/api/connections/link-token",
            post(connections::create_link_token),
        )
        .route(
            "/api/connections/exchange",
            post(connections::exchange_public_token),
        )
        .route(
            "/api/connections/sync",
            post(connections::sync_connections),
        )
        .route(
            "/api/connections/status",
            get(connections::connection_status),
        )
        .route(
            "/api/connections/:category",
            delete(connections::disconnect),
        )
        .route("/api/sync", post(sync::run_sync))
        .route("/api/sync/push", post(sync::push_candidate))
        .layer(axum::middleware::from_fn_with_state(
            config.clone(),
            require_bearer_auth,
        ))
        .layer(axum::middleware::from_fn_with_state(
            RateLimiter::new(config.api_rps),
            rps_middleware,
        ));

    let webhook_api = Router::new()
        .route(
            "/api/webhooks/call-status",
            post(webhooks::call_status_webhook),
        )
        .route(
            "/api/webhooks/elevenlabs/post-call",
            post(webhooks::post_call_webhook),
        )
        .route(
            "/api/webhooks/elevenlabs/inbound",
            post(webhooks::inbound_call_webhook),
        )
        .layer(axum::middleware::from_fn_with_state(
            RateLimiter::new(config.webhook_rps),
            rps_middleware,
        ));

    base_routes
        .merge(operator_api)
        .merge(webhook_api)
        .with_state(state)
        .layer(api_cors())
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
}
