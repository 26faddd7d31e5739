use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

use crate::AppState;

/// Liveness plus which outbound integrations have credentials.
#[axum::debug_handler]
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let body = json!({
        "status": "ok",
        "telephony_configured": state.config.elevenlabs_api_key.is_some(),
        "aggregator_configured": state.config.merge_api_key.is_some(),
        "persistent_store": state.config.database_url.is_some(),
    });
    (StatusCode::OK, Json(body))
}
