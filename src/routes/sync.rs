use axum::{
    extract::{Query, State},
    response::{IntoResponse, Json},
    Extension,
};

use crate::{
    dto::connection_dto::{PushPayload, SyncQuery},
    error::Result,
    middleware::auth::Claims,
    AppState,
};

/// Per-record and per-category failures are reported in the body, not as an
/// error status.
#[utoipa::path(
    post,
    path = "/api/sync",
    params(
        ("category" = Option<String>, Query, description = "Sync only ats or crm")
    ),
    responses(
        (status = 200, description = "Sync report"),
        (status = 409, description = "A sync for this user and category is already running"),
        (status = 412, description = "Nothing is linked")
    )
)]
#[axum::debug_handler]
pub async fn run_sync(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<SyncQuery>,
) -> Result<impl IntoResponse> {
    let report = state.sync_service.sync(&claims.sub, query.category).await?;
    Ok(Json(report))
}

#[utoipa::path(
    post,
    path = "/api/sync/push",
    request_body = PushPayload,
    responses(
        (status = 200, description = "Candidate pushed, or already present in the CRM"),
        (status = 404, description = "Candidate not found"),
        (status = 409, description = "Push for this candidate already running"),
        (status = 412, description = "CRM not linked")
    )
)]
#[axum::debug_handler]
pub async fn push_candidate(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<PushPayload>,
) -> Result<impl IntoResponse> {
    let result = state
        .sync_service
        .push_candidate(&claims.sub, payload.candidate_id)
        .await?;
    Ok(Json(result))
}
