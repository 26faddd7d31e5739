use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::call_dto::{
        CallEventPayload, CallListQuery, CallListResponse, CallResponse, CreateCallPayload,
    },
    error::Result,
    AppState,
};

/// Once the call row exists the response is that call, even if the provider
/// refused to start it (`status = failed`, `failure_reason` set).
#[utoipa::path(
    post,
    path = "/api/calls",
    request_body = CreateCallPayload,
    responses(
        (status = 201, description = "Call created and handed to the provider", body = Json<CallResponse>),
        (status = 400, description = "No phone number or agent configured"),
        (status = 404, description = "Candidate or job not found"),
        (status = 409, description = "A call for this candidate and job is already in flight")
    )
)]
#[axum::debug_handler]
pub async fn request_call(
    State(state): State<AppState>,
    Json(payload): Json<CreateCallPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let call = state.call_service.request_call(payload.into()).await?;
    Ok((StatusCode::CREATED, Json(CallResponse::from(call))))
}

#[utoipa::path(
    get,
    path = "/api/calls",
    params(
        ("candidate_id" = Option<Uuid>, Query, description = "Filter by candidate"),
        ("job_id" = Option<Uuid>, Query, description = "Filter by job"),
        ("status" = Option<String>, Query, description = "Filter by status")
    ),
    responses(
        (status = 200, description = "Matching calls, newest first", body = Json<CallListResponse>)
    )
)]
#[axum::debug_handler]
pub async fn list_calls(
    State(state): State<AppState>,
    Query(query): Query<CallListQuery>,
) -> Result<impl IntoResponse> {
    let calls = state.call_service.list_calls(query.into()).await?;
    Ok(Json(CallListResponse::from(calls)))
}

#[utoipa::path(
    get,
    path = "/api/calls/{id}",
    params(
        ("id" = Uuid, Path, description = "Call ID")
    ),
    responses(
        (status = 200, description = "Call found", body = Json<CallResponse>),
        (status = 404, description = "Call not found")
    )
)]
#[axum::debug_handler]
pub async fn get_call(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let call = state.call_service.get_call(id).await?;
    Ok(Json(CallResponse::from(call)))
}

#[utoipa::path(
    post,
    path = "/api/calls/{id}/refresh",
    params(
        ("id" = Uuid, Path, description = "Call ID")
    ),
    responses(
        (status = 200, description = "Provider details applied", body = Json<CallResponse>),
        (status = 400, description = "Call has no provider conversation yet"),
        (status = 502, description = "Provider error"),
        (status = 504, description = "Provider timed out")
    )
)]
#[axum::debug_handler]
pub async fn refresh_call(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let call = state.call_service.refresh_call(id).await?;
    Ok(Json(CallResponse::from(call)))
}

#[utoipa::path(
    post,
    path = "/api/calls/{id}/cancel",
    params(
        ("id" = Uuid, Path, description = "Call ID")
    ),
    responses(
        (status = 200, description = "Call cancelled", body = Json<CallResponse>),
        (status = 409, description = "Call is no longer pending")
    )
)]
#[axum::debug_handler]
pub async fn cancel_call(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let call = state.call_service.cancel_call(id).await?;
    Ok(Json(CallResponse::from(call)))
}

#[utoipa::path(
    post,
    path = "/api/calls/{id}/events",
    params(
        ("id" = Uuid, Path, description = "Call ID")
    ),
    request_body = CallEventPayload,
    responses(
        (status = 200, description = "Event applied or ignored as stale", body = Json<CallResponse>),
        (status = 404, description = "Call not found")
    )
)]
#[axum::debug_handler]
pub async fn apply_call_event(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CallEventPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let call = state.call_service.apply_event(id, payload.into()).await?;
    Ok(Json(CallResponse::from(call)))
}
