use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::candidate_dto::{CandidateListResponse, CandidateResponse, CreateCandidatePayload},
    error::Result,
    AppState,
};

#[utoipa::path(
    post,
    path = "/api/candidates",
    request_body = CreateCandidatePayload,
    responses(
        (status = 201, description = "Candidate stored", body = Json<CandidateResponse>),
        (status = 400, description = "Invalid payload or phone number")
    )
)]
#[axum::debug_handler]
pub async fn create_candidate(
    State(state): State<AppState>,
    Json(payload): Json<CreateCandidatePayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let candidate = state.candidate_service.create_candidate(payload.into()).await?;
    Ok((StatusCode::CREATED, Json(CandidateResponse::from(candidate))))
}

#[utoipa::path(
    get,
    path = "/api/candidates",
    responses(
        (status = 200, description = "All candidates", body = Json<CandidateListResponse>)
    )
)]
#[axum::debug_handler]
pub async fn list_candidates(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let candidates = state.candidate_service.list_candidates().await?;
    Ok(Json(CandidateListResponse::from(candidates)))
}

#[utoipa::path(
    get,
    path = "/api/candidates/{id}",
    params(
        ("id" = Uuid, Path, description = "Candidate ID")
    ),
    responses(
        (status = 200, description = "Candidate found", body = Json<CandidateResponse>),
        (status = 404, description = "Candidate not found")
    )
)]
#[axum::debug_handler]
pub async fn get_candidate(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let candidate = state.candidate_service.get_candidate(id).await?;
    Ok(Json(CandidateResponse::from(candidate)))
}

#[utoipa::path(
    delete,
    path = "/api/candidates/{id}",
    params(
        ("id" = Uuid, Path, description = "Candidate ID")
    ),
    responses(
        (status = 204, description = "Candidate deleted"),
        (status = 404, description = "Candidate not found"),
        (status = 409, description = "A screening call for this candidate is still in flight")
    )
)]
#[axum::debug_handler]
pub async fn delete_candidate(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    state.candidate_service.delete_candidate(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
