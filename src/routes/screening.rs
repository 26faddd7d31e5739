use axum::{
    extract::{Query, State},
    response::{IntoResponse, Json},
};

use crate::{
    dto::call_dto::{QuestionsQuery, QuestionsResponse},
    error::Result,
    AppState,
};

#[utoipa::path(
    get,
    path = "/api/screening/questions",
    params(
        ("candidate_id" = Uuid, Query, description = "Candidate ID"),
        ("job_id" = Uuid, Query, description = "Job ID")
    ),
    responses(
        (status = 200, description = "Questions for this candidate and job", body = Json<QuestionsResponse>),
        (status = 404, description = "Candidate or job not found")
    )
)]
#[axum::debug_handler]
pub async fn generate_questions(
    State(state): State<AppState>,
    Query(query): Query<QuestionsQuery>,
) -> Result<impl IntoResponse> {
    let questions = state
        .question_service
        .generate(query.candidate_id, query.job_id)
        .await?;
    Ok(Json(QuestionsResponse {
        candidate_id: query.candidate_id,
        job_id: query.job_id,
        questions,
    }))
}
