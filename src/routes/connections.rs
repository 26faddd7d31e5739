use axum::{
    extract::{Path, State},
    response::{IntoResponse, Json},
    Extension,
};
use validator::Validate;

use crate::{
    dto::connection_dto::{ExchangePayload, LinkTokenPayload, LinkTokenResponse},
    error::Result,
    middleware::auth::Claims,
    models::connection::Category,
    AppState,
};

#[utoipa::path(
    post,
    path = "/api/connections/link-token",
    request_body = LinkTokenPayload,
    responses(
        (status = 200, description = "Link token for the aggregator's linking UI", body = Json<LinkTokenResponse>),
        (status = 502, description = "Aggregator error")
    )
)]
#[axum::debug_handler]
pub async fn create_link_token(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<LinkTokenPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let link_token = state
        .link_service
        .create_link_token(
            &claims.sub,
            &payload.organization_name,
            &payload.email_address,
            payload.categories,
        )
        .await?;
    Ok(Json(LinkTokenResponse { link_token }))
}

#[utoipa::path(
    post,
    path = "/api/connections/exchange",
    request_body = ExchangePayload,
    responses(
        (status = 200, description = "Connection linked"),
        (status = 400, description = "Missing public token"),
        (status = 502, description = "Aggregator error")
    )
)]
#[axum::debug_handler]
pub async fn exchange_public_token(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<ExchangePayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let record = state
        .link_service
        .exchange(&claims.sub, &payload.public_token)
        .await?;
    Ok(Json(record))
}

#[utoipa::path(
    post,
    path = "/api/connections/sync",
    responses(
        (status = 200, description = "Accounts re-linked from the aggregator's account list"),
        (status = 502, description = "Aggregator error")
    )
)]
#[axum::debug_handler]
pub async fn sync_connections(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse> {
    let report = state.link_service.sync_connections(&claims.sub).await?;
    Ok(Json(report))
}

#[utoipa::path(
    get,
    path = "/api/connections/status",
    responses(
        (status = 200, description = "Which categories are linked for the caller")
    )
)]
#[axum::debug_handler]
pub async fn connection_status(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse> {
    let status = state.registry.status(&claims.sub).await?;
    Ok(Json(status))
}

#[utoipa::path(
    delete,
    path = "/api/connections/{category}",
    params(
        ("category" = String, Path, description = "ats or crm")
    ),
    responses(
        (status = 200, description = "Connection marked unlinked"),
        (status = 404, description = "No such connection")
    )
)]
#[axum::debug_handler]
pub async fn disconnect(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(category): Path<Category>,
) -> Result<impl IntoResponse> {
    let record = state.registry.mark_unlinked(&claims.sub, category).await?;
    Ok(Json(record))
}
