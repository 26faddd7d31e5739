use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::config::Config;

/// Operator identity. `sub` doubles as the user id that owns ATS/CRM
/// connections.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
    pub role: Option<String>,
}

fn reject(error: &str) -> Response {
    (StatusCode::UNAUTHORIZED, Json(json!({ "error": error }))).into_response()
}

pub async fn require_bearer_auth(
    State(config): State<Arc<Config>>,
    mut req: Request,
    next: Next,
) -> Response {
    let Some(auth_header) = req.headers().get(header::AUTHORIZATION) else {
        return reject("missing_authorization");
    };
    let Ok(auth_str) = auth_header.to_str() else {
        return reject("bad_authorization");
    };
    let Some(token) = auth_str.strip_prefix("Bearer ") else {
        return reject("unsupported_scheme");
    };

    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;
    match decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
        &validation,
    ) {
        Ok(data) if !data.claims.sub.trim().is_empty() => {
            req.extensions_mut().insert(data.claims);
            next.run(req).await
        }
        Ok(_) => reject("invalid_token"),
        Err(e) => {
            tracing::debug!(error = %e, "bearer token rejected");
            reject("invalid_token")
        }
    }
}
