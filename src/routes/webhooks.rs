use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    Json,
};
use chrono::Utc;
use serde_json::{json, Value};
use subtle::ConstantTimeEq;
use tracing::{info, warn};

use crate::{
    dto::webhook_dto::{CallStatusWebhook, InboundCallPayload, PostCallWebhook},
    error::{Error, Result},
    models::call::{CallStatus, InboundEvent},
    services::elevenlabs_service::map_provider_status,
    utils::signature::verify_signature,
    AppState,
};

pub const SIGNATURE_HEADER: &str = "elevenlabs-signature";
const POST_CALL_TRANSCRIPTION: &str = "post_call_transcription";
const UNKNOWN_CALLER_GREETING: &str = "Hello! Thank you for calling our recruitment line. \
     Are you calling about a recent job application? Could I have your name please?";

/// `pending` and `initiated` belong to the orchestrator; a webhook reporting
/// them carries no status change.
fn parse_status(raw: &str) -> Result<Option<CallStatus>> {
    let status = raw
        .parse::<CallStatus>()
        .ok()
        .or_else(|| map_provider_status(raw))
        .ok_or_else(|| Error::BadRequest(format!("unknown call status: {}", raw)))?;
    if !status.is_reportable() {
        info!(status = %status, "webhook status is not an event status, ignoring it");
        return Ok(None);
    }
    Ok(Some(status))
}

/// Call status callback. Stale and repeated events are accepted and ignored.
pub async fn call_status_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CallStatusWebhook>,
) -> Result<(StatusCode, Json<Value>)> {
    verify_secret(&headers, &state.config.webhook_secret)?;

    let status = payload
        .status
        .as_deref()
        .map(parse_status)
        .transpose()?
        .flatten();
    let event = InboundEvent {
        status,
        transcript: payload.transcript,
        summary: payload.summary,
        reason: payload.reason,
    };
    let call = match (payload.call_id, payload.conversation_id.as_deref()) {
        (Some(call_id), _) => state.call_service.apply_event(call_id, event).await?,
        (None, Some(conversation_id)) => {
            state
                .call_service
                .apply_event_by_conversation(conversation_id, event)
                .await?
        }
        (None, None) => {
            return Err(Error::BadRequest(
                "call_id or conversation_id is required".into(),
            ))
        }
    };

    Ok((
        StatusCode::OK,
        Json(json!({ "call_id": call.id, "status": call.status })),
    ))
}

/// Signed post-call webhook. The raw body is needed for the HMAC, so it is
/// parsed only after verification.
pub async fn post_call_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<Value>)> {
    let Some(secret) = state.config.elevenlabs_webhook_secret.as_deref() else {
        warn!("post-call webhook received but ELEVENLABS_WEBHOOK_SECRET is not set");
        return Err(Error::Unauthorized("webhook_signing_not_configured".into()));
    };
    let header = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| Error::Unauthorized("missing_signature".into()))?;
    verify_signature(header, secret, &body, Utc::now().timestamp()).map_err(|e| {
        warn!(error = %e, "post-call webhook signature rejected");
        Error::Unauthorized("invalid_signature".into())
    })?;

    let webhook: PostCallWebhook = serde_json::from_slice(&body)?;
    if webhook.event_type != POST_CALL_TRANSCRIPTION {
        info!(event_type = %webhook.event_type, "ignoring post-call webhook type");
        return Ok((StatusCode::OK, Json(json!({ "ignored": true }))));
    }

    let event = webhook.data.to_event();
    let call = match webhook.data.call_id() {
        Some(call_id) => state.call_service.apply_event(call_id, event).await?,
        None => {
            state
                .call_service
                .apply_event_by_conversation(&webhook.data.conversation_id, event)
                .await?
        }
    };

    Ok((
        StatusCode::OK,
        Json(json!({ "call_id": call.id, "status": call.status })),
    ))
}

/// Dynamic variables for a candidate phoning back, taken from the briefing
/// frozen on the most recent call to that number.
pub async fn inbound_call_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<InboundCallPayload>,
) -> Result<(StatusCode, Json<Value>)> {
    verify_secret(&headers, &state.config.webhook_secret)?;

    let body = match state.call_service.inbound_briefing(&payload.caller_id).await? {
        Some(call) => {
            info!(call_id = %call.id, "returning caller recognised");
            let mut variables = call.briefing.dynamic_variables(call.id);
            variables.insert("is_returning_call".into(), "true".into());
            json!({
                "type": "conversation_initiation_client_data",
                "dynamic_variables": variables,
                "conversation_config_override": {
                    "agent": { "first_message": call.briefing.callback_message() }
                }
            })
        }
        None => json!({
            "type": "conversation_initiation_client_data",
            "dynamic_variables": {
                "candidate_name": "there",
                "is_returning_call": "false"
            },
            "conversation_config_override": {
                "agent": { "first_message": UNKNOWN_CALLER_GREETING }
            }
        }),
    };
    Ok((StatusCode::OK, Json(body)))
}

fn verify_secret(headers: &HeaderMap, expected: &str) -> Result<()> {
    let Some(secret_hdr) = headers.get("x-webhook-secret") else {
        return Err(Error::Unauthorized("missing_webhook_secret".into()));
    };
    let provided = secret_hdr
        .to_str()
        .map_err(|_| Error::Unauthorized("invalid_secret_header".into()))?;
    if ConstantTimeEq::ct_eq(provided.as_bytes(), expected.as_bytes()).into() {
        Ok(())
    } else {
        Err(Error::Unauthorized("invalid_webhook_secret".into()))
    }
}
