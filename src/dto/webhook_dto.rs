use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::services::elevenlabs_service::ConversationPayload;

/// Generic call status callback, authenticated with the shared webhook secret.
/// Either `call_id` or `conversation_id` identifies the call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallStatusWebhook {
    pub call_id: Option<Uuid>,
    pub conversation_id: Option<String>,
    /// Our status names or the provider's (`in-progress`, `done`, ...).
    pub status: Option<String>,
    pub transcript: Option<String>,
    pub summary: Option<String>,
    pub reason: Option<String>,
}

/// Signed post-call webhook from the voice provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostCallWebhook {
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub event_timestamp: Option<i64>,
    pub data: ConversationPayload,
}

/// The provider asks for dynamic variables when a candidate phones back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundCallPayload {
    pub caller_id: String,
    pub agent_id: Option<String>,
    pub called_number: Option<String>,
    pub call_sid: Option<String>,
}
