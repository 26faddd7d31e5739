use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};

use crate::models::call::{CallStatus, InboundEvent};
use crate::services::gateway::{
    CallDetails, GatewayError, StartCallRequest, StartedCall, TelephonyProvider,
};

#[derive(Debug, Clone, Deserialize)]
struct OutboundCallResponse {
    #[serde(default)]
    success: bool,
    message: Option<String>,
    conversation_id: Option<String>,
    #[serde(rename = "callSid")]
    call_sid: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TranscriptTurn {
    pub role: String,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversationAnalysis {
    #[serde(default)]
    pub transcript_summary: Option<String>,
    #[serde(default)]
    pub call_successful: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversationInitiation {
    #[serde(default)]
    pub dynamic_variables: HashMap<String, serde_json::Value>,
}

/// Conversation as returned by the details endpoint and embedded in post-call webhooks.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversationPayload {
    pub conversation_id: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub transcript: Vec<TranscriptTurn>,
    #[serde(default)]
    pub analysis: Option<ConversationAnalysis>,
    #[serde(default)]
    pub conversation_initiation_client_data: Option<ConversationInitiation>,
}

impl ConversationPayload {
    /// Our call id, when the conversation was started with one in its dynamic variables.
    pub fn call_id(&self) -> Option<uuid::Uuid> {
        self.conversation_initiation_client_data
            .as_ref()?
            .dynamic_variables
            .get("call_id")?
            .as_str()?
            .parse()
            .ok()
    }

    pub fn to_event(&self) -> InboundEvent {
        let status = self
            .status
            .as_deref()
            .and_then(map_provider_status)
            .filter(|s| s.is_reportable());
        InboundEvent {
            status,
            transcript: render_transcript(&self.transcript),
            summary: self
                .analysis
                .as_ref()
                .and_then(|a| a.transcript_summary.clone())
                .filter(|s| !s.trim().is_empty()),
            reason: match status {
                Some(CallStatus::Failed) => Some("provider reported conversation failure".into()),
                _ => None,
            },
        }
    }
}

pub fn map_provider_status(status: &str) -> Option<CallStatus> {
    match status.trim().to_ascii_lowercase().as_str() {
        "initiated" => Some(CallStatus::Initiated),
        "in-progress" | "in_progress" | "processing" => Some(CallStatus::InProgress),
        "done" | "completed" => Some(CallStatus::Completed),
        "failed" => Some(CallStatus::Failed),
        _ => None,
    }
}

pub fn render_transcript(turns: &[TranscriptTurn]) -> Option<String> {
    let lines: Vec<String> = turns
        .iter()
        .filter_map(|turn| {
            let message = turn.message.as_deref()?.trim();
            if message.is_empty() {
                None
            } else {
                Some(format!("{}: {}", turn.role, message))
            }
        })
        .collect();
    if lines.is_empty() {
        None
    } else {
        Some(lines.join("\n"))
    }
}

#[derive(Clone)]
pub struct ElevenLabsService {
    client: Client,
    api_url: String,
    api_key: Option<String>,
    agent_id: Option<String>,
    phone_number_id: Option<String>,
}

impl ElevenLabsService {
    pub fn new(
        client: Client,
        api_url: String,
        api_key: Option<String>,
        agent_id: Option<String>,
        phone_number_id: Option<String>,
    ) -> Self {
        if api_key.is_some() {
            info!("ElevenLabs telephony enabled, api: {}", api_url);
        } else {
            info!("ElevenLabs telephony disabled (ELEVENLABS_API_KEY not set)");
        }
        Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            api_key,
            agent_id,
            phone_number_id,
        }
    }

    fn api_key(&self) -> Result<&str, GatewayError> {
        self.api_key
            .as_deref()
            .ok_or_else(|| GatewayError::NotConfigured("ELEVENLABS_API_KEY".into()))
    }
}

#[async_trait]
impl TelephonyProvider for ElevenLabsService {
    async fn start_call(&self, request: StartCallRequest) -> Result<StartedCall, GatewayError> {
        let api_key = self.api_key()?;
        let agent_id = request
            .agent_id
            .or_else(|| self.agent_id.clone())
            .ok_or_else(|| GatewayError::NotConfigured("ELEVENLABS_AGENT_ID".into()))?;
        let phone_number_id = request
            .agent_phone_number_id
            .or_else(|| self.phone_number_id.clone())
            .ok_or_else(|| GatewayError::NotConfigured("ELEVENLABS_PHONE_NUMBER_ID".into()))?;

        let payload = json!({
            "agent_id": agent_id,
            "agent_phone_number_id": phone_number_id,
            "to_number": request.to_number,
            "conversation_initiation_client_data": {
                "dynamic_variables": request.dynamic_variables,
                "conversation_config_override": {
                    "agent": { "first_message": request.first_message }
                }
            }
        });

        let response = self
            .client
            .post(format!("{}/convai/twilio/outbound-call", self.api_url))
            .header("xi-api-key", api_key)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = %status, "outbound call request rejected");
            return Err(GatewayError::from_status(status, body));
        }

        let data: OutboundCallResponse = response.json().await?;
        if !data.success {
            return Err(GatewayError::Rejected {
                status: status.as_u16(),
                message: data
                    .message
                    .unwrap_or_else(|| "provider declined the call".to_string()),
            });
        }

        Ok(StartedCall {
            provider_call_id: data.call_sid,
            provider_conversation_id: data.conversation_id,
        })
    }

    async fn get_call_details(&self, conversation_id: &str) -> Result<CallDetails, GatewayError> {
        let api_key = self.api_key()?;
        let response = self
            .client
            .get(format!("{}/convai/conversations/{}", self.api_url, conversation_id))
            .header("xi-api-key", api_key)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::from_status(status, body));
        }

        let conversation: ConversationPayload = response.json().await?;
        Ok(CallDetails {
            conversation_id: conversation.conversation_id.clone(),
            event: conversation.to_event(),
        })
    }
}
