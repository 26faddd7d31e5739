use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::database::CallFilter;
use crate::models::call::{Call, CallBriefing, CallStatus, InboundEvent, ScreeningQuestion};
use crate::services::call_service::CallRequest;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateCallPayload {
    pub candidate_id: Uuid,
    pub job_id: Uuid,
    #[validate(length(min = 7, max = 32))]
    pub phone_override: Option<String>,
    #[validate(length(min = 1))]
    pub agent_id: Option<String>,
    #[validate(length(min = 1))]
    pub agent_phone_number_id: Option<String>,
}

impl From<CreateCallPayload> for CallRequest {
    fn from(p: CreateCallPayload) -> Self {
        Self {
            candidate_id: p.candidate_id,
            job_id: p.job_id,
            phone_override: p.phone_override,
            agent_id: p.agent_id,
            agent_phone_number_id: p.agent_phone_number_id,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CallListQuery {
    pub candidate_id: Option<Uuid>,
    pub job_id: Option<Uuid>,
    pub status: Option<CallStatus>,
}

impl From<CallListQuery> for CallFilter {
    fn from(q: CallListQuery) -> Self {
        Self {
            candidate_id: q.candidate_id,
            job_id: q.job_id,
            status: q.status,
        }
    }
}

/// Operator-submitted status event, same contract as provider events.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CallEventPayload {
    pub status: Option<CallStatus>,
    pub transcript: Option<String>,
    pub summary: Option<String>,
    #[validate(length(max = 500))]
    pub reason: Option<String>,
}

impl From<CallEventPayload> for InboundEvent {
    fn from(p: CallEventPayload) -> Self {
        Self {
            status: p.status.filter(|s| s.is_reportable()),
            transcript: p.transcript,
            summary: p.summary,
            reason: p.reason,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallResponse {
    pub id: Uuid,
    pub candidate_id: Uuid,
    pub job_id: Uuid,
    pub status: CallStatus,
    pub phone: String,
    pub briefing: CallBriefing,
    pub questions_asked: Vec<ScreeningQuestion>,
    pub provider_call_id: Option<String>,
    pub provider_conversation_id: Option<String>,
    pub transcript: Option<String>,
    pub summary: Option<String>,
    pub failure_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Call> for CallResponse {
    fn from(c: Call) -> Self {
        Self {
            id: c.id,
            candidate_id: c.candidate_id,
            job_id: c.job_id,
            status: c.status,
            phone: c.phone,
            briefing: c.briefing,
            questions_asked: c.questions_asked,
            provider_call_id: c.provider_call_id,
            provider_conversation_id: c.provider_conversation_id,
            transcript: c.transcript,
            summary: c.summary,
            failure_reason: c.failure_reason,
            created_at: c.created_at,
            updated_at: c.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallListResponse {
    pub items: Vec<CallResponse>,
    pub total: usize,
}

impl From<Vec<Call>> for CallListResponse {
    fn from(calls: Vec<Call>) -> Self {
        let items: Vec<CallResponse> = calls.into_iter().map(CallResponse::from).collect();
        Self {
            total: items.len(),
            items,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionsQuery {
    pub candidate_id: Uuid,
    pub job_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionsResponse {
    pub candidate_id: Uuid,
    pub job_id: Uuid,
    pub questions: Vec<ScreeningQuestion>,
}
