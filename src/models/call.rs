use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{candidate::Candidate, job::JobDescription};

/// Skills beyond this count are left out of the provider briefing.
const BRIEFING_SKILLS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallStatus {
    Pending,
    Initiated,
    InProgress,
    Completed,
    Failed,
}

impl CallStatus {
    pub const IN_FLIGHT: [CallStatus; 3] = [
        CallStatus::Pending,
        CallStatus::Initiated,
        CallStatus::InProgress,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            CallStatus::Pending => "pending",
            CallStatus::Initiated => "initiated",
            CallStatus::InProgress => "in_progress",
            CallStatus::Completed => "completed",
            CallStatus::Failed => "failed",
        }
    }

    /// Position along `pending -> initiated -> in_progress -> {completed|failed}`.
    pub fn rank(self) -> u8 {
        match self {
            CallStatus::Pending => 0,
            CallStatus::Initiated => 1,
            CallStatus::InProgress => 2,
            CallStatus::Completed | CallStatus::Failed => 3,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, CallStatus::Completed | CallStatus::Failed)
    }

    pub fn is_in_flight(self) -> bool {
        !self.is_terminal()
    }

    pub fn can_advance_to(self, next: CallStatus) -> bool {
        next.rank() > self.rank()
    }

    /// Statuses a provider event may report. `pending` and `initiated` are
    /// only ever set by the orchestrator.
    pub fn is_reportable(self) -> bool {
        matches!(
            self,
            CallStatus::InProgress | CallStatus::Completed | CallStatus::Failed
        )
    }
}

impl fmt::Display for CallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CallStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(CallStatus::Pending),
            "initiated" => Ok(CallStatus::Initiated),
            "in_progress" | "in-progress" => Ok(CallStatus::InProgress),
            "completed" => Ok(CallStatus::Completed),
            "failed" => Ok(CallStatus::Failed),
            other => Err(format!("unknown call status: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreeningQuestion {
    pub question: String,
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

/// Candidate and job fields copied when the call is created. The provider is
/// briefed from this snapshot only, so later edits to either record never
/// reach a call that is already underway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallBriefing {
    pub candidate_name: String,
    pub candidate_skills: Vec<String>,
    pub years_of_experience: Option<i32>,
    pub current_title: Option<String>,
    pub current_company: Option<String>,
    pub job_title: String,
    pub job_company: Option<String>,
}

impl CallBriefing {
    pub fn freeze(candidate: &Candidate, job: &JobDescription) -> Self {
        Self {
            candidate_name: candidate.full_name.clone(),
            candidate_skills: candidate
                .skills
                .iter()
                .take(BRIEFING_SKILLS)
                .cloned()
                .collect(),
            years_of_experience: candidate.years_of_experience,
            current_title: candidate.current_title.clone(),
            current_company: candidate.current_company.clone(),
            job_title: job.title.clone(),
            job_company: job.company.clone(),
        }
    }

    pub fn first_message(&self) -> String {
        format!(
            "Hi {}! This is a call regarding your application for the {} position. \
             I'm an AI assistant and I'll be asking you a few screening questions. \
             Is now a good time to talk?",
            self.candidate_name, self.job_title
        )
    }

    pub fn callback_message(&self) -> String {
        format!(
            "Hi {}! Thanks for returning our call about the {} position. \
             I'm ready to continue with your screening whenever you are. Shall we begin?",
            self.candidate_name, self.job_title
        )
    }

    pub fn dynamic_variables(&self, call_id: Uuid) -> BTreeMap<String, String> {
        let mut vars = BTreeMap::new();
        vars.insert("call_id".to_string(), call_id.to_string());
        vars.insert("candidate_name".to_string(), self.candidate_name.clone());
        vars.insert("job_title".to_string(), self.job_title.clone());
        if let Some(company) = &self.job_company {
            vars.insert("job_company".to_string(), company.clone());
        }
        if !self.candidate_skills.is_empty() {
            vars.insert(
                "candidate_skills".to_string(),
                self.candidate_skills.join(", "),
            );
        }
        if let Some(years) = self.years_of_experience {
            vars.insert("years_of_experience".to_string(), years.to_string());
        }
        if let Some(title) = &self.current_title {
            vars.insert("current_title".to_string(), title.clone());
        }
        if let Some(company) = &self.current_company {
            vars.insert("current_company".to_string(), company.clone());
        }
        vars
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Call {
    pub id: Uuid,
    pub candidate_id: Uuid,
    pub job_id: Uuid,
    pub status: CallStatus,
    /// Number dialed for this call; an override is never written back to the candidate.
    pub phone: String,
    pub briefing: CallBriefing,
    pub questions_asked: Vec<ScreeningQuestion>,
    pub provider_conversation_id: Option<String>,
    pub provider_call_id: Option<String>,
    pub transcript: Option<String>,
    pub summary: Option<String>,
    pub failure_reason: Option<String>,
    /// Set while a start request is outstanding with the provider.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_attempt_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewCall {
    pub candidate_id: Uuid,
    pub job_id: Uuid,
    pub phone: String,
    pub briefing: CallBriefing,
    pub questions_asked: Vec<ScreeningQuestion>,
}

/// A status report from the provider, whether pushed by webhook or fetched by polling.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InboundEvent {
    pub status: Option<CallStatus>,
    pub transcript: Option<String>,
    pub summary: Option<String>,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CallUpdate {
    /// A start request is about to go out. Only lands while `pending`.
    AttemptOpened,
    /// The outstanding start request failed and will be retried.
    AttemptClosed,
    Started {
        provider_call_id: Option<String>,
        provider_conversation_id: Option<String>,
    },
    StartFailed {
        reason: String,
    },
    /// Refused while a start attempt opened after `stale_before` is outstanding.
    Cancelled {
        stale_before: DateTime<Utc>,
    },
    Event(InboundEvent),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplyOutcome {
    pub status_changed: bool,
    pub details_changed: bool,
}

impl ApplyOutcome {
    pub fn is_noop(&self) -> bool {
        !self.status_changed && !self.details_changed
    }
}

impl Call {
    pub fn from_new(id: Uuid, new: NewCall, now: DateTime<Utc>) -> Self {
        Self {
            id,
            candidate_id: new.candidate_id,
            job_id: new.job_id,
            status: CallStatus::Pending,
            phone: new.phone,
            briefing: new.briefing,
            questions_asked: new.questions_asked,
            provider_conversation_id: None,
            provider_call_id: None,
            transcript: None,
            summary: None,
            failure_reason: None,
            start_attempt_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Applies one update. Status only ever moves forward; anything else
    /// leaves the call untouched and reports a no-op, which makes replays of
    /// the same event harmless.
    pub fn apply(&mut self, update: CallUpdate, now: DateTime<Utc>) -> ApplyOutcome {
        let mut outcome = ApplyOutcome::default();

        match update {
            CallUpdate::AttemptOpened => {
                if self.status == CallStatus::Pending {
                    self.start_attempt_at = Some(now);
                    outcome.details_changed = true;
                }
            }
            CallUpdate::AttemptClosed => {
                outcome.details_changed |= self.start_attempt_at.take().is_some();
            }
            CallUpdate::Started {
                provider_call_id,
                provider_conversation_id,
            } => {
                outcome.details_changed |= self.start_attempt_at.take().is_some();
                outcome.details_changed |= fill_once(&mut self.provider_call_id, provider_call_id);
                outcome.details_changed |=
                    fill_once(&mut self.provider_conversation_id, provider_conversation_id);
                if self.status == CallStatus::Pending {
                    self.status = CallStatus::Initiated;
                    outcome.status_changed = true;
                }
            }
            CallUpdate::StartFailed { reason } => {
                outcome.details_changed |= self.start_attempt_at.take().is_some();
                if self.status == CallStatus::Pending {
                    self.status = CallStatus::Failed;
                    self.failure_reason = Some(reason);
                    outcome.status_changed = true;
                }
            }
            CallUpdate::Cancelled { stale_before } => {
                if self.status == CallStatus::Pending && !self.start_attempt_open(stale_before) {
                    self.start_attempt_at = None;
                    self.status = CallStatus::Failed;
                    self.failure_reason = Some("cancelled".to_string());
                    outcome.status_changed = true;
                }
            }
            CallUpdate::Event(event) => {
                if let Some(next) = event.status.filter(|s| s.is_reportable()) {
                    if self.status.can_advance_to(next) {
                        self.status = next;
                        outcome.status_changed = true;
                        if next == CallStatus::Failed && self.failure_reason.is_none() {
                            self.failure_reason = Some(
                                event
                                    .reason
                                    .clone()
                                    .unwrap_or_else(|| "provider reported failure".to_string()),
                            );
                        }
                    }
                }
                outcome.details_changed |= extend_transcript(&mut self.transcript, event.transcript);
                outcome.details_changed |= fill_once(&mut self.summary, event.summary);
            }
        }

        if !outcome.is_noop() {
            self.updated_at = now;
        }
        outcome
    }

    pub fn start_attempt_open(&self, stale_before: DateTime<Utc>) -> bool {
        self.start_attempt_at.is_some_and(|at| at > stale_before)
    }
}

fn fill_once(slot: &mut Option<String>, incoming: Option<String>) -> bool {
    match (slot.as_ref(), incoming.filter(|v| !v.trim().is_empty())) {
        (None, Some(value)) => {
            *slot = Some(value);
            true
        }
        _ => false,
    }
}

/// Transcripts are append-only: accept a first value or a strict extension.
fn extend_transcript(slot: &mut Option<String>, incoming: Option<String>) -> bool {
    let Some(incoming) = incoming.filter(|t| !t.trim().is_empty()) else {
        return false;
    };
    match slot {
        None => {
            *slot = Some(incoming);
            true
        }
        Some(existing) if incoming.len() > existing.len() && incoming.starts_with(existing.as_str()) => {
            *existing = incoming;
            true
        }
        Some(_) => false,
    }
}
