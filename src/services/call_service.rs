use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::database::{CallFilter, Store};
use crate::error::{Error, Result};
use crate::models::call::{Call, CallBriefing, CallStatus, CallUpdate, InboundEvent, NewCall};
use crate::services::gateway::{StartCallRequest, TelephonyProvider};
use crate::services::question_service::generate_questions;
use crate::services::retry::RetryPolicy;
use crate::utils::phone::normalize_phone;

#[derive(Debug, Clone, Default)]
pub struct CallRequest {
    pub candidate_id: Uuid,
    pub job_id: Uuid,
    /// Dialed instead of the stored number for this call only.
    pub phone_override: Option<String>,
    pub agent_id: Option<String>,
    pub agent_phone_number_id: Option<String>,
}

/// Fallback agent settings when a request names none.
#[derive(Debug, Clone, Default)]
pub struct AgentDefaults {
    pub agent_id: Option<String>,
    pub agent_phone_number_id: Option<String>,
}

/// Slack on top of the attempt timeout before an opened start attempt is
/// treated as abandoned (process died mid-request).
const ABANDONED_ATTEMPT_GRACE: Duration = Duration::from_secs(30);

/// Drives each screening call from request to a terminal state.
#[derive(Clone)]
pub struct CallService {
    store: Arc<dyn Store>,
    telephony: Arc<dyn TelephonyProvider>,
    retry: RetryPolicy,
    defaults: AgentDefaults,
}

fn resolve_phone(phone_override: Option<&str>, stored: Option<&str>) -> Result<String> {
    let raw = phone_override
        .filter(|p| !p.trim().is_empty())
        .or(stored.filter(|p| !p.trim().is_empty()))
        .ok_or_else(|| Error::BadRequest("Candidate has no phone number and no override was given".into()))?;
    normalize_phone(raw).ok_or_else(|| Error::BadRequest(format!("invalid phone number: {}", raw)))
}

impl CallService {
    pub fn new(
        store: Arc<dyn Store>,
        telephony: Arc<dyn TelephonyProvider>,
        retry: RetryPolicy,
        defaults: AgentDefaults,
    ) -> Self {
        Self {
            store,
            telephony,
            retry,
            defaults,
        }
    }

    /// Validates, creates the call in `pending`, then starts it with the
    /// provider. Once the call row exists the result is always that call,
    /// possibly `failed` with a reason attached.
    pub async fn request_call(&self, request: CallRequest) -> Result<Call> {
        let candidate = self
            .store
            .get_candidate(request.candidate_id)
            .await?
            .ok_or_else(|| Error::NotFound("Candidate not found".into()))?;
        let job = self
            .store
            .get_job(request.job_id)
            .await?
            .ok_or_else(|| Error::NotFound("Job not found".into()))?;

        let phone = resolve_phone(request.phone_override.as_deref(), candidate.phone.as_deref())?;
        let agent_id = request
            .agent_id
            .or_else(|| self.defaults.agent_id.clone())
            .ok_or_else(|| Error::BadRequest("No agent_id given and none configured".into()))?;
        let agent_phone_number_id = request
            .agent_phone_number_id
            .or_else(|| self.defaults.agent_phone_number_id.clone())
            .ok_or_else(|| {
                Error::BadRequest("No agent_phone_number_id given and none configured".into())
            })?;

        let briefing = CallBriefing::freeze(&candidate, &job);
        let questions_asked = generate_questions(&candidate, &job);
        let call = Call::from_new(
            Uuid::new_v4(),
            NewCall {
                candidate_id: candidate.id,
                job_id: job.id,
                phone: phone.clone(),
                briefing,
                questions_asked,
            },
            Utc::now(),
        );
        self.store.create_call(&call).await?;
        info!(
            call_id = %call.id,
            candidate_id = %call.candidate_id,
            job_id = %call.job_id,
            "screening call created"
        );

        let start = StartCallRequest {
            to_number: phone,
            agent_id: Some(agent_id),
            agent_phone_number_id: Some(agent_phone_number_id),
            dynamic_variables: call.briefing.dynamic_variables(call.id),
            first_message: call.briefing.first_message(),
        };
        self.drive_start(call.id, start).await
    }

    async fn drive_start(&self, call_id: Uuid, request: StartCallRequest) -> Result<Call> {
        let mut attempt = 0u32;
        loop {
            attempt += 1;

            // Opening the attempt and checking for `pending` is one store
            // write, so a cancel either lands before it or is refused.
            let (current, _) = self
                .store
                .apply_call_update(call_id, CallUpdate::AttemptOpened)
                .await?;
            if current.status != CallStatus::Pending {
                info!(call_id = %call_id, status = %current.status, "call left pending, no further start attempts");
                return Ok(current);
            }

            match self.retry.attempt(self.telephony.start_call(request.clone())).await {
                Ok(started) => {
                    let (call, outcome) = self
                        .store
                        .apply_call_update(
                            call_id,
                            CallUpdate::Started {
                                provider_call_id: started.provider_call_id,
                                provider_conversation_id: started.provider_conversation_id,
                            },
                        )
                        .await?;
                    if outcome.status_changed {
                        info!(call_id = %call_id, attempt, "provider accepted call");
                    } else {
                        warn!(call_id = %call_id, status = %call.status, "provider accepted call after it moved on");
                    }
                    return Ok(call);
                }
                Err(e) if self.retry.should_retry(attempt, &e) => {
                    let delay = self.retry.delay_for(attempt);
                    warn!(
                        call_id = %call_id,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "start call failed, retrying"
                    );
                    self.store
                        .apply_call_update(call_id, CallUpdate::AttemptClosed)
                        .await?;
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    let reason = if e.is_transient() {
                        format!("retries exhausted after {} attempts: {}", attempt, e)
                    } else {
                        e.to_string()
                    };
                    error!(call_id = %call_id, attempt, error = %e, "start call failed");
                    let (call, _) = self
                        .store
                        .apply_call_update(call_id, CallUpdate::StartFailed { reason })
                        .await?;
                    return Ok(call);
                }
            }
        }
    }

    async fn load(&self, call_id: Uuid) -> Result<Call> {
        self.store
            .get_call(call_id)
            .await?
            .ok_or_else(|| Error::NotFound("Call not found".into()))
    }

    /// Applies a provider event. Non-forward events are logged and ignored.
    pub async fn apply_event(&self, call_id: Uuid, event: InboundEvent) -> Result<Call> {
        let reported = event.status;
        let (call, outcome) = self
            .store
            .apply_call_update(call_id, CallUpdate::Event(event))
            .await?;
        if outcome.is_noop() {
            info!(
                call_id = %call_id,
                current = %call.status,
                reported = ?reported,
                "inbound event ignored, nothing moved forward"
            );
        } else {
            info!(
                call_id = %call_id,
                status = %call.status,
                details_changed = outcome.details_changed,
                "inbound event applied"
            );
        }
        Ok(call)
    }

    pub async fn apply_event_by_conversation(
        &self,
        conversation_id: &str,
        event: InboundEvent,
    ) -> Result<Call> {
        let call = self
            .store
            .find_call_by_conversation(conversation_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("No call for conversation {}", conversation_id)))?;
        self.apply_event(call.id, event).await
    }

    /// Polls the provider and feeds the result through the event path.
    pub async fn refresh_call(&self, call_id: Uuid) -> Result<Call> {
        let call = self.load(call_id).await?;
        let conversation_id = call
            .provider_conversation_id
            .ok_or_else(|| Error::BadRequest("Call has no provider conversation yet".into()))?;

        let details = self
            .retry
            .run("get_call_details", || {
                self.telephony.get_call_details(&conversation_id)
            })
            .await
            .map_err(|(e, _)| Error::Gateway(e))?;
        self.apply_event(call_id, details.event).await
    }

    /// Only a `pending` call with no start request outstanding can be
    /// cancelled. Once the provider may have accepted the call it runs to
    /// completion.
    pub async fn cancel_call(&self, call_id: Uuid) -> Result<Call> {
        let stale_before = self.stale_attempt_cutoff();
        let (call, outcome) = self
            .store
            .apply_call_update(call_id, CallUpdate::Cancelled { stale_before })
            .await?;
        if !outcome.status_changed {
            let message = if call.status == CallStatus::Pending {
                "Call is being started with the provider and can no longer be cancelled".to_string()
            } else {
                format!("Call is {} and can no longer be cancelled", call.status)
            };
            return Err(Error::conflict(message, Some(call.id)));
        }
        info!(call_id = %call_id, "call cancelled");
        Ok(call)
    }

    fn stale_attempt_cutoff(&self) -> chrono::DateTime<Utc> {
        let window = self.retry.attempt_timeout + ABANDONED_ATTEMPT_GRACE;
        Utc::now() - chrono::Duration::from_std(window).unwrap_or_else(|_| chrono::Duration::days(1))
    }

    pub async fn get_call(&self, call_id: Uuid) -> Result<Call> {
        self.load(call_id).await
    }

    pub async fn list_calls(&self, filter: CallFilter) -> Result<Vec<Call>> {
        self.store.list_calls(&filter).await
    }

    /// Most recent call to the caller's number, used to personalize callbacks.
    pub async fn inbound_briefing(&self, caller_phone: &str) -> Result<Option<Call>> {
        let Some(phone) = normalize_phone(caller_phone) else {
            return Ok(None);
        };
        self.store.latest_call_to_phone(&phone).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemoryStore;
    use crate::models::{
        candidate::{Candidate, NewCandidate},
        job::{JobDescription, NewJob},
    };
    use crate::services::gateway::{GatewayError, MockTelephonyProvider, StartedCall};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn fast_retry() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
            multiplier: 2.0,
            attempt_timeout: Duration::from_secs(1),
        }
    }

    fn defaults() -> AgentDefaults {
        AgentDefaults {
            agent_id: Some("agent_1".into()),
            agent_phone_number_id: Some("phone_1".into()),
        }
    }

    async fn seed(store: &MemoryStore, phone: Option<&str>) -> (Candidate, JobDescription) {
        let now = Utc::now();
        let candidate = Candidate::from_new(
            Uuid::new_v4(),
            NewCandidate {
                full_name: "Ana Gomez".into(),
                phone: phone.map(str::to_string),
                skills: vec!["Go".into()],
                ..Default::default()
            },
            now,
        );
        let job = JobDescription::from_new(
            Uuid::new_v4(),
            NewJob {
                title: "Backend Engineer".into(),
                description: "Services".into(),
                ..Default::default()
            },
            now,
        );
        store.insert_candidate(&candidate).await.unwrap();
        store.insert_job(&job).await.unwrap();
        (candidate, job)
    }

    fn started() -> StartedCall {
        StartedCall {
            provider_call_id: Some("CA123".into()),
            provider_conversation_id: Some("conv_1".into()),
        }
    }

    fn service(store: Arc<MemoryStore>, telephony: MockTelephonyProvider) -> CallService {
        CallService::new(store, Arc::new(telephony), fast_retry(), defaults())
    }

    #[tokio::test]
    async fn request_call_reaches_initiated_with_frozen_briefing() {
        let store = Arc::new(MemoryStore::new());
        let (candidate, job) = seed(&store, Some("+15551234567")).await;

        let mut telephony = MockTelephonyProvider::new();
        telephony
            .expect_start_call()
            .withf(|req| {
                req.to_number == "+15551234567"
                    && req.dynamic_variables.get("candidate_name").map(String::as_str) == Some("Ana Gomez")
                    && req.dynamic_variables.contains_key("call_id")
            })
            .times(1)
            .returning(|_| Ok(started()));

        let calls = service(store.clone(), telephony);
        let call = calls
            .request_call(CallRequest {
                candidate_id: candidate.id,
                job_id: job.id,
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(call.status, CallStatus::Initiated);
        assert_eq!(call.provider_call_id.as_deref(), Some("CA123"));
        assert_eq!(call.provider_conversation_id.as_deref(), Some("conv_1"));
        assert!(!call.questions_asked.is_empty());
        assert_eq!(call.briefing.job_title, "Backend Engineer");
    }

    #[tokio::test]
    async fn missing_phone_is_rejected_before_anything_is_attempted() {
        let store = Arc::new(MemoryStore::new());
        let (candidate, job) = seed(&store, None).await;

        let mut telephony = MockTelephonyProvider::new();
        telephony.expect_start_call().times(0);

        let calls = service(store.clone(), telephony);
        let result = calls
            .request_call(CallRequest {
                candidate_id: candidate.id,
                job_id: job.id,
                ..Default::default()
            })
            .await;

        assert!(matches!(result, Err(Error::BadRequest(_))));
        assert!(store.list_calls(&CallFilter::default()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn phone_override_is_call_scoped() {
        let store = Arc::new(MemoryStore::new());
        let (candidate, job) = seed(&store, Some("+15551234567")).await;

        let mut telephony = MockTelephonyProvider::new();
        telephony
            .expect_start_call()
            .withf(|req| req.to_number == "+15559990000")
            .returning(|_| Ok(started()));

        let calls = service(store.clone(), telephony);
        let call = calls
            .request_call(CallRequest {
                candidate_id: candidate.id,
                job_id: job.id,
                phone_override: Some("+1 555 999 0000".into()),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(call.phone, "+15559990000");
        let stored = store.get_candidate(candidate.id).await.unwrap().unwrap();
        assert_eq!(stored.phone.as_deref(), Some("+15551234567"));
    }

    #[tokio::test]
    async fn transient_failures_are_retried_then_succeed() {
        let store = Arc::new(MemoryStore::new());
        let (candidate, job) = seed(&store, Some("+15551234567")).await;

        let attempts = Arc::new(AtomicUsize::new(0));
        let seen = attempts.clone();
        let mut telephony = MockTelephonyProvider::new();
        telephony.expect_start_call().times(3).returning(move |_| {
            if seen.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(GatewayError::Unavailable {
                    status: 503,
                    message: "busy".into(),
                })
            } else {
                Ok(started())
            }
        });

        let call = service(store, telephony)
            .request_call(CallRequest {
                candidate_id: candidate.id,
                job_id: job.id,
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(call.status, CallStatus::Initiated);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn exhausted_retries_leave_a_failed_call() {
        let store = Arc::new(MemoryStore::new());
        let (candidate, job) = seed(&store, Some("+15551234567")).await;

        let mut telephony = MockTelephonyProvider::new();
        telephony
            .expect_start_call()
            .times(3)
            .returning(|_| Err(GatewayError::Timeout));

        let call = service(store, telephony)
            .request_call(CallRequest {
                candidate_id: candidate.id,
                job_id: job.id,
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(call.status, CallStatus::Failed);
        let reason = call.failure_reason.unwrap();
        assert!(reason.starts_with("retries exhausted after 3 attempts"), "{reason}");
    }

    #[tokio::test]
    async fn terminal_failure_is_not_retried() {
        let store = Arc::new(MemoryStore::new());
        let (candidate, job) = seed(&store, Some("+15551234567")).await;

        let mut telephony = MockTelephonyProvider::new();
        telephony.expect_start_call().times(1).returning(|_| {
            Err(GatewayError::Rejected {
                status: 422,
                message: "invalid number".into(),
            })
        });

        let call = service(store, telephony)
            .request_call(CallRequest {
                candidate_id: candidate.id,
                job_id: job.id,
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(call.status, CallStatus::Failed);
        assert!(call.failure_reason.unwrap().contains("invalid number"));
    }

    #[tokio::test]
    async fn second_request_conflicts_with_the_in_flight_call() {
        let store = Arc::new(MemoryStore::new());
        let (candidate, job) = seed(&store, Some("+15551234567")).await;

        let mut telephony = MockTelephonyProvider::new();
        telephony.expect_start_call().times(1).returning(|_| Ok(started()));

        let calls = service(store, telephony);
        let request = CallRequest {
            candidate_id: candidate.id,
            job_id: job.id,
            ..Default::default()
        };
        let first = calls.request_call(request.clone()).await.unwrap();

        match calls.request_call(request).await {
            Err(Error::Conflict { existing_id, .. }) => assert_eq!(existing_id, Some(first.id)),
            other => panic!("expected conflict, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn events_move_forward_and_replays_are_ignored() {
        let store = Arc::new(MemoryStore::new());
        let (candidate, job) = seed(&store, Some("+15551234567")).await;

        let mut telephony = MockTelephonyProvider::new();
        telephony.expect_start_call().returning(|_| Ok(started()));
        let calls = service(store, telephony);
        let call = calls
            .request_call(CallRequest {
                candidate_id: candidate.id,
                job_id: job.id,
                ..Default::default()
            })
            .await
            .unwrap();

        let done = InboundEvent {
            status: Some(CallStatus::Completed),
            transcript: Some("agent: hi\nuser: hello".into()),
            ..Default::default()
        };
        let completed = calls.apply_event(call.id, done.clone()).await.unwrap();
        assert_eq!(completed.status, CallStatus::Completed);

        let replayed = calls.apply_event(call.id, done).await.unwrap();
        assert_eq!(replayed, completed);

        let late = calls
            .apply_event_by_conversation(
                "conv_1",
                InboundEvent {
                    status: Some(CallStatus::InProgress),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(late.status, CallStatus::Completed);
    }

    #[tokio::test]
    async fn refresh_applies_provider_details() {
        let store = Arc::new(MemoryStore::new());
        let (candidate, job) = seed(&store, Some("+15551234567")).await;

        let mut telephony = MockTelephonyProvider::new();
        telephony.expect_start_call().returning(|_| Ok(started()));
        telephony
            .expect_get_call_details()
            .withf(|id| id == "conv_1")
            .returning(|id| {
                Ok(crate::services::gateway::CallDetails {
                    conversation_id: id.to_string(),
                    event: InboundEvent {
                        status: Some(CallStatus::Completed),
                        summary: Some("Strong Go background".into()),
                        ..Default::default()
                    },
                })
            });

        let calls = service(store, telephony);
        let call = calls
            .request_call(CallRequest {
                candidate_id: candidate.id,
                job_id: job.id,
                ..Default::default()
            })
            .await
            .unwrap();

        let refreshed = calls.refresh_call(call.id).await.unwrap();
        assert_eq!(refreshed.status, CallStatus::Completed);
        assert_eq!(refreshed.summary.as_deref(), Some("Strong Go background"));
        assert_eq!(refreshed.transcript, None);
    }

    #[tokio::test]
    async fn cancel_stops_pending_start_loop() {
        let store = Arc::new(MemoryStore::new());
        let (candidate, job) = seed(&store, Some("+15551234567")).await;

        let mut telephony = MockTelephonyProvider::new();
        telephony
            .expect_start_call()
            .times(1)
            .returning(|_| Err(GatewayError::RateLimited));

        let retry = RetryPolicy {
            initial_delay: Duration::from_millis(300),
            max_delay: Duration::from_millis(300),
            ..fast_retry()
        };
        let calls = CallService::new(store.clone(), Arc::new(telephony), retry, defaults());

        let runner = calls.clone();
        let request = CallRequest {
            candidate_id: candidate.id,
            job_id: job.id,
            ..Default::default()
        };
        let handle = tokio::spawn(async move { runner.request_call(request).await });

        let call_id = loop {
            let pending = store.list_calls(&CallFilter::default()).await.unwrap();
            if let Some(call) = pending.first() {
                break call.id;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        calls.cancel_call(call_id).await.unwrap();

        let finished = handle.await.unwrap().unwrap();
        assert_eq!(finished.status, CallStatus::Failed);
        assert_eq!(finished.failure_reason.as_deref(), Some("cancelled"));
        assert!(matches!(
            calls.cancel_call(call_id).await,
            Err(Error::Conflict { .. })
        ));
    }

    async fn wait_for_call(store: &MemoryStore) -> Uuid {
        loop {
            let calls = store.list_calls(&CallFilter::default()).await.unwrap();
            if let Some(call) = calls.first() {
                return call.id;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn cancel_is_refused_while_the_provider_request_is_outstanding() {
        let store = Arc::new(MemoryStore::new());
        let (candidate, job) = seed(&store, Some("+15551234567")).await;

        let mut telephony = MockTelephonyProvider::new();
        telephony.expect_start_call().times(1).returning(|_| {
            std::thread::sleep(Duration::from_millis(150));
            Ok(started())
        });
        let calls = service(store.clone(), telephony);

        let runner = calls.clone();
        let request = CallRequest {
            candidate_id: candidate.id,
            job_id: job.id,
            ..Default::default()
        };
        let handle = tokio::spawn(async move { runner.request_call(request).await });

        let call_id = wait_for_call(&store).await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        match calls.cancel_call(call_id).await {
            Err(Error::Conflict { existing_id, .. }) => assert_eq!(existing_id, Some(call_id)),
            other => panic!("expected conflict, got {other:?}"),
        }

        let finished = handle.await.unwrap().unwrap();
        assert_eq!(finished.status, CallStatus::Initiated);
        assert_eq!(finished.failure_reason, None);
        assert_eq!(finished.provider_call_id.as_deref(), Some("CA123"));

        let live = calls
            .apply_event(
                call_id,
                InboundEvent {
                    status: Some(CallStatus::InProgress),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(live.status, CallStatus::InProgress);
    }

    #[tokio::test]
    async fn initiated_event_during_backoff_does_not_strand_the_call() {
        let store = Arc::new(MemoryStore::new());
        let (candidate, job) = seed(&store, Some("+15551234567")).await;

        let mut telephony = MockTelephonyProvider::new();
        telephony.expect_start_call().times(3).returning(|_| {
            Err(GatewayError::Unavailable {
                status: 503,
                message: "busy".into(),
            })
        });
        let retry = RetryPolicy {
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(100),
            ..fast_retry()
        };
        let calls = CallService::new(store.clone(), Arc::new(telephony), retry, defaults());

        let runner = calls.clone();
        let request = CallRequest {
            candidate_id: candidate.id,
            job_id: job.id,
            ..Default::default()
        };
        let handle = tokio::spawn(async move { runner.request_call(request).await });

        let call_id = wait_for_call(&store).await;
        tokio::time::sleep(Duration::from_millis(20)).await;
        let after_event = calls
            .apply_event(
                call_id,
                InboundEvent {
                    status: Some(CallStatus::Initiated),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(after_event.status, CallStatus::Pending);

        let finished = handle.await.unwrap().unwrap();
        assert_eq!(finished.status, CallStatus::Failed);
        assert!(finished.failure_reason.unwrap().starts_with("retries exhausted"));

        store.delete_candidate(candidate.id).await.unwrap();
    }

    #[tokio::test]
    async fn inbound_briefing_finds_latest_call_by_normalized_phone() {
        let store = Arc::new(MemoryStore::new());
        let (candidate, job) = seed(&store, Some("+15551234567")).await;

        let mut telephony = MockTelephonyProvider::new();
        telephony.expect_start_call().returning(|_| Ok(started()));
        let calls = service(store, telephony);
        let call = calls
            .request_call(CallRequest {
                candidate_id: candidate.id,
                job_id: job.id,
                ..Default::default()
            })
            .await
            .unwrap();

        let found = calls.inbound_briefing("+1 (555) 123-4567").await.unwrap();
        assert_eq!(found.map(|c| c.id), Some(call.id));
        assert!(calls.inbound_briefing("+1 555 000 0000").await.unwrap().is_none());
    }
}
