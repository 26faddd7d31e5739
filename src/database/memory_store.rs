use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::database::store::{CallFilter, Store};
use crate::error::{Error, Result};
use crate::models::{
    call::{ApplyOutcome, Call, CallUpdate},
    candidate::Candidate,
    connection::{Category, ConnectionRecord},
    correlation::{Correlation, EntityKind},
    job::JobDescription,
};

type CorrelationKey = (Category, EntityKind, String);

#[derive(Default)]
struct Inner {
    candidates: HashMap<Uuid, Candidate>,
    jobs: HashMap<Uuid, JobDescription>,
    calls: HashMap<Uuid, Call>,
    correlations: HashMap<CorrelationKey, Correlation>,
    connections: HashMap<(String, Category), ConnectionRecord>,
}

impl Inner {
    fn in_flight_call_where(&self, pred: impl Fn(&Call) -> bool) -> Option<Uuid> {
        self.calls
            .values()
            .filter(|c| c.status.is_in_flight() && pred(c))
            .min_by_key(|c| c.created_at)
            .map(|c| c.id)
    }

    fn drop_correlations(&mut self, entity: EntityKind, local_id: Uuid) {
        self.correlations
            .retain(|(_, kind, _), c| !(*kind == entity && c.local_id == local_id));
    }
}

/// Process-local store. Every operation runs under one lock, which gives the
/// same atomicity the PostgreSQL store gets from its constraints and row locks.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn newest_first<T>(mut items: Vec<T>, key: impl Fn(&T) -> (DateTime<Utc>, Uuid)) -> Vec<T> {
    items.sort_by(|a, b| key(b).cmp(&key(a)));
    items
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_candidate(&self, candidate: &Candidate) -> Result<()> {
        let mut inner = self.inner.lock().await;
        if inner.candidates.contains_key(&candidate.id) {
            return Err(Error::conflict("Candidate already exists", Some(candidate.id)));
        }
        inner.candidates.insert(candidate.id, candidate.clone());
        Ok(())
    }

    async fn update_candidate(&self, candidate: &Candidate) -> Result<()> {
        let mut inner = self.inner.lock().await;
        match inner.candidates.get_mut(&candidate.id) {
            Some(existing) => {
                *existing = candidate.clone();
                Ok(())
            }
            None => Err(Error::NotFound("Candidate not found".into())),
        }
    }

    async fn get_candidate(&self, id: Uuid) -> Result<Option<Candidate>> {
        Ok(self.inner.lock().await.candidates.get(&id).cloned())
    }

    async fn list_candidates(&self) -> Result<Vec<Candidate>> {
        let items = self.inner.lock().await.candidates.values().cloned().collect();
        Ok(newest_first(items, |c: &Candidate| (c.created_at, c.id)))
    }

    async fn delete_candidate(&self, id: Uuid) -> Result<()> {
        let mut inner = self.inner.lock().await;
        if !inner.candidates.contains_key(&id) {
            return Err(Error::NotFound("Candidate not found".into()));
        }
        if let Some(call_id) = inner.in_flight_call_where(|c| c.candidate_id == id) {
            return Err(Error::conflict(
                "Candidate has a screening call in flight",
                Some(call_id),
            ));
        }
        inner.candidates.remove(&id);
        inner.drop_correlations(EntityKind::Candidate, id);
        Ok(())
    }

    async fn insert_job(&self, job: &JobDescription) -> Result<()> {
        let mut inner = self.inner.lock().await;
        if inner.jobs.contains_key(&job.id) {
            return Err(Error::conflict("Job already exists", Some(job.id)));
        }
        inner.jobs.insert(job.id, job.clone());
        Ok(())
    }

    async fn update_job(&self, job: &JobDescription) -> Result<()> {
        let mut inner = self.inner.lock().await;
        match inner.jobs.get_mut(&job.id) {
            Some(existing) => {
                *existing = job.clone();
                Ok(())
            }
            None => Err(Error::NotFound("Job not found".into())),
        }
    }

    async fn get_job(&self, id: Uuid) -> Result<Option<JobDescription>> {
        Ok(self.inner.lock().await.jobs.get(&id).cloned())
    }

    async fn list_jobs(&self) -> Result<Vec<JobDescription>> {
        let items = self.inner.lock().await.jobs.values().cloned().collect();
        Ok(newest_first(items, |j: &JobDescription| (j.created_at, j.id)))
    }

    async fn delete_job(&self, id: Uuid) -> Result<()> {
        let mut inner = self.inner.lock().await;
        if !inner.jobs.contains_key(&id) {
            return Err(Error::NotFound("Job not found".into()));
        }
        if let Some(call_id) = inner.in_flight_call_where(|c| c.job_id == id) {
            return Err(Error::conflict(
                "Job has a screening call in flight",
                Some(call_id),
            ));
        }
        inner.jobs.remove(&id);
        inner.drop_correlations(EntityKind::Job, id);
        Ok(())
    }

    async fn create_call(&self, call: &Call) -> Result<()> {
        let mut inner = self.inner.lock().await;
        if let Some(existing) = inner.in_flight_call_where(|c| {
            c.candidate_id == call.candidate_id && c.job_id == call.job_id
        }) {
            return Err(Error::conflict(
                "A screening call is already in flight for this candidate and job",
                Some(existing),
            ));
        }
        inner.calls.insert(call.id, call.clone());
        Ok(())
    }

    async fn get_call(&self, id: Uuid) -> Result<Option<Call>> {
        Ok(self.inner.lock().await.calls.get(&id).cloned())
    }

    async fn find_call_by_conversation(&self, conversation_id: &str) -> Result<Option<Call>> {
        Ok(self
            .inner
            .lock()
            .await
            .calls
            .values()
            .find(|c| c.provider_conversation_id.as_deref() == Some(conversation_id))
            .cloned())
    }

    async fn latest_call_to_phone(&self, phone: &str) -> Result<Option<Call>> {
        Ok(self
            .inner
            .lock()
            .await
            .calls
            .values()
            .filter(|c| c.phone == phone)
            .max_by_key(|c| (c.created_at, c.id))
            .cloned())
    }

    async fn list_calls(&self, filter: &CallFilter) -> Result<Vec<Call>> {
        let items = self
            .inner
            .lock()
            .await
            .calls
            .values()
            .filter(|c| filter.matches(c))
            .cloned()
            .collect();
        Ok(newest_first(items, |c: &Call| (c.created_at, c.id)))
    }

    async fn apply_call_update(
        &self,
        id: Uuid,
        update: CallUpdate,
    ) -> Result<(Call, ApplyOutcome)> {
        let mut inner = self.inner.lock().await;
        let call = inner
            .calls
            .get_mut(&id)
            .ok_or_else(|| Error::NotFound("Call not found".into()))?;
        let outcome = call.apply(update, Utc::now());
        Ok((call.clone(), outcome))
    }

    async fn find_correlation(
        &self,
        category: Category,
        entity: EntityKind,
        remote_id: &str,
    ) -> Result<Option<Uuid>> {
        Ok(self
            .inner
            .lock()
            .await
            .correlations
            .get(&(category, entity, remote_id.to_string()))
            .map(|c| c.local_id))
    }

    async fn find_remote_id(
        &self,
        category: Category,
        entity: EntityKind,
        local_id: Uuid,
    ) -> Result<Option<String>> {
        Ok(self
            .inner
            .lock()
            .await
            .correlations
            .values()
            .filter(|c| c.category == category && c.entity == entity && c.local_id == local_id)
            .min_by_key(|c| c.created_at)
            .map(|c| c.remote_id.clone()))
    }

    async fn delete_correlation(
        &self,
        category: Category,
        entity: EntityKind,
        remote_id: &str,
    ) -> Result<()> {
        self.inner
            .lock()
            .await
            .correlations
            .remove(&(category, entity, remote_id.to_string()));
        Ok(())
    }

    async fn save_correlation(&self, correlation: &Correlation) -> Result<()> {
        let key = (
            correlation.category,
            correlation.entity,
            correlation.remote_id.clone(),
        );
        self.inner
            .lock()
            .await
            .correlations
            .insert(key, correlation.clone());
        Ok(())
    }

    async fn get_connection(
        &self,
        user_id: &str,
        category: Category,
    ) -> Result<Option<ConnectionRecord>> {
        Ok(self
            .inner
            .lock()
            .await
            .connections
            .get(&(user_id.to_string(), category))
            .cloned())
    }

    async fn list_connections(&self, user_id: &str) -> Result<Vec<ConnectionRecord>> {
        let mut items: Vec<ConnectionRecord> = self
            .inner
            .lock()
            .await
            .connections
            .values()
            .filter(|c| c.user_id == user_id)
            .cloned()
            .collect();
        items.sort_by_key(|c| c.category);
        Ok(items)
    }

    async fn upsert_connection(&self, record: &ConnectionRecord) -> Result<()> {
        let mut inner = self.inner.lock().await;
        let key = (record.user_id.clone(), record.category);
        let mut next = record.clone();
        if let Some(existing) = inner.connections.get(&key) {
            next.last_synced_at = next.last_synced_at.or(existing.last_synced_at);
        }
        inner.connections.insert(key, next);
        Ok(())
    }

    async fn mark_unlinked(
        &self,
        user_id: &str,
        category: Category,
        at: DateTime<Utc>,
    ) -> Result<Option<ConnectionRecord>> {
        let mut inner = self.inner.lock().await;
        Ok(inner
            .connections
            .get_mut(&(user_id.to_string(), category))
            .map(|record| {
                record.linked = false;
                record.updated_at = at;
                record.clone()
            }))
    }

    async fn mark_synced(
        &self,
        user_id: &str,
        category: Category,
        at: DateTime<Utc>,
    ) -> Result<bool> {
        let mut inner = self.inner.lock().await;
        match inner.connections.get_mut(&(user_id.to_string(), category)) {
            Some(record) if record.linked => {
                record.last_synced_at = Some(at);
                record.updated_at = at;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        call::{CallBriefing, CallStatus, InboundEvent, NewCall},
        candidate::NewCandidate,
        job::NewJob,
    };
    use std::sync::Arc;

    async fn seeded() -> (MemoryStore, Candidate, JobDescription) {
        let store = MemoryStore::new();
        let now = Utc::now();
        let candidate = Candidate::from_new(
            Uuid::new_v4(),
            NewCandidate {
                full_name: "Ana Gomez".into(),
                phone: Some("+15551234567".into()),
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
        (store, candidate, job)
    }

    fn new_call(candidate: &Candidate, job: &JobDescription) -> Call {
        Call::from_new(
            Uuid::new_v4(),
            NewCall {
                candidate_id: candidate.id,
                job_id: job.id,
                phone: "+15551234567".into(),
                briefing: CallBriefing::freeze(candidate, job),
                questions_asked: vec![],
            },
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn concurrent_creates_for_one_pair_yield_one_call() {
        let (store, candidate, job) = seeded().await;
        let store = Arc::new(store);

        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = Arc::clone(&store);
            let call = new_call(&candidate, &job);
            handles.push(tokio::spawn(async move { store.create_call(&call).await }));
        }

        let mut created = 0;
        let mut conflicts = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(()) => created += 1,
                Err(Error::Conflict { existing_id, .. }) => {
                    assert!(existing_id.is_some());
                    conflicts += 1;
                }
                Err(e) => panic!("unexpected error: {e}"),
            }
        }
        assert_eq!(created, 1);
        assert_eq!(conflicts, 7);
    }

    #[tokio::test]
    async fn terminal_call_frees_the_pair() {
        let (store, candidate, job) = seeded().await;
        let first = new_call(&candidate, &job);
        store.create_call(&first).await.unwrap();
        store
            .apply_call_update(
                first.id,
                CallUpdate::Event(InboundEvent {
                    status: Some(CallStatus::Completed),
                    ..Default::default()
                }),
            )
            .await
            .unwrap();

        store.create_call(&new_call(&candidate, &job)).await.unwrap();
    }

    #[tokio::test]
    async fn delete_candidate_respects_in_flight_calls() {
        let (store, candidate, job) = seeded().await;
        let call = new_call(&candidate, &job);
        store.create_call(&call).await.unwrap();
        store
            .apply_call_update(
                call.id,
                CallUpdate::Started {
                    provider_call_id: Some("CA1".into()),
                    provider_conversation_id: Some("conv".into()),
                },
            )
            .await
            .unwrap();

        match store.delete_candidate(candidate.id).await {
            Err(Error::Conflict { existing_id, .. }) => assert_eq!(existing_id, Some(call.id)),
            other => panic!("expected conflict, got {other:?}"),
        }

        store
            .apply_call_update(
                call.id,
                CallUpdate::Event(InboundEvent {
                    status: Some(CallStatus::Completed),
                    ..Default::default()
                }),
            )
            .await
            .unwrap();
        store.delete_candidate(candidate.id).await.unwrap();

        assert!(store.get_candidate(candidate.id).await.unwrap().is_none());
        assert!(store.get_call(call.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn mark_synced_skips_unlinked_connection() {
        let store = MemoryStore::new();
        let now = Utc::now();
        store
            .upsert_connection(&ConnectionRecord::linked("u1", Category::Ats, "tok".into(), None, now))
            .await
            .unwrap();
        store.mark_unlinked("u1", Category::Ats, now).await.unwrap();

        assert!(!store.mark_synced("u1", Category::Ats, now).await.unwrap());
        let record = store.get_connection("u1", Category::Ats).await.unwrap().unwrap();
        assert!(!record.linked);
        assert_eq!(record.last_synced_at, None);
    }
}
