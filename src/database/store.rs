use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{
    call::{ApplyOutcome, Call, CallStatus, CallUpdate},
    candidate::Candidate,
    connection::{Category, ConnectionRecord},
    correlation::{Correlation, EntityKind},
    job::JobDescription,
};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CallFilter {
    pub candidate_id: Option<Uuid>,
    pub job_id: Option<Uuid>,
    pub status: Option<CallStatus>,
}

impl CallFilter {
    pub fn matches(&self, call: &Call) -> bool {
        self.candidate_id.map_or(true, |id| call.candidate_id == id)
            && self.job_id.map_or(true, |id| call.job_id == id)
            && self.status.map_or(true, |s| call.status == s)
    }
}

/// Accessor for every piece of shared mutable state.
///
/// Implementations own the serialization rules:
/// - `create_call` is an atomic check-and-insert; a second in-flight call for
///   the same (candidate, job) pair fails with `Error::Conflict` carrying the
///   existing call id.
/// - `apply_call_update` reads, reduces and writes one call with no other
///   writer touching that call in between.
/// - `delete_candidate` / `delete_job` refuse with `Error::Conflict` while any
///   in-flight call references the entity. Calls themselves are never deleted.
/// - `mark_synced` only stamps a connection that is still linked.
#[async_trait]
pub trait Store: Send + Sync {
    async fn insert_candidate(&self, candidate: &Candidate) -> Result<()>;

    async fn update_candidate(&self, candidate: &Candidate) -> Result<()>;

    async fn get_candidate(&self, id: Uuid) -> Result<Option<Candidate>>;

    async fn list_candidates(&self) -> Result<Vec<Candidate>>;

    async fn delete_candidate(&self, id: Uuid) -> Result<()>;

    async fn insert_job(&self, job: &JobDescription) -> Result<()>;

    async fn update_job(&self, job: &JobDescription) -> Result<()>;

    async fn get_job(&self, id: Uuid) -> Result<Option<JobDescription>>;

    async fn list_jobs(&self) -> Result<Vec<JobDescription>>;

    async fn delete_job(&self, id: Uuid) -> Result<()>;

    async fn create_call(&self, call: &Call) -> Result<()>;

    async fn get_call(&self, id: Uuid) -> Result<Option<Call>>;

    async fn find_call_by_conversation(&self, conversation_id: &str) -> Result<Option<Call>>;

    /// Most recent call dialed to `phone` (already normalized).
    async fn latest_call_to_phone(&self, phone: &str) -> Result<Option<Call>>;

    async fn list_calls(&self, filter: &CallFilter) -> Result<Vec<Call>>;

    async fn apply_call_update(&self, id: Uuid, update: CallUpdate)
        -> Result<(Call, ApplyOutcome)>;

    async fn find_correlation(
        &self,
        category: Category,
        entity: EntityKind,
        remote_id: &str,
    ) -> Result<Option<Uuid>>;

    async fn find_remote_id(
        &self,
        category: Category,
        entity: EntityKind,
        local_id: Uuid,
    ) -> Result<Option<String>>;

    /// Inserts or repoints the correlation for (category, entity, remote_id).
    async fn save_correlation(&self, correlation: &Correlation) -> Result<()>;

    /// Forgets a remote id that no longer exists on the remote side.
    async fn delete_correlation(
        &self,
        category: Category,
        entity: EntityKind,
        remote_id: &str,
    ) -> Result<()>;

    async fn get_connection(
        &self,
        user_id: &str,
        category: Category,
    ) -> Result<Option<ConnectionRecord>>;

    async fn list_connections(&self, user_id: &str) -> Result<Vec<ConnectionRecord>>;

    async fn upsert_connection(&self, record: &ConnectionRecord) -> Result<()>;

    /// Flips `linked` off and keeps the row. Returns the updated row, if any.
    async fn mark_unlinked(
        &self,
        user_id: &str,
        category: Category,
        at: DateTime<Utc>,
    ) -> Result<Option<ConnectionRecord>>;

    /// Returns whether the stamp was applied.
    async fn mark_synced(&self, user_id: &str, category: Category, at: DateTime<Utc>)
        -> Result<bool>;
}
