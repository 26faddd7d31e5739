use std::sync::Arc;

use chrono::Utc;
use futures::StreamExt;
use serde::Serialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::database::Store;
use crate::error::{Error, Result};
use crate::models::{
    candidate::Candidate,
    connection::Category,
    correlation::{Correlation, EntityKind},
    job::JobDescription,
    remote::{RemoteCandidate, RemoteJob, RemoteRecord},
    sync_report::{CategoryOutcome, MergeOutcome, SyncReport},
};
use crate::services::connection_registry::ConnectionRegistry;
use crate::services::gateway::{ConnectorAggregator, GatewayError};
use crate::services::inflight::InFlight;
use crate::services::matching::{
    merge_candidate, merge_job, new_candidate, new_job, LocalIndex, MergeMode,
};
use crate::services::retry::RetryPolicy;
use crate::utils::phone::normalize_phone;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PushAction {
    Created,
    /// The candidate already had a CRM contact, which was overwritten.
    Updated,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PushResult {
    pub candidate_id: Uuid,
    pub remote_id: String,
    pub action: PushAction,
}

/// Reconciles local candidates and jobs with linked ATS/CRM accounts.
#[derive(Clone)]
pub struct SyncService {
    store: Arc<dyn Store>,
    connector: Arc<dyn ConnectorAggregator>,
    registry: ConnectionRegistry,
    retry: RetryPolicy,
    syncs: InFlight<(String, Category)>,
    pushes: InFlight<Uuid>,
}

fn record_failure(err: Error) -> String {
    err.to_string()
}

impl SyncService {
    pub fn new(
        store: Arc<dyn Store>,
        connector: Arc<dyn ConnectorAggregator>,
        registry: ConnectionRegistry,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            store,
            connector,
            registry,
            retry,
            syncs: InFlight::new(),
            pushes: InFlight::new(),
        }
    }

    /// Syncs every linked category, or only `only` when given.
    pub async fn sync(&self, user_id: &str, only: Option<Category>) -> Result<SyncReport> {
        let started_at = Utc::now();
        let linked = self.registry.linked_categories(user_id).await?;
        let mut targets: Vec<Category> = match only {
            Some(category) if linked.contains(&category) => vec![category],
            Some(category) => {
                return Err(Error::NotLinked(format!(
                    "{} is not linked for user {}",
                    category, user_id
                )))
            }
            None => linked,
        };
        if targets.is_empty() {
            return Err(Error::NotLinked(format!(
                "No ATS or CRM connection is linked for user {}",
                user_id
            )));
        }
        targets.sort();
        targets.dedup();

        let mut guards = Vec::with_capacity(targets.len());
        for category in &targets {
            let guard = self
                .syncs
                .try_claim((user_id.to_string(), *category))
                .ok_or_else(|| {
                    Error::SyncInProgress(format!("{} sync already running for user {}", category, user_id))
                })?;
            guards.push(guard);
        }

        let candidates = self.store.list_candidates().await?;
        let jobs = self.store.list_jobs().await?;
        let mut index = LocalIndex::build(&candidates, &jobs);
        let mut report = SyncReport::new(user_id, started_at);

        for category in targets {
            // Linked state may have changed since the run started.
            let token = self
                .registry
                .linked(user_id, category)
                .await?
                .and_then(|record| record.account_token);
            let Some(token) = token else {
                warn!(user_id, category = %category, "connection unlinked during sync, skipping");
                report.categories.insert(category, CategoryOutcome::NotLinked);
                continue;
            };

            let outcome = self
                .sync_category(&token, category, &mut index, &mut report)
                .await;
            if outcome == CategoryOutcome::Completed
                && !self.registry.mark_synced(user_id, category).await?
            {
                warn!(user_id, category = %category, "connection unlinked before sync time could be recorded");
            }
            report.categories.insert(category, outcome);
        }
        drop(guards);

        report.finished_at = Utc::now();
        info!(
            user_id,
            candidates_created = report.candidates.created,
            candidates_updated = report.candidates.updated,
            candidates_skipped = report.candidates.skipped,
            jobs_created = report.jobs.created,
            jobs_updated = report.jobs.updated,
            jobs_skipped = report.jobs.skipped,
            errors = report.errors.len(),
            "sync finished"
        );
        Ok(report)
    }

    async fn sync_category(
        &self,
        token: &str,
        category: Category,
        index: &mut LocalIndex,
        report: &mut SyncReport,
    ) -> CategoryOutcome {
        let mut attempt = 0u32;
        'pull: loop {
            attempt += 1;
            let mut records = self.connector.pull_records(token, category);
            let mut received = 0usize;

            loop {
                let next = match tokio::time::timeout(self.retry.attempt_timeout, records.next()).await {
                    Ok(next) => next,
                    Err(_) => Some(Err(GatewayError::Timeout)),
                };
                match next {
                    None => {
                        info!(category = %category, records = received, "category pull complete");
                        return CategoryOutcome::Completed;
                    }
                    Some(Ok(record)) => {
                        received += 1;
                        self.apply_record(category, record, index, report).await;
                    }
                    // Only a pull that has applied nothing yet is safe to restart.
                    Some(Err(e)) if received == 0 && self.retry.should_retry(attempt, &e) => {
                        let delay = self.retry.delay_for(attempt);
                        warn!(
                            category = %category,
                            attempt,
                            delay_ms = delay.as_millis() as u64,
                            error = %e,
                            "pull failed, restarting"
                        );
                        tokio::time::sleep(delay).await;
                        continue 'pull;
                    }
                    Some(Err(e)) => {
                        error!(category = %category, attempt, records = received, error = %e, "pull failed");
                        let reason = if received == 0 && e.is_transient() {
                            format!("retries exhausted after {} attempts: {}", attempt, e)
                        } else {
                            e.to_string()
                        };
                        return CategoryOutcome::Failed { reason };
                    }
                }
            }
        }
    }

    async fn apply_record(
        &self,
        category: Category,
        record: RemoteRecord,
        index: &mut LocalIndex,
        report: &mut SyncReport,
    ) {
        match record {
            RemoteRecord::Malformed { remote_id, reason } => {
                warn!(category = %category, remote_id = ?remote_id, reason = %reason, "skipping malformed record");
                report.record_error(category, remote_id, reason);
            }
            RemoteRecord::Candidate(remote) => {
                match self.reconcile_candidate(category, &remote, index).await {
                    Ok(outcome) => report.candidates.record(outcome),
                    Err(reason) => {
                        warn!(category = %category, remote_id = %remote.remote_id, reason = %reason, "candidate record skipped");
                        report.record_error(category, Some(remote.remote_id), reason);
                    }
                }
            }
            RemoteRecord::Job(remote) => match self.reconcile_job(category, &remote, index).await {
                Ok(outcome) => report.jobs.record(outcome),
                Err(reason) => {
                    warn!(category = %category, remote_id = %remote.remote_id, reason = %reason, "job record skipped");
                    report.record_error(category, Some(remote.remote_id), reason);
                }
            },
        }
    }

    /// Stored correlation first, then name and email, then create.
    async fn reconcile_candidate(
        &self,
        category: Category,
        remote: &RemoteCandidate,
        index: &mut LocalIndex,
    ) -> std::result::Result<MergeOutcome, String> {
        if remote.remote_id.trim().is_empty() {
            return Err("record has no remote id".into());
        }
        let remote = RemoteCandidate {
            phone: remote.phone.as_deref().and_then(normalize_phone),
            ..remote.clone()
        };
        let fresh = new_candidate(&remote)?;
        let now = Utc::now();

        let correlated = match self
            .store
            .find_correlation(category, EntityKind::Candidate, &remote.remote_id)
            .await
            .map_err(record_failure)?
        {
            Some(id) => self.store.get_candidate(id).await.map_err(record_failure)?,
            None => None,
        };
        let correlated_ok = correlated.is_some();
        let existing = match correlated {
            Some(local) => Some(local),
            None => match index.find_candidate(&remote) {
                Some(id) => self.store.get_candidate(id).await.map_err(record_failure)?,
                None => None,
            },
        };

        let (local_id, outcome) = match existing {
            Some(mut local) => {
                let mode = self
                    .candidate_merge_mode(category, local.id)
                    .await
                    .map_err(record_failure)?;
                let changed = merge_candidate(&mut local, &remote, mode);
                if changed {
                    local.updated_at = now;
                    self.store.update_candidate(&local).await.map_err(record_failure)?;
                }
                let outcome = if changed {
                    MergeOutcome::Updated
                } else {
                    MergeOutcome::Skipped
                };
                (local.id, outcome)
            }
            None => {
                let candidate = Candidate::from_new(Uuid::new_v4(), fresh, now);
                self.store.insert_candidate(&candidate).await.map_err(record_failure)?;
                index.add_candidate(&candidate);
                (candidate.id, MergeOutcome::Created)
            }
        };

        if !correlated_ok {
            self.correlate(category, EntityKind::Candidate, &remote.remote_id, local_id)
                .await
                .map_err(record_failure)?;
        }
        Ok(outcome)
    }

    /// The ATS owns candidate profile fields. A CRM record only fills gaps in
    /// a candidate the ATS also knows about.
    async fn candidate_merge_mode(&self, category: Category, local_id: Uuid) -> Result<MergeMode> {
        if category == Category::Ats {
            return Ok(MergeMode::Overwrite);
        }
        let owned_by_ats = self
            .store
            .find_remote_id(Category::Ats, EntityKind::Candidate, local_id)
            .await?
            .is_some();
        Ok(if owned_by_ats {
            MergeMode::FillEmpty
        } else {
            MergeMode::Overwrite
        })
    }

    async fn reconcile_job(
        &self,
        category: Category,
        remote: &RemoteJob,
        index: &mut LocalIndex,
    ) -> std::result::Result<MergeOutcome, String> {
        if remote.remote_id.trim().is_empty() {
            return Err("record has no remote id".into());
        }
        let fresh = new_job(remote)?;
        let now = Utc::now();

        let correlated = match self
            .store
            .find_correlation(category, EntityKind::Job, &remote.remote_id)
            .await
            .map_err(record_failure)?
        {
            Some(id) => self.store.get_job(id).await.map_err(record_failure)?,
            None => None,
        };
        let correlated_ok = correlated.is_some();
        let existing = match correlated {
            Some(local) => Some(local),
            None => match index.find_job(remote) {
                Some(id) => self.store.get_job(id).await.map_err(record_failure)?,
                None => None,
            },
        };

        let (local_id, outcome) = match existing {
            Some(mut local) => {
                let changed = merge_job(&mut local, remote);
                if changed {
                    local.updated_at = now;
                    self.store.update_job(&local).await.map_err(record_failure)?;
                    (local.id, MergeOutcome::Updated)
                } else {
                    (local.id, MergeOutcome::Skipped)
                }
            }
            None => {
                let job = JobDescription::from_new(Uuid::new_v4(), fresh, now);
                self.store.insert_job(&job).await.map_err(record_failure)?;
                index.add_job(&job);
                (job.id, MergeOutcome::Created)
            }
        };

        if !correlated_ok {
            self.correlate(category, EntityKind::Job, &remote.remote_id, local_id)
                .await
                .map_err(record_failure)?;
        }
        Ok(outcome)
    }

    async fn correlate(
        &self,
        category: Category,
        entity: EntityKind,
        remote_id: &str,
        local_id: Uuid,
    ) -> Result<()> {
        self.store
            .save_correlation(&Correlation {
                category,
                entity,
                remote_id: remote_id.to_string(),
                local_id,
                created_at: Utc::now(),
            })
            .await
    }

    /// Sends the candidate's current fields to the linked CRM. A candidate
    /// with a known contact updates it; otherwise a contact is created and its
    /// id remembered so later CRM pulls update rather than duplicate it.
    pub async fn push_candidate(&self, user_id: &str, candidate_id: Uuid) -> Result<PushResult> {
        let token = self.registry.require_linked(user_id, Category::Crm).await?;
        let candidate = self
            .store
            .get_candidate(candidate_id)
            .await?
            .ok_or_else(|| Error::NotFound("Candidate not found".into()))?;

        let _guard = self.pushes.try_claim(candidate_id).ok_or_else(|| {
            Error::conflict("A push for this candidate is already running", Some(candidate_id))
        })?;

        if let Some(remote_id) = self
            .store
            .find_remote_id(Category::Crm, EntityKind::Candidate, candidate_id)
            .await?
        {
            match self
                .retry
                .run("update_contact", || {
                    self.connector.update_contact(&token, &remote_id, &candidate)
                })
                .await
            {
                Ok(()) => {
                    info!(user_id, candidate_id = %candidate_id, remote_id = %remote_id, "CRM contact updated");
                    return Ok(PushResult {
                        candidate_id,
                        remote_id,
                        action: PushAction::Updated,
                    });
                }
                Err((e, _)) if e.is_not_found() => {
                    warn!(candidate_id = %candidate_id, remote_id = %remote_id, "CRM contact is gone, creating a new one");
                    self.store
                        .delete_correlation(Category::Crm, EntityKind::Candidate, &remote_id)
                        .await?;
                }
                Err((e, attempts)) => {
                    error!(candidate_id = %candidate_id, attempts, error = %e, "contact update failed");
                    return Err(Error::Gateway(e));
                }
            }
        }

        let remote_id = self
            .retry
            .run("push_candidate", || {
                self.connector.push_candidate(&token, &candidate)
            })
            .await
            .map_err(|(e, attempts)| {
                error!(candidate_id = %candidate_id, attempts, error = %e, "push failed");
                Error::Gateway(e)
            })?;

        self.correlate(Category::Crm, EntityKind::Candidate, &remote_id, candidate_id)
            .await?;
        info!(user_id, candidate_id = %candidate_id, remote_id = %remote_id, "candidate pushed to CRM");
        Ok(PushResult {
            candidate_id,
            remote_id,
            action: PushAction::Created,
        })
    }
}
