use std::sync::Arc;

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::database::Store;
use crate::error::{Error, Result};
use crate::models::candidate::{Candidate, NewCandidate};
use crate::utils::phone::normalize_phone;

#[derive(Clone)]
pub struct CandidateService {
    store: Arc<dyn Store>,
}

impl CandidateService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Stores a candidate produced by resume ingestion.
    pub async fn create_candidate(&self, mut new: NewCandidate) -> Result<Candidate> {
        if new.full_name.trim().is_empty() {
            return Err(Error::BadRequest("full_name must not be empty".into()));
        }
        if let Some(raw) = new.phone.as_deref().filter(|p| !p.trim().is_empty()) {
            let phone = normalize_phone(raw)
                .ok_or_else(|| Error::BadRequest(format!("invalid phone number: {}", raw)))?;
            new.phone = Some(phone);
        }

        let candidate = Candidate::from_new(Uuid::new_v4(), new, Utc::now());
        self.store.insert_candidate(&candidate).await?;
        info!(candidate_id = %candidate.id, "candidate created");
        Ok(candidate)
    }

    pub async fn get_candidate(&self, id: Uuid) -> Result<Candidate> {
        self.store
            .get_candidate(id)
            .await?
            .ok_or_else(|| Error::NotFound("Candidate not found".into()))
    }

    pub async fn list_candidates(&self) -> Result<Vec<Candidate>> {
        self.store.list_candidates().await
    }

    /// Refused while a screening call for the candidate is in flight.
    /// Finished calls are kept.
    pub async fn delete_candidate(&self, id: Uuid) -> Result<()> {
        self.store.delete_candidate(id).await?;
        info!(candidate_id = %id, "candidate deleted");
        Ok(())
    }
}
