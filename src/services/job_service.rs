use std::sync::Arc;

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::database::Store;
use crate::error::{Error, Result};
use crate::models::job::{JobDescription, JobPatch, NewJob};

#[derive(Clone)]
pub struct JobService {
    store: Arc<dyn Store>,
}

fn require_text(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::BadRequest(format!("{} must not be empty", field)));
    }
    Ok(())
}

impl JobService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn create(&self, new: NewJob) -> Result<JobDescription> {
        require_text("title", &new.title)?;
        require_text("description", &new.description)?;

        let job = JobDescription::from_new(Uuid::new_v4(), new, Utc::now());
        self.store.insert_job(&job).await?;
        info!(job_id = %job.id, "job created");
        Ok(job)
    }

    pub async fn update(&self, id: Uuid, patch: JobPatch) -> Result<JobDescription> {
        if let Some(title) = &patch.title {
            require_text("title", title)?;
        }
        if let Some(description) = &patch.description {
            require_text("description", description)?;
        }

        let mut job = self.get_by_id(id).await?;
        job.apply_patch(patch, Utc::now());
        self.store.update_job(&job).await?;
        Ok(job)
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<JobDescription> {
        self.store
            .get_job(id)
            .await?
            .ok_or_else(|| Error::NotFound("Job not found".into()))
    }

    pub async fn list(&self) -> Result<Vec<JobDescription>> {
        self.store.list_jobs().await
    }

    pub async fn delete(&self, id: Uuid) -> Result<()> {
        self.store.delete_job(id).await?;
        info!(job_id = %id, "job deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemoryStore;

    #[tokio::test]
    async fn update_rejects_emptying_required_fields() {
        let service = JobService::new(Arc::new(MemoryStore::new()));
        let job = service
            .create(NewJob {
                title: "Backend Engineer".into(),
                description: "Build services".into(),
                ..Default::default()
            })
            .await
            .unwrap();

        let result = service
            .update(
                job.id,
                JobPatch {
                    description: Some(" ".into()),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(result, Err(Error::BadRequest(_))));

        let updated = service
            .update(
                job.id,
                JobPatch {
                    company: Some("Acme".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.company.as_deref(), Some("Acme"));
        assert_eq!(updated.description, "Build services");
    }

    #[tokio::test]
    async fn create_requires_description() {
        let service = JobService::new(Arc::new(MemoryStore::new()));
        let result = service
            .create(NewJob {
                title: "Backend Engineer".into(),
                ..Default::default()
            })
            .await;
        assert!(matches!(result, Err(Error::BadRequest(_))));
    }
}
