use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::job::{JobDescription, JobPatch, NewJob};

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateJobPayload {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    pub company: Option<String>,
    #[validate(length(min = 1))]
    pub description: String,
    #[serde(default)]
    pub required_skills: Vec<String>,
    #[serde(default)]
    pub preferred_skills: Vec<String>,
    pub location: Option<String>,
}

impl From<CreateJobPayload> for NewJob {
    fn from(p: CreateJobPayload) -> Self {
        Self {
            title: p.title,
            company: p.company,
            description: p.description,
            required_skills: p.required_skills,
            preferred_skills: p.preferred_skills,
            location: p.location,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UpdateJobPayload {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    pub company: Option<String>,
    #[validate(length(min = 1))]
    pub description: Option<String>,
    pub required_skills: Option<Vec<String>>,
    pub preferred_skills: Option<Vec<String>>,
    pub location: Option<String>,
}

impl From<UpdateJobPayload> for JobPatch {
    fn from(p: UpdateJobPayload) -> Self {
        Self {
            title: p.title,
            company: p.company,
            description: p.description,
            required_skills: p.required_skills,
            preferred_skills: p.preferred_skills,
            location: p.location,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobResponse {
    pub id: Uuid,
    pub title: String,
    pub company: Option<String>,
    pub description: String,
    pub required_skills: Vec<String>,
    pub preferred_skills: Vec<String>,
    pub location: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<JobDescription> for JobResponse {
    fn from(j: JobDescription) -> Self {
        Self {
            id: j.id,
            title: j.title,
            company: j.company,
            description: j.description,
            required_skills: j.required_skills,
            preferred_skills: j.preferred_skills,
            location: j.location,
            created_at: j.created_at,
            updated_at: j.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobListResponse {
    pub items: Vec<JobResponse>,
    pub total: usize,
}

impl From<Vec<JobDescription>> for JobListResponse {
    fn from(jobs: Vec<JobDescription>) -> Self {
        let items: Vec<JobResponse> = jobs.into_iter().map(JobResponse::from).collect();
        Self {
            total: items.len(),
            items,
        }
    }
}
