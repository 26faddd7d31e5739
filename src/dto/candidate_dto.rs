use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::candidate::{Candidate, NewCandidate};

/// Output of the resume ingestion step.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateCandidatePayload {
    #[validate(length(min = 1, max = 200))]
    pub full_name: String,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(max = 32))]
    pub phone: Option<String>,
    pub current_title: Option<String>,
    pub current_company: Option<String>,
    pub location: Option<String>,
    #[serde(default)]
    pub skills: Vec<String>,
    #[validate(range(min = 0, max = 80))]
    pub years_of_experience: Option<i32>,
    pub resume_text: Option<String>,
}

impl From<CreateCandidatePayload> for NewCandidate {
    fn from(p: CreateCandidatePayload) -> Self {
        Self {
            full_name: p.full_name,
            email: p.email,
            phone: p.phone,
            current_title: p.current_title,
            current_company: p.current_company,
            location: p.location,
            skills: p.skills,
            years_of_experience: p.years_of_experience,
            resume_text: p.resume_text,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateResponse {
    pub id: Uuid,
    pub full_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub current_title: Option<String>,
    pub current_company: Option<String>,
    pub location: Option<String>,
    pub skills: Vec<String>,
    pub years_of_experience: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Candidate> for CandidateResponse {
    fn from(c: Candidate) -> Self {
        Self {
            id: c.id,
            full_name: c.full_name,
            email: c.email,
            phone: c.phone,
            current_title: c.current_title,
            current_company: c.current_company,
            location: c.location,
            skills: c.skills,
            years_of_experience: c.years_of_experience,
            created_at: c.created_at,
            updated_at: c.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateListResponse {
    pub items: Vec<CandidateResponse>,
    pub total: usize,
}

impl From<Vec<Candidate>> for CandidateListResponse {
    fn from(candidates: Vec<Candidate>) -> Self {
        let items: Vec<CandidateResponse> =
            candidates.into_iter().map(CandidateResponse::from).collect();
        Self {
            total: items.len(),
            items,
        }
    }
}
