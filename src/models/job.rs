use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::candidate::{non_empty, normalize_skills};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct JobDescription {
    pub id: Uuid,
    pub title: String,
    pub company: Option<String>,
    /// May be empty only for records pulled from a degraded remote source.
    pub description: String,
    pub required_skills: Vec<String>,
    pub preferred_skills: Vec<String>,
    pub location: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewJob {
    pub title: String,
    pub company: Option<String>,
    pub description: String,
    pub required_skills: Vec<String>,
    pub preferred_skills: Vec<String>,
    pub location: Option<String>,
}

/// Partial update; `None` leaves the field untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobPatch {
    pub title: Option<String>,
    pub company: Option<String>,
    pub description: Option<String>,
    pub required_skills: Option<Vec<String>>,
    pub preferred_skills: Option<Vec<String>>,
    pub location: Option<String>,
}

impl JobDescription {
    pub fn from_new(id: Uuid, new: NewJob, now: DateTime<Utc>) -> Self {
        Self {
            id,
            title: new.title.trim().to_string(),
            company: non_empty(new.company),
            description: new.description.trim().to_string(),
            required_skills: normalize_skills(new.required_skills),
            preferred_skills: normalize_skills(new.preferred_skills),
            location: non_empty(new.location),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply_patch(&mut self, patch: JobPatch, now: DateTime<Utc>) {
        if let Some(title) = patch.title {
            self.title = title.trim().to_string();
        }
        if patch.company.is_some() {
            self.company = non_empty(patch.company);
        }
        if let Some(description) = patch.description {
            self.description = description.trim().to_string();
        }
        if let Some(skills) = patch.required_skills {
            self.required_skills = normalize_skills(skills);
        }
        if let Some(skills) = patch.preferred_skills {
            self.preferred_skills = normalize_skills(skills);
        }
        if patch.location.is_some() {
            self.location = non_empty(patch.location);
        }
        self.updated_at = now;
    }
}
