use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Candidate {
    pub id: Uuid,
    pub full_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub current_title: Option<String>,
    pub current_company: Option<String>,
    pub location: Option<String>,
    pub skills: Vec<String>,
    pub years_of_experience: Option<i32>,
    pub resume_text: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Candidate fields as produced by resume ingestion or a sync pull.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewCandidate {
    pub full_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub current_title: Option<String>,
    pub current_company: Option<String>,
    pub location: Option<String>,
    pub skills: Vec<String>,
    pub years_of_experience: Option<i32>,
    pub resume_text: Option<String>,
}

impl Candidate {
    pub fn from_new(id: Uuid, new: NewCandidate, now: DateTime<Utc>) -> Self {
        Self {
            id,
            full_name: new.full_name.trim().to_string(),
            email: non_empty(new.email),
            phone: non_empty(new.phone),
            current_title: non_empty(new.current_title),
            current_company: non_empty(new.current_company),
            location: non_empty(new.location),
            skills: normalize_skills(new.skills),
            years_of_experience: new.years_of_experience,
            resume_text: non_empty(new.resume_text),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Skills behave as a set: trimmed, empty entries dropped, first spelling of
/// a case-insensitive duplicate wins, original order otherwise kept.
pub fn normalize_skills<I, S>(skills: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = std::collections::HashSet::new();
    skills
        .into_iter()
        .map(|s| s.as_ref().trim().to_string())
        .filter(|s| !s.is_empty())
        .filter(|s| seen.insert(s.to_lowercase()))
        .collect()
}

pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
