use serde::{Deserialize, Serialize};

/// Candidate-shaped record from an ATS candidate or a CRM contact.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RemoteCandidate {
    pub remote_id: String,
    pub full_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub current_title: Option<String>,
    pub current_company: Option<String>,
    pub location: Option<String>,
    pub skills: Vec<String>,
    pub years_of_experience: Option<i32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RemoteJob {
    pub remote_id: String,
    pub title: String,
    pub company: Option<String>,
    pub description: Option<String>,
    pub required_skills: Vec<String>,
    pub location: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RemoteRecord {
    Candidate(RemoteCandidate),
    Job(RemoteJob),
    /// An item the gateway could not shape into either record kind.
    Malformed {
        remote_id: Option<String>,
        reason: String,
    },
}

impl RemoteRecord {
    pub fn remote_id(&self) -> Option<&str> {
        match self {
            RemoteRecord::Candidate(c) => Some(&c.remote_id),
            RemoteRecord::Job(j) => Some(&j.remote_id),
            RemoteRecord::Malformed { remote_id, .. } => remote_id.as_deref(),
        }
    }
}
