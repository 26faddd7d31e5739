use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::connection::Category;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Candidate,
    Job,
}

impl EntityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EntityKind::Candidate => "candidate",
            EntityKind::Job => "job",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "candidate" => Ok(EntityKind::Candidate),
            "job" => Ok(EntityKind::Job),
            other => Err(format!("unknown entity kind: {}", other)),
        }
    }
}

/// Maps a remote record id to the local entity it represents.
/// Unique per (category, entity, remote_id).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Correlation {
    pub category: Category,
    pub entity: EntityKind,
    pub remote_id: String,
    pub local_id: Uuid,
    pub created_at: DateTime<Utc>,
}
