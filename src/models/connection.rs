use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Ats,
    Crm,
}

impl Category {
    pub const ALL: [Category; 2] = [Category::Ats, Category::Crm];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Ats => "ats",
            Category::Crm => "crm",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ats" => Ok(Category::Ats),
            "crm" => Ok(Category::Crm),
            other => Err(format!("unknown category: {}", other)),
        }
    }
}

/// One row per (user, category). Disconnecting flips `linked` and keeps the row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionRecord {
    pub user_id: String,
    pub category: Category,
    pub linked: bool,
    /// Opaque account token issued by the aggregator.
    #[serde(skip_serializing)]
    pub account_token: Option<String>,
    pub integration: Option<String>,
    pub last_synced_at: Option<DateTime<Utc>>,
    pub linked_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl ConnectionRecord {
    pub fn linked(
        user_id: &str,
        category: Category,
        account_token: String,
        integration: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id: user_id.to_string(),
            category,
            linked: true,
            account_token: Some(account_token),
            integration,
            last_synced_at: None,
            linked_at: Some(now),
            updated_at: now,
        }
    }

    /// The token to pull or push with, if the connection is live.
    pub fn live_token(&self) -> Option<&str> {
        if self.linked {
            self.account_token.as_deref()
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionStatus {
    pub user_id: String,
    pub ats_connected: bool,
    pub crm_connected: bool,
    pub connections: Vec<ConnectionRecord>,
}

impl ConnectionStatus {
    pub fn from_records(user_id: &str, connections: Vec<ConnectionRecord>) -> Self {
        let connected = |category: Category| {
            connections
                .iter()
                .any(|c| c.category == category && c.live_token().is_some())
        };
        Self {
            user_id: user_id.to_string(),
            ats_connected: connected(Category::Ats),
            crm_connected: connected(Category::Crm),
            connections,
        }
    }
}
