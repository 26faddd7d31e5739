use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::connection::Category;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    Created,
    Updated,
    Skipped,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Tally {
    pub created: u32,
    pub updated: u32,
    pub skipped: u32,
}

impl Tally {
    pub fn record(&mut self, outcome: MergeOutcome) {
        match outcome {
            MergeOutcome::Created => self.created += 1,
            MergeOutcome::Updated => self.updated += 1,
            MergeOutcome::Skipped => self.skipped += 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CategoryOutcome {
    Completed,
    Failed { reason: String },
    NotLinked,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordError {
    pub category: Category,
    pub remote_id: Option<String>,
    pub reason: String,
}

/// Result of one reconciliation run. Returned to the caller, never stored.
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub user_id: String,
    pub candidates: Tally,
    pub jobs: Tally,
    pub categories: BTreeMap<Category, CategoryOutcome>,
    pub errors: Vec<RecordError>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl SyncReport {
    pub fn new(user_id: &str, started_at: DateTime<Utc>) -> Self {
        Self {
            user_id: user_id.to_string(),
            candidates: Tally::default(),
            jobs: Tally::default(),
            categories: BTreeMap::new(),
            errors: Vec::new(),
            started_at,
            finished_at: started_at,
        }
    }

    pub fn record_error(
        &mut self,
        category: Category,
        remote_id: Option<String>,
        reason: impl Into<String>,
    ) {
        self.errors.push(RecordError {
            category,
            remote_id,
            reason: reason.into(),
        });
    }

    pub fn failed_categories(&self) -> Vec<Category> {
        self.categories
            .iter()
            .filter(|(_, outcome)| matches!(outcome, CategoryOutcome::Failed { .. }))
            .map(|(category, _)| *category)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_serializes_category_outcomes_by_name() {
        let mut report = SyncReport::new("u1", Utc::now());
        report.candidates.record(MergeOutcome::Created);
        report.categories.insert(Category::Ats, CategoryOutcome::Completed);
        report.categories.insert(
            Category::Crm,
            CategoryOutcome::Failed {
                reason: "timeout".into(),
            },
        );

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["candidates"]["created"], 1);
        assert_eq!(json["categories"]["ats"]["status"], "completed");
        assert_eq!(json["categories"]["crm"]["reason"], "timeout");
        assert_eq!(report.failed_categories(), vec![Category::Crm]);
    }
}
