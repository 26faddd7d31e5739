use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use crate::database::Store;
use crate::error::{Error, Result};
use crate::models::connection::{Category, ConnectionRecord, ConnectionStatus};
use crate::services::gateway::LinkedAccount;

/// Which external categories each user has linked. Local state only: nothing
/// here talks to the aggregator.
#[derive(Clone)]
pub struct ConnectionRegistry {
    store: Arc<dyn Store>,
}

impl ConnectionRegistry {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn is_linked(&self, user_id: &str, category: Category) -> Result<bool> {
        Ok(self.linked(user_id, category).await?.is_some())
    }

    /// The connection record, if it is currently linked with a usable token.
    pub async fn linked(&self, user_id: &str, category: Category) -> Result<Option<ConnectionRecord>> {
        let record = self.store.get_connection(user_id, category).await?;
        Ok(record.filter(|r| r.live_token().is_some()))
    }

    /// Returns the account token or fails fast with `NotLinked`.
    pub async fn require_linked(&self, user_id: &str, category: Category) -> Result<String> {
        self.linked(user_id, category)
            .await?
            .and_then(|r| r.account_token)
            .ok_or_else(|| Error::NotLinked(format!("{} is not linked for user {}", category, user_id)))
    }

    pub async fn linked_categories(&self, user_id: &str) -> Result<Vec<Category>> {
        let records = self.store.list_connections(user_id).await?;
        Ok(records
            .into_iter()
            .filter(|r| r.live_token().is_some())
            .map(|r| r.category)
            .collect())
    }

    pub async fn mark_linked(&self, user_id: &str, account: LinkedAccount) -> Result<ConnectionRecord> {
        let record = ConnectionRecord::linked(
            user_id,
            account.category,
            account.account_token,
            account.integration,
            Utc::now(),
        );
        self.store.upsert_connection(&record).await?;
        info!(user_id, category = %record.category, integration = ?record.integration, "connection linked");
        Ok(self
            .store
            .get_connection(user_id, record.category)
            .await?
            .unwrap_or(record))
    }

    pub async fn mark_unlinked(&self, user_id: &str, category: Category) -> Result<ConnectionRecord> {
        let record = self
            .store
            .mark_unlinked(user_id, category, Utc::now())
            .await?
            .ok_or_else(|| Error::NotFound(format!("No {} connection for user {}", category, user_id)))?;
        info!(user_id, category = %category, "connection unlinked");
        Ok(record)
    }

    pub async fn mark_synced(&self, user_id: &str, category: Category) -> Result<bool> {
        self.store.mark_synced(user_id, category, Utc::now()).await
    }

    pub async fn status(&self, user_id: &str) -> Result<ConnectionStatus> {
        let records = self.store.list_connections(user_id).await?;
        Ok(ConnectionStatus::from_records(user_id, records))
    }
}
