use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::models::connection::{Category, ConnectionRecord};
use crate::services::connection_registry::ConnectionRegistry;
use crate::services::gateway::{ConnectorAggregator, LinkRequest, LinkedAccount, RemoteAccount};

/// Outcome of reconciling local connection state with the aggregator's
/// account list.
#[derive(Debug, Serialize)]
pub struct ConnectionSyncReport {
    pub accounts_found: usize,
    pub linked: Vec<ConnectionRecord>,
    /// Accounts the aggregator knows about but never gave us a token for.
    pub missing_tokens: Vec<RemoteAccount>,
}

/// Aggregator link handshake: issue a link token, then exchange the public
/// token the user brings back for an account token.
#[derive(Clone)]
pub struct LinkService {
    connector: Arc<dyn ConnectorAggregator>,
    registry: ConnectionRegistry,
}

impl LinkService {
    pub fn new(connector: Arc<dyn ConnectorAggregator>, registry: ConnectionRegistry) -> Self {
        Self {
            connector,
            registry,
        }
    }

    pub async fn create_link_token(
        &self,
        user_id: &str,
        organization_name: &str,
        email_address: &str,
        categories: Vec<Category>,
    ) -> Result<String> {
        let categories = if categories.is_empty() {
            vec![Category::Ats]
        } else {
            categories
        };
        let token = self
            .connector
            .create_link_token(LinkRequest {
                end_user_origin_id: user_id.to_string(),
                organization_name: organization_name.to_string(),
                email_address: email_address.to_string(),
                categories,
            })
            .await?;
        Ok(token)
    }

    pub async fn exchange(&self, user_id: &str, public_token: &str) -> Result<ConnectionRecord> {
        if public_token.trim().is_empty() {
            return Err(Error::BadRequest("public_token is required".into()));
        }
        let account = self.connector.exchange_public_token(public_token).await?;
        self.registry.mark_linked(user_id, account).await
    }

    /// Re-links every account the aggregator lists for the user with a
    /// usable token. Accounts without one are reported, not linked.
    pub async fn sync_connections(&self, user_id: &str) -> Result<ConnectionSyncReport> {
        let accounts = self.connector.linked_accounts(user_id).await?;
        let mut report = ConnectionSyncReport {
            accounts_found: accounts.len(),
            linked: Vec::new(),
            missing_tokens: Vec::new(),
        };

        for account in accounts {
            let token = account
                .account_token
                .as_deref()
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string);
            let Some(account_token) = token else {
                warn!(user_id, category = %account.category, "linked account has no token");
                report.missing_tokens.push(account);
                continue;
            };
            let record = self
                .registry
                .mark_linked(
                    user_id,
                    LinkedAccount {
                        account_token,
                        integration: account.integration.clone(),
                        category: account.category,
                    },
                )
                .await?;
            report.linked.push(record);
        }

        info!(
            user_id,
            found = report.accounts_found,
            linked = report.linked.len(),
            missing = report.missing_tokens.len(),
            "connections synced from aggregator"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemoryStore;
    use crate::services::gateway::{LinkedAccount, MockConnectorAggregator};

    #[tokio::test]
    async fn exchange_marks_the_reported_category_linked() {
        let registry = ConnectionRegistry::new(Arc::new(MemoryStore::new()));
        let mut connector = MockConnectorAggregator::new();
        connector
            .expect_exchange_public_token()
            .withf(|token| token == "pub_tok")
            .times(1)
            .returning(|_| {
                Ok(LinkedAccount {
                    account_token: "acct".into(),
                    integration: Some("HubSpot".into()),
                    category: Category::Crm,
                })
            });

        let service = LinkService::new(Arc::new(connector), registry.clone());
        let record = service.exchange("u1", "pub_tok").await.unwrap();

        assert_eq!(record.category, Category::Crm);
        assert!(registry.is_linked("u1", Category::Crm).await.unwrap());
        assert!(!registry.is_linked("u1", Category::Ats).await.unwrap());
    }

    #[tokio::test]
    async fn sync_connections_links_accounts_that_carry_tokens() {
        let registry = ConnectionRegistry::new(Arc::new(MemoryStore::new()));
        let mut connector = MockConnectorAggregator::new();
        connector
            .expect_linked_accounts()
            .withf(|user| user == "u1")
            .times(1)
            .returning(|_| {
                Ok(vec![
                    RemoteAccount {
                        category: Category::Ats,
                        integration: Some("Greenhouse".into()),
                        account_token: Some("ats_acct".into()),
                    },
                    RemoteAccount {
                        category: Category::Crm,
                        integration: Some("HubSpot".into()),
                        account_token: None,
                    },
                ])
            });

        let service = LinkService::new(Arc::new(connector), registry.clone());
        let report = service.sync_connections("u1").await.unwrap();

        assert_eq!(report.accounts_found, 2);
        assert_eq!(report.linked.len(), 1);
        assert_eq!(report.linked[0].category, Category::Ats);
        assert_eq!(report.missing_tokens.len(), 1);
        assert_eq!(report.missing_tokens[0].category, Category::Crm);

        let ats = registry.linked("u1", Category::Ats).await.unwrap().unwrap();
        assert_eq!(ats.account_token.as_deref(), Some("ats_acct"));
        assert!(!registry.is_linked("u1", Category::Crm).await.unwrap());
    }

    #[tokio::test]
    async fn sync_connections_surfaces_aggregator_failures() {
        let registry = ConnectionRegistry::new(Arc::new(MemoryStore::new()));
        let mut connector = MockConnectorAggregator::new();
        connector.expect_linked_accounts().returning(|_| {
            Err(crate::services::gateway::GatewayError::Unavailable {
                status: 503,
                message: "down".into(),
            })
        });

        let service = LinkService::new(Arc::new(connector), registry.clone());
        assert!(matches!(
            service.sync_connections("u1").await,
            Err(Error::Gateway(_))
        ));
        assert!(registry.linked_categories("u1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn link_token_defaults_to_ats() {
        let registry = ConnectionRegistry::new(Arc::new(MemoryStore::new()));
        let mut connector = MockConnectorAggregator::new();
        connector
            .expect_create_link_token()
            .withf(|req| req.categories == vec![Category::Ats] && req.end_user_origin_id == "u1")
            .returning(|_| Ok("link_tok".into()));

        let service = LinkService::new(Arc::new(connector), registry);
        let token = service
            .create_link_token("u1", "Acme", "hr@acme.test", vec![])
            .await
            .unwrap();
        assert_eq!(token, "link_tok");
    }
}
