//! Boundary to the telephony provider and the ATS/CRM aggregator.
//!
//! Gateways shape requests and classify failures; they never retry. Retry
//! policy lives with the callers in [`crate::services::retry`].

use std::collections::BTreeMap;

use async_trait::async_trait;
use futures::stream::BoxStream;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use crate::models::{
    call::InboundEvent,
    candidate::Candidate,
    connection::Category,
    remote::RemoteRecord,
};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    #[error("request timed out")]
    Timeout,

    #[error("upstream unavailable ({status}): {message}")]
    Unavailable { status: u16, message: String },

    #[error("rate limited by upstream")]
    RateLimited,

    #[error("network error: {0}")]
    Network(String),

    #[error("request rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("upstream rejected credentials")]
    Unauthenticated,

    #[error("connection is not linked")]
    NotLinked,

    #[error("gateway not configured: {0}")]
    NotConfigured(String),

    #[error("invalid upstream response: {0}")]
    InvalidResponse(String),
}

impl GatewayError {
    /// Timeouts, 5xx, 429 and connection-level failures may succeed on retry.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            GatewayError::Timeout
                | GatewayError::Unavailable { .. }
                | GatewayError::RateLimited
                | GatewayError::Network(_)
        )
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, GatewayError::Rejected { status: 404, .. })
    }

    pub fn from_status(status: StatusCode, body: String) -> Self {
        let code = status.as_u16();
        match status {
            StatusCode::TOO_MANY_REQUESTS => GatewayError::RateLimited,
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => GatewayError::Unauthenticated,
            StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => GatewayError::Timeout,
            s if s.is_server_error() => GatewayError::Unavailable {
                status: code,
                message: body,
            },
            _ => GatewayError::Rejected {
                status: code,
                message: body,
            },
        }
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            GatewayError::Timeout
        } else if err.is_decode() {
            GatewayError::InvalidResponse(err.to_string())
        } else if let Some(status) = err.status() {
            GatewayError::from_status(status, err.to_string())
        } else {
            GatewayError::Network(err.to_string())
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StartCallRequest {
    pub to_number: String,
    pub agent_id: Option<String>,
    pub agent_phone_number_id: Option<String>,
    pub dynamic_variables: BTreeMap<String, String>,
    pub first_message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartedCall {
    pub provider_call_id: Option<String>,
    pub provider_conversation_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CallDetails {
    pub conversation_id: String,
    pub event: InboundEvent,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TelephonyProvider: Send + Sync {
    async fn start_call(&self, request: StartCallRequest) -> Result<StartedCall, GatewayError>;

    async fn get_call_details(&self, conversation_id: &str) -> Result<CallDetails, GatewayError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkRequest {
    pub end_user_origin_id: String,
    pub organization_name: String,
    pub email_address: String,
    pub categories: Vec<Category>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkedAccount {
    pub account_token: String,
    pub integration: Option<String>,
    pub category: Category,
}

/// An account the aggregator reports as linked for an end user. Accounts
/// linked outside our handshake come back without a token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteAccount {
    pub category: Category,
    pub integration: Option<String>,
    pub account_token: Option<String>,
}

pub type RecordStream = BoxStream<'static, Result<RemoteRecord, GatewayError>>;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ConnectorAggregator: Send + Sync {
    async fn create_link_token(&self, request: LinkRequest) -> Result<String, GatewayError>;

    async fn exchange_public_token(&self, public_token: &str)
        -> Result<LinkedAccount, GatewayError>;

    /// Lazy, finite and not resumable: a failed pull restarts from the first page.
    fn pull_records(&self, account_token: &str, category: Category) -> RecordStream;

    /// Creates a remote contact and returns its id.
    async fn push_candidate(
        &self,
        account_token: &str,
        candidate: &Candidate,
    ) -> Result<String, GatewayError>;

    /// Overwrites an existing remote contact with the candidate's current fields.
    async fn update_contact(
        &self,
        account_token: &str,
        remote_id: &str,
        candidate: &Candidate,
    ) -> Result<(), GatewayError>;

    async fn linked_accounts(
        &self,
        end_user_origin_id: &str,
    ) -> Result<Vec<RemoteAccount>, GatewayError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_statuses() {
        assert!(GatewayError::from_status(StatusCode::BAD_GATEWAY, String::new()).is_transient());
        assert!(GatewayError::from_status(StatusCode::TOO_MANY_REQUESTS, String::new()).is_transient());
        assert!(GatewayError::from_status(StatusCode::GATEWAY_TIMEOUT, String::new()).is_transient());
        assert!(!GatewayError::from_status(StatusCode::UNPROCESSABLE_ENTITY, String::new()).is_transient());
        assert_eq!(
            GatewayError::from_status(StatusCode::UNAUTHORIZED, String::new()),
            GatewayError::Unauthenticated
        );
        assert!(!GatewayError::NotLinked.is_transient());
    }

    #[test]
    fn missing_remote_record_is_a_terminal_rejection() {
        let err = GatewayError::from_status(StatusCode::NOT_FOUND, "gone".into());
        assert!(err.is_not_found());
        assert!(!err.is_transient());
        assert!(!GatewayError::Timeout.is_not_found());
    }
}
