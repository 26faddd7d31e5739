use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::connection::Category;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct LinkTokenPayload {
    #[validate(length(min = 1, max = 200))]
    pub organization_name: String,
    #[validate(email)]
    pub email_address: String,
    /// Defaults to ATS only.
    #[serde(default)]
    pub categories: Vec<Category>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkTokenResponse {
    pub link_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ExchangePayload {
    #[validate(length(min = 1))]
    pub public_token: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncQuery {
    pub category: Option<Category>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushPayload {
    pub candidate_id: Uuid,
}
