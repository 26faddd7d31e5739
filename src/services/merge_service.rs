use async_trait::async_trait;
use futures::{stream, StreamExt, TryStreamExt};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::models::{
    candidate::Candidate,
    connection::Category,
    remote::{RemoteCandidate, RemoteJob, RemoteRecord},
};
use crate::services::gateway::{
    ConnectorAggregator, GatewayError, LinkRequest, LinkedAccount, RecordStream, RemoteAccount,
};

const PAGE_SIZE: u32 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Resource {
    AtsCandidates,
    AtsJobs,
    CrmContacts,
}

impl Resource {
    fn path(self) -> &'static str {
        match self {
            Resource::AtsCandidates => "ats/v1/candidates",
            Resource::AtsJobs => "ats/v1/jobs",
            Resource::CrmContacts => "crm/v1/contacts",
        }
    }

    fn shape(self, item: &Value) -> RemoteRecord {
        match self {
            Resource::AtsCandidates => shape_candidate(item, "value", "value"),
            Resource::CrmContacts => shape_candidate(item, "email_address", "phone_number"),
            Resource::AtsJobs => shape_job(item),
        }
    }
}

#[derive(Debug, Deserialize)]
struct Page {
    #[serde(default)]
    next: Option<String>,
    #[serde(default)]
    results: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct LinkTokenResponse {
    link_token: String,
}

#[derive(Debug, Deserialize)]
struct AccountTokenResponse {
    account_token: String,
    #[serde(default)]
    integration: Option<IntegrationInfo>,
}

#[derive(Debug, Deserialize)]
struct IntegrationInfo {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    categories: Vec<String>,
}

/// Everything one page request needs, cheap to clone into each stream step.
#[derive(Clone)]
struct PageFetcher {
    client: Client,
    api_url: String,
    api_key: Option<String>,
    account_token: String,
}

impl PageFetcher {
    async fn fetch(&self, resource: Resource, cursor: Option<&str>) -> Result<Page, GatewayError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| GatewayError::NotConfigured("MERGE_API_KEY".into()))?;

        let mut request = self
            .client
            .get(format!("{}/{}", self.api_url, resource.path()))
            .bearer_auth(api_key)
            .header("X-Account-Token", &self.account_token)
            .query(&[("page_size", PAGE_SIZE.to_string())]);
        if let Some(cursor) = cursor {
            request = request.query(&[("cursor", cursor)]);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::from_status(status, body));
        }
        let page: Page = response.json().await?;
        debug!(
            resource = resource.path(),
            count = page.results.len(),
            has_next = page.next.is_some(),
            "fetched page"
        );
        Ok(page)
    }

    /// Pages through one resource lazily, following `next` cursors.
    fn records(self, resource: Resource) -> RecordStream {
        let pages = stream::try_unfold(Some(None::<String>), move |state| {
            let fetcher = self.clone();
            async move {
                let Some(cursor) = state else {
                    return Ok(None);
                };
                let page = fetcher.fetch(resource, cursor.as_deref()).await?;
                let records: Vec<RemoteRecord> =
                    page.results.iter().map(|item| resource.shape(item)).collect();
                Ok::<_, GatewayError>(Some((records, page.next.map(Some))))
            }
        });

        pages
            .map_ok(|records| stream::iter(records.into_iter().map(Ok::<_, GatewayError>)))
            .try_flatten()
            .boxed()
    }
}

fn str_field(item: &Value, key: &str) -> Option<String> {
    item.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn first_nested(item: &Value, list: &str, key: &str) -> Option<String> {
    item.get(list)?
        .as_array()?
        .iter()
        .find_map(|entry| str_field(entry, key))
}

fn string_list(item: &Value, key: &str) -> Vec<String> {
    item.get(key)
        .and_then(Value::as_array)
        .map(|values| {
            values
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn shape_candidate(item: &Value, email_key: &str, phone_key: &str) -> RemoteRecord {
    let Some(remote_id) = str_field(item, "id") else {
        return RemoteRecord::Malformed {
            remote_id: None,
            reason: "record has no id".into(),
        };
    };

    let full_name = [str_field(item, "first_name"), str_field(item, "last_name")]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(" ");

    RemoteRecord::Candidate(RemoteCandidate {
        remote_id,
        full_name,
        email: first_nested(item, "email_addresses", email_key),
        phone: first_nested(item, "phone_numbers", phone_key),
        current_title: str_field(item, "title"),
        current_company: str_field(item, "company"),
        location: string_list(item, "locations").into_iter().next(),
        skills: string_list(item, "tags"),
        years_of_experience: None,
    })
}

fn shape_job(item: &Value) -> RemoteRecord {
    let Some(remote_id) = str_field(item, "id") else {
        return RemoteRecord::Malformed {
            remote_id: None,
            reason: "record has no id".into(),
        };
    };

    RemoteRecord::Job(RemoteJob {
        remote_id,
        title: str_field(item, "name").unwrap_or_default(),
        company: None,
        description: str_field(item, "description"),
        required_skills: Vec::new(),
        location: None,
    })
}

/// Only accounts whose origin id is this user. The integration's own
/// category list wins over the endpoint the account was listed under.
fn shape_linked_account(item: &Value, user_id: &str, listed_under: Category) -> Option<RemoteAccount> {
    if str_field(item, "end_user_origin_id").as_deref() != Some(user_id) {
        return None;
    }
    let (integration, categories) = match item.get("integration") {
        Some(info) if info.is_object() => (str_field(info, "name"), string_list(info, "categories")),
        Some(Value::String(name)) => (Some(name.clone()), Vec::new()),
        _ => (None, Vec::new()),
    };
    let declared: Vec<Category> = categories.iter().filter_map(|c| c.parse().ok()).collect();
    let category = if declared.is_empty() || declared.contains(&listed_under) {
        listed_under
    } else {
        declared[0]
    };
    Some(RemoteAccount {
        category,
        integration,
        account_token: str_field(item, "account_token"),
    })
}

fn contact_model(candidate: &Candidate) -> Value {
    let (first_name, last_name) = split_name(&candidate.full_name);
    let mut description = String::new();
    if !candidate.skills.is_empty() {
        description.push_str(&format!("Skills: {}", candidate.skills.join(", ")));
    }
    if let Some(company) = &candidate.current_company {
        if !description.is_empty() {
            description.push_str("\n\n");
        }
        description.push_str(&format!("Current Company: {}", company));
    }

    let email_addresses: Vec<Value> = candidate
        .email
        .iter()
        .map(|e| json!({ "email_address": e, "email_address_type": "WORK" }))
        .collect();
    let phone_numbers: Vec<Value> = candidate
        .phone
        .iter()
        .map(|p| json!({ "phone_number": p, "phone_number_type": "WORK" }))
        .collect();

    json!({
        "model": {
            "first_name": first_name,
            "last_name": last_name,
            "title": candidate.current_title,
            "email_addresses": email_addresses,
            "phone_numbers": phone_numbers,
            "description": description,
        }
    })
}

fn split_name(full_name: &str) -> (String, String) {
    let mut parts = full_name.split_whitespace();
    let first = parts.next().unwrap_or_default().to_string();
    let last = parts.collect::<Vec<_>>().join(" ");
    (first, last)
}

#[derive(Clone)]
pub struct MergeService {
    client: Client,
    api_url: String,
    api_key: Option<String>,
}

impl MergeService {
    pub fn new(client: Client, api_url: String, api_key: Option<String>) -> Self {
        if api_key.is_some() {
            info!("Merge aggregator enabled, api: {}", api_url);
        } else {
            info!("Merge aggregator disabled (MERGE_API_KEY not set)");
        }
        Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    fn api_key(&self) -> Result<&str, GatewayError> {
        self.api_key
            .as_deref()
            .ok_or_else(|| GatewayError::NotConfigured("MERGE_API_KEY".into()))
    }

    async fn account_token(
        &self,
        prefix: &str,
        public_token: &str,
        default_category: Category,
    ) -> Result<LinkedAccount, GatewayError> {
        let response = self
            .client
            .get(format!("{}/{}/v1/account-token/{}", self.api_url, prefix, public_token))
            .bearer_auth(self.api_key()?)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::from_status(status, body));
        }

        let data: AccountTokenResponse = response.json().await?;
        let (integration, category) = match data.integration {
            Some(info) => {
                let category = info
                    .categories
                    .first()
                    .and_then(|c| c.parse().ok())
                    .unwrap_or(default_category);
                (info.name, category)
            }
            None => (None, default_category),
        };
        Ok(LinkedAccount {
            account_token: data.account_token,
            integration,
            category,
        })
    }
}

#[async_trait]
impl ConnectorAggregator for MergeService {
    async fn create_link_token(&self, request: LinkRequest) -> Result<String, GatewayError> {
        let payload = json!({
            "end_user_origin_id": request.end_user_origin_id,
            "end_user_organization_name": request.organization_name,
            "end_user_email_address": request.email_address,
            "categories": request.categories,
        });

        let response = self
            .client
            .post(format!("{}/integrations/create-link-token", self.api_url))
            .bearer_auth(self.api_key()?)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::from_status(status, body));
        }
        let data: LinkTokenResponse = response.json().await?;
        Ok(data.link_token)
    }

    /// The token's category is read from the integration metadata; the ATS
    /// endpoint is tried first and the CRM endpoint only if it refuses.
    async fn exchange_public_token(
        &self,
        public_token: &str,
    ) -> Result<LinkedAccount, GatewayError> {
        match self.account_token("ats", public_token, Category::Ats).await {
            Ok(account) => Ok(account),
            Err(e) if e.is_transient() => Err(e),
            Err(e) => {
                debug!(error = %e, "ats token exchange refused, trying crm");
                self.account_token("crm", public_token, Category::Crm).await
            }
        }
    }

    fn pull_records(&self, account_token: &str, category: Category) -> RecordStream {
        let fetcher = PageFetcher {
            client: self.client.clone(),
            api_url: self.api_url.clone(),
            api_key: self.api_key.clone(),
            account_token: account_token.to_string(),
        };
        match category {
            Category::Ats => fetcher
                .clone()
                .records(Resource::AtsCandidates)
                .chain(fetcher.records(Resource::AtsJobs))
                .boxed(),
            Category::Crm => fetcher.records(Resource::CrmContacts),
        }
    }

    async fn push_candidate(
        &self,
        account_token: &str,
        candidate: &Candidate,
    ) -> Result<String, GatewayError> {
        let response = self
            .client
            .post(format!("{}/crm/v1/contacts", self.api_url))
            .bearer_auth(self.api_key()?)
            .header("X-Account-Token", account_token)
            .json(&contact_model(candidate))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::from_status(status, body));
        }

        let body: Value = response.json().await?;
        body.get("model")
            .and_then(|m| str_field(m, "id"))
            .ok_or_else(|| GatewayError::InvalidResponse("created contact has no model.id".into()))
    }

    async fn update_contact(
        &self,
        account_token: &str,
        remote_id: &str,
        candidate: &Candidate,
    ) -> Result<(), GatewayError> {
        let response = self
            .client
            .patch(format!("{}/crm/v1/contacts/{}", self.api_url, remote_id))
            .bearer_auth(self.api_key()?)
            .header("X-Account-Token", account_token)
            .json(&contact_model(candidate))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::from_status(status, body));
        }
        Ok(())
    }

    async fn linked_accounts(
        &self,
        end_user_origin_id: &str,
    ) -> Result<Vec<RemoteAccount>, GatewayError> {
        let mut accounts: Vec<RemoteAccount> = Vec::new();
        for category in [Category::Ats, Category::Crm] {
            let response = self
                .client
                .get(format!("{}/{}/v1/linked-accounts", self.api_url, category.as_str()))
                .bearer_auth(self.api_key()?)
                .query(&[("end_user_origin_id", end_user_origin_id)])
                .send()
                .await?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(GatewayError::from_status(status, body));
            }
            let page: Page = response.json().await?;
            for account in page
                .results
                .iter()
                .filter_map(|item| shape_linked_account(item, end_user_origin_id, category))
            {
                if !accounts.contains(&account) {
                    accounts.push(account);
                }
            }
        }
        debug!(user_id = end_user_origin_id, count = accounts.len(), "fetched linked accounts");
        Ok(accounts)
    }
}
