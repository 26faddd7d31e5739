#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use futures::{stream, StreamExt};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::Value;
use tower::ServiceExt;

use screening_backend::{
    config::Config,
    database::MemoryStore,
    middleware::auth::Claims,
    models::{
        call::{CallStatus, InboundEvent},
        candidate::Candidate,
        connection::Category,
        remote::RemoteRecord,
    },
    routes::app_router,
    services::gateway::{
        CallDetails, ConnectorAggregator, GatewayError, LinkRequest, LinkedAccount, RemoteAccount,
        RecordStream, StartCallRequest, StartedCall, TelephonyProvider,
    },
    AppState,
};

pub const JWT_SECRET: &str = "test_secret_key";
pub const WEBHOOK_SECRET: &str = "whsec_test";
pub const SIGNING_SECRET: &str = "sign_test";

pub fn test_config() -> Config {
    Config {
        server_address: "127.0.0.1:0".into(),
        database_url: None,
        jwt_secret: JWT_SECRET.into(),
        webhook_secret: WEBHOOK_SECRET.into(),
        elevenlabs_api_url: "http://127.0.0.1:9".into(),
        elevenlabs_api_key: Some("xi-test".into()),
        elevenlabs_agent_id: Some("agent_test".into()),
        elevenlabs_phone_number_id: Some("phone_test".into()),
        elevenlabs_webhook_secret: Some(SIGNING_SECRET.into()),
        merge_api_url: "http://127.0.0.1:9".into(),
        merge_api_key: Some("merge-test".into()),
        api_rps: 10_000,
        webhook_rps: 10_000,
        provider_timeout_secs: 5,
        retry_max_attempts: 3,
        retry_initial_delay_ms: 1,
        retry_max_delay_ms: 5,
    }
}

/// Accepts every call and numbers them `CA1`/`conv_1`, `CA2`/`conv_2`, ...
#[derive(Default)]
pub struct FakeTelephony {
    started: AtomicUsize,
    pub requests: Mutex<Vec<StartCallRequest>>,
}

#[async_trait]
impl TelephonyProvider for FakeTelephony {
    async fn start_call(&self, request: StartCallRequest) -> Result<StartedCall, GatewayError> {
        let n = self.started.fetch_add(1, Ordering::SeqCst) + 1;
        self.requests.lock().unwrap().push(request);
        Ok(StartedCall {
            provider_call_id: Some(format!("CA{}", n)),
            provider_conversation_id: Some(format!("conv_{}", n)),
        })
    }

    async fn get_call_details(&self, conversation_id: &str) -> Result<CallDetails, GatewayError> {
        Ok(CallDetails {
            conversation_id: conversation_id.to_string(),
            event: InboundEvent {
                status: Some(CallStatus::Completed),
                summary: Some("Candidate confirmed availability".into()),
                ..Default::default()
            },
        })
    }
}

/// Serves whatever records the test put in `remote`.
#[derive(Default)]
pub struct FakeConnector {
    pub remote: Mutex<HashMap<Category, Vec<RemoteRecord>>>,
    pub pushed: Mutex<Vec<String>>,
    /// (remote id, current title) of every contact update.
    pub updated: Mutex<Vec<(String, Option<String>)>>,
    pub accounts: Mutex<Vec<RemoteAccount>>,
}

impl FakeConnector {
    pub fn set_records(&self, category: Category, records: Vec<RemoteRecord>) {
        self.remote.lock().unwrap().insert(category, records);
    }

    pub fn set_accounts(&self, accounts: Vec<RemoteAccount>) {
        *self.accounts.lock().unwrap() = accounts;
    }
}

#[async_trait]
impl ConnectorAggregator for FakeConnector {
    async fn create_link_token(&self, request: LinkRequest) -> Result<String, GatewayError> {
        Ok(format!("link_{}", request.end_user_origin_id))
    }

    async fn exchange_public_token(&self, public_token: &str) -> Result<LinkedAccount, GatewayError> {
        let category = match public_token {
            "pub_ats" => Category::Ats,
            "pub_crm" => Category::Crm,
            _ => {
                return Err(GatewayError::Rejected {
                    status: 400,
                    message: "unknown public token".into(),
                })
            }
        };
        Ok(LinkedAccount {
            account_token: format!("acct_{}", category),
            integration: Some("TestATS".into()),
            category,
        })
    }

    fn pull_records(&self, _account_token: &str, category: Category) -> RecordStream {
        let records = self
            .remote
            .lock()
            .unwrap()
            .get(&category)
            .cloned()
            .unwrap_or_default();
        stream::iter(records.into_iter().map(Ok)).boxed()
    }

    async fn push_candidate(
        &self,
        _account_token: &str,
        candidate: &Candidate,
    ) -> Result<String, GatewayError> {
        let remote_id = format!("crm-{}", candidate.id);
        self.pushed.lock().unwrap().push(remote_id.clone());
        Ok(remote_id)
    }

    async fn update_contact(
        &self,
        _account_token: &str,
        remote_id: &str,
        candidate: &Candidate,
    ) -> Result<(), GatewayError> {
        self.updated
            .lock()
            .unwrap()
            .push((remote_id.to_string(), candidate.current_title.clone()));
        Ok(())
    }

    async fn linked_accounts(&self, _end_user_origin_id: &str) -> Result<Vec<RemoteAccount>, GatewayError> {
        Ok(self.accounts.lock().unwrap().clone())
    }
}

pub struct TestApp {
    pub router: Router,
    pub telephony: Arc<FakeTelephony>,
    pub connector: Arc<FakeConnector>,
}

pub fn test_app() -> TestApp {
    let telephony = Arc::new(FakeTelephony::default());
    let connector = Arc::new(FakeConnector::default());
    let state = AppState::with_gateways(
        Arc::new(test_config()),
        Arc::new(MemoryStore::new()),
        telephony.clone(),
        connector.clone(),
    );
    TestApp {
        router: app_router(state),
        telephony,
        connector,
    }
}

pub fn token_for(user_id: &str) -> String {
    let claims = Claims {
        sub: user_id.to_string(),
        exp: (chrono::Utc::now() + chrono::Duration::hours(1)).timestamp() as usize,
        role: Some("recruiter".into()),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .expect("encode jwt")
}

pub async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    headers: &[(&str, &str)],
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("request");

    let response = app.clone().oneshot(request).await.expect("response");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, json)
}

pub async fn send_raw(
    app: &Router,
    uri: &str,
    headers: &[(&str, &str)],
    body: Vec<u8>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method("POST").uri(uri);
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    let request = builder
        .header("content-type", "application/json")
        .body(Body::from(body))
        .expect("request");
    let response = app.clone().oneshot(request).await.expect("response");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

/// Bearer header pair for `user_id`.
pub fn bearer(token: &str) -> String {
    format!("Bearer {}", token)
}
