pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod utils;

use std::sync::Arc;

use reqwest::Client;

use crate::config::Config;
use crate::database::Store;
use crate::error::{Error, Result};
use crate::services::{
    call_service::{AgentDefaults, CallService},
    candidate_service::CandidateService,
    connection_registry::ConnectionRegistry,
    elevenlabs_service::ElevenLabsService,
    gateway::{ConnectorAggregator, TelephonyProvider},
    job_service::JobService,
    link_service::LinkService,
    merge_service::MergeService,
    question_service::QuestionService,
    sync_service::SyncService,
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub candidate_service: CandidateService,
    pub job_service: JobService,
    pub question_service: QuestionService,
    pub call_service: CallService,
    pub sync_service: SyncService,
    pub registry: ConnectionRegistry,
    pub link_service: LinkService,
}

impl AppState {
    /// Wires the HTTP gateways for ElevenLabs and Merge from configuration.
    pub fn new(config: Arc<Config>, store: Arc<dyn Store>) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(config.provider_timeout())
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {}", e)))?;

        let telephony = Arc::new(ElevenLabsService::new(
            http_client.clone(),
            config.elevenlabs_api_url.clone(),
            config.elevenlabs_api_key.clone(),
            config.elevenlabs_agent_id.clone(),
            config.elevenlabs_phone_number_id.clone(),
        ));
        let connector = Arc::new(MergeService::new(
            http_client,
            config.merge_api_url.clone(),
            config.merge_api_key.clone(),
        ));

        Ok(Self::with_gateways(config, store, telephony, connector))
    }

    pub fn with_gateways(
        config: Arc<Config>,
        store: Arc<dyn Store>,
        telephony: Arc<dyn TelephonyProvider>,
        connector: Arc<dyn ConnectorAggregator>,
    ) -> Self {
        let retry = config.retry_policy();
        let registry = ConnectionRegistry::new(store.clone());

        let call_service = CallService::new(
            store.clone(),
            telephony,
            retry.clone(),
            AgentDefaults {
                agent_id: config.elevenlabs_agent_id.clone(),
                agent_phone_number_id: config.elevenlabs_phone_number_id.clone(),
            },
        );
        let sync_service = SyncService::new(
            store.clone(),
            connector.clone(),
            registry.clone(),
            retry,
        );
        let link_service = LinkService::new(connector, registry.clone());

        Self {
            config,
            candidate_service: CandidateService::new(store.clone()),
            job_service: JobService::new(store.clone()),
            question_service: QuestionService::new(store),
            call_service,
            sync_service,
            registry,
            link_service,
        }
    }
}
