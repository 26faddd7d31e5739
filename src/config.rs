use crate::error::{Error, Result};
use crate::services::retry::RetryPolicy;
use dotenvy::dotenv;
use std::env;
use std::sync::OnceLock;
use std::time::Duration;
use url::Url;

pub const ELEVENLABS_API_URL: &str = "https://api.elevenlabs.io/v1";
pub const MERGE_API_URL: &str = "https://api.merge.dev/api";

#[derive(Debug, Clone)]
pub struct Config {
    pub server_address: String,
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub webhook_secret: String,
    pub elevenlabs_api_url: String,
    pub elevenlabs_api_key: Option<String>,
    pub elevenlabs_agent_id: Option<String>,
    pub elevenlabs_phone_number_id: Option<String>,
    pub elevenlabs_webhook_secret: Option<String>,
    pub merge_api_url: String,
    pub merge_api_key: Option<String>,
    pub api_rps: u32,
    pub webhook_rps: u32,
    pub provider_timeout_secs: u64,
    pub retry_max_attempts: u32,
    pub retry_initial_delay_ms: u64,
    pub retry_max_delay_ms: u64,
}

pub static CONFIG: OnceLock<Config> = OnceLock::new();

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        Ok(Self {
            server_address: get_env("SERVER_ADDRESS")?,
            database_url: get_env_opt("DATABASE_URL"),
            jwt_secret: get_env("JWT_SECRET")?,
            webhook_secret: get_env("WEBHOOK_SECRET")?,
            elevenlabs_api_url: get_api_url("ELEVENLABS_API_URL", ELEVENLABS_API_URL)?,
            elevenlabs_api_key: get_env_opt("ELEVENLABS_API_KEY"),
            elevenlabs_agent_id: get_env_opt("ELEVENLABS_AGENT_ID"),
            elevenlabs_phone_number_id: get_env_opt("ELEVENLABS_PHONE_NUMBER_ID"),
            elevenlabs_webhook_secret: get_env_opt("ELEVENLABS_WEBHOOK_SECRET"),
            merge_api_url: get_api_url("MERGE_API_URL", MERGE_API_URL)?,
            merge_api_key: get_env_opt("MERGE_API_KEY"),
            api_rps: get_env_parse_or("API_RPS", 50)?,
            webhook_rps: get_env_parse_or("WEBHOOK_RPS", 100)?,
            provider_timeout_secs: get_env_parse_or("PROVIDER_TIMEOUT_SECS", 30)?,
            retry_max_attempts: get_env_parse_or("RETRY_MAX_ATTEMPTS", 3)?,
            retry_initial_delay_ms: get_env_parse_or("RETRY_INITIAL_DELAY_MS", 500)?,
            retry_max_delay_ms: get_env_parse_or("RETRY_MAX_DELAY_MS", 8000)?,
        })
    }

    pub fn provider_timeout(&self) -> Duration {
        Duration::from_secs(self.provider_timeout_secs.max(1))
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.retry_max_attempts.max(1),
            initial_delay: Duration::from_millis(self.retry_initial_delay_ms),
            max_delay: Duration::from_millis(self.retry_max_delay_ms),
            multiplier: 2.0,
            attempt_timeout: self.provider_timeout(),
        }
    }
}

fn get_env(name: &str) -> Result<String> {
    env::var(name).map_err(|_| Error::Config(format!("Missing environment variable: {}", name)))
}

fn get_env_opt(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Provider base URL override; must be absolute http(s).
fn get_api_url(name: &str, default: &str) -> Result<String> {
    let Some(raw) = get_env_opt(name) else {
        return Ok(default.to_string());
    };
    let url = Url::parse(raw.trim())
        .map_err(|e| Error::Config(format!("Invalid value for {}: {}", name, e)))?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(Error::Config(format!(
            "Invalid value for {}: unsupported scheme {}",
            name,
            url.scheme()
        )));
    }
    Ok(url.as_str().trim_end_matches('/').to_string())
}

fn get_env_parse_or<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match get_env_opt(name) {
        Some(raw) => raw
            .parse()
            .map_err(|e| Error::Config(format!("Invalid value for {}: {}", name, e))),
        None => Ok(default),
    }
}

pub fn init_config() -> Result<()> {
    let config = Config::from_env()?;
    CONFIG
        .set(config)
        .map_err(|_| Error::Config("Configuration has already been initialized".to_string()))?;
    Ok(())
}

pub fn get_config() -> Result<&'static Config> {
    CONFIG
        .get()
        .ok_or_else(|| Error::Config("Configuration has not been initialized".to_string()))
}
