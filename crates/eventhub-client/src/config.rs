use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{ClientError, Result};

/// Retry delay after the server closes the stream.
pub const DEFAULT_CLOSE_RETRY_SECS: u64 = 3;
/// Retry delay after a failed connection attempt.
pub const DEFAULT_ERROR_RETRY_SECS: u64 = 5;

/// Client config (client.toml + EVENTHUB_CLIENT_* env overrides).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_ws_url")]
    pub ws_url: String,
    #[serde(default = "default_session_path")]
    pub session_path: String,
    #[serde(default = "default_close_retry")]
    pub close_retry_secs: u64,
    #[serde(default = "default_error_retry")]
    pub error_retry_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            ws_url: default_ws_url(),
            session_path: default_session_path(),
            close_retry_secs: default_close_retry(),
            error_retry_secs: default_error_retry(),
        }
    }
}

fn default_api_base() -> String {
    "http://127.0.0.1:3000/api".to_string()
}
fn default_ws_url() -> String {
    "ws://127.0.0.1:3000/ws".to_string()
}
fn default_session_path() -> String {
    format!("{}/session.json", home_dir())
}
fn default_close_retry() -> u64 {
    DEFAULT_CLOSE_RETRY_SECS
}
fn default_error_retry() -> u64 {
    DEFAULT_ERROR_RETRY_SECS
}

fn home_dir() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.eventhub", home)
}

impl ClientConfig {
    /// Load from TOML with `EVENTHUB_CLIENT_*` overrides. A missing file is fine.
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(|| format!("{}/client.toml", home_dir()));

        Figment::from(Serialized::defaults(ClientConfig::default()))
            .merge(Toml::file(&path))
            .merge(Env::prefixed("EVENTHUB_CLIENT_"))
            .extract()
            .map_err(|e| ClientError::Config(e.to_string()))
    }

    pub fn retry_policy(&self) -> crate::stream::RetryPolicy {
        crate::stream::RetryPolicy {
            after_close: Duration::from_secs(self.close_retry_secs),
            after_error: Duration::from_secs(self.error_retry_secs),
        }
    }
}
