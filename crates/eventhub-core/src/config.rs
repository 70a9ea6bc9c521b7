use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_BIND: &str = "127.0.0.1";
pub const DEFAULT_API_PREFIX: &str = "/api";
pub const DEFAULT_TOKEN_TTL_HOURS: i64 = 24;
pub const DEFAULT_JWT_SECRET: &str = "default_secret_change_me";
pub const MAX_WS_FRAME_BYTES: usize = 64 * 1024; // inbound cap per WS frame
pub const WS_OUTBOUND_BUFFER: usize = 256; // per-client queued envelopes before eviction

/// Top-level server config (eventhub.toml + EVENTHUB_* env overrides).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EventHubConfig {
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub mail: MailConfig,
    #[serde(default)]
    pub ai: AiConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Prefix mounted in front of every REST route. `/ws` and `/health` stay at the root.
    #[serde(default = "default_api_prefix")]
    pub api_prefix: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            bind: DEFAULT_BIND.to_string(),
            api_prefix: DEFAULT_API_PREFIX.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default = "default_jwt_secret")]
    pub jwt_secret: String,
    #[serde(default = "default_token_ttl_hours")]
    pub token_ttl_hours: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: default_jwt_secret(),
            token_ttl_hours: DEFAULT_TOKEN_TTL_HOURS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailConfig {
    #[serde(default = "default_mail_from")]
    pub from: String,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            from: default_mail_from(),
        }
    }
}

/// OpenAI-compatible chat endpoint used by the assistant routes.
/// Without an `api_key` the assistant answers from the fallback path only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    pub api_key: Option<String>,
    #[serde(default = "default_ai_base_url")]
    pub base_url: String,
    #[serde(default = "default_ai_model")]
    pub model: String,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_ai_base_url(),
            model: default_ai_model(),
        }
    }
}

fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}
fn default_api_prefix() -> String {
    DEFAULT_API_PREFIX.to_string()
}
fn default_jwt_secret() -> String {
    DEFAULT_JWT_SECRET.to_string()
}
fn default_token_ttl_hours() -> i64 {
    DEFAULT_TOKEN_TTL_HOURS
}
fn default_mail_from() -> String {
    "\"Event Manager\" <noreply@eventmanager.com>".to_string()
}
fn default_ai_base_url() -> String {
    "https://api.openai.com".to_string()
}
fn default_ai_model() -> String {
    "gpt-3.5-turbo".to_string()
}
fn default_db_path() -> String {
    format!("{}/eventhub.db", home_dir())
}

pub(crate) fn home_dir() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.eventhub", home)
}

impl EventHubConfig {
    /// Load config from a TOML file with EVENTHUB_* env var overrides.
    ///
    /// Nested keys use a double underscore: `EVENTHUB_AUTH__JWT_SECRET`.
    /// Path precedence: argument, then `EVENTHUB_CONFIG`, then `~/.eventhub/eventhub.toml`.
    /// A missing file is not an error; every section has defaults.
    pub fn load(config_path: Option<&str>) -> crate::error::Result<Self> {
        let path = config_path
            .map(String::from)
            .or_else(|| std::env::var("EVENTHUB_CONFIG").ok())
            .unwrap_or_else(default_config_path);

        let config: EventHubConfig = Figment::from(Serialized::defaults(EventHubConfig::default()))
            .merge(Toml::file(&path))
            .merge(Env::prefixed("EVENTHUB_").split("__"))
            .extract()
            .map_err(|e| crate::error::EventHubError::Config(e.to_string()))?;

        Ok(config)
    }
}

fn default_config_path() -> String {
    format!("{}/eventhub.toml", home_dir())
}
