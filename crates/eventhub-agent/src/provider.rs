use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A single message in the conversation history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

/// Request to an LLM provider.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub model: String,
    /// Plain text system prompt, sent as the first message.
    pub system: String,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// Response from an LLM provider (non-streaming).
#[derive(Debug, Clone)]
pub struct ChatResponse {
    pub content: String,
    pub model: String,
    pub tokens_in: u32,
    pub tokens_out: u32,
    pub stop_reason: String,
}

/// Common interface for chat-completion backends.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Provider name for logging and error messages.
    fn name(&self) -> &str;

    /// Send a chat request and wait for the full response.
    async fn send(&self, req: &ChatRequest) -> Result<ChatResponse, ProviderError>;
}

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The endpoint could not be reached at all (DNS, refused, timeout).
    #[error("connection failed: {0}")]
    Connect(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    /// No API key configured.
    #[error("provider not configured")]
    NotConfigured,
}

impl ProviderError {
    pub fn code(&self) -> &'static str {
        match self {
            ProviderError::Http(_) => "HTTP_ERROR",
            ProviderError::Connect(_) => "CONNECT_FAILED",
            ProviderError::Api { .. } => "API_ERROR",
            ProviderError::Parse(_) => "PARSE_ERROR",
            ProviderError::RateLimited { .. } => "RATE_LIMITED",
            ProviderError::NotConfigured => "NOT_CONFIGURED",
        }
    }

    /// Credentials were rejected or never supplied.
    pub fn is_auth(&self) -> bool {
        matches!(
            self,
            ProviderError::NotConfigured | ProviderError::Api { status: 401, .. }
        )
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(
            self,
            ProviderError::RateLimited { .. } | ProviderError::Api { status: 429, .. }
        )
    }
}

/// Stand-in used when no API key is configured. Every call fails with
/// `NotConfigured`, so callers always take their fallback path.
pub struct UnconfiguredProvider;

#[async_trait]
impl LlmProvider for UnconfiguredProvider {
    fn name(&self) -> &str {
        "unconfigured"
    }

    async fn send(&self, _req: &ChatRequest) -> Result<ChatResponse, ProviderError> {
        Err(ProviderError::NotConfigured)
    }
}
