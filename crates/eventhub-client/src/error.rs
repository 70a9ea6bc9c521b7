use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status and an `{error}` body.
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("not logged in")]
    NoSession,

    #[error("config error: {0}")]
    Config(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ClientError {
    pub fn code(&self) -> &'static str {
        match self {
            ClientError::Http(_) => "HTTP_ERROR",
            ClientError::Api { .. } => "API_ERROR",
            ClientError::Transport(_) => "TRANSPORT_ERROR",
            ClientError::NoSession => "NO_SESSION",
            ClientError::Config(_) => "CONFIG_ERROR",
            ClientError::Serialization(_) => "SERIALIZATION_ERROR",
            ClientError::Io(_) => "IO_ERROR",
        }
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
