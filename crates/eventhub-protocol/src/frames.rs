use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::envelope::Envelope;

pub const CONNECTED: &str = "CONNECTED";

/// First frame on every push-channel connection.
/// Wire: `{ "type": "CONNECTED", "message": "Connected" }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectedFrame {
    #[serde(rename = "type")]
    pub frame_type: String,
    pub message: String,
}

impl ConnectedFrame {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            frame_type: CONNECTED.to_string(),
            message: message.into(),
        }
    }
}

impl Default for ConnectedFrame {
    fn default() -> Self {
        Self::new("Connected")
    }
}

/// Any frame a client can receive on the push channel.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerFrame {
    Connected(ConnectedFrame),
    Notification(Envelope),
}

impl ServerFrame {
    /// Parse the `type` discriminator first, then the body.
    pub fn parse(text: &str) -> serde_json::Result<Self> {
        let value: Value = serde_json::from_str(text)?;
        if value.get("type").and_then(|t| t.as_str()) == Some(CONNECTED) {
            return Ok(ServerFrame::Connected(serde_json::from_value(value)?));
        }
        Ok(ServerFrame::Notification(serde_json::from_value(value)?))
    }
}
