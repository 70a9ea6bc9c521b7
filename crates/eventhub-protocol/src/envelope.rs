use chrono::{DateTime, Utc};
use eventhub_core::types::{Event, Rsvp};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Closed set of state changes pushed to connected clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationKind {
    EventCreated,
    EventUpdated,
    EventDeleted,
    EventApproved,
    RsvpCreated,
    RsvpUpdated,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::EventCreated => "EVENT_CREATED",
            NotificationKind::EventUpdated => "EVENT_UPDATED",
            NotificationKind::EventDeleted => "EVENT_DELETED",
            NotificationKind::EventApproved => "EVENT_APPROVED",
            NotificationKind::RsvpCreated => "RSVP_CREATED",
            NotificationKind::RsvpUpdated => "RSVP_UPDATED",
        }
    }
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Server → Client push notification.
/// Wire: `{ "type": "EVENT_CREATED", "payload": {...}, "timestamp": "2030-01-01T00:00:00Z" }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub payload: Value,
    #[serde(rename = "timestamp")]
    pub emitted_at: DateTime<Utc>,
}

/// Payload of `EVENT_DELETED`: only the id survives the deletion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletedPayload {
    pub id: String,
}

impl Envelope {
    pub fn new(kind: NotificationKind, payload: impl Serialize) -> Self {
        Self {
            kind,
            payload: serde_json::to_value(payload).unwrap_or(Value::Null),
            emitted_at: Utc::now(),
        }
    }

    pub fn event_created(event: &Event) -> Self {
        Self::new(NotificationKind::EventCreated, event)
    }

    pub fn event_updated(event: &Event) -> Self {
        Self::new(NotificationKind::EventUpdated, event)
    }

    pub fn event_approved(event: &Event) -> Self {
        Self::new(NotificationKind::EventApproved, event)
    }

    pub fn event_deleted(id: &str) -> Self {
        Self::new(NotificationKind::EventDeleted, DeletedPayload { id: id.to_string() })
    }

    /// `RSVP_CREATED` when the upsert inserted a row, `RSVP_UPDATED` otherwise.
    pub fn rsvp(rsvp: &Rsvp, inserted: bool) -> Self {
        let kind = if inserted {
            NotificationKind::RsvpCreated
        } else {
            NotificationKind::RsvpUpdated
        };
        Self::new(kind, rsvp)
    }

    /// Id carried by the payload, present for every kind.
    pub fn payload_id(&self) -> Option<&str> {
        self.payload.get("id").and_then(|v| v.as_str())
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
