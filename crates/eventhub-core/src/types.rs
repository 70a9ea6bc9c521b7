use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Generate a fresh entity id (UUIDv7, time-sortable for easier log correlation).
pub fn new_id() -> String {
    Uuid::now_v7().to_string()
}

/// Per-connection identifier for push-channel clients (random UUID, not persisted).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnId(pub String);

impl ConnId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ConnId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ConnId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Account role. Fixed at signup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin,
    Organizer,
    #[default]
    Attendee,
}

impl Role {
    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }

    /// Organizers and admins may create events.
    pub fn can_create_events(&self) -> bool {
        matches!(self, Role::Admin | Role::Organizer)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Admin => write!(f, "ADMIN"),
            Role::Organizer => write!(f, "ORGANIZER"),
            Role::Attendee => write!(f, "ATTENDEE"),
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "ADMIN" => Ok(Role::Admin),
            "ORGANIZER" => Ok(Role::Organizer),
            "ATTENDEE" => Ok(Role::Attendee),
            other => Err(format!("unknown role: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RsvpStatus {
    Going,
    Maybe,
    NotGoing,
}

impl RsvpStatus {
    pub const ALL: [RsvpStatus; 3] = [RsvpStatus::Going, RsvpStatus::Maybe, RsvpStatus::NotGoing];

    pub fn as_str(&self) -> &'static str {
        match self {
            RsvpStatus::Going => "GOING",
            RsvpStatus::Maybe => "MAYBE",
            RsvpStatus::NotGoing => "NOT_GOING",
        }
    }
}

impl fmt::Display for RsvpStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RsvpStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "GOING" => Ok(RsvpStatus::Going),
            "MAYBE" => Ok(RsvpStatus::Maybe),
            "NOT_GOING" => Ok(RsvpStatus::NotGoing),
            other => Err(format!(
                "Invalid status '{}'. Must be one of: GOING, MAYBE, NOT_GOING",
                other
            )),
        }
    }
}

/// Public projection of a user: never carries the password hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: String,
    pub email: String,
}

/// Identity carried by a verified bearer token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caller {
    pub id: String,
    pub email: String,
    pub role: Role,
}

/// An event as persisted and as pushed to clients.
///
/// Wire names are camelCase so browser clients can consume the payload as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: String,
    pub title: String,
    pub description: String,
    pub date: DateTime<Utc>,
    pub location: String,
    pub organizer_id: String,
    pub organizer: UserSummary,
    pub approved: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Event {
    /// Whether `caller` may see this event while it is still pending.
    pub fn visible_to(&self, caller: &Caller) -> bool {
        self.approved || caller.role.is_admin() || self.organizer_id == caller.id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rsvp {
    pub id: String,
    pub user_id: String,
    pub event_id: String,
    pub status: RsvpStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub user: UserSummary,
    /// Embedded for "my RSVPs" listings and RSVP broadcasts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event: Option<Event>,
}
