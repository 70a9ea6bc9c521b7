//! Workflow gate: authorization and precondition checks for every mutating
//! operation, followed by exactly one broadcast on success.
//!
//! Check order per operation matters for the REST surface: role checks that
//! do not need the stored event run first (403 before 404), then existence,
//! then ownership, then input validation, then state preconditions.

use std::sync::Arc;

use chrono::Utc;
use eventhub_core::dates::{is_future, parse_event_date};
use eventhub_core::mail::{deliver, Mailer, OutboundEmail};
use eventhub_core::types::{Caller, Event, Rsvp, RsvpStatus};
use eventhub_protocol::{Broadcast, Envelope};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::error::{GateError, Result};
use crate::store::{ApproveOutcome, EventPatch, EventStore, NewEvent};

const MISSING_FIELDS: &str = "All fields (title, description, date, location) are required";
const INVALID_DATE: &str = "Invalid date format";
const PAST_DATE: &str = "Event date must be in the future";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateEventRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub location: String,
}

/// Partial update; absent fields keep their stored value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateEventRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub date: Option<String>,
    pub location: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RsvpRequest {
    #[serde(default)]
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub success: bool,
    pub id: String,
}

/// Outcome of an RSVP upsert. `inserted` decides both the broadcast kind and
/// the HTTP status (201 vs 200).
#[derive(Debug, Clone)]
pub struct RsvpOutcome {
    pub rsvp: Rsvp,
    pub inserted: bool,
}

/// Owns the mutating workflow. Cloning is cheap; all members are shared.
#[derive(Clone)]
pub struct Workflow {
    store: EventStore,
    broadcaster: Arc<dyn Broadcast>,
    mailer: Arc<dyn Mailer>,
}

impl Workflow {
    pub fn new(store: EventStore, broadcaster: Arc<dyn Broadcast>, mailer: Arc<dyn Mailer>) -> Self {
        Self {
            store,
            broadcaster,
            mailer,
        }
    }

    pub fn store(&self) -> &EventStore {
        &self.store
    }

    fn emit(&self, envelope: Envelope) {
        let kind = envelope.kind;
        let delivered = self.broadcaster.broadcast(envelope);
        debug!(%kind, delivered, "notification broadcast");
    }

    // ---- mutations ----

    #[instrument(skip(self, caller, req), fields(caller = %caller.id))]
    pub fn create_event(&self, caller: &Caller, req: CreateEventRequest) -> Result<Event> {
        if !caller.role.can_create_events() {
            return Err(GateError::Forbidden(
                "Only ORGANIZER or ADMIN can create events".into(),
            ));
        }

        let fields = [&req.title, &req.description, &req.date, &req.location];
        if fields.iter().any(|f| f.trim().is_empty()) {
            return Err(GateError::Validation(MISSING_FIELDS.into()));
        }
        let date = validate_date(&req.date)?;

        let event = self.store.insert_event(NewEvent {
            title: req.title,
            description: req.description,
            date,
            location: req.location,
            organizer_id: caller.id.clone(),
        })?;
        info!(event_id = %event.id, "event created");

        self.emit(Envelope::event_created(&event));
        Ok(event)
    }

    #[instrument(skip(self, caller, req), fields(caller = %caller.id))]
    pub fn update_event(&self, caller: &Caller, id: &str, req: UpdateEventRequest) -> Result<Event> {
        let existing = self.store.get_event(id)?.ok_or_else(GateError::event_not_found)?;
        ensure_owner_or_admin(caller, &existing, "update")?;

        let text_fields = [&req.title, &req.description, &req.location];
        if text_fields.iter().any(|f| f.as_deref().is_some_and(|v| v.trim().is_empty())) {
            return Err(GateError::Validation("Fields cannot be empty".into()));
        }
        // an empty date means "unchanged", like an absent one
        let date = req
            .date
            .as_deref()
            .filter(|d| !d.trim().is_empty())
            .map(validate_date)
            .transpose()?;

        let patch = EventPatch {
            title: req.title,
            description: req.description,
            date,
            location: req.location,
        };
        // a concurrent delete between the read and the write surfaces as 404
        let event = self
            .store
            .update_event(id, patch)?
            .ok_or_else(GateError::event_not_found)?;
        info!(event_id = %event.id, "event updated");

        self.emit(Envelope::event_updated(&event));
        Ok(event)
    }

    #[instrument(skip(self, caller), fields(caller = %caller.id))]
    pub fn delete_event(&self, caller: &Caller, id: &str) -> Result<DeleteResponse> {
        let existing = self.store.get_event(id)?.ok_or_else(GateError::event_not_found)?;
        ensure_owner_or_admin(caller, &existing, "delete")?;

        if !self.store.delete_event_cascade(id)? {
            return Err(GateError::event_not_found());
        }
        info!(event_id = %id, "event deleted");

        self.emit(Envelope::event_deleted(id));
        Ok(DeleteResponse {
            success: true,
            id: id.to_string(),
        })
    }

    /// One-way approval. Notifies the organizer by email before broadcasting.
    #[instrument(skip(self, caller), fields(caller = %caller.id))]
    pub fn approve_event(&self, caller: &Caller, id: &str) -> Result<Event> {
        if !caller.role.is_admin() {
            return Err(GateError::Forbidden("Only ADMIN can approve events".into()));
        }

        let event = match self.store.approve_event(id)? {
            ApproveOutcome::Approved(event) => event,
            ApproveOutcome::AlreadyApproved => {
                return Err(GateError::Conflict("Event is already approved".into()))
            }
            ApproveOutcome::Missing => return Err(GateError::event_not_found()),
        };
        info!(event_id = %event.id, "event approved");

        deliver(
            self.mailer.as_ref(),
            OutboundEmail::event_approved(&event.organizer.email, &event.title),
        );

        self.emit(Envelope::event_approved(&event));
        Ok(event)
    }

    /// Create or replace the caller's own RSVP for `event_id`.
    #[instrument(skip(self, caller, req), fields(caller = %caller.id))]
    pub fn upsert_rsvp(&self, caller: &Caller, event_id: &str, req: RsvpRequest) -> Result<RsvpOutcome> {
        let status: RsvpStatus = req.status.parse().map_err(|_| {
            let allowed: Vec<&str> = RsvpStatus::ALL.iter().map(RsvpStatus::as_str).collect();
            GateError::Validation(format!("Invalid status. Must be one of: {}", allowed.join(", ")))
        })?;

        let event = self
            .store
            .get_event(event_id)?
            .ok_or_else(GateError::event_not_found)?;
        if !event.approved {
            return Err(GateError::Validation("Cannot RSVP to unapproved events".into()));
        }

        let (rsvp, inserted) = self
            .store
            .upsert_rsvp(&caller.id, event_id, status)?
            .ok_or_else(GateError::event_not_found)?;
        info!(rsvp_id = %rsvp.id, %status, inserted, "rsvp saved");

        self.emit(Envelope::rsvp(&rsvp, inserted));
        Ok(RsvpOutcome { rsvp, inserted })
    }

    // ---- reads ----

    /// Events the caller may see, soonest first.
    pub fn list_events(&self, caller: &Caller) -> Result<Vec<Event>> {
        let events = self.store.list_events()?;
        Ok(events.into_iter().filter(|e| e.visible_to(caller)).collect())
    }

    /// Unapproved events awaiting review. ADMIN only.
    pub fn pending_events(&self, caller: &Caller) -> Result<Vec<Event>> {
        if !caller.role.is_admin() {
            return Err(GateError::Forbidden("Only ADMIN can view pending events".into()));
        }
        let events = self.store.list_events()?;
        Ok(events.into_iter().filter(|e| !e.approved).collect())
    }

    /// RSVPs for one event. A pending event the caller cannot see reads as missing.
    pub fn event_rsvps(&self, caller: &Caller, event_id: &str) -> Result<Vec<Rsvp>> {
        let event = self
            .store
            .get_event(event_id)?
            .filter(|e| e.visible_to(caller))
            .ok_or_else(GateError::event_not_found)?;
        Ok(self.store.rsvps_for_event(&event.id)?)
    }

    pub fn my_rsvps(&self, caller: &Caller) -> Result<Vec<Rsvp>> {
        Ok(self.store.rsvps_for_user(&caller.id, None)?)
    }
}

fn ensure_owner_or_admin(caller: &Caller, event: &Event, action: &str) -> Result<()> {
    if caller.role.is_admin() || event.organizer_id == caller.id {
        Ok(())
    } else {
        Err(GateError::Forbidden(format!("Not authorized to {action} this event")))
    }
}

fn validate_date(raw: &str) -> Result<chrono::DateTime<Utc>> {
    let date = parse_event_date(raw).ok_or_else(|| GateError::Validation(INVALID_DATE.into()))?;
    if !is_future(date, Utc::now()) {
        return Err(GateError::Validation(PAST_DATE.into()));
    }
    Ok(date)
}
