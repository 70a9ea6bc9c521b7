use eventhub_core::types::{Event, Rsvp};
use eventhub_protocol::{Envelope, NotificationKind};
use tracing::{debug, warn};

/// What applying one envelope did to local state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconcile {
    Applied,
    /// Nothing to change (unknown id, undecodable payload).
    Ignored,
    /// The caller must reload "my RSVPs" from the server. RSVP pushes reach
    /// every client, so their payloads are treated as an invalidation signal
    /// rather than data.
    RefetchRsvps,
}

/// Client-side mirror of server state.
#[derive(Debug, Clone, Default)]
pub struct LocalState {
    pub events: Vec<Event>,
    pub my_rsvps: Vec<Rsvp>,
}

impl LocalState {
    pub fn new(events: Vec<Event>, my_rsvps: Vec<Rsvp>) -> Self {
        Self { events, my_rsvps }
    }

    /// Apply one envelope. Envelopes must be applied in arrival order.
    pub fn apply(&mut self, envelope: &Envelope) -> Reconcile {
        match envelope.kind {
            NotificationKind::EventCreated => match decode_event(envelope) {
                Some(event) => {
                    self.events.insert(0, event);
                    Reconcile::Applied
                }
                None => Reconcile::Ignored,
            },
            NotificationKind::EventUpdated | NotificationKind::EventApproved => {
                let Some(event) = decode_event(envelope) else {
                    return Reconcile::Ignored;
                };
                match self.events.iter_mut().find(|e| e.id == event.id) {
                    Some(slot) => {
                        *slot = event;
                        Reconcile::Applied
                    }
                    None => {
                        debug!(kind = %envelope.kind, id = %event.id, "update for unknown event ignored");
                        Reconcile::Ignored
                    }
                }
            }
            NotificationKind::EventDeleted => {
                let Some(id) = envelope.payload_id() else {
                    warn!("EVENT_DELETED without id");
                    return Reconcile::Ignored;
                };
                let before = self.events.len();
                self.events.retain(|e| e.id != id);
                if self.events.len() < before {
                    Reconcile::Applied
                } else {
                    Reconcile::Ignored
                }
            }
            NotificationKind::RsvpCreated | NotificationKind::RsvpUpdated => Reconcile::RefetchRsvps,
        }
    }

    pub fn replace_rsvps(&mut self, rsvps: Vec<Rsvp>) {
        self.my_rsvps = rsvps;
    }
}

fn decode_event(envelope: &Envelope) -> Option<Event> {
    match serde_json::from_value(envelope.payload.clone()) {
        Ok(event) => Some(event),
        Err(e) => {
            warn!(kind = %envelope.kind, error = %e, "undecodable event payload");
            None
        }
    }
}
