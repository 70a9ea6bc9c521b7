use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use eventhub_core::types::{new_id, Event, Rsvp, RsvpStatus, UserSummary};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, instrument};

/// Column order shared by every event query (see `row_to_event`).
const EVENT_COLUMNS: &str = "e.id, e.title, e.description, e.date, e.location,
        e.organizer_id, ou.email, e.approved, e.created_at, e.updated_at";

const EVENT_FROM: &str = "FROM events e JOIN users ou ON ou.id = e.organizer_id";

/// RSVP columns followed by the owning user's email and the embedded event.
const RSVP_COLUMNS: &str = "r.id, r.user_id, r.event_id, r.status, r.created_at, r.updated_at,
        ru.email";

const RSVP_FROM: &str = "FROM rsvps r
        JOIN users ru ON ru.id = r.user_id
        JOIN events e ON e.id = r.event_id
        JOIN users ou ON ou.id = e.organizer_id";

/// Validated input for a new event row.
#[derive(Debug, Clone)]
pub struct NewEvent {
    pub title: String,
    pub description: String,
    pub date: DateTime<Utc>,
    pub location: String,
    pub organizer_id: String,
}

/// Partial update; `None` keeps the stored value.
#[derive(Debug, Clone, Default)]
pub struct EventPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub date: Option<DateTime<Utc>>,
    pub location: Option<String>,
}

/// Result of the one-way approval transition.
#[derive(Debug)]
pub enum ApproveOutcome {
    Approved(Event),
    AlreadyApproved,
    Missing,
}

/// SQLite persistence for events and RSVPs.
///
/// Every compound operation (cascade delete, RSVP upsert, approval) runs under
/// one lock acquisition and, where it writes more than one row, one transaction.
#[derive(Clone)]
pub struct EventStore {
    db: Arc<Mutex<Connection>>,
}

impl EventStore {
    /// Wrap an already-open connection whose schema has been initialised.
    pub fn new(db: Arc<Mutex<Connection>>) -> Self {
        Self { db }
    }

    #[instrument(skip(self, new), fields(organizer = %new.organizer_id))]
    pub fn insert_event(&self, new: NewEvent) -> rusqlite::Result<Event> {
        let id = new_id();
        let now = Utc::now();
        let db = self.db.lock().unwrap();
        db.execute(
            "INSERT INTO events
             (id, title, description, date, location, organizer_id, approved, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, ?7, ?7)",
            params![id, new.title, new.description, new.date, new.location, new.organizer_id, now],
        )?;
        // read back so callers see exactly what was persisted
        get_event(&db, &id)?.ok_or(rusqlite::Error::QueryReturnedNoRows)
    }

    pub fn get_event(&self, id: &str) -> rusqlite::Result<Option<Event>> {
        let db = self.db.lock().unwrap();
        get_event(&db, id)
    }

    /// All events, soonest first.
    pub fn list_events(&self) -> rusqlite::Result<Vec<Event>> {
        let db = self.db.lock().unwrap();
        let mut stmt = db.prepare(&format!(
            "SELECT {EVENT_COLUMNS} {EVENT_FROM} ORDER BY e.date ASC"
        ))?;
        let rows = stmt.query_map([], |row| row_to_event(row, 0))?;
        rows.collect()
    }

    /// Approved events dated at or after `now`, soonest first.
    pub fn upcoming_approved(&self, now: DateTime<Utc>, limit: usize) -> rusqlite::Result<Vec<Event>> {
        let db = self.db.lock().unwrap();
        let mut stmt = db.prepare(&format!(
            "SELECT {EVENT_COLUMNS} {EVENT_FROM}
             WHERE e.approved = 1 AND e.date >= ?1
             ORDER BY e.date ASC LIMIT ?2"
        ))?;
        let rows = stmt.query_map(params![now, limit as i64], |row| row_to_event(row, 0))?;
        rows.collect()
    }

    /// Apply a patch. Returns `None` when the event does not exist.
    #[instrument(skip(self, patch))]
    pub fn update_event(&self, id: &str, patch: EventPatch) -> rusqlite::Result<Option<Event>> {
        let db = self.db.lock().unwrap();
        let changed = db.execute(
            "UPDATE events
             SET title       = COALESCE(?2, title),
                 description = COALESCE(?3, description),
                 date        = COALESCE(?4, date),
                 location    = COALESCE(?5, location),
                 updated_at  = ?6
             WHERE id = ?1",
            params![id, patch.title, patch.description, patch.date, patch.location, Utc::now()],
        )?;
        if changed == 0 {
            return Ok(None);
        }
        get_event(&db, id)
    }

    /// Flip `approved` from false to true. The `approved = 0` guard makes the
    /// check-and-set a single statement, so two admins cannot both succeed.
    #[instrument(skip(self))]
    pub fn approve_event(&self, id: &str) -> rusqlite::Result<ApproveOutcome> {
        let db = self.db.lock().unwrap();
        let changed = db.execute(
            "UPDATE events SET approved = 1, updated_at = ?2 WHERE id = ?1 AND approved = 0",
            params![id, Utc::now()],
        )?;
        if changed == 1 {
            return Ok(match get_event(&db, id)? {
                Some(ev) => ApproveOutcome::Approved(ev),
                None => ApproveOutcome::Missing,
            });
        }
        let exists: Option<i64> = db
            .query_row("SELECT 1 FROM events WHERE id = ?1", params![id], |r| r.get(0))
            .optional()?;
        Ok(if exists.is_some() {
            ApproveOutcome::AlreadyApproved
        } else {
            ApproveOutcome::Missing
        })
    }

    /// Remove an event and every RSVP pointing at it in one transaction.
    /// Returns false when the event did not exist.
    #[instrument(skip(self))]
    pub fn delete_event_cascade(&self, id: &str) -> rusqlite::Result<bool> {
        let mut db = self.db.lock().unwrap();
        let tx = db.transaction()?;
        let rsvps = tx.execute("DELETE FROM rsvps WHERE event_id = ?1", params![id])?;
        let events = tx.execute("DELETE FROM events WHERE id = ?1", params![id])?;
        tx.commit()?;
        debug!(rsvps_removed = rsvps, "event deleted");
        Ok(events == 1)
    }

    /// Create or replace the (user, event) RSVP.
    ///
    /// Returns the persisted row and whether this call inserted it, or `None`
    /// if the event vanished before the write (a concurrent delete won).
    #[instrument(skip(self))]
    pub fn upsert_rsvp(
        &self,
        user_id: &str,
        event_id: &str,
        status: RsvpStatus,
    ) -> rusqlite::Result<Option<(Rsvp, bool)>> {
        let mut db = self.db.lock().unwrap();
        let tx = db.transaction()?;

        let event_exists: Option<i64> = tx
            .query_row("SELECT 1 FROM events WHERE id = ?1", params![event_id], |r| r.get(0))
            .optional()?;
        if event_exists.is_none() {
            return Ok(None);
        }

        let now = Utc::now();
        let existing: Option<String> = tx
            .query_row(
                "SELECT id FROM rsvps WHERE user_id = ?1 AND event_id = ?2",
                params![user_id, event_id],
                |r| r.get(0),
            )
            .optional()?;

        let (id, inserted) = match existing {
            Some(id) => {
                tx.execute(
                    "UPDATE rsvps SET status = ?2, updated_at = ?3 WHERE id = ?1",
                    params![id, status.as_str(), now],
                )?;
                (id, false)
            }
            None => {
                let id = new_id();
                tx.execute(
                    "INSERT INTO rsvps (id, user_id, event_id, status, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
                    params![id, user_id, event_id, status.as_str(), now],
                )?;
                (id, true)
            }
        };

        let rsvp = tx.query_row(
            &format!("SELECT {RSVP_COLUMNS}, {EVENT_COLUMNS} {RSVP_FROM} WHERE r.id = ?1"),
            params![id],
            row_to_rsvp,
        )?;
        tx.commit()?;
        Ok(Some((rsvp, inserted)))
    }

    pub fn rsvps_for_event(&self, event_id: &str) -> rusqlite::Result<Vec<Rsvp>> {
        let db = self.db.lock().unwrap();
        let mut stmt = db.prepare(&format!(
            "SELECT {RSVP_COLUMNS}, {EVENT_COLUMNS} {RSVP_FROM}
             WHERE r.event_id = ?1 ORDER BY r.created_at ASC"
        ))?;
        let rows = stmt.query_map(params![event_id], row_to_rsvp)?;
        rows.collect()
    }

    /// A user's RSVPs, newest first. `limit = None` returns all of them.
    pub fn rsvps_for_user(&self, user_id: &str, limit: Option<usize>) -> rusqlite::Result<Vec<Rsvp>> {
        let limit = limit.map(|l| l as i64).unwrap_or(-1);
        let db = self.db.lock().unwrap();
        let mut stmt = db.prepare(&format!(
            "SELECT {RSVP_COLUMNS}, {EVENT_COLUMNS} {RSVP_FROM}
             WHERE r.user_id = ?1 ORDER BY r.created_at DESC LIMIT ?2"
        ))?;
        let rows = stmt.query_map(params![user_id, limit], row_to_rsvp)?;
        rows.collect()
    }

    pub fn count_rsvps(&self, user_id: &str, event_id: &str) -> rusqlite::Result<i64> {
        let db = self.db.lock().unwrap();
        db.query_row(
            "SELECT COUNT(*) FROM rsvps WHERE user_id = ?1 AND event_id = ?2",
            params![user_id, event_id],
            |r| r.get(0),
        )
    }
}

fn get_event(conn: &Connection, id: &str) -> rusqlite::Result<Option<Event>> {
    conn.query_row(
        &format!("SELECT {EVENT_COLUMNS} {EVENT_FROM} WHERE e.id = ?1"),
        params![id],
        |row| row_to_event(row, 0),
    )
    .optional()
}

/// Map event columns starting at `base` (column order from `EVENT_COLUMNS`).
fn row_to_event(row: &rusqlite::Row<'_>, base: usize) -> rusqlite::Result<Event> {
    let organizer_id: String = row.get(base + 5)?;
    Ok(Event {
        id: row.get(base)?,
        title: row.get(base + 1)?,
        description: row.get(base + 2)?,
        date: row.get(base + 3)?,
        location: row.get(base + 4)?,
        organizer: UserSummary {
            id: organizer_id.clone(),
            email: row.get(base + 6)?,
        },
        organizer_id,
        approved: row.get::<_, i64>(base + 7)? != 0,
        created_at: row.get(base + 8)?,
        updated_at: row.get(base + 9)?,
    })
}

fn row_to_rsvp(row: &rusqlite::Row<'_>) -> rusqlite::Result<Rsvp> {
    let raw_status: String = row.get(3)?;
    let status = raw_status.parse::<RsvpStatus>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, e.into())
    })?;
    let user_id: String = row.get(1)?;
    Ok(Rsvp {
        id: row.get(0)?,
        event_id: row.get(2)?,
        status,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
        user: UserSummary {
            id: user_id.clone(),
            email: row.get(6)?,
        },
        user_id,
        event: Some(row_to_event(row, 7)?),
    })
}
