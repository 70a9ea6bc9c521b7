use rusqlite::{Connection, Result};

/// Initialise the events and RSVP tables and their indexes.
///
/// Expects the users table to exist already (organizer and RSVP owner
/// references). Safe to call on every startup.
pub fn init_db(conn: &Connection) -> Result<()> {
    create_events_table(conn)?;
    create_rsvps_table(conn)?;
    Ok(())
}

fn create_events_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS events (
            id           TEXT PRIMARY KEY NOT NULL,
            title        TEXT NOT NULL,
            description  TEXT NOT NULL,
            date         TEXT NOT NULL,
            location     TEXT NOT NULL,
            organizer_id TEXT NOT NULL REFERENCES users(id),
            approved     INTEGER NOT NULL DEFAULT 0,
            created_at   TEXT NOT NULL,
            updated_at   TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_events_date ON events (date);",
    )
}

fn create_rsvps_table(conn: &Connection) -> Result<()> {
    // UNIQUE(user_id, event_id): one RSVP per user per event, upserted in place.
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS rsvps (
            id         TEXT PRIMARY KEY NOT NULL,
            user_id    TEXT NOT NULL REFERENCES users(id),
            event_id   TEXT NOT NULL REFERENCES events(id),
            status     TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            UNIQUE(user_id, event_id)
        );
        CREATE INDEX IF NOT EXISTS idx_rsvps_event ON rsvps (event_id);",
    )
}
