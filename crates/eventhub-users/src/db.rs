use rusqlite::{Connection, Result};

/// Initialise the users table. Safe to call on every startup.
pub fn init_db(conn: &Connection) -> Result<()> {
    // email is the login key; UNIQUE backs the duplicate-signup check.
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS users (
            id            TEXT PRIMARY KEY NOT NULL,
            email         TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            role          TEXT NOT NULL DEFAULT 'ATTENDEE',
            created_at    TEXT NOT NULL,
            updated_at    TEXT NOT NULL
        );",
    )
}
