use rusqlite::Connection;

use crate::error::Result;

/// Initialise the reminder schema in `conn`.
///
/// Creates the `reminders` table (idempotent) and indexes on `next_run` and
/// `status` so listing active reminders in fire order stays efficient.
pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS reminders (
            id           INTEGER PRIMARY KEY AUTOINCREMENT,
            owner        INTEGER NOT NULL,
            text         TEXT    NOT NULL,
            next_run     TEXT    NOT NULL,   -- RFC 3339 with offset
            rule         TEXT    NOT NULL,   -- recurrence token, e.g. 'weekly'
            destination  TEXT    NOT NULL,   -- '@username' or numeric chat ID
            status       TEXT    NOT NULL DEFAULT 'active',
            created_at   TEXT    NOT NULL,
            updated_at   TEXT    NOT NULL,
            last_sent_at TEXT                -- RFC 3339 or NULL
        ) STRICT;

        CREATE INDEX IF NOT EXISTS idx_reminders_next_run ON reminders (next_run);
        CREATE INDEX IF NOT EXISTS idx_reminders_status ON reminders (status);
        ",
    )?;
    Ok(())
}
