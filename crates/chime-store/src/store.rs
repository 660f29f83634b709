//! Durable CRUD over reminder records.

use std::str::FromStr;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use rusqlite::{types::Type, Connection, Row};
use tracing::{debug, info};

use chime_core::{RecurrenceRule, Reminder, ReminderPatch, ReminderStatus};

use crate::db::init_db;
use crate::error::{Result, StoreError};

/// Shared handle to the reminder table.
///
/// Wraps a single `Connection` behind a mutex so the scheduler's fire
/// handlers and the front-end can mutate reminders concurrently; the
/// per-row write is the serialization point for every race.
#[derive(Clone)]
pub struct ReminderStore {
    conn: Arc<Mutex<Connection>>,
}

impl ReminderStore {
    /// Wrap `conn`, initialising the schema if needed.
    pub fn new(conn: Connection) -> Result<Self> {
        init_db(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Insert a new active reminder and return the full record.
    pub fn insert(
        &self,
        owner: i64,
        text: &str,
        next_run: DateTime<Utc>,
        rule: RecurrenceRule,
        destination: &str,
    ) -> Result<Reminder> {
        let conn = self.conn.lock().unwrap();
        let now = Utc::now();
        let now_str = now.to_rfc3339();

        conn.execute(
            "INSERT INTO reminders
             (owner, text, next_run, rule, destination, status, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, 'active', ?6, ?6)",
            rusqlite::params![
                owner,
                text,
                next_run.to_rfc3339(),
                rule.to_string(),
                destination,
                now_str
            ],
        )?;
        let id = conn.last_insert_rowid();
        info!(reminder_id = id, owner, %rule, "reminder inserted");

        Ok(Reminder {
            id,
            owner,
            text: text.to_string(),
            next_run,
            rule,
            destination: destination.to_string(),
            status: ReminderStatus::Active,
            created_at: now,
            updated_at: now,
            last_sent_at: None,
        })
    }

    /// Fetch a reminder by ID. `None` if no such row exists.
    pub fn get(&self, id: i64) -> Result<Option<Reminder>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare_cached(
            "SELECT id, owner, text, next_run, rule, destination, status,
                    created_at, updated_at, last_sent_at
             FROM reminders WHERE id = ?1",
        )?;
        let mut rows = stmt.query_map([id], row_to_reminder)?;
        match rows.next() {
            Some(row) => Ok(Some(row?)),
            None => Ok(None),
        }
    }

    /// All active reminders, ordered by `next_run` ascending then `id`
    /// ascending — the stable order used for display and for rehydration.
    ///
    /// `owner` limits the result to one user's reminders; `None` returns
    /// everyone's (used by the engine on startup).
    pub fn list_active(&self, owner: Option<i64>) -> Result<Vec<Reminder>> {
        let conn = self.conn.lock().unwrap();
        let mut out = Vec::new();
        match owner {
            Some(owner) => {
                let mut stmt = conn.prepare_cached(
                    "SELECT id, owner, text, next_run, rule, destination, status,
                            created_at, updated_at, last_sent_at
                     FROM reminders
                     WHERE status = 'active' AND owner = ?1
                     ORDER BY next_run ASC, id ASC",
                )?;
                for row in stmt.query_map([owner], row_to_reminder)? {
                    out.push(row?);
                }
            }
            None => {
                let mut stmt = conn.prepare_cached(
                    "SELECT id, owner, text, next_run, rule, destination, status,
                            created_at, updated_at, last_sent_at
                     FROM reminders
                     WHERE status = 'active'
                     ORDER BY next_run ASC, id ASC",
                )?;
                for row in stmt.query_map([], row_to_reminder)? {
                    out.push(row?);
                }
            }
        }
        Ok(out)
    }

    /// Apply a partial update. Always bumps `updated_at`.
    ///
    /// Returns `NotFound` when no row matches `id`. An all-`None` patch is a
    /// no-op.
    pub fn update(&self, id: i64, patch: ReminderPatch) -> Result<()> {
        if patch.is_empty() {
            debug!(reminder_id = id, "empty patch — nothing to update");
            return Ok(());
        }

        let mut sets: Vec<&str> = Vec::new();
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();
        if let Some(text) = patch.text {
            sets.push("text = ?");
            params.push(Box::new(text));
        }
        if let Some(next_run) = patch.next_run {
            sets.push("next_run = ?");
            params.push(Box::new(next_run.to_rfc3339()));
        }
        if let Some(rule) = patch.rule {
            sets.push("rule = ?");
            params.push(Box::new(rule.to_string()));
        }
        if let Some(destination) = patch.destination {
            sets.push("destination = ?");
            params.push(Box::new(destination));
        }
        if let Some(last_sent_at) = patch.last_sent_at {
            sets.push("last_sent_at = ?");
            params.push(Box::new(last_sent_at.to_rfc3339()));
        }
        sets.push("updated_at = ?");
        params.push(Box::new(Utc::now().to_rfc3339()));
        params.push(Box::new(id));

        let sql = format!("UPDATE reminders SET {} WHERE id = ?", sets.join(", "));
        let conn = self.conn.lock().unwrap();
        let n = conn.execute(
            &sql,
            rusqlite::params_from_iter(params.iter().map(|p| p.as_ref())),
        )?;
        if n == 0 {
            return Err(StoreError::NotFound { id });
        }
        Ok(())
    }

    /// Mark a reminder inactive. No-op (not an error) when the row is
    /// already gone — deactivation races are benign.
    pub fn deactivate(&self, id: i64) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let n = conn.execute(
            "UPDATE reminders SET status = 'inactive', updated_at = ?1 WHERE id = ?2",
            rusqlite::params![Utc::now().to_rfc3339(), id],
        )?;
        if n > 0 {
            info!(reminder_id = id, "reminder deactivated");
        }
        Ok(())
    }
}

fn row_to_reminder(row: &Row<'_>) -> rusqlite::Result<Reminder> {
    Ok(Reminder {
        id: row.get(0)?,
        owner: row.get(1)?,
        text: row.get(2)?,
        next_run: parse_ts(3, &row.get::<_, String>(3)?)?,
        rule: parse_token::<RecurrenceRule>(4, &row.get::<_, String>(4)?)?,
        destination: row.get(5)?,
        status: parse_token::<ReminderStatus>(6, &row.get::<_, String>(6)?)?,
        created_at: parse_ts(7, &row.get::<_, String>(7)?)?,
        updated_at: parse_ts(8, &row.get::<_, String>(8)?)?,
        last_sent_at: match row.get::<_, Option<String>>(9)? {
            Some(s) => Some(parse_ts(9, &s)?),
            None => None,
        },
    })
}

fn parse_ts(idx: usize, s: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn parse_token<T: FromStr<Err = String>>(idx: usize, s: &str) -> rusqlite::Result<T> {
    s.parse::<T>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, e.into()))
}
