//! `chime-store` — SQLite persistence for reminder records.
//!
//! One row per reminder in the `reminders` table. Timestamps are stored as
//! RFC 3339 strings with offset; the recurrence rule and status are stored as
//! their snake_case tokens. The store is the serialization point for all
//! concurrent mutations: the scheduler's fire handler and the front-end's
//! edits both read the current row immediately before deciding to act, and
//! the last write wins.

pub mod db;
pub mod error;
pub mod store;

pub use error::{Result, StoreError};
pub use store::ReminderStore;
