//! `chime-core` — shared types and configuration for the chime reminder bot.
//!
//! Contains the [`Reminder`] record and its enums, the partial-update
//! [`ReminderPatch`], and the figment-based [`config::ChimeConfig`]. No I/O
//! happens here; the store, scheduler and Telegram crates all build on these
//! types.

pub mod config;
pub mod error;
pub mod reminder;

pub use config::ChimeConfig;
pub use error::{ChimeError, Result};
pub use reminder::{RecurrenceRule, Reminder, ReminderPatch, ReminderStatus};
