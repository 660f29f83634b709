//! `chime-scheduler` — reminder lifecycle and recurrence-scheduling engine.
//!
//! # Overview
//!
//! Three layers, leaves first:
//!
//! - [`recurrence`] — pure next-occurrence arithmetic for the six cadences.
//! - [`engine::SchedulerEngine`] — one armed tokio timer per active reminder,
//!   keyed by reminder ID. Arming atomically replaces any previous timer for
//!   the same ID; a fired timer re-reads the store, delivers through the
//!   [`transport::DeliveryTransport`] seam, advances `next_run` and re-arms
//!   itself, so recurring reminders self-perpetuate without polling.
//! - [`service::ReminderService`] — the create/edit/delete operations the
//!   front-end calls, combining a store mutation with the matching
//!   disarm/arm.
//!
//! # Race rules
//!
//! The store row is the serialization point. A fire handler always re-reads
//! the record and stops when it is gone or inactive, so a delete racing a
//! fire never delivers and never re-arms. Disarming only interrupts timers
//! that have not started firing; a fire already in flight completes and is
//! neutralized by its own status check. Delivery is best-effort: a failed
//! send is logged, never retried, and never blocks the next occurrence.

pub mod engine;
pub mod error;
pub mod recurrence;
pub mod service;
pub mod transport;

pub use engine::SchedulerEngine;
pub use error::{Result, SchedulerError};
pub use service::ReminderService;
pub use transport::{DeliveryError, DeliveryTransport};
