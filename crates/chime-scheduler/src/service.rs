//! Lifecycle operations invoked by the front-end.
//!
//! Each operation combines the store mutation with the matching scheduler
//! re-arming, so callers see create/edit/delete as one logical step.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use tracing::info;

use chime_core::{RecurrenceRule, Reminder, ReminderPatch};
use chime_store::ReminderStore;

use crate::engine::SchedulerEngine;
use crate::error::{Result, SchedulerError};
use crate::recurrence::normalize_next_run;

/// Create / edit / delete / list for reminders.
#[derive(Clone)]
pub struct ReminderService {
    store: ReminderStore,
    engine: Arc<SchedulerEngine>,
    tz: Tz,
}

impl ReminderService {
    pub fn new(store: ReminderStore, engine: Arc<SchedulerEngine>, tz: Tz) -> Self {
        Self { store, engine, tz }
    }

    /// Validate, normalize the requested time, insert and arm.
    pub fn create(
        &self,
        owner: i64,
        text: &str,
        requested_time: DateTime<Utc>,
        rule: RecurrenceRule,
        destination: &str,
    ) -> Result<Reminder> {
        let text = text.trim();
        if text.is_empty() {
            return Err(SchedulerError::Validation(
                "reminder text must not be empty".to_string(),
            ));
        }
        if destination.trim().is_empty() {
            return Err(SchedulerError::Validation(
                "destination must not be empty".to_string(),
            ));
        }

        let next_run = normalize_next_run(requested_time, rule, Utc::now(), self.tz);
        let reminder = self.store.insert(owner, text, next_run, rule, destination)?;
        self.engine.arm(&reminder);
        info!(reminder_id = reminder.id, owner, %rule, next_run = %next_run, "reminder created");
        Ok(reminder)
    }

    /// Update the payload text. The timer is keyed by time, not payload, so
    /// no re-arm happens.
    pub fn edit_text(&self, id: i64, text: &str) -> Result<Reminder> {
        let text = text.trim();
        if text.is_empty() {
            return Err(SchedulerError::Validation(
                "reminder text must not be empty".to_string(),
            ));
        }
        self.require_active(id)?;
        self.store.update(
            id,
            ReminderPatch {
                text: Some(text.to_string()),
                ..Default::default()
            },
        )?;
        self.reread(id)
    }

    /// Update the destination. No re-arm needed.
    pub fn edit_destination(&self, id: i64, destination: &str) -> Result<Reminder> {
        if destination.trim().is_empty() {
            return Err(SchedulerError::Validation(
                "destination must not be empty".to_string(),
            ));
        }
        self.require_active(id)?;
        self.store.update(
            id,
            ReminderPatch {
                destination: Some(destination.to_string()),
                ..Default::default()
            },
        )?;
        self.reread(id)
    }

    /// Move the reminder to a new time. The new value is a fresh candidate
    /// start under the current rule; the old timer is replaced.
    pub fn edit_date(&self, id: i64, new_time: DateTime<Utc>) -> Result<Reminder> {
        let current = self.require_active(id)?;
        let next_run = normalize_next_run(new_time, current.rule, Utc::now(), self.tz);
        self.store.update(
            id,
            ReminderPatch {
                next_run: Some(next_run),
                ..Default::default()
            },
        )?;
        let refreshed = self.reread(id)?;
        self.engine.disarm(id);
        self.engine.arm(&refreshed);
        info!(reminder_id = id, next_run = %next_run, "reminder rescheduled");
        Ok(refreshed)
    }

    /// Change the cadence. The current `next_run` is the candidate start
    /// under the new rule, so shortening the period never fires missed
    /// occurrences retroactively — an unexpired `next_run` stays put.
    pub fn edit_rule(&self, id: i64, new_rule: RecurrenceRule) -> Result<Reminder> {
        let current = self.require_active(id)?;
        let next_run = normalize_next_run(current.next_run, new_rule, Utc::now(), self.tz);
        self.store.update(
            id,
            ReminderPatch {
                rule: Some(new_rule),
                next_run: Some(next_run),
                ..Default::default()
            },
        )?;
        let refreshed = self.reread(id)?;
        self.engine.disarm(id);
        self.engine.arm(&refreshed);
        info!(reminder_id = id, rule = %new_rule, next_run = %next_run, "reminder cadence changed");
        Ok(refreshed)
    }

    /// Disarm, then deactivate. Disarming first closes the window where a
    /// firing timer could reschedule a reminder being deleted; the fire
    /// handler's status check covers the remainder of the race. Deleting a
    /// reminder that is already gone is a benign no-op.
    pub fn delete(&self, id: i64) -> Result<()> {
        self.engine.disarm(id);
        self.store.deactivate(id)?;
        info!(reminder_id = id, "reminder deleted");
        Ok(())
    }

    /// The owner's active reminders in display order (next_run asc, id asc).
    pub fn list(&self, owner: i64) -> Result<Vec<Reminder>> {
        Ok(self.store.list_active(Some(owner))?)
    }

    /// Fetch one reminder for display. Inactive counts as gone.
    pub fn get_active(&self, id: i64) -> Result<Reminder> {
        self.require_active(id)
    }

    fn require_active(&self, id: i64) -> Result<Reminder> {
        match self.store.get(id)? {
            Some(r) if r.is_active() => Ok(r),
            _ => Err(SchedulerError::NotFound { id }),
        }
    }

    fn reread(&self, id: i64) -> Result<Reminder> {
        self.store
            .get(id)?
            .ok_or(SchedulerError::NotFound { id })
    }
}
