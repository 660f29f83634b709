//! One armed timer per active reminder.
//!
//! The timer table is plain shared state behind one mutex; everything slow
//! (sleeping, delivery, store writes) happens in spawned tasks that never
//! hold the lock.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};

use chime_core::{Reminder, ReminderPatch};
use chime_store::ReminderStore;

use crate::error::Result;
use crate::recurrence::next_occurrence;
use crate::transport::DeliveryTransport;

/// Upper bound on a single sleep. Long waits are chunked and re-checked
/// against the wall clock, which keeps multi-month deadlines accurate across
/// suspend/resume and clock adjustments.
const MAX_SLEEP_CHUNK: std::time::Duration = std::time::Duration::from_secs(60 * 60 * 24);

/// A pending timer. Dropping it (on replace or disarm) closes the cancel
/// channel, which wakes and ends the sleeping task before it can fire.
struct ArmedTimer {
    /// Generation token — lets a finished fire handler remove its own table
    /// entry without clobbering a newer timer armed concurrently.
    token: u64,
    _cancel: oneshot::Sender<()>,
}

/// In-process scheduling authority: a table of armed timers keyed by
/// reminder ID, plus the fire handler that keeps recurring reminders going.
pub struct SchedulerEngine {
    store: ReminderStore,
    transport: Arc<dyn DeliveryTransport>,
    tz: Tz,
    timers: Mutex<HashMap<i64, ArmedTimer>>,
    next_token: AtomicU64,
}

impl SchedulerEngine {
    pub fn new(store: ReminderStore, transport: Arc<dyn DeliveryTransport>, tz: Tz) -> Self {
        Self {
            store,
            transport,
            tz,
            timers: Mutex::new(HashMap::new()),
            next_token: AtomicU64::new(1),
        }
    }

    /// Arm a timer firing at `reminder.next_run`.
    ///
    /// Atomically replaces any existing timer for the same ID — two live
    /// timers for one reminder can never coexist. A `next_run` already in
    /// the past fires on the next scheduler tick.
    pub fn arm(self: &Arc<Self>, reminder: &Reminder) {
        let token = self.next_token.fetch_add(1, Ordering::Relaxed);
        let (cancel_tx, mut cancel_rx) = oneshot::channel::<()>();

        {
            let mut timers = self.timers.lock().unwrap();
            // Inserting drops the previous entry, cancelling its task.
            timers.insert(
                reminder.id,
                ArmedTimer {
                    token,
                    _cancel: cancel_tx,
                },
            );
        }
        debug!(reminder_id = reminder.id, next_run = %reminder.next_run, "timer armed");

        let engine = Arc::clone(self);
        let id = reminder.id;
        let deadline = reminder.next_run;
        tokio::spawn(async move {
            tokio::select! {
                _ = &mut cancel_rx => {
                    debug!(reminder_id = id, "timer cancelled before firing");
                    return;
                }
                _ = wait_until(deadline) => {}
            }
            engine.fire(id, token).await;
        });
    }

    /// Cancel the timer for `id` if one exists. Idempotent; a timer that is
    /// already mid-fire completes its attempt and is stopped by the fire
    /// handler's own status re-read.
    pub fn disarm(&self, id: i64) {
        let removed = self.timers.lock().unwrap().remove(&id);
        if removed.is_some() {
            debug!(reminder_id = id, "timer disarmed");
        }
    }

    /// Whether a timer is currently armed for `id`.
    pub fn is_armed(&self, id: i64) -> bool {
        self.timers.lock().unwrap().contains_key(&id)
    }

    /// Number of armed timers.
    pub fn armed_count(&self) -> usize {
        self.timers.lock().unwrap().len()
    }

    /// Re-arm every active reminder from the store. Called once on startup;
    /// reminders whose `next_run` passed while the process was down fire
    /// immediately and the fire handler catches their schedule up.
    pub fn rehydrate(self: &Arc<Self>) -> Result<usize> {
        let reminders = self.store.list_active(None)?;
        for reminder in &reminders {
            self.arm(reminder);
        }
        info!(count = reminders.len(), "reminders rehydrated from store");
        Ok(reminders.len())
    }

    /// Runs once per timer firing.
    ///
    /// Re-reads the record (deleted/deactivated → stop), delivers
    /// best-effort, then either deactivates (one-time) or advances
    /// `next_run` and re-arms. No lock is held across the transport call.
    async fn fire(self: Arc<Self>, id: i64, token: u64) {
        let reminder = match self.store.get(id) {
            Ok(Some(r)) => r,
            Ok(None) => {
                debug!(reminder_id = id, "fired timer found no record — dropping");
                self.remove_entry(id, token);
                return;
            }
            Err(e) => {
                // The task is done either way; drop its table entry so the
                // armed set stays truthful. Restart rehydration recovers.
                error!(reminder_id = id, error = %e, "fire: store read failed");
                self.remove_entry(id, token);
                return;
            }
        };
        if !reminder.is_active() {
            debug!(reminder_id = id, "fired timer found inactive record — dropping");
            self.remove_entry(id, token);
            return;
        }

        let now = Utc::now();
        match self
            .transport
            .send(&reminder.destination, &reminder.text)
            .await
        {
            Ok(()) => {
                info!(reminder_id = id, destination = %reminder.destination, "reminder delivered");
                if let Err(e) = self.store.update(
                    id,
                    ReminderPatch {
                        last_sent_at: Some(now),
                        ..Default::default()
                    },
                ) {
                    error!(reminder_id = id, error = %e, "failed to record last_sent_at");
                }
            }
            // Best-effort: the occurrence is skipped, never retried, and the
            // schedule still advances below.
            Err(e) => warn!(reminder_id = id, error = %e, "delivery failed — occurrence skipped"),
        }

        if reminder.rule.is_one_time() {
            if let Err(e) = self.store.deactivate(id) {
                error!(reminder_id = id, error = %e, "failed to deactivate one-time reminder");
            }
            self.remove_entry(id, token);
            return;
        }

        let next = next_occurrence(reminder.next_run, reminder.rule, now, self.tz);
        if let Err(e) = self.store.update(
            id,
            ReminderPatch {
                next_run: Some(next),
                ..Default::default()
            },
        ) {
            error!(reminder_id = id, error = %e, "failed to advance next_run");
            self.remove_entry(id, token);
            return;
        }

        // Re-read so a concurrent edit that won the store race is what gets
        // armed, then close the loop.
        match self.store.get(id) {
            Ok(Some(refreshed)) if refreshed.is_active() => self.arm(&refreshed),
            Ok(_) => self.remove_entry(id, token),
            Err(e) => {
                error!(reminder_id = id, error = %e, "fire: re-read failed — timer not re-armed");
                self.remove_entry(id, token);
            }
        }
    }

    /// Remove this fire's table entry unless a newer timer replaced it.
    fn remove_entry(&self, id: i64, token: u64) {
        let mut timers = self.timers.lock().unwrap();
        if timers.get(&id).is_some_and(|t| t.token == token) {
            timers.remove(&id);
        }
    }
}

/// Sleep until the wall clock passes `deadline`, in bounded chunks.
async fn wait_until(deadline: DateTime<Utc>) {
    loop {
        let remaining = deadline.signed_duration_since(Utc::now());
        if remaining <= chrono::Duration::zero() {
            return;
        }
        let chunk = remaining
            .to_std()
            .unwrap_or(std::time::Duration::ZERO)
            .min(MAX_SLEEP_CHUNK);
        tokio::time::sleep(chunk).await;
    }
}
