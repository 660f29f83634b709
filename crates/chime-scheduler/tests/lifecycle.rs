//! End-to-end lifecycle tests: in-memory SQLite store, real tokio timers,
//! recording mock transport.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use rusqlite::Connection;
use tokio::sync::mpsc;

use chime_core::{RecurrenceRule, ReminderStatus};
use chime_scheduler::{
    DeliveryError, DeliveryTransport, ReminderService, SchedulerEngine, SchedulerError,
};
use chime_store::ReminderStore;

/// Records every send attempt; optionally fails them all.
struct RecordingTransport {
    tx: mpsc::UnboundedSender<(String, String)>,
    fail: AtomicBool,
}

#[async_trait]
impl DeliveryTransport for RecordingTransport {
    async fn send(&self, destination: &str, text: &str) -> Result<(), DeliveryError> {
        let _ = self.tx.send((destination.to_string(), text.to_string()));
        if self.fail.load(Ordering::SeqCst) {
            Err(DeliveryError {
                destination: destination.to_string(),
                reason: "mock failure".to_string(),
            })
        } else {
            Ok(())
        }
    }
}

struct Harness {
    store: ReminderStore,
    engine: Arc<SchedulerEngine>,
    service: ReminderService,
    transport: Arc<RecordingTransport>,
    delivered: mpsc::UnboundedReceiver<(String, String)>,
}

fn harness() -> Harness {
    let (tx, delivered) = mpsc::unbounded_channel();
    let transport = Arc::new(RecordingTransport {
        tx,
        fail: AtomicBool::new(false),
    });
    let store = ReminderStore::new(Connection::open_in_memory().unwrap()).unwrap();
    let engine = Arc::new(SchedulerEngine::new(
        store.clone(),
        transport.clone(),
        chrono_tz::UTC,
    ));
    let service = ReminderService::new(store.clone(), engine.clone(), chrono_tz::UTC);
    Harness {
        store,
        engine,
        service,
        transport,
        delivered,
    }
}

async fn next_delivery(rx: &mut mpsc::UnboundedReceiver<(String, String)>) -> (String, String) {
    tokio::time::timeout(std::time::Duration::from_secs(3), rx.recv())
        .await
        .expect("no delivery within 3s")
        .expect("delivery channel closed")
}

async fn wait_for(mut cond: impl FnMut() -> bool) {
    for _ in 0..120 {
        if cond() {
            return;
        }
        tokio::time::sleep(std::time::Duration::from_millis(25)).await;
    }
    panic!("condition not reached within 3s");
}

fn minutes_ago(m: i64) -> DateTime<Utc> {
    Utc::now() - Duration::minutes(m)
}

#[tokio::test]
async fn one_time_in_past_fires_immediately_then_deactivates() {
    let mut h = harness();
    let reminder = h
        .service
        .create(1, "stand-up", minutes_ago(5), RecurrenceRule::OneTime, "@team")
        .unwrap();
    // A one-time reminder whose moment passed is floored at "now", not dropped.
    assert!(reminder.next_run <= Utc::now());

    let (dest, text) = next_delivery(&mut h.delivered).await;
    assert_eq!((dest.as_str(), text.as_str()), ("@team", "stand-up"));

    let store = h.store.clone();
    let id = reminder.id;
    wait_for(move || {
        store
            .get(id)
            .unwrap()
            .is_some_and(|r| r.status == ReminderStatus::Inactive)
    })
    .await;
    let fetched = h.store.get(id).unwrap().unwrap();
    assert!(fetched.last_sent_at.is_some());
    assert!(!h.engine.is_armed(id));
}

#[tokio::test]
async fn recurring_fire_advances_one_step_and_rearms() {
    let mut h = harness();
    let due = Utc::now() - Duration::seconds(1);
    let reminder = h
        .store
        .insert(1, "water the plants", due, RecurrenceRule::Weekly, "@home")
        .unwrap();
    h.engine.arm(&reminder);

    next_delivery(&mut h.delivered).await;

    let store = h.store.clone();
    let id = reminder.id;
    wait_for(move || store.get(id).unwrap().is_some_and(|r| r.next_run > Utc::now())).await;

    let fetched = h.store.get(id).unwrap().unwrap();
    assert_eq!(fetched.next_run, due + Duration::days(7));
    assert_eq!(fetched.status, ReminderStatus::Active);
    assert!(fetched.last_sent_at.is_some());
    assert!(h.engine.is_armed(id));
    assert_eq!(h.engine.armed_count(), 1);
}

#[tokio::test]
async fn failed_delivery_still_advances_but_leaves_last_sent_unset() {
    let mut h = harness();
    h.transport.fail.store(true, Ordering::SeqCst);

    let due = Utc::now() - Duration::seconds(1);
    let reminder = h
        .store
        .insert(1, "pay rent", due, RecurrenceRule::Weekly, "@money")
        .unwrap();
    h.engine.arm(&reminder);

    // The attempt happens even though it fails.
    next_delivery(&mut h.delivered).await;

    let store = h.store.clone();
    let id = reminder.id;
    wait_for(move || store.get(id).unwrap().is_some_and(|r| r.next_run > Utc::now())).await;

    let fetched = h.store.get(id).unwrap().unwrap();
    assert_eq!(fetched.next_run, due + Duration::days(7));
    assert!(fetched.last_sent_at.is_none());
    assert!(h.engine.is_armed(id));
}

#[tokio::test]
async fn delete_cancels_pending_timer_without_delivery() {
    let mut h = harness();
    let soon = Utc::now() + Duration::milliseconds(300);
    let reminder = h
        .service
        .create(1, "cancelled", soon, RecurrenceRule::OneTime, "@team")
        .unwrap();
    assert!(h.engine.is_armed(reminder.id));

    h.service.delete(reminder.id).unwrap();
    assert!(!h.engine.is_armed(reminder.id));

    tokio::time::sleep(std::time::Duration::from_millis(800)).await;
    assert!(h.delivered.try_recv().is_err(), "deleted reminder delivered");
    let fetched = h.store.get(reminder.id).unwrap().unwrap();
    assert_eq!(fetched.status, ReminderStatus::Inactive);
}

#[tokio::test]
async fn delete_unknown_id_is_benign() {
    let h = harness();
    h.service.delete(4242).unwrap();
}

#[tokio::test]
async fn edit_text_and_destination_do_not_touch_the_timer() {
    let h = harness();
    let tomorrow = Utc::now() + Duration::days(1);
    let reminder = h
        .service
        .create(1, "old text", tomorrow, RecurrenceRule::Daily, "@a")
        .unwrap();

    let edited = h.service.edit_text(reminder.id, "new text").unwrap();
    assert_eq!(edited.text, "new text");
    let edited = h.service.edit_destination(reminder.id, "-100555").unwrap();
    assert_eq!(edited.destination, "-100555");

    assert_eq!(edited.next_run, reminder.next_run);
    assert!(h.engine.is_armed(reminder.id));
    assert_eq!(h.engine.armed_count(), 1);
}

#[tokio::test]
async fn edit_date_normalizes_and_rearms() {
    let h = harness();
    let reminder = h
        .service
        .create(
            1,
            "check-in",
            Utc::now() + Duration::days(3),
            RecurrenceRule::Daily,
            "@a",
        )
        .unwrap();

    // A past date under a periodic rule is advanced into the future.
    let edited = h.service.edit_date(reminder.id, minutes_ago(90)).unwrap();
    assert!(edited.next_run > Utc::now());
    assert!(edited.next_run <= Utc::now() + Duration::days(1));
    assert!(h.engine.is_armed(reminder.id));
    assert_eq!(h.engine.armed_count(), 1);
}

#[tokio::test]
async fn edit_rule_keeps_unexpired_next_run() {
    let h = harness();
    let in_two_days = Utc::now() + Duration::days(2);
    let reminder = h
        .service
        .create(1, "report", in_two_days, RecurrenceRule::Quarterly, "@a")
        .unwrap();

    // Quarterly → daily with next_run still in the future: the existing
    // next_run stays, nothing fires retroactively.
    let edited = h.service.edit_rule(reminder.id, RecurrenceRule::Daily).unwrap();
    assert_eq!(edited.rule, RecurrenceRule::Daily);
    assert_eq!(edited.next_run, reminder.next_run);
    assert!(h.engine.is_armed(reminder.id));
}

#[tokio::test]
async fn create_rejects_empty_input_before_any_state_change() {
    let h = harness();
    let err = h
        .service
        .create(1, "   ", Utc::now(), RecurrenceRule::Daily, "@a")
        .unwrap_err();
    assert!(matches!(err, SchedulerError::Validation(_)));

    let err = h
        .service
        .create(1, "text", Utc::now(), RecurrenceRule::Daily, "")
        .unwrap_err();
    assert!(matches!(err, SchedulerError::Validation(_)));

    assert!(h.service.list(1).unwrap().is_empty());
    assert_eq!(h.engine.armed_count(), 0);
}

#[tokio::test]
async fn edits_on_missing_or_inactive_reminders_are_not_found() {
    let h = harness();
    assert!(matches!(
        h.service.edit_text(99, "x").unwrap_err(),
        SchedulerError::NotFound { id: 99 }
    ));

    let reminder = h
        .service
        .create(1, "gone", Utc::now() + Duration::days(1), RecurrenceRule::Daily, "@a")
        .unwrap();
    h.service.delete(reminder.id).unwrap();
    assert!(matches!(
        h.service.edit_date(reminder.id, Utc::now()).unwrap_err(),
        SchedulerError::NotFound { .. }
    ));
}

#[tokio::test]
async fn create_with_past_start_normalizes_onto_future_grid() {
    let h = harness();
    let ten_days_ago = Utc::now() - Duration::days(10);
    let reminder = h
        .service
        .create(1, "daily catch-up", ten_days_ago, RecurrenceRule::Daily, "@a")
        .unwrap();
    assert!(reminder.next_run > Utc::now());
    assert!(reminder.next_run <= Utc::now() + Duration::days(1));
    // Still on the original grid: a whole number of days from the start.
    let offset = reminder.next_run - ten_days_ago;
    assert_eq!(offset.num_seconds() % 86_400, 0);
}

#[tokio::test]
async fn rehydrate_arms_active_reminders_and_catches_up_past_due() {
    let mut h = harness();
    let past_due = h
        .store
        .insert(1, "missed me", minutes_ago(30), RecurrenceRule::OneTime, "@a")
        .unwrap();
    let future = h
        .store
        .insert(
            1,
            "later",
            Utc::now() + Duration::hours(6),
            RecurrenceRule::Daily,
            "@b",
        )
        .unwrap();
    let inactive = h
        .store
        .insert(2, "dead", minutes_ago(30), RecurrenceRule::Daily, "@c")
        .unwrap();
    h.store.deactivate(inactive.id).unwrap();

    let armed = h.engine.rehydrate().unwrap();
    assert_eq!(armed, 2);
    assert!(h.engine.is_armed(future.id));
    assert!(!h.engine.is_armed(inactive.id));

    // The past-due one-time fires on the next tick and is consumed.
    let (dest, text) = next_delivery(&mut h.delivered).await;
    assert_eq!((dest.as_str(), text.as_str()), ("@a", "missed me"));
    let store = h.store.clone();
    let id = past_due.id;
    wait_for(move || {
        store
            .get(id)
            .unwrap()
            .is_some_and(|r| r.status == ReminderStatus::Inactive)
    })
    .await;
    assert!(!h.engine.is_armed(past_due.id));
    assert!(h.engine.is_armed(future.id));
}

#[tokio::test]
async fn fire_with_failed_store_read_drops_its_timer_entry() {
    // Shared-cache in-memory DB: a second connection can drop the table out
    // from under the store, making the fire handler's initial read fail.
    let uri = "file:fire_read_fail?mode=memory&cache=shared";
    let saboteur = Connection::open(uri).unwrap();
    let (tx, mut delivered) = mpsc::unbounded_channel();
    let transport = Arc::new(RecordingTransport {
        tx,
        fail: AtomicBool::new(false),
    });
    let store = ReminderStore::new(Connection::open(uri).unwrap()).unwrap();
    let engine = Arc::new(SchedulerEngine::new(
        store.clone(),
        transport,
        chrono_tz::UTC,
    ));

    let reminder = store
        .insert(
            1,
            "doomed",
            Utc::now() + Duration::milliseconds(200),
            RecurrenceRule::Weekly,
            "@a",
        )
        .unwrap();
    engine.arm(&reminder);
    assert!(engine.is_armed(reminder.id));

    saboteur.execute_batch("DROP TABLE reminders;").unwrap();

    // The fired task's read fails, so nothing is delivered and the entry is
    // removed rather than lingering as a timer that can never fire.
    let engine2 = engine.clone();
    let id = reminder.id;
    wait_for(move || !engine2.is_armed(id)).await;
    assert_eq!(engine.armed_count(), 0);
    assert!(delivered.try_recv().is_err());
}

#[tokio::test]
async fn rearming_replaces_rather_than_duplicates() {
    let h = harness();
    let reminder = h
        .service
        .create(1, "only one timer", Utc::now() + Duration::days(1), RecurrenceRule::Weekly, "@a")
        .unwrap();

    for _ in 0..5 {
        h.engine.arm(&reminder);
    }
    assert_eq!(h.engine.armed_count(), 1);

    h.engine.disarm(reminder.id);
    h.engine.disarm(reminder.id);
    assert_eq!(h.engine.armed_count(), 0);
}
