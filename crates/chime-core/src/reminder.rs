//! Reminder record types — shared between the store, the scheduler engine and
//! the Telegram front-end.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Cadence governing how `next_run` advances after each firing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecurrenceRule {
    /// Fire exactly once, then deactivate.
    OneTime,
    /// Every day (fixed 24 h step).
    Daily,
    /// Every 7 days.
    Weekly,
    /// Every 14 days.
    Biweekly,
    /// Every calendar month (day-of-month clamped to short months).
    Monthly,
    /// Every 3 calendar months.
    Quarterly,
}

impl RecurrenceRule {
    /// All rules in menu order.
    pub const ALL: [RecurrenceRule; 6] = [
        RecurrenceRule::OneTime,
        RecurrenceRule::Daily,
        RecurrenceRule::Weekly,
        RecurrenceRule::Biweekly,
        RecurrenceRule::Monthly,
        RecurrenceRule::Quarterly,
    ];

    pub fn is_one_time(self) -> bool {
        self == RecurrenceRule::OneTime
    }

    /// Fixed step in whole days, for the duration-based rules.
    pub fn step_days(self) -> Option<i64> {
        match self {
            RecurrenceRule::Daily => Some(1),
            RecurrenceRule::Weekly => Some(7),
            RecurrenceRule::Biweekly => Some(14),
            _ => None,
        }
    }

    /// Step in calendar months, for the month-based rules.
    pub fn step_months(self) -> Option<u32> {
        match self {
            RecurrenceRule::Monthly => Some(1),
            RecurrenceRule::Quarterly => Some(3),
            _ => None,
        }
    }
}

impl std::fmt::Display for RecurrenceRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RecurrenceRule::OneTime => "one_time",
            RecurrenceRule::Daily => "daily",
            RecurrenceRule::Weekly => "weekly",
            RecurrenceRule::Biweekly => "biweekly",
            RecurrenceRule::Monthly => "monthly",
            RecurrenceRule::Quarterly => "quarterly",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for RecurrenceRule {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "one_time" => Ok(RecurrenceRule::OneTime),
            "daily" => Ok(RecurrenceRule::Daily),
            "weekly" => Ok(RecurrenceRule::Weekly),
            "biweekly" => Ok(RecurrenceRule::Biweekly),
            "monthly" => Ok(RecurrenceRule::Monthly),
            "quarterly" => Ok(RecurrenceRule::Quarterly),
            other => Err(format!("unknown recurrence rule: {other}")),
        }
    }
}

/// Lifecycle state of a reminder. Inactive is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReminderStatus {
    /// Scheduled — exactly one live timer exists for it.
    Active,
    /// Deleted or consumed (one-time after its single attempt).
    Inactive,
}

impl std::fmt::Display for ReminderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ReminderStatus::Active => "active",
            ReminderStatus::Inactive => "inactive",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for ReminderStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "active" => Ok(ReminderStatus::Active),
            "inactive" => Ok(ReminderStatus::Inactive),
            other => Err(format!("unknown reminder status: {other}")),
        }
    }
}

/// A persisted reminder record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reminder {
    /// SQLite rowid — assigned on insert, immutable.
    pub id: i64,
    /// Telegram user ID of the creator. Immutable after creation.
    pub owner: i64,
    /// Notification payload. Never empty.
    pub text: String,
    /// The next (or only) scheduled fire time.
    pub next_run: DateTime<Utc>,
    /// Recurrence cadence.
    pub rule: RecurrenceRule,
    /// Canonical destination: `@username` or a numeric chat ID.
    pub destination: String,
    /// Active or (terminally) inactive.
    pub status: ReminderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Set after each successful delivery; never set on failure.
    pub last_sent_at: Option<DateTime<Utc>>,
}

impl Reminder {
    pub fn is_active(&self) -> bool {
        self.status == ReminderStatus::Active
    }
}

/// Partial update passed to the store's `update`. Only the set fields are
/// written; the store always bumps `updated_at`.
#[derive(Debug, Clone, Default)]
pub struct ReminderPatch {
    pub text: Option<String>,
    pub next_run: Option<DateTime<Utc>>,
    pub rule: Option<RecurrenceRule>,
    pub destination: Option<String>,
    pub last_sent_at: Option<DateTime<Utc>>,
}

impl ReminderPatch {
    pub fn is_empty(&self) -> bool {
        self.text.is_none()
            && self.next_run.is_none()
            && self.rule.is_none()
            && self.destination.is_none()
            && self.last_sent_at.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rule_tokens_round_trip() {
        for rule in RecurrenceRule::ALL {
            let token = rule.to_string();
            assert_eq!(token.parse::<RecurrenceRule>().unwrap(), rule);
        }
    }

    #[test]
    fn unknown_rule_token_rejected() {
        assert!("hourly".parse::<RecurrenceRule>().is_err());
        assert!("".parse::<RecurrenceRule>().is_err());
    }

    #[test]
    fn status_tokens_round_trip() {
        for status in [ReminderStatus::Active, ReminderStatus::Inactive] {
            assert_eq!(
                status.to_string().parse::<ReminderStatus>().unwrap(),
                status
            );
        }
    }

    #[test]
    fn step_widths() {
        assert_eq!(RecurrenceRule::Daily.step_days(), Some(1));
        assert_eq!(RecurrenceRule::Weekly.step_days(), Some(7));
        assert_eq!(RecurrenceRule::Biweekly.step_days(), Some(14));
        assert_eq!(RecurrenceRule::Monthly.step_months(), Some(1));
        assert_eq!(RecurrenceRule::Quarterly.step_months(), Some(3));
        assert_eq!(RecurrenceRule::OneTime.step_days(), None);
        assert_eq!(RecurrenceRule::OneTime.step_months(), None);
    }

    #[test]
    fn empty_patch_detected() {
        assert!(ReminderPatch::default().is_empty());
        let patch = ReminderPatch {
            text: Some("x".into()),
            ..Default::default()
        };
        assert!(!patch.is_empty());
    }
}
