//! Dialog state for the add/edit flows.
//!
//! Each private chat has one short-lived [`Session`]: the dialog position,
//! a partially-filled draft, and the id snapshot of the last displayed list
//! (so "edit number 2" stays stable even if the list changes underneath).

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;

use chime_core::RecurrenceRule;

/// Where the user is in the linear add/edit dialog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DialogState {
    #[default]
    Idle,
    // Add flow: text → date → rule → destination.
    AddText,
    AddDate,
    AddRule,
    AddDestination,
    // Edit flow: pick a list entry, pick a field, enter a value, confirm.
    EditChooseId,
    EditChooseField,
    EditEnterValue,
    EditConfirm,
}

/// Which reminder field an edit targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditField {
    Text,
    Date,
    Rule,
    Destination,
    Delete,
}

/// A parsed-and-validated value waiting for the confirm step.
#[derive(Debug, Clone)]
pub enum EditValue {
    Text(String),
    Date(DateTime<Utc>),
    Rule(RecurrenceRule),
    Destination(String),
}

/// Partially-filled reminder collected by the add flow.
#[derive(Debug, Clone, Default)]
pub struct Draft {
    pub text: Option<String>,
    pub date: Option<DateTime<Utc>>,
    pub rule: Option<RecurrenceRule>,
}

/// Per-chat dialog session.
#[derive(Debug, Default)]
pub struct Session {
    pub state: DialogState,
    pub draft: Draft,
    /// Displayed position → reminder id, snapshotted at list time.
    pub list_ids: Vec<i64>,
    pub edit_target: Option<i64>,
    pub edit_field: Option<EditField>,
    pub pending: Option<EditValue>,
}

impl Session {
    /// Back to idle. The list snapshot survives so the inline "Edit" button
    /// under an already-sent list keeps working.
    pub fn reset(&mut self) {
        let list_ids = std::mem::take(&mut self.list_ids);
        *self = Session {
            list_ids,
            ..Session::default()
        };
    }
}

/// Menu labels for the cadence keyboard, in display order.
pub const RULE_LABELS: [(RecurrenceRule, &str); 6] = [
    (RecurrenceRule::OneTime, "One time"),
    (RecurrenceRule::Daily, "Every day"),
    (RecurrenceRule::Weekly, "Every week"),
    (RecurrenceRule::Biweekly, "Every two weeks"),
    (RecurrenceRule::Monthly, "Every month"),
    (RecurrenceRule::Quarterly, "Every quarter"),
];

pub fn rule_label(rule: RecurrenceRule) -> &'static str {
    RULE_LABELS
        .iter()
        .find(|(r, _)| *r == rule)
        .map(|(_, label)| *label)
        .unwrap_or("?")
}

pub fn rule_from_label(label: &str) -> Option<RecurrenceRule> {
    RULE_LABELS
        .iter()
        .find(|(_, l)| *l == label)
        .map(|(r, _)| *r)
}

/// Parse user input in the configured format as a wall-clock time in `tz`.
///
/// Ambiguous local times (DST fall-back) take the earlier instant; times in
/// a DST gap are rejected like any other invalid input.
pub fn parse_local(input: &str, fmt: &str, tz: Tz) -> Option<DateTime<Utc>> {
    let naive = NaiveDateTime::parse_from_str(input.trim(), fmt).ok()?;
    tz.from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Render an instant in the configured zone and format for display.
pub fn format_local(t: DateTime<Utc>, fmt: &str, tz: Tz) -> String {
    t.with_timezone(&tz).format(fmt).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;
    use chrono_tz::Europe::Moscow;

    const FMT: &str = "%d.%m.%Y %H:%M";

    #[test]
    fn parse_and_format_round_trip_in_zone() {
        let parsed = parse_local("31.12.2025 09:30", FMT, Moscow).unwrap();
        assert_eq!(format_local(parsed, FMT, Moscow), "31.12.2025 09:30");
        // Moscow is UTC+3.
        assert_eq!(parsed.hour(), 6);
    }

    #[test]
    fn parse_rejects_wrong_format() {
        assert!(parse_local("2025-12-31 09:30", FMT, Moscow).is_none());
        assert!(parse_local("tomorrow", FMT, Moscow).is_none());
        assert!(parse_local("32.01.2025 09:30", FMT, Moscow).is_none());
        assert!(parse_local("", FMT, Moscow).is_none());
    }

    #[test]
    fn parse_trims_whitespace() {
        assert!(parse_local("  01.06.2025 08:00  ", FMT, Moscow).is_some());
    }

    #[test]
    fn rule_labels_round_trip() {
        for rule in RecurrenceRule::ALL {
            assert_eq!(rule_from_label(rule_label(rule)), Some(rule));
        }
        assert_eq!(rule_from_label("Every hour"), None);
    }

    #[test]
    fn session_reset_keeps_list_snapshot() {
        let mut session = Session {
            state: DialogState::EditConfirm,
            list_ids: vec![3, 1, 4],
            edit_target: Some(3),
            pending: Some(EditValue::Text("x".into())),
            ..Session::default()
        };
        session.reset();
        assert_eq!(session.state, DialogState::Idle);
        assert_eq!(session.list_ids, vec![3, 1, 4]);
        assert!(session.edit_target.is_none());
        assert!(session.pending.is_none());
    }

    #[test]
    fn format_uses_configured_zone() {
        let utc_noon = chrono::Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        assert_eq!(format_local(utc_noon, FMT, Moscow), "01.06.2025 15:00");
    }
}
