//! Next-occurrence arithmetic for recurrence rules.
//!
//! All results are instants (`DateTime<Utc>`); the configured timezone only
//! matters for the month-based rules, whose steps are calendar months in
//! local wall time rather than fixed durations.

use chrono::{DateTime, Datelike, Duration, Months, TimeZone, Utc};
use chrono_tz::Tz;

use chime_core::RecurrenceRule;

/// First occurrence of `rule` at or after `base` that is strictly later
/// than `now`.
///
/// - `OneTime`: `base` when still in the future, otherwise `now` — a
///   one-time reminder whose moment has passed fires as soon as possible
///   instead of being dropped.
/// - Day-based rules: `base + k·step` for the smallest integer `k ≥ 0` with
///   a result after `now`. `k` comes from a closed-form division, so a base
///   decades in the past costs the same as one from yesterday.
/// - Month-based rules: same idea with calendar months added in `tz`.
///   Steps always count from the original `base`, so the day-of-month is
///   preserved whenever the target month is long enough and clamped to the
///   month's last day otherwise (Jan 31 → Feb 29 → Mar 31).
pub fn next_occurrence(
    base: DateTime<Utc>,
    rule: RecurrenceRule,
    now: DateTime<Utc>,
    tz: Tz,
) -> DateTime<Utc> {
    if rule.is_one_time() {
        return if base > now { base } else { now };
    }

    if let Some(days) = rule.step_days() {
        if base > now {
            return base;
        }
        let step_ms = days * 24 * 60 * 60 * 1000;
        let elapsed_ms = now.signed_duration_since(base).num_milliseconds();
        let mut k = elapsed_ms / step_ms;
        loop {
            let candidate = base + Duration::days(k * days);
            if candidate > now {
                return candidate;
            }
            k += 1;
        }
    }

    // Monthly / quarterly.
    let step = rule
        .step_months()
        .expect("periodic rule is day- or month-based") as i64;
    let base_local = base.with_timezone(&tz);
    let now_local = now.with_timezone(&tz);
    let elapsed_months = (now_local.year() as i64 - base_local.year() as i64) * 12
        + (now_local.month() as i64 - base_local.month() as i64);
    let mut k = (elapsed_months / step).max(0);
    loop {
        let candidate = add_months(&base_local, (k * step) as u32);
        if candidate > now_local {
            return candidate.with_timezone(&Utc);
        }
        k += 1;
    }
}

/// Normalize a candidate start time for creation and for date/rule edits.
///
/// `OneTime` behaves like [`next_occurrence`]. For periodic rules a candidate
/// already in the future is used as-is (the first occurrence is exactly what
/// the user asked for); a candidate in the past is advanced per the rule.
/// Idempotent: re-normalizing an output with the same `now` returns it
/// unchanged.
pub fn normalize_next_run(
    candidate: DateTime<Utc>,
    rule: RecurrenceRule,
    now: DateTime<Utc>,
    tz: Tz,
) -> DateTime<Utc> {
    if rule.is_one_time() {
        return if candidate > now { candidate } else { now };
    }
    if candidate > now {
        candidate
    } else {
        next_occurrence(candidate, rule, now, tz)
    }
}

/// Add whole calendar months in local wall time, clamping the day-of-month.
fn add_months(dt: &DateTime<Tz>, months: u32) -> DateTime<Tz> {
    let tz = dt.timezone();
    let naive = dt.naive_local() + Months::new(months);
    // earliest() only fails when the wall time lands in a DST gap; fall back
    // to stepping on the UTC side, which keeps the instant well-defined.
    tz.from_local_datetime(&naive)
        .earliest()
        .unwrap_or_else(|| tz.from_utc_datetime(&(dt.naive_utc() + Months::new(months))))
}
