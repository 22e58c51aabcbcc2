//! Calendar helpers for subscription windows (use chrono types, not raw offsets).

use chrono::{DateTime, Duration, Months, Utc};

/// `start` moved forward by whole calendar months.
///
/// The day of month carries over; when the target month is shorter the result is
/// clamped to its last day, so Jan 31 + 1 month is Feb 28 (Feb 29 in leap years).
/// Saturates at the largest representable instant.
pub fn add_calendar_months(start: DateTime<Utc>, months: u32) -> DateTime<Utc> {
    start
        .checked_add_months(Months::new(months))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// `start` moved forward by `days` days of 24 hours. Saturates like [`add_calendar_months`].
pub fn add_days(start: DateTime<Utc>, days: u32) -> DateTime<Utc> {
    start
        .checked_add_signed(Duration::days(i64::from(days)))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}
