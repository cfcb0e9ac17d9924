//! Late-submission rule
//!
//! Submission timestamps and assignment due dates are compared in one fixed
//! reference timezone (UTC+03:00), day-granular. Using the same offset on
//! every comparison site avoids off-by-one-day results near midnight.

use chrono::{DateTime, Duration, NaiveDate, Utc};

/// Fixed reference timezone offset, hours east of UTC
pub const REFERENCE_TZ_OFFSET_HOURS: i64 = 3;

/// Calendar date of an instant in the reference timezone
fn reference_date(t: DateTime<Utc>) -> NaiveDate {
    (t + Duration::hours(REFERENCE_TZ_OFFSET_HOURS)).date_naive()
}

/// Whether a submission is late relative to the assignment due date.
///
/// Day-granular: submitting any time on the due date itself is on time,
/// the first late day is the one after. No due date means never late.
pub fn is_late(submitted_at: DateTime<Utc>, due_date: Option<DateTime<Utc>>) -> bool {
    match due_date {
        Some(due) => reference_date(submitted_at) > reference_date(due),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    #[test]
    fn test_on_due_date_is_on_time() {
        let due = utc(2024, 3, 10, 12, 0);
        // 20:59 UTC on the 10th is 23:59 on the 10th in UTC+3
        assert!(!is_late(utc(2024, 3, 10, 20, 59), Some(due)));
    }

    #[test]
    fn test_past_reference_midnight_is_late() {
        let due = utc(2024, 3, 10, 12, 0);
        // 21:00 UTC on the 10th is already 00:00 on the 11th in UTC+3
        assert!(is_late(utc(2024, 3, 10, 21, 0), Some(due)));
    }

    #[test]
    fn test_day_before_is_on_time() {
        let due = utc(2024, 3, 10, 12, 0);
        assert!(!is_late(utc(2024, 3, 9, 10, 0), Some(due)));
    }

    #[test]
    fn test_no_due_date_is_never_late() {
        assert!(!is_late(utc(2024, 3, 15, 8, 0), None));
    }
}
