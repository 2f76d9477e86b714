use chrono::{DateTime, Duration, Months, Utc};

use crate::types::{Frequency, PmStatus};

const SECS_PER_DAY: i64 = 86_400;

/// Whole days until `due`, rounded up. Negative once the due instant has
/// passed by a full day; 0 on the due day itself.
pub fn days_until_due(now: DateTime<Utc>, due: DateTime<Utc>) -> i64 {
    let secs = (due - now).num_seconds();
    // ceil(secs / SECS_PER_DAY) for signed secs.
    (secs + SECS_PER_DAY - 1).div_euclid(SECS_PER_DAY)
}

/// Derive a schedule's status at the write boundary.
///
/// `Completed` is sticky: the three-bucket rule never overwrites it. Only
/// the completion workflow clears it, via [`advance_due_date`] + [`bucket`].
pub fn derive_status(now: DateTime<Utc>, due: DateTime<Utc>, current: PmStatus) -> PmStatus {
    if current == PmStatus::Completed {
        return PmStatus::Completed;
    }
    bucket(now, due)
}

/// The pure three-bucket rule, ignoring any current status.
pub fn bucket(now: DateTime<Utc>, due: DateTime<Utc>) -> PmStatus {
    let days = days_until_due(now, due);
    if days < 0 {
        PmStatus::Overdue
    } else if days <= 7 {
        PmStatus::Upcoming
    } else {
        PmStatus::Scheduled
    }
}

/// Advance a due date by one recurrence period.
///
/// Month-based frequencies use calendar arithmetic: the day-of-month is
/// clamped to the last valid day of the target month (Jan 31 + 1 month is
/// the end of February, never March 2/3). Returns `None` only when the
/// result would fall outside chrono's representable range.
pub fn advance_due_date(due: DateTime<Utc>, frequency: Frequency) -> Option<DateTime<Utc>> {
    match frequency {
        Frequency::Daily => due.checked_add_signed(Duration::days(1)),
        Frequency::Weekly => due.checked_add_signed(Duration::days(7)),
        Frequency::Monthly => due.checked_add_months(Months::new(1)),
        Frequency::Quarterly => due.checked_add_months(Months::new(3)),
        Frequency::Annually => due.checked_add_months(Months::new(12)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
    }

    #[test]
    fn three_bucket_rule() {
        let now = utc(2024, 6, 10);
        assert_eq!(bucket(now, utc(2024, 6, 1)), PmStatus::Overdue);
        assert_eq!(bucket(now, utc(2024, 6, 10)), PmStatus::Upcoming);
        assert_eq!(bucket(now, utc(2024, 6, 17)), PmStatus::Upcoming);
        assert_eq!(bucket(now, utc(2024, 6, 18)), PmStatus::Scheduled);
        assert_eq!(bucket(now, utc(2024, 8, 1)), PmStatus::Scheduled);
    }

    #[test]
    fn due_three_days_ago_is_overdue() {
        let now = utc(2024, 6, 10);
        assert_eq!(bucket(now, utc(2024, 6, 7)), PmStatus::Overdue);
    }

    #[test]
    fn derivation_is_deterministic_and_completed_is_sticky() {
        let now = utc(2024, 6, 10);
        let due = utc(2024, 6, 1);
        assert_eq!(derive_status(now, due, PmStatus::Scheduled), PmStatus::Overdue);
        assert_eq!(derive_status(now, due, PmStatus::Overdue), PmStatus::Overdue);
        assert_eq!(derive_status(now, due, PmStatus::Completed), PmStatus::Completed);
    }

    #[test]
    fn ceil_rounding_matches_the_rule_at_the_boundary() {
        let due = utc(2024, 6, 10);
        // One second past due still rounds up to 0 days -> Upcoming.
        assert_eq!(days_until_due(due + Duration::seconds(1), due), 0);
        // A full day past due -> -1 -> Overdue.
        assert_eq!(days_until_due(due + Duration::days(1), due), -1);
        assert_eq!(days_until_due(due - Duration::seconds(1), due), 1);
    }

    #[test]
    fn monthly_rollover_clamps_to_end_of_february() {
        let due = utc(2025, 1, 31);
        let next = advance_due_date(due, Frequency::Monthly).unwrap();
        assert_eq!(next, utc(2025, 2, 28));

        // Leap year keeps the 29th.
        let due = utc(2024, 1, 31);
        let next = advance_due_date(due, Frequency::Monthly).unwrap();
        assert_eq!(next, utc(2024, 2, 29));
    }

    #[test]
    fn quarterly_rollover_keeps_the_day_of_month() {
        let due = utc(2024, 1, 15);
        let next = advance_due_date(due, Frequency::Quarterly).unwrap();
        assert_eq!(next, utc(2024, 4, 15));
    }

    #[test]
    fn annual_rollover_handles_leap_day() {
        let due = utc(2024, 2, 29);
        let next = advance_due_date(due, Frequency::Annually).unwrap();
        assert_eq!(next, utc(2025, 2, 28));
    }

    #[test]
    fn daily_and_weekly_are_fixed_offsets() {
        let due = utc(2024, 6, 10);
        assert_eq!(advance_due_date(due, Frequency::Daily).unwrap(), utc(2024, 6, 11));
        assert_eq!(advance_due_date(due, Frequency::Weekly).unwrap(), utc(2024, 6, 17));
    }
}
