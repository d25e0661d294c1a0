//! Execution-time policy: how the five schedule fields become an absolute
//! local timestamp, and how a periodic repeat interval is derived.

use chrono::{DateTime, Local, Months, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, TimeZone};

use crate::error::{Result, SchedulerError};
use crate::types::ScheduleKind;
use chronod_core::TimeSpec;

/// Compute the absolute execution time for a schedule request.
///
/// Absolute interprets the fields as a local wall-clock timestamp: calendar
/// year, day counted from January 1, hour, minute, second. Out-of-range
/// components normalize through date arithmetic (day 40 of 2026 is
/// February 9). Relative and Periodic add the fields to `now` — years as
/// calendar years, the rest as exact durations.
pub fn execution_time(
    kind: ScheduleKind,
    spec: &TimeSpec,
    now: DateTime<Local>,
) -> Result<DateTime<Local>> {
    match kind {
        ScheduleKind::Absolute => absolute_time(spec),
        ScheduleKind::Relative | ScheduleKind::Periodic => relative_time(spec, now),
    }
}

/// Repeat interval for a periodic task, from fixed unit sizes (a year is
/// 365 days exactly — deliberately not leap-aware). A non-positive total
/// arms the first firing only.
pub fn periodic_interval(spec: &TimeSpec) -> Option<std::time::Duration> {
    let secs = spec.fixed_seconds();
    (secs > 0).then(|| std::time::Duration::from_secs(secs as u64))
}

fn absolute_time(spec: &TimeSpec) -> Result<DateTime<Local>> {
    let january_first = i32::try_from(spec.years)
        .ok()
        .and_then(|y| NaiveDate::from_ymd_opt(y, 1, 1))
        .ok_or_else(|| SchedulerError::InvalidSchedule(format!("year {} out of range", spec.years)))?;

    // Day 1 is January 1; day 0 normalizes back into the previous year.
    let offset = TimeSpec {
        years: 0,
        days: spec.days - 1,
        ..*spec
    };
    let naive = january_first
        .and_time(NaiveTime::MIN)
        .checked_add_signed(offset_delta(&offset)?)
        .ok_or_else(|| SchedulerError::InvalidSchedule("timestamp out of range".into()))?;
    resolve_local(naive)
}

fn relative_time(spec: &TimeSpec, now: DateTime<Local>) -> Result<DateTime<Local>> {
    let shifted = add_years(now.naive_local(), spec.years)?;
    let offset = TimeSpec { years: 0, ..*spec };
    let naive = shifted
        .checked_add_signed(offset_delta(&offset)?)
        .ok_or_else(|| SchedulerError::InvalidSchedule("timestamp out of range".into()))?;
    resolve_local(naive)
}

/// Calendar-year addition: the same month and day `years` later (or
/// earlier), with 29 February clamping to 28 in non-leap targets.
fn add_years(from: NaiveDateTime, years: i64) -> Result<NaiveDateTime> {
    if years == 0 {
        return Ok(from);
    }
    let months = u32::try_from(years.unsigned_abs().saturating_mul(12))
        .map_err(|_| SchedulerError::InvalidSchedule(format!("years {years} out of range")))?;
    let shifted = if years > 0 {
        from.checked_add_months(Months::new(months))
    } else {
        from.checked_sub_months(Months::new(months))
    };
    shifted.ok_or_else(|| SchedulerError::InvalidSchedule(format!("years {years} out of range")))
}

fn offset_delta(spec: &TimeSpec) -> Result<TimeDelta> {
    let parts = [
        TimeDelta::try_days(spec.days),
        TimeDelta::try_hours(spec.hours),
        TimeDelta::try_minutes(spec.minutes),
        TimeDelta::try_seconds(spec.seconds),
    ];
    let mut total = TimeDelta::zero();
    for part in parts {
        total = part
            .and_then(|p| total.checked_add(&p))
            .ok_or_else(|| SchedulerError::InvalidSchedule("offset out of range".into()))?;
    }
    Ok(total)
}

/// Resolve a naive local timestamp against the local timezone. An ambiguous
/// time (DST fall-back) takes the earlier instant; a nonexistent time (DST
/// gap) advances into the next valid hour.
fn resolve_local(naive: NaiveDateTime) -> Result<DateTime<Local>> {
    if let Some(dt) = Local.from_local_datetime(&naive).earliest() {
        return Ok(dt);
    }
    let bumped = naive
        .checked_add_signed(TimeDelta::hours(1))
        .ok_or_else(|| SchedulerError::InvalidSchedule("timestamp out of range".into()))?;
    Local
        .from_local_datetime(&bumped)
        .earliest()
        .ok_or_else(|| SchedulerError::InvalidSchedule("unrepresentable local time".into()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    fn local_now_fixture() -> DateTime<Local> {
        Local.with_ymd_and_hms(2026, 3, 10, 12, 0, 0).unwrap()
    }

    #[test]
    fn absolute_fields_are_the_timestamp() {
        let spec = TimeSpec::new(2026, 1, 10, 30, 0);
        let t = execution_time(ScheduleKind::Absolute, &spec, local_now_fixture()).unwrap();
        assert_eq!((t.year(), t.month(), t.day()), (2026, 1, 1));
        assert_eq!((t.hour(), t.minute(), t.second()), (10, 30, 0));
    }

    #[test]
    fn absolute_day_counts_from_january_and_normalizes() {
        // Day 40 of 2026 is February 9.
        let spec = TimeSpec::new(2026, 40, 0, 0, 0);
        let t = execution_time(ScheduleKind::Absolute, &spec, local_now_fixture()).unwrap();
        assert_eq!((t.year(), t.month(), t.day()), (2026, 2, 9));
    }

    #[test]
    fn absolute_day_zero_is_last_of_previous_year() {
        let spec = TimeSpec::new(2026, 0, 0, 0, 0);
        let t = execution_time(ScheduleKind::Absolute, &spec, local_now_fixture()).unwrap();
        assert_eq!((t.year(), t.month(), t.day()), (2025, 12, 31));
    }

    #[test]
    fn absolute_hour_overflow_rolls_into_next_day() {
        let spec = TimeSpec::new(2026, 1, 25, 0, 0);
        let t = execution_time(ScheduleKind::Absolute, &spec, local_now_fixture()).unwrap();
        assert_eq!((t.month(), t.day(), t.hour()), (1, 2, 1));
    }

    #[test]
    fn relative_adds_offset_to_now() {
        let now = local_now_fixture();
        let spec = TimeSpec::new(0, 0, 0, 0, 2);
        let t = execution_time(ScheduleKind::Relative, &spec, now).unwrap();
        assert_eq!(t - now, TimeDelta::seconds(2));
    }

    #[test]
    fn relative_days_cross_month_boundaries() {
        let now = local_now_fixture(); // 2026-03-10
        let spec = TimeSpec::new(0, 30, 0, 0, 0);
        let t = execution_time(ScheduleKind::Relative, &spec, now).unwrap();
        assert_eq!((t.year(), t.month(), t.day()), (2026, 4, 9));
    }

    #[test]
    fn relative_years_keep_month_and_day() {
        let now = local_now_fixture();
        let spec = TimeSpec::new(2, 0, 0, 0, 0);
        let t = execution_time(ScheduleKind::Relative, &spec, now).unwrap();
        assert_eq!((t.year(), t.month(), t.day()), (2028, 3, 10));
        assert_eq!(t.hour(), 12);
    }

    #[test]
    fn periodic_first_fire_matches_relative() {
        let now = local_now_fixture();
        let spec = TimeSpec::new(0, 0, 1, 0, 0);
        let relative = execution_time(ScheduleKind::Relative, &spec, now).unwrap();
        let periodic = execution_time(ScheduleKind::Periodic, &spec, now).unwrap();
        assert_eq!(relative, periodic);
    }

    #[test]
    fn periodic_interval_uses_fixed_units() {
        let spec = TimeSpec::new(1, 1, 0, 0, 30);
        let interval = periodic_interval(&spec).unwrap();
        assert_eq!(interval.as_secs(), 31_536_000 + 86_400 + 30);
    }

    #[test]
    fn non_positive_interval_means_no_repeat() {
        assert!(periodic_interval(&TimeSpec::default()).is_none());
        assert!(periodic_interval(&TimeSpec::new(0, 0, 0, 0, -5)).is_none());
    }

    #[test]
    fn unrepresentable_year_is_rejected() {
        let spec = TimeSpec::new(i64::MAX, 0, 0, 0, 0);
        assert!(execution_time(ScheduleKind::Absolute, &spec, local_now_fixture()).is_err());
    }
}
