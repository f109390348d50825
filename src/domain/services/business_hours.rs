use chrono::offset::LocalResult;
use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::domain::entities::WorkingHoursSchedule;

/// Seconds from `start` to `end`, never negative.
pub fn wall_clock_seconds(start: DateTime<Utc>, end: DateTime<Utc>) -> f64 {
    let millis = (end - start).num_milliseconds();
    if millis <= 0 {
        0.0
    } else {
        millis as f64 / 1000.0
    }
}

/// Seconds of `[start, end]` that overlap the schedule's open hours.
///
/// With business hours disabled this is plain wall-clock time.
pub fn duration_in_business_hours(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    schedule: &WorkingHoursSchedule,
) -> f64 {
    if !schedule.business_hours_enabled {
        return wall_clock_seconds(start, end);
    }
    if start >= end {
        return 0.0;
    }

    let tz = schedule.timezone;
    let first_day = start.with_timezone(&tz).date_naive();
    let last_day = end.with_timezone(&tz).date_naive();

    if first_day == last_day {
        return overlap_on_day(first_day, start, end, schedule);
    }

    first_day
        .iter_days()
        .take_while(|day| *day <= last_day)
        .map(|day| overlap_on_day(day, start, end, schedule))
        .sum()
}

/// Whether `at` falls inside the schedule's open hours. A schedule with
/// business hours disabled is always open.
pub fn is_open_at(at: DateTime<Utc>, schedule: &WorkingHoursSchedule) -> bool {
    if !schedule.business_hours_enabled {
        return true;
    }

    let day = at.with_timezone(&schedule.timezone).date_naive();
    match open_window(day, schedule) {
        Some((open_at, close_at)) => open_at <= at && at < close_at,
        None => false,
    }
}

fn overlap_on_day(
    day: NaiveDate,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    schedule: &WorkingHoursSchedule,
) -> f64 {
    match open_window(day, schedule) {
        Some((open_at, close_at)) => wall_clock_seconds(open_at.max(start), close_at.min(end)),
        None => 0.0,
    }
}

/// Absolute instants bounding the open interval of a local calendar day.
fn open_window(
    day: NaiveDate,
    schedule: &WorkingHoursSchedule,
) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let (open, close) = schedule.for_weekday(day.weekday())?.open_interval()?;
    let tz = schedule.timezone;
    Some((local_instant(tz, day, open)?, local_instant(tz, day, close)?))
}

fn local_instant(tz: Tz, day: NaiveDate, minute_of_day: u32) -> Option<DateTime<Utc>> {
    // 24:00 rolls over to the next midnight
    let naive = day.and_hms_opt(0, 0, 0)? + Duration::minutes(i64::from(minute_of_day));
    resolve_local(tz, naive)
}

/// Ambiguous local times take the earlier instant; times skipped by a DST
/// jump move forward an hour.
fn resolve_local(tz: Tz, naive: NaiveDateTime) -> Option<DateTime<Utc>> {
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => Some(dt.with_timezone(&Utc)),
        LocalResult::Ambiguous(earliest, _) => Some(earliest.with_timezone(&Utc)),
        LocalResult::None => tz
            .from_local_datetime(&(naive + Duration::hours(1)))
            .earliest()
            .map(|dt| dt.with_timezone(&Utc)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::WorkingHours;

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    fn standard() -> WorkingHoursSchedule {
        WorkingHoursSchedule::standard(Tz::UTC).enabled()
    }

    #[test]
    fn test_full_week_counts_five_working_days() {
        // Sunday 2022-03-20 00:00 through Saturday 2022-03-26 23:59
        let value = duration_in_business_hours(
            utc(2022, 3, 20, 0, 0),
            utc(2022, 3, 26, 23, 59),
            &standard(),
        );
        assert_eq!(value, 144_000.0);
    }

    #[test]
    fn test_disabled_schedule_is_wall_clock() {
        let schedule = WorkingHoursSchedule::standard(Tz::UTC);
        let value =
            duration_in_business_hours(utc(2022, 3, 20, 0, 0), utc(2022, 3, 20, 1, 30), &schedule);
        assert_eq!(value, 5400.0);
    }

    #[test]
    fn test_reversed_interval_is_zero() {
        let end = utc(2022, 3, 21, 10, 0);
        let start = utc(2022, 3, 21, 12, 0);
        assert_eq!(duration_in_business_hours(start, end, &standard()), 0.0);
        assert_eq!(
            duration_in_business_hours(start, end, &WorkingHoursSchedule::default()),
            0.0
        );
    }

    #[test]
    fn test_same_day_clips_to_open_hours() {
        // Monday 08:00 -> 10:30 overlaps 09:00 -> 10:30
        let value =
            duration_in_business_hours(utc(2022, 3, 21, 8, 0), utc(2022, 3, 21, 10, 30), &standard());
        assert_eq!(value, 5400.0);
    }

    #[test]
    fn test_same_day_entirely_after_hours() {
        let value =
            duration_in_business_hours(utc(2022, 3, 21, 18, 0), utc(2022, 3, 21, 23, 0), &standard());
        assert_eq!(value, 0.0);
    }

    #[test]
    fn test_overnight_span_counts_both_days() {
        // Monday 16:00 -> Tuesday 10:00: one hour each side
        let value =
            duration_in_business_hours(utc(2022, 3, 21, 16, 0), utc(2022, 3, 22, 10, 0), &standard());
        assert_eq!(value, 7200.0);
    }

    #[test]
    fn test_weekend_only_window_is_zero() {
        let value =
            duration_in_business_hours(utc(2022, 3, 26, 0, 0), utc(2022, 3, 27, 23, 59), &standard());
        assert_eq!(value, 0.0);
    }

    #[test]
    fn test_schedule_is_read_in_its_timezone() {
        // 09:00-17:00 in New York (EDT, UTC-4) on Monday 2022-03-21;
        // 12:00 -> 15:00 UTC is 08:00 -> 11:00 local
        let schedule = WorkingHoursSchedule::standard(chrono_tz::America::New_York).enabled();
        let value =
            duration_in_business_hours(utc(2022, 3, 21, 12, 0), utc(2022, 3, 21, 15, 0), &schedule);
        assert_eq!(value, 2.0 * 3600.0);

        // 13:00 -> 23:00 UTC is 09:00 -> 19:00 local, eight open hours
        let value =
            duration_in_business_hours(utc(2022, 3, 21, 13, 0), utc(2022, 3, 21, 23, 0), &schedule);
        assert_eq!(value, 8.0 * 3600.0);
    }

    #[test]
    fn test_open_all_day_counts_midnight_to_midnight() {
        let mut saturday = WorkingHours::open(6, (0, 0), (0, 0));
        saturday.open_all_day = true;
        let schedule = standard().with_day(saturday);
        let value =
            duration_in_business_hours(utc(2022, 3, 26, 0, 0), utc(2022, 3, 27, 0, 0), &schedule);
        assert_eq!(value, 86_400.0);
    }

    #[test]
    fn test_is_open_at() {
        let schedule = standard();
        assert!(is_open_at(utc(2022, 3, 21, 9, 0), &schedule));
        assert!(is_open_at(utc(2022, 3, 21, 16, 59), &schedule));
        assert!(!is_open_at(utc(2022, 3, 21, 17, 0), &schedule));
        assert!(!is_open_at(utc(2022, 3, 20, 12, 0), &schedule));
        assert!(is_open_at(
            utc(2022, 3, 20, 12, 0),
            &WorkingHoursSchedule::default()
        ));
    }
}
