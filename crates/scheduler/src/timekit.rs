//! Timezone-aware boundary crossings.
//!
//! Every piece of time arithmetic that involves a user's wall clock funnels
//! through this module exactly once on the way in (external → UTC) and once
//! on the way out (UTC → local). Nothing else in this crate is allowed to
//! call `chrono_tz` directly — mixing naive and aware instants is the bug
//! this module exists to make impossible.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

/// Resolve a naive local datetime to a UTC instant, handling DST the way a
/// calendar application should: the ambiguous hour at a fall-back picks the
/// earlier (first) occurrence, and the nonexistent hour at a spring-forward
/// resolves to the first valid instant after the gap.
fn resolve_local(tz: Tz, naive: NaiveDateTime) -> DateTime<Utc> {
    match tz.from_local_datetime(&naive) {
        chrono::LocalResult::Single(dt) => dt.with_timezone(&Utc),
        chrono::LocalResult::Ambiguous(earliest, _latest) => earliest.with_timezone(&Utc),
        chrono::LocalResult::None => tz
            .from_local_datetime(&(naive + Duration::hours(1)))
            .latest()
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|| naive.and_utc()),
    }
}

/// The UTC instant of 00:00 local on the date containing `reference` in `tz`.
pub fn local_midnight(reference: DateTime<Utc>, tz: Tz) -> DateTime<Utc> {
    let local_date = reference.with_timezone(&tz).date_naive();
    resolve_local(tz, local_date.and_hms_opt(0, 0, 0).expect("midnight is valid"))
}

/// The calendar date `instant` falls on in `tz`.
pub fn local_date_of(instant: DateTime<Utc>, tz: Tz) -> NaiveDate {
    instant.with_timezone(&tz).date_naive()
}

/// Convert a local wall-clock window on `local_day` into a UTC interval.
/// If `end <= start` the window is treated as overnight and the end instant
/// falls on the following local day.
pub fn window_to_utc_range(
    local_day: NaiveDate,
    start_local: NaiveTime,
    end_local: NaiveTime,
    tz: Tz,
) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = resolve_local(tz, local_day.and_time(start_local));
    let end_day = if end_local <= start_local {
        local_day + Duration::days(1)
    } else {
        local_day
    };
    let end = resolve_local(tz, end_day.and_time(end_local));
    (start, end)
}

/// Round an instant up to the nearest multiple of `minutes`.
pub fn round_to_nearest(instant: DateTime<Utc>, minutes: i64) -> DateTime<Utc> {
    if minutes <= 0 {
        return instant;
    }
    let epoch_minutes = instant.timestamp() / 60;
    let remainder = epoch_minutes.rem_euclid(minutes);
    if remainder == 0 && instant.timestamp() % 60 == 0 {
        return instant;
    }
    let rounded_minutes = epoch_minutes - remainder + minutes;
    DateTime::<Utc>::from_timestamp(rounded_minutes * 60, 0).unwrap_or(instant)
}

/// ISO weekday with Monday = 0, matching the convention used throughout
/// `days_of_week` fields in constraints and recurrence patterns.
pub fn weekday_index(date: NaiveDate) -> u8 {
    date.weekday().num_days_from_monday() as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::Europe::Berlin;

    #[test]
    fn local_midnight_utc_is_midnight_utc() {
        let reference = Utc.with_ymd_and_hms(2026, 3, 10, 15, 30, 0).unwrap();
        let midnight = local_midnight(reference, Tz::UTC);
        assert_eq!(midnight, Utc.with_ymd_and_hms(2026, 3, 10, 0, 0, 0).unwrap());
    }

    #[test]
    fn window_to_utc_shortens_across_spring_forward() {
        // Germany springs forward 2026-03-29 02:00 -> 03:00 local.
        let day = NaiveDate::from_ymd_opt(2026, 3, 29).unwrap();
        let (start, end) =
            window_to_utc_range(day, NaiveTime::from_hms_opt(1, 0, 0).unwrap(), NaiveTime::from_hms_opt(4, 0, 0).unwrap(), Berlin);
        // Normally a 3h window; DST consumes the 02:00-03:00 hour so the UTC
        // span is only 2 hours wide.
        assert_eq!((end - start).num_hours(), 2);
    }

    #[test]
    fn overnight_window_rolls_to_next_day() {
        let day = NaiveDate::from_ymd_opt(2026, 6, 1).unwrap();
        let (start, end) = window_to_utc_range(
            day,
            NaiveTime::from_hms_opt(22, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(2, 0, 0).unwrap(),
            Tz::UTC,
        );
        assert_eq!((end - start).num_hours(), 4);
    }

    #[test]
    fn round_to_nearest_rounds_up() {
        let instant = Utc.with_ymd_and_hms(2026, 1, 1, 10, 2, 0).unwrap();
        let rounded = round_to_nearest(instant, 5);
        assert_eq!(rounded, Utc.with_ymd_and_hms(2026, 1, 1, 10, 5, 0).unwrap());
    }

    #[test]
    fn round_to_nearest_is_noop_on_exact_boundary() {
        let instant = Utc.with_ymd_and_hms(2026, 1, 1, 10, 5, 0).unwrap();
        assert_eq!(round_to_nearest(instant, 5), instant);
    }
}
