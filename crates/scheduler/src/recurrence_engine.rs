//! Expands recurring task templates into dated instances and handles
//! completion-triggered rollover. Every function here is a pure
//! computation over in-memory values; the storage layer is responsible
//! for loading the inputs and persisting the outputs.

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use ssc_backend_domain::{Frequency, RecurrencePattern};
use uuid::Uuid;

/// Purely functional next-occurrence computation. Returns `None` if the
/// computed date would exceed `end_date`.
pub fn next_occurrence(
    pattern: &RecurrencePattern,
    after: NaiveDate,
    end_date: Option<NaiveDate>,
) -> Option<NaiveDate> {
    let candidate = match pattern.frequency {
        Frequency::Daily => next_daily(pattern, after),
        Frequency::Weekly => next_weekly(pattern, after, pattern.interval.max(1) as i64),
        Frequency::Biweekly => next_weekly(pattern, after, 2),
        Frequency::Monthly => next_monthly(pattern, after),
    }?;

    match end_date {
        Some(end) if candidate > end => None,
        _ => Some(candidate),
    }
}

fn next_daily(pattern: &RecurrencePattern, after: NaiveDate) -> Option<NaiveDate> {
    let step = pattern.interval.max(1) as i64;
    let mut candidate = after + Duration::days(step);
    if pattern.weekdays_only.unwrap_or(false) {
        while matches!(candidate.weekday(), Weekday::Sat | Weekday::Sun) {
            candidate += Duration::days(1);
        }
    }
    Some(candidate)
}

/// Finds the next date after `after` whose weekday is in `pattern.days_of_week`,
/// constrained so only every `week_step`-th week (counted from `after`'s week)
/// counts as a valid occurrence.
fn next_weekly(pattern: &RecurrencePattern, after: NaiveDate, week_step: i64) -> Option<NaiveDate> {
    let days = pattern.days_of_week.as_ref()?;
    if days.is_empty() {
        return None;
    }
    let anchor_week_start = after - Duration::days(after.weekday().num_days_from_monday() as i64);

    let mut candidate = after + Duration::days(1);
    for _ in 0..(week_step * 7 * 8) {
        let weekday_idx = candidate.weekday().num_days_from_monday() as u8;
        if days.contains(&weekday_idx) {
            let candidate_week_start =
                candidate - Duration::days(candidate.weekday().num_days_from_monday() as i64);
            let weeks_since_anchor =
                (candidate_week_start - anchor_week_start).num_days() / 7;
            if weeks_since_anchor % week_step == 0 {
                return Some(candidate);
            }
        }
        candidate += Duration::days(1);
    }
    None
}

fn next_monthly(pattern: &RecurrencePattern, after: NaiveDate) -> Option<NaiveDate> {
    let interval = pattern.interval.max(1) as i32;
    if let Some(day_of_month) = pattern.day_of_month {
        let mut year = after.year();
        let mut month = after.month() as i32 + interval;
        while month > 12 {
            month -= 12;
            year += 1;
        }
        return Some(clamp_day_of_month(year, month as u32, day_of_month as u32));
    }
    if let (Some(week_of_month), Some(weekday)) = (
        pattern.week_of_month,
        pattern.days_of_week.as_ref().and_then(|d| d.first().copied()),
    ) {
        let mut year = after.year();
        let mut month = after.month() as i32 + interval;
        while month > 12 {
            month -= 12;
            year += 1;
        }
        return nth_weekday_of_month(year, month as u32, weekday, week_of_month);
    }
    None
}

fn clamp_day_of_month(year: i32, month: u32, day: u32) -> NaiveDate {
    let last_day = last_day_of_month(year, month);
    NaiveDate::from_ymd_opt(year, month, day.min(last_day)).expect("clamped day is valid")
}

fn last_day_of_month(year: i32, month: u32) -> u32 {
    let next_month_first = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    }
    .expect("valid month boundary");
    (next_month_first - Duration::days(1)).day()
}

fn nth_weekday_of_month(year: i32, month: u32, weekday_idx: u8, week_of_month: u8) -> Option<NaiveDate> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let first_weekday = first.weekday().num_days_from_monday() as i64;
    let target = weekday_idx as i64;
    let offset_to_first_match = (target - first_weekday).rem_euclid(7);
    let day = 1 + offset_to_first_match + (week_of_month as i64 - 1) * 7;
    let last_day = last_day_of_month(year, month) as i64;
    if day > last_day {
        return None;
    }
    NaiveDate::from_ymd_opt(year, month, day as u32)
}

/// A new instance to create, carrying everything copied from the template.
#[derive(Debug, Clone)]
pub struct NewInstance {
    pub local_date: NaiveDate,
}

/// Expand a template forward from its anchor date, producing the dates of
/// any new instances that should exist, bounded by `weeks_ahead` and the
/// template's `recurrence_end_date`. Dates already present in
/// `existing_instance_dates` are skipped unless `force` is set.
pub fn expand(
    pattern: &RecurrencePattern,
    anchor_date: NaiveDate,
    recurrence_end_date: Option<NaiveDate>,
    today: NaiveDate,
    weeks_ahead: u32,
    existing_instance_dates: &[NaiveDate],
    force: bool,
) -> Vec<NewInstance> {
    let horizon = today + Duration::weeks(weeks_ahead as i64);
    let mut instances = Vec::new();
    let mut cursor = anchor_date;

    loop {
        let Some(next) = next_occurrence(pattern, cursor, recurrence_end_date) else {
            break;
        };
        if next > horizon {
            break;
        }
        if force || !existing_instance_dates.contains(&next) {
            instances.push(NewInstance { local_date: next });
        }
        cursor = next;
    }

    instances
}

/// Called when an instance of a recurring template is completed. Returns
/// the next instance's date, or `None` if the pattern has no more
/// occurrences within `recurrence_end_date`. The caller must check whether
/// an instance for that date already exists before creating one — this
/// keeps duplicate completion calls idempotent.
pub fn on_instance_completion(
    pattern: &RecurrencePattern,
    instance_local_date: NaiveDate,
    recurrence_end_date: Option<NaiveDate>,
) -> Option<NaiveDate> {
    next_occurrence(pattern, instance_local_date, recurrence_end_date)
}

/// Classification of a template's instances for `remove_recurrence`.
pub struct RemovalPlan {
    /// Future, uncompleted instances: delete outright.
    pub to_delete: Vec<Uuid>,
    /// Past or completed instances: detach from the template but keep as
    /// plain tasks.
    pub to_detach: Vec<Uuid>,
}

pub struct InstanceRef {
    pub id: Uuid,
    pub local_date: NaiveDate,
    pub is_completed: bool,
}

pub fn remove_recurrence(instances: &[InstanceRef], today: NaiveDate) -> RemovalPlan {
    let mut to_delete = Vec::new();
    let mut to_detach = Vec::new();
    for instance in instances {
        if !instance.is_completed && instance.local_date >= today {
            to_delete.push(instance.id);
        } else {
            to_detach.push(instance.id);
        }
    }
    RemovalPlan { to_delete, to_detach }
}

/// An instance eligible for the `update_pattern` reassignment: uncompleted,
/// no time spent yet, and not currently in progress.
pub struct ReassignableInstance {
    pub id: Uuid,
    pub local_date: NaiveDate,
}

/// New deadlines for reassignable instances under the new pattern, plus
/// ids of extra instances beyond the new `recurrence_end_date` to delete.
pub struct RepatternPlan {
    pub reassignments: Vec<(Uuid, NaiveDate)>,
    pub to_delete: Vec<Uuid>,
}

pub fn update_pattern(
    new_pattern: &RecurrencePattern,
    anchor_date: NaiveDate,
    new_recurrence_end_date: Option<NaiveDate>,
    reassignable: &[ReassignableInstance],
) -> RepatternPlan {
    let mut reassignments = Vec::new();
    let mut to_delete = Vec::new();
    let mut cursor = anchor_date;

    for instance in reassignable {
        match next_occurrence(new_pattern, cursor, new_recurrence_end_date) {
            Some(next_date) => {
                reassignments.push((instance.id, next_date));
                cursor = next_date;
            }
            None => to_delete.push(instance.id),
        }
    }

    RepatternPlan { reassignments, to_delete }
}

/// Instances whose deadline now falls after a backward-edited end date.
pub fn cleanup_past_end_date(instances: &[InstanceRef], new_end_date: NaiveDate) -> Vec<Uuid> {
    instances
        .iter()
        .filter(|i| i.local_date > new_end_date)
        .map(|i| i.id)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn weekly_wednesday() -> RecurrencePattern {
        RecurrencePattern {
            frequency: Frequency::Weekly,
            interval: 1,
            days_of_week: Some(vec![2]),
            weekdays_only: None,
            day_of_month: None,
            week_of_month: None,
            advance_days: 3,
        }
    }

    #[test]
    fn weekly_next_occurrence_lands_on_matching_weekday() {
        // 2026-01-05 is a Monday.
        let monday = NaiveDate::from_ymd_opt(2026, 1, 5).unwrap();
        let next = next_occurrence(&weekly_wednesday(), monday, None).unwrap();
        assert_eq!(next.weekday(), Weekday::Wed);
        assert_eq!(next, NaiveDate::from_ymd_opt(2026, 1, 7).unwrap());
    }

    #[test]
    fn completion_rollover_is_idempotent_on_date() {
        let pattern = weekly_wednesday();
        let first_wed = NaiveDate::from_ymd_opt(2026, 1, 7).unwrap();
        let next = on_instance_completion(&pattern, first_wed, None).unwrap();
        assert_eq!(next, NaiveDate::from_ymd_opt(2026, 1, 14).unwrap());

        // Calling again from the same instance date must produce the same
        // next date — duplicate completion calls never advance twice.
        let next_again = on_instance_completion(&pattern, first_wed, None).unwrap();
        assert_eq!(next, next_again);
    }

    #[test]
    fn expand_skips_existing_dates_unless_forced() {
        let pattern = weekly_wednesday();
        let anchor = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        let today = anchor;
        let existing = vec![NaiveDate::from_ymd_opt(2026, 1, 7).unwrap()];
        let instances = expand(&pattern, anchor, None, today, 3, &existing, false);
        assert!(!instances.iter().any(|i| i.local_date == existing[0]));
    }

    #[test]
    fn monthly_day_of_month_clamps_to_month_end() {
        let pattern = RecurrencePattern {
            frequency: Frequency::Monthly,
            interval: 1,
            days_of_week: None,
            weekdays_only: None,
            day_of_month: Some(31),
            week_of_month: None,
            advance_days: 3,
        };
        let after = NaiveDate::from_ymd_opt(2026, 1, 31).unwrap();
        let next = next_occurrence(&pattern, after, None).unwrap();
        // February has 28 days in 2026.
        assert_eq!(next, NaiveDate::from_ymd_opt(2026, 2, 28).unwrap());
    }
}
