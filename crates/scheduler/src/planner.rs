//! Given weighted tasks, windows, constraints and energy, produces a 7-day
//! plan. This module is a pure function end to end: no store I/O happens
//! here, which is what makes the scenarios in the scheduler's test suite
//! (and the property tests a caller builds on top of it) deterministic.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use chrono_tz::Tz;
use ssc_backend_domain::{
    EnergyLevel, EphemeralSession, GeneratedBy, ScheduleConstraint, StudyWindow, Task,
    TaskPriority, User,
};
use std::collections::HashMap;
use uuid::Uuid;

use crate::timekit;
use crate::weight_engine::WeightedTask;

const MIN_USEFUL_BLOCK_MINUTES: i64 = 10;
const DAYS_IN_PLAN: i64 = 7;

/// The subset of `User` configuration the planner needs, kept distinct from
/// the full entity so the planner's signature documents exactly what it
/// depends on.
#[derive(Debug, Clone)]
pub struct PlannerConfig {
    pub tz: Tz,
    pub preferred_study_windows: Vec<StudyWindow>,
    pub max_session_length: i32,
    pub break_duration: i32,
}

impl From<&User> for PlannerConfig {
    fn from(user: &User) -> Self {
        PlannerConfig {
            tz: user.tz(),
            preferred_study_windows: user.preferred_study_windows.clone(),
            max_session_length: user.max_session_length,
            break_duration: user.break_duration,
        }
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct PlannedBlock {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub subject_id: Option<Uuid>,
    pub task_id: Option<Uuid>,
    pub focus: String,
    pub energy_level: Option<EnergyLevel>,
    pub generated_by: GeneratedBy,
}

/// Internal working copy that additionally tracks the source task's
/// priority, needed by the interleave pass but dropped before the plan is
/// returned to callers.
#[derive(Debug, Clone)]
struct AllocatedBlock {
    block: PlannedBlock,
    priority: TaskPriority,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct DailyPlan {
    pub day: DateTime<Utc>,
    pub sessions: Vec<PlannedBlock>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct WeeklyPlan {
    pub user_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub days: Vec<DailyPlan>,
    pub optimization_explanation: Option<String>,
}

fn energy_cap(level: Option<EnergyLevel>) -> i32 {
    level.unwrap_or(EnergyLevel::Medium).session_cap_minutes()
}

/// One UTC interval a session may be placed in.
#[derive(Debug, Clone, Copy)]
struct WindowInterval {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

fn windows_for_day(config: &PlannerConfig, local_day: NaiveDate) -> Vec<WindowInterval> {
    config
        .preferred_study_windows
        .iter()
        .map(|w| {
            let (start_local, end_local) = w.range();
            let (start, end) = timekit::window_to_utc_range(local_day, start_local, end_local, config.tz);
            WindowInterval { start, end }
        })
        .collect()
}

/// A constraint is relevant to `local_day` if it's recurring and its
/// weekday matches, or one-off and its UTC interval — converted to this
/// user's local date — covers `local_day`. This is the corrected,
/// timezone-aware comparison (see the recorded open-question decision):
/// one-off constraints are converted to the user's tz before the date
/// comparison rather than compared as naive dates.
fn constraint_relevant(constraint: &ScheduleConstraint, local_day: NaiveDate, tz: Tz) -> bool {
    if let Some(days) = &constraint.days_of_week {
        let weekday = timekit::weekday_index(local_day);
        return days.contains(&weekday);
    }
    if let (Some(start), Some(end)) = (constraint.start_datetime, constraint.end_datetime) {
        let start_local_date = timekit::local_date_of(start, tz);
        let end_local_date = timekit::local_date_of(end, tz);
        return start_local_date <= local_day && local_day <= end_local_date;
    }
    false
}

fn constraint_utc_interval(
    constraint: &ScheduleConstraint,
    local_day: NaiveDate,
    tz: Tz,
) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    if let (Some(start_time), Some(end_time)) = (constraint.start_time, constraint.end_time) {
        return Some(timekit::window_to_utc_range(local_day, start_time, end_time, tz));
    }
    if let (Some(start), Some(end)) = (constraint.start_datetime, constraint.end_datetime) {
        return Some((start, end));
    }
    None
}

fn apply_constraints(
    windows: Vec<WindowInterval>,
    constraints: &[ScheduleConstraint],
    local_day: NaiveDate,
    tz: Tz,
) -> Vec<WindowInterval> {
    let relevant: Vec<(DateTime<Utc>, DateTime<Utc>)> = constraints
        .iter()
        .filter(|c| constraint_relevant(c, local_day, tz))
        .filter_map(|c| constraint_utc_interval(c, local_day, tz))
        .collect();

    windows
        .into_iter()
        .filter(|w| {
            !relevant
                .iter()
                .any(|(cs, ce)| w.start < *ce && *cs < w.end)
        })
        .collect()
}

/// Stable-sort the shared weighted-task queue for a single day's
/// allocation: tasks whose deadline's local date is on or before `day`
/// come first, preserving weight order within each group. The master
/// queue itself is never reordered — only the per-day index order is.
fn rank_for_day(queue: &[WeightedTask], day: NaiveDate, tz: Tz) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..queue.len()).collect();
    indices.sort_by_key(|&i| {
        let due = queue[i]
            .task
            .deadline
            .map(|d| timekit::local_date_of(d, tz) <= day)
            .unwrap_or(false);
        if due { 0 } else { 1 }
    });
    indices
}

/// Allocate sessions for a single local day into `windows`, mutating the
/// shared `queue`'s remaining-minutes in place as it consumes tasks.
fn allocate_day(
    config: &PlannerConfig,
    queue: &mut [WeightedTask],
    windows: Vec<WindowInterval>,
    local_day: NaiveDate,
    today_local: NaiveDate,
    reference: DateTime<Utc>,
    energy_today: Option<EnergyLevel>,
) -> Vec<AllocatedBlock> {
    let day_order = rank_for_day(queue, local_day, config.tz);
    let cap = config.max_session_length.min(energy_cap(energy_today));
    let mut allocated = Vec::new();

    for window in windows {
        let mut cursor = if local_day == today_local && window.start < reference {
            reference.max(window.start)
        } else {
            window.start
        };

        'window: while cursor < window.end {
            let window_remainder = (window.end - cursor).num_minutes();

            let mut scheduled_this_round = false;
            for &idx in &day_order {
                let task = &mut queue[idx];
                if task.remaining_minutes <= 0 {
                    continue;
                }

                let block_len = cap.min(task.remaining_minutes).min(window_remainder as i32);

                if (block_len as i64) < MIN_USEFUL_BLOCK_MINUTES {
                    if (task.remaining_minutes as i64) < MIN_USEFUL_BLOCK_MINUTES {
                        // Noise: not worth scheduling, abandon the remainder.
                        task.remaining_minutes = 0;
                        continue;
                    } else {
                        // Only the window is too small; move to the next window.
                        break 'window;
                    }
                }

                let start = cursor;
                let end = cursor + Duration::minutes(block_len as i64);
                allocated.push(AllocatedBlock {
                    block: PlannedBlock {
                        start_time: start,
                        end_time: end,
                        subject_id: task.task.subject_id,
                        task_id: Some(task.task.id),
                        focus: task.task.title.clone(),
                        energy_level: energy_today,
                        generated_by: GeneratedBy::Weekly,
                    },
                    priority: task.task.priority,
                });

                task.remaining_minutes -= block_len;
                cursor = end + Duration::minutes(config.break_duration as i64);
                scheduled_this_round = true;
                break;
            }

            if !scheduled_this_round {
                break;
            }
        }
    }

    allocated
}

/// Enforce `break_duration` between consecutive sessions in a day by
/// shifting later sessions forward when their gap is too small.
fn enforce_breaks(mut blocks: Vec<AllocatedBlock>, break_duration: i32) -> Vec<AllocatedBlock> {
    blocks.sort_by_key(|b| b.block.start_time);
    for i in 1..blocks.len() {
        let min_start = blocks[i - 1].block.end_time + Duration::minutes(break_duration as i64);
        if blocks[i].block.start_time < min_start {
            let duration = blocks[i].block.end_time - blocks[i].block.start_time;
            blocks[i].block.start_time = min_start;
            blocks[i].block.end_time = min_start + duration;
        }
    }
    blocks
}

/// Single bounded pass that swaps in a different-subject session whenever
/// two adjacent sessions share a subject, as long as neither is a CRITICAL
/// task's session. Time slots never move; only which task/subject occupies
/// a slot changes.
fn interleave_for_variety(mut blocks: Vec<AllocatedBlock>) -> Vec<AllocatedBlock> {
    let mut i = 0;
    while i + 1 < blocks.len() {
        let same_subject = blocks[i].block.subject_id == blocks[i + 1].block.subject_id
            && blocks[i].block.subject_id.is_some();
        let either_critical =
            blocks[i].priority == TaskPriority::Critical || blocks[i + 1].priority == TaskPriority::Critical;

        if same_subject && !either_critical {
            let mut swap_with = None;
            for j in (i + 2)..blocks.len() {
                if blocks[j].priority == TaskPriority::Critical {
                    break;
                }
                if blocks[j].block.subject_id != blocks[i].block.subject_id {
                    swap_with = Some(j);
                    break;
                }
            }
            if let Some(j) = swap_with {
                let (a, b) = (blocks[i + 1].clone(), blocks[j].clone());
                let (start_a, end_a) = (blocks[i + 1].block.start_time, blocks[i + 1].block.end_time);
                let (start_b, end_b) = (blocks[j].block.start_time, blocks[j].block.end_time);
                blocks[i + 1] = AllocatedBlock {
                    block: PlannedBlock {
                        start_time: start_a,
                        end_time: end_a,
                        ..b.block
                    },
                    priority: b.priority,
                };
                blocks[j] = AllocatedBlock {
                    block: PlannedBlock {
                        start_time: start_b,
                        end_time: end_b,
                        ..a.block
                    },
                    priority: a.priority,
                };
            }
        }
        i += 1;
    }
    blocks
}

/// Report from the overdue-task pass that runs before weighting, at the
/// start of `generate_weekly_schedule`.
#[derive(Debug, Clone, Default)]
pub struct RescheduleReport {
    pub rescheduled_today: u32,
    pub rescheduled_tomorrow: u32,
    pub needs_attention: Vec<Uuid>,
    pub rescheduled: Vec<Uuid>,
}

impl RescheduleReport {
    pub fn summary(&self) -> String {
        format!(
            "{} task(s) rescheduled to today, {} to tomorrow, {} flagged needing attention",
            self.rescheduled_today,
            self.rescheduled_tomorrow,
            self.needs_attention.len()
        )
    }
}

/// Mutates overdue tasks in place: escalates priority and moves the
/// deadline to today/tomorrow end-of-day for anything up to 14 days
/// overdue; flags anything older as needing attention without touching it.
pub fn reschedule_overdue(
    tasks: &mut [Task],
    reference: DateTime<Utc>,
    tz: Tz,
) -> RescheduleReport {
    let today = timekit::local_date_of(reference, tz);
    let local_hour = reference.with_timezone(&tz).time().hour();
    let mut report = RescheduleReport::default();

    for task in tasks.iter_mut() {
        if task.is_completed || task.is_recurring_template {
            continue;
        }
        let Some(deadline) = task.deadline else { continue };
        let deadline_local_date = timekit::local_date_of(deadline, tz);
        if deadline_local_date >= today {
            continue;
        }
        let days_overdue = (today - deadline_local_date).num_days();
        if days_overdue > 14 {
            report.needs_attention.push(task.id);
            continue;
        }

        let target_day = if local_hour >= 20 { today + chrono::Duration::days(1) } else { today };
        let new_deadline_local = target_day.and_hms_opt(23, 59, 0).expect("valid time");
        task.deadline = Some(timekit_resolve(new_deadline_local, tz));
        task.priority = task.priority.escalate();
        report.rescheduled.push(task.id);

        if target_day == today {
            report.rescheduled_today += 1;
        } else {
            report.rescheduled_tomorrow += 1;
        }
    }

    report
}

use chrono::Timelike;

fn timekit_resolve(naive: chrono::NaiveDateTime, tz: Tz) -> DateTime<Utc> {
    // Delegates to the same DST-safe resolution TimeKit uses internally.
    timekit::window_to_utc_range(naive.date(), naive.time(), naive.time(), tz).0
}

/// Produce a 7-day plan starting from the local midnight containing
/// `reference`. `queue` is ranked once by weight and then mutated in place
/// as each day consumes remaining minutes.
pub fn generate_weekly_schedule(
    user_id: Uuid,
    config: &PlannerConfig,
    queue: &mut [WeightedTask],
    constraints: &[ScheduleConstraint],
    energy_by_date: &HashMap<NaiveDate, EnergyLevel>,
    reference: DateTime<Utc>,
    reschedule_summary: Option<String>,
) -> WeeklyPlan {
    let today_local = timekit::local_date_of(reference, config.tz);
    let mut days = Vec::with_capacity(DAYS_IN_PLAN as usize);

    for offset in 0..DAYS_IN_PLAN {
        let local_day = today_local + Duration::days(offset);
        let day_start_utc = timekit::local_midnight(reference, config.tz) + Duration::days(offset);

        let windows = windows_for_day(config, local_day);
        let windows = apply_constraints(windows, constraints, local_day, config.tz);
        let energy_today = energy_by_date.get(&local_day).copied();

        let allocated = allocate_day(config, queue, windows, local_day, today_local, reference, energy_today);
        let allocated = enforce_breaks(allocated, config.break_duration);
        let allocated = interleave_for_variety(allocated);

        days.push(DailyPlan {
            day: day_start_utc,
            sessions: allocated.into_iter().map(|a| a.block).collect(),
        });
    }

    WeeklyPlan {
        user_id,
        generated_at: reference,
        days,
        optimization_explanation: reschedule_summary,
    }
}

/// Allocate a single contiguous run from `reference`, ignoring windows and
/// day rollover. Returns ephemeral sessions, never persisted by this
/// function.
pub fn micro_plan(
    queue: &mut [WeightedTask],
    reference: DateTime<Utc>,
    total_minutes: i32,
    energy: Option<EnergyLevel>,
    max_session_length: i32,
) -> Vec<EphemeralSession> {
    let cap = max_session_length.min(energy_cap(energy));
    let mut cursor = reference;
    let mut remaining_total = total_minutes;
    let mut sessions = Vec::new();

    'outer: while remaining_total > 0 {
        let mut scheduled = false;
        for task in queue.iter_mut() {
            if task.remaining_minutes <= 0 {
                continue;
            }
            let block_len = cap.min(task.remaining_minutes).min(remaining_total);
            if (block_len as i64) < MIN_USEFUL_BLOCK_MINUTES {
                continue;
            }
            let start = cursor;
            let end = cursor + Duration::minutes(block_len as i64);
            sessions.push(EphemeralSession {
                start_time: start,
                end_time: end,
                subject_id: task.task.subject_id,
                task_id: Some(task.task.id),
                energy_level: energy,
            });
            task.remaining_minutes -= block_len;
            remaining_total -= block_len;
            cursor = end;
            scheduled = true;
            break;
        }
        if !scheduled {
            break 'outer;
        }
    }

    sessions
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use ssc_backend_domain::{TaskStatus, WindowPreset};

    fn make_task(priority: TaskPriority, estimated_minutes: i32, deadline: Option<DateTime<Utc>>) -> Task {
        Task {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            title: "task".into(),
            subject_id: None,
            estimated_minutes,
            deadline,
            priority,
            status: TaskStatus::Todo,
            is_completed: false,
            actual_minutes_spent: 0,
            timer_minutes_spent: 0,
            subtasks: vec![],
            completed_at: None,
            prevent_auto_completion: false,
            is_recurring_template: false,
            recurring_template_id: None,
            recurrence_pattern: None,
            recurrence_end_date: None,
            next_occurrence_date: None,
            created_at: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    #[test]
    fn basic_week_fills_morning_window() {
        let reference = Utc.with_ymd_and_hms(2026, 1, 5, 7, 0, 0).unwrap(); // Monday 07:00 UTC
        let config = PlannerConfig {
            tz: Tz::UTC,
            preferred_study_windows: vec![StudyWindow::Preset(WindowPreset::Morning)],
            max_session_length: 90,
            break_duration: 15,
        };

        let task_a = make_task(TaskPriority::High, 180, Some(reference + Duration::days(2)));
        let task_b = make_task(TaskPriority::Medium, 120, Some(reference + Duration::days(5)));

        let mut queue = vec![
            WeightedTask { task: task_a.clone(), weight: 2.0, remaining_minutes: 180 },
            WeightedTask { task: task_b.clone(), weight: 1.0, remaining_minutes: 120 },
        ];

        let plan = generate_weekly_schedule(
            Uuid::new_v4(),
            &config,
            &mut queue,
            &[],
            &HashMap::new(),
            reference,
            None,
        );

        let monday = &plan.days[0];
        assert_eq!(monday.sessions.len(), 2);
        assert_eq!(monday.sessions[0].task_id, Some(task_a.id));
        assert_eq!(monday.sessions[0].start_time, reference);
        assert_eq!(monday.sessions[0].end_time, reference + Duration::minutes(90));
        assert_eq!(monday.sessions[1].task_id, Some(task_b.id));
        assert_eq!(
            monday.sessions[1].start_time,
            monday.sessions[0].end_time + Duration::minutes(15)
        );
    }

    #[test]
    fn sessions_never_start_outside_their_window() {
        let reference = Utc.with_ymd_and_hms(2026, 1, 5, 7, 0, 0).unwrap();
        let config = PlannerConfig {
            tz: Tz::UTC,
            preferred_study_windows: vec![StudyWindow::Preset(WindowPreset::Morning)],
            max_session_length: 90,
            break_duration: 15,
        };
        let task = make_task(TaskPriority::Medium, 600, None);
        let mut queue = vec![WeightedTask { task, weight: 1.0, remaining_minutes: 600 }];

        let plan = generate_weekly_schedule(Uuid::new_v4(), &config, &mut queue, &[], &HashMap::new(), reference, None);
        for day in &plan.days {
            for session in &day.sessions {
                let local_start = session.start_time.with_timezone(&Tz::UTC).time();
                assert!(local_start >= chrono::NaiveTime::from_hms_opt(7, 0, 0).unwrap());
                assert!(session.end_time.with_timezone(&Tz::UTC).time() <= chrono::NaiveTime::from_hms_opt(11, 0, 0).unwrap());
            }
        }
    }
}
