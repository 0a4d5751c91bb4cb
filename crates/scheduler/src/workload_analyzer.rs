//! Pre- and post-generation feasibility analysis. Every function here is
//! read-only: it never mutates sessions, tasks, or constraints.

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use ssc_backend_domain::{ScheduleConstraint, StudySession, StudyWindow, Subject, Task};
use std::collections::HashMap;
use uuid::Uuid;

use crate::planner::WeeklyPlan;
use crate::timekit;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct Warning {
    pub kind: String,
    pub severity: Severity,
    pub message: String,
}

fn warning(kind: &str, severity: Severity, message: String) -> Warning {
    Warning { kind: kind.to_string(), severity, message }
}

/// `completion_rate` clamped to [0.5, 0.95]; callers compute the raw rate
/// from the last 30 days of sessions and fall back to `default_rate`
/// (spec default 0.65) when there is no history.
pub fn clamp_completion_rate(raw: Option<f64>, default_rate: f64) -> f64 {
    raw.unwrap_or(default_rate).clamp(0.5, 0.95)
}

fn window_hours_per_week(windows: &[StudyWindow]) -> f64 {
    windows
        .iter()
        .map(|w| {
            let (start, end) = w.range();
            let minutes = if end <= start {
                (24 * 60) - (start.signed_duration_since(end)).num_minutes()
            } else {
                (end - start).num_minutes()
            };
            minutes as f64 / 60.0
        })
        .sum::<f64>()
        * 7.0
}

fn constraint_blocked_hours_per_week(constraints: &[ScheduleConstraint]) -> f64 {
    constraints
        .iter()
        .filter(|c| c.is_recurring())
        .map(|c| match (c.start_time, c.end_time, &c.days_of_week) {
            (Some(start), Some(end), Some(days)) => {
                let minutes = if end <= start {
                    (24 * 60) - (start.signed_duration_since(end)).num_minutes()
                } else {
                    (end - start).num_minutes()
                };
                minutes as f64 / 60.0 * days.len() as f64
            }
            _ => 0.0,
        })
        .sum()
}

/// Pre-generation feasibility check: can the user's windows and current
/// task load plausibly fit within `weekly_study_hours` at their historical
/// completion rate?
pub fn analyze_pre_generation(
    weekly_study_hours: f64,
    preferred_study_windows: &[StudyWindow],
    constraints: &[ScheduleConstraint],
    tasks: &[Task],
    subjects_by_id: &HashMap<Uuid, Subject>,
    completion_rate: f64,
    reference: DateTime<Utc>,
    tz: Tz,
) -> Vec<Warning> {
    let mut warnings = Vec::new();

    let gross_window_hours = window_hours_per_week(preferred_study_windows);
    let blocked_hours = constraint_blocked_hours_per_week(constraints);
    let available_hours = (gross_window_hours - blocked_hours).max(0.0);

    let task_hours: f64 = tasks
        .iter()
        .filter(|t| t.is_schedulable())
        .map(|t| t.remaining_minutes() as f64 / 60.0)
        .sum();

    let realistic_capacity = weekly_study_hours * completion_rate;

    if task_hours > realistic_capacity * 1.5 {
        warnings.push(warning(
            "capacity_exceeded",
            Severity::Critical,
            format!(
                "{task_hours:.1}h of tasks vastly exceeds realistic capacity of {realistic_capacity:.1}h/week"
            ),
        ));
    } else if task_hours > realistic_capacity * 1.3 {
        warnings.push(warning(
            "capacity_exceeded",
            Severity::Warning,
            format!(
                "{task_hours:.1}h of tasks exceeds realistic capacity of {realistic_capacity:.1}h/week"
            ),
        ));
    }

    if available_hours < weekly_study_hours {
        warnings.push(warning(
            "time_window_insufficient",
            Severity::Warning,
            format!(
                "Available study windows ({available_hours:.1}h/week) are less than your goal of {weekly_study_hours:.1}h/week"
            ),
        ));
    }

    if weekly_study_hours > available_hours {
        warnings.push(warning(
            "goal_exceeds_available",
            Severity::Info,
            format!("Weekly goal of {weekly_study_hours:.1}h exceeds {available_hours:.1}h of configured windows"),
        ));
    }

    for task in tasks.iter().filter(|t| t.is_schedulable() && t.deadline.is_some()) {
        let deadline = task.deadline.unwrap();
        let days_until = ((deadline - reference).num_seconds() as f64 / 86_400.0).max(0.01);
        let hours_needed = task.remaining_minutes() as f64 / 60.0;
        let hours_available = available_hours * (days_until / 7.0).min(1.0);
        if hours_needed > hours_available {
            warnings.push(warning(
                "task_deadline_deficit",
                Severity::Warning,
                format!(
                    "\"{}\" needs {hours_needed:.1}h but only ~{hours_available:.1}h available before its deadline",
                    task.title
                ),
            ));
        }
    }

    let mut deadline_counts: HashMap<NaiveDate, u32> = HashMap::new();
    for task in tasks.iter().filter(|t| t.is_schedulable()) {
        if let Some(deadline) = task.deadline {
            let days = (deadline - reference).num_days();
            if (0..=7).contains(&days) {
                *deadline_counts.entry(timekit::local_date_of(deadline, tz)).or_default() += 1;
            }
        }
    }
    for (date, count) in deadline_counts {
        if count >= 3 {
            warnings.push(warning(
                "deadline_clustering",
                Severity::Warning,
                format!("{count} tasks are due on {date}"),
            ));
        }
    }

    let today = timekit::local_date_of(reference, tz);
    for subject in subjects_by_id.values() {
        if let Some(exam_date) = subject.exam_date {
            let days = (exam_date - today).num_days();
            if (14..=28).contains(&days) {
                let has_open_task = tasks
                    .iter()
                    .any(|t| t.subject_id == Some(subject.id) && t.is_schedulable());
                if !has_open_task {
                    warnings.push(warning(
                        "exam_prep_missing",
                        Severity::Warning,
                        format!("\"{}\" has an exam in {days} days but no open tasks", subject.name),
                    ));
                }
            }
        }
    }

    if gross_window_hours > 0.0 && blocked_hours / gross_window_hours > 0.3 {
        warnings.push(warning(
            "constraints_impact",
            Severity::Info,
            format!(
                "Constraints block {:.0}% of your configured study windows",
                blocked_hours / gross_window_hours * 100.0
            ),
        ));
    }

    warnings
}

/// Post-generation analysis over a concrete plan.
pub fn analyze_post_generation(
    plan: &WeeklyPlan,
    tasks: &[Task],
    tz: Tz,
) -> Vec<Warning> {
    let mut warnings = Vec::new();

    let daily_hours: Vec<(NaiveDate, f64)> = plan
        .days
        .iter()
        .map(|d| {
            let local_date = timekit::local_date_of(d.day, tz);
            let hours: f64 = d
                .sessions
                .iter()
                .map(|s| (s.end_time - s.start_time).num_minutes() as f64 / 60.0)
                .sum();
            (local_date, hours)
        })
        .collect();

    for (date, hours) in &daily_hours {
        // A day is "overloaded" when its scheduled load clearly exceeds a
        // typical single-day availability budget of ~8h (windows minus
        // constraints collapse to a per-day figure the planner does not
        // carry forward, so this is the same fixed ceiling the source uses).
        if *hours > 8.0 {
            warnings.push(warning(
                "day_overload",
                Severity::Warning,
                format!("{date} has {hours:.1}h scheduled"),
            ));
        }
    }

    let scheduled_task_ids: std::collections::HashSet<Uuid> = plan
        .days
        .iter()
        .flat_map(|d| d.sessions.iter().filter_map(|s| s.task_id))
        .collect();
    for task in tasks.iter().filter(|t| t.is_schedulable()) {
        if !scheduled_task_ids.contains(&task.id) {
            warnings.push(warning(
                "unscheduled_task",
                Severity::Warning,
                format!("\"{}\" could not be fit into this week's plan", task.title),
            ));
        }
    }

    if let (Some(max), Some(min)) = (
        daily_hours.iter().map(|(_, h)| *h).filter(|h| *h > 0.0).fold(None, |acc: Option<f64>, h| Some(acc.map_or(h, |a| a.max(h)))),
        daily_hours.iter().map(|(_, h)| *h).filter(|h| *h > 0.0).fold(None, |acc: Option<f64>, h| Some(acc.map_or(h, |a| a.min(h)))),
    ) {
        if min > 0.0 && max / min > 2.5 {
            warnings.push(warning(
                "schedule_imbalance",
                Severity::Info,
                format!("Daily load ranges from {min:.1}h to {max:.1}h"),
            ));
        }
    }

    let mut longest_heavy_run = 0u32;
    let mut current_heavy_run = 0u32;
    for (_, hours) in &daily_hours {
        if *hours > 6.0 {
            current_heavy_run += 1;
            longest_heavy_run = longest_heavy_run.max(current_heavy_run);
        } else {
            current_heavy_run = 0;
        }
    }
    if longest_heavy_run >= 3 {
        warnings.push(warning(
            "consecutive_heavy_days",
            Severity::Warning,
            format!("{longest_heavy_run} consecutive days this week have more than 6h scheduled"),
        ));
    }

    for task in tasks.iter().filter(|t| t.deadline.is_some()) {
        let last_session_end = plan
            .days
            .iter()
            .flat_map(|d| &d.sessions)
            .filter(|s| s.task_id == Some(task.id))
            .map(|s| s.end_time)
            .max();
        if let (Some(last_end), Some(deadline)) = (last_session_end, task.deadline) {
            let buffer_hours = (deadline - last_end).num_minutes() as f64 / 60.0;
            if buffer_hours < 2.0 && buffer_hours >= 0.0 {
                warnings.push(warning(
                    "tight_deadline",
                    Severity::Warning,
                    format!("\"{}\" has only {buffer_hours:.1}h of buffer before its deadline", task.title),
                ));
            }
        }
    }

    for day in &plan.days {
        if day.sessions.is_empty() {
            warnings.push(warning(
                "constraints_blocking_all_time",
                Severity::Info,
                format!("{} has no scheduled sessions", timekit::local_date_of(day.day, tz)),
            ));
        }
    }

    warnings
}

/// Historical completion rate over the last 30 days of sessions, or `None`
/// if there is no completed/partial/skipped history to compute from.
pub fn historical_completion_rate(sessions: &[StudySession], reference: DateTime<Utc>) -> Option<f64> {
    let cutoff = reference - chrono::Duration::days(30);
    let relevant: Vec<&StudySession> = sessions
        .iter()
        .filter(|s| s.start_time >= cutoff && s.start_time <= reference)
        .filter(|s| {
            matches!(
                s.status,
                ssc_backend_domain::SessionStatus::Completed
                    | ssc_backend_domain::SessionStatus::Partial
                    | ssc_backend_domain::SessionStatus::Skipped
            )
        })
        .collect();

    if relevant.is_empty() {
        return None;
    }

    let completed = relevant
        .iter()
        .filter(|s| matches!(s.status, ssc_backend_domain::SessionStatus::Completed | ssc_backend_domain::SessionStatus::Partial))
        .count();

    Some(completed as f64 / relevant.len() as f64)
}
