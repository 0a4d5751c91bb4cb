//! Computes a priority weight per task from priority, deadline, subject
//! difficulty and exam urgency, then ranks tasks by descending weight.

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use ssc_backend_domain::{Difficulty, Subject, Task, TaskPriority};
use std::collections::HashMap;
use uuid::Uuid;

use crate::timekit;

fn priority_weight(p: TaskPriority) -> f64 {
    match p {
        TaskPriority::Low => 0.8,
        TaskPriority::Medium => 1.0,
        TaskPriority::High => 1.3,
        TaskPriority::Critical => 1.6,
    }
}

fn difficulty_weight(d: Difficulty) -> f64 {
    match d {
        Difficulty::Easy => 0.9,
        Difficulty::Medium => 1.0,
        Difficulty::Hard => 1.25,
    }
}

/// The floor that guarantees a CRITICAL task is never ranked below a HIGH
/// one, regardless of what the rest of the formula produces for HIGH.
const CRITICAL_WEIGHT_FLOOR: f64 = 2.0;

/// A task paired with its computed weight and remaining minutes, ready for
/// the planner to allocate.
#[derive(Debug, Clone)]
pub struct WeightedTask {
    pub task: Task,
    pub weight: f64,
    pub remaining_minutes: i32,
}

/// Compute a single task's weight. `reference` is the instant schedule
/// generation is running at; `today` is that instant's local date in the
/// user's timezone (exam urgency is measured in local days).
pub fn compute_weight(
    task: &Task,
    subject: Option<&Subject>,
    reference: DateTime<Utc>,
    today: NaiveDate,
) -> f64 {
    let mut weight = priority_weight(task.priority);

    if let Some(subject) = subject {
        weight *= difficulty_weight(subject.difficulty);
        if let Some(exam_date) = subject.exam_date {
            let days = (exam_date - today).num_days().max(0) as f64;
            weight *= 1.0 + (30.0 - days).max(0.0) / 30.0 * 0.5;
        }
    }

    if let Some(deadline) = task.deadline {
        let days = (deadline - reference).num_seconds() as f64 / 86_400.0;
        if days <= 0.0 {
            weight *= 1.75;
        } else {
            weight *= 1.0 + (7.0 - days).max(0.0) / 7.0;
        }
    }

    weight += task.estimated_minutes as f64 / 120.0;

    if task.priority == TaskPriority::Critical {
        weight = weight.max(CRITICAL_WEIGHT_FLOOR);
    }

    weight
}

/// Rank every schedulable (non-completed, non-template, with remaining
/// minutes) task in `tasks` by descending weight. Ties keep their original
/// relative order (stable sort) when weights tie.
pub fn rank_tasks(
    tasks: &[Task],
    subjects_by_id: &HashMap<Uuid, Subject>,
    reference: DateTime<Utc>,
    tz: Tz,
) -> Vec<WeightedTask> {
    let today = timekit::local_date_of(reference, tz);

    let mut weighted: Vec<WeightedTask> = tasks
        .iter()
        .filter(|t| t.is_schedulable())
        .map(|t| {
            let subject = t.subject_id.and_then(|id| subjects_by_id.get(&id));
            let weight = compute_weight(t, subject, reference, today);
            WeightedTask {
                task: t.clone(),
                weight,
                remaining_minutes: t.remaining_minutes(),
            }
        })
        .collect();

    weighted.sort_by(|a, b| b.weight.partial_cmp(&a.weight).unwrap_or(std::cmp::Ordering::Equal));
    weighted
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use ssc_backend_domain::{SubjectPriority, TaskStatus};
    use uuid::Uuid;

    fn bare_task(priority: TaskPriority, estimated_minutes: i32, deadline_days: Option<i64>, reference: DateTime<Utc>) -> Task {
        Task {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            title: "t".into(),
            subject_id: None,
            estimated_minutes,
            deadline: deadline_days.map(|d| reference + chrono::Duration::days(d)),
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
            created_at: reference,
        }
    }

    fn subject(difficulty: Difficulty, anchor: DateTime<Utc>) -> Subject {
        Subject {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            name: "s".into(),
            priority: SubjectPriority::Medium,
            difficulty,
            workload: 1.0,
            exam_date: None,
            created_at: anchor,
        }
    }

    #[test]
    fn critical_floor_beats_high_with_deadline_urgency() {
        let reference = Utc.with_ymd_and_hms(2026, 1, 1, 7, 0, 0).unwrap();
        let critical = bare_task(TaskPriority::Critical, 60, None, reference);
        let high = bare_task(TaskPriority::High, 120, Some(1), reference);

        let hard_subject = subject(Difficulty::Hard, reference);
        let mut high_with_subject = high.clone();
        high_with_subject.subject_id = Some(hard_subject.id);

        let w_critical = compute_weight(&critical, None, reference, timekit::local_date_of(reference, Tz::UTC));
        let w_high = compute_weight(
            &high_with_subject,
            Some(&hard_subject),
            reference,
            timekit::local_date_of(reference, Tz::UTC),
        );

        assert!(w_critical > w_high, "critical={w_critical} high={w_high}");
    }

    #[test]
    fn ranking_is_stable_and_descending() {
        let reference = Utc.with_ymd_and_hms(2026, 1, 1, 7, 0, 0).unwrap();
        let a = bare_task(TaskPriority::High, 180, Some(2), reference);
        let b = bare_task(TaskPriority::Medium, 120, Some(5), reference);
        let subjects = HashMap::new();
        let ranked = rank_tasks(&[a.clone(), b.clone()], &subjects, reference, Tz::UTC);
        assert_eq!(ranked.len(), 2);
        assert!(ranked[0].weight >= ranked[1].weight);
        assert_eq!(ranked[0].task.id, a.id);
    }
}
