//! Auto-completion rules triggered by session status changes.

use chrono::{DateTime, Duration, Utc};
use ssc_backend_domain::{Task, TaskStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutoCompletionOutcome {
    Unchanged,
    /// The task was auto-completed; if it is a recurring instance the
    /// caller must also invoke `recurrence_engine::on_instance_completion`.
    Completed,
    Uncompleted,
}

const UNCOMPLETE_GRACE: Duration = Duration::hours(1);

/// Recompute `actual_minutes_spent` and apply the auto-completion rules.
/// `completed_or_partial_minutes` is the sum of durations of all
/// COMPLETED|PARTIAL sessions referencing this task.
pub fn apply_session_propagation(
    task: &mut Task,
    completed_or_partial_minutes: i32,
    now: DateTime<Utc>,
) -> AutoCompletionOutcome {
    task.actual_minutes_spent = completed_or_partial_minutes;
    let total = task.total_minutes_spent();

    if total >= task.estimated_minutes && !task.is_completed && !task.prevent_auto_completion {
        task.is_completed = true;
        task.status = TaskStatus::Completed;
        task.completed_at = Some(now);
        return AutoCompletionOutcome::Completed;
    }

    if total < task.estimated_minutes && task.is_completed {
        let old_enough = task
            .completed_at
            .map(|at| now - at > UNCOMPLETE_GRACE)
            .unwrap_or(true);
        if !task.prevent_auto_completion && old_enough {
            task.is_completed = false;
            task.status = TaskStatus::Todo;
            task.completed_at = None;
            return AutoCompletionOutcome::Uncompleted;
        }
    }

    AutoCompletionOutcome::Unchanged
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use uuid::Uuid;

    fn task(estimated: i32, prevent_auto: bool) -> Task {
        Task {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            title: "t".into(),
            subject_id: None,
            estimated_minutes: estimated,
            deadline: None,
            priority: ssc_backend_domain::TaskPriority::Medium,
            status: TaskStatus::Todo,
            is_completed: false,
            actual_minutes_spent: 0,
            timer_minutes_spent: 0,
            subtasks: vec![],
            completed_at: None,
            prevent_auto_completion: prevent_auto,
            is_recurring_template: false,
            recurring_template_id: None,
            recurrence_pattern: None,
            recurrence_end_date: None,
            next_occurrence_date: None,
            created_at: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    #[test]
    fn auto_completes_when_total_reaches_estimate() {
        let mut t = task(60, false);
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap();
        let outcome = apply_session_propagation(&mut t, 60, now);
        assert_eq!(outcome, AutoCompletionOutcome::Completed);
        assert!(t.is_completed);
    }

    #[test]
    fn prevent_auto_completion_blocks_both_directions() {
        let mut t = task(60, true);
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap();
        let outcome = apply_session_propagation(&mut t, 60, now);
        assert_eq!(outcome, AutoCompletionOutcome::Unchanged);
        assert!(!t.is_completed);
    }

    #[test]
    fn recent_manual_completion_is_not_reverted() {
        let mut t = task(60, false);
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap();
        t.is_completed = true;
        t.completed_at = Some(now - Duration::minutes(10));
        let outcome = apply_session_propagation(&mut t, 10, now);
        assert_eq!(outcome, AutoCompletionOutcome::Unchanged);
        assert!(t.is_completed);
    }
}
