//! Task entity, including the recurring-template self-reference and
//! the subtask checklist shape.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::recurrence::RecurrencePattern;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    Low,
    Medium,
    High,
    Critical,
}

impl TaskPriority {
    /// One-step escalation used by the overdue auto-reschedule pass,
    /// capped at `Critical`.
    pub fn escalate(self) -> Self {
        match self {
            TaskPriority::Low => TaskPriority::Medium,
            TaskPriority::Medium => TaskPriority::High,
            TaskPriority::High | TaskPriority::Critical => TaskPriority::Critical,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Todo,
    InProgress,
    Blocked,
    OnHold,
    Completed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subtask {
    pub id: String,
    pub title: String,
    pub completed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_minutes: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub subject_id: Option<Uuid>,
    pub estimated_minutes: i32,
    pub deadline: Option<DateTime<Utc>>,
    pub priority: TaskPriority,
    pub status: TaskStatus,
    pub is_completed: bool,
    pub actual_minutes_spent: i32,
    pub timer_minutes_spent: i32,
    pub subtasks: Vec<Subtask>,
    pub completed_at: Option<DateTime<Utc>>,
    pub prevent_auto_completion: bool,

    pub is_recurring_template: bool,
    pub recurring_template_id: Option<Uuid>,
    pub recurrence_pattern: Option<RecurrencePattern>,
    pub recurrence_end_date: Option<NaiveDate>,
    pub next_occurrence_date: Option<NaiveDate>,

    pub created_at: DateTime<Utc>,
}

impl Task {
    pub fn total_minutes_spent(&self) -> i32 {
        self.actual_minutes_spent + self.timer_minutes_spent
    }

    pub fn remaining_minutes(&self) -> i32 {
        (self.estimated_minutes - self.total_minutes_spent()).max(0)
    }

    pub fn is_schedulable(&self) -> bool {
        !self.is_completed && !self.is_recurring_template && self.remaining_minutes() > 0
    }
}
