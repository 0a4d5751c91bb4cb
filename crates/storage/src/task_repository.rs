//! Task repository, including the recurring-template self-reference and
//! the embedded subtask checklist.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::types::Json;
use sqlx::PgPool;
use ssc_backend_domain::{RecurrencePattern, Subtask, Task, TaskPriority, TaskStatus};
use uuid::Uuid;

use crate::StorageError;

#[derive(Debug, Clone, sqlx::FromRow)]
struct TaskRow {
    id: Uuid,
    user_id: Uuid,
    title: String,
    subject_id: Option<Uuid>,
    estimated_minutes: i32,
    deadline: Option<DateTime<Utc>>,
    priority: String,
    status: String,
    is_completed: bool,
    actual_minutes_spent: i32,
    timer_minutes_spent: i32,
    subtasks: Json<Vec<Subtask>>,
    completed_at: Option<DateTime<Utc>>,
    prevent_auto_completion: bool,
    is_recurring_template: bool,
    recurring_template_id: Option<Uuid>,
    recurrence_pattern: Json<Option<RecurrencePattern>>,
    recurrence_end_date: Option<NaiveDate>,
    next_occurrence_date: Option<NaiveDate>,
    created_at: DateTime<Utc>,
}

fn parse_priority(s: &str) -> TaskPriority {
    match s {
        "low" => TaskPriority::Low,
        "high" => TaskPriority::High,
        "critical" => TaskPriority::Critical,
        _ => TaskPriority::Medium,
    }
}

fn priority_str(p: TaskPriority) -> &'static str {
    match p {
        TaskPriority::Low => "low",
        TaskPriority::Medium => "medium",
        TaskPriority::High => "high",
        TaskPriority::Critical => "critical",
    }
}

fn parse_status(s: &str) -> TaskStatus {
    match s {
        "in_progress" => TaskStatus::InProgress,
        "blocked" => TaskStatus::Blocked,
        "on_hold" => TaskStatus::OnHold,
        "completed" => TaskStatus::Completed,
        _ => TaskStatus::Todo,
    }
}

fn status_str(s: TaskStatus) -> &'static str {
    match s {
        TaskStatus::Todo => "todo",
        TaskStatus::InProgress => "in_progress",
        TaskStatus::Blocked => "blocked",
        TaskStatus::OnHold => "on_hold",
        TaskStatus::Completed => "completed",
    }
}

impl From<TaskRow> for Task {
    fn from(row: TaskRow) -> Self {
        Task {
            id: row.id,
            user_id: row.user_id,
            title: row.title,
            subject_id: row.subject_id,
            estimated_minutes: row.estimated_minutes,
            deadline: row.deadline,
            priority: parse_priority(&row.priority),
            status: parse_status(&row.status),
            is_completed: row.is_completed,
            actual_minutes_spent: row.actual_minutes_spent,
            timer_minutes_spent: row.timer_minutes_spent,
            subtasks: row.subtasks.0,
            completed_at: row.completed_at,
            prevent_auto_completion: row.prevent_auto_completion,
            is_recurring_template: row.is_recurring_template,
            recurring_template_id: row.recurring_template_id,
            recurrence_pattern: row.recurrence_pattern.0,
            recurrence_end_date: row.recurrence_end_date,
            next_occurrence_date: row.next_occurrence_date,
            created_at: row.created_at,
        }
    }
}

const TASK_COLUMNS: &str = "id, user_id, title, subject_id, estimated_minutes, deadline, priority, \
     status, is_completed, actual_minutes_spent, timer_minutes_spent, subtasks, completed_at, \
     prevent_auto_completion, is_recurring_template, recurring_template_id, recurrence_pattern, \
     recurrence_end_date, next_occurrence_date, created_at";

#[derive(Clone)]
pub struct TaskRepository {
    pool: PgPool,
}

impl TaskRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Task>, StorageError> {
        let rows = sqlx::query_as::<_, TaskRow>(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE user_id = $1 ORDER BY created_at"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Schedulable, non-template tasks only — what the planner's queue is
    /// built from.
    pub async fn list_schedulable(&self, user_id: Uuid) -> Result<Vec<Task>, StorageError> {
        let rows = sqlx::query_as::<_, TaskRow>(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks \
             WHERE user_id = $1 AND is_completed = false AND is_recurring_template = false \
             ORDER BY created_at"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    pub async fn list_recurring_templates(&self, user_id: Uuid) -> Result<Vec<Task>, StorageError> {
        let rows = sqlx::query_as::<_, TaskRow>(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE user_id = $1 AND is_recurring_template = true"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Instances generated from a given template, used to find the next
    /// unclaimed occurrence date and to drive cleanup past an updated
    /// end date.
    pub async fn list_instances_of_template(&self, template_id: Uuid) -> Result<Vec<Task>, StorageError> {
        let rows = sqlx::query_as::<_, TaskRow>(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE recurring_template_id = $1 ORDER BY created_at"
        ))
        .bind(template_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    pub async fn get(&self, user_id: Uuid, id: Uuid) -> Result<Option<Task>, StorageError> {
        let row = sqlx::query_as::<_, TaskRow>(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE id = $1 AND user_id = $2"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn create(
        &self,
        user_id: Uuid,
        title: &str,
        subject_id: Option<Uuid>,
        estimated_minutes: i32,
        deadline: Option<DateTime<Utc>>,
        priority: TaskPriority,
        recurrence_pattern: Option<RecurrencePattern>,
        recurrence_end_date: Option<NaiveDate>,
    ) -> Result<Task, StorageError> {
        let is_template = recurrence_pattern.is_some();
        let row = sqlx::query_as::<_, TaskRow>(&format!(
            r#"
            INSERT INTO tasks (
                user_id, title, subject_id, estimated_minutes, deadline, priority,
                is_recurring_template, recurrence_pattern, recurrence_end_date
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {TASK_COLUMNS}
            "#
        ))
        .bind(user_id)
        .bind(title)
        .bind(subject_id)
        .bind(estimated_minutes)
        .bind(deadline)
        .bind(priority_str(priority))
        .bind(is_template)
        .bind(Json(recurrence_pattern))
        .bind(recurrence_end_date)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    pub async fn create_instance(
        &self,
        template: &Task,
        deadline: DateTime<Utc>,
    ) -> Result<Task, StorageError> {
        let row = sqlx::query_as::<_, TaskRow>(&format!(
            r#"
            INSERT INTO tasks (
                user_id, title, subject_id, estimated_minutes, deadline, priority,
                recurring_template_id
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {TASK_COLUMNS}
            "#
        ))
        .bind(template.user_id)
        .bind(&template.title)
        .bind(template.subject_id)
        .bind(template.estimated_minutes)
        .bind(deadline)
        .bind(priority_str(template.priority))
        .bind(template.id)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    pub async fn update_progress(
        &self,
        user_id: Uuid,
        id: Uuid,
        actual_minutes_spent: i32,
        timer_minutes_spent: i32,
        subtasks: &[Subtask],
        is_completed: bool,
        completed_at: Option<DateTime<Utc>>,
        status: TaskStatus,
    ) -> Result<Task, StorageError> {
        let row = sqlx::query_as::<_, TaskRow>(&format!(
            r#"
            UPDATE tasks
            SET actual_minutes_spent = $3,
                timer_minutes_spent = $4,
                subtasks = $5,
                is_completed = $6,
                completed_at = $7,
                status = $8
            WHERE id = $1 AND user_id = $2
            RETURNING {TASK_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(user_id)
        .bind(actual_minutes_spent)
        .bind(timer_minutes_spent)
        .bind(Json(subtasks.to_vec()))
        .bind(is_completed)
        .bind(completed_at)
        .bind(status_str(status))
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    pub async fn update_deadline_and_priority(
        &self,
        id: Uuid,
        deadline: DateTime<Utc>,
        priority: TaskPriority,
    ) -> Result<(), StorageError> {
        sqlx::query("UPDATE tasks SET deadline = $2, priority = $3 WHERE id = $1")
            .bind(id)
            .bind(deadline)
            .bind(priority_str(priority))
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn update_recurrence_pattern(
        &self,
        id: Uuid,
        pattern: &RecurrencePattern,
        recurrence_end_date: Option<NaiveDate>,
    ) -> Result<(), StorageError> {
        sqlx::query("UPDATE tasks SET recurrence_pattern = $2, recurrence_end_date = $3 WHERE id = $1")
            .bind(id)
            .bind(Json(Some(pattern.clone())))
            .bind(recurrence_end_date)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn update_next_occurrence_date(
        &self,
        id: Uuid,
        next_occurrence_date: Option<NaiveDate>,
    ) -> Result<(), StorageError> {
        sqlx::query("UPDATE tasks SET next_occurrence_date = $2 WHERE id = $1")
            .bind(id)
            .bind(next_occurrence_date)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn update_deadline(&self, id: Uuid, deadline: DateTime<Utc>) -> Result<(), StorageError> {
        sqlx::query("UPDATE tasks SET deadline = $2 WHERE id = $1")
            .bind(id)
            .bind(deadline)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Demotes a template back to a plain task: clears the recurrence
    /// pattern and end/next-occurrence dates.
    pub async fn clear_recurrence(&self, id: Uuid) -> Result<(), StorageError> {
        sqlx::query(
            "UPDATE tasks SET is_recurring_template = false, recurrence_pattern = NULL, \
             recurrence_end_date = NULL, next_occurrence_date = NULL WHERE id = $1",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn delete(&self, user_id: Uuid, id: Uuid) -> Result<(), StorageError> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    pub async fn delete_many(&self, ids: &[Uuid]) -> Result<(), StorageError> {
        if ids.is_empty() {
            return Ok(());
        }
        sqlx::query("DELETE FROM tasks WHERE id = ANY($1)")
            .bind(ids)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn detach_from_template(&self, ids: &[Uuid]) -> Result<(), StorageError> {
        if ids.is_empty() {
            return Ok(());
        }
        sqlx::query("UPDATE tasks SET recurring_template_id = NULL WHERE id = ANY($1)")
            .bind(ids)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
