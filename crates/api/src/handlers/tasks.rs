//! Task CRUD, including the recurring-template fields.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use ssc_backend_domain::{DomainError, RecurrencePattern, Subtask, Task, TaskPriority, TaskStatus};
use uuid::Uuid;

use crate::error::ApiError;
use crate::middleware::auth::AuthUser;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateTaskRequest {
    pub title: String,
    #[serde(default)]
    pub subject_id: Option<Uuid>,
    pub estimated_minutes: i32,
    #[serde(default)]
    pub deadline: Option<DateTime<Utc>>,
    #[serde(default)]
    pub priority: Option<TaskPriority>,
    #[serde(default)]
    pub recurrence_pattern: Option<RecurrencePattern>,
    #[serde(default)]
    pub recurrence_end_date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProgressRequest {
    #[serde(default)]
    pub timer_minutes_spent: Option<i32>,
    #[serde(default)]
    pub subtasks: Option<Vec<Subtask>>,
    #[serde(default)]
    pub status: Option<TaskStatus>,
}

pub async fn list_tasks(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Vec<Task>>, ApiError> {
    Ok(Json(state.task_repo.list_for_user(user_id).await?))
}

pub async fn create_task(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Json(req): Json<CreateTaskRequest>,
) -> Result<Json<Task>, ApiError> {
    if req.title.trim().is_empty() {
        return Err(DomainError::Validation("task title must not be empty".to_string()).into());
    }
    if req.estimated_minutes <= 0 {
        return Err(DomainError::Validation("estimated_minutes must be positive".to_string()).into());
    }
    if let Some(pattern) = &req.recurrence_pattern {
        pattern
            .validate()
            .map_err(|e| DomainError::Validation(e.to_string()))?;
    }

    let task = state
        .task_repo
        .create(
            user_id,
            &req.title,
            req.subject_id,
            req.estimated_minutes,
            req.deadline,
            req.priority.unwrap_or(TaskPriority::Medium),
            req.recurrence_pattern,
            req.recurrence_end_date,
        )
        .await?;
    Ok(Json(task))
}

pub async fn get_task(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Task>, ApiError> {
    let task = state
        .task_repo
        .get(user_id, id)
        .await?
        .ok_or_else(|| DomainError::NotFound(format!("task {id} not found")))?;
    Ok(Json(task))
}

/// Updates progress fields and, via `PersistenceProtocol`, re-evaluates
/// auto-completion (and, for a recurring instance, rollover) from the new
/// totals.
pub async fn update_task_progress(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateProgressRequest>,
) -> Result<Json<Task>, ApiError> {
    let updated = state
        .persistence
        .update_task_progress(user_id, id, req.timer_minutes_spent, req.subtasks, req.status, Utc::now())
        .await?;
    Ok(Json(updated))
}

pub async fn delete_task(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<axum::http::StatusCode, ApiError> {
    state.task_repo.delete(user_id, id).await?;
    Ok(axum::http::StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct UpdateRecurrencePatternRequest {
    pub recurrence_pattern: RecurrencePattern,
    #[serde(default)]
    pub recurrence_end_date: Option<NaiveDate>,
}

/// Expands a recurring template forward, creating any missing instances.
pub async fn expand_recurrence(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<Task>>, ApiError> {
    let created = state.persistence.expand_recurrence(user_id, id, Utc::now()).await?;
    Ok(Json(created))
}

/// Removes a template's recurrence: future instances are deleted, past or
/// completed ones are detached and kept as plain tasks, and the template
/// itself is demoted to a plain task.
pub async fn remove_recurrence(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<axum::http::StatusCode, ApiError> {
    state.persistence.remove_recurrence(user_id, id, Utc::now()).await?;
    Ok(axum::http::StatusCode::NO_CONTENT)
}

/// Applies a new recurrence pattern to a template, reassigning eligible
/// future instances and dropping any that fall outside the new pattern.
pub async fn update_recurrence_pattern(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateRecurrencePatternRequest>,
) -> Result<Json<Task>, ApiError> {
    req.recurrence_pattern
        .validate()
        .map_err(|e| DomainError::Validation(e.to_string()))?;
    let updated = state
        .persistence
        .update_recurrence_pattern(user_id, id, req.recurrence_pattern, req.recurrence_end_date, Utc::now())
        .await?;
    Ok(Json(updated))
}
