//! Subject CRUD.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use chrono::NaiveDate;
use serde::Deserialize;
use ssc_backend_domain::{Difficulty, DomainError, Subject, SubjectPriority};
use uuid::Uuid;

use crate::error::ApiError;
use crate::middleware::auth::AuthUser;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateSubjectRequest {
    pub name: String,
    #[serde(default)]
    pub priority: Option<SubjectPriority>,
    #[serde(default)]
    pub difficulty: Option<Difficulty>,
    #[serde(default)]
    pub workload: Option<f64>,
    #[serde(default)]
    pub exam_date: Option<NaiveDate>,
}

pub async fn list_subjects(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Vec<Subject>>, ApiError> {
    Ok(Json(state.subject_repo.list_for_user(user_id).await?))
}

pub async fn create_subject(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Json(req): Json<CreateSubjectRequest>,
) -> Result<Json<Subject>, ApiError> {
    if req.name.trim().is_empty() {
        return Err(DomainError::Validation("subject name must not be empty".to_string()).into());
    }
    let subject = state
        .subject_repo
        .create(
            user_id,
            &req.name,
            req.priority.unwrap_or(SubjectPriority::Medium),
            req.difficulty.unwrap_or(Difficulty::Medium),
            req.workload.unwrap_or(1.0),
            req.exam_date,
        )
        .await?;
    Ok(Json(subject))
}

pub async fn get_subject(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Subject>, ApiError> {
    let subject = state
        .subject_repo
        .get(user_id, id)
        .await?
        .ok_or_else(|| DomainError::NotFound(format!("subject {id} not found")))?;
    Ok(Json(subject))
}

pub async fn delete_subject(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<axum::http::StatusCode, ApiError> {
    state.subject_repo.delete(user_id, id).await?;
    Ok(axum::http::StatusCode::NO_CONTENT)
}
