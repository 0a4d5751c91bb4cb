//! Fixed schedule constraint CRUD.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use chrono::{DateTime, NaiveTime, Utc};
use serde::Deserialize;
use ssc_backend_domain::{ConstraintType, DomainError, ScheduleConstraint};
use uuid::Uuid;

use crate::error::ApiError;
use crate::middleware::auth::AuthUser;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateConstraintRequest {
    pub label: String,
    pub constraint_type: ConstraintType,
    #[serde(default)]
    pub days_of_week: Option<Vec<u8>>,
    #[serde(default)]
    pub start_time: Option<NaiveTime>,
    #[serde(default)]
    pub end_time: Option<NaiveTime>,
    #[serde(default)]
    pub start_datetime: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_datetime: Option<DateTime<Utc>>,
}

pub async fn list_constraints(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Vec<ScheduleConstraint>>, ApiError> {
    Ok(Json(state.constraint_repo.list_for_user(user_id).await?))
}

pub async fn create_constraint(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Json(req): Json<CreateConstraintRequest>,
) -> Result<Json<ScheduleConstraint>, ApiError> {
    let is_recurring = req.days_of_week.is_some();
    if is_recurring && (req.start_time.is_none() || req.end_time.is_none()) {
        return Err(DomainError::Validation(
            "recurring constraints require start_time and end_time".to_string(),
        )
        .into());
    }
    if !is_recurring && (req.start_datetime.is_none() || req.end_datetime.is_none()) {
        return Err(DomainError::Validation(
            "one-off constraints require start_datetime and end_datetime".to_string(),
        )
        .into());
    }

    let constraint = state
        .constraint_repo
        .create(
            user_id,
            &req.label,
            req.constraint_type,
            req.days_of_week.as_deref(),
            req.start_time,
            req.end_time,
            req.start_datetime,
            req.end_datetime,
        )
        .await?;
    Ok(Json(constraint))
}

pub async fn delete_constraint(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<axum::http::StatusCode, ApiError> {
    state.constraint_repo.delete(user_id, id).await?;
    Ok(axum::http::StatusCode::NO_CONTENT)
}
