//! Daily self-reported energy level.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use chrono::NaiveDate;
use serde::Deserialize;
use ssc_backend_domain::{DailyEnergy, DomainError, EnergyLevel};

use crate::error::ApiError;
use crate::middleware::auth::AuthUser;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct SetEnergyRequest {
    pub local_date: NaiveDate,
    pub level: EnergyLevel,
}

#[derive(Debug, Deserialize)]
pub struct EnergyRangeQuery {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

pub async fn list_energy(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Query(range): Query<EnergyRangeQuery>,
) -> Result<Json<Vec<DailyEnergy>>, ApiError> {
    if range.start > range.end {
        return Err(DomainError::Validation("start must not be after end".to_string()).into());
    }
    Ok(Json(state.energy_repo.list_range(user_id, range.start, range.end).await?))
}

pub async fn set_energy(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Json(req): Json<SetEnergyRequest>,
) -> Result<Json<DailyEnergy>, ApiError> {
    let energy = state.energy_repo.set(user_id, req.local_date, req.level).await?;
    Ok(Json(energy))
}
