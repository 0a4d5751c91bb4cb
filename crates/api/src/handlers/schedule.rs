//! Scheduler-facing endpoints: plan generation, session lifecycle, the
//! micro-plan variant, and workload analysis.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use ssc_backend_domain::{DomainError, EnergyLevel, EphemeralSession, GeneratedBy, SessionStatus, StudySession};
use ssc_backend_scheduler::planner::{self, PlannerConfig};
use ssc_backend_scheduler::weight_engine;
use ssc_backend_scheduler::workload_analyzer::{self, Warning};

use crate::error::ApiError;
use crate::middleware::auth::AuthUser;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct GenerateQuery {
    #[serde(default)]
    pub use_ai_optimization: bool,
}

pub async fn generate(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Query(query): Query<GenerateQuery>,
) -> Result<Json<planner::WeeklyPlan>, ApiError> {
    let user = state
        .user_repo
        .get_by_id(user_id)
        .await?
        .ok_or_else(|| DomainError::NotFound("user not found".to_string()))?;

    let now = Utc::now();
    let config = PlannerConfig::from(&user);

    let mut tasks = state.task_repo.list_schedulable(user_id).await?;
    let reschedule = planner::reschedule_overdue(&mut tasks, now, config.tz);
    for task in tasks.iter().filter(|t| reschedule.rescheduled.contains(&t.id)) {
        let deadline = task
            .deadline
            .expect("reschedule_overdue only touches tasks that already have a deadline");
        state
            .task_repo
            .update_deadline_and_priority(task.id, deadline, task.priority)
            .await?;
    }

    let subjects = state.subject_repo.list_for_user(user_id).await?;
    let subjects_by_id: HashMap<Uuid, _> = subjects.into_iter().map(|s| (s.id, s)).collect();
    let mut queue = weight_engine::rank_tasks(&tasks, &subjects_by_id, now, config.tz);

    let constraints = state.constraint_repo.list_for_user(user_id).await?;
    let today_local = ssc_backend_scheduler::timekit::local_date_of(now, config.tz);
    let energy_rows = state
        .energy_repo
        .list_range(user_id, today_local, today_local + chrono::Duration::days(7))
        .await?;
    let energy_by_date: HashMap<_, _> = energy_rows.into_iter().map(|e| (e.local_date, e.level)).collect();

    let mut plan = planner::generate_weekly_schedule(
        user_id,
        &config,
        &mut queue,
        &constraints,
        &energy_by_date,
        now,
        Some(reschedule.summary()),
    );

    if query.use_ai_optimization {
        let warnings = workload_analyzer::analyze_post_generation(&plan, &tasks, config.tz);
        if let Ok(Some(hint)) = state.coach_adapter.suggest_schedule_adjustment(&plan, &warnings).await {
            plan.optimization_explanation = Some(hint);
        }
    }

    state.persistence.apply_weekly_plan(user_id, &plan, now).await?;
    state.workload_cache.invalidate(user_id);

    tracing::info!(user_id = %user_id, "generated weekly schedule");
    Ok(Json(plan))
}

#[derive(Debug, Deserialize)]
pub struct SessionsQuery {
    #[serde(default)]
    pub from: Option<DateTime<Utc>>,
    #[serde(default)]
    pub to: Option<DateTime<Utc>>,
}

pub async fn list_sessions(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Query(query): Query<SessionsQuery>,
) -> Result<Json<Vec<StudySession>>, ApiError> {
    let user = state
        .user_repo
        .get_by_id(user_id)
        .await?
        .ok_or_else(|| DomainError::NotFound("user not found".to_string()))?;

    let now = Utc::now();
    let from = query.from.unwrap_or_else(|| ssc_backend_scheduler::timekit::local_midnight(now, user.tz()));
    let to = query.to.unwrap_or_else(|| from + chrono::Duration::days(90));

    Ok(Json(state.session_repo.list_range(user_id, from, to).await?))
}

#[derive(Debug, Deserialize)]
pub struct CreateSessionRequest {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    #[serde(default)]
    pub subject_id: Option<Uuid>,
    #[serde(default)]
    pub task_id: Option<Uuid>,
    #[serde(default)]
    pub energy_level: Option<EnergyLevel>,
    #[serde(default)]
    pub notes: Option<String>,
}

pub async fn create_session(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Json(req): Json<CreateSessionRequest>,
) -> Result<Json<StudySession>, ApiError> {
    let session = state
        .persistence
        .create_manual_session(
            user_id,
            req.start_time,
            req.end_time,
            req.subject_id,
            req.task_id,
            req.energy_level,
            req.notes.as_deref(),
        )
        .await?;
    Ok(Json(session))
}

#[derive(Debug, Deserialize)]
pub struct PatchSessionRequest {
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub status: Option<SessionStatus>,
    #[serde(default)]
    pub notes: Option<String>,
}

pub async fn patch_session(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    Json(req): Json<PatchSessionRequest>,
) -> Result<Json<StudySession>, ApiError> {
    let mut session = state
        .session_repo
        .get(user_id, id)
        .await?
        .ok_or_else(|| DomainError::NotFound(format!("session {id} not found")))?;

    if let (Some(start), Some(end)) = (req.start_time, req.end_time) {
        session = state.persistence.edit_session_time(user_id, id, start, end).await?;
    }

    if let Some(status) = req.status {
        session = state.persistence.set_session_status(user_id, id, status, Utc::now()).await?;
    }

    Ok(Json(session))
}

/// Only PLANNED|SKIPPED sessions that are pinned or manually created may
/// be deleted.
pub async fn delete_session(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<axum::http::StatusCode, ApiError> {
    let session = state
        .session_repo
        .get(user_id, id)
        .await?
        .ok_or_else(|| DomainError::NotFound(format!("session {id} not found")))?;

    let deletable_status = matches!(session.status, SessionStatus::Planned | SessionStatus::Skipped);
    let deletable_origin = session.is_pinned || session.generated_by == GeneratedBy::Manual;
    if !deletable_status || !deletable_origin {
        return Err(DomainError::ForbiddenTransition(
            "only planned or skipped, pinned/manual sessions can be deleted".to_string(),
        )
        .into());
    }

    state.session_repo.delete(user_id, id).await?;
    Ok(axum::http::StatusCode::NO_CONTENT)
}

pub async fn start_session(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<StudySession>, ApiError> {
    Ok(Json(state.persistence.start_session(user_id, id).await?))
}

#[derive(Debug, Deserialize)]
pub struct MicroPlanRequest {
    pub total_minutes: i32,
    #[serde(default)]
    pub energy: Option<EnergyLevel>,
}

#[derive(Debug, Serialize)]
pub struct MicroPlanResponse {
    pub sessions: Vec<EphemeralSession>,
}

pub async fn micro_plan(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Json(req): Json<MicroPlanRequest>,
) -> Result<Json<MicroPlanResponse>, ApiError> {
    if req.total_minutes <= 0 {
        return Err(DomainError::Validation("total_minutes must be positive".to_string()).into());
    }

    let user = state
        .user_repo
        .get_by_id(user_id)
        .await?
        .ok_or_else(|| DomainError::NotFound("user not found".to_string()))?;

    let now = Utc::now();
    let tasks = state.task_repo.list_schedulable(user_id).await?;
    let subjects = state.subject_repo.list_for_user(user_id).await?;
    let subjects_by_id: HashMap<Uuid, _> = subjects.into_iter().map(|s| (s.id, s)).collect();
    let mut queue = weight_engine::rank_tasks(&tasks, &subjects_by_id, now, user.tz());

    let sessions = planner::micro_plan(&mut queue, now, req.total_minutes, req.energy, user.max_session_length);
    Ok(Json(MicroPlanResponse { sessions }))
}

pub async fn workload_analysis(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Vec<Warning>>, ApiError> {
    if let Some(cached) = state.workload_cache.get(user_id) {
        return Ok(Json(cached));
    }

    let user = state
        .user_repo
        .get_by_id(user_id)
        .await?
        .ok_or_else(|| DomainError::NotFound("user not found".to_string()))?;

    let now = Utc::now();
    let tasks = state.task_repo.list_schedulable(user_id).await?;
    let subjects = state.subject_repo.list_for_user(user_id).await?;
    let subjects_by_id: HashMap<Uuid, _> = subjects.into_iter().map(|s| (s.id, s)).collect();
    let constraints = state.constraint_repo.list_for_user(user_id).await?;

    let all_sessions = state.session_repo.list_all_for_user(user_id).await?;
    let completion_rate = workload_analyzer::clamp_completion_rate(
        workload_analyzer::historical_completion_rate(&all_sessions, now),
        state.config.default_completion_rate,
    );

    let warnings = workload_analyzer::analyze_pre_generation(
        user.weekly_study_hours,
        &user.preferred_study_windows,
        &constraints,
        &tasks,
        &subjects_by_id,
        completion_rate,
        now,
        user.tz(),
    );

    state.workload_cache.set(user_id, warnings.clone());
    Ok(Json(warnings))
}

pub async fn analyze(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Vec<Warning>>, ApiError> {
    let user = state
        .user_repo
        .get_by_id(user_id)
        .await?
        .ok_or_else(|| DomainError::NotFound("user not found".to_string()))?;

    let now = Utc::now();
    let today_local = ssc_backend_scheduler::timekit::local_date_of(now, user.tz());
    let window_start = ssc_backend_scheduler::timekit::local_midnight(now, user.tz());
    let window_end = window_start + chrono::Duration::days(7);
    let sessions = state.session_repo.list_range(user_id, window_start, window_end).await?;

    let days = (0..7)
        .map(|offset| planner::DailyPlan {
            day: window_start + chrono::Duration::days(offset),
            sessions: sessions
                .iter()
                .filter(|s| {
                    ssc_backend_scheduler::timekit::local_date_of(s.start_time, user.tz())
                        == today_local + chrono::Duration::days(offset)
                })
                .map(|s| planner::PlannedBlock {
                    start_time: s.start_time,
                    end_time: s.end_time,
                    subject_id: s.subject_id,
                    task_id: s.task_id,
                    focus: String::new(),
                    energy_level: s.energy_level,
                    generated_by: s.generated_by,
                })
                .collect(),
        })
        .collect();

    let plan = planner::WeeklyPlan { user_id, generated_at: now, days, optimization_explanation: None };
    let tasks = state.task_repo.list_for_user(user_id).await?;
    Ok(Json(workload_analyzer::analyze_post_generation(&plan, &tasks, user.tz())))
}
