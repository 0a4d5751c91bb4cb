//! Smart Study Companion backend server library.

pub mod cache;
pub mod error;
pub mod handlers;
pub mod middleware;

use std::sync::Arc;
use std::time::Instant;

use axum::{
    Json, Router,
    extract::State,
    routing::{delete, get, patch, post},
};
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use ssc_backend_config::AppConfig;
use ssc_backend_domain::{HealthResponse, ReadyResponse};
use ssc_backend_scheduler::coach_adapter::{CoachAdapter, NoopCoachAdapter};
use ssc_backend_storage::{
    check_connection, ConstraintRepository, EnergyRepository, PersistenceProtocol,
    ReflectionRepository, SessionRepository, SubjectRepository, TaskRepository, UserRepository,
};
use sqlx::PgPool;

use crate::cache::workload_cache::WorkloadCache;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: AppConfig,
    pub user_repo: UserRepository,
    pub subject_repo: SubjectRepository,
    pub task_repo: TaskRepository,
    pub constraint_repo: ConstraintRepository,
    pub energy_repo: EnergyRepository,
    pub reflection_repo: ReflectionRepository,
    pub session_repo: SessionRepository,
    pub persistence: PersistenceProtocol,
    pub workload_cache: WorkloadCache,
    pub coach_adapter: Arc<dyn CoachAdapter>,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(pool: PgPool, config: AppConfig) -> Self {
        Self {
            user_repo: UserRepository::new(pool.clone()),
            subject_repo: SubjectRepository::new(pool.clone()),
            task_repo: TaskRepository::new(pool.clone()),
            constraint_repo: ConstraintRepository::new(pool.clone()),
            energy_repo: EnergyRepository::new(pool.clone()),
            reflection_repo: ReflectionRepository::new(pool.clone()),
            session_repo: SessionRepository::new(pool.clone()),
            persistence: PersistenceProtocol::new(pool.clone()),
            workload_cache: WorkloadCache::new(),
            coach_adapter: Arc::new(NoopCoachAdapter),
            pool,
            config,
            start_time: Instant::now(),
        }
    }
}

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/v1/health", get(health))
        .route("/v1/ready", get(ready))
        .route("/v1/auth/register", post(handlers::auth::register))
        .route("/v1/auth/login", post(handlers::auth::login))
        .route("/v1/users/me", get(handlers::auth::get_me))
        .route(
            "/v1/subjects",
            get(handlers::subjects::list_subjects).post(handlers::subjects::create_subject),
        )
        .route(
            "/v1/subjects/{id}",
            get(handlers::subjects::get_subject).delete(handlers::subjects::delete_subject),
        )
        .route(
            "/v1/tasks",
            get(handlers::tasks::list_tasks).post(handlers::tasks::create_task),
        )
        .route(
            "/v1/tasks/{id}",
            get(handlers::tasks::get_task).delete(handlers::tasks::delete_task),
        )
        .route(
            "/v1/tasks/{id}/progress",
            patch(handlers::tasks::update_task_progress),
        )
        .route(
            "/v1/tasks/{id}/recurrence",
            patch(handlers::tasks::update_recurrence_pattern).delete(handlers::tasks::remove_recurrence),
        )
        .route(
            "/v1/tasks/{id}/recurrence/expand",
            post(handlers::tasks::expand_recurrence),
        )
        .route(
            "/v1/constraints",
            get(handlers::constraints::list_constraints).post(handlers::constraints::create_constraint),
        )
        .route(
            "/v1/constraints/{id}",
            delete(handlers::constraints::delete_constraint),
        )
        .route(
            "/v1/energy",
            get(handlers::energy::list_energy).post(handlers::energy::set_energy),
        )
        .route("/v1/schedule/generate", post(handlers::schedule::generate))
        .route(
            "/v1/schedule/sessions",
            get(handlers::schedule::list_sessions).post(handlers::schedule::create_session),
        )
        .route(
            "/v1/schedule/sessions/{id}",
            patch(handlers::schedule::patch_session).delete(handlers::schedule::delete_session),
        )
        .route(
            "/v1/schedule/sessions/{id}/start",
            post(handlers::schedule::start_session),
        )
        .route("/v1/schedule/micro", post(handlers::schedule::micro_plan))
        .route(
            "/v1/schedule/workload-analysis",
            get(handlers::schedule::workload_analysis),
        )
        .route("/v1/schedule/analyze", post(handlers::schedule::analyze))
        .route("/v1/schedule/calendar/feed", get(handlers::calendar::feed))
        .route(
            "/v1/schedule/calendar/download",
            get(handlers::calendar::download),
        )
        .route(
            "/v1/schedule/calendar/token",
            get(handlers::calendar::get_token)
                .post(handlers::calendar::rotate_token)
                .delete(handlers::calendar::delete_token),
        )
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Health check endpoint.
async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let uptime = state.start_time.elapsed().as_secs();

    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        build_sha: option_env!("BUILD_SHA").unwrap_or("dev").to_string(),
        uptime_seconds: uptime,
    })
}

/// Readiness check endpoint.
async fn ready(State(state): State<Arc<AppState>>) -> Json<ReadyResponse> {
    let db_status = match check_connection(&state.pool).await {
        Ok(()) => "connected",
        Err(_) => "disconnected",
    };

    Json(ReadyResponse {
        status: if db_status == "connected" { "ok" } else { "degraded" }.to_string(),
        database: db_status.to_string(),
    })
}
