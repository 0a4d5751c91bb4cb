//! iCalendar feed: a public token-gated endpoint for calendar apps plus
//! an authenticated download and token management.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use ssc_backend_domain::DomainError;

use crate::error::ApiError;
use crate::middleware::auth::AuthUser;
use crate::AppState;

fn ics_response(body: String) -> Response {
    (
        [
            (header::CONTENT_TYPE, "text/calendar; charset=utf-8"),
            (header::CONTENT_DISPOSITION, "attachment; filename=\"schedule.ics\""),
        ],
        body,
    )
        .into_response()
}

#[derive(Debug, Deserialize)]
pub struct FeedQuery {
    pub token: String,
}

/// Unauthenticated: the token itself is the credential, matching how
/// calendar clients (Google Calendar, Apple Calendar) poll ICS feeds.
pub async fn feed(
    State(state): State<Arc<AppState>>,
    Query(query): Query<FeedQuery>,
) -> Result<Response, ApiError> {
    let user = state
        .user_repo
        .get_by_calendar_token(&query.token)
        .await?
        .ok_or_else(|| DomainError::NotFound("no calendar feed for this token".to_string()))?;

    let now = chrono::Utc::now();
    let sessions = state.session_repo.list_all_for_user(user.id).await?;
    let windowed = ssc_backend_scheduler::calendar_exporter::sessions_in_export_window(&sessions, now);
    let constraints = state.constraint_repo.list_for_user(user.id).await?;

    let body = ssc_backend_scheduler::calendar_exporter::export_calendar(
        &windowed,
        &constraints,
        &user.timezone,
        user.tz(),
        now,
    );
    Ok(ics_response(body))
}

pub async fn download(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
) -> Result<Response, ApiError> {
    let user = state
        .user_repo
        .get_by_id(user_id)
        .await?
        .ok_or_else(|| DomainError::NotFound("user not found".to_string()))?;

    let now = chrono::Utc::now();
    let sessions = state.session_repo.list_all_for_user(user_id).await?;
    let windowed = ssc_backend_scheduler::calendar_exporter::sessions_in_export_window(&sessions, now);
    let constraints = state.constraint_repo.list_for_user(user_id).await?;

    let body = ssc_backend_scheduler::calendar_exporter::export_calendar(
        &windowed,
        &constraints,
        &user.timezone,
        user.tz(),
        now,
    );
    Ok(ics_response(body))
}

#[derive(Debug, Serialize)]
pub struct CalendarTokenResponse {
    pub token: Option<String>,
    pub feed_url: Option<String>,
}

fn feed_url(state: &AppState, token: &str) -> String {
    format!("{}/schedule/calendar/feed?token={}", state.config.base_url, token)
}

pub async fn get_token(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<CalendarTokenResponse>, ApiError> {
    let user = state
        .user_repo
        .get_by_id(user_id)
        .await?
        .ok_or_else(|| DomainError::NotFound("user not found".to_string()))?;

    let feed_url = user.calendar_token.as_deref().map(|t| feed_url(&state, t));
    Ok(Json(CalendarTokenResponse { token: user.calendar_token, feed_url }))
}

pub async fn rotate_token(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<CalendarTokenResponse>, ApiError> {
    let token = Uuid::new_v4().to_string();
    state.user_repo.rotate_calendar_token(user_id, &token).await?;
    tracing::info!(user_id = %user_id, "rotated calendar feed token");

    Ok(Json(CalendarTokenResponse {
        feed_url: Some(feed_url(&state, &token)),
        token: Some(token),
    }))
}

pub async fn delete_token(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
) -> Result<axum::http::StatusCode, ApiError> {
    state.user_repo.clear_calendar_token(user_id).await?;
    Ok(axum::http::StatusCode::NO_CONTENT)
}
