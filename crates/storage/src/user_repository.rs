//! User repository.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::types::Json;
use ssc_backend_domain::{StudyWindow, User};
use uuid::Uuid;

use crate::StorageError;

#[derive(Debug, Clone, sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    email: String,
    password_hash: String,
    display_name: String,
    timezone: String,
    weekly_study_hours: f64,
    preferred_study_windows: Json<Vec<StudyWindow>>,
    max_session_length: i32,
    break_duration: i32,
    calendar_token: Option<String>,
    plan_share_token: Option<String>,
    plan_share_token_expires_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            email: row.email,
            password_hash: row.password_hash,
            display_name: row.display_name,
            timezone: row.timezone,
            weekly_study_hours: row.weekly_study_hours,
            preferred_study_windows: row.preferred_study_windows.0,
            max_session_length: row.max_session_length,
            break_duration: row.break_duration,
            calendar_token: row.calendar_token,
            plan_share_token: row.plan_share_token,
            plan_share_token_expires_at: row.plan_share_token_expires_at,
            created_at: row.created_at,
        }
    }
}

const USER_COLUMNS: &str = "id, email, password_hash, display_name, timezone, weekly_study_hours, \
     preferred_study_windows, max_session_length, break_duration, calendar_token, \
     plan_share_token, plan_share_token_expires_at, created_at";

#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        email: &str,
        password_hash: &str,
        display_name: &str,
        timezone: &str,
    ) -> Result<User, StorageError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            INSERT INTO users (email, password_hash, display_name, timezone, preferred_study_windows)
            VALUES ($1, $2, $3, $4, '[]'::jsonb)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(email)
        .bind(password_hash)
        .bind(display_name)
        .bind(timezone)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<User>, StorageError> {
        let row = sqlx::query_as::<_, UserRow>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Into::into))
    }

    pub async fn get_by_email(&self, email: &str) -> Result<Option<User>, StorageError> {
        let row = sqlx::query_as::<_, UserRow>(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1"))
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Into::into))
    }

    pub async fn get_by_calendar_token(&self, token: &str) -> Result<Option<User>, StorageError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE calendar_token = $1"
        ))
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    pub async fn update_preferences(
        &self,
        id: Uuid,
        weekly_study_hours: f64,
        preferred_study_windows: &[StudyWindow],
        max_session_length: i32,
        break_duration: i32,
    ) -> Result<User, StorageError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            UPDATE users
            SET weekly_study_hours = $2,
                preferred_study_windows = $3,
                max_session_length = $4,
                break_duration = $5
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(weekly_study_hours)
        .bind(Json(preferred_study_windows.to_vec()))
        .bind(max_session_length)
        .bind(break_duration)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    /// Atomically (re)generate and return a fresh calendar token.
    pub async fn rotate_calendar_token(&self, id: Uuid, new_token: &str) -> Result<(), StorageError> {
        sqlx::query("UPDATE users SET calendar_token = $2 WHERE id = $1")
            .bind(id)
            .bind(new_token)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn clear_calendar_token(&self, id: Uuid) -> Result<(), StorageError> {
        sqlx::query("UPDATE users SET calendar_token = NULL WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
