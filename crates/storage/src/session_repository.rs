//! Study session repository. Sessions are the unit the planner produces;
//! `PersistenceProtocol` owns the transactional replace-set semantics, this
//! repository just exposes the row-level operations it composes.

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use ssc_backend_domain::{EnergyLevel, GeneratedBy, SessionStatus, StudySession};
use uuid::Uuid;

use crate::StorageError;

#[derive(Debug, Clone, sqlx::FromRow)]
struct SessionRow {
    id: Uuid,
    user_id: Uuid,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    status: String,
    subject_id: Option<Uuid>,
    task_id: Option<Uuid>,
    energy_level: Option<String>,
    generated_by: String,
    is_pinned: bool,
    notes: Option<String>,
    created_at: DateTime<Utc>,
}

fn parse_status(s: &str) -> SessionStatus {
    match s {
        "in_progress" => SessionStatus::InProgress,
        "completed" => SessionStatus::Completed,
        "partial" => SessionStatus::Partial,
        "skipped" => SessionStatus::Skipped,
        _ => SessionStatus::Planned,
    }
}

pub(crate) fn status_str(s: SessionStatus) -> &'static str {
    match s {
        SessionStatus::Planned => "planned",
        SessionStatus::InProgress => "in_progress",
        SessionStatus::Completed => "completed",
        SessionStatus::Partial => "partial",
        SessionStatus::Skipped => "skipped",
    }
}

fn parse_energy(s: &str) -> EnergyLevel {
    match s {
        "low" => EnergyLevel::Low,
        "high" => EnergyLevel::High,
        _ => EnergyLevel::Medium,
    }
}

fn energy_str(e: EnergyLevel) -> &'static str {
    match e {
        EnergyLevel::Low => "low",
        EnergyLevel::Medium => "medium",
        EnergyLevel::High => "high",
    }
}

fn parse_generated_by(s: &str) -> GeneratedBy {
    match s {
        "micro" => GeneratedBy::Micro,
        "manual" => GeneratedBy::Manual,
        _ => GeneratedBy::Weekly,
    }
}

pub(crate) fn generated_by_str(g: GeneratedBy) -> &'static str {
    match g {
        GeneratedBy::Weekly => "weekly",
        GeneratedBy::Micro => "micro",
        GeneratedBy::Manual => "manual",
    }
}

impl From<SessionRow> for StudySession {
    fn from(row: SessionRow) -> Self {
        StudySession {
            id: row.id,
            user_id: row.user_id,
            start_time: row.start_time,
            end_time: row.end_time,
            status: parse_status(&row.status),
            subject_id: row.subject_id,
            task_id: row.task_id,
            energy_level: row.energy_level.as_deref().map(parse_energy),
            generated_by: parse_generated_by(&row.generated_by),
            is_pinned: row.is_pinned,
            notes: row.notes,
            created_at: row.created_at,
        }
    }
}

pub(crate) const SESSION_COLUMNS: &str = "id, user_id, start_time, end_time, status, subject_id, \
     task_id, energy_level, generated_by, is_pinned, notes, created_at";

#[derive(Clone)]
pub struct SessionRepository {
    pool: PgPool,
}

impl SessionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list_range(
        &self,
        user_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<StudySession>, StorageError> {
        let rows = sqlx::query_as::<_, SessionRow>(&format!(
            "SELECT {SESSION_COLUMNS} FROM study_sessions \
             WHERE user_id = $1 AND start_time < $3 AND end_time > $2 \
             ORDER BY start_time"
        ))
        .bind(user_id)
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    pub async fn list_all_for_user(&self, user_id: Uuid) -> Result<Vec<StudySession>, StorageError> {
        let rows = sqlx::query_as::<_, SessionRow>(&format!(
            "SELECT {SESSION_COLUMNS} FROM study_sessions WHERE user_id = $1 ORDER BY start_time"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Sum of durations of all COMPLETED|PARTIAL sessions referencing
    /// `task_id`. This, not the task's own `timer_minutes_spent`, is the
    /// source of truth for `actual_minutes_spent`.
    pub async fn sum_completed_or_partial_minutes_for_task(
        &self,
        user_id: Uuid,
        task_id: Uuid,
    ) -> Result<i32, StorageError> {
        let row: (Option<i64>,) = sqlx::query_as(
            "SELECT COALESCE(SUM(EXTRACT(EPOCH FROM (end_time - start_time)) / 60), 0)::BIGINT \
             FROM study_sessions \
             WHERE user_id = $1 AND task_id = $2 AND status IN ($3, $4)",
        )
        .bind(user_id)
        .bind(task_id)
        .bind(status_str(SessionStatus::Completed))
        .bind(status_str(SessionStatus::Partial))
        .fetch_one(&self.pool)
        .await?;
        Ok(row.0.unwrap_or(0) as i32)
    }

    pub async fn get(&self, user_id: Uuid, id: Uuid) -> Result<Option<StudySession>, StorageError> {
        let row = sqlx::query_as::<_, SessionRow>(&format!(
            "SELECT {SESSION_COLUMNS} FROM study_sessions WHERE id = $1 AND user_id = $2"
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
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        subject_id: Option<Uuid>,
        task_id: Option<Uuid>,
        energy_level: Option<EnergyLevel>,
        generated_by: GeneratedBy,
        is_pinned: bool,
        notes: Option<&str>,
    ) -> Result<StudySession, StorageError> {
        let row = sqlx::query_as::<_, SessionRow>(&format!(
            r#"
            INSERT INTO study_sessions (
                user_id, start_time, end_time, subject_id, task_id, energy_level,
                generated_by, is_pinned, notes
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {SESSION_COLUMNS}
            "#
        ))
        .bind(user_id)
        .bind(start_time)
        .bind(end_time)
        .bind(subject_id)
        .bind(task_id)
        .bind(energy_level.map(energy_str))
        .bind(generated_by_str(generated_by))
        .bind(is_pinned)
        .bind(notes)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    pub async fn update_status(
        &self,
        user_id: Uuid,
        id: Uuid,
        status: SessionStatus,
    ) -> Result<StudySession, StorageError> {
        let row = sqlx::query_as::<_, SessionRow>(&format!(
            r#"
            UPDATE study_sessions SET status = $3 WHERE id = $1 AND user_id = $2
            RETURNING {SESSION_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(user_id)
        .bind(status_str(status))
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    pub async fn delete(&self, user_id: Uuid, id: Uuid) -> Result<(), StorageError> {
        let result = sqlx::query("DELETE FROM study_sessions WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    /// Sessions from a prior generation that are still `planned` or
    /// `in_progress` and not pinned — these are safe to discard wholesale
    /// before inserting a freshly generated week, per the replace-set
    /// protocol. Scoped to the transaction so the delete and subsequent
    /// inserts are atomic with the caller's other writes.
    pub async fn delete_stale_in_tx(
        tx: &mut Transaction<'_, Postgres>,
        user_id: Uuid,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        sqlx::query(
            "DELETE FROM study_sessions \
             WHERE user_id = $1 AND start_time >= $2 AND start_time < $3 \
             AND status = 'planned' AND is_pinned = false",
        )
        .bind(user_id)
        .bind(window_start)
        .bind(window_end)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    /// Sessions preserved across a regeneration: completed, partial,
    /// in-progress, or explicitly pinned.
    pub async fn list_preserved_in_window(
        tx: &mut Transaction<'_, Postgres>,
        user_id: Uuid,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> Result<Vec<StudySession>, StorageError> {
        let rows = sqlx::query_as::<_, SessionRow>(&format!(
            "SELECT {SESSION_COLUMNS} FROM study_sessions \
             WHERE user_id = $1 AND start_time >= $2 AND start_time < $3 \
             AND (status IN ('completed', 'partial', 'in_progress') OR is_pinned = true) \
             ORDER BY start_time"
        ))
        .bind(user_id)
        .bind(window_start)
        .bind(window_end)
        .fetch_all(&mut **tx)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn insert_in_tx(
        tx: &mut Transaction<'_, Postgres>,
        user_id: Uuid,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        subject_id: Option<Uuid>,
        task_id: Option<Uuid>,
        energy_level: Option<EnergyLevel>,
        generated_by: GeneratedBy,
    ) -> Result<(), StorageError> {
        sqlx::query(
            "INSERT INTO study_sessions (
                user_id, start_time, end_time, subject_id, task_id, energy_level, generated_by
            ) VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(user_id)
        .bind(start_time)
        .bind(end_time)
        .bind(subject_id)
        .bind(task_id)
        .bind(energy_level.map(energy_str))
        .bind(generated_by_str(generated_by))
        .execute(&mut **tx)
        .await?;
        Ok(())
    }
}
