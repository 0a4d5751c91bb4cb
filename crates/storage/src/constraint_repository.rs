//! Fixed schedule constraint repository.

use chrono::{DateTime, NaiveTime, Utc};
use sqlx::PgPool;
use ssc_backend_domain::{ConstraintType, ScheduleConstraint};
use uuid::Uuid;

use crate::StorageError;

#[derive(Debug, Clone, sqlx::FromRow)]
struct ConstraintRow {
    id: Uuid,
    user_id: Uuid,
    label: String,
    constraint_type: String,
    days_of_week: Option<Vec<i16>>,
    start_time: Option<NaiveTime>,
    end_time: Option<NaiveTime>,
    start_datetime: Option<DateTime<Utc>>,
    end_datetime: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

fn parse_constraint_type(s: &str) -> ConstraintType {
    match s {
        "busy" => ConstraintType::Busy,
        "blocked" => ConstraintType::Blocked,
        "no_study" => ConstraintType::NoStudy,
        _ => ConstraintType::Class,
    }
}

fn constraint_type_str(t: ConstraintType) -> &'static str {
    match t {
        ConstraintType::Class => "class",
        ConstraintType::Busy => "busy",
        ConstraintType::Blocked => "blocked",
        ConstraintType::NoStudy => "no_study",
    }
}

impl From<ConstraintRow> for ScheduleConstraint {
    fn from(row: ConstraintRow) -> Self {
        ScheduleConstraint {
            id: row.id,
            user_id: row.user_id,
            label: row.label,
            constraint_type: parse_constraint_type(&row.constraint_type),
            days_of_week: row
                .days_of_week
                .map(|days| days.into_iter().map(|d| d as u8).collect()),
            start_time: row.start_time,
            end_time: row.end_time,
            start_datetime: row.start_datetime,
            end_datetime: row.end_datetime,
            created_at: row.created_at,
        }
    }
}

const CONSTRAINT_COLUMNS: &str = "id, user_id, label, constraint_type, days_of_week, start_time, \
     end_time, start_datetime, end_datetime, created_at";

#[derive(Clone)]
pub struct ConstraintRepository {
    pool: PgPool,
}

impl ConstraintRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<ScheduleConstraint>, StorageError> {
        let rows = sqlx::query_as::<_, ConstraintRow>(&format!(
            "SELECT {CONSTRAINT_COLUMNS} FROM schedule_constraints WHERE user_id = $1 ORDER BY created_at"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn create(
        &self,
        user_id: Uuid,
        label: &str,
        constraint_type: ConstraintType,
        days_of_week: Option<&[u8]>,
        start_time: Option<NaiveTime>,
        end_time: Option<NaiveTime>,
        start_datetime: Option<DateTime<Utc>>,
        end_datetime: Option<DateTime<Utc>>,
    ) -> Result<ScheduleConstraint, StorageError> {
        let days: Option<Vec<i16>> = days_of_week.map(|d| d.iter().map(|&x| x as i16).collect());
        let row = sqlx::query_as::<_, ConstraintRow>(&format!(
            r#"
            INSERT INTO schedule_constraints (
                user_id, label, constraint_type, days_of_week, start_time, end_time,
                start_datetime, end_datetime
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {CONSTRAINT_COLUMNS}
            "#
        ))
        .bind(user_id)
        .bind(label)
        .bind(constraint_type_str(constraint_type))
        .bind(days)
        .bind(start_time)
        .bind(end_time)
        .bind(start_datetime)
        .bind(end_datetime)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    pub async fn delete(&self, user_id: Uuid, id: Uuid) -> Result<(), StorageError> {
        let result = sqlx::query("DELETE FROM schedule_constraints WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }
}
