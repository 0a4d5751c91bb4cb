//! Daily reflection repository.

use chrono::NaiveDate;
use sqlx::PgPool;
use ssc_backend_domain::{DailyReflection, ReflectionOrigin};
use uuid::Uuid;

use crate::StorageError;

#[derive(Debug, Clone, sqlx::FromRow)]
struct ReflectionRow {
    id: Uuid,
    user_id: Uuid,
    local_date: NaiveDate,
    origin: String,
    worked: Option<String>,
    challenging: Option<String>,
    summary: Option<String>,
}

fn parse_origin(s: &str) -> ReflectionOrigin {
    match s {
        "auto" => ReflectionOrigin::Auto,
        _ => ReflectionOrigin::User,
    }
}

fn origin_str(o: ReflectionOrigin) -> &'static str {
    match o {
        ReflectionOrigin::User => "user",
        ReflectionOrigin::Auto => "auto",
    }
}

impl From<ReflectionRow> for DailyReflection {
    fn from(row: ReflectionRow) -> Self {
        DailyReflection {
            id: row.id,
            user_id: row.user_id,
            local_date: row.local_date,
            origin: parse_origin(&row.origin),
            worked: row.worked,
            challenging: row.challenging,
            summary: row.summary,
        }
    }
}

const REFLECTION_COLUMNS: &str = "id, user_id, local_date, origin, worked, challenging, summary";

#[derive(Clone)]
pub struct ReflectionRepository {
    pool: PgPool,
}

impl ReflectionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get(&self, user_id: Uuid, local_date: NaiveDate) -> Result<Option<DailyReflection>, StorageError> {
        let row = sqlx::query_as::<_, ReflectionRow>(&format!(
            "SELECT {REFLECTION_COLUMNS} FROM daily_reflections WHERE user_id = $1 AND local_date = $2"
        ))
        .bind(user_id)
        .bind(local_date)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn upsert(
        &self,
        user_id: Uuid,
        local_date: NaiveDate,
        origin: ReflectionOrigin,
        worked: Option<&str>,
        challenging: Option<&str>,
        summary: Option<&str>,
    ) -> Result<DailyReflection, StorageError> {
        let row = sqlx::query_as::<_, ReflectionRow>(&format!(
            r#"
            INSERT INTO daily_reflections (user_id, local_date, origin, worked, challenging, summary)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (user_id, local_date) DO UPDATE SET
                origin = EXCLUDED.origin,
                worked = EXCLUDED.worked,
                challenging = EXCLUDED.challenging,
                summary = EXCLUDED.summary
            RETURNING {REFLECTION_COLUMNS}
            "#
        ))
        .bind(user_id)
        .bind(local_date)
        .bind(origin_str(origin))
        .bind(worked)
        .bind(challenging)
        .bind(summary)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }
}
