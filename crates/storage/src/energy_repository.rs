//! Daily self-reported energy level repository.

use chrono::NaiveDate;
use sqlx::PgPool;
use ssc_backend_domain::{DailyEnergy, EnergyLevel};
use uuid::Uuid;

use crate::StorageError;

#[derive(Debug, Clone, sqlx::FromRow)]
struct EnergyRow {
    id: Uuid,
    user_id: Uuid,
    local_date: NaiveDate,
    level: String,
}

fn parse_level(s: &str) -> EnergyLevel {
    match s {
        "low" => EnergyLevel::Low,
        "high" => EnergyLevel::High,
        _ => EnergyLevel::Medium,
    }
}

fn level_str(l: EnergyLevel) -> &'static str {
    match l {
        EnergyLevel::Low => "low",
        EnergyLevel::Medium => "medium",
        EnergyLevel::High => "high",
    }
}

impl From<EnergyRow> for DailyEnergy {
    fn from(row: EnergyRow) -> Self {
        DailyEnergy {
            id: row.id,
            user_id: row.user_id,
            local_date: row.local_date,
            level: parse_level(&row.level),
        }
    }
}

const ENERGY_COLUMNS: &str = "id, user_id, local_date, level";

#[derive(Clone)]
pub struct EnergyRepository {
    pool: PgPool,
}

impl EnergyRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get(&self, user_id: Uuid, local_date: NaiveDate) -> Result<Option<DailyEnergy>, StorageError> {
        let row = sqlx::query_as::<_, EnergyRow>(&format!(
            "SELECT {ENERGY_COLUMNS} FROM daily_energy WHERE user_id = $1 AND local_date = $2"
        ))
        .bind(user_id)
        .bind(local_date)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    pub async fn list_range(
        &self,
        user_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyEnergy>, StorageError> {
        let rows = sqlx::query_as::<_, EnergyRow>(&format!(
            "SELECT {ENERGY_COLUMNS} FROM daily_energy \
             WHERE user_id = $1 AND local_date >= $2 AND local_date <= $3 \
             ORDER BY local_date"
        ))
        .bind(user_id)
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Upserts the one allowed row per (user, local date).
    pub async fn set(
        &self,
        user_id: Uuid,
        local_date: NaiveDate,
        level: EnergyLevel,
    ) -> Result<DailyEnergy, StorageError> {
        let row = sqlx::query_as::<_, EnergyRow>(&format!(
            r#"
            INSERT INTO daily_energy (user_id, local_date, level)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, local_date) DO UPDATE SET level = EXCLUDED.level
            RETURNING {ENERGY_COLUMNS}
            "#
        ))
        .bind(user_id)
        .bind(local_date)
        .bind(level_str(level))
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }
}
