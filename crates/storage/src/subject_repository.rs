//! Subject repository.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use ssc_backend_domain::{Difficulty, Subject, SubjectPriority};
use uuid::Uuid;

use crate::StorageError;

#[derive(Debug, Clone, sqlx::FromRow)]
struct SubjectRow {
    id: Uuid,
    user_id: Uuid,
    name: String,
    priority: String,
    difficulty: String,
    workload: f64,
    exam_date: Option<chrono::NaiveDate>,
    created_at: DateTime<Utc>,
}

fn parse_priority(s: &str) -> SubjectPriority {
    match s {
        "low" => SubjectPriority::Low,
        "high" => SubjectPriority::High,
        _ => SubjectPriority::Medium,
    }
}

fn priority_str(p: SubjectPriority) -> &'static str {
    match p {
        SubjectPriority::Low => "low",
        SubjectPriority::Medium => "medium",
        SubjectPriority::High => "high",
    }
}

fn parse_difficulty(s: &str) -> Difficulty {
    match s {
        "easy" => Difficulty::Easy,
        "hard" => Difficulty::Hard,
        _ => Difficulty::Medium,
    }
}

fn difficulty_str(d: Difficulty) -> &'static str {
    match d {
        Difficulty::Easy => "easy",
        Difficulty::Medium => "medium",
        Difficulty::Hard => "hard",
    }
}

impl From<SubjectRow> for Subject {
    fn from(row: SubjectRow) -> Self {
        Subject {
            id: row.id,
            user_id: row.user_id,
            name: row.name,
            priority: parse_priority(&row.priority),
            difficulty: parse_difficulty(&row.difficulty),
            workload: row.workload,
            exam_date: row.exam_date,
            created_at: row.created_at,
        }
    }
}

const SUBJECT_COLUMNS: &str = "id, user_id, name, priority, difficulty, workload, exam_date, created_at";

#[derive(Clone)]
pub struct SubjectRepository {
    pool: PgPool,
}

impl SubjectRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Subject>, StorageError> {
        let rows = sqlx::query_as::<_, SubjectRow>(&format!(
            "SELECT {SUBJECT_COLUMNS} FROM subjects WHERE user_id = $1 ORDER BY created_at"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    pub async fn get(&self, user_id: Uuid, id: Uuid) -> Result<Option<Subject>, StorageError> {
        let row = sqlx::query_as::<_, SubjectRow>(&format!(
            "SELECT {SUBJECT_COLUMNS} FROM subjects WHERE id = $1 AND user_id = $2"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    pub async fn create(
        &self,
        user_id: Uuid,
        name: &str,
        priority: SubjectPriority,
        difficulty: Difficulty,
        workload: f64,
        exam_date: Option<chrono::NaiveDate>,
    ) -> Result<Subject, StorageError> {
        let row = sqlx::query_as::<_, SubjectRow>(&format!(
            r#"
            INSERT INTO subjects (user_id, name, priority, difficulty, workload, exam_date)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {SUBJECT_COLUMNS}
            "#
        ))
        .bind(user_id)
        .bind(name)
        .bind(priority_str(priority))
        .bind(difficulty_str(difficulty))
        .bind(workload)
        .bind(exam_date)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    pub async fn delete(&self, user_id: Uuid, id: Uuid) -> Result<(), StorageError> {
        let result = sqlx::query("DELETE FROM subjects WHERE id = $1 AND user_id = $2")
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
