//! Study sessions: the unit the planner produces and the lifecycle that
//! carries them from PLANNED through to a terminal status.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::energy::EnergyLevel;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Planned,
    InProgress,
    Completed,
    Partial,
    Skipped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeneratedBy {
    Weekly,
    Micro,
    Manual,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudySession {
    pub id: Uuid,
    pub user_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: SessionStatus,
    pub subject_id: Option<Uuid>,
    pub task_id: Option<Uuid>,
    pub energy_level: Option<EnergyLevel>,
    pub generated_by: GeneratedBy,
    pub is_pinned: bool,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl StudySession {
    pub fn duration_minutes(&self) -> i64 {
        (self.end_time - self.start_time).num_minutes()
    }

    pub fn overlaps(&self, other: &StudySession) -> bool {
        self.start_time < other.end_time && other.start_time < self.end_time
    }

    pub fn overlaps_interval(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.start_time < end && start < self.end_time
    }

    pub fn is_active_or_preserved(&self) -> bool {
        matches!(
            self.status,
            SessionStatus::Completed | SessionStatus::Partial | SessionStatus::InProgress
        ) || self.is_pinned
    }
}

pub const MIN_SESSION_MINUTES: i64 = 5;
pub const MAX_SESSION_MINUTES: i64 = 480;

/// A session produced by a micro-plan call. Deliberately a distinct type
/// from `StudySession` rather than a persisted row with a sentinel id —
/// it only ever exists in a response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EphemeralSession {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub subject_id: Option<Uuid>,
    pub task_id: Option<Uuid>,
    pub energy_level: Option<EnergyLevel>,
}
