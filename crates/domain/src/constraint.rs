//! Fixed schedule constraints: classes, shifts, blocked windows.

use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintType {
    Class,
    Busy,
    Blocked,
    NoStudy,
}

/// Either a weekly-recurring constraint (`days_of_week` + local times) or a
/// one-off constraint (`start_datetime`/`end_datetime` in UTC). Exactly one
/// of the two shapes is populated, matching how the source schema models it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConstraint {
    pub id: Uuid,
    pub user_id: Uuid,
    pub label: String,
    pub constraint_type: ConstraintType,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub days_of_week: Option<Vec<u8>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<NaiveTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<NaiveTime>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_datetime: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_datetime: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
}

impl ScheduleConstraint {
    pub fn is_recurring(&self) -> bool {
        self.days_of_week.is_some()
    }
}
