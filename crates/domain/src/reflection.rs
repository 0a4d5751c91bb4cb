//! Daily reflections, one per (user, local date). Distinguished from the
//! source's nullness-based convention by an explicit `origin` enum, per
//! the recommended rewrite.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReflectionOrigin {
    User,
    Auto,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyReflection {
    pub id: Uuid,
    pub user_id: Uuid,
    pub local_date: NaiveDate,
    pub origin: ReflectionOrigin,
    pub worked: Option<String>,
    pub challenging: Option<String>,
    pub summary: Option<String>,
}
