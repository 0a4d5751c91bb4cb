//! Daily self-reported energy level, which caps session length.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnergyLevel {
    Low,
    Medium,
    High,
}

impl EnergyLevel {
    /// Maximum single-session length this energy level permits, in minutes.
    pub fn session_cap_minutes(self) -> i32 {
        match self {
            EnergyLevel::Low => 45,
            EnergyLevel::Medium => 90,
            EnergyLevel::High => 120,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyEnergy {
    pub id: Uuid,
    pub user_id: Uuid,
    pub local_date: NaiveDate,
    pub level: EnergyLevel,
}
