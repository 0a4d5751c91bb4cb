//! User entity and its configuration.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::time_window::StudyWindow;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub display_name: String,
    /// IANA timezone name, e.g. "Europe/Berlin".
    pub timezone: String,
    pub weekly_study_hours: f64,
    pub preferred_study_windows: Vec<StudyWindow>,
    pub max_session_length: i32,
    pub break_duration: i32,
    pub calendar_token: Option<String>,
    pub plan_share_token: Option<String>,
    pub plan_share_token_expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Parse the configured IANA timezone, falling back to UTC on garbage data
    /// that predates stricter validation.
    pub fn tz(&self) -> chrono_tz::Tz {
        self.timezone.parse().unwrap_or(chrono_tz::UTC)
    }
}
