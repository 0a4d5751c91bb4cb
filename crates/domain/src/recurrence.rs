//! Recurrence pattern: the external wire shape is one flat JSON object
//! with a `frequency` discriminator and fields that are only meaningful
//! for some frequencies — matching what clients have always persisted.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    Daily,
    Weekly,
    Biweekly,
    Monthly,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurrencePattern {
    pub frequency: Frequency,
    #[serde(default = "default_interval")]
    pub interval: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub days_of_week: Option<Vec<u8>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weekdays_only: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day_of_month: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub week_of_month: Option<u8>,
    #[serde(default = "default_advance_days")]
    pub advance_days: u32,
}

fn default_interval() -> u32 {
    1
}

fn default_advance_days() -> u32 {
    3
}

#[derive(Debug, thiserror::Error)]
pub enum PatternError {
    #[error("weekly/biweekly patterns require a non-empty days_of_week")]
    MissingDaysOfWeek,
    #[error("monthly patterns require either day_of_month or (week_of_month + days_of_week)")]
    MissingMonthlyAnchor,
    #[error("interval must be >= 1")]
    InvalidInterval,
}

impl RecurrencePattern {
    pub fn validate(&self) -> Result<(), PatternError> {
        if self.interval == 0 {
            return Err(PatternError::InvalidInterval);
        }
        match self.frequency {
            Frequency::Weekly | Frequency::Biweekly => {
                if self.days_of_week.as_ref().is_none_or(|d| d.is_empty()) {
                    return Err(PatternError::MissingDaysOfWeek);
                }
            }
            Frequency::Monthly => {
                let has_day = self.day_of_month.is_some();
                let has_week_anchor = self.week_of_month.is_some()
                    && self.days_of_week.as_ref().is_some_and(|d| !d.is_empty());
                if !has_day && !has_week_anchor {
                    return Err(PatternError::MissingMonthlyAnchor);
                }
            }
            Frequency::Daily => {}
        }
        Ok(())
    }
}
