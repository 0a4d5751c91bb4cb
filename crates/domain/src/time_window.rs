//! Study-window types: named presets, custom ranges, and the legacy
//! permissive parser for bare-string presets persisted by older clients.

use chrono::NaiveTime;
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};

/// A named study-window preset with a fixed local wall-clock range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowPreset {
    Morning,
    Afternoon,
    Evening,
    Night,
}

impl WindowPreset {
    /// The local wall-clock range this preset denotes.
    pub fn range(self) -> (NaiveTime, NaiveTime) {
        match self {
            WindowPreset::Morning => (hm(7, 0), hm(11, 0)),
            WindowPreset::Afternoon => (hm(12, 0), hm(16, 30)),
            WindowPreset::Evening => (hm(17, 0), hm(21, 0)),
            WindowPreset::Night => (hm(21, 0), hm(23, 0)),
        }
    }

    fn from_str(s: &str) -> Option<Self> {
        match s {
            "morning" => Some(WindowPreset::Morning),
            "afternoon" => Some(WindowPreset::Afternoon),
            "evening" => Some(WindowPreset::Evening),
            "night" => Some(WindowPreset::Night),
            _ => None,
        }
    }
}

fn hm(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).expect("static time constant")
}

/// A study window: either a named preset or a custom HH:MM-HH:MM range.
///
/// Deserialization also accepts the legacy bare-string form (`"morning"`)
/// that older clients persisted directly instead of the tagged object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum StudyWindow {
    Preset(WindowPreset),
    Custom { start: NaiveTime, end: NaiveTime },
}

impl StudyWindow {
    pub fn range(&self) -> (NaiveTime, NaiveTime) {
        match self {
            StudyWindow::Preset(p) => p.range(),
            StudyWindow::Custom { start, end } => (*start, *end),
        }
    }
}

impl<'de> Deserialize<'de> for StudyWindow {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Legacy(String),
            Custom {
                #[serde(rename = "type")]
                kind: String,
                value: CustomValue,
            },
            Preset {
                #[serde(rename = "type")]
                kind: String,
                value: String,
            },
        }

        #[derive(Deserialize)]
        struct CustomValue {
            start: String,
            end: String,
        }

        match Repr::deserialize(deserializer)? {
            Repr::Legacy(s) => WindowPreset::from_str(&s)
                .map(StudyWindow::Preset)
                .ok_or_else(|| de::Error::custom(format!("unknown study window preset: {s}"))),
            Repr::Preset { kind, value } if kind == "preset" => WindowPreset::from_str(&value)
                .map(StudyWindow::Preset)
                .ok_or_else(|| de::Error::custom(format!("unknown study window preset: {value}"))),
            Repr::Preset { kind, .. } => {
                Err(de::Error::custom(format!("unknown study window type: {kind}")))
            }
            Repr::Custom { kind, value } if kind == "custom" => {
                let start = NaiveTime::parse_from_str(&value.start, "%H:%M")
                    .map_err(|e| de::Error::custom(format!("invalid start time: {e}")))?;
                let end = NaiveTime::parse_from_str(&value.end, "%H:%M")
                    .map_err(|e| de::Error::custom(format!("invalid end time: {e}")))?;
                Ok(StudyWindow::Custom { start, end })
            }
            Repr::Custom { kind, .. } => {
                Err(de::Error::custom(format!("unknown study window type: {kind}")))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_preset_and_custom() {
        for w in [
            StudyWindow::Preset(WindowPreset::Morning),
            StudyWindow::Custom {
                start: hm(6, 30),
                end: hm(9, 0),
            },
        ] {
            let json = serde_json::to_string(&w).unwrap();
            let back: StudyWindow = serde_json::from_str(&json).unwrap();
            assert_eq!(w, back);
        }
    }

    #[test]
    fn accepts_legacy_bare_string() {
        let w: StudyWindow = serde_json::from_str("\"evening\"").unwrap();
        assert_eq!(w, StudyWindow::Preset(WindowPreset::Evening));
    }
}
