//! Serializes sessions and constraints as RFC 5545 iCalendar content.

use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use ssc_backend_domain::{ConstraintType, ScheduleConstraint, SessionStatus, StudySession};

use crate::timekit;

const PRODID: &str = "-//Smart Study Companion//Scheduler//EN";
const UID_DOMAIN: &str = "ssc.internal";

fn fmt_utc(dt: DateTime<Utc>) -> String {
    dt.format("%Y%m%dT%H%M%SZ").to_string()
}

fn escape_text(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace(';', "\\;")
        .replace(',', "\\,")
        .replace('\n', "\\n")
}

fn session_status(status: SessionStatus) -> &'static str {
    match status {
        SessionStatus::Planned => "TENTATIVE",
        SessionStatus::InProgress | SessionStatus::Completed | SessionStatus::Partial => "CONFIRMED",
        SessionStatus::Skipped => "CANCELLED",
    }
}

fn weekday_byday(idx: u8) -> &'static str {
    match idx {
        0 => "MO",
        1 => "TU",
        2 => "WE",
        3 => "TH",
        4 => "FR",
        5 => "SA",
        _ => "SU",
    }
}

fn session_event(session: &StudySession, stamp: DateTime<Utc>) -> String {
    let mut lines = vec![
        "BEGIN:VEVENT".to_string(),
        format!("UID:ssc-session-{}@{}", session.id, UID_DOMAIN),
        format!("DTSTAMP:{}", fmt_utc(stamp)),
        format!("DTSTART:{}", fmt_utc(session.start_time)),
        format!("DTEND:{}", fmt_utc(session.end_time)),
        format!("STATUS:{}", session_status(session.status)),
        "SUMMARY:Study session".to_string(),
    ];
    if let Some(notes) = &session.notes {
        lines.push(format!("DESCRIPTION:{}", escape_text(notes)));
    }
    lines.push("END:VEVENT".to_string());
    lines.join("\r\n")
}

fn constraint_event(constraint: &ScheduleConstraint, tz: Tz, reference: DateTime<Utc>, stamp: DateTime<Utc>) -> Option<String> {
    let mut lines = vec![
        "BEGIN:VEVENT".to_string(),
        format!("UID:ssc-constraint-{}@{}", constraint.id, UID_DOMAIN),
        format!("DTSTAMP:{}", fmt_utc(stamp)),
        format!("SUMMARY:{}", escape_text(&constraint_summary(constraint.constraint_type, &constraint.label))),
    ];

    if let Some(days) = &constraint.days_of_week {
        let (start_time, end_time) = (constraint.start_time?, constraint.end_time?);
        let today = timekit::local_date_of(reference, tz);
        let mut next_day = today;
        for _ in 0..8 {
            if days.contains(&timekit::weekday_index(next_day)) {
                break;
            }
            next_day += Duration::days(1);
        }
        let (start, end) = timekit::window_to_utc_range(next_day, start_time, end_time, tz);
        lines.push(format!("DTSTART:{}", fmt_utc(start)));
        lines.push(format!("DTEND:{}", fmt_utc(end)));
        let byday = days
            .iter()
            .map(|d| weekday_byday(*d))
            .collect::<Vec<_>>()
            .join(",");
        lines.push(format!("RRULE:FREQ=WEEKLY;BYDAY={byday}"));
    } else {
        lines.push(format!("DTSTART:{}", fmt_utc(constraint.start_datetime?)));
        lines.push(format!("DTEND:{}", fmt_utc(constraint.end_datetime?)));
    }

    lines.push("END:VEVENT".to_string());
    Some(lines.join("\r\n"))
}

fn constraint_summary(kind: ConstraintType, label: &str) -> String {
    let prefix = match kind {
        ConstraintType::Class => "Class",
        ConstraintType::Busy => "Busy",
        ConstraintType::Blocked => "Blocked",
        ConstraintType::NoStudy => "No study",
    };
    format!("{prefix}: {label}")
}

/// Build the full calendar document for `now`. `sessions` should already be
/// filtered by the caller to `[now-7d, now+28d]`; constraints are included
/// in full since recurring ones have no natural window.
pub fn export_calendar(
    sessions: &[StudySession],
    constraints: &[ScheduleConstraint],
    user_tz_name: &str,
    tz: Tz,
    now: DateTime<Utc>,
) -> String {
    let mut body = vec![
        "BEGIN:VCALENDAR".to_string(),
        "VERSION:2.0".to_string(),
        format!("PRODID:{PRODID}"),
        "CALSCALE:GREGORIAN".to_string(),
        format!("X-WR-TIMEZONE:{user_tz_name}"),
        "X-PUBLISHED-TTL:PT1H".to_string(),
    ];

    for session in sessions {
        body.push(session_event(session, now));
    }
    for constraint in constraints {
        if let Some(event) = constraint_event(constraint, tz, now, now) {
            body.push(event);
        }
    }

    body.push("END:VCALENDAR".to_string());
    body.join("\r\n") + "\r\n"
}

/// Select the sessions within the calendar export window `[now-7d, now+28d]`.
pub fn sessions_in_export_window(sessions: &[StudySession], now: DateTime<Utc>) -> Vec<StudySession> {
    let start = now - Duration::days(7);
    let end = now + Duration::days(28);
    sessions
        .iter()
        .filter(|s| s.start_time >= start && s.start_time <= end)
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use ssc_backend_domain::GeneratedBy;
    use uuid::Uuid;

    #[test]
    fn produces_required_calendar_headers() {
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let ics = export_calendar(&[], &[], "Europe/Berlin", chrono_tz::Europe::Berlin, now);
        assert!(ics.starts_with("BEGIN:VCALENDAR"));
        assert!(ics.contains("PRODID:-//Smart Study Companion"));
        assert!(ics.contains("X-WR-TIMEZONE:Europe/Berlin"));
        assert!(ics.contains("X-PUBLISHED-TTL:PT1H"));
        assert!(ics.trim_end().ends_with("END:VCALENDAR"));
    }

    #[test]
    fn session_status_maps_to_ics_status() {
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let session = StudySession {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            start_time: now,
            end_time: now + Duration::minutes(30),
            status: SessionStatus::Skipped,
            subject_id: None,
            task_id: None,
            energy_level: None,
            generated_by: GeneratedBy::Weekly,
            is_pinned: false,
            notes: None,
            created_at: now,
        };
        let ics = export_calendar(&[session], &[], "UTC", Tz::UTC, now);
        assert!(ics.contains("STATUS:CANCELLED"));
    }
}
