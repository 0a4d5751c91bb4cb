#![cfg(feature = "postgres-tests")]

use chrono::{Duration, Utc};
use sqlx::PgPool;

use ssc_backend_domain::{EnergyLevel, GeneratedBy, SessionStatus};
use ssc_backend_scheduler::planner::{DailyPlan, PlannedBlock, WeeklyPlan};
use ssc_backend_storage::{PersistenceProtocol, SessionRepository, UserRepository};

async fn seed_user(pool: &PgPool) -> uuid::Uuid {
    let repo = UserRepository::new(pool.clone());
    let user = repo
        .create("student@example.com", "hash", "Student", "UTC")
        .await
        .unwrap();
    user.id
}

#[sqlx::test(migrations = "../../migrations")]
async fn apply_weekly_plan_preserves_completed_and_pinned_sessions(pool: PgPool) -> Result<(), sqlx::Error> {
    let user_id = seed_user(&pool).await;
    let sessions = SessionRepository::new(pool.clone());
    let protocol = PersistenceProtocol::new(pool.clone());

    let now = Utc::now();
    let window_start = now - Duration::hours(2);

    let completed = sessions
        .create(
            user_id,
            window_start,
            window_start + Duration::minutes(30),
            None,
            None,
            Some(EnergyLevel::Medium),
            GeneratedBy::Weekly,
            false,
            None,
        )
        .await
        .map_err(|e| sqlx::Error::Protocol(e.to_string()))?;
    sessions
        .update_status(user_id, completed.id, SessionStatus::Completed)
        .await
        .map_err(|e| sqlx::Error::Protocol(e.to_string()))?;

    let stale_planned = sessions
        .create(
            user_id,
            window_start + Duration::hours(1),
            window_start + Duration::hours(1) + Duration::minutes(30),
            None,
            None,
            None,
            GeneratedBy::Weekly,
            false,
            None,
        )
        .await
        .map_err(|e| sqlx::Error::Protocol(e.to_string()))?;

    let plan = WeeklyPlan {
        user_id,
        generated_at: now,
        days: vec![DailyPlan {
            day: window_start - Duration::hours(1),
            sessions: vec![PlannedBlock {
                start_time: window_start + Duration::hours(3),
                end_time: window_start + Duration::hours(3) + Duration::minutes(45),
                subject_id: None,
                task_id: None,
                focus: "deep work".to_string(),
                energy_level: Some(EnergyLevel::High),
                generated_by: GeneratedBy::Weekly,
            }],
        }],
        optimization_explanation: None,
    };

    let result = protocol
        .apply_weekly_plan(user_id, &plan, now)
        .await
        .map_err(|e| sqlx::Error::Protocol(e.to_string()))?;

    assert!(result.iter().any(|s| s.id == completed.id));
    assert!(!result.iter().any(|s| s.id == stale_planned.id));
    assert!(result
        .iter()
        .any(|s| s.start_time == window_start + Duration::hours(3)));

    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn edit_session_time_rejects_completed_session(pool: PgPool) -> Result<(), sqlx::Error> {
    let user_id = seed_user(&pool).await;
    let sessions = SessionRepository::new(pool.clone());
    let protocol = PersistenceProtocol::new(pool.clone());
    let now = Utc::now();

    let session = sessions
        .create(user_id, now, now + Duration::minutes(30), None, None, None, GeneratedBy::Manual, true, None)
        .await
        .map_err(|e| sqlx::Error::Protocol(e.to_string()))?;
    sessions
        .update_status(user_id, session.id, SessionStatus::Completed)
        .await
        .map_err(|e| sqlx::Error::Protocol(e.to_string()))?;

    let result = protocol
        .edit_session_time(user_id, session.id, now, now + Duration::hours(1))
        .await;

    assert!(result.is_err());
    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn start_session_demotes_other_in_progress_sessions(pool: PgPool) -> Result<(), sqlx::Error> {
    let user_id = seed_user(&pool).await;
    let sessions = SessionRepository::new(pool.clone());
    let protocol = PersistenceProtocol::new(pool.clone());
    let now = Utc::now();

    let first = sessions
        .create(user_id, now, now + Duration::minutes(30), None, None, None, GeneratedBy::Manual, true, None)
        .await
        .map_err(|e| sqlx::Error::Protocol(e.to_string()))?;
    let second = sessions
        .create(
            user_id,
            now + Duration::hours(1),
            now + Duration::hours(1) + Duration::minutes(30),
            None,
            None,
            None,
            GeneratedBy::Manual,
            true,
            None,
        )
        .await
        .map_err(|e| sqlx::Error::Protocol(e.to_string()))?;

    protocol
        .start_session(user_id, first.id)
        .await
        .map_err(|e| sqlx::Error::Protocol(e.to_string()))?;
    protocol
        .start_session(user_id, second.id)
        .await
        .map_err(|e| sqlx::Error::Protocol(e.to_string()))?;

    let reloaded_first = sessions
        .get(user_id, first.id)
        .await
        .map_err(|e| sqlx::Error::Protocol(e.to_string()))?
        .unwrap();
    let reloaded_second = sessions
        .get(user_id, second.id)
        .await
        .map_err(|e| sqlx::Error::Protocol(e.to_string()))?
        .unwrap();

    assert_eq!(reloaded_first.status, SessionStatus::Partial);
    assert_eq!(reloaded_second.status, SessionStatus::InProgress);
    Ok(())
}
