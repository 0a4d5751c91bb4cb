//! PersistenceProtocol: the single-transaction replace-set algorithm that
//! turns a `WeeklyPlan` into durable sessions without ever destroying a
//! user's active or completed work, plus the manual session operations
//! that share its overlap rules.

use chrono::{DateTime, Duration, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use ssc_backend_domain::{GeneratedBy, SessionStatus, StudySession, Task};
use ssc_backend_scheduler::planner::WeeklyPlan;
use ssc_backend_scheduler::task_completion::{self, AutoCompletionOutcome};
use ssc_backend_scheduler::{recurrence_engine, timekit};
use uuid::Uuid;

use crate::session_repository::{self, SessionRepository};
use crate::task_repository::TaskRepository;
use crate::user_repository::UserRepository;
use crate::StorageError;

const IN_PROGRESS_STALE_AFTER: Duration = Duration::hours(2);
const PLANNED_STALE_AFTER: Duration = Duration::minutes(15);

pub struct PersistenceProtocol {
    pool: PgPool,
    sessions: SessionRepository,
    tasks: TaskRepository,
    users: UserRepository,
}

impl PersistenceProtocol {
    pub fn new(pool: PgPool) -> Self {
        Self {
            sessions: SessionRepository::new(pool.clone()),
            tasks: TaskRepository::new(pool.clone()),
            users: UserRepository::new(pool.clone()),
            pool,
        }
    }

    /// Runs the cleanup pass, preserve-set computation, delete-then-insert
    /// replacement, and commit, all in one transaction per §4.5. Returns
    /// the sessions that now exist in the plan's window (preserved plus
    /// newly inserted).
    pub async fn apply_weekly_plan(
        &self,
        user_id: Uuid,
        plan: &WeeklyPlan,
        now: DateTime<Utc>,
    ) -> Result<Vec<StudySession>, StorageError> {
        let Some(first_day) = plan.days.first() else {
            return Ok(Vec::new());
        };
        let Some(last_day) = plan.days.last() else {
            return Ok(Vec::new());
        };
        let window_start = first_day.day;
        let window_end = last_day.day + Duration::days(1);

        let mut tx = self.pool.begin().await.map_err(StorageError::Connection)?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ")
            .execute(&mut *tx)
            .await?;

        cleanup_stale_in_tx(&mut tx, user_id, now).await?;

        let preserved = SessionRepository::list_preserved_in_window(&mut tx, user_id, window_start, window_end).await?;

        SessionRepository::delete_stale_in_tx(&mut tx, user_id, window_start, window_end).await?;
        // delete_stale_in_tx only targets rows still in this tx's snapshot of
        // `planned`/unpinned; it must run inside the same transaction as the
        // preserve-set read above so the two observe a consistent state.

        for day in &plan.days {
            for block in &day.sessions {
                let overlaps_preserved = preserved
                    .iter()
                    .any(|p| p.overlaps_interval(block.start_time, block.end_time));
                if overlaps_preserved {
                    continue;
                }
                SessionRepository::insert_in_tx(
                    &mut tx,
                    user_id,
                    block.start_time,
                    block.end_time,
                    block.subject_id,
                    block.task_id,
                    block.energy_level,
                    block.generated_by,
                )
                .await?;
            }
        }

        tx.commit().await.map_err(StorageError::Connection)?;

        self.sessions.list_range(user_id, window_start, window_end).await
    }

    /// Manual session create: always allowed, pinned, `generated_by=manual`.
    /// Overlaps are deliberately not rejected — the caller's UI is expected
    /// to warn instead.
    #[allow(clippy::too_many_arguments)]
    pub async fn create_manual_session(
        &self,
        user_id: Uuid,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        subject_id: Option<Uuid>,
        task_id: Option<Uuid>,
        energy_level: Option<ssc_backend_domain::EnergyLevel>,
        notes: Option<&str>,
    ) -> Result<StudySession, StorageError> {
        validate_duration(start_time, end_time)?;
        self.sessions
            .create(
                user_id,
                start_time,
                end_time,
                subject_id,
                task_id,
                energy_level,
                GeneratedBy::Manual,
                true,
                notes,
            )
            .await
    }

    /// Manual session edit. COMPLETED sessions reject any time edit.
    /// A pure shortening (only the start moves later, or only the end moves
    /// earlier, never both) skips the overlap check since it cannot create
    /// a new overlap. Otherwise overlaps with non-completed sessions are a
    /// conflict.
    pub async fn edit_session_time(
        &self,
        user_id: Uuid,
        id: Uuid,
        new_start: DateTime<Utc>,
        new_end: DateTime<Utc>,
    ) -> Result<StudySession, StorageError> {
        let existing = self
            .sessions
            .get(user_id, id)
            .await?
            .ok_or(StorageError::NotFound)?;

        if existing.status == SessionStatus::Completed {
            return Err(StorageError::ForbiddenTransition(
                "cannot edit the time of a completed session".into(),
            ));
        }

        validate_duration(new_start, new_end)?;

        let is_pure_shortening = (new_start >= existing.start_time && new_end == existing.end_time)
            || (new_start == existing.start_time && new_end <= existing.end_time);

        if !is_pure_shortening {
            let siblings = self
                .sessions
                .list_range(user_id, new_start, new_end)
                .await?;
            let conflicts = siblings
                .iter()
                .any(|s| s.id != id && s.status != SessionStatus::Completed && s.overlaps_interval(new_start, new_end));
            if conflicts {
                return Err(StorageError::Conflict(
                    "edited session overlaps another non-completed session".into(),
                ));
            }
        }

        sqlx::query("UPDATE study_sessions SET start_time = $2, end_time = $3 WHERE id = $1")
            .bind(id)
            .bind(new_start)
            .bind(new_end)
            .execute(&self.pool)
            .await?;

        self.sessions.get(user_id, id).await?.ok_or(StorageError::NotFound)
    }

    /// Session start (focus-mode entry): demotes any other IN_PROGRESS
    /// session of this user to PARTIAL, then marks this one IN_PROGRESS.
    pub async fn start_session(&self, user_id: Uuid, id: Uuid) -> Result<StudySession, StorageError> {
        let mut tx = self.pool.begin().await.map_err(StorageError::Connection)?;
        sqlx::query(
            "UPDATE study_sessions SET status = 'partial' \
             WHERE user_id = $1 AND status = 'in_progress' AND id != $2",
        )
        .bind(user_id)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        let row = sqlx::query_as::<_, (Uuid,)>(
            "UPDATE study_sessions SET status = 'in_progress' WHERE id = $1 AND user_id = $2 RETURNING id",
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?;
        if row.is_none() {
            return Err(StorageError::NotFound);
        }
        tx.commit().await.map_err(StorageError::Connection)?;
        self.sessions.get(user_id, id).await?.ok_or(StorageError::NotFound)
    }

    /// Session status → task propagation (§4.5, §4.8): when a session
    /// moves to COMPLETED or PARTIAL and references a task, recompute that
    /// task's `actual_minutes_spent` from all (COMPLETED|PARTIAL) session
    /// durations for it, then apply auto-(un)completion.
    pub async fn set_session_status(
        &self,
        user_id: Uuid,
        id: Uuid,
        status: SessionStatus,
        now: DateTime<Utc>,
    ) -> Result<StudySession, StorageError> {
        let session = self.sessions.update_status(user_id, id, status).await?;

        if matches!(status, SessionStatus::Completed | SessionStatus::Partial) {
            if let Some(task_id) = session.task_id {
                self.propagate_to_task(user_id, task_id, now).await?;
            }
        }

        Ok(session)
    }

    async fn propagate_to_task(&self, user_id: Uuid, task_id: Uuid, now: DateTime<Utc>) -> Result<(), StorageError> {
        let Some(mut task) = self.tasks.get(user_id, task_id).await? else {
            return Ok(());
        };

        let total_minutes = self
            .sessions
            .sum_completed_or_partial_minutes_for_task(user_id, task_id)
            .await?;

        let outcome = task_completion::apply_session_propagation(&mut task, total_minutes, now);
        self.persist_task_and_roll(user_id, task, outcome).await?;
        Ok(())
    }

    /// Applies a direct progress edit (timer minutes, subtasks, status) to a
    /// task. `actual_minutes_spent` is always recomputed from the task's
    /// COMPLETED|PARTIAL sessions rather than taken from the caller, then
    /// auto-(un)completion and recurrence rollover apply exactly as they do
    /// on the session-status path.
    pub async fn update_task_progress(
        &self,
        user_id: Uuid,
        task_id: Uuid,
        timer_minutes_spent: Option<i32>,
        subtasks: Option<Vec<ssc_backend_domain::Subtask>>,
        status: Option<ssc_backend_domain::TaskStatus>,
        now: DateTime<Utc>,
    ) -> Result<Task, StorageError> {
        let mut task = self.tasks.get(user_id, task_id).await?.ok_or(StorageError::NotFound)?;

        if let Some(minutes) = timer_minutes_spent {
            task.timer_minutes_spent = minutes;
        }
        if let Some(subtasks) = subtasks {
            task.subtasks = subtasks;
        }
        if let Some(status) = status {
            task.status = status;
        }

        let total_minutes = self
            .sessions
            .sum_completed_or_partial_minutes_for_task(user_id, task_id)
            .await?;
        let outcome = task_completion::apply_session_propagation(&mut task, total_minutes, now);

        self.persist_task_and_roll(user_id, task, outcome).await
    }

    async fn persist_task_and_roll(
        &self,
        user_id: Uuid,
        task: Task,
        outcome: AutoCompletionOutcome,
    ) -> Result<Task, StorageError> {
        let updated = self
            .tasks
            .update_progress(
                user_id,
                task.id,
                task.actual_minutes_spent,
                task.timer_minutes_spent,
                &task.subtasks,
                task.is_completed,
                task.completed_at,
                task.status,
            )
            .await?;

        if outcome == AutoCompletionOutcome::Completed {
            if let Some(template_id) = task.recurring_template_id {
                self.roll_recurring_instance(user_id, template_id, &task).await?;
            }
        }

        Ok(updated)
    }

    /// An instance of a recurring template just auto-completed. Advances the
    /// template's `next_occurrence_date` and creates the next instance, per
    /// §4.8. Idempotent: if an instance for the computed date already
    /// exists, nothing is created.
    async fn roll_recurring_instance(
        &self,
        user_id: Uuid,
        template_id: Uuid,
        instance: &Task,
    ) -> Result<(), StorageError> {
        let Some(template) = self.tasks.get(user_id, template_id).await? else {
            return Ok(());
        };
        let Some(pattern) = &template.recurrence_pattern else {
            return Ok(());
        };
        let tz = self
            .users
            .get_by_id(user_id)
            .await?
            .map(|u| u.tz())
            .unwrap_or(chrono_tz::UTC);

        let instance_date = instance
            .deadline
            .map(|d| timekit::local_date_of(d, tz))
            .unwrap_or_else(|| timekit::local_date_of(Utc::now(), tz));

        let Some(next_date) =
            recurrence_engine::on_instance_completion(pattern, instance_date, template.recurrence_end_date)
        else {
            self.tasks.update_next_occurrence_date(template_id, None).await?;
            return Ok(());
        };

        self.tasks
            .update_next_occurrence_date(template_id, Some(next_date))
            .await?;

        let existing = self.tasks.list_instances_of_template(template_id).await?;
        let already_exists = existing
            .iter()
            .any(|i| i.deadline.map(|d| timekit::local_date_of(d, tz)) == Some(next_date));
        if already_exists {
            return Ok(());
        }

        self.tasks.create_instance(&template, end_of_local_day(next_date, tz)).await?;
        Ok(())
    }

    pub async fn list_recurring_templates(&self, user_id: Uuid) -> Result<Vec<Task>, StorageError> {
        self.tasks.list_recurring_templates(user_id).await
    }

    async fn user_tz(&self, user_id: Uuid) -> Result<chrono_tz::Tz, StorageError> {
        Ok(self.users.get_by_id(user_id).await?.map(|u| u.tz()).unwrap_or(chrono_tz::UTC))
    }

    /// Expands a template forward by four weeks, creating any missing
    /// instances and advancing `next_occurrence_date`.
    pub async fn expand_recurrence(
        &self,
        user_id: Uuid,
        template_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Vec<Task>, StorageError> {
        let template = self
            .tasks
            .get(user_id, template_id)
            .await?
            .ok_or(StorageError::NotFound)?;
        let Some(pattern) = template.recurrence_pattern.clone() else {
            return Err(StorageError::Validation("task is not a recurring template".into()));
        };
        let tz = self.user_tz(user_id).await?;
        let today = timekit::local_date_of(now, tz);
        let anchor = template.next_occurrence_date.unwrap_or(today);

        let existing = self.tasks.list_instances_of_template(template_id).await?;
        let existing_dates: Vec<chrono::NaiveDate> = existing
            .iter()
            .filter_map(|i| i.deadline.map(|d| timekit::local_date_of(d, tz)))
            .collect();

        let new_instances =
            recurrence_engine::expand(&pattern, anchor, template.recurrence_end_date, today, 4, &existing_dates, false);

        let mut created = Vec::new();
        for instance in &new_instances {
            let deadline = end_of_local_day(instance.local_date, tz);
            created.push(self.tasks.create_instance(&template, deadline).await?);
        }
        if let Some(last) = new_instances.last() {
            self.tasks
                .update_next_occurrence_date(template_id, Some(last.local_date))
                .await?;
        }
        Ok(created)
    }

    /// Removes a template's recurrence: future, uncompleted instances are
    /// deleted, past/completed ones are detached and kept as plain tasks,
    /// and the template itself is demoted to a plain task.
    pub async fn remove_recurrence(
        &self,
        user_id: Uuid,
        template_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        let template = self
            .tasks
            .get(user_id, template_id)
            .await?
            .ok_or(StorageError::NotFound)?;
        if template.recurrence_pattern.is_none() {
            return Err(StorageError::Validation("task is not a recurring template".into()));
        }
        let tz = self.user_tz(user_id).await?;
        let today = timekit::local_date_of(now, tz);

        let instances = self.tasks.list_instances_of_template(template_id).await?;
        let refs: Vec<recurrence_engine::InstanceRef> = instances
            .iter()
            .map(|t| recurrence_engine::InstanceRef {
                id: t.id,
                local_date: t.deadline.map(|d| timekit::local_date_of(d, tz)).unwrap_or(today),
                is_completed: t.is_completed,
            })
            .collect();

        let plan = recurrence_engine::remove_recurrence(&refs, today);
        self.tasks.delete_many(&plan.to_delete).await?;
        self.tasks.detach_from_template(&plan.to_detach).await?;
        self.tasks.clear_recurrence(template_id).await?;
        Ok(())
    }

    /// Applies a new recurrence pattern to a template: uncompleted, not-yet-
    /// started instances are reassigned new deadlines under the new
    /// pattern; instances that no longer fit before the new end date are
    /// deleted.
    pub async fn update_recurrence_pattern(
        &self,
        user_id: Uuid,
        template_id: Uuid,
        new_pattern: ssc_backend_domain::RecurrencePattern,
        new_recurrence_end_date: Option<chrono::NaiveDate>,
        now: DateTime<Utc>,
    ) -> Result<Task, StorageError> {
        let template = self
            .tasks
            .get(user_id, template_id)
            .await?
            .ok_or(StorageError::NotFound)?;
        if template.recurrence_pattern.is_none() {
            return Err(StorageError::Validation("task is not a recurring template".into()));
        }
        let tz = self.user_tz(user_id).await?;
        let today = timekit::local_date_of(now, tz);

        let instances = self.tasks.list_instances_of_template(template_id).await?;
        let reassignable: Vec<recurrence_engine::ReassignableInstance> = instances
            .iter()
            .filter(|t| {
                !t.is_completed
                    && t.status != ssc_backend_domain::TaskStatus::InProgress
                    && t.actual_minutes_spent == 0
            })
            .map(|t| recurrence_engine::ReassignableInstance {
                id: t.id,
                local_date: t.deadline.map(|d| timekit::local_date_of(d, tz)).unwrap_or(today),
            })
            .collect();

        let plan = recurrence_engine::update_pattern(&new_pattern, today, new_recurrence_end_date, &reassignable);
        for (id, new_date) in &plan.reassignments {
            self.tasks.update_deadline(*id, end_of_local_day(*new_date, tz)).await?;
        }
        self.tasks.delete_many(&plan.to_delete).await?;
        self.tasks
            .update_recurrence_pattern(template_id, &new_pattern, new_recurrence_end_date)
            .await?;

        self.tasks.get(user_id, template_id).await?.ok_or(StorageError::NotFound)
    }
}

fn end_of_local_day(date: chrono::NaiveDate, tz: chrono_tz::Tz) -> DateTime<Utc> {
    let eod = chrono::NaiveTime::from_hms_opt(23, 59, 0).expect("valid time");
    timekit::window_to_utc_range(date, eod, eod, tz).0
}

async fn cleanup_stale_in_tx(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
    now: DateTime<Utc>,
) -> Result<(), StorageError> {
    sqlx::query(
        "UPDATE study_sessions SET status = $2 \
         WHERE user_id = $1 AND status = $3 AND end_time < $4",
    )
    .bind(user_id)
    .bind(session_repository::status_str(SessionStatus::Partial))
    .bind(session_repository::status_str(SessionStatus::InProgress))
    .bind(now - IN_PROGRESS_STALE_AFTER)
    .execute(&mut **tx)
    .await?;

    sqlx::query(
        "UPDATE study_sessions SET status = $2 \
         WHERE user_id = $1 AND status = $3 AND end_time < $4",
    )
    .bind(user_id)
    .bind(session_repository::status_str(SessionStatus::Skipped))
    .bind(session_repository::status_str(SessionStatus::Planned))
    .bind(now - PLANNED_STALE_AFTER)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

fn validate_duration(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<(), StorageError> {
    if start >= end {
        return Err(StorageError::Validation("session start must be before end".into()));
    }
    let minutes = (end - start).num_minutes();
    if !(ssc_backend_domain::MIN_SESSION_MINUTES..=ssc_backend_domain::MAX_SESSION_MINUTES).contains(&minutes) {
        return Err(StorageError::Validation(format!(
            "session duration must be between {} and {} minutes",
            ssc_backend_domain::MIN_SESSION_MINUTES,
            ssc_backend_domain::MAX_SESSION_MINUTES
        )));
    }
    Ok(())
}
