//! Workout log lifecycle.
//!
//! Creating a log is how a session gets marked as attempted. The
//! `(session_id, runner_id)` unique index is the correctness backstop for
//! the at-most-one-log invariant; the application-level check exists only
//! to produce a clean `DuplicateLog` error before hitting the index.

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::manager::SessionManager;
use super::types::{LogStatus, NewWorkoutLog, SessionStatus, WorkoutLog, WorkoutLogPatch};
use crate::error::CoreError;
use crate::storage::database::DatabaseError;
use crate::users::store::parse_timestamp;
use crate::users::{Actor, UserStore};

const LOG_COLUMNS: &str = "id, session_id, runner_id, status, actual_distance_km, \
     actual_duration_minutes, feeling, injuries_json, external_link, created_at, updated_at";

/// The ownership chain derived from a workout log: its runner and, via
/// session and plan, the responsible coach.
#[derive(Debug, Clone, Copy)]
pub struct LogChain {
    pub workout_log_id: Uuid,
    pub session_id: Uuid,
    pub plan_id: Uuid,
    pub runner_id: Uuid,
    pub coach_id: Uuid,
}

/// Resolve a workout log's ownership chain in a single join.
pub fn resolve_log_chain(conn: &Connection, workout_log_id: Uuid) -> Result<LogChain, CoreError> {
    let chain: Option<(String, String, String, String)> = conn
        .query_row(
            "SELECT l.session_id, s.plan_id, l.runner_id, p.coach_id
             FROM workout_logs l
             JOIN training_sessions s ON s.id = l.session_id
             JOIN training_plans p ON p.id = s.plan_id
             WHERE l.id = ?1",
            params![workout_log_id.to_string()],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
        )
        .optional()
        .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

    let (session_id, plan_id, runner_id, coach_id) =
        chain.ok_or_else(|| CoreError::not_found("workout log", workout_log_id))?;

    Ok(LogChain {
        workout_log_id,
        session_id: Uuid::parse_str(&session_id).unwrap_or_default(),
        plan_id: Uuid::parse_str(&plan_id).unwrap_or_default(),
        runner_id: Uuid::parse_str(&runner_id).unwrap_or_default(),
        coach_id: Uuid::parse_str(&coach_id).unwrap_or_default(),
    })
}

/// Manager for workout logs.
pub struct WorkoutLogManager<'a> {
    conn: &'a Connection,
}

impl<'a> WorkoutLogManager<'a> {
    /// Create a new workout log manager with a database connection.
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Create a workout log for a session.
    ///
    /// Fails with `NotFound` if the session or runner does not exist, with
    /// `Forbidden` unless the actor is the log's runner or an admin, and
    /// with `DuplicateLog` if a log already exists for the pair. On
    /// success, a completed/dnf log is reflected onto the owning session
    /// through the guarded transition; the session read path re-derives
    /// status from the log regardless, so this write is only a cache.
    pub fn create(&self, actor: Actor, new_log: &NewWorkoutLog) -> Result<WorkoutLog, CoreError> {
        if !actor.is_admin() && actor.user_id != new_log.runner_id {
            return Err(CoreError::Forbidden(
                "only the runner may log their own session".to_string(),
            ));
        }

        UserStore::new(self.conn).require(new_log.runner_id)?;
        let sessions = SessionManager::new(self.conn);
        let session = sessions.require(new_log.session_id)?;

        if session.runner_id != new_log.runner_id {
            return Err(CoreError::Forbidden(
                "the session belongs to a different runner".to_string(),
            ));
        }

        if self
            .get_for_session(new_log.session_id, new_log.runner_id)?
            .is_some()
        {
            return Err(CoreError::DuplicateLog {
                session_id: new_log.session_id,
                runner_id: new_log.runner_id,
            });
        }

        let now = Utc::now();
        let log = WorkoutLog {
            id: Uuid::new_v4(),
            session_id: new_log.session_id,
            runner_id: new_log.runner_id,
            status: new_log.status,
            actual_distance_km: new_log.actual_distance_km,
            actual_duration_minutes: new_log.actual_duration_minutes,
            feeling: new_log.feeling.clone(),
            injuries: new_log.injuries.clone(),
            external_link: new_log.external_link.clone(),
            created_at: now,
            updated_at: now,
        };

        let injuries_json = serde_json::to_string(&log.injuries)
            .map_err(|e| DatabaseError::SerializationError(e.to_string()))?;

        let result = self.conn.execute(
            "INSERT INTO workout_logs
             (id, session_id, runner_id, status, actual_distance_km,
              actual_duration_minutes, feeling, injuries_json, external_link,
              created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                log.id.to_string(),
                log.session_id.to_string(),
                log.runner_id.to_string(),
                log.status.as_str(),
                log.actual_distance_km,
                log.actual_duration_minutes,
                log.feeling,
                injuries_json,
                log.external_link,
                log.created_at.to_rfc3339(),
                log.updated_at.to_rfc3339(),
            ],
        );

        match result {
            Ok(_) => {}
            // Concurrent create lost the race to the unique index
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                return Err(CoreError::DuplicateLog {
                    session_id: new_log.session_id,
                    runner_id: new_log.runner_id,
                });
            }
            Err(e) => return Err(DatabaseError::QueryFailed(e.to_string()).into()),
        }

        // Sync the cached session status for log-driven outcomes
        if let Some(projected) = log.status.session_projection() {
            if session.status == SessionStatus::Scheduled {
                sessions.write_status(session.id, projected)?;
            }
        }

        Ok(log)
    }

    /// Get a workout log by ID.
    pub fn get(&self, id: Uuid) -> Result<Option<WorkoutLog>, CoreError> {
        self.conn
            .query_row(
                &format!("SELECT {LOG_COLUMNS} FROM workout_logs WHERE id = ?1"),
                params![id.to_string()],
                parse_log_row,
            )
            .optional()
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()).into())
    }

    /// Get the log for a (session, runner) pair, if any.
    pub fn get_for_session(
        &self,
        session_id: Uuid,
        runner_id: Uuid,
    ) -> Result<Option<WorkoutLog>, CoreError> {
        self.conn
            .query_row(
                &format!(
                    "SELECT {LOG_COLUMNS} FROM workout_logs
                     WHERE session_id = ?1 AND runner_id = ?2"
                ),
                params![session_id.to_string(), runner_id.to_string()],
                parse_log_row,
            )
            .optional()
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()).into())
    }

    /// Update a workout log's metrics fields and re-stamp `updated_at`.
    ///
    /// The session and runner references are immutable; they are not part
    /// of the patch type at all.
    pub fn update(
        &self,
        actor: Actor,
        id: Uuid,
        patch: &WorkoutLogPatch,
    ) -> Result<WorkoutLog, CoreError> {
        let log = self
            .get(id)?
            .ok_or_else(|| CoreError::not_found("workout log", id))?;

        if !actor.is_admin() && actor.user_id != log.runner_id {
            return Err(CoreError::Forbidden(
                "only the runner may update their workout log".to_string(),
            ));
        }

        let updated = WorkoutLog {
            status: patch.status.unwrap_or(log.status),
            actual_distance_km: patch.actual_distance_km.unwrap_or(log.actual_distance_km),
            actual_duration_minutes: patch
                .actual_duration_minutes
                .unwrap_or(log.actual_duration_minutes),
            feeling: patch.feeling.clone().unwrap_or(log.feeling),
            injuries: patch.injuries.clone().unwrap_or(log.injuries),
            external_link: patch.external_link.clone().unwrap_or(log.external_link),
            updated_at: Utc::now(),
            ..log
        };

        let injuries_json = serde_json::to_string(&updated.injuries)
            .map_err(|e| DatabaseError::SerializationError(e.to_string()))?;

        self.conn
            .execute(
                "UPDATE workout_logs SET
                 status = ?1, actual_distance_km = ?2, actual_duration_minutes = ?3,
                 feeling = ?4, injuries_json = ?5, external_link = ?6, updated_at = ?7
                 WHERE id = ?8",
                params![
                    updated.status.as_str(),
                    updated.actual_distance_km,
                    updated.actual_duration_minutes,
                    updated.feeling,
                    injuries_json,
                    updated.external_link,
                    updated.updated_at.to_rfc3339(),
                    id.to_string(),
                ],
            )
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        Ok(updated)
    }

    /// Delete a workout log.
    ///
    /// The owning session's status is deliberately not reset; reads fall
    /// back to the stored column once the log is gone.
    pub fn delete(&self, actor: Actor, id: Uuid) -> Result<(), CoreError> {
        let log = self
            .get(id)?
            .ok_or_else(|| CoreError::not_found("workout log", id))?;

        if !actor.is_admin() && actor.user_id != log.runner_id {
            return Err(CoreError::Forbidden(
                "only the runner may delete their workout log".to_string(),
            ));
        }

        self.conn
            .execute(
                "DELETE FROM workout_logs WHERE id = ?1",
                params![id.to_string()],
            )
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        Ok(())
    }
}

/// Parse a database row into a WorkoutLog.
fn parse_log_row(row: &rusqlite::Row) -> rusqlite::Result<WorkoutLog> {
    let id_str: String = row.get(0)?;
    let session_id_str: String = row.get(1)?;
    let runner_id_str: String = row.get(2)?;
    let status_str: String = row.get(3)?;
    let injuries_json: String = row.get(7)?;
    let created_at_str: String = row.get(9)?;
    let updated_at_str: String = row.get(10)?;

    let injuries: Vec<String> = serde_json::from_str(&injuries_json).unwrap_or_default();

    Ok(WorkoutLog {
        id: Uuid::parse_str(&id_str).unwrap_or_default(),
        session_id: Uuid::parse_str(&session_id_str).unwrap_or_default(),
        runner_id: Uuid::parse_str(&runner_id_str).unwrap_or_default(),
        status: LogStatus::parse(&status_str),
        actual_distance_km: row.get(4)?,
        actual_duration_minutes: row.get(5)?,
        feeling: row.get(6)?,
        injuries,
        external_link: row.get(8)?,
        created_at: parse_timestamp(&created_at_str),
        updated_at: parse_timestamp(&updated_at_str),
    })
}
