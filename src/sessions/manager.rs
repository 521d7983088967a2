//! Training session management.
//!
//! Session status is a projection: the workout log is the source of truth
//! for whether a session was attempted, and reads re-derive the effective
//! status from the latest log. The stored status column only carries
//! coach-driven outcomes (skipped, missed) and acts as a cache for
//! log-driven ones.

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::types::{
    Intensity, LogStatus, NewSession, SessionPatch, SessionStatus, SessionType, TrainingSession,
};
use crate::error::CoreError;
use crate::notifications::{DispatchRequest, NotificationDispatcher, NotificationMetadata};
use crate::schedule::validator::parse_date;
use crate::storage::database::DatabaseError;
use crate::users::store::parse_timestamp;
use crate::users::Actor;

const SESSION_COLUMNS: &str = "id, plan_id, runner_id, coach_id, scheduled_date, session_type, \
     intensity, status, distance_km, duration_minutes, notes, created_at, updated_at";

/// Manager for training sessions.
pub struct SessionManager<'a> {
    conn: &'a Connection,
}

impl<'a> SessionManager<'a> {
    /// Create a new session manager with a database connection.
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Create a session inside a plan. Coach (the plan's) or admin only;
    /// runner and coach references are inherited from the plan.
    pub fn create(&self, actor: Actor, new_session: &NewSession) -> Result<TrainingSession, CoreError> {
        let (runner_id, coach_id) = self.plan_parties(new_session.plan_id)?;
        require_coach(actor, coach_id, "create sessions")?;

        let now = Utc::now();
        let session = TrainingSession {
            id: Uuid::new_v4(),
            plan_id: new_session.plan_id,
            runner_id,
            coach_id,
            scheduled_date: new_session.scheduled_date,
            session_type: new_session.session_type,
            intensity: new_session.intensity,
            status: SessionStatus::Scheduled,
            distance_km: new_session.distance_km,
            duration_minutes: new_session.duration_minutes,
            notes: new_session.notes.clone(),
            created_at: now,
            updated_at: now,
        };

        self.conn
            .execute(
                "INSERT INTO training_sessions
                 (id, plan_id, runner_id, coach_id, scheduled_date, session_type,
                  intensity, status, distance_km, duration_minutes, notes,
                  created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
                params![
                    session.id.to_string(),
                    session.plan_id.to_string(),
                    session.runner_id.to_string(),
                    session.coach_id.to_string(),
                    session.scheduled_date.to_string(),
                    session.session_type.as_str(),
                    session.intensity.as_str(),
                    session.status.as_str(),
                    session.distance_km,
                    session.duration_minutes,
                    session.notes,
                    session.created_at.to_rfc3339(),
                    session.updated_at.to_rfc3339(),
                ],
            )
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        Ok(session)
    }

    /// Get a session by ID with its effective (log-derived) status.
    pub fn get(&self, id: Uuid) -> Result<Option<TrainingSession>, CoreError> {
        let session = self
            .conn
            .query_row(
                &format!("SELECT {SESSION_COLUMNS} FROM training_sessions WHERE id = ?1"),
                params![id.to_string()],
                parse_session_row,
            )
            .optional()
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        match session {
            Some(mut session) => {
                session.status = self.effective_status(&session)?;
                Ok(Some(session))
            }
            None => Ok(None),
        }
    }

    /// Get a session, failing with `NotFound` when absent.
    pub fn require(&self, id: Uuid) -> Result<TrainingSession, CoreError> {
        self.get(id)?
            .ok_or_else(|| CoreError::not_found("session", id))
    }

    /// List a plan's sessions ordered by scheduled date, with effective
    /// statuses.
    pub fn list_for_plan(&self, plan_id: Uuid) -> Result<Vec<TrainingSession>, CoreError> {
        let mut stmt = self
            .conn
            .prepare(&format!(
                "SELECT {SESSION_COLUMNS} FROM training_sessions
                 WHERE plan_id = ?1 ORDER BY scheduled_date ASC"
            ))
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        let rows = stmt
            .query_map(params![plan_id.to_string()], parse_session_row)
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        let mut sessions = rows
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        for session in &mut sessions {
            session.status = self.effective_status(session)?;
        }

        Ok(sessions)
    }

    /// Update a session's planning fields. Coach or admin only.
    ///
    /// Notifies the runner of the change (best-effort).
    pub fn update(
        &self,
        actor: Actor,
        id: Uuid,
        patch: &SessionPatch,
    ) -> Result<TrainingSession, CoreError> {
        let session = self.require(id)?;
        require_coach(actor, session.coach_id, "update sessions")?;

        let updated = TrainingSession {
            scheduled_date: patch.scheduled_date.unwrap_or(session.scheduled_date),
            session_type: patch.session_type.unwrap_or(session.session_type),
            intensity: patch.intensity.unwrap_or(session.intensity),
            distance_km: patch.distance_km.unwrap_or(session.distance_km),
            duration_minutes: patch.duration_minutes.unwrap_or(session.duration_minutes),
            notes: patch.notes.clone().unwrap_or(session.notes),
            updated_at: Utc::now(),
            ..session
        };

        self.conn
            .execute(
                "UPDATE training_sessions SET
                 scheduled_date = ?1, session_type = ?2, intensity = ?3,
                 distance_km = ?4, duration_minutes = ?5, notes = ?6, updated_at = ?7
                 WHERE id = ?8",
                params![
                    updated.scheduled_date.to_string(),
                    updated.session_type.as_str(),
                    updated.intensity.as_str(),
                    updated.distance_km,
                    updated.duration_minutes,
                    updated.notes,
                    updated.updated_at.to_rfc3339(),
                    id.to_string(),
                ],
            )
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        // Best-effort: a failed notification never fails the update
        let dispatcher = NotificationDispatcher::new(self.conn);
        let dispatch = dispatcher.dispatch(DispatchRequest {
            recipient_id: updated.runner_id,
            author_id: actor.user_id,
            title: "Session updated".to_string(),
            message: format!(
                "Your {} session on {} was updated",
                updated.session_type, updated.scheduled_date
            ),
            metadata: NotificationMetadata::SessionUpdated {
                session_id: updated.id,
                scheduled_date: updated.scheduled_date,
            },
            priority: None,
            category: None,
            expires_at: None,
        });
        if let Err(e) = dispatch {
            tracing::warn!(session_id = %updated.id, error = %e, "session update notification failed");
        }

        Ok(updated)
    }

    /// Move a scheduled session to a terminal state through the guarded
    /// transition. Coach or admin only.
    pub fn update_status(
        &self,
        actor: Actor,
        id: Uuid,
        target: SessionStatus,
    ) -> Result<TrainingSession, CoreError> {
        let session = self.require(id)?;
        require_coach(actor, session.coach_id, "update session status")?;

        let new_status = session.status.transition_to(target)?;
        self.write_status(id, new_status)?;

        Ok(TrainingSession {
            status: new_status,
            updated_at: Utc::now(),
            ..session
        })
    }

    /// Explicit, audited undo of a terminal session back to `scheduled`.
    ///
    /// Allowed for the session's runner, its coach, or an admin. This is
    /// the only path from a terminal state back to `scheduled`. While a
    /// workout log exists for the session the log stays the source of
    /// truth, so reopening is rejected until the log is deleted or marked
    /// undone; clearing only the stored column would report a reopen that
    /// no read ever reflects.
    pub fn reopen(&self, actor: Actor, id: Uuid) -> Result<TrainingSession, CoreError> {
        let session = self.require(id)?;

        let allowed = actor.is_admin()
            || actor.user_id == session.runner_id
            || actor.user_id == session.coach_id;
        if !allowed {
            return Err(CoreError::Forbidden(
                "only the runner, their coach, or an admin may reopen a session".to_string(),
            ));
        }

        if !session.status.is_terminal() {
            return Err(CoreError::IllegalTransition {
                from: session.status.as_str(),
                to: SessionStatus::Scheduled.as_str(),
            });
        }

        if self.has_log(&session)? {
            return Err(CoreError::ValidationFailed {
                field: "session_id",
                reason: "a workout log still exists for this session; \
                         delete it or mark it undone before reopening"
                    .to_string(),
            });
        }

        self.write_status(id, SessionStatus::Scheduled)?;

        tracing::info!(
            session_id = %id,
            actor = %actor.user_id,
            from = session.status.as_str(),
            "session reopened"
        );

        Ok(TrainingSession {
            status: SessionStatus::Scheduled,
            updated_at: Utc::now(),
            ..session
        })
    }

    /// Delete a session. Coach or admin only.
    pub fn delete(&self, actor: Actor, id: Uuid) -> Result<(), CoreError> {
        let session = self.require(id)?;
        require_coach(actor, session.coach_id, "delete sessions")?;

        self.conn
            .execute(
                "DELETE FROM training_sessions WHERE id = ?1",
                params![id.to_string()],
            )
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        Ok(())
    }

    /// Whether a workout log exists for the session.
    fn has_log(&self, session: &TrainingSession) -> Result<bool, CoreError> {
        let count: i64 = self
            .conn
            .query_row(
                "SELECT COUNT(*) FROM workout_logs WHERE session_id = ?1 AND runner_id = ?2",
                params![session.id.to_string(), session.runner_id.to_string()],
                |row| row.get(0),
            )
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;
        Ok(count > 0)
    }

    /// Apply the log projection: when a log exists for the session, its
    /// status wins over the stored column.
    fn effective_status(&self, session: &TrainingSession) -> Result<SessionStatus, CoreError> {
        let log_status: Option<String> = self
            .conn
            .query_row(
                "SELECT status FROM workout_logs WHERE session_id = ?1 AND runner_id = ?2",
                params![session.id.to_string(), session.runner_id.to_string()],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        Ok(match log_status {
            Some(s) => LogStatus::parse(&s)
                .session_projection()
                .unwrap_or(SessionStatus::Scheduled),
            None => session.status,
        })
    }

    /// Write the stored status column. Used by the guarded transition
    /// operations and by the workout-log sync.
    pub(crate) fn write_status(&self, id: Uuid, status: SessionStatus) -> Result<(), CoreError> {
        self.conn
            .execute(
                "UPDATE training_sessions SET status = ?1, updated_at = ?2 WHERE id = ?3",
                params![status.as_str(), Utc::now().to_rfc3339(), id.to_string()],
            )
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;
        Ok(())
    }

    /// Look up the runner and coach on a plan.
    fn plan_parties(&self, plan_id: Uuid) -> Result<(Uuid, Uuid), CoreError> {
        let parties: Option<(String, String)> = self
            .conn
            .query_row(
                "SELECT runner_id, coach_id FROM training_plans WHERE id = ?1",
                params![plan_id.to_string()],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        let (runner, coach) = parties.ok_or_else(|| CoreError::not_found("plan", plan_id))?;
        Ok((
            Uuid::parse_str(&runner).unwrap_or_default(),
            Uuid::parse_str(&coach).unwrap_or_default(),
        ))
    }
}

fn require_coach(actor: Actor, coach_id: Uuid, action: &str) -> Result<(), CoreError> {
    if actor.is_admin() || actor.user_id == coach_id {
        Ok(())
    } else {
        Err(CoreError::Forbidden(format!(
            "only the plan's coach or an admin may {action}"
        )))
    }
}

/// Parse a database row into a TrainingSession.
fn parse_session_row(row: &rusqlite::Row) -> rusqlite::Result<TrainingSession> {
    let id_str: String = row.get(0)?;
    let plan_id_str: String = row.get(1)?;
    let runner_id_str: String = row.get(2)?;
    let coach_id_str: String = row.get(3)?;
    let date_str: String = row.get(4)?;
    let type_str: String = row.get(5)?;
    let intensity_str: String = row.get(6)?;
    let status_str: String = row.get(7)?;
    let created_at_str: String = row.get(11)?;
    let updated_at_str: String = row.get(12)?;

    Ok(TrainingSession {
        id: Uuid::parse_str(&id_str).unwrap_or_default(),
        plan_id: Uuid::parse_str(&plan_id_str).unwrap_or_default(),
        runner_id: Uuid::parse_str(&runner_id_str).unwrap_or_default(),
        coach_id: Uuid::parse_str(&coach_id_str).unwrap_or_default(),
        scheduled_date: parse_date(&date_str).unwrap_or_default(),
        session_type: SessionType::parse(&type_str),
        intensity: Intensity::parse(&intensity_str),
        status: SessionStatus::parse(&status_str),
        distance_km: row.get(8)?,
        duration_minutes: row.get(9)?,
        notes: row.get(10)?,
        created_at: parse_timestamp(&created_at_str),
        updated_at: parse_timestamp(&updated_at_str),
    })
}
