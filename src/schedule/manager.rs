//! Training plan management with overlap prevention.

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::types::{NewPlan, PlanPatch, PlanStatus, TrainingPlan};
use super::validator::{check_overlap, parse_date};
use crate::error::CoreError;
use crate::notifications::{DispatchRequest, NotificationDispatcher, NotificationMetadata};
use crate::storage::database::DatabaseError;
use crate::users::store::parse_timestamp;
use crate::users::{Actor, Role, UserStore};

const PLAN_COLUMNS: &str = "id, runner_id, coach_id, week_start, week_end, status, title, \
     description, created_at, updated_at";

/// Manager for training plans.
pub struct PlanManager<'a> {
    conn: &'a Connection,
}

impl<'a> PlanManager<'a> {
    /// Create a new plan manager with a database connection.
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Create a plan for a runner.
    ///
    /// The actor must be the runner's coach or an admin. The candidate
    /// date range is checked against every existing plan of the runner;
    /// a conflict fails the whole operation with `SchedulingConflict`
    /// listing the offending plan IDs, and nothing is written. On success
    /// the runner is notified (best-effort).
    pub fn create(&self, actor: Actor, new_plan: &NewPlan) -> Result<TrainingPlan, CoreError> {
        if actor.role == Role::Runner {
            return Err(CoreError::Forbidden(
                "only a coach or admin may create plans".to_string(),
            ));
        }

        let users = UserStore::new(self.conn);
        let runner = users.require(new_plan.runner_id)?;
        if runner.role != Role::Runner {
            return Err(CoreError::ValidationFailed {
                field: "runner_id",
                reason: format!("user {} is not a runner", runner.id),
            });
        }

        // A coach may only plan for their own runners
        let coach_id = runner.coach_id.unwrap_or_default();
        if !actor.is_admin() && actor.user_id != coach_id {
            return Err(CoreError::Forbidden(
                "only the runner's coach may create their plans".to_string(),
            ));
        }

        validate_plan_fields(&new_plan.title, new_plan.week_start, new_plan.week_end)?;

        let report = check_overlap(
            self.conn,
            new_plan.runner_id,
            new_plan.week_start,
            new_plan.week_end,
            None,
        )?;
        if report.overlaps {
            return Err(CoreError::SchedulingConflict {
                conflicting_plan_ids: report.conflicting_plan_ids,
            });
        }

        let now = Utc::now();
        let plan = TrainingPlan {
            id: Uuid::new_v4(),
            runner_id: new_plan.runner_id,
            coach_id,
            week_start: new_plan.week_start,
            week_end: new_plan.week_end,
            status: PlanStatus::Draft,
            title: new_plan.title.clone(),
            description: new_plan.description.clone(),
            created_at: now,
            updated_at: now,
        };

        self.conn
            .execute(
                "INSERT INTO training_plans
                 (id, runner_id, coach_id, week_start, week_end, status, title,
                  description, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    plan.id.to_string(),
                    plan.runner_id.to_string(),
                    plan.coach_id.to_string(),
                    plan.week_start.to_string(),
                    plan.week_end.to_string(),
                    plan.status.as_str(),
                    plan.title,
                    plan.description,
                    plan.created_at.to_rfc3339(),
                    plan.updated_at.to_rfc3339(),
                ],
            )
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        // Best-effort: plan creation succeeds even if this fails
        let dispatcher = NotificationDispatcher::new(self.conn);
        let dispatch = dispatcher.dispatch(DispatchRequest {
            recipient_id: plan.runner_id,
            author_id: actor.user_id,
            title: "New training plan".to_string(),
            message: format!(
                "\"{}\" was assigned for {} to {}",
                plan.title, plan.week_start, plan.week_end
            ),
            metadata: NotificationMetadata::PlanAssigned {
                plan_id: plan.id,
                week_start: plan.week_start,
            },
            priority: None,
            category: None,
            expires_at: None,
        });
        if let Err(e) = dispatch {
            tracing::warn!(plan_id = %plan.id, error = %e, "plan assignment notification failed");
        }

        Ok(plan)
    }

    /// Get a plan by ID.
    pub fn get(&self, id: Uuid) -> Result<Option<TrainingPlan>, CoreError> {
        self.conn
            .query_row(
                &format!("SELECT {PLAN_COLUMNS} FROM training_plans WHERE id = ?1"),
                params![id.to_string()],
                parse_plan_row,
            )
            .optional()
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()).into())
    }

    /// Get a plan, failing with `NotFound` when absent.
    pub fn require(&self, id: Uuid) -> Result<TrainingPlan, CoreError> {
        self.get(id)?.ok_or_else(|| CoreError::not_found("plan", id))
    }

    /// List a runner's plans ordered by week start.
    pub fn list_for_runner(&self, runner_id: Uuid) -> Result<Vec<TrainingPlan>, CoreError> {
        let mut stmt = self
            .conn
            .prepare(&format!(
                "SELECT {PLAN_COLUMNS} FROM training_plans
                 WHERE runner_id = ?1 ORDER BY week_start ASC"
            ))
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        let rows = stmt
            .query_map(params![runner_id.to_string()], parse_plan_row)
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        rows.collect::<Result<Vec<_>, _>>()
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()).into())
    }

    /// Update a plan. Coach or admin only; date changes re-run the overlap
    /// check excluding the plan itself.
    pub fn update(
        &self,
        actor: Actor,
        id: Uuid,
        patch: &PlanPatch,
    ) -> Result<TrainingPlan, CoreError> {
        let plan = self.require(id)?;
        require_coach(actor, plan.coach_id, "update plans")?;

        let week_start = patch.week_start.unwrap_or(plan.week_start);
        let week_end = patch.week_end.unwrap_or(plan.week_end);
        let title = patch.title.clone().unwrap_or_else(|| plan.title.clone());

        validate_plan_fields(&title, week_start, week_end)?;

        if week_start != plan.week_start || week_end != plan.week_end {
            let report =
                check_overlap(self.conn, plan.runner_id, week_start, week_end, Some(id))?;
            if report.overlaps {
                return Err(CoreError::SchedulingConflict {
                    conflicting_plan_ids: report.conflicting_plan_ids,
                });
            }
        }

        let updated = TrainingPlan {
            week_start,
            week_end,
            status: patch.status.unwrap_or(plan.status),
            title,
            description: patch.description.clone().unwrap_or(plan.description),
            updated_at: Utc::now(),
            ..plan
        };

        self.conn
            .execute(
                "UPDATE training_plans SET
                 week_start = ?1, week_end = ?2, status = ?3, title = ?4,
                 description = ?5, updated_at = ?6
                 WHERE id = ?7",
                params![
                    updated.week_start.to_string(),
                    updated.week_end.to_string(),
                    updated.status.as_str(),
                    updated.title,
                    updated.description,
                    updated.updated_at.to_rfc3339(),
                    id.to_string(),
                ],
            )
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        Ok(updated)
    }

    /// Delete a plan. Fails while the plan still owns sessions.
    pub fn delete(&self, actor: Actor, id: Uuid) -> Result<(), CoreError> {
        let plan = self.require(id)?;
        require_coach(actor, plan.coach_id, "delete plans")?;

        let session_count: i64 = self
            .conn
            .query_row(
                "SELECT COUNT(*) FROM training_sessions WHERE plan_id = ?1",
                params![id.to_string()],
                |row| row.get(0),
            )
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        if session_count > 0 {
            return Err(CoreError::ValidationFailed {
                field: "plan_id",
                reason: format!("plan still owns {session_count} session(s); delete them first"),
            });
        }

        self.conn
            .execute(
                "DELETE FROM training_plans WHERE id = ?1",
                params![id.to_string()],
            )
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        Ok(())
    }
}

fn validate_plan_fields(
    title: &str,
    week_start: chrono::NaiveDate,
    week_end: chrono::NaiveDate,
) -> Result<(), CoreError> {
    if title.trim().is_empty() {
        return Err(CoreError::ValidationFailed {
            field: "title",
            reason: "title must not be empty".to_string(),
        });
    }
    if week_end < week_start {
        return Err(CoreError::ValidationFailed {
            field: "week_end",
            reason: format!("week_end {week_end} precedes week_start {week_start}"),
        });
    }
    Ok(())
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

/// Parse a database row into a TrainingPlan.
fn parse_plan_row(row: &rusqlite::Row) -> rusqlite::Result<TrainingPlan> {
    let id_str: String = row.get(0)?;
    let runner_id_str: String = row.get(1)?;
    let coach_id_str: String = row.get(2)?;
    let start_str: String = row.get(3)?;
    let end_str: String = row.get(4)?;
    let status_str: String = row.get(5)?;
    let created_at_str: String = row.get(8)?;
    let updated_at_str: String = row.get(9)?;

    Ok(TrainingPlan {
        id: Uuid::parse_str(&id_str).unwrap_or_default(),
        runner_id: Uuid::parse_str(&runner_id_str).unwrap_or_default(),
        coach_id: Uuid::parse_str(&coach_id_str).unwrap_or_default(),
        week_start: parse_date(&start_str).unwrap_or_default(),
        week_end: parse_date(&end_str).unwrap_or_default(),
        status: PlanStatus::parse(&status_str),
        title: row.get(6)?,
        description: row.get(7)?,
        created_at: parse_timestamp(&created_at_str),
        updated_at: parse_timestamp(&updated_at_str),
    })
}
