//! Threaded feedback on workout logs with role-derived access control.
//!
//! Read and write share one access path: the runner who owns the log, the
//! coach derived from the session's plan, or an admin. Keeping a single
//! `resolve_access` function for both directions is deliberate; any
//! divergence between list and create would be a security defect.

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::types::{
    Feedback, FeedbackThread, FeedbackType, FeedbackWithAuthor, NewFeedback, MAX_CONTENT_CHARS,
};
use crate::error::CoreError;
use crate::notifications::{
    DispatchRequest, DomainEvent, NotificationDispatcher, NotificationMetadata,
};
use crate::pagination::Pagination;
use crate::sessions::logs::{resolve_log_chain, LogChain};
use crate::storage::database::DatabaseError;
use crate::users::store::parse_timestamp;
use crate::users::{Actor, Role, UserStore};

const FEEDBACK_COLUMNS: &str =
    "f.id, f.workout_log_id, f.author_id, f.content, f.feedback_type, f.parent_id, f.created_at, \
     u.name, u.role";

/// Service for feedback threads.
pub struct FeedbackService<'a> {
    conn: &'a Connection,
}

impl<'a> FeedbackService<'a> {
    /// Create a new feedback service with a database connection.
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Create feedback on a workout log.
    ///
    /// Fails with `Forbidden` when the actor is outside the log's access
    /// chain, `ValidationFailed` on empty or oversized content, and
    /// `InvalidParent` when `parent_id` does not resolve to feedback on
    /// the same workout log. On success the counterpart is notified
    /// (best-effort) and the created feedback is returned with its
    /// author's display fields.
    pub fn create(
        &self,
        actor: Actor,
        new_feedback: &NewFeedback,
    ) -> Result<FeedbackWithAuthor, CoreError> {
        let chain = resolve_log_chain(self.conn, new_feedback.workout_log_id)?;
        resolve_access(actor, &chain)?;

        let content = new_feedback.content.trim();
        if content.is_empty() {
            return Err(CoreError::ValidationFailed {
                field: "content",
                reason: "content must not be empty".to_string(),
            });
        }
        if content.chars().count() > MAX_CONTENT_CHARS {
            return Err(CoreError::ValidationFailed {
                field: "content",
                reason: format!("content exceeds {MAX_CONTENT_CHARS} characters"),
            });
        }

        if let Some(parent_id) = new_feedback.parent_id {
            // Parent must exist and live on the same workout log
            let parent_log: Option<String> = self
                .conn
                .query_row(
                    "SELECT workout_log_id FROM feedback WHERE id = ?1",
                    params![parent_id.to_string()],
                    |row| row.get(0),
                )
                .optional()
                .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

            match parent_log {
                Some(log_id) if log_id == new_feedback.workout_log_id.to_string() => {}
                _ => return Err(CoreError::InvalidParent(parent_id)),
            }
        }

        let author = UserStore::new(self.conn).require(actor.user_id)?;

        let feedback = Feedback {
            id: Uuid::new_v4(),
            workout_log_id: new_feedback.workout_log_id,
            author_id: actor.user_id,
            content: content.to_string(),
            feedback_type: new_feedback.feedback_type,
            parent_id: new_feedback.parent_id,
            created_at: Utc::now(),
        };

        self.conn
            .execute(
                "INSERT INTO feedback
                 (id, workout_log_id, author_id, content, feedback_type, parent_id, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    feedback.id.to_string(),
                    feedback.workout_log_id.to_string(),
                    feedback.author_id.to_string(),
                    feedback.content,
                    feedback.feedback_type.as_str(),
                    feedback.parent_id.map(|id| id.to_string()),
                    feedback.created_at.to_rfc3339(),
                ],
            )
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        self.notify_counterpart(actor, &feedback, &author.name);

        Ok(FeedbackWithAuthor {
            feedback,
            author_name: author.name,
            author_role: author.role,
        })
    }

    /// List a workout log's feedback as threads.
    ///
    /// Roots are ordered newest-first and paginated; each root carries all
    /// of its replies oldest-first, never truncated.
    pub fn list(
        &self,
        actor: Actor,
        workout_log_id: Uuid,
        pagination: Pagination,
    ) -> Result<Vec<FeedbackThread>, CoreError> {
        let chain = resolve_log_chain(self.conn, workout_log_id)?;
        resolve_access(actor, &chain)?;

        let mut stmt = self
            .conn
            .prepare(&format!(
                "SELECT {FEEDBACK_COLUMNS}
                 FROM feedback f JOIN users u ON u.id = f.author_id
                 WHERE f.workout_log_id = ?1 AND f.parent_id IS NULL
                 ORDER BY f.created_at DESC
                 LIMIT ?2 OFFSET ?3"
            ))
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        let roots = stmt
            .query_map(
                params![
                    workout_log_id.to_string(),
                    pagination.limit,
                    pagination.offset
                ],
                parse_feedback_row,
            )
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        let mut threads = Vec::with_capacity(roots.len());
        for root in roots {
            let replies = self.replies_for(root.feedback.id)?;
            threads.push(FeedbackThread { root, replies });
        }

        Ok(threads)
    }

    /// Fetch all replies to a root comment, oldest first.
    fn replies_for(&self, parent_id: Uuid) -> Result<Vec<FeedbackWithAuthor>, CoreError> {
        let mut stmt = self
            .conn
            .prepare(&format!(
                "SELECT {FEEDBACK_COLUMNS}
                 FROM feedback f JOIN users u ON u.id = f.author_id
                 WHERE f.parent_id = ?1
                 ORDER BY f.created_at ASC"
            ))
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        let rows = stmt
            .query_map(params![parent_id.to_string()], parse_feedback_row)
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        rows.collect::<Result<Vec<_>, _>>()
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()).into())
    }

    /// Notify the counterpart of new feedback. Best-effort: failures are
    /// logged and never fail the feedback creation.
    fn notify_counterpart(&self, actor: Actor, feedback: &Feedback, author_name: &str) {
        let dispatcher = NotificationDispatcher::new(self.conn);

        let event = DomainEvent::FeedbackCreated {
            workout_log_id: feedback.workout_log_id,
            author_id: actor.user_id,
            parent_id: feedback.parent_id,
        };

        let result = dispatcher.resolve_recipient(&event).and_then(|recipient| {
            let metadata = match feedback.parent_id {
                Some(parent_id) => NotificationMetadata::FeedbackReply {
                    feedback_id: feedback.id,
                    workout_log_id: feedback.workout_log_id,
                    parent_id,
                },
                None => NotificationMetadata::FeedbackReceived {
                    feedback_id: feedback.id,
                    workout_log_id: feedback.workout_log_id,
                },
            };

            dispatcher.dispatch(DispatchRequest {
                recipient_id: recipient,
                author_id: actor.user_id,
                title: match feedback.parent_id {
                    Some(_) => format!("{author_name} replied to your feedback"),
                    None => format!("New {} from {author_name}", feedback.feedback_type),
                },
                message: feedback.content.clone(),
                metadata,
                priority: None,
                category: None,
                expires_at: None,
            })
        });

        if let Err(e) = result {
            tracing::warn!(
                feedback_id = %feedback.id,
                error = %e,
                "feedback notification failed"
            );
        }
    }
}

/// The single access check shared by reads and writes.
///
/// Allowed iff the actor is the log's runner, the coach derived from the
/// plan chain, or an admin.
pub fn resolve_access(actor: Actor, chain: &LogChain) -> Result<(), CoreError> {
    if actor.is_admin()
        || actor.user_id == chain.runner_id
        || actor.user_id == chain.coach_id
    {
        Ok(())
    } else {
        Err(CoreError::Forbidden(
            "feedback is visible only to the runner, their coach, or an admin".to_string(),
        ))
    }
}

/// Parse a feedback-with-author row.
fn parse_feedback_row(row: &rusqlite::Row) -> rusqlite::Result<FeedbackWithAuthor> {
    let id_str: String = row.get(0)?;
    let log_id_str: String = row.get(1)?;
    let author_id_str: String = row.get(2)?;
    let type_str: String = row.get(4)?;
    let parent_id_str: Option<String> = row.get(5)?;
    let created_at_str: String = row.get(6)?;
    let role_str: String = row.get(8)?;

    Ok(FeedbackWithAuthor {
        feedback: Feedback {
            id: Uuid::parse_str(&id_str).unwrap_or_default(),
            workout_log_id: Uuid::parse_str(&log_id_str).unwrap_or_default(),
            author_id: Uuid::parse_str(&author_id_str).unwrap_or_default(),
            content: row.get(3)?,
            feedback_type: FeedbackType::parse(&type_str),
            parent_id: parent_id_str.and_then(|s| Uuid::parse_str(&s).ok()),
            created_at: parse_timestamp(&created_at_str),
        },
        author_name: row.get(7)?,
        author_role: Role::parse(&role_str),
    })
}
