//! Notification fan-out: recipient resolution, persistence, read state,
//! and expiry sweep.
//!
//! Dispatch on domain paths is best-effort by contract: callers log a
//! warning and continue when persistence fails, so a notification outage
//! never fails the triggering operation.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::types::{
    Category, DispatchRequest, Notification, NotificationKind, NotificationMetadata, Priority,
    MAX_MESSAGE_CHARS, MAX_TITLE_CHARS,
};
use crate::error::CoreError;
use crate::pagination::Pagination;
use crate::sessions::logs::resolve_log_chain;
use crate::storage::database::DatabaseError;
use crate::users::Actor;
use crate::users::store::parse_timestamp;

const NOTIFICATION_COLUMNS: &str = "id, recipient_id, kind, title, message, read, read_at, \
     metadata_json, priority, category, created_at, expires_at";

/// A domain event in need of a recipient.
#[derive(Debug, Clone)]
pub enum DomainEvent {
    /// Feedback was created on a workout log.
    FeedbackCreated {
        workout_log_id: Uuid,
        author_id: Uuid,
        parent_id: Option<Uuid>,
    },
    /// A plan was assigned to a runner.
    PlanAssigned { plan_id: Uuid },
    /// A session on a plan was updated.
    SessionUpdated { session_id: Uuid },
}

/// Dispatcher for notification records.
pub struct NotificationDispatcher<'a> {
    conn: &'a Connection,
}

impl<'a> NotificationDispatcher<'a> {
    /// Create a new dispatcher with a database connection.
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Resolve the recipient for a domain event.
    ///
    /// Rule table: a reply notifies the parent feedback's author; root-level
    /// feedback notifies the counterpart on the plan chain (coach when the
    /// runner wrote it, runner otherwise); plan and session events notify
    /// the runner.
    pub fn resolve_recipient(&self, event: &DomainEvent) -> Result<Uuid, CoreError> {
        match event {
            DomainEvent::FeedbackCreated {
                workout_log_id,
                author_id,
                parent_id,
            } => {
                if let Some(parent_id) = parent_id {
                    let author: Option<String> = self
                        .conn
                        .query_row(
                            "SELECT author_id FROM feedback WHERE id = ?1",
                            params![parent_id.to_string()],
                            |row| row.get(0),
                        )
                        .optional()
                        .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

                    let author =
                        author.ok_or_else(|| CoreError::not_found("feedback", *parent_id))?;
                    return Ok(Uuid::parse_str(&author).unwrap_or_default());
                }

                let chain = resolve_log_chain(self.conn, *workout_log_id)?;
                if *author_id == chain.runner_id {
                    Ok(chain.coach_id)
                } else {
                    Ok(chain.runner_id)
                }
            }
            DomainEvent::PlanAssigned { plan_id } => {
                let runner: Option<String> = self
                    .conn
                    .query_row(
                        "SELECT runner_id FROM training_plans WHERE id = ?1",
                        params![plan_id.to_string()],
                        |row| row.get(0),
                    )
                    .optional()
                    .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

                let runner = runner.ok_or_else(|| CoreError::not_found("plan", *plan_id))?;
                Ok(Uuid::parse_str(&runner).unwrap_or_default())
            }
            DomainEvent::SessionUpdated { session_id } => {
                let runner: Option<String> = self
                    .conn
                    .query_row(
                        "SELECT runner_id FROM training_sessions WHERE id = ?1",
                        params![session_id.to_string()],
                        |row| row.get(0),
                    )
                    .optional()
                    .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

                let runner = runner.ok_or_else(|| CoreError::not_found("session", *session_id))?;
                Ok(Uuid::parse_str(&runner).unwrap_or_default())
            }
        }
    }

    /// Persist a notification.
    ///
    /// Returns `Ok(None)` without writing when the recipient is the author
    /// (self-notifications are suppressed). Title and message are silently
    /// truncated to their persisted maximums.
    pub fn dispatch(&self, request: DispatchRequest) -> Result<Option<Notification>, CoreError> {
        if request.recipient_id == request.author_id {
            tracing::debug!(
                recipient = %request.recipient_id,
                "suppressing self-notification"
            );
            return Ok(None);
        }

        let kind = request.metadata.kind();
        let notification = Notification {
            id: Uuid::new_v4(),
            recipient_id: request.recipient_id,
            kind,
            title: truncate_chars(&request.title, MAX_TITLE_CHARS),
            message: truncate_chars(&request.message, MAX_MESSAGE_CHARS),
            read: false,
            read_at: None,
            metadata: request.metadata,
            priority: request.priority.unwrap_or_else(|| kind.default_priority()),
            category: request.category.unwrap_or_else(|| kind.default_category()),
            created_at: Utc::now(),
            expires_at: request.expires_at,
        };

        let metadata_json = serde_json::to_string(&notification.metadata)
            .map_err(|e| DatabaseError::SerializationError(e.to_string()))?;

        self.conn
            .execute(
                "INSERT INTO notifications
                 (id, recipient_id, kind, title, message, read, read_at,
                  metadata_json, priority, category, created_at, expires_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, 0, NULL, ?6, ?7, ?8, ?9, ?10)",
                params![
                    notification.id.to_string(),
                    notification.recipient_id.to_string(),
                    notification.kind.as_str(),
                    notification.title,
                    notification.message,
                    metadata_json,
                    notification.priority.as_str(),
                    notification.category.as_str(),
                    notification.created_at.to_rfc3339(),
                    notification.expires_at.map(|t| t.to_rfc3339()),
                ],
            )
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        Ok(Some(notification))
    }

    /// Get a notification by ID.
    pub fn get(&self, id: Uuid) -> Result<Option<Notification>, CoreError> {
        self.conn
            .query_row(
                &format!("SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE id = ?1"),
                params![id.to_string()],
                parse_notification_row,
            )
            .optional()
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()).into())
    }

    /// Mark a notification as read and return the actor's unread count.
    ///
    /// Idempotent: re-marking an already-read notification succeeds.
    pub fn mark_read(&self, notification_id: Uuid, actor: Actor) -> Result<u32, CoreError> {
        let notification = self
            .get(notification_id)?
            .ok_or_else(|| CoreError::not_found("notification", notification_id))?;

        if notification.recipient_id != actor.user_id {
            return Err(CoreError::Forbidden(
                "only the recipient may change a notification's read state".to_string(),
            ));
        }

        if !notification.read {
            self.conn
                .execute(
                    "UPDATE notifications SET read = 1, read_at = ?1 WHERE id = ?2",
                    params![Utc::now().to_rfc3339(), notification_id.to_string()],
                )
                .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;
        }

        self.unread_count(actor.user_id)
    }

    /// Mark a notification as unread and return the actor's unread count.
    ///
    /// Same ownership rule and idempotency as [`mark_read`](Self::mark_read).
    pub fn mark_unread(&self, notification_id: Uuid, actor: Actor) -> Result<u32, CoreError> {
        let notification = self
            .get(notification_id)?
            .ok_or_else(|| CoreError::not_found("notification", notification_id))?;

        if notification.recipient_id != actor.user_id {
            return Err(CoreError::Forbidden(
                "only the recipient may change a notification's read state".to_string(),
            ));
        }

        if notification.read {
            self.conn
                .execute(
                    "UPDATE notifications SET read = 0, read_at = NULL WHERE id = ?1",
                    params![notification_id.to_string()],
                )
                .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;
        }

        self.unread_count(actor.user_id)
    }

    /// Count unread notifications for a user.
    pub fn unread_count(&self, user_id: Uuid) -> Result<u32, CoreError> {
        self.conn
            .query_row(
                "SELECT COUNT(*) FROM notifications WHERE recipient_id = ?1 AND read = 0",
                params![user_id.to_string()],
                |row| row.get(0),
            )
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()).into())
    }

    /// List the actor's notifications, newest first.
    pub fn list_for_recipient(
        &self,
        actor: Actor,
        only_unread: bool,
        pagination: Pagination,
    ) -> Result<Vec<Notification>, CoreError> {
        let sql = format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications
             WHERE recipient_id = ?1 {}
             ORDER BY created_at DESC
             LIMIT ?2 OFFSET ?3",
            if only_unread { "AND read = 0" } else { "" }
        );

        let mut stmt = self
            .conn
            .prepare(&sql)
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        let rows = stmt
            .query_map(
                params![
                    actor.user_id.to_string(),
                    pagination.limit,
                    pagination.offset
                ],
                parse_notification_row,
            )
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        rows.collect::<Result<Vec<_>, _>>()
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()).into())
    }

    /// Delete every notification whose expiry has passed.
    ///
    /// Returns the number deleted. A single delete-by-predicate statement,
    /// so concurrent or repeated sweeps are safe.
    pub fn cleanup_expired(&self, now: DateTime<Utc>) -> Result<usize, CoreError> {
        let deleted = self
            .conn
            .execute(
                "DELETE FROM notifications WHERE expires_at IS NOT NULL AND expires_at < ?1",
                params![now.to_rfc3339()],
            )
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        if deleted > 0 {
            tracing::info!(count = deleted, "swept expired notifications");
        }

        Ok(deleted)
    }
}

/// Truncate to at most `max` characters, preserving char boundaries.
fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

/// Parse a database row into a Notification.
fn parse_notification_row(row: &rusqlite::Row) -> rusqlite::Result<Notification> {
    let id_str: String = row.get(0)?;
    let recipient_str: String = row.get(1)?;
    let kind_str: String = row.get(2)?;
    let read_at_str: Option<String> = row.get(6)?;
    let metadata_json: String = row.get(7)?;
    let priority_str: String = row.get(8)?;
    let category_str: String = row.get(9)?;
    let created_at_str: String = row.get(10)?;
    let expires_at_str: Option<String> = row.get(11)?;

    let kind = NotificationKind::parse(&kind_str);
    let metadata: NotificationMetadata = serde_json::from_str(&metadata_json).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(7, rusqlite::types::Type::Text, Box::new(e))
    })?;

    Ok(Notification {
        id: Uuid::parse_str(&id_str).unwrap_or_default(),
        recipient_id: Uuid::parse_str(&recipient_str).unwrap_or_default(),
        kind,
        title: row.get(3)?,
        message: row.get(4)?,
        read: row.get::<_, i64>(5)? != 0,
        read_at: read_at_str.as_deref().map(parse_timestamp),
        metadata,
        priority: Priority::parse(&priority_str),
        category: Category::parse(&category_str),
        created_at: parse_timestamp(&created_at_str),
        expires_at: expires_at_str.as_deref().map(parse_timestamp),
    })
}
