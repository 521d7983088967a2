//! Core error types shared across all services.

use thiserror::Error;
use uuid::Uuid;

use crate::storage::database::DatabaseError;

/// Errors surfaced by the training core services.
///
/// Validation and access errors carry enough detail for the caller to
/// correct the request; storage errors are wrapped generically and logged
/// with full context at the point of failure. Nothing is retried inside
/// the core.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A referenced entity does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// The caller lacks the derived access right for this operation.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// A training plan's date range overlaps an existing plan for the
    /// same runner.
    #[error("scheduling conflict with existing plan(s): {conflicting_plan_ids:?}")]
    SchedulingConflict { conflicting_plan_ids: Vec<Uuid> },

    /// A workout log already exists for this (session, runner) pair.
    #[error("workout log already exists for session {session_id} and runner {runner_id}")]
    DuplicateLog { session_id: Uuid, runner_id: Uuid },

    /// A reply's parent does not resolve to feedback on the same workout log.
    #[error("parent feedback {0} does not exist on this workout log")]
    InvalidParent(Uuid),

    /// Structural or field-level input error.
    #[error("validation failed on '{field}': {reason}")]
    ValidationFailed { field: &'static str, reason: String },

    /// A session status transition outside the sanctioned state machine.
    #[error("illegal session transition: {from} -> {to}")]
    IllegalTransition {
        from: &'static str,
        to: &'static str,
    },

    /// The storage layer failed. Surfaced generically to avoid leaking
    /// backend details; treated as retryable by callers.
    #[error("storage unavailable: {0}")]
    Storage(#[from] DatabaseError),
}

impl CoreError {
    /// Shorthand for a `NotFound` with a UUID identifier.
    pub fn not_found(entity: &'static str, id: Uuid) -> Self {
        CoreError::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}
