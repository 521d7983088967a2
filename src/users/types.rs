//! User and request-context type definitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Role assigned to a user at signup. Immutable afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// An athlete following plans assigned by a coach
    Runner,
    /// A coach authoring plans for their runners
    Coach,
    /// Full access to every entity
    Admin,
}

impl Role {
    /// Stable string form used in storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Runner => "runner",
            Role::Coach => "coach",
            Role::Admin => "admin",
        }
    }

    /// Parse the stored string form. Unknown values fall back to runner,
    /// the least-privileged role.
    pub fn parse(s: &str) -> Self {
        match s {
            "coach" => Role::Coach,
            "admin" => Role::Admin,
            _ => Role::Runner,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The already-authenticated caller of a core operation.
///
/// Authentication lives outside this crate; every public operation that
/// needs authorization takes an `Actor` rather than performing its own
/// user lookup.
#[derive(Debug, Clone, Copy)]
pub struct Actor {
    pub user_id: Uuid,
    pub role: Role,
}

impl Actor {
    pub fn new(user_id: Uuid, role: Role) -> Self {
        Self { user_id, role }
    }

    /// Whether this actor holds the admin role.
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// A registered user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: Role,
    /// Back-reference to the coach; required for runners, absent otherwise.
    pub coach_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub name: String,
    pub role: Role,
    pub coach_id: Option<Uuid>,
}
