//! User persistence and lookups.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::types::{NewUser, Role, User};
use crate::error::CoreError;
use crate::storage::database::DatabaseError;

const USER_COLUMNS: &str = "id, email, name, role, coach_id, created_at, updated_at";

/// Store for user records.
pub struct UserStore<'a> {
    conn: &'a Connection,
}

impl<'a> UserStore<'a> {
    /// Create a new user store with a database connection.
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Create a user.
    ///
    /// Runners must reference an existing coach; coaches and admins must
    /// not carry a coach reference.
    pub fn create(&self, new_user: &NewUser) -> Result<User, CoreError> {
        if new_user.email.trim().is_empty() {
            return Err(CoreError::ValidationFailed {
                field: "email",
                reason: "email must not be empty".to_string(),
            });
        }
        if new_user.name.trim().is_empty() {
            return Err(CoreError::ValidationFailed {
                field: "name",
                reason: "name must not be empty".to_string(),
            });
        }

        match (new_user.role, new_user.coach_id) {
            (Role::Runner, None) => {
                return Err(CoreError::ValidationFailed {
                    field: "coach_id",
                    reason: "a runner must reference exactly one coach".to_string(),
                });
            }
            (Role::Runner, Some(coach_id)) => {
                let coach = self
                    .get(coach_id)?
                    .ok_or_else(|| CoreError::not_found("coach", coach_id))?;
                if coach.role != Role::Coach {
                    return Err(CoreError::ValidationFailed {
                        field: "coach_id",
                        reason: format!("user {} is not a coach", coach_id),
                    });
                }
            }
            (_, Some(_)) => {
                return Err(CoreError::ValidationFailed {
                    field: "coach_id",
                    reason: "only runners may reference a coach".to_string(),
                });
            }
            (_, None) => {}
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            email: new_user.email.clone(),
            name: new_user.name.clone(),
            role: new_user.role,
            coach_id: new_user.coach_id,
            created_at: now,
            updated_at: now,
        };

        let result = self.conn.execute(
            "INSERT INTO users (id, email, name, role, coach_id, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                user.id.to_string(),
                user.email,
                user.name,
                user.role.as_str(),
                user.coach_id.map(|id| id.to_string()),
                user.created_at.to_rfc3339(),
                user.updated_at.to_rfc3339(),
            ],
        );

        match result {
            Ok(_) => Ok(user),
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Err(CoreError::ValidationFailed {
                    field: "email",
                    reason: format!("email {} is already registered", user.email),
                })
            }
            Err(e) => Err(DatabaseError::QueryFailed(e.to_string()).into()),
        }
    }

    /// Get a user by ID.
    pub fn get(&self, id: Uuid) -> Result<Option<User>, CoreError> {
        self.conn
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
                params![id.to_string()],
                parse_user_row,
            )
            .optional()
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()).into())
    }

    /// Get a user by ID, failing with `NotFound` when absent.
    pub fn require(&self, id: Uuid) -> Result<User, CoreError> {
        self.get(id)?
            .ok_or_else(|| CoreError::not_found("user", id))
    }

    /// Get a user by email.
    pub fn get_by_email(&self, email: &str) -> Result<Option<User>, CoreError> {
        self.conn
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1"),
                params![email],
                parse_user_row,
            )
            .optional()
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()).into())
    }

    /// List the runners assigned to a coach, ordered by name.
    pub fn list_runners_for_coach(&self, coach_id: Uuid) -> Result<Vec<User>, CoreError> {
        let mut stmt = self
            .conn
            .prepare(&format!(
                "SELECT {USER_COLUMNS} FROM users WHERE coach_id = ?1 ORDER BY name ASC"
            ))
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        let rows = stmt
            .query_map(params![coach_id.to_string()], parse_user_row)
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        rows.collect::<Result<Vec<_>, _>>()
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()).into())
    }
}

/// Parse a database row into a User.
fn parse_user_row(row: &rusqlite::Row) -> rusqlite::Result<User> {
    let id_str: String = row.get(0)?;
    let role_str: String = row.get(3)?;
    let coach_id_str: Option<String> = row.get(4)?;
    let created_at_str: String = row.get(5)?;
    let updated_at_str: String = row.get(6)?;

    Ok(User {
        id: Uuid::parse_str(&id_str).unwrap_or_default(),
        email: row.get(1)?,
        name: row.get(2)?,
        role: Role::parse(&role_str),
        coach_id: coach_id_str.and_then(|s| Uuid::parse_str(&s).ok()),
        created_at: parse_timestamp(&created_at_str),
        updated_at: parse_timestamp(&updated_at_str),
    })
}

pub(crate) fn parse_timestamp(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}
