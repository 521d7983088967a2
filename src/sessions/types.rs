//! Training session and workout log type definitions, including the
//! session status state machine.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CoreError;

/// Status of a planned training session.
///
/// The only sanctioned transitions are `Scheduled` to one of the four
/// terminal states. Moving a terminal session back to `Scheduled` happens
/// only through the explicit, audited reopen operation, never through a
/// plain status update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Scheduled,
    Completed,
    Dnf,
    Skipped,
    Missed,
}

impl SessionStatus {
    /// Stable string form used in storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Scheduled => "scheduled",
            SessionStatus::Completed => "completed",
            SessionStatus::Dnf => "dnf",
            SessionStatus::Skipped => "skipped",
            SessionStatus::Missed => "missed",
        }
    }

    /// Parse the stored string form.
    pub fn parse(s: &str) -> Self {
        match s {
            "completed" => SessionStatus::Completed,
            "dnf" => SessionStatus::Dnf,
            "skipped" => SessionStatus::Skipped,
            "missed" => SessionStatus::Missed,
            _ => SessionStatus::Scheduled,
        }
    }

    /// Whether this is one of the four terminal states.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, SessionStatus::Scheduled)
    }

    /// Validate a forward transition, returning the new status.
    ///
    /// Only `Scheduled -> terminal` is permitted; everything else,
    /// including terminal-to-terminal and no-op overwrites, is rejected
    /// with a typed error.
    pub fn transition_to(self, target: SessionStatus) -> Result<SessionStatus, CoreError> {
        match (self, target) {
            (SessionStatus::Scheduled, t) if t.is_terminal() => Ok(t),
            (from, to) => Err(CoreError::IllegalTransition {
                from: from.as_str(),
                to: to.as_str(),
            }),
        }
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Kind of workout a session prescribes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionType {
    Easy,
    Tempo,
    Intervals,
    LongRun,
    Recovery,
    Race,
    CrossTraining,
}

impl SessionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionType::Easy => "easy",
            SessionType::Tempo => "tempo",
            SessionType::Intervals => "intervals",
            SessionType::LongRun => "long_run",
            SessionType::Recovery => "recovery",
            SessionType::Race => "race",
            SessionType::CrossTraining => "cross_training",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "tempo" => SessionType::Tempo,
            "intervals" => SessionType::Intervals,
            "long_run" => SessionType::LongRun,
            "recovery" => SessionType::Recovery,
            "race" => SessionType::Race,
            "cross_training" => SessionType::CrossTraining,
            _ => SessionType::Easy,
        }
    }
}

impl std::fmt::Display for SessionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Prescribed effort level for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Intensity {
    Low,
    Moderate,
    High,
}

impl Intensity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Intensity::Low => "low",
            Intensity::Moderate => "moderate",
            Intensity::High => "high",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "low" => Intensity::Low,
            "high" => Intensity::High,
            _ => Intensity::Moderate,
        }
    }
}

/// A single planned workout within a training plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingSession {
    pub id: Uuid,
    pub plan_id: Uuid,
    pub runner_id: Uuid,
    pub coach_id: Uuid,
    pub scheduled_date: NaiveDate,
    pub session_type: SessionType,
    pub intensity: Intensity,
    pub status: SessionStatus,
    /// Prescribed distance in kilometers
    pub distance_km: Option<f64>,
    /// Prescribed duration in minutes
    pub duration_minutes: Option<f64>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a session. Runner and coach are inherited from the
/// owning plan.
#[derive(Debug, Clone)]
pub struct NewSession {
    pub plan_id: Uuid,
    pub scheduled_date: NaiveDate,
    pub session_type: SessionType,
    pub intensity: Intensity,
    pub distance_km: Option<f64>,
    pub duration_minutes: Option<f64>,
    pub notes: Option<String>,
}

/// Partial update for a session's planning fields. Status is never patched
/// this way; it moves only through the guarded transition operations.
#[derive(Debug, Clone, Default)]
pub struct SessionPatch {
    pub scheduled_date: Option<NaiveDate>,
    pub session_type: Option<SessionType>,
    pub intensity: Option<Intensity>,
    pub distance_km: Option<Option<f64>>,
    pub duration_minutes: Option<Option<f64>>,
    pub notes: Option<Option<String>>,
}

/// Outcome recorded in a workout log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogStatus {
    /// The runner finished the session
    Completed,
    /// Started but did not finish
    Dnf,
    /// Logged but the attempt was rolled back
    Undone,
}

impl LogStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogStatus::Completed => "completed",
            LogStatus::Dnf => "dnf",
            LogStatus::Undone => "undone",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "dnf" => LogStatus::Dnf,
            "undone" => LogStatus::Undone,
            _ => LogStatus::Completed,
        }
    }

    /// The session status this log projects onto its session, if any.
    /// An undone log leaves the session scheduled.
    pub fn session_projection(&self) -> Option<SessionStatus> {
        match self {
            LogStatus::Completed => Some(SessionStatus::Completed),
            LogStatus::Dnf => Some(SessionStatus::Dnf),
            LogStatus::Undone => None,
        }
    }
}

/// The runner's record of what actually happened for a session.
///
/// At most one log exists per `(session_id, runner_id)` pair; the log is
/// the source of truth for whether the session was attempted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkoutLog {
    pub id: Uuid,
    pub session_id: Uuid,
    pub runner_id: Uuid,
    pub status: LogStatus,
    pub actual_distance_km: Option<f64>,
    pub actual_duration_minutes: Option<f64>,
    pub feeling: Option<String>,
    pub injuries: Vec<String>,
    pub external_link: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a workout log.
#[derive(Debug, Clone)]
pub struct NewWorkoutLog {
    pub session_id: Uuid,
    pub runner_id: Uuid,
    pub status: LogStatus,
    pub actual_distance_km: Option<f64>,
    pub actual_duration_minutes: Option<f64>,
    pub feeling: Option<String>,
    pub injuries: Vec<String>,
    pub external_link: Option<String>,
}

/// Partial update for a workout log. The session and runner references
/// are deliberately absent; they are immutable after creation.
#[derive(Debug, Clone, Default)]
pub struct WorkoutLogPatch {
    pub status: Option<LogStatus>,
    pub actual_distance_km: Option<Option<f64>>,
    pub actual_duration_minutes: Option<Option<f64>>,
    pub feeling: Option<Option<String>>,
    pub injuries: Option<Vec<String>>,
    pub external_link: Option<Option<String>>,
}
