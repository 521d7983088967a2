//! Training plan type definitions.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Status of a training plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanStatus {
    /// Being drafted by the coach, not yet visible as active work
    Draft,
    /// Currently assigned and in progress
    Active,
    /// All sessions finished
    Completed,
    /// Withdrawn by the coach
    Cancelled,
}

impl PlanStatus {
    /// Stable string form used in storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanStatus::Draft => "draft",
            PlanStatus::Active => "active",
            PlanStatus::Completed => "completed",
            PlanStatus::Cancelled => "cancelled",
        }
    }

    /// Parse the stored string form.
    pub fn parse(s: &str) -> Self {
        match s {
            "active" => PlanStatus::Active,
            "completed" => PlanStatus::Completed,
            "cancelled" => PlanStatus::Cancelled,
            _ => PlanStatus::Draft,
        }
    }
}

impl std::fmt::Display for PlanStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A coach-authored weekly training assignment for one runner, with a
/// bounded date range.
///
/// Invariant: for a fixed runner, no two plans may have overlapping
/// `[week_start, week_end]` ranges (inclusive bounds).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingPlan {
    pub id: Uuid,
    pub runner_id: Uuid,
    pub coach_id: Uuid,
    pub week_start: NaiveDate,
    pub week_end: NaiveDate,
    pub status: PlanStatus,
    pub title: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a training plan.
#[derive(Debug, Clone)]
pub struct NewPlan {
    pub runner_id: Uuid,
    pub week_start: NaiveDate,
    pub week_end: NaiveDate,
    pub title: String,
    pub description: Option<String>,
}

/// Partial update for a training plan. `None` fields are left unchanged.
#[derive(Debug, Clone, Default)]
pub struct PlanPatch {
    pub week_start: Option<NaiveDate>,
    pub week_end: Option<NaiveDate>,
    pub status: Option<PlanStatus>,
    pub title: Option<String>,
    pub description: Option<Option<String>>,
}

/// Result of an overlap check against a runner's existing plans.
#[derive(Debug, Clone)]
pub struct OverlapReport {
    pub overlaps: bool,
    pub conflicting_plan_ids: Vec<Uuid>,
}
