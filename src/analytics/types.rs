//! Analytics type definitions.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Time window selector for summary statistics.
///
/// A concrete timeframe takes precedence over an explicit period; the
/// period only applies under `All`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Timeframe {
    All,
    Week,
    Month,
    Year,
}

impl Timeframe {
    /// Resolve the window start, if any.
    pub fn start_date(
        &self,
        now: DateTime<Utc>,
        period_days: Option<i64>,
    ) -> Option<DateTime<Utc>> {
        match self {
            Timeframe::Week => Some(now - Duration::days(7)),
            Timeframe::Month => Some(now - Duration::days(30)),
            Timeframe::Year => Some(now - Duration::days(365)),
            Timeframe::All => period_days.map(|days| now - Duration::days(days)),
        }
    }
}

/// Per-session-type accumulation in a summary.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TypeBreakdown {
    pub count: u32,
    pub total_distance_km: f64,
    pub total_duration_minutes: f64,
}

/// Summary statistics for a runner over a time window.
///
/// All values are rounded to 2 decimal places at construction; averages
/// are computed only over logs where the underlying field is present.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerSummary {
    pub total_workouts: u32,
    pub completed_workouts: u32,
    pub dnf_workouts: u32,
    pub undone_workouts: u32,
    pub total_distance_km: f64,
    pub average_distance_km: f64,
    pub total_duration_minutes: f64,
    pub average_duration_minutes: f64,
    /// completed / total * 100, always within [0, 100]
    pub completion_rate: f64,
    /// minutes per kilometer over the totals of logs carrying both
    /// metrics; 0 when no log does
    pub average_pace_min_per_km: f64,
    pub workouts_by_type: BTreeMap<String, TypeBreakdown>,
    pub feeling_distribution: BTreeMap<String, u32>,
}

/// One calendar week of completed training, Sunday-aligned.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeeklyBucket {
    pub week_start: NaiveDate,
    pub total_distance_km: f64,
    pub total_duration_minutes: f64,
    pub workout_count: u32,
}

/// Round to 2 decimal places. Applied at presentation only; accumulation
/// stays unrounded.
pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
