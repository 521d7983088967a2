//! Time-windowed analytics over a runner's workout logs.

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, Duration, Utc};
use rusqlite::{params, Connection};
use uuid::Uuid;

use super::types::{round2, RunnerSummary, Timeframe, TypeBreakdown, WeeklyBucket};
use crate::error::CoreError;
use crate::sessions::types::LogStatus;
use crate::storage::database::DatabaseError;
use crate::users::store::parse_timestamp;

/// Aggregator for runner analytics.
pub struct AnalyticsAggregator<'a> {
    conn: &'a Connection,
}

/// One log row as the aggregator consumes it.
struct LogSample {
    status: LogStatus,
    distance_km: Option<f64>,
    duration_minutes: Option<f64>,
    feeling: Option<String>,
    session_type: String,
    logged_at: DateTime<Utc>,
}

impl<'a> AnalyticsAggregator<'a> {
    /// Create a new aggregator with a database connection.
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Compute summary statistics for a runner.
    ///
    /// `timeframe` resolves the window start (week/month/year back from
    /// now) and takes precedence over `period_days`, which only bounds the
    /// window under `Timeframe::All`. Logs missing a metric are excluded
    /// from both the numerator and denominator of that metric's average.
    pub fn runner_summary(
        &self,
        runner_id: Uuid,
        timeframe: Timeframe,
        period_days: Option<i64>,
    ) -> Result<RunnerSummary, CoreError> {
        let start = timeframe.start_date(Utc::now(), period_days);
        let samples = self.fetch_samples(runner_id, start, false)?;

        let mut completed = 0u32;
        let mut dnf = 0u32;
        let mut undone = 0u32;

        let mut distance_sum = 0.0f64;
        let mut distance_count = 0u32;
        let mut duration_sum = 0.0f64;
        let mut duration_count = 0u32;

        // Pace pairs duration with distance, so its totals only include
        // logs carrying both fields
        let mut paced_distance = 0.0f64;
        let mut paced_duration = 0.0f64;

        let mut by_type: BTreeMap<String, TypeBreakdown> = BTreeMap::new();
        let mut feelings: BTreeMap<String, u32> = BTreeMap::new();

        for sample in &samples {
            match sample.status {
                LogStatus::Completed => completed += 1,
                LogStatus::Dnf => dnf += 1,
                LogStatus::Undone => undone += 1,
            }

            if let Some(d) = sample.distance_km {
                distance_sum += d;
                distance_count += 1;
            }
            if let Some(d) = sample.duration_minutes {
                duration_sum += d;
                duration_count += 1;
            }
            if let (Some(distance), Some(duration)) =
                (sample.distance_km, sample.duration_minutes)
            {
                paced_distance += distance;
                paced_duration += duration;
            }

            let entry = by_type.entry(sample.session_type.clone()).or_default();
            entry.count += 1;
            entry.total_distance_km += sample.distance_km.unwrap_or(0.0);
            entry.total_duration_minutes += sample.duration_minutes.unwrap_or(0.0);

            if let Some(feeling) = &sample.feeling {
                *feelings.entry(feeling.clone()).or_insert(0) += 1;
            }
        }

        let total = samples.len() as u32;
        let completion_rate = if total == 0 {
            0.0
        } else {
            f64::from(completed) / f64::from(total) * 100.0
        };
        let average_pace = if paced_distance > 0.0 && paced_duration > 0.0 {
            paced_duration / paced_distance
        } else {
            0.0
        };

        for breakdown in by_type.values_mut() {
            breakdown.total_distance_km = round2(breakdown.total_distance_km);
            breakdown.total_duration_minutes = round2(breakdown.total_duration_minutes);
        }

        Ok(RunnerSummary {
            total_workouts: total,
            completed_workouts: completed,
            dnf_workouts: dnf,
            undone_workouts: undone,
            total_distance_km: round2(distance_sum),
            average_distance_km: if distance_count == 0 {
                0.0
            } else {
                round2(distance_sum / f64::from(distance_count))
            },
            total_duration_minutes: round2(duration_sum),
            average_duration_minutes: if duration_count == 0 {
                0.0
            } else {
                round2(duration_sum / f64::from(duration_count))
            },
            completion_rate: round2(completion_rate),
            average_pace_min_per_km: round2(average_pace),
            workouts_by_type: by_type,
            feeling_distribution: feelings,
        })
    }

    /// Bucket a runner's completed logs into Sunday-aligned calendar weeks.
    ///
    /// Buckets are emitted ascending by week start; weeks without a log do
    /// not appear (no gap-filling).
    pub fn weekly_trend(&self, runner_id: Uuid, weeks: u32) -> Result<Vec<WeeklyBucket>, CoreError> {
        let start = Utc::now() - Duration::days(i64::from(weeks) * 7);
        let samples = self.fetch_samples(runner_id, Some(start), true)?;

        let mut buckets: BTreeMap<chrono::NaiveDate, WeeklyBucket> = BTreeMap::new();
        for sample in &samples {
            let date = sample.logged_at.date_naive();
            let week_start = date - Duration::days(i64::from(date.weekday().num_days_from_sunday()));

            let bucket = buckets.entry(week_start).or_insert_with(|| WeeklyBucket {
                week_start,
                total_distance_km: 0.0,
                total_duration_minutes: 0.0,
                workout_count: 0,
            });
            bucket.total_distance_km += sample.distance_km.unwrap_or(0.0);
            bucket.total_duration_minutes += sample.duration_minutes.unwrap_or(0.0);
            bucket.workout_count += 1;
        }

        Ok(buckets
            .into_values()
            .map(|b| WeeklyBucket {
                total_distance_km: round2(b.total_distance_km),
                total_duration_minutes: round2(b.total_duration_minutes),
                ..b
            })
            .collect())
    }

    /// Fetch a runner's log samples, optionally window-bounded and
    /// restricted to completed logs.
    fn fetch_samples(
        &self,
        runner_id: Uuid,
        start: Option<DateTime<Utc>>,
        completed_only: bool,
    ) -> Result<Vec<LogSample>, CoreError> {
        let mut sql = String::from(
            "SELECT l.status, l.actual_distance_km, l.actual_duration_minutes,
                    l.feeling, s.session_type, l.created_at
             FROM workout_logs l
             JOIN training_sessions s ON s.id = l.session_id
             WHERE l.runner_id = ?1",
        );
        if start.is_some() {
            sql.push_str(" AND l.created_at >= ?2");
        }
        if completed_only {
            sql.push_str(" AND l.status = 'completed'");
        }
        sql.push_str(" ORDER BY l.created_at ASC");

        let mut stmt = self
            .conn
            .prepare(&sql)
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        let map_row = |row: &rusqlite::Row| -> rusqlite::Result<LogSample> {
            let status_str: String = row.get(0)?;
            let created_at_str: String = row.get(5)?;
            Ok(LogSample {
                status: LogStatus::parse(&status_str),
                distance_km: row.get(1)?,
                duration_minutes: row.get(2)?,
                feeling: row.get(3)?,
                session_type: row.get(4)?,
                logged_at: parse_timestamp(&created_at_str),
            })
        };

        let rows = match start {
            Some(start) => stmt
                .query_map(
                    params![runner_id.to_string(), start.to_rfc3339()],
                    map_row,
                )
                .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?
                .collect::<Result<Vec<_>, _>>(),
            None => stmt
                .query_map(params![runner_id.to_string()], map_row)
                .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?
                .collect::<Result<Vec<_>, _>>(),
        };

        rows.map_err(|e| DatabaseError::QueryFailed(e.to_string()).into())
    }
}
