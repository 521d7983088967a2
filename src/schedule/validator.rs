//! Overlap prevention for a runner's training plans.

use chrono::NaiveDate;
use rusqlite::{params, Connection};
use uuid::Uuid;

use super::types::OverlapReport;
use crate::error::CoreError;
use crate::storage::database::DatabaseError;

/// Inclusive-bounds range overlap test.
///
/// `[s1, e1]` and `[s2, e2]` overlap iff `s1 <= e2 && s2 <= e1`; two ranges
/// sharing a single day count as overlapping.
pub fn ranges_overlap(s1: NaiveDate, e1: NaiveDate, s2: NaiveDate, e2: NaiveDate) -> bool {
    s1 <= e2 && s2 <= e1
}

/// Check a candidate date range against every existing plan of a runner.
///
/// `exclude_plan_id` skips the plan being updated so a plan never conflicts
/// with itself. The check is advisory only; callers decide whether a
/// conflict aborts the write.
pub fn check_overlap(
    conn: &Connection,
    runner_id: Uuid,
    candidate_start: NaiveDate,
    candidate_end: NaiveDate,
    exclude_plan_id: Option<Uuid>,
) -> Result<OverlapReport, CoreError> {
    let mut stmt = conn
        .prepare("SELECT id, week_start, week_end FROM training_plans WHERE runner_id = ?1")
        .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

    let rows = stmt
        .query_map(params![runner_id.to_string()], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })
        .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

    let mut conflicting = Vec::new();
    for row in rows {
        let (id_str, start_str, end_str) =
            row.map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        let plan_id = Uuid::parse_str(&id_str).unwrap_or_default();
        if exclude_plan_id == Some(plan_id) {
            continue;
        }

        let start = parse_date(&start_str)?;
        let end = parse_date(&end_str)?;

        if ranges_overlap(candidate_start, candidate_end, start, end) {
            conflicting.push(plan_id);
        }
    }

    Ok(OverlapReport {
        overlaps: !conflicting.is_empty(),
        conflicting_plan_ids: conflicting,
    })
}

pub(crate) fn parse_date(s: &str) -> Result<NaiveDate, CoreError> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|e| DatabaseError::QueryFailed(format!("malformed date '{}': {}", s, e)).into())
}
