//! Integration tests for the session/workout-log lifecycle.

mod common;

use common::setup;
use stride::error::CoreError;
use stride::sessions::{
    LogStatus, NewWorkoutLog, SessionManager, SessionStatus, WorkoutLogManager, WorkoutLogPatch,
};
use stride::users::{Actor, Role};
use uuid::Uuid;

#[test]
fn test_at_most_one_log_per_session() {
    let fx = setup();
    let plan = fx.create_plan("2024-01-01", "2024-01-07");
    let session = fx.create_session(&plan, "2024-01-03");
    let logs = WorkoutLogManager::new(fx.db.connection());

    fx.create_log(&session, LogStatus::Completed, Some(10.0), Some(50.0));

    let result = logs.create(
        fx.runner_actor(),
        &NewWorkoutLog {
            session_id: session.id,
            runner_id: fx.runner.id,
            status: LogStatus::Dnf,
            actual_distance_km: None,
            actual_duration_minutes: None,
            feeling: None,
            injuries: Vec::new(),
            external_link: None,
        },
    );
    assert!(matches!(result, Err(CoreError::DuplicateLog { session_id, .. }) if session_id == session.id));
}

#[test]
fn test_log_for_missing_session_is_not_found() {
    let fx = setup();
    let logs = WorkoutLogManager::new(fx.db.connection());

    let result = logs.create(
        fx.runner_actor(),
        &NewWorkoutLog {
            session_id: Uuid::new_v4(),
            runner_id: fx.runner.id,
            status: LogStatus::Completed,
            actual_distance_km: None,
            actual_duration_minutes: None,
            feeling: None,
            injuries: Vec::new(),
            external_link: None,
        },
    );
    assert!(matches!(result, Err(CoreError::NotFound { .. })));
}

#[test]
fn test_only_the_runner_logs_their_session() {
    let fx = setup();
    let plan = fx.create_plan("2024-01-01", "2024-01-07");
    let session = fx.create_session(&plan, "2024-01-03");
    let logs = WorkoutLogManager::new(fx.db.connection());

    // The coach cannot log on the runner's behalf
    let result = logs.create(
        fx.coach_actor(),
        &NewWorkoutLog {
            session_id: session.id,
            runner_id: fx.runner.id,
            status: LogStatus::Completed,
            actual_distance_km: None,
            actual_duration_minutes: None,
            feeling: None,
            injuries: Vec::new(),
            external_link: None,
        },
    );
    assert!(matches!(result, Err(CoreError::Forbidden(_))));
}

#[test]
fn test_completed_log_projects_onto_session() {
    let fx = setup();
    let plan = fx.create_plan("2024-01-01", "2024-01-07");
    let session = fx.create_session(&plan, "2024-01-03");
    let sessions = SessionManager::new(fx.db.connection());

    assert_eq!(session.status, SessionStatus::Scheduled);
    fx.create_log(&session, LogStatus::Completed, Some(12.0), Some(61.5));

    let read_back = sessions.require(session.id).unwrap();
    assert_eq!(read_back.status, SessionStatus::Completed);
}

#[test]
fn test_undone_log_leaves_session_scheduled() {
    let fx = setup();
    let plan = fx.create_plan("2024-01-01", "2024-01-07");
    let session = fx.create_session(&plan, "2024-01-03");
    let sessions = SessionManager::new(fx.db.connection());

    fx.create_log(&session, LogStatus::Undone, None, None);
    let read_back = sessions.require(session.id).unwrap();
    assert_eq!(read_back.status, SessionStatus::Scheduled);
}

#[test]
fn test_update_mutates_metrics_but_not_references() {
    let fx = setup();
    let plan = fx.create_plan("2024-01-01", "2024-01-07");
    let session = fx.create_session(&plan, "2024-01-03");
    let logs = WorkoutLogManager::new(fx.db.connection());

    let log = fx.create_log(&session, LogStatus::Completed, Some(10.0), Some(50.0));

    let updated = logs
        .update(
            fx.runner_actor(),
            log.id,
            &WorkoutLogPatch {
                actual_distance_km: Some(Some(11.2)),
                feeling: Some(Some("good".to_string())),
                ..Default::default()
            },
        )
        .unwrap();

    assert_eq!(updated.actual_distance_km, Some(11.2));
    assert_eq!(updated.feeling.as_deref(), Some("good"));
    assert_eq!(updated.session_id, session.id);
    assert_eq!(updated.runner_id, fx.runner.id);
    assert!(updated.updated_at >= log.updated_at);
}

#[test]
fn test_delete_log_does_not_reset_session_status() {
    let fx = setup();
    let plan = fx.create_plan("2024-01-01", "2024-01-07");
    let session = fx.create_session(&plan, "2024-01-03");
    let logs = WorkoutLogManager::new(fx.db.connection());
    let sessions = SessionManager::new(fx.db.connection());

    let log = fx.create_log(&session, LogStatus::Completed, Some(10.0), Some(50.0));
    logs.delete(fx.runner_actor(), log.id).unwrap();

    // The cached status from the sync remains; deletion is not an undo
    let read_back = sessions.require(session.id).unwrap();
    assert_eq!(read_back.status, SessionStatus::Completed);
    assert!(logs.get(log.id).unwrap().is_none());
}

#[test]
fn test_status_update_rejects_terminal_overwrites() {
    let fx = setup();
    let plan = fx.create_plan("2024-01-01", "2024-01-07");
    let session = fx.create_session(&plan, "2024-01-03");
    let sessions = SessionManager::new(fx.db.connection());

    sessions
        .update_status(fx.coach_actor(), session.id, SessionStatus::Skipped)
        .unwrap();

    let result = sessions.update_status(fx.coach_actor(), session.id, SessionStatus::Missed);
    assert!(matches!(
        result,
        Err(CoreError::IllegalTransition {
            from: "skipped",
            to: "missed"
        })
    ));
}

#[test]
fn test_reopen_is_the_only_way_back_to_scheduled() {
    let fx = setup();
    let plan = fx.create_plan("2024-01-01", "2024-01-07");
    let session = fx.create_session(&plan, "2024-01-03");
    let sessions = SessionManager::new(fx.db.connection());

    sessions
        .update_status(fx.coach_actor(), session.id, SessionStatus::Missed)
        .unwrap();

    // A plain status update back to scheduled is illegal
    let result =
        sessions.update_status(fx.coach_actor(), session.id, SessionStatus::Scheduled);
    assert!(matches!(result, Err(CoreError::IllegalTransition { .. })));

    // The explicit reopen works, for the runner too
    let reopened = sessions.reopen(fx.runner_actor(), session.id).unwrap();
    assert_eq!(reopened.status, SessionStatus::Scheduled);

    // Reopening a scheduled session is rejected
    let result = sessions.reopen(fx.runner_actor(), session.id);
    assert!(matches!(result, Err(CoreError::IllegalTransition { .. })));

    // Strangers may not reopen
    sessions
        .update_status(fx.coach_actor(), session.id, SessionStatus::Missed)
        .unwrap();
    let stranger = Actor::new(Uuid::new_v4(), Role::Runner);
    assert!(matches!(
        sessions.reopen(stranger, session.id),
        Err(CoreError::Forbidden(_))
    ));
}

#[test]
fn test_reopen_rejected_while_log_exists() {
    let fx = setup();
    let plan = fx.create_plan("2024-01-01", "2024-01-07");
    let session = fx.create_session(&plan, "2024-01-03");
    let sessions = SessionManager::new(fx.db.connection());
    let logs = WorkoutLogManager::new(fx.db.connection());

    let log = fx.create_log(&session, LogStatus::Completed, Some(10.0), Some(50.0));

    // The log is the source of truth; reopening around it is refused and
    // reads keep showing the log-derived status
    let result = sessions.reopen(fx.runner_actor(), session.id);
    assert!(matches!(
        result,
        Err(CoreError::ValidationFailed {
            field: "session_id",
            ..
        })
    ));
    assert_eq!(
        sessions.require(session.id).unwrap().status,
        SessionStatus::Completed
    );

    // Once the log is gone, the cached terminal status can be reopened
    logs.delete(fx.runner_actor(), log.id).unwrap();
    let reopened = sessions.reopen(fx.runner_actor(), session.id).unwrap();
    assert_eq!(reopened.status, SessionStatus::Scheduled);
    assert_eq!(
        sessions.require(session.id).unwrap().status,
        SessionStatus::Scheduled
    );
}

#[test]
fn test_session_update_notifies_runner() {
    let fx = setup();
    let plan = fx.create_plan("2024-01-01", "2024-01-07");
    let session = fx.create_session(&plan, "2024-01-03");
    let sessions = SessionManager::new(fx.db.connection());

    sessions
        .update(
            fx.coach_actor(),
            session.id,
            &stride::sessions::SessionPatch {
                scheduled_date: Some(common::date("2024-01-04")),
                ..Default::default()
            },
        )
        .unwrap();

    let dispatcher = stride::notifications::NotificationDispatcher::new(fx.db.connection());
    let inbox = dispatcher
        .list_for_recipient(fx.runner_actor(), true, Default::default())
        .unwrap();

    // Plan assignment + session update
    assert_eq!(inbox.len(), 2);
    assert!(inbox
        .iter()
        .any(|n| n.kind == stride::notifications::NotificationKind::SessionUpdated));
}
