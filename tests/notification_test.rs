//! Integration tests for recipient resolution over the plan chain.

mod common;

use common::setup;
use stride::error::CoreError;
use stride::feedback::{FeedbackService, FeedbackType, NewFeedback};
use stride::notifications::{DomainEvent, NotificationDispatcher};
use stride::sessions::LogStatus;
use uuid::Uuid;

#[test]
fn test_root_feedback_recipient_is_the_counterpart() {
    let fx = setup();
    let plan = fx.create_plan("2024-01-01", "2024-01-07");
    let session = fx.create_session(&plan, "2024-01-03");
    let log = fx.create_log(&session, LogStatus::Completed, Some(10.0), Some(50.0));
    let dispatcher = NotificationDispatcher::new(fx.db.connection());

    // Runner writes -> coach receives
    let recipient = dispatcher
        .resolve_recipient(&DomainEvent::FeedbackCreated {
            workout_log_id: log.id,
            author_id: fx.runner.id,
            parent_id: None,
        })
        .unwrap();
    assert_eq!(recipient, fx.coach.id);

    // Coach writes -> runner receives
    let recipient = dispatcher
        .resolve_recipient(&DomainEvent::FeedbackCreated {
            workout_log_id: log.id,
            author_id: fx.coach.id,
            parent_id: None,
        })
        .unwrap();
    assert_eq!(recipient, fx.runner.id);
}

#[test]
fn test_reply_recipient_is_the_parent_author() {
    let fx = setup();
    let plan = fx.create_plan("2024-01-01", "2024-01-07");
    let session = fx.create_session(&plan, "2024-01-03");
    let log = fx.create_log(&session, LogStatus::Completed, None, None);

    let root = FeedbackService::new(fx.db.connection())
        .create(
            fx.runner_actor(),
            &NewFeedback {
                workout_log_id: log.id,
                content: "Struggled on the hills".to_string(),
                feedback_type: FeedbackType::Question,
                parent_id: None,
            },
        )
        .unwrap();

    let recipient = NotificationDispatcher::new(fx.db.connection())
        .resolve_recipient(&DomainEvent::FeedbackCreated {
            workout_log_id: log.id,
            author_id: fx.coach.id,
            parent_id: Some(root.feedback.id),
        })
        .unwrap();
    assert_eq!(recipient, fx.runner.id);
}

#[test]
fn test_plan_and_session_events_target_the_runner() {
    let fx = setup();
    let plan = fx.create_plan("2024-01-01", "2024-01-07");
    let session = fx.create_session(&plan, "2024-01-03");
    let dispatcher = NotificationDispatcher::new(fx.db.connection());

    let recipient = dispatcher
        .resolve_recipient(&DomainEvent::PlanAssigned { plan_id: plan.id })
        .unwrap();
    assert_eq!(recipient, fx.runner.id);

    let recipient = dispatcher
        .resolve_recipient(&DomainEvent::SessionUpdated {
            session_id: session.id,
        })
        .unwrap();
    assert_eq!(recipient, fx.runner.id);
}

#[test]
fn test_resolution_fails_cleanly_for_missing_entities() {
    let fx = setup();
    let dispatcher = NotificationDispatcher::new(fx.db.connection());

    let result = dispatcher.resolve_recipient(&DomainEvent::PlanAssigned {
        plan_id: Uuid::new_v4(),
    });
    assert!(matches!(result, Err(CoreError::NotFound { .. })));

    let result = dispatcher.resolve_recipient(&DomainEvent::FeedbackCreated {
        workout_log_id: Uuid::new_v4(),
        author_id: fx.runner.id,
        parent_id: None,
    });
    assert!(matches!(result, Err(CoreError::NotFound { .. })));
}
