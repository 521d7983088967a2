//! Integration tests for feedback threading and access control.

mod common;

use common::setup;
use stride::error::CoreError;
use stride::feedback::{FeedbackService, FeedbackType, NewFeedback};
use stride::notifications::{NotificationDispatcher, NotificationKind};
use stride::pagination::Pagination;
use stride::sessions::LogStatus;
use stride::users::{Actor, Role};
use uuid::Uuid;

fn feedback_on(log_id: Uuid, content: &str) -> NewFeedback {
    NewFeedback {
        workout_log_id: log_id,
        content: content.to_string(),
        feedback_type: FeedbackType::Suggestion,
        parent_id: None,
    }
}

/// Build a fixture with one logged session and return the log ID.
fn setup_with_log() -> (common::Fixture, Uuid) {
    let fx = setup();
    let plan = fx.create_plan("2024-01-01", "2024-01-07");
    let session = fx.create_session(&plan, "2024-01-03");
    let log = fx.create_log(&session, LogStatus::Completed, Some(10.0), Some(50.0));
    (fx, log.id)
}

#[test]
fn test_access_symmetry_across_create_and_list() {
    let (fx, log_id) = setup_with_log();
    let service = FeedbackService::new(fx.db.connection());

    let unrelated = fx.create_unrelated_coach("other@example.com");
    let admin = stride::users::UserStore::new(fx.db.connection())
        .create(&stride::users::NewUser {
            email: "admin@example.com".to_string(),
            name: "Admin".to_string(),
            role: Role::Admin,
            coach_id: None,
        })
        .unwrap();

    let cases = [
        (fx.runner_actor(), true),
        (fx.coach_actor(), true),
        (Actor::new(unrelated.id, Role::Coach), false),
        (Actor::new(admin.id, Role::Admin), true),
    ];

    for (actor, allowed) in cases {
        let created = service.create(actor, &feedback_on(log_id, "Nice pacing"));
        let listed = service.list(actor, log_id, Pagination::default());

        if allowed {
            assert!(created.is_ok(), "create should pass for {:?}", actor.role);
            assert!(listed.is_ok(), "list should pass for {:?}", actor.role);
        } else {
            assert!(
                matches!(created, Err(CoreError::Forbidden(_))),
                "create must be denied identically to list"
            );
            assert!(matches!(listed, Err(CoreError::Forbidden(_))));
        }
    }
}

#[test]
fn test_reply_to_missing_parent_is_invalid() {
    let (fx, log_id) = setup_with_log();
    let service = FeedbackService::new(fx.db.connection());

    let ghost = Uuid::new_v4();
    let result = service.create(
        fx.coach_actor(),
        &NewFeedback {
            parent_id: Some(ghost),
            ..feedback_on(log_id, "Replying to nothing")
        },
    );
    assert!(matches!(result, Err(CoreError::InvalidParent(id)) if id == ghost));
}

#[test]
fn test_reply_parent_must_share_the_workout_log() {
    let (fx, log_id) = setup_with_log();
    let service = FeedbackService::new(fx.db.connection());

    // A second logged session with its own root comment
    let plan = fx.create_plan("2024-01-08", "2024-01-14");
    let session = fx.create_session(&plan, "2024-01-10");
    let other_log = fx.create_log(&session, LogStatus::Completed, None, None);
    let foreign_root = service
        .create(fx.coach_actor(), &feedback_on(other_log.id, "Other thread"))
        .unwrap();

    let result = service.create(
        fx.runner_actor(),
        &NewFeedback {
            parent_id: Some(foreign_root.feedback.id),
            ..feedback_on(log_id, "Cross-thread reply")
        },
    );
    assert!(matches!(result, Err(CoreError::InvalidParent(_))));
}

#[test]
fn test_thread_ordering_and_root_pagination() {
    let (fx, log_id) = setup_with_log();
    let service = FeedbackService::new(fx.db.connection());

    let root_a = service
        .create(fx.coach_actor(), &feedback_on(log_id, "Root A"))
        .unwrap();
    let root_b = service
        .create(fx.coach_actor(), &feedback_on(log_id, "Root B"))
        .unwrap();
    let root_c = service
        .create(fx.coach_actor(), &feedback_on(log_id, "Root C"))
        .unwrap();

    for content in ["first reply", "second reply"] {
        service
            .create(
                fx.runner_actor(),
                &NewFeedback {
                    parent_id: Some(root_a.feedback.id),
                    ..feedback_on(log_id, content)
                },
            )
            .unwrap();
    }

    let threads = service
        .list(fx.runner_actor(), log_id, Pagination::default())
        .unwrap();

    // Roots newest-first
    assert_eq!(threads.len(), 3);
    assert_eq!(threads[0].root.feedback.id, root_c.feedback.id);
    assert_eq!(threads[2].root.feedback.id, root_a.feedback.id);

    // Replies oldest-first, never paginated away
    assert_eq!(threads[2].replies.len(), 2);
    assert_eq!(threads[2].replies[0].feedback.content, "first reply");
    assert_eq!(threads[2].replies[1].feedback.content, "second reply");

    // Pagination applies at the root level only
    let page = service
        .list(fx.runner_actor(), log_id, Pagination::new(1, 1))
        .unwrap();
    assert_eq!(page.len(), 1);
    assert_eq!(page[0].root.feedback.id, root_b.feedback.id);
    assert_eq!(page[0].replies.len(), 0);
}

#[test]
fn test_created_feedback_carries_author_display_fields() {
    let (fx, log_id) = setup_with_log();
    let service = FeedbackService::new(fx.db.connection());

    let created = service
        .create(fx.runner_actor(), &feedback_on(log_id, "Felt strong today"))
        .unwrap();

    assert_eq!(created.author_name, fx.runner.name);
    assert_eq!(created.author_role, Role::Runner);
    assert_eq!(created.feedback.author_id, fx.runner.id);
}

#[test]
fn test_empty_and_oversized_content_rejected() {
    let (fx, log_id) = setup_with_log();
    let service = FeedbackService::new(fx.db.connection());

    let result = service.create(fx.coach_actor(), &feedback_on(log_id, "   "));
    assert!(matches!(
        result,
        Err(CoreError::ValidationFailed { field: "content", .. })
    ));

    let oversized = "x".repeat(2001);
    let result = service.create(fx.coach_actor(), &feedback_on(log_id, &oversized));
    assert!(matches!(
        result,
        Err(CoreError::ValidationFailed { field: "content", .. })
    ));
}

#[test]
fn test_runner_feedback_notifies_coach_and_vice_versa() {
    let (fx, log_id) = setup_with_log();
    let service = FeedbackService::new(fx.db.connection());
    let dispatcher = NotificationDispatcher::new(fx.db.connection());

    service
        .create(fx.runner_actor(), &feedback_on(log_id, "Legs felt heavy"))
        .unwrap();

    let coach_inbox = dispatcher
        .list_for_recipient(fx.coach_actor(), true, Pagination::default())
        .unwrap();
    assert_eq!(coach_inbox.len(), 1);
    assert_eq!(coach_inbox[0].kind, NotificationKind::FeedbackReceived);

    service
        .create(fx.coach_actor(), &feedback_on(log_id, "Ease off tomorrow"))
        .unwrap();

    let runner_inbox = dispatcher
        .list_for_recipient(fx.runner_actor(), true, Pagination::default())
        .unwrap();
    assert!(runner_inbox
        .iter()
        .any(|n| n.kind == NotificationKind::FeedbackReceived));
}

#[test]
fn test_reply_notifies_parent_author_not_self() {
    let (fx, log_id) = setup_with_log();
    let service = FeedbackService::new(fx.db.connection());
    let dispatcher = NotificationDispatcher::new(fx.db.connection());

    let root = service
        .create(fx.coach_actor(), &feedback_on(log_id, "How was the tempo?"))
        .unwrap();

    // The runner replies; the parent author (coach) is notified
    service
        .create(
            fx.runner_actor(),
            &NewFeedback {
                parent_id: Some(root.feedback.id),
                ..feedback_on(log_id, "Tough but doable")
            },
        )
        .unwrap();

    let coach_inbox = dispatcher
        .list_for_recipient(fx.coach_actor(), true, Pagination::default())
        .unwrap();
    assert!(coach_inbox
        .iter()
        .any(|n| n.kind == NotificationKind::FeedbackReply));

    // The coach replying to their own root is self-suppressed
    let before = dispatcher.unread_count(fx.coach.id).unwrap();
    service
        .create(
            fx.coach_actor(),
            &NewFeedback {
                parent_id: Some(root.feedback.id),
                ..feedback_on(log_id, "Noted, adjusting Thursday")
            },
        )
        .unwrap();
    assert_eq!(dispatcher.unread_count(fx.coach.id).unwrap(), before);
}
