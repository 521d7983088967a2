//! Notification type definitions.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Maximum persisted title length, in characters.
pub const MAX_TITLE_CHARS: usize = 100;
/// Maximum persisted message length, in characters.
pub const MAX_MESSAGE_CHARS: usize = 500;

/// Kind of domain event a notification reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// Root-level feedback arrived on one of the recipient's workout logs
    FeedbackReceived,
    /// Someone replied to the recipient's feedback
    FeedbackReply,
    /// A coach assigned a new training plan
    PlanAssigned,
    /// A session on the recipient's plan changed
    SessionUpdated,
}

impl NotificationKind {
    /// Stable string form used in storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::FeedbackReceived => "feedback_received",
            NotificationKind::FeedbackReply => "feedback_reply",
            NotificationKind::PlanAssigned => "plan_assigned",
            NotificationKind::SessionUpdated => "session_updated",
        }
    }

    /// Parse the stored string form.
    pub fn parse(s: &str) -> Self {
        match s {
            "feedback_reply" => NotificationKind::FeedbackReply,
            "plan_assigned" => NotificationKind::PlanAssigned,
            "session_updated" => NotificationKind::SessionUpdated,
            _ => NotificationKind::FeedbackReceived,
        }
    }

    /// Default priority when the caller does not override it.
    pub fn default_priority(&self) -> Priority {
        match self {
            NotificationKind::PlanAssigned => Priority::High,
            NotificationKind::FeedbackReceived
            | NotificationKind::FeedbackReply
            | NotificationKind::SessionUpdated => Priority::Medium,
        }
    }

    /// Default category when the caller does not override it.
    pub fn default_category(&self) -> Category {
        match self {
            NotificationKind::PlanAssigned | NotificationKind::SessionUpdated => {
                Category::Training
            }
            NotificationKind::FeedbackReceived | NotificationKind::FeedbackReply => {
                Category::Communication
            }
        }
    }
}

/// Notification priority for UI badge ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
    Urgent,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
            Priority::Urgent => "urgent",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "low" => Priority::Low,
            "high" => Priority::High,
            "urgent" => Priority::Urgent,
            _ => Priority::Medium,
        }
    }
}

/// Notification display category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Training,
    Communication,
    System,
    Reminder,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Training => "training",
            Category::Communication => "communication",
            Category::System => "system",
            Category::Reminder => "reminder",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "communication" => Category::Communication,
            "system" => Category::System,
            "reminder" => Category::Reminder,
            _ => Category::Training,
        }
    }
}

/// Closed, per-kind metadata payload.
///
/// One variant per notification kind with its own known fields, instead of
/// an open string map. Serialized as internally-tagged JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NotificationMetadata {
    FeedbackReceived {
        feedback_id: Uuid,
        workout_log_id: Uuid,
    },
    FeedbackReply {
        feedback_id: Uuid,
        workout_log_id: Uuid,
        parent_id: Uuid,
    },
    PlanAssigned {
        plan_id: Uuid,
        week_start: NaiveDate,
    },
    SessionUpdated {
        session_id: Uuid,
        scheduled_date: NaiveDate,
    },
}

impl NotificationMetadata {
    /// The notification kind this payload belongs to.
    pub fn kind(&self) -> NotificationKind {
        match self {
            NotificationMetadata::FeedbackReceived { .. } => NotificationKind::FeedbackReceived,
            NotificationMetadata::FeedbackReply { .. } => NotificationKind::FeedbackReply,
            NotificationMetadata::PlanAssigned { .. } => NotificationKind::PlanAssigned,
            NotificationMetadata::SessionUpdated { .. } => NotificationKind::SessionUpdated,
        }
    }
}

/// A persisted notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub recipient_id: Uuid,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub read: bool,
    pub read_at: Option<DateTime<Utc>>,
    pub metadata: NotificationMetadata,
    pub priority: Priority,
    pub category: Category,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Input for dispatching a notification.
///
/// `priority` and `category` fall back to the per-kind defaults when not
/// set. The kind is derived from the metadata variant.
#[derive(Debug, Clone)]
pub struct DispatchRequest {
    pub recipient_id: Uuid,
    /// The user whose action caused the event. Dispatch is suppressed when
    /// this matches the recipient.
    pub author_id: Uuid,
    pub title: String,
    pub message: String,
    pub metadata: NotificationMetadata,
    pub priority: Option<Priority>,
    pub category: Option<Category>,
    pub expires_at: Option<DateTime<Utc>>,
}
