//! Feedback type definitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::users::Role;

/// Maximum feedback content length, in characters.
pub const MAX_CONTENT_CHARS: usize = 2000;

/// Tone of a feedback comment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackType {
    Praise,
    Suggestion,
    Concern,
    Question,
}

impl FeedbackType {
    /// Stable string form used in storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedbackType::Praise => "praise",
            FeedbackType::Suggestion => "suggestion",
            FeedbackType::Concern => "concern",
            FeedbackType::Question => "question",
        }
    }

    /// Parse the stored string form.
    pub fn parse(s: &str) -> Self {
        match s {
            "praise" => FeedbackType::Praise,
            "concern" => FeedbackType::Concern,
            "question" => FeedbackType::Question,
            _ => FeedbackType::Suggestion,
        }
    }
}

impl std::fmt::Display for FeedbackType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A threaded comment attached to a workout log.
///
/// Replies reference their parent through `parent_id`; a reply's parent
/// must live on the same workout log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Feedback {
    pub id: Uuid,
    pub workout_log_id: Uuid,
    pub author_id: Uuid,
    pub content: String,
    pub feedback_type: FeedbackType,
    pub parent_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// Feedback joined with its author's display fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackWithAuthor {
    #[serde(flatten)]
    pub feedback: Feedback,
    pub author_name: String,
    pub author_role: Role,
}

/// A root comment with its replies, oldest reply first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackThread {
    pub root: FeedbackWithAuthor,
    pub replies: Vec<FeedbackWithAuthor>,
}

/// Input for creating feedback.
#[derive(Debug, Clone)]
pub struct NewFeedback {
    pub workout_log_id: Uuid,
    pub content: String,
    pub feedback_type: FeedbackType,
    /// Present on replies; must reference feedback on the same workout log.
    pub parent_id: Option<Uuid>,
}
