//! Feedback: threaded comments on workout logs.

pub mod service;
pub mod types;

pub use service::{resolve_access, FeedbackService};
pub use types::{Feedback, FeedbackThread, FeedbackType, FeedbackWithAuthor, NewFeedback};
