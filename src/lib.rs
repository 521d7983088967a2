//! Stride - Training Management Core
//!
//! An open-source, self-hosted training management core for running
//! coaches and their athletes. Provides plan scheduling with overlap
//! prevention, the session/workout-log completion lifecycle, threaded
//! feedback with role-derived access control, notification fan-out, and
//! time-windowed analytics, all over an embedded SQLite store.

pub mod analytics;
pub mod error;
pub mod feedback;
pub mod notifications;
pub mod pagination;
pub mod schedule;
pub mod sessions;
pub mod storage;
pub mod users;

// Re-export commonly used types
pub use analytics::AnalyticsAggregator;
pub use error::CoreError;
pub use feedback::FeedbackService;
pub use notifications::NotificationDispatcher;
pub use pagination::Pagination;
pub use schedule::PlanManager;
pub use sessions::{SessionManager, WorkoutLogManager};
pub use storage::Database;
pub use users::{Actor, Role, UserStore};
