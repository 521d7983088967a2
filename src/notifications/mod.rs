//! Notifications: event fan-out, read state, expiry sweep.

pub mod dispatcher;
pub mod types;

pub use dispatcher::{DomainEvent, NotificationDispatcher};
pub use types::{
    Category, DispatchRequest, Notification, NotificationKind, NotificationMetadata, Priority,
};
