//! Users: identity records and the explicit request context (`Actor`).

pub mod store;
pub mod types;

pub use store::UserStore;
pub use types::{Actor, NewUser, Role, User};
