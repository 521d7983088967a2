//! Schedule: training plans and the date-range overlap invariant.

pub mod manager;
pub mod types;
pub mod validator;

pub use manager::PlanManager;
pub use types::{NewPlan, OverlapReport, PlanPatch, PlanStatus, TrainingPlan};
pub use validator::{check_overlap, ranges_overlap};
