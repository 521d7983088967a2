//! Sessions: planned workouts, their state machine, and workout logs.

pub mod logs;
pub mod manager;
pub mod types;

pub use logs::{LogChain, WorkoutLogManager};
pub use manager::SessionManager;
pub use types::{
    Intensity, LogStatus, NewSession, NewWorkoutLog, SessionPatch, SessionStatus, SessionType,
    TrainingSession, WorkoutLog, WorkoutLogPatch,
};
