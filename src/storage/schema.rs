//! Database schema definitions for Stride.

/// SQL schema for creating all database tables.
pub const SCHEMA: &str = r#"
-- Users table
CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    email TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL,
    role TEXT NOT NULL,
    coach_id TEXT REFERENCES users(id),
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_users_coach_id ON users(coach_id);

-- Training plans table
CREATE TABLE IF NOT EXISTS training_plans (
    id TEXT PRIMARY KEY,
    runner_id TEXT NOT NULL REFERENCES users(id),
    coach_id TEXT NOT NULL REFERENCES users(id),
    week_start TEXT NOT NULL,
    week_end TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'draft',
    title TEXT NOT NULL,
    description TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_training_plans_runner_id ON training_plans(runner_id);
CREATE INDEX IF NOT EXISTS idx_training_plans_runner_dates ON training_plans(runner_id, week_start, week_end);

-- Training sessions table
CREATE TABLE IF NOT EXISTS training_sessions (
    id TEXT PRIMARY KEY,
    plan_id TEXT NOT NULL REFERENCES training_plans(id),
    runner_id TEXT NOT NULL REFERENCES users(id),
    coach_id TEXT NOT NULL REFERENCES users(id),
    scheduled_date TEXT NOT NULL,
    session_type TEXT NOT NULL,
    intensity TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'scheduled',
    distance_km REAL,
    duration_minutes REAL,
    notes TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_training_sessions_plan_id ON training_sessions(plan_id);
CREATE INDEX IF NOT EXISTS idx_training_sessions_runner_id ON training_sessions(runner_id);

-- Workout logs table
-- UNIQUE(session_id, runner_id) is the correctness backstop for the
-- at-most-one-log invariant; the application check exists only to produce
-- a clean error message.
CREATE TABLE IF NOT EXISTS workout_logs (
    id TEXT PRIMARY KEY,
    session_id TEXT NOT NULL REFERENCES training_sessions(id),
    runner_id TEXT NOT NULL REFERENCES users(id),
    status TEXT NOT NULL,
    actual_distance_km REAL,
    actual_duration_minutes REAL,
    feeling TEXT,
    injuries_json TEXT NOT NULL DEFAULT '[]',
    external_link TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    UNIQUE(session_id, runner_id)
);

CREATE INDEX IF NOT EXISTS idx_workout_logs_runner_id ON workout_logs(runner_id);
CREATE INDEX IF NOT EXISTS idx_workout_logs_session_id ON workout_logs(session_id);

-- Feedback table (threaded comments on workout logs)
CREATE TABLE IF NOT EXISTS feedback (
    id TEXT PRIMARY KEY,
    workout_log_id TEXT NOT NULL REFERENCES workout_logs(id),
    author_id TEXT NOT NULL REFERENCES users(id),
    content TEXT NOT NULL,
    feedback_type TEXT NOT NULL,
    parent_id TEXT REFERENCES feedback(id),
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_feedback_workout_log_id ON feedback(workout_log_id);
CREATE INDEX IF NOT EXISTS idx_feedback_parent_id ON feedback(parent_id);

-- Notifications table
CREATE TABLE IF NOT EXISTS notifications (
    id TEXT PRIMARY KEY,
    recipient_id TEXT NOT NULL REFERENCES users(id),
    kind TEXT NOT NULL,
    title TEXT NOT NULL,
    message TEXT NOT NULL,
    read INTEGER NOT NULL DEFAULT 0,
    read_at TEXT,
    metadata_json TEXT NOT NULL,
    priority TEXT NOT NULL,
    category TEXT NOT NULL,
    created_at TEXT NOT NULL,
    expires_at TEXT
);

CREATE INDEX IF NOT EXISTS idx_notifications_recipient_id ON notifications(recipient_id);
CREATE INDEX IF NOT EXISTS idx_notifications_recipient_read ON notifications(recipient_id, read);
CREATE INDEX IF NOT EXISTS idx_notifications_expires_at ON notifications(expires_at);
"#;

/// SQL for schema version tracking (migrations)
pub const SCHEMA_VERSION_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL
);
"#;

/// Current schema version
pub const CURRENT_VERSION: i32 = 1;
