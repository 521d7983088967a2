//! Shared test fixtures.

use chrono::NaiveDate;
use stride::schedule::{NewPlan, PlanManager, TrainingPlan};
use stride::sessions::{
    Intensity, LogStatus, NewSession, NewWorkoutLog, SessionManager, SessionType, TrainingSession,
    WorkoutLog, WorkoutLogManager,
};
use stride::storage::Database;
use stride::users::{Actor, NewUser, Role, User, UserStore};

/// A database seeded with one coach and one runner assigned to them.
pub struct Fixture {
    pub db: Database,
    pub coach: User,
    pub runner: User,
}

impl Fixture {
    pub fn coach_actor(&self) -> Actor {
        Actor::new(self.coach.id, Role::Coach)
    }

    pub fn runner_actor(&self) -> Actor {
        Actor::new(self.runner.id, Role::Runner)
    }

    /// Create a plan for the fixture runner.
    pub fn create_plan(&self, start: &str, end: &str) -> TrainingPlan {
        PlanManager::new(self.db.connection())
            .create(
                self.coach_actor(),
                &NewPlan {
                    runner_id: self.runner.id,
                    week_start: date(start),
                    week_end: date(end),
                    title: format!("Week of {start}"),
                    description: None,
                },
            )
            .unwrap()
    }

    /// Create a session in a plan for the fixture runner.
    pub fn create_session(&self, plan: &TrainingPlan, scheduled: &str) -> TrainingSession {
        self.create_typed_session(plan, scheduled, SessionType::Easy)
    }

    pub fn create_typed_session(
        &self,
        plan: &TrainingPlan,
        scheduled: &str,
        session_type: SessionType,
    ) -> TrainingSession {
        SessionManager::new(self.db.connection())
            .create(
                self.coach_actor(),
                &NewSession {
                    plan_id: plan.id,
                    scheduled_date: date(scheduled),
                    session_type,
                    intensity: Intensity::Moderate,
                    distance_km: None,
                    duration_minutes: None,
                    notes: None,
                },
            )
            .unwrap()
    }

    /// Log a completed workout for the fixture runner.
    pub fn create_log(
        &self,
        session: &TrainingSession,
        status: LogStatus,
        distance_km: Option<f64>,
        duration_minutes: Option<f64>,
    ) -> WorkoutLog {
        WorkoutLogManager::new(self.db.connection())
            .create(
                self.runner_actor(),
                &NewWorkoutLog {
                    session_id: session.id,
                    runner_id: self.runner.id,
                    status,
                    actual_distance_km: distance_km,
                    actual_duration_minutes: duration_minutes,
                    feeling: None,
                    injuries: Vec::new(),
                    external_link: None,
                },
            )
            .unwrap()
    }

    /// Register another coach with no relation to the fixture pair.
    pub fn create_unrelated_coach(&self, email: &str) -> User {
        UserStore::new(self.db.connection())
            .create(&NewUser {
                email: email.to_string(),
                name: "Unrelated Coach".to_string(),
                role: Role::Coach,
                coach_id: None,
            })
            .unwrap()
    }
}

pub fn setup() -> Fixture {
    init_tracing();
    let db = Database::open_in_memory().unwrap();

    let (coach, runner) = {
        let users = UserStore::new(db.connection());
        let coach = users
            .create(&NewUser {
                email: "coach@example.com".to_string(),
                name: "Coach Carter".to_string(),
                role: Role::Coach,
                coach_id: None,
            })
            .unwrap();
        let runner = users
            .create(&NewUser {
                email: "runner@example.com".to_string(),
                name: "Riley Runner".to_string(),
                role: Role::Runner,
                coach_id: Some(coach.id),
            })
            .unwrap();
        (coach, runner)
    };

    Fixture { db, coach, runner }
}

pub fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn init_tracing() {
    use std::sync::Once;
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}
