use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

/// Catalog entry. The catalog is seeded by a migration and read-only at
/// runtime; `rule` is the typed unlock condition stored as jsonb.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Achievement {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub icon: String,
    pub rule: Json<AchievementRule>,
    pub points: i32,
    pub created_at: DateTime<Utc>,
}

/// Unlock condition, dispatched on the `type` tag. Each variant carries its
/// own typed parameter, so a malformed catalog row fails at deserialization
/// instead of at evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AchievementRule {
    LessonsCompleted { count: i64 },
    CoursesCompleted { count: i64 },
    PerfectQuiz { count: i64 },
    LoginStreak { days: i64 },
}

/// Aggregate progress counts for one learner, the sole input to rule
/// evaluation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProgressSnapshot {
    pub completed_lessons: i64,
    pub completed_courses: i64,
    pub perfect_quizzes: i64,
}

impl AchievementRule {
    pub fn is_satisfied(&self, snapshot: &ProgressSnapshot) -> bool {
        match self {
            AchievementRule::LessonsCompleted { count } => snapshot.completed_lessons >= *count,
            AchievementRule::CoursesCompleted { count } => snapshot.completed_courses >= *count,
            AchievementRule::PerfectQuiz { count } => snapshot.perfect_quizzes >= *count,
            // Login streak tracking is not implemented; the rule never fires.
            AchievementRule::LoginStreak { .. } => false,
        }
    }
}

/// Award record. One row per (user, achievement), enforced by a unique
/// constraint; awards are never revoked.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserAchievement {
    pub id: Uuid,
    pub user_id: Uuid,
    pub achievement_id: Uuid,
    pub earned_at: DateTime<Utc>,
    pub progress: i32,
}
