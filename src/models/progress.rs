use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Per-lesson activity record, one row per (user, lesson).
/// Created on first activity, merged field-by-field on every later one.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct LessonProgress {
    pub id: Uuid,
    pub user_id: Uuid,
    pub lesson_id: Uuid,
    pub is_completed: bool,
    pub time_spent: i32,
    pub quiz_score: Option<i32>,
    pub watched_video_time: Option<i32>,
    pub last_position: Option<i32>,
    pub last_activity: DateTime<Utc>,
}

/// Per-course completion state, one row per (user, course).
/// `progress` is always recomputed from the lesson set, never adjusted
/// incrementally. `completed_at` is set on the first transition to 100
/// and never cleared afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CourseProgress {
    pub id: Uuid,
    pub user_id: Uuid,
    pub course_id: Uuid,
    pub progress: f64,
    pub time_spent: i32,
    pub current_lesson_id: Option<Uuid>,
    pub completed_at: Option<DateTime<Utc>>,
    pub last_activity: DateTime<Utc>,
}
