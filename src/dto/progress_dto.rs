use crate::models::achievement::Achievement;
use crate::models::progress::LessonProgress;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Partial activity update. Every field is optional; omitted fields keep
/// their stored value (last-writer-wins per field, never accumulation).
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct LessonProgressUpdate {
    pub is_completed: Option<bool>,
    #[validate(range(min = 0))]
    pub time_spent: Option<i32>,
    #[validate(range(min = 0, max = 100))]
    pub quiz_score: Option<i32>,
    #[validate(range(min = 0))]
    pub watched_video_time: Option<i32>,
    #[validate(range(min = 0))]
    pub last_position: Option<i32>,
}

impl LessonProgressUpdate {
    pub fn completes_lesson(&self) -> bool {
        self.is_completed == Some(true)
    }
}

/// Response to an activity write; completing a lesson may unlock
/// achievements, which ride back with the updated record.
#[derive(Debug, Serialize)]
pub struct LessonActivityResponse {
    #[serde(flatten)]
    pub progress: LessonProgress,
    pub new_achievements: Vec<Achievement>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct LearnerStatistics {
    pub total_courses: i64,
    pub completed_courses: i64,
    pub total_lessons: i64,
    pub completed_lessons: i64,
    pub total_time_spent: i64,
    pub completion_rate: f64,
}

impl LearnerStatistics {
    pub fn from_counts(
        total_courses: i64,
        completed_courses: i64,
        total_lessons: i64,
        completed_lessons: i64,
        total_time_spent: i64,
    ) -> Self {
        let completion_rate = if total_courses > 0 {
            (completed_courses as f64 / total_courses as f64) * 100.0
        } else {
            0.0
        };
        Self {
            total_courses,
            completed_courses,
            total_lessons,
            completed_lessons,
            total_time_spent,
            completion_rate,
        }
    }
}
