use crate::models::achievement::Achievement;
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct EarnedAchievement {
    pub achievement: Achievement,
    pub earned_at: DateTime<Utc>,
    pub progress: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserPoints {
    pub total_points: i64,
    pub achievements_count: i64,
}
