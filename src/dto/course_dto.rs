use crate::models::course::{Course, CourseModule, Lesson, LessonContent, Quiz};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateCoursePayload {
    #[validate(length(min = 1))]
    pub title: String,
    #[validate(length(min = 1))]
    pub description: String,
    #[validate(length(min = 1))]
    pub thumbnail: String,
    pub category: String,
    pub level: String,
    #[validate(range(min = 0.0))]
    pub price: f64,
    #[validate(nested)]
    pub modules: Vec<CreateModulePayload>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateModulePayload {
    #[validate(length(min = 1))]
    pub title: String,
    pub position: i32,
    #[validate(nested)]
    pub lessons: Vec<CreateLessonPayload>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateLessonPayload {
    #[validate(length(min = 1))]
    pub title: String,
    pub position: i32,
    #[validate(range(min = 0))]
    pub duration: i32,
    pub is_free: Option<bool>,
    pub content: Vec<CreateContentPayload>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateContentPayload {
    #[serde(rename = "type")]
    pub content_type: String,
    pub content: Option<String>,
    pub url: Option<String>,
    pub duration: Option<i32>,
    pub position: i32,
    pub quiz: Option<Quiz>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateCoursePayload {
    #[validate(length(min = 1))]
    pub title: Option<String>,
    #[validate(length(min = 1))]
    pub description: Option<String>,
    pub thumbnail: Option<String>,
    pub category: Option<String>,
    pub level: Option<String>,
    #[validate(range(min = 0.0))]
    pub price: Option<f64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct CourseListQuery {
    pub search: Option<String>,
    pub category: Option<String>,
    pub level: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RateCoursePayload {
    #[validate(range(min = 1, max = 5))]
    pub rating: i32,
}

/// Course row enriched with the list-page aggregates.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct CourseSummary {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub thumbnail: String,
    pub category: String,
    pub level: String,
    pub price: Decimal,
    pub duration: i32,
    pub is_published: bool,
    pub author_id: Uuid,
    pub author_first_name: String,
    pub author_last_name: String,
    pub author_avatar: Option<String>,
    pub average_rating: f64,
    pub total_students: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct PaginatedCourses {
    pub items: Vec<CourseSummary>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
    pub total_pages: i64,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct AuthorProfile {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub avatar: Option<String>,
    pub bio: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CourseDetail {
    #[serde(flatten)]
    pub course: Course,
    pub author: AuthorProfile,
    pub modules: Vec<ModuleTree>,
    pub average_rating: f64,
    pub total_ratings: i64,
}

#[derive(Debug, Serialize)]
pub struct ModuleTree {
    #[serde(flatten)]
    pub module: CourseModule,
    pub lessons: Vec<LessonTree>,
}

#[derive(Debug, Serialize)]
pub struct LessonTree {
    #[serde(flatten)]
    pub lesson: Lesson,
    pub content: Vec<LessonContent>,
}

/// Lesson detail with pointers into the course's flattened lesson order.
#[derive(Debug, Serialize)]
pub struct LessonDetail {
    #[serde(flatten)]
    pub lesson: Lesson,
    pub content: Vec<LessonContent>,
    pub course_id: Uuid,
    pub previous: Option<Lesson>,
    pub next: Option<Lesson>,
}
