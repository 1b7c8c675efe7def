use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Course {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub thumbnail: String,
    pub category: String,
    pub level: String,
    pub price: Decimal,
    pub duration: i32,
    pub author_id: Uuid,
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CourseModule {
    pub id: Uuid,
    pub course_id: Uuid,
    pub title: String,
    pub position: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Lesson {
    pub id: Uuid,
    pub module_id: Uuid,
    pub title: String,
    pub position: i32,
    pub duration: i32,
    pub is_free: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct LessonContent {
    pub id: Uuid,
    pub lesson_id: Uuid,
    pub position: i32,
    pub content_type: String,
    pub body: Option<String>,
    pub url: Option<String>,
    pub duration: Option<i32>,
    pub quiz: Option<Json<Quiz>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quiz {
    pub passing_score: i32,
    pub questions: Vec<QuizQuestion>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QuizQuestion {
    Single {
        question: String,
        options: Vec<String>,
        correct_answer: String,
    },
    Multiple {
        question: String,
        options: Vec<String>,
        correct_answers: Vec<String>,
    },
    Text {
        question: String,
        correct_answer: String,
    },
}

pub const COURSE_CATEGORIES: &[&str] = &[
    "programming",
    "design",
    "business",
    "marketing",
    "language",
    "other",
];

pub const COURSE_LEVELS: &[&str] = &["beginner", "intermediate", "advanced"];

pub const CONTENT_TYPES: &[&str] = &["text", "video", "audio", "quiz"];
