use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Extension, Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::dto::progress_dto::{LessonActivityResponse, LessonProgressUpdate};
use crate::error::Result;
use crate::middleware::auth::Claims;
use crate::AppState;

#[axum::debug_handler]
pub async fn get_course_progress(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(course_id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let progress = state
        .progress_service
        .get_course_progress(claims.user_id()?, course_id)
        .await?;
    Ok(Json(progress))
}

/// Record a partial activity update; completing the lesson re-derives the
/// course percentage and runs the achievement pass, so anything newly
/// unlocked comes back with the record.
#[axum::debug_handler]
pub async fn update_lesson_progress(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(lesson_id): Path<Uuid>,
    Json(payload): Json<LessonProgressUpdate>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let user_id = claims.user_id()?;

    let progress = state
        .progress_service
        .record_lesson_activity(user_id, lesson_id, &payload)
        .await?;

    let new_achievements = if payload.completes_lesson() {
        state.achievement_service.evaluate(user_id).await?
    } else {
        Vec::new()
    };

    Ok(Json(LessonActivityResponse {
        progress,
        new_achievements,
    }))
}

#[axum::debug_handler]
pub async fn mark_lesson_completed(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(lesson_id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let user_id = claims.user_id()?;

    let progress = state
        .progress_service
        .mark_lesson_completed(user_id, lesson_id)
        .await?;
    let new_achievements = state.achievement_service.evaluate(user_id).await?;

    Ok(Json(LessonActivityResponse {
        progress,
        new_achievements,
    }))
}

#[axum::debug_handler]
pub async fn get_statistics(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse> {
    let stats = state
        .progress_service
        .get_statistics(claims.user_id()?)
        .await?;
    Ok(Json(stats))
}
