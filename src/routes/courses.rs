use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use crate::dto::course_dto::{
    CourseListQuery, CreateCoursePayload, RateCoursePayload, UpdateCoursePayload,
};
use crate::error::Result;
use crate::middleware::auth::Claims;
use crate::AppState;

#[axum::debug_handler]
pub async fn list_courses(
    State(state): State<AppState>,
    Query(query): Query<CourseListQuery>,
) -> Result<impl IntoResponse> {
    let page = state.course_service.list(query).await?;
    Ok(Json(page))
}

#[axum::debug_handler]
pub async fn create_course(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateCoursePayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let course = state
        .course_service
        .create(payload, claims.user_id()?)
        .await?;
    Ok((StatusCode::CREATED, Json(course)))
}

#[axum::debug_handler]
pub async fn get_course(
    State(state): State<AppState>,
    Path(course_id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let course = state.course_service.get_by_id(course_id).await?;
    Ok(Json(course))
}

#[axum::debug_handler]
pub async fn update_course(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(course_id): Path<Uuid>,
    Json(payload): Json<UpdateCoursePayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let course = state
        .course_service
        .update(course_id, payload, claims.user_id()?)
        .await?;
    Ok(Json(course))
}

#[axum::debug_handler]
pub async fn delete_course(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(course_id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    state
        .course_service
        .delete(course_id, claims.user_id()?)
        .await?;
    Ok(Json(json!({ "message": "Course deleted successfully" })))
}

#[axum::debug_handler]
pub async fn publish_course(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(course_id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let course = state
        .course_service
        .publish(course_id, claims.user_id()?)
        .await?;
    Ok(Json(course))
}

#[axum::debug_handler]
pub async fn rate_course(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(course_id): Path<Uuid>,
    Json(payload): Json<RateCoursePayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    state
        .course_service
        .rate(course_id, claims.user_id()?, payload.rating)
        .await?;
    Ok(Json(json!({ "message": "Rating saved" })))
}

#[axum::debug_handler]
pub async fn list_course_lessons(
    State(state): State<AppState>,
    Path(course_id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let lessons = state.course_service.list_lessons(course_id).await?;
    Ok(Json(lessons))
}

#[axum::debug_handler]
pub async fn get_lesson(
    State(state): State<AppState>,
    Path(lesson_id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let lesson = state.course_service.get_lesson(lesson_id).await?;
    Ok(Json(lesson))
}
