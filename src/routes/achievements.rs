use axum::{extract::State, response::IntoResponse, Extension, Json};

use crate::error::Result;
use crate::middleware::auth::Claims;
use crate::AppState;

#[axum::debug_handler]
pub async fn get_my_achievements(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse> {
    let achievements = state
        .achievement_service
        .get_user_achievements(claims.user_id()?)
        .await?;
    Ok(Json(achievements))
}

#[axum::debug_handler]
pub async fn get_all_achievements(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let catalog = state.achievement_service.get_all_achievements().await?;
    Ok(Json(catalog))
}

#[axum::debug_handler]
pub async fn get_my_points(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse> {
    let points = state
        .achievement_service
        .get_user_points(claims.user_id()?)
        .await?;
    Ok(Json(points))
}
