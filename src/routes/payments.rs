use axum::{
    extract::{Path, State},
    http::HeaderMap,
    response::IntoResponse,
    Extension, Json,
};
use serde_json::json;
use uuid::Uuid;

use crate::dto::payment_dto::{ConfirmPaymentRequest, CreatePaymentIntentRequest};
use crate::error::Result;
use crate::middleware::auth::Claims;
use crate::AppState;

#[axum::debug_handler]
pub async fn create_payment_intent(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreatePaymentIntentRequest>,
) -> Result<impl IntoResponse> {
    let response = state
        .payment_service
        .create_payment_intent(claims.user_id()?, payload.course_id)
        .await?;
    Ok(Json(response))
}

#[axum::debug_handler]
pub async fn confirm_payment(
    State(state): State<AppState>,
    Json(payload): Json<ConfirmPaymentRequest>,
) -> Result<impl IntoResponse> {
    let course_id = state
        .payment_service
        .confirm_payment(&payload.payment_intent_id)
        .await?;
    Ok(Json(json!({
        "message": "Payment confirmed",
        "course_id": course_id,
    })))
}

#[axum::debug_handler]
pub async fn get_payment_history(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse> {
    let history = state
        .payment_service
        .get_payment_history(claims.user_id()?)
        .await?;
    Ok(Json(history))
}

#[axum::debug_handler]
pub async fn request_refund(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(payment_id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    state
        .payment_service
        .request_refund(payment_id, claims.user_id()?)
        .await?;
    Ok(Json(json!({ "message": "Refund processed successfully" })))
}

/// Stripe calls this endpoint; the signature covers the exact raw body, so
/// the payload is taken as text and parsed after verification.
#[axum::debug_handler]
pub async fn stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> Result<impl IntoResponse> {
    let signature = headers
        .get("stripe-signature")
        .and_then(|value| value.to_str().ok());
    let received = state.payment_service.handle_webhook(&body, signature).await?;
    Ok(Json(json!({ "received": received })))
}
