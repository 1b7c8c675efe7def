use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Deserialize)]
pub struct CreatePaymentIntentRequest {
    pub course_id: Uuid,
}

#[derive(Debug, Clone, Serialize)]
pub struct PaymentIntentResponse {
    pub client_secret: Option<String>,
    pub payment_intent_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConfirmPaymentRequest {
    pub payment_intent_id: String,
}

/// Payment row joined with a course summary for the history listing.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct PaymentHistoryEntry {
    pub id: Uuid,
    pub course_id: Uuid,
    pub course_title: String,
    pub course_thumbnail: String,
    pub amount: Decimal,
    pub currency: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}
