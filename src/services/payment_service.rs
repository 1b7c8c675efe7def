use crate::config::get_config;
use crate::dto::payment_dto::{PaymentHistoryEntry, PaymentIntentResponse};
use crate::error::{Error, Result};
use crate::models::payment::{Payment, PAYMENT_COMPLETED, PAYMENT_PENDING, PAYMENT_REFUNDED};
use crate::utils::signature::verify_stripe_signature;
use reqwest::Client;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::PgPool;
use std::collections::HashMap;
use uuid::Uuid;

const STRIPE_API_BASE: &str = "https://api.stripe.com/v1";

#[derive(Clone)]
pub struct PaymentService {
    pool: PgPool,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct StripePaymentIntent {
    id: String,
    client_secret: Option<String>,
    status: String,
    #[serde(default)]
    metadata: HashMap<String, String>,
}

impl PaymentService {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            client: Client::new(),
        }
    }

    fn stripe_key() -> Result<&'static str> {
        get_config()
            .stripe_secret_key
            .as_deref()
            .ok_or_else(|| Error::BadRequest("Stripe is not configured".to_string()))
    }

    /// Create a payment intent for a course purchase and record a pending
    /// payment row. Payments are independent of progress tracking.
    pub async fn create_payment_intent(
        &self,
        user_id: Uuid,
        course_id: Uuid,
    ) -> Result<PaymentIntentResponse> {
        let price: Option<Decimal> = sqlx::query_scalar("SELECT price FROM courses WHERE id = $1")
            .bind(course_id)
            .fetch_optional(&self.pool)
            .await?;
        let Some(price) = price else {
            return Err(Error::NotFound("Course not found".to_string()));
        };
        if price == Decimal::ZERO {
            return Err(Error::BadRequest("Course is free".to_string()));
        }

        let already_purchased: Option<Uuid> = sqlx::query_scalar(
            r#"
            SELECT id FROM payments
            WHERE user_id = $1 AND course_id = $2 AND status = $3
            "#,
        )
        .bind(user_id)
        .bind(course_id)
        .bind(PAYMENT_COMPLETED)
        .fetch_optional(&self.pool)
        .await?;
        if already_purchased.is_some() {
            return Err(Error::BadRequest("Course already purchased".to_string()));
        }

        let key = Self::stripe_key()?;
        let amount_cents = (price * Decimal::from(100))
            .round()
            .to_i64()
            .ok_or_else(|| Error::BadRequest("Invalid course price".to_string()))?;

        let intent: StripePaymentIntent = self
            .client
            .post(format!("{}/payment_intents", STRIPE_API_BASE))
            .bearer_auth(key)
            .form(&[
                ("amount", amount_cents.to_string()),
                ("currency", "usd".to_string()),
                ("metadata[user_id]", user_id.to_string()),
                ("metadata[course_id]", course_id.to_string()),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        sqlx::query(
            r#"
            INSERT INTO payments (user_id, course_id, amount, currency, status, stripe_payment_id)
            VALUES ($1, $2, $3, 'USD', $4, $5)
            "#,
        )
        .bind(user_id)
        .bind(course_id)
        .bind(price)
        .bind(PAYMENT_PENDING)
        .bind(&intent.id)
        .execute(&self.pool)
        .await?;

        Ok(PaymentIntentResponse {
            client_secret: intent.client_secret,
            payment_intent_id: intent.id,
        })
    }

    /// Reconcile a payment intent with the processor and mark the matching
    /// payment rows completed. Returns the course the purchase unlocks.
    pub async fn confirm_payment(&self, payment_intent_id: &str) -> Result<Option<Uuid>> {
        let key = Self::stripe_key()?;

        let intent: StripePaymentIntent = self
            .client
            .get(format!(
                "{}/payment_intents/{}",
                STRIPE_API_BASE, payment_intent_id
            ))
            .bearer_auth(key)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if intent.status != "succeeded" {
            return Err(Error::BadRequest("Payment not completed".to_string()));
        }

        sqlx::query(
            r#"
            UPDATE payments
            SET status = $2, updated_at = NOW()
            WHERE stripe_payment_id = $1
            "#,
        )
        .bind(&intent.id)
        .bind(PAYMENT_COMPLETED)
        .execute(&self.pool)
        .await?;

        let course_id = intent
            .metadata
            .get("course_id")
            .and_then(|raw| Uuid::parse_str(raw).ok());
        Ok(course_id)
    }

    pub async fn get_payment_history(&self, user_id: Uuid) -> Result<Vec<PaymentHistoryEntry>> {
        let entries = sqlx::query_as::<_, PaymentHistoryEntry>(
            r#"
            SELECT p.id, p.course_id, c.title AS course_title, c.thumbnail AS course_thumbnail,
                   p.amount, p.currency, p.status, p.created_at
            FROM payments p
            JOIN courses c ON c.id = p.course_id
            WHERE p.user_id = $1
            ORDER BY p.created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(entries)
    }

    pub async fn request_refund(&self, payment_id: Uuid, user_id: Uuid) -> Result<()> {
        let payment = sqlx::query_as::<_, Payment>(
            r#"
            SELECT id, user_id, course_id, amount, currency, status, stripe_payment_id,
                   created_at, updated_at
            FROM payments
            WHERE id = $1
            "#,
        )
        .bind(payment_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound("Payment not found".to_string()))?;

        if payment.user_id != user_id {
            return Err(Error::BadRequest(
                "You can only refund your own payments".to_string(),
            ));
        }
        if payment.status != PAYMENT_COMPLETED {
            return Err(Error::BadRequest(
                "Only completed payments can be refunded".to_string(),
            ));
        }

        if let (Some(intent_id), Some(key)) = (
            payment.stripe_payment_id.as_deref(),
            get_config().stripe_secret_key.as_deref(),
        ) {
            let response = self
                .client
                .post(format!("{}/refunds", STRIPE_API_BASE))
                .bearer_auth(key)
                .form(&[("payment_intent", intent_id)])
                .send()
                .await?;
            if !response.status().is_success() {
                return Err(Error::BadRequest("Failed to process refund".to_string()));
            }
        }

        sqlx::query(
            r#"
            UPDATE payments
            SET status = $2, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(payment_id)
        .bind(PAYMENT_REFUNDED)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Verify and apply a processor webhook. With no webhook secret
    /// configured the event is ignored.
    pub async fn handle_webhook(&self, body: &str, signature: Option<&str>) -> Result<bool> {
        let Some(secret) = get_config().stripe_webhook_secret.as_deref() else {
            return Ok(false);
        };
        let signature = signature
            .ok_or_else(|| Error::BadRequest("Missing Stripe-Signature header".to_string()))?;

        if !verify_stripe_signature(body, signature, secret) {
            return Err(Error::BadRequest(
                "Webhook signature verification failed".to_string(),
            ));
        }

        let event: serde_json::Value = serde_json::from_str(body)?;
        if event["type"] == "payment_intent.succeeded" {
            if let Some(intent_id) = event["data"]["object"]["id"].as_str() {
                self.confirm_payment(intent_id).await?;
            }
        }

        Ok(true)
    }
}
