use crate::model::access::HasOwner;
use crate::model::repo::ResourceTyped;
use crate::model::{ModelManager, error::DatabaseResult};
use crate::payments::ProcessorCharge;
use crate::web::AuthenticatedUser;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
pub struct Payment {
    id: Uuid,
    purchase_id: Uuid,
    amount_cents: i64,
    currency: String,
    status: String,
    stripe_payment_intent_id: String,
    stripe_client_secret: String,
    paypal_order_id: String,
    yookassa_payment_id: String,
    error_message: String,
    completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct PaymentCreate {
    pub purchase_id: Uuid,
    pub amount_cents: i64,
    pub currency: String,
}

impl ResourceTyped for Payment {
    fn get_resource_type() -> crate::model::ResourceType {
        crate::model::ResourceType::Payment
    }
}

impl Payment {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn purchase_id(&self) -> Uuid {
        self.purchase_id
    }

    pub fn amount_cents(&self) -> i64 {
        self.amount_cents
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    pub fn status(&self) -> &str {
        &self.status
    }
}

#[async_trait]
impl HasOwner for Payment {
    type OwnerId = uuid::Uuid;

    async fn get_owner_id(
        &self,
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
    ) -> DatabaseResult<Self::OwnerId> {
        let student_id: Uuid =
            sqlx::query_scalar("SELECT student_id FROM purchases WHERE id = $1")
                .bind(self.purchase_id)
                .fetch_one(mm.executor())
                .await?;
        Ok(student_id)
    }
}

impl Payment {
    /// Records the processor handshake. One payment per purchase; re-paying
    /// a failed purchase replaces the old record's processor references.
    pub async fn record_charge(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        data: PaymentCreate,
        charge: &ProcessorCharge,
    ) -> DatabaseResult<Self> {
        let row = sqlx::query_as(
            r#"
            INSERT INTO payments (id, purchase_id, amount_cents, currency, status,
                stripe_payment_intent_id, stripe_client_secret, paypal_order_id, yookassa_payment_id)
            VALUES ($1,$2,$3,$4,'pending',$5,$6,$7,$8)
            ON CONFLICT (purchase_id) DO UPDATE
            SET amount_cents = EXCLUDED.amount_cents,
                currency = EXCLUDED.currency,
                status = 'pending',
                stripe_payment_intent_id = EXCLUDED.stripe_payment_intent_id,
                stripe_client_secret = EXCLUDED.stripe_client_secret,
                paypal_order_id = EXCLUDED.paypal_order_id,
                yookassa_payment_id = EXCLUDED.yookassa_payment_id,
                error_message = '',
                updated_at = now()
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(data.purchase_id)
        .bind(data.amount_cents)
        .bind(&data.currency)
        .bind(charge.stripe_payment_intent_id.as_deref().unwrap_or(""))
        .bind(charge.stripe_client_secret.as_deref().unwrap_or(""))
        .bind(charge.paypal_order_id.as_deref().unwrap_or(""))
        .bind(charge.yookassa_payment_id.as_deref().unwrap_or(""))
        .fetch_one(mm.executor())
        .await?;

        Ok(row)
    }

    pub async fn find_by_purchase(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        purchase_id: Uuid,
    ) -> DatabaseResult<Option<Self>> {
        let result = sqlx::query_as("SELECT * FROM payments WHERE purchase_id = $1")
            .bind(purchase_id)
            .fetch_optional(mm.executor())
            .await?;
        Ok(result)
    }

    pub async fn mark_succeeded(self, mm: &ModelManager) -> DatabaseResult<Self> {
        let row = sqlx::query_as(
            r#"
            UPDATE payments
            SET status = 'succeeded', completed_at = now(), updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(self.id)
        .fetch_one(mm.executor())
        .await?;

        Ok(row)
    }

    pub async fn mark_failed(self, mm: &ModelManager, error: &str) -> DatabaseResult<Self> {
        let row = sqlx::query_as(
            r#"
            UPDATE payments
            SET status = 'failed', error_message = $1, updated_at = now()
            WHERE id = $2
            RETURNING *
            "#,
        )
        .bind(error)
        .bind(self.id)
        .fetch_one(mm.executor())
        .await?;

        Ok(row)
    }

    pub async fn mark_canceled(self, mm: &ModelManager) -> DatabaseResult<Self> {
        let row = sqlx::query_as(
            "UPDATE payments SET status = 'canceled', updated_at = now() WHERE id = $1 RETURNING *",
        )
        .bind(self.id)
        .fetch_one(mm.executor())
        .await?;

        Ok(row)
    }
}
