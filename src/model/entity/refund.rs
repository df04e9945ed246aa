use crate::model::access::HasOwner;
use crate::model::repo::ResourceTyped;
use crate::model::{ModelManager, error::DatabaseResult};
use crate::web::AuthenticatedUser;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
pub struct Refund {
    id: Uuid,
    purchase_id: Uuid,
    student_id: Uuid,
    reason: String,
    status: String,
    refund_amount_cents: i64,
    requested_at: DateTime<Utc>,
    processed_at: Option<DateTime<Utc>>,
    rejection_reason: String,
}

#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct RefundCreate {
    pub purchase_id: Uuid,
    pub reason: String,
    pub refund_amount_cents: i64,
}

impl ResourceTyped for Refund {
    fn get_resource_type() -> crate::model::ResourceType {
        crate::model::ResourceType::Refund
    }
}

impl Refund {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn purchase_id(&self) -> Uuid {
        self.purchase_id
    }

    pub fn student_id(&self) -> Uuid {
        self.student_id
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn is_pending(&self) -> bool {
        self.status == "pending"
    }

    pub fn refund_amount_cents(&self) -> i64 {
        self.refund_amount_cents
    }
}

#[async_trait]
impl HasOwner for Refund {
    type OwnerId = uuid::Uuid;

    async fn get_owner_id(
        &self,
        _mm: &ModelManager,
        _actor: &AuthenticatedUser,
    ) -> DatabaseResult<Self::OwnerId> {
        Ok(self.student_id)
    }
}

impl Refund {
    pub async fn create(
        mm: &ModelManager,
        actor: &AuthenticatedUser,
        data: RefundCreate,
    ) -> DatabaseResult<Self> {
        let row = sqlx::query_as(
            r#"
            INSERT INTO refunds (id, purchase_id, student_id, reason, refund_amount_cents)
            VALUES ($1,$2,$3,$4,$5)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(data.purchase_id)
        .bind(actor.user_id())
        .bind(&data.reason)
        .bind(data.refund_amount_cents)
        .fetch_one(mm.executor())
        .await?;

        Ok(row)
    }

    pub async fn find_by_id(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        id: Uuid,
    ) -> DatabaseResult<Option<Self>> {
        let result = sqlx::query_as("SELECT * FROM refunds WHERE id = $1")
            .bind(id)
            .fetch_optional(mm.executor())
            .await?;
        Ok(result)
    }

    pub async fn find_pending_by_purchase(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        purchase_id: Uuid,
    ) -> DatabaseResult<Option<Self>> {
        let result = sqlx::query_as(
            "SELECT * FROM refunds WHERE purchase_id = $1 AND status = 'pending'",
        )
        .bind(purchase_id)
        .fetch_optional(mm.executor())
        .await?;
        Ok(result)
    }

    pub async fn all_pending(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
    ) -> DatabaseResult<Vec<Self>> {
        let rows: Vec<Self> = sqlx::query_as(
            "SELECT * FROM refunds WHERE status = 'pending' ORDER BY requested_at",
        )
        .fetch_all(mm.executor())
        .await?;
        Ok(rows)
    }

    /// The money is "sent back" immediately once approved, so the record
    /// jumps straight to `completed`.
    pub async fn approve(self, mm: &ModelManager) -> DatabaseResult<Self> {
        let row = sqlx::query_as(
            r#"
            UPDATE refunds
            SET status = 'completed', processed_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(self.id)
        .fetch_one(mm.executor())
        .await?;

        Ok(row)
    }

    pub async fn reject(self, mm: &ModelManager, rejection_reason: &str) -> DatabaseResult<Self> {
        let row = sqlx::query_as(
            r#"
            UPDATE refunds
            SET status = 'rejected', processed_at = now(), rejection_reason = $1
            WHERE id = $2
            RETURNING *
            "#,
        )
        .bind(rejection_reason)
        .bind(self.id)
        .fetch_one(mm.executor())
        .await?;

        Ok(row)
    }
}
