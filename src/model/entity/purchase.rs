use crate::impl_paginatable_for;
use crate::model::access::HasOwner;
use crate::model::repo::ResourceTyped;
use crate::model::{ModelManager, error::DatabaseResult, repo::CrudRepository};
use crate::web::AuthenticatedUser;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
pub struct Purchase {
    id: Uuid,
    student_id: Uuid,
    course_id: Uuid,
    status: String,
    price_cents: i64,
    discount_cents: i64,
    total_cents: i64,
    promo_code: String,
    payment_method_id: Option<Uuid>,
    transaction_id: Option<String>,
    created_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    refund_reason: String,
    refunded_at: Option<DateTime<Utc>>,
    refund_amount_cents: Option<i64>,
}

#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct PurchaseCreate {
    pub course_id: Uuid,
    pub price_cents: i64,
    pub discount_cents: i64,
    pub total_cents: i64,
    pub promo_code: String,
    pub payment_method_id: Option<Uuid>,
}

impl ResourceTyped for Purchase {
    fn get_resource_type() -> crate::model::ResourceType {
        crate::model::ResourceType::Purchase
    }
}

impl Purchase {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn student_id(&self) -> Uuid {
        self.student_id
    }

    pub fn course_id(&self) -> Uuid {
        self.course_id
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn is_completed(&self) -> bool {
        self.status == "completed"
    }

    pub fn price_cents(&self) -> i64 {
        self.price_cents
    }

    pub fn discount_cents(&self) -> i64 {
        self.discount_cents
    }

    pub fn total_cents(&self) -> i64 {
        self.total_cents
    }

    pub fn promo_code(&self) -> &str {
        &self.promo_code
    }

    pub fn payment_method_id(&self) -> Option<Uuid> {
        self.payment_method_id
    }

    pub fn transaction_id(&self) -> Option<&str> {
        self.transaction_id.as_deref()
    }
}

#[async_trait]
impl CrudRepository<Purchase, PurchaseCreate, uuid::Uuid> for Purchase {
    async fn create(
        mm: &ModelManager,
        actor: &AuthenticatedUser,
        data: PurchaseCreate,
    ) -> DatabaseResult<Self> {
        let row = sqlx::query_as(
            r#"
            INSERT INTO purchases (id, student_id, course_id, price_cents, discount_cents,
                total_cents, promo_code, payment_method_id)
            VALUES ($1,$2,$3,$4,$5,$6,$7,$8)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(actor.user_id())
        .bind(data.course_id)
        .bind(data.price_cents)
        .bind(data.discount_cents)
        .bind(data.total_cents)
        .bind(&data.promo_code)
        .bind(data.payment_method_id)
        .fetch_one(mm.executor())
        .await?;

        Ok(row)
    }

    async fn update(
        self,
        _mm: &ModelManager,
        _actor: &AuthenticatedUser,
        _data: PurchaseCreate,
    ) -> DatabaseResult<Self> {
        unimplemented!("Purchases move through their status transitions only");
    }

    async fn delete(self, mm: &ModelManager, _actor: &AuthenticatedUser) -> DatabaseResult<()> {
        sqlx::query("DELETE FROM purchases WHERE id = $1")
            .bind(self.id)
            .execute(mm.executor())
            .await?;
        Ok(())
    }

    async fn find_by_id(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        id: uuid::Uuid,
    ) -> DatabaseResult<Option<Self>> {
        let result = sqlx::query_as("SELECT * FROM purchases WHERE id = $1")
            .bind(id)
            .fetch_one(mm.executor())
            .await;
        if let Err(sqlx::Error::RowNotFound) = result {
            return Ok(None);
        }

        Ok(Some(result?))
    }

    async fn list(
        mm: &ModelManager,
        actor: &AuthenticatedUser,
        limit: i64,
        offset: i64,
    ) -> DatabaseResult<Vec<Self>> {
        let result = sqlx::query_as(
            "SELECT * FROM purchases WHERE student_id = $1 ORDER BY created_at DESC LIMIT $2 OFFSET $3",
        )
        .bind(actor.user_id())
        .bind(limit)
        .bind(offset)
        .fetch_all(mm.executor())
        .await?;
        Ok(result)
    }

    async fn count(mm: &ModelManager, actor: &AuthenticatedUser) -> DatabaseResult<i64> {
        let result: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM purchases WHERE student_id = $1")
                .bind(actor.user_id())
                .fetch_one(mm.executor())
                .await?;

        Ok(result)
    }
}

impl_paginatable_for!(Purchase, PurchaseCreate, Uuid);

#[async_trait]
impl HasOwner for Purchase {
    type OwnerId = uuid::Uuid;

    async fn get_owner_id(
        &self,
        _mm: &ModelManager,
        _actor: &AuthenticatedUser,
    ) -> DatabaseResult<Self::OwnerId> {
        Ok(self.student_id)
    }
}

// Status transitions

impl Purchase {
    pub async fn find_by_student_course(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        student_id: Uuid,
        course_id: Uuid,
    ) -> DatabaseResult<Option<Self>> {
        let result =
            sqlx::query_as("SELECT * FROM purchases WHERE student_id = $1 AND course_id = $2")
                .bind(student_id)
                .bind(course_id)
                .fetch_optional(mm.executor())
                .await?;
        Ok(result)
    }

    pub async fn mark_completed(
        self,
        mm: &ModelManager,
        transaction_id: &str,
    ) -> DatabaseResult<Self> {
        let row = sqlx::query_as(
            r#"
            UPDATE purchases
            SET status = 'completed', transaction_id = $1, completed_at = now()
            WHERE id = $2
            RETURNING *
            "#,
        )
        .bind(transaction_id)
        .bind(self.id)
        .fetch_one(mm.executor())
        .await?;

        Ok(row)
    }

    pub async fn mark_failed(self, mm: &ModelManager) -> DatabaseResult<Self> {
        let row = sqlx::query_as(
            "UPDATE purchases SET status = 'failed' WHERE id = $1 RETURNING *",
        )
        .bind(self.id)
        .fetch_one(mm.executor())
        .await?;

        Ok(row)
    }

    pub async fn mark_refunded(
        self,
        mm: &ModelManager,
        reason: &str,
        amount_cents: i64,
    ) -> DatabaseResult<Self> {
        let row = sqlx::query_as(
            r#"
            UPDATE purchases
            SET status = 'refunded', refund_reason = $1, refunded_at = now(), refund_amount_cents = $2
            WHERE id = $3
            RETURNING *
            "#,
        )
        .bind(reason)
        .bind(amount_cents)
        .bind(self.id)
        .fetch_one(mm.executor())
        .await?;

        Ok(row)
    }
}
