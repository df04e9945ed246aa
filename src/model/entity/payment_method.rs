use crate::model::access::HasOwner;
use crate::model::repo::ResourceTyped;
use crate::model::{ModelManager, error::DatabaseResult, repo::CrudRepository};
use crate::web::AuthenticatedUser;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
pub struct PaymentMethod {
    id: Uuid,
    name: String,
    kind: String,
    description: String,
    is_active: bool,
    logo_url: String,
}

#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct PaymentMethodCreate {
    pub name: String,
    pub kind: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "PaymentMethodCreate::default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub logo_url: String,
}

impl PaymentMethodCreate {
    fn default_active() -> bool {
        true
    }
}

impl ResourceTyped for PaymentMethod {
    fn get_resource_type() -> crate::model::ResourceType {
        crate::model::ResourceType::PaymentMethod
    }
}

impl PaymentMethod {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }
}

#[async_trait]
impl CrudRepository<PaymentMethod, PaymentMethodCreate, uuid::Uuid> for PaymentMethod {
    async fn create(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        data: PaymentMethodCreate,
    ) -> DatabaseResult<Self> {
        let row = sqlx::query_as(
            r#"
            INSERT INTO payment_methods (id, name, kind, description, is_active, logo_url)
            VALUES ($1,$2,$3,$4,$5,$6)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&data.name)
        .bind(&data.kind)
        .bind(&data.description)
        .bind(data.is_active)
        .bind(&data.logo_url)
        .fetch_one(mm.executor())
        .await?;

        Ok(row)
    }

    async fn update(
        mut self,
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        data: PaymentMethodCreate,
    ) -> DatabaseResult<Self> {
        sqlx::query(
            "UPDATE payment_methods SET name = $1, kind = $2, description = $3, is_active = $4, logo_url = $5 WHERE id = $6",
        )
        .bind(&data.name)
        .bind(&data.kind)
        .bind(&data.description)
        .bind(data.is_active)
        .bind(&data.logo_url)
        .bind(self.id)
        .execute(mm.executor())
        .await?;

        self.name = data.name;
        self.kind = data.kind;
        self.description = data.description;
        self.is_active = data.is_active;
        self.logo_url = data.logo_url;
        Ok(self)
    }

    async fn delete(self, mm: &ModelManager, _actor: &AuthenticatedUser) -> DatabaseResult<()> {
        sqlx::query("DELETE FROM payment_methods WHERE id = $1")
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
        let result = sqlx::query_as("SELECT * FROM payment_methods WHERE id = $1")
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
        _actor: &AuthenticatedUser,
        limit: i64,
        offset: i64,
    ) -> DatabaseResult<Vec<Self>> {
        let result = sqlx::query_as("SELECT * FROM payment_methods ORDER BY name LIMIT $1 OFFSET $2")
            .bind(limit)
            .bind(offset)
            .fetch_all(mm.executor())
            .await?;
        Ok(result)
    }

    async fn count(mm: &ModelManager, _actor: &AuthenticatedUser) -> DatabaseResult<i64> {
        let result: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM payment_methods")
            .fetch_one(mm.executor())
            .await?;

        Ok(result)
    }
}

#[async_trait]
impl HasOwner for PaymentMethod {
    type OwnerId = uuid::Uuid;

    async fn get_owner_id(
        &self,
        _mm: &ModelManager,
        _actor: &AuthenticatedUser,
    ) -> DatabaseResult<Self::OwnerId> {
        Ok(self.id) // admin-managed
    }
}

impl PaymentMethod {
    pub async fn all_active(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
    ) -> DatabaseResult<Vec<Self>> {
        let rows: Vec<Self> =
            sqlx::query_as("SELECT * FROM payment_methods WHERE is_active = TRUE ORDER BY name")
                .fetch_all(mm.executor())
                .await?;
        Ok(rows)
    }
}
