use crate::impl_paginatable_for;
use crate::model::access::HasOwner;
use crate::model::repo::ResourceTyped;
use crate::model::{ModelManager, error::DatabaseResult, repo::CrudRepository};
use crate::utils::slug::slugify;
use crate::web::AuthenticatedUser;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use sqlx::prelude::Row;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
pub struct Category {
    id: Uuid,
    name: String,
    slug: String,
    description: String,
    icon: String,
}

#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct CategoryCreate {
    pub name: String,
    pub description: String,
    pub icon: String,
}

impl ResourceTyped for Category {
    fn get_resource_type() -> crate::model::ResourceType {
        crate::model::ResourceType::Category
    }
}

impl Category {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn slug(&self) -> &str {
        &self.slug
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn icon(&self) -> &str {
        &self.icon
    }

    async fn unique_slug(mm: &ModelManager, name: &str, own_id: Uuid) -> DatabaseResult<String> {
        let mut base = slugify(name);
        if base.is_empty() {
            base = String::from("category");
        }

        let mut slug = base.clone();
        let mut counter = 1;
        loop {
            let taken: i64 = sqlx::query_scalar(
                "SELECT COUNT(*) FROM categories WHERE slug = $1 AND id <> $2",
            )
            .bind(&slug)
            .bind(own_id)
            .fetch_one(mm.executor())
            .await?;

            if taken == 0 {
                return Ok(slug);
            }
            slug = format!("{base}-{counter}");
            counter += 1;
        }
    }
}

#[async_trait]
impl CrudRepository<Category, CategoryCreate, uuid::Uuid> for Category {
    async fn create(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        data: CategoryCreate,
    ) -> DatabaseResult<Self> {
        let id = Uuid::new_v4();
        let slug = Self::unique_slug(mm, &data.name, id).await?;

        let result = sqlx::query(
            "INSERT INTO categories (id, name, slug, description, icon) VALUES ($1,$2,$3,$4,$5) RETURNING id",
        )
        .bind(id)
        .bind(&data.name)
        .bind(&slug)
        .bind(&data.description)
        .bind(&data.icon)
        .fetch_one(mm.executor())
        .await?;

        let id = result.try_get("id")?;
        Ok(Category {
            id,
            name: data.name,
            slug,
            description: data.description,
            icon: data.icon,
        })
    }

    async fn update(
        mut self,
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        data: CategoryCreate,
    ) -> DatabaseResult<Self> {
        sqlx::query("UPDATE categories SET name = $1, description = $2, icon = $3 WHERE id = $4")
            .bind(&data.name)
            .bind(&data.description)
            .bind(&data.icon)
            .bind(self.id)
            .execute(mm.executor())
            .await?;

        self.name = data.name;
        self.description = data.description;
        self.icon = data.icon;
        Ok(self)
    }

    async fn delete(self, mm: &ModelManager, _actor: &AuthenticatedUser) -> DatabaseResult<()> {
        sqlx::query("DELETE FROM categories WHERE id = $1")
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
        let result = sqlx::query_as("SELECT * FROM categories WHERE id = $1")
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
        let result = sqlx::query_as("SELECT * FROM categories ORDER BY name LIMIT $1 OFFSET $2")
            .bind(limit)
            .bind(offset)
            .fetch_all(mm.executor())
            .await?;
        Ok(result)
    }

    async fn count(mm: &ModelManager, _actor: &AuthenticatedUser) -> DatabaseResult<i64> {
        let result: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM categories")
            .fetch_one(mm.executor())
            .await?;

        Ok(result)
    }
}

impl_paginatable_for!(Category, CategoryCreate, Uuid);

#[async_trait]
impl HasOwner for Category {
    type OwnerId = uuid::Uuid;

    async fn get_owner_id(
        &self,
        _mm: &ModelManager,
        _actor: &AuthenticatedUser,
    ) -> DatabaseResult<Self::OwnerId> {
        Ok(self.id) // categories are admin-managed, no per-user owner
    }
}

impl Category {
    pub async fn all(mm: &ModelManager, _actor: &AuthenticatedUser) -> DatabaseResult<Vec<Self>> {
        let result = sqlx::query_as("SELECT * FROM categories ORDER BY name")
            .fetch_all(mm.executor())
            .await?;
        Ok(result)
    }
}
