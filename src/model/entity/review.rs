use crate::impl_paginatable_for;
use crate::model::access::HasOwner;
use crate::model::repo::ResourceTyped;
use crate::model::{ModelManager, error::DatabaseResult, repo::CrudRepository};
use crate::web::AuthenticatedUser;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
pub struct Review {
    id: Uuid,
    course_id: Uuid,
    student_id: Uuid,
    rating: i32,
    title: String,
    comment: String,
    is_approved: bool,
}

#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct ReviewCreate {
    pub course_id: Uuid,
    pub rating: i32,
    #[serde(default)]
    pub title: String,
    pub comment: String,
}

impl ResourceTyped for Review {
    fn get_resource_type() -> crate::model::ResourceType {
        crate::model::ResourceType::Review
    }
}

impl Review {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn course_id(&self) -> Uuid {
        self.course_id
    }

    pub fn student_id(&self) -> Uuid {
        self.student_id
    }

    pub fn rating(&self) -> i32 {
        self.rating
    }
}

#[async_trait]
impl CrudRepository<Review, ReviewCreate, uuid::Uuid> for Review {
    async fn create(
        mm: &ModelManager,
        actor: &AuthenticatedUser,
        data: ReviewCreate,
    ) -> DatabaseResult<Self> {
        let row: Review = sqlx::query_as(
            r#"
            INSERT INTO reviews (id, course_id, student_id, rating, title, comment)
            VALUES ($1,$2,$3,$4,$5,$6)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(data.course_id)
        .bind(actor.user_id())
        .bind(data.rating)
        .bind(&data.title)
        .bind(&data.comment)
        .fetch_one(mm.executor())
        .await?;

        Self::refresh_course_stats(mm, row.course_id).await?;
        Ok(row)
    }

    async fn update(
        mut self,
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        data: ReviewCreate,
    ) -> DatabaseResult<Self> {
        sqlx::query(
            "UPDATE reviews SET rating = $1, title = $2, comment = $3, updated_at = now() WHERE id = $4",
        )
        .bind(data.rating)
        .bind(&data.title)
        .bind(&data.comment)
        .bind(self.id)
        .execute(mm.executor())
        .await?;

        self.rating = data.rating;
        self.title = data.title;
        self.comment = data.comment;
        Self::refresh_course_stats(mm, self.course_id).await?;
        Ok(self)
    }

    async fn delete(self, mm: &ModelManager, _actor: &AuthenticatedUser) -> DatabaseResult<()> {
        sqlx::query("DELETE FROM reviews WHERE id = $1")
            .bind(self.id)
            .execute(mm.executor())
            .await?;
        Self::refresh_course_stats(mm, self.course_id).await?;
        Ok(())
    }

    async fn find_by_id(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        id: uuid::Uuid,
    ) -> DatabaseResult<Option<Self>> {
        let result = sqlx::query_as("SELECT * FROM reviews WHERE id = $1")
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
        let result =
            sqlx::query_as("SELECT * FROM reviews ORDER BY created_at DESC LIMIT $1 OFFSET $2")
                .bind(limit)
                .bind(offset)
                .fetch_all(mm.executor())
                .await?;
        Ok(result)
    }

    async fn count(mm: &ModelManager, _actor: &AuthenticatedUser) -> DatabaseResult<i64> {
        let result: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM reviews")
            .fetch_one(mm.executor())
            .await?;

        Ok(result)
    }
}

impl_paginatable_for!(Review, ReviewCreate, Uuid);

#[async_trait]
impl HasOwner for Review {
    type OwnerId = uuid::Uuid;

    async fn get_owner_id(
        &self,
        _mm: &ModelManager,
        _actor: &AuthenticatedUser,
    ) -> DatabaseResult<Self::OwnerId> {
        Ok(self.student_id)
    }
}

// Utils

impl Review {
    pub async fn find_by_course_student(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        course_id: Uuid,
        student_id: Uuid,
    ) -> DatabaseResult<Option<Self>> {
        let result =
            sqlx::query_as("SELECT * FROM reviews WHERE course_id = $1 AND student_id = $2")
                .bind(course_id)
                .bind(student_id)
                .fetch_optional(mm.executor())
                .await?;
        Ok(result)
    }

    pub async fn approved_by_course(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        course_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> DatabaseResult<Vec<Self>> {
        let result = sqlx::query_as(
            r#"
            SELECT * FROM reviews
            WHERE course_id = $1 AND is_approved = TRUE
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(course_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(mm.executor())
        .await?;
        Ok(result)
    }

    /// Keeps the denormalized rating columns on the course in sync with its
    /// approved reviews.
    pub async fn refresh_course_stats(mm: &ModelManager, course_id: Uuid) -> DatabaseResult<()> {
        sqlx::query(
            r#"
            UPDATE courses c
            SET average_rating = COALESCE(r.avg_rating, 0),
                total_reviews = COALESCE(r.review_count, 0)
            FROM (
                SELECT AVG(rating)::double precision AS avg_rating, COUNT(*)::integer AS review_count
                FROM reviews
                WHERE course_id = $1 AND is_approved = TRUE
            ) r
            WHERE c.id = $1
            "#,
        )
        .bind(course_id)
        .execute(mm.executor())
        .await?;
        Ok(())
    }
}
