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
pub struct LessonComment {
    id: Uuid,
    lesson_id: Uuid,
    author_id: Uuid,
    content: String,
    reply_to: Option<Uuid>,
    is_pinned: bool,
    is_approved: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct LessonCommentCreate {
    pub lesson_id: Uuid,
    pub content: String,
    pub reply_to: Option<Uuid>,
}

impl ResourceTyped for LessonComment {
    fn get_resource_type() -> crate::model::ResourceType {
        crate::model::ResourceType::LessonComment
    }
}

impl LessonComment {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn lesson_id(&self) -> Uuid {
        self.lesson_id
    }

    pub fn author_id(&self) -> Uuid {
        self.author_id
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn reply_to(&self) -> Option<Uuid> {
        self.reply_to
    }

    pub fn is_pinned(&self) -> bool {
        self.is_pinned
    }

    pub fn is_edited(&self) -> bool {
        self.updated_at > self.created_at
    }
}

#[async_trait]
impl CrudRepository<LessonComment, LessonCommentCreate, uuid::Uuid> for LessonComment {
    async fn create(
        mm: &ModelManager,
        actor: &AuthenticatedUser,
        data: LessonCommentCreate,
    ) -> DatabaseResult<Self> {
        let row = sqlx::query_as(
            r#"
            INSERT INTO lesson_comments (id, lesson_id, author_id, content, reply_to)
            VALUES ($1,$2,$3,$4,$5)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(data.lesson_id)
        .bind(actor.user_id())
        .bind(&data.content)
        .bind(data.reply_to)
        .fetch_one(mm.executor())
        .await?;

        Ok(row)
    }

    async fn update(
        mut self,
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        data: LessonCommentCreate,
    ) -> DatabaseResult<Self> {
        sqlx::query("UPDATE lesson_comments SET content = $1, updated_at = now() WHERE id = $2")
            .bind(&data.content)
            .bind(self.id)
            .execute(mm.executor())
            .await?;

        self.content = data.content;
        self.updated_at = Utc::now();
        Ok(self)
    }

    async fn delete(self, mm: &ModelManager, _actor: &AuthenticatedUser) -> DatabaseResult<()> {
        sqlx::query("DELETE FROM lesson_comments WHERE id = $1")
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
        let result = sqlx::query_as("SELECT * FROM lesson_comments WHERE id = $1")
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
        let result = sqlx::query_as(
            "SELECT * FROM lesson_comments ORDER BY created_at DESC LIMIT $1 OFFSET $2",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(mm.executor())
        .await?;
        Ok(result)
    }

    async fn count(mm: &ModelManager, _actor: &AuthenticatedUser) -> DatabaseResult<i64> {
        let result: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM lesson_comments")
            .fetch_one(mm.executor())
            .await?;

        Ok(result)
    }
}

#[async_trait]
impl HasOwner for LessonComment {
    type OwnerId = uuid::Uuid;

    async fn get_owner_id(
        &self,
        _mm: &ModelManager,
        _actor: &AuthenticatedUser,
    ) -> DatabaseResult<Self::OwnerId> {
        Ok(self.author_id)
    }
}

// Utils

impl LessonComment {
    /// Pinned first, then newest, approved only.
    pub async fn all_by_lesson(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        lesson_id: Uuid,
    ) -> DatabaseResult<Vec<Self>> {
        let rows: Vec<Self> = sqlx::query_as(
            r#"
            SELECT * FROM lesson_comments
            WHERE lesson_id = $1 AND is_approved = TRUE
            ORDER BY is_pinned DESC, created_at DESC
            "#,
        )
        .bind(lesson_id)
        .fetch_all(mm.executor())
        .await?;
        Ok(rows)
    }

    pub async fn set_pinned(mut self, mm: &ModelManager, pinned: bool) -> DatabaseResult<Self> {
        sqlx::query("UPDATE lesson_comments SET is_pinned = $1 WHERE id = $2")
            .bind(pinned)
            .bind(self.id)
            .execute(mm.executor())
            .await?;

        self.is_pinned = pinned;
        Ok(self)
    }
}
