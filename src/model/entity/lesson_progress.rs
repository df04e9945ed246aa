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
pub struct LessonProgress {
    id: Uuid,
    enrollment_id: Uuid,
    lesson_id: Uuid,
    completed: bool,
    completed_at: Option<DateTime<Utc>>,
    last_position: i32,
}

#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct LessonProgressCreate {
    pub enrollment_id: Uuid,
    pub lesson_id: Uuid,
}

impl ResourceTyped for LessonProgress {
    fn get_resource_type() -> crate::model::ResourceType {
        crate::model::ResourceType::LessonProgress
    }
}

impl LessonProgress {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn enrollment_id(&self) -> Uuid {
        self.enrollment_id
    }

    pub fn lesson_id(&self) -> Uuid {
        self.lesson_id
    }

    pub fn completed(&self) -> bool {
        self.completed
    }

    pub fn last_position(&self) -> i32 {
        self.last_position
    }
}

#[async_trait]
impl CrudRepository<LessonProgress, LessonProgressCreate, uuid::Uuid> for LessonProgress {
    async fn create(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        data: LessonProgressCreate,
    ) -> DatabaseResult<Self> {
        let row = sqlx::query_as(
            r#"
            INSERT INTO lesson_progress (id, enrollment_id, lesson_id)
            VALUES ($1,$2,$3)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(data.enrollment_id)
        .bind(data.lesson_id)
        .fetch_one(mm.executor())
        .await?;

        Ok(row)
    }

    async fn update(
        self,
        _mm: &ModelManager,
        _actor: &AuthenticatedUser,
        _data: LessonProgressCreate,
    ) -> DatabaseResult<Self> {
        unimplemented!("Lesson progress is marked, not edited");
    }

    async fn delete(self, mm: &ModelManager, _actor: &AuthenticatedUser) -> DatabaseResult<()> {
        sqlx::query("DELETE FROM lesson_progress WHERE id = $1")
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
        let result = sqlx::query_as("SELECT * FROM lesson_progress WHERE id = $1")
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
        let result = sqlx::query_as("SELECT * FROM lesson_progress LIMIT $1 OFFSET $2")
            .bind(limit)
            .bind(offset)
            .fetch_all(mm.executor())
            .await?;
        Ok(result)
    }

    async fn count(mm: &ModelManager, _actor: &AuthenticatedUser) -> DatabaseResult<i64> {
        let result: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM lesson_progress")
            .fetch_one(mm.executor())
            .await?;

        Ok(result)
    }
}

#[async_trait]
impl HasOwner for LessonProgress {
    type OwnerId = uuid::Uuid;

    async fn get_owner_id(
        &self,
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
    ) -> DatabaseResult<Self::OwnerId> {
        let student_id: Uuid =
            sqlx::query_scalar("SELECT student_id FROM enrollments WHERE id = $1")
                .bind(self.enrollment_id)
                .fetch_one(mm.executor())
                .await?;
        Ok(student_id)
    }
}

// Utils

impl LessonProgress {
    pub async fn get_or_create(
        mm: &ModelManager,
        actor: &AuthenticatedUser,
        enrollment_id: Uuid,
        lesson_id: Uuid,
    ) -> DatabaseResult<Self> {
        let existing = sqlx::query_as(
            "SELECT * FROM lesson_progress WHERE enrollment_id = $1 AND lesson_id = $2",
        )
        .bind(enrollment_id)
        .bind(lesson_id)
        .fetch_optional(mm.executor())
        .await?;

        if let Some(row) = existing {
            return Ok(row);
        }

        Self::create(
            mm,
            actor,
            LessonProgressCreate {
                enrollment_id,
                lesson_id,
            },
        )
        .await
    }

    pub async fn mark_completed(mut self, mm: &ModelManager) -> DatabaseResult<Self> {
        if self.completed {
            return Ok(self);
        }

        sqlx::query(
            "UPDATE lesson_progress SET completed = TRUE, completed_at = now() WHERE id = $1",
        )
        .bind(self.id)
        .execute(mm.executor())
        .await?;

        self.completed = true;
        self.completed_at = Some(Utc::now());
        Ok(self)
    }

    pub async fn save_position(mut self, mm: &ModelManager, position: i32) -> DatabaseResult<Self> {
        sqlx::query("UPDATE lesson_progress SET last_position = $1 WHERE id = $2")
            .bind(position)
            .bind(self.id)
            .execute(mm.executor())
            .await?;

        self.last_position = position;
        Ok(self)
    }
}
