use crate::impl_paginatable_for;
use crate::model::access::HasOwner;
use crate::model::repo::ResourceTyped;
use crate::model::{ModelManager, error::DatabaseResult, repo::CrudRepository};
use crate::web::AuthenticatedUser;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use sqlx::prelude::Row;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
pub struct Lesson {
    id: Uuid,
    section_id: Uuid,
    title: String,
    lesson_type: String,
    order_index: i32,
    content: String,
    video_url: String,
    duration_minutes: i32,
    is_preview: bool,
}

#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct LessonCreate {
    pub section_id: Uuid,
    pub title: String,
    #[serde(default = "LessonCreate::default_type")]
    pub lesson_type: String,
    pub order_index: Option<i32>,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub video_url: String,
    #[serde(default)]
    pub duration_minutes: i32,
    #[serde(default)]
    pub is_preview: bool,
}

impl LessonCreate {
    fn default_type() -> String {
        String::from("video")
    }
}

impl ResourceTyped for Lesson {
    fn get_resource_type() -> crate::model::ResourceType {
        crate::model::ResourceType::Lesson
    }
}

impl Lesson {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn section_id(&self) -> Uuid {
        self.section_id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn lesson_type(&self) -> &str {
        &self.lesson_type
    }

    pub fn order_index(&self) -> i32 {
        self.order_index
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn video_url(&self) -> &str {
        &self.video_url
    }

    pub fn duration_minutes(&self) -> i32 {
        self.duration_minutes
    }

    pub fn is_preview(&self) -> bool {
        self.is_preview
    }
}

#[async_trait]
impl CrudRepository<Lesson, LessonCreate, uuid::Uuid> for Lesson {
    async fn create(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        data: LessonCreate,
    ) -> DatabaseResult<Self> {
        let order_index = match data.order_index {
            Some(order) => order,
            None => Self::next_order_index(mm, data.section_id).await?,
        };

        let result = sqlx::query(
            r#"
            INSERT INTO lessons (id, section_id, title, lesson_type, order_index, content,
                video_url, duration_minutes, is_preview)
            VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9)
            RETURNING id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(data.section_id)
        .bind(&data.title)
        .bind(&data.lesson_type)
        .bind(order_index)
        .bind(&data.content)
        .bind(&data.video_url)
        .bind(data.duration_minutes)
        .bind(data.is_preview)
        .fetch_one(mm.executor())
        .await?;

        let id = result.try_get("id")?;
        Ok(Lesson {
            id,
            section_id: data.section_id,
            title: data.title,
            lesson_type: data.lesson_type,
            order_index,
            content: data.content,
            video_url: data.video_url,
            duration_minutes: data.duration_minutes,
            is_preview: data.is_preview,
        })
    }

    async fn update(
        mut self,
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        data: LessonCreate,
    ) -> DatabaseResult<Self> {
        let order_index = data.order_index.unwrap_or(self.order_index);
        sqlx::query(
            r#"
            UPDATE lessons SET title = $1, lesson_type = $2, order_index = $3, content = $4,
                video_url = $5, duration_minutes = $6, is_preview = $7, updated_at = now()
            WHERE id = $8
            "#,
        )
        .bind(&data.title)
        .bind(&data.lesson_type)
        .bind(order_index)
        .bind(&data.content)
        .bind(&data.video_url)
        .bind(data.duration_minutes)
        .bind(data.is_preview)
        .bind(self.id)
        .execute(mm.executor())
        .await?;

        self.title = data.title;
        self.lesson_type = data.lesson_type;
        self.order_index = order_index;
        self.content = data.content;
        self.video_url = data.video_url;
        self.duration_minutes = data.duration_minutes;
        self.is_preview = data.is_preview;
        Ok(self)
    }

    async fn delete(self, mm: &ModelManager, _actor: &AuthenticatedUser) -> DatabaseResult<()> {
        sqlx::query("DELETE FROM lessons WHERE id = $1")
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
        let result = sqlx::query_as("SELECT * FROM lessons WHERE id = $1")
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
        let result = sqlx::query_as("SELECT * FROM lessons ORDER BY order_index LIMIT $1 OFFSET $2")
            .bind(limit)
            .bind(offset)
            .fetch_all(mm.executor())
            .await?;
        Ok(result)
    }

    async fn count(mm: &ModelManager, _actor: &AuthenticatedUser) -> DatabaseResult<i64> {
        let result: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM lessons")
            .fetch_one(mm.executor())
            .await?;

        Ok(result)
    }
}

impl_paginatable_for!(Lesson, LessonCreate, Uuid);

#[async_trait]
impl HasOwner for Lesson {
    type OwnerId = uuid::Uuid;

    async fn get_owner_id(
        &self,
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
    ) -> DatabaseResult<Self::OwnerId> {
        let instructor_id: Uuid = sqlx::query_scalar(
            r#"
            SELECT c.instructor_id
            FROM courses c
            JOIN sections s ON s.course_id = c.id
            WHERE s.id = $1
            "#,
        )
        .bind(self.section_id)
        .fetch_one(mm.executor())
        .await?;
        Ok(instructor_id)
    }
}

// Utils

/// One row per lesson in course order; drives prev/next navigation and
/// progress arithmetic.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct LessonSequenceRow {
    pub id: Uuid,
    pub section_id: Uuid,
    pub title: String,
}

impl Lesson {
    pub async fn next_order_index(mm: &ModelManager, section_id: Uuid) -> DatabaseResult<i32> {
        let max: Option<i32> =
            sqlx::query_scalar("SELECT MAX(order_index) FROM lessons WHERE section_id = $1")
                .bind(section_id)
                .fetch_one(mm.executor())
                .await?;
        Ok(max.unwrap_or(-1) + 1)
    }

    /// Course this lesson ultimately hangs off of.
    pub async fn course_id(&self, mm: &ModelManager) -> DatabaseResult<Uuid> {
        let course_id: Uuid = sqlx::query_scalar("SELECT course_id FROM sections WHERE id = $1")
            .bind(self.section_id)
            .fetch_one(mm.executor())
            .await?;
        Ok(course_id)
    }

    pub async fn course_sequence(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        course_id: Uuid,
    ) -> DatabaseResult<Vec<LessonSequenceRow>> {
        let rows = sqlx::query_as(
            r#"
            SELECT l.id, l.section_id, l.title
            FROM lessons l
            JOIN sections s ON s.id = l.section_id
            WHERE s.course_id = $1
            ORDER BY s.order_index, s.created_at, l.order_index, l.created_at
            "#,
        )
        .bind(course_id)
        .fetch_all(mm.executor())
        .await?;
        Ok(rows)
    }
}
