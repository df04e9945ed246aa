use crate::grading::{StepKind, default_content_value};
use crate::impl_paginatable_for;
use crate::model::access::HasOwner;
use crate::model::repo::ResourceTyped;
use crate::model::{ModelManager, error::DatabaseResult, repo::CrudRepository};
use crate::web::AuthenticatedUser;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::prelude::FromRow;
use sqlx::prelude::Row;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
pub struct Step {
    id: Uuid,
    lesson_id: Uuid,
    step_type: String,
    title: String,
    order_index: i32,
    points: i32,
    is_required: bool,
    content: Value,
}

#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct StepCreate {
    pub lesson_id: Uuid,
    pub step_type: String,
    #[serde(default)]
    pub title: String,
    pub order_index: Option<i32>,
    #[serde(default = "StepCreate::default_points")]
    pub points: i32,
    #[serde(default = "StepCreate::default_required")]
    pub is_required: bool,
    /// Omitted content falls back to the kind's builder default.
    pub content: Option<Value>,
}

impl StepCreate {
    fn default_points() -> i32 {
        1
    }

    fn default_required() -> bool {
        true
    }
}

impl ResourceTyped for Step {
    fn get_resource_type() -> crate::model::ResourceType {
        crate::model::ResourceType::Step
    }
}

impl Step {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn lesson_id(&self) -> Uuid {
        self.lesson_id
    }

    pub fn step_type(&self) -> &str {
        &self.step_type
    }

    pub fn kind(&self) -> crate::grading::GradeResult<StepKind> {
        StepKind::parse(&self.step_type)
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn order_index(&self) -> i32 {
        self.order_index
    }

    pub fn points(&self) -> i32 {
        self.points
    }

    pub fn is_required(&self) -> bool {
        self.is_required
    }

    pub fn content(&self) -> &Value {
        &self.content
    }
}

#[async_trait]
impl CrudRepository<Step, StepCreate, uuid::Uuid> for Step {
    async fn create(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        data: StepCreate,
    ) -> DatabaseResult<Self> {
        let kind = StepKind::parse(&data.step_type).unwrap_or(StepKind::Text);
        let content = data
            .content
            .unwrap_or_else(|| default_content_value(kind));
        let order_index = match data.order_index {
            Some(order) => order,
            None => Self::next_order_index(mm, data.lesson_id).await?,
        };

        let result = sqlx::query(
            r#"
            INSERT INTO steps (id, lesson_id, step_type, title, order_index, points, is_required, content)
            VALUES ($1,$2,$3,$4,$5,$6,$7,$8)
            RETURNING id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(data.lesson_id)
        .bind(&data.step_type)
        .bind(&data.title)
        .bind(order_index)
        .bind(data.points)
        .bind(data.is_required)
        .bind(&content)
        .fetch_one(mm.executor())
        .await?;

        let id = result.try_get("id")?;
        Ok(Step {
            id,
            lesson_id: data.lesson_id,
            step_type: data.step_type,
            title: data.title,
            order_index,
            points: data.points,
            is_required: data.is_required,
            content,
        })
    }

    async fn update(
        mut self,
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        data: StepCreate,
    ) -> DatabaseResult<Self> {
        let order_index = data.order_index.unwrap_or(self.order_index);
        let content = data.content.unwrap_or_else(|| self.content.clone());
        sqlx::query(
            r#"
            UPDATE steps SET step_type = $1, title = $2, order_index = $3, points = $4,
                is_required = $5, content = $6, updated_at = now()
            WHERE id = $7
            "#,
        )
        .bind(&data.step_type)
        .bind(&data.title)
        .bind(order_index)
        .bind(data.points)
        .bind(data.is_required)
        .bind(&content)
        .bind(self.id)
        .execute(mm.executor())
        .await?;

        self.step_type = data.step_type;
        self.title = data.title;
        self.order_index = order_index;
        self.points = data.points;
        self.is_required = data.is_required;
        self.content = content;
        Ok(self)
    }

    async fn delete(self, mm: &ModelManager, _actor: &AuthenticatedUser) -> DatabaseResult<()> {
        sqlx::query("DELETE FROM steps WHERE id = $1")
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
        let result = sqlx::query_as("SELECT * FROM steps WHERE id = $1")
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
        let result = sqlx::query_as("SELECT * FROM steps ORDER BY order_index LIMIT $1 OFFSET $2")
            .bind(limit)
            .bind(offset)
            .fetch_all(mm.executor())
            .await?;
        Ok(result)
    }

    async fn count(mm: &ModelManager, _actor: &AuthenticatedUser) -> DatabaseResult<i64> {
        let result: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM steps")
            .fetch_one(mm.executor())
            .await?;

        Ok(result)
    }
}

impl_paginatable_for!(Step, StepCreate, Uuid);

#[async_trait]
impl HasOwner for Step {
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
            JOIN lessons l ON l.section_id = s.id
            WHERE l.id = $1
            "#,
        )
        .bind(self.lesson_id)
        .fetch_one(mm.executor())
        .await?;
        Ok(instructor_id)
    }
}

// Utils

impl Step {
    pub async fn all_by_lesson(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        lesson_id: Uuid,
    ) -> DatabaseResult<Vec<Self>> {
        let rows: Vec<Self> = sqlx::query_as(
            "SELECT * FROM steps WHERE lesson_id = $1 ORDER BY order_index, created_at",
        )
        .bind(lesson_id)
        .fetch_all(mm.executor())
        .await?;
        Ok(rows)
    }

    pub async fn count_by_lesson(mm: &ModelManager, lesson_id: Uuid) -> DatabaseResult<i64> {
        let result: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM steps WHERE lesson_id = $1")
            .bind(lesson_id)
            .fetch_one(mm.executor())
            .await?;
        Ok(result)
    }

    pub async fn next_order_index(mm: &ModelManager, lesson_id: Uuid) -> DatabaseResult<i32> {
        let max: Option<i32> =
            sqlx::query_scalar("SELECT MAX(order_index) FROM steps WHERE lesson_id = $1")
                .bind(lesson_id)
                .fetch_one(mm.executor())
                .await?;
        Ok(max.unwrap_or(-1) + 1)
    }

    /// Rewrites order_index to follow the given id list. Ids from other
    /// lessons are ignored.
    pub async fn reorder(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        lesson_id: Uuid,
        step_ids: &[Uuid],
    ) -> DatabaseResult<()> {
        let mut tx = mm.executor().begin().await?;
        for (index, step_id) in step_ids.iter().enumerate() {
            sqlx::query("UPDATE steps SET order_index = $1 WHERE id = $2 AND lesson_id = $3")
                .bind(index as i32)
                .bind(step_id)
                .bind(lesson_id)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    /// Copies the step to the end of its lesson.
    pub async fn duplicate(
        &self,
        mm: &ModelManager,
        actor: &AuthenticatedUser,
    ) -> DatabaseResult<Self> {
        let title = if self.title.is_empty() {
            String::new()
        } else {
            format!("{} (copy)", self.title)
        };

        Step::create(
            mm,
            actor,
            StepCreate {
                lesson_id: self.lesson_id,
                step_type: self.step_type.clone(),
                title,
                order_index: None,
                points: self.points,
                is_required: self.is_required,
                content: Some(self.content.clone()),
            },
        )
        .await
    }
}
