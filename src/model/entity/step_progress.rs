use crate::model::access::HasOwner;
use crate::model::repo::ResourceTyped;
use crate::model::{ModelManager, error::DatabaseResult, repo::CrudRepository};
use crate::web::AuthenticatedUser;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::prelude::FromRow;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
pub struct StepProgress {
    id: Uuid,
    enrollment_id: Uuid,
    step_id: Uuid,
    status: String,
    attempts: i32,
    answer_data: Value,
    is_correct: Option<bool>,
    completed: bool,
    completed_at: Option<DateTime<Utc>>,
    score: Option<i32>,
    max_score: Option<i32>,
}

#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct StepProgressCreate {
    pub enrollment_id: Uuid,
    pub step_id: Uuid,
    pub status: String,
}

impl ResourceTyped for StepProgress {
    fn get_resource_type() -> crate::model::ResourceType {
        crate::model::ResourceType::StepProgress
    }
}

impl StepProgress {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn enrollment_id(&self) -> Uuid {
        self.enrollment_id
    }

    pub fn step_id(&self) -> Uuid {
        self.step_id
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn attempts(&self) -> i32 {
        self.attempts
    }

    pub fn is_correct(&self) -> Option<bool> {
        self.is_correct
    }

    pub fn completed(&self) -> bool {
        self.completed
    }
}

#[async_trait]
impl CrudRepository<StepProgress, StepProgressCreate, uuid::Uuid> for StepProgress {
    async fn create(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        data: StepProgressCreate,
    ) -> DatabaseResult<Self> {
        let row = sqlx::query_as(
            r#"
            INSERT INTO step_progress (id, enrollment_id, step_id, status)
            VALUES ($1,$2,$3,$4)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(data.enrollment_id)
        .bind(data.step_id)
        .bind(&data.status)
        .fetch_one(mm.executor())
        .await?;

        Ok(row)
    }

    async fn update(
        self,
        _mm: &ModelManager,
        _actor: &AuthenticatedUser,
        _data: StepProgressCreate,
    ) -> DatabaseResult<Self> {
        unimplemented!("Step progress moves through record_attempt/mark_completed");
    }

    async fn delete(self, mm: &ModelManager, _actor: &AuthenticatedUser) -> DatabaseResult<()> {
        sqlx::query("DELETE FROM step_progress WHERE id = $1")
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
        let result = sqlx::query_as("SELECT * FROM step_progress WHERE id = $1")
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
        let result = sqlx::query_as("SELECT * FROM step_progress LIMIT $1 OFFSET $2")
            .bind(limit)
            .bind(offset)
            .fetch_all(mm.executor())
            .await?;
        Ok(result)
    }

    async fn count(mm: &ModelManager, _actor: &AuthenticatedUser) -> DatabaseResult<i64> {
        let result: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM step_progress")
            .fetch_one(mm.executor())
            .await?;

        Ok(result)
    }
}

#[async_trait]
impl HasOwner for StepProgress {
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

impl StepProgress {
    pub async fn get_or_create(
        mm: &ModelManager,
        actor: &AuthenticatedUser,
        enrollment_id: Uuid,
        step_id: Uuid,
        status: &str,
    ) -> DatabaseResult<Self> {
        let existing = sqlx::query_as(
            "SELECT * FROM step_progress WHERE enrollment_id = $1 AND step_id = $2",
        )
        .bind(enrollment_id)
        .bind(step_id)
        .fetch_optional(mm.executor())
        .await?;

        if let Some(row) = existing {
            return Ok(row);
        }

        Self::create(
            mm,
            actor,
            StepProgressCreate {
                enrollment_id,
                step_id,
                status: status.to_string(),
            },
        )
        .await
    }

    /// Bumps the attempt counter, stores what the student sent and the
    /// verdict. A correct answer stamps completion and the step's points.
    pub async fn record_attempt(
        self,
        mm: &ModelManager,
        answer_data: &Value,
        is_correct: bool,
        points: i32,
    ) -> DatabaseResult<Self> {
        let row = sqlx::query_as(
            r#"
            UPDATE step_progress
            SET attempts = attempts + 1,
                answer_data = $1,
                is_correct = $2,
                status = CASE WHEN $2 THEN 'completed' ELSE 'in_progress' END,
                completed = completed OR $2,
                completed_at = CASE WHEN $2 AND completed_at IS NULL THEN now() ELSE completed_at END,
                score = CASE WHEN $2 THEN $3 ELSE score END,
                max_score = $3
            WHERE id = $4
            RETURNING *
            "#,
        )
        .bind(answer_data)
        .bind(is_correct)
        .bind(points)
        .bind(self.id)
        .fetch_one(mm.executor())
        .await?;

        Ok(row)
    }

    /// Completion for non-interactive steps.
    pub async fn mark_completed(self, mm: &ModelManager, points: i32) -> DatabaseResult<Self> {
        let row = sqlx::query_as(
            r#"
            UPDATE step_progress
            SET status = 'completed',
                completed = TRUE,
                completed_at = COALESCE(completed_at, now()),
                score = $1,
                max_score = $1
            WHERE id = $2
            RETURNING *
            "#,
        )
        .bind(points)
        .bind(self.id)
        .fetch_one(mm.executor())
        .await?;

        Ok(row)
    }

    pub async fn count_completed_for_lesson(
        mm: &ModelManager,
        enrollment_id: Uuid,
        lesson_id: Uuid,
    ) -> DatabaseResult<i64> {
        let result: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM step_progress sp
            JOIN steps st ON st.id = sp.step_id
            WHERE sp.enrollment_id = $1 AND st.lesson_id = $2 AND sp.completed = TRUE
            "#,
        )
        .bind(enrollment_id)
        .bind(lesson_id)
        .fetch_one(mm.executor())
        .await?;
        Ok(result)
    }

    pub async fn all_for_lesson(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        enrollment_id: Uuid,
        lesson_id: Uuid,
    ) -> DatabaseResult<Vec<Self>> {
        let rows: Vec<Self> = sqlx::query_as(
            r#"
            SELECT sp.*
            FROM step_progress sp
            JOIN steps st ON st.id = sp.step_id
            WHERE sp.enrollment_id = $1 AND st.lesson_id = $2
            "#,
        )
        .bind(enrollment_id)
        .bind(lesson_id)
        .fetch_all(mm.executor())
        .await?;
        Ok(rows)
    }
}
