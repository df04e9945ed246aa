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
pub struct QuizAttempt {
    id: Uuid,
    student_id: Uuid,
    quiz_id: Uuid,
    started_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    score: Option<i32>,
    total_points: Option<i32>,
    percentage: Option<f64>,
    is_passed: Option<bool>,
}

#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct QuizAttemptCreate {
    pub quiz_id: Uuid,
}

impl ResourceTyped for QuizAttempt {
    fn get_resource_type() -> crate::model::ResourceType {
        crate::model::ResourceType::QuizAttempt
    }
}

impl QuizAttempt {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn student_id(&self) -> Uuid {
        self.student_id
    }

    pub fn quiz_id(&self) -> Uuid {
        self.quiz_id
    }

    pub fn completed_at(&self) -> Option<&DateTime<Utc>> {
        self.completed_at.as_ref()
    }

    pub fn score(&self) -> Option<i32> {
        self.score
    }

    pub fn percentage(&self) -> Option<f64> {
        self.percentage
    }

    pub fn is_passed(&self) -> Option<bool> {
        self.is_passed
    }
}

#[async_trait]
impl CrudRepository<QuizAttempt, QuizAttemptCreate, uuid::Uuid> for QuizAttempt {
    async fn create(
        mm: &ModelManager,
        actor: &AuthenticatedUser,
        data: QuizAttemptCreate,
    ) -> DatabaseResult<Self> {
        let row = sqlx::query_as(
            r#"
            INSERT INTO quiz_attempts (id, student_id, quiz_id)
            VALUES ($1,$2,$3)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(actor.user_id())
        .bind(data.quiz_id)
        .fetch_one(mm.executor())
        .await?;

        Ok(row)
    }

    async fn update(
        self,
        _mm: &ModelManager,
        _actor: &AuthenticatedUser,
        _data: QuizAttemptCreate,
    ) -> DatabaseResult<Self> {
        unimplemented!("Attempts are finalized through submit_result");
    }

    async fn delete(self, mm: &ModelManager, _actor: &AuthenticatedUser) -> DatabaseResult<()> {
        sqlx::query("DELETE FROM quiz_attempts WHERE id = $1")
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
        let result = sqlx::query_as("SELECT * FROM quiz_attempts WHERE id = $1")
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
            "SELECT * FROM quiz_attempts WHERE student_id = $1 ORDER BY started_at DESC LIMIT $2 OFFSET $3",
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
            sqlx::query_scalar("SELECT COUNT(*) FROM quiz_attempts WHERE student_id = $1")
                .bind(actor.user_id())
                .fetch_one(mm.executor())
                .await?;

        Ok(result)
    }
}

#[async_trait]
impl HasOwner for QuizAttempt {
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

impl QuizAttempt {
    pub async fn count_for_quiz(
        mm: &ModelManager,
        actor: &AuthenticatedUser,
        quiz_id: Uuid,
    ) -> DatabaseResult<i64> {
        let result: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM quiz_attempts WHERE student_id = $1 AND quiz_id = $2",
        )
        .bind(actor.user_id())
        .bind(quiz_id)
        .fetch_one(mm.executor())
        .await?;
        Ok(result)
    }

    /// Stamps the final score once all answers are stored.
    pub async fn submit_result(
        self,
        mm: &ModelManager,
        score: i32,
        total_points: i32,
        percentage: f64,
        is_passed: bool,
    ) -> DatabaseResult<Self> {
        let row = sqlx::query_as(
            r#"
            UPDATE quiz_attempts
            SET completed_at = now(), score = $1, total_points = $2, percentage = $3, is_passed = $4
            WHERE id = $5
            RETURNING *
            "#,
        )
        .bind(score)
        .bind(total_points)
        .bind(percentage)
        .bind(is_passed)
        .bind(self.id)
        .fetch_one(mm.executor())
        .await?;

        Ok(row)
    }
}

// Individual answers inside an attempt

#[derive(Debug, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
pub struct UserAnswer {
    id: Uuid,
    attempt_id: Uuid,
    question_id: Uuid,
    choice_id: Option<Uuid>,
    text_answer: String,
    is_correct: Option<bool>,
    points_earned: Option<i32>,
}

#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct UserAnswerCreate {
    pub attempt_id: Uuid,
    pub question_id: Uuid,
    pub choice_id: Option<Uuid>,
    pub text_answer: String,
    pub is_correct: Option<bool>,
    pub points_earned: Option<i32>,
}

impl ResourceTyped for UserAnswer {
    fn get_resource_type() -> crate::model::ResourceType {
        crate::model::ResourceType::UserAnswer
    }
}

impl UserAnswer {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn question_id(&self) -> Uuid {
        self.question_id
    }

    pub fn choice_id(&self) -> Option<Uuid> {
        self.choice_id
    }

    pub fn text_answer(&self) -> &str {
        &self.text_answer
    }

    pub fn is_correct(&self) -> Option<bool> {
        self.is_correct
    }

    pub fn points_earned(&self) -> Option<i32> {
        self.points_earned
    }
}

impl UserAnswer {
    pub async fn create(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        data: UserAnswerCreate,
    ) -> DatabaseResult<Self> {
        let row = sqlx::query_as(
            r#"
            INSERT INTO user_answers (id, attempt_id, question_id, choice_id, text_answer, is_correct, points_earned)
            VALUES ($1,$2,$3,$4,$5,$6,$7)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(data.attempt_id)
        .bind(data.question_id)
        .bind(data.choice_id)
        .bind(&data.text_answer)
        .bind(data.is_correct)
        .bind(data.points_earned)
        .fetch_one(mm.executor())
        .await?;

        Ok(row)
    }

    pub async fn all_by_attempt(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        attempt_id: Uuid,
    ) -> DatabaseResult<Vec<Self>> {
        let rows: Vec<Self> = sqlx::query_as(
            r#"
            SELECT ua.*
            FROM user_answers ua
            JOIN questions q ON q.id = ua.question_id
            WHERE ua.attempt_id = $1
            ORDER BY q.order_index
            "#,
        )
        .bind(attempt_id)
        .fetch_all(mm.executor())
        .await?;
        Ok(rows)
    }
}
