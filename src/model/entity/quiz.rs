use crate::model::access::HasOwner;
use crate::model::repo::ResourceTyped;
use crate::model::{ModelManager, error::DatabaseResult, repo::CrudRepository};
use crate::web::AuthenticatedUser;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
pub struct Quiz {
    id: Uuid,
    lesson_id: Uuid,
    title: String,
    description: String,
    pass_percentage: i32,
    time_limit_minutes: Option<i32>,
    attempts_limit: i32,
    shuffle_questions: bool,
    show_answers: bool,
}

#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct QuizCreate {
    pub lesson_id: Uuid,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "QuizCreate::default_pass_percentage")]
    pub pass_percentage: i32,
    pub time_limit_minutes: Option<i32>,
    #[serde(default = "QuizCreate::default_attempts_limit")]
    pub attempts_limit: i32,
    #[serde(default)]
    pub shuffle_questions: bool,
    #[serde(default = "QuizCreate::default_show_answers")]
    pub show_answers: bool,
}

impl QuizCreate {
    fn default_pass_percentage() -> i32 {
        50
    }

    fn default_attempts_limit() -> i32 {
        3
    }

    fn default_show_answers() -> bool {
        true
    }
}

impl ResourceTyped for Quiz {
    fn get_resource_type() -> crate::model::ResourceType {
        crate::model::ResourceType::Quiz
    }
}

impl Quiz {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn lesson_id(&self) -> Uuid {
        self.lesson_id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn pass_percentage(&self) -> i32 {
        self.pass_percentage
    }

    pub fn attempts_limit(&self) -> i32 {
        self.attempts_limit
    }

    pub fn shuffle_questions(&self) -> bool {
        self.shuffle_questions
    }

    pub fn show_answers(&self) -> bool {
        self.show_answers
    }
}

#[async_trait]
impl CrudRepository<Quiz, QuizCreate, uuid::Uuid> for Quiz {
    async fn create(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        data: QuizCreate,
    ) -> DatabaseResult<Self> {
        let row = sqlx::query_as(
            r#"
            INSERT INTO quizzes (id, lesson_id, title, description, pass_percentage,
                time_limit_minutes, attempts_limit, shuffle_questions, show_answers)
            VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(data.lesson_id)
        .bind(&data.title)
        .bind(&data.description)
        .bind(data.pass_percentage)
        .bind(data.time_limit_minutes)
        .bind(data.attempts_limit)
        .bind(data.shuffle_questions)
        .bind(data.show_answers)
        .fetch_one(mm.executor())
        .await?;

        Ok(row)
    }

    async fn update(
        mut self,
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        data: QuizCreate,
    ) -> DatabaseResult<Self> {
        sqlx::query(
            r#"
            UPDATE quizzes SET title = $1, description = $2, pass_percentage = $3,
                time_limit_minutes = $4, attempts_limit = $5, shuffle_questions = $6,
                show_answers = $7, updated_at = now()
            WHERE id = $8
            "#,
        )
        .bind(&data.title)
        .bind(&data.description)
        .bind(data.pass_percentage)
        .bind(data.time_limit_minutes)
        .bind(data.attempts_limit)
        .bind(data.shuffle_questions)
        .bind(data.show_answers)
        .bind(self.id)
        .execute(mm.executor())
        .await?;

        self.title = data.title;
        self.description = data.description;
        self.pass_percentage = data.pass_percentage;
        self.time_limit_minutes = data.time_limit_minutes;
        self.attempts_limit = data.attempts_limit;
        self.shuffle_questions = data.shuffle_questions;
        self.show_answers = data.show_answers;
        Ok(self)
    }

    async fn delete(self, mm: &ModelManager, _actor: &AuthenticatedUser) -> DatabaseResult<()> {
        sqlx::query("DELETE FROM quizzes WHERE id = $1")
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
        let result = sqlx::query_as("SELECT * FROM quizzes WHERE id = $1")
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
        let result = sqlx::query_as("SELECT * FROM quizzes LIMIT $1 OFFSET $2")
            .bind(limit)
            .bind(offset)
            .fetch_all(mm.executor())
            .await?;
        Ok(result)
    }

    async fn count(mm: &ModelManager, _actor: &AuthenticatedUser) -> DatabaseResult<i64> {
        let result: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM quizzes")
            .fetch_one(mm.executor())
            .await?;

        Ok(result)
    }
}

#[async_trait]
impl HasOwner for Quiz {
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

impl Quiz {
    pub async fn find_by_lesson(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        lesson_id: Uuid,
    ) -> DatabaseResult<Option<Self>> {
        let result = sqlx::query_as("SELECT * FROM quizzes WHERE lesson_id = $1")
            .bind(lesson_id)
            .fetch_optional(mm.executor())
            .await?;
        Ok(result)
    }
}

// Questions

#[derive(Debug, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
pub struct Question {
    id: Uuid,
    quiz_id: Uuid,
    qtype: String,
    text: String,
    order_index: i32,
    points: i32,
    explanation: String,
}

#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct QuestionCreate {
    pub quiz_id: Uuid,
    #[serde(default = "QuestionCreate::default_qtype")]
    pub qtype: String,
    pub text: String,
    pub order_index: Option<i32>,
    #[serde(default = "QuestionCreate::default_points")]
    pub points: i32,
    #[serde(default)]
    pub explanation: String,
}

impl QuestionCreate {
    fn default_qtype() -> String {
        String::from("single")
    }

    fn default_points() -> i32 {
        1
    }
}

impl ResourceTyped for Question {
    fn get_resource_type() -> crate::model::ResourceType {
        crate::model::ResourceType::Question
    }
}

impl Question {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn quiz_id(&self) -> Uuid {
        self.quiz_id
    }

    pub fn qtype(&self) -> &str {
        &self.qtype
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn points(&self) -> i32 {
        self.points
    }
}

#[async_trait]
impl CrudRepository<Question, QuestionCreate, uuid::Uuid> for Question {
    async fn create(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        data: QuestionCreate,
    ) -> DatabaseResult<Self> {
        let order_index = match data.order_index {
            Some(order) => order,
            None => {
                let max: Option<i32> = sqlx::query_scalar(
                    "SELECT MAX(order_index) FROM questions WHERE quiz_id = $1",
                )
                .bind(data.quiz_id)
                .fetch_one(mm.executor())
                .await?;
                max.unwrap_or(-1) + 1
            }
        };

        let row = sqlx::query_as(
            r#"
            INSERT INTO questions (id, quiz_id, qtype, text, order_index, points, explanation)
            VALUES ($1,$2,$3,$4,$5,$6,$7)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(data.quiz_id)
        .bind(&data.qtype)
        .bind(&data.text)
        .bind(order_index)
        .bind(data.points)
        .bind(&data.explanation)
        .fetch_one(mm.executor())
        .await?;

        Ok(row)
    }

    async fn update(
        mut self,
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        data: QuestionCreate,
    ) -> DatabaseResult<Self> {
        let order_index = data.order_index.unwrap_or(self.order_index);
        sqlx::query(
            "UPDATE questions SET qtype = $1, text = $2, order_index = $3, points = $4, explanation = $5 WHERE id = $6",
        )
        .bind(&data.qtype)
        .bind(&data.text)
        .bind(order_index)
        .bind(data.points)
        .bind(&data.explanation)
        .bind(self.id)
        .execute(mm.executor())
        .await?;

        self.qtype = data.qtype;
        self.text = data.text;
        self.order_index = order_index;
        self.points = data.points;
        self.explanation = data.explanation;
        Ok(self)
    }

    async fn delete(self, mm: &ModelManager, _actor: &AuthenticatedUser) -> DatabaseResult<()> {
        sqlx::query("DELETE FROM questions WHERE id = $1")
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
        let result = sqlx::query_as("SELECT * FROM questions WHERE id = $1")
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
        let result = sqlx::query_as("SELECT * FROM questions ORDER BY order_index LIMIT $1 OFFSET $2")
            .bind(limit)
            .bind(offset)
            .fetch_all(mm.executor())
            .await?;
        Ok(result)
    }

    async fn count(mm: &ModelManager, _actor: &AuthenticatedUser) -> DatabaseResult<i64> {
        let result: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM questions")
            .fetch_one(mm.executor())
            .await?;

        Ok(result)
    }
}

#[async_trait]
impl HasOwner for Question {
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
            JOIN quizzes q ON q.lesson_id = l.id
            WHERE q.id = $1
            "#,
        )
        .bind(self.quiz_id)
        .fetch_one(mm.executor())
        .await?;
        Ok(instructor_id)
    }
}

impl Question {
    pub async fn all_by_quiz(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        quiz_id: Uuid,
    ) -> DatabaseResult<Vec<Self>> {
        let result = sqlx::query_as(
            "SELECT * FROM questions WHERE quiz_id = $1 ORDER BY order_index, created_at",
        )
        .bind(quiz_id)
        .fetch_all(mm.executor())
        .await?;
        Ok(result)
    }
}

// Choices

#[derive(Debug, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
pub struct QuestionChoice {
    id: Uuid,
    question_id: Uuid,
    text: String,
    is_correct: bool,
    order_index: i32,
}

#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct QuestionChoiceCreate {
    pub question_id: Uuid,
    pub text: String,
    #[serde(default)]
    pub is_correct: bool,
    pub order_index: Option<i32>,
}

impl ResourceTyped for QuestionChoice {
    fn get_resource_type() -> crate::model::ResourceType {
        crate::model::ResourceType::QuestionChoice
    }
}

impl QuestionChoice {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn question_id(&self) -> Uuid {
        self.question_id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_correct(&self) -> bool {
        self.is_correct
    }
}

#[async_trait]
impl CrudRepository<QuestionChoice, QuestionChoiceCreate, uuid::Uuid> for QuestionChoice {
    /// Saving a correct choice under a single/true_false question clears the
    /// flag on every sibling in the same transaction.
    async fn create(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        data: QuestionChoiceCreate,
    ) -> DatabaseResult<Self> {
        let id = Uuid::new_v4();
        let order_index = match data.order_index {
            Some(order) => order,
            None => {
                let max: Option<i32> = sqlx::query_scalar(
                    "SELECT MAX(order_index) FROM question_choices WHERE question_id = $1",
                )
                .bind(data.question_id)
                .fetch_one(mm.executor())
                .await?;
                max.unwrap_or(-1) + 1
            }
        };

        let mut tx = mm.executor().begin().await?;

        if data.is_correct {
            let single_choice: bool = sqlx::query_scalar(
                "SELECT qtype IN ('single', 'true_false') FROM questions WHERE id = $1",
            )
            .bind(data.question_id)
            .fetch_one(&mut *tx)
            .await?;

            if single_choice {
                sqlx::query(
                    "UPDATE question_choices SET is_correct = FALSE WHERE question_id = $1",
                )
                .bind(data.question_id)
                .execute(&mut *tx)
                .await?;
            }
        }

        let row: QuestionChoice = sqlx::query_as(
            r#"
            INSERT INTO question_choices (id, question_id, text, is_correct, order_index)
            VALUES ($1,$2,$3,$4,$5)
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(data.question_id)
        .bind(&data.text)
        .bind(data.is_correct)
        .bind(order_index)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(row)
    }

    async fn update(
        mut self,
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        data: QuestionChoiceCreate,
    ) -> DatabaseResult<Self> {
        let order_index = data.order_index.unwrap_or(self.order_index);
        let mut tx = mm.executor().begin().await?;

        if data.is_correct {
            let single_choice: bool = sqlx::query_scalar(
                "SELECT qtype IN ('single', 'true_false') FROM questions WHERE id = $1",
            )
            .bind(self.question_id)
            .fetch_one(&mut *tx)
            .await?;

            if single_choice {
                sqlx::query(
                    "UPDATE question_choices SET is_correct = FALSE WHERE question_id = $1 AND id <> $2",
                )
                .bind(self.question_id)
                .bind(self.id)
                .execute(&mut *tx)
                .await?;
            }
        }

        sqlx::query(
            "UPDATE question_choices SET text = $1, is_correct = $2, order_index = $3 WHERE id = $4",
        )
        .bind(&data.text)
        .bind(data.is_correct)
        .bind(order_index)
        .bind(self.id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        self.text = data.text;
        self.is_correct = data.is_correct;
        self.order_index = order_index;
        Ok(self)
    }

    async fn delete(self, mm: &ModelManager, _actor: &AuthenticatedUser) -> DatabaseResult<()> {
        sqlx::query("DELETE FROM question_choices WHERE id = $1")
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
        let result = sqlx::query_as("SELECT * FROM question_choices WHERE id = $1")
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
            sqlx::query_as("SELECT * FROM question_choices ORDER BY order_index LIMIT $1 OFFSET $2")
                .bind(limit)
                .bind(offset)
                .fetch_all(mm.executor())
                .await?;
        Ok(result)
    }

    async fn count(mm: &ModelManager, _actor: &AuthenticatedUser) -> DatabaseResult<i64> {
        let result: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM question_choices")
            .fetch_one(mm.executor())
            .await?;

        Ok(result)
    }
}

#[async_trait]
impl HasOwner for QuestionChoice {
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
            JOIN quizzes q ON q.lesson_id = l.id
            JOIN questions qu ON qu.quiz_id = q.id
            WHERE qu.id = $1
            "#,
        )
        .bind(self.question_id)
        .fetch_one(mm.executor())
        .await?;
        Ok(instructor_id)
    }
}

impl QuestionChoice {
    pub async fn all_by_question(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        question_id: Uuid,
    ) -> DatabaseResult<Vec<Self>> {
        let result = sqlx::query_as(
            "SELECT * FROM question_choices WHERE question_id = $1 ORDER BY order_index",
        )
        .bind(question_id)
        .fetch_all(mm.executor())
        .await?;
        Ok(result)
    }
}
