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
pub struct Assignment {
    id: Uuid,
    lesson_id: Uuid,
    title: String,
    description: String,
    max_points: i32,
    due_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct AssignmentCreate {
    pub lesson_id: Uuid,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "AssignmentCreate::default_max_points")]
    pub max_points: i32,
    pub due_date: Option<DateTime<Utc>>,
}

impl AssignmentCreate {
    fn default_max_points() -> i32 {
        100
    }
}

impl ResourceTyped for Assignment {
    fn get_resource_type() -> crate::model::ResourceType {
        crate::model::ResourceType::Assignment
    }
}

impl Assignment {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn lesson_id(&self) -> Uuid {
        self.lesson_id
    }

    pub fn max_points(&self) -> i32 {
        self.max_points
    }

    pub fn due_date(&self) -> Option<&DateTime<Utc>> {
        self.due_date.as_ref()
    }
}

#[async_trait]
impl CrudRepository<Assignment, AssignmentCreate, uuid::Uuid> for Assignment {
    async fn create(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        data: AssignmentCreate,
    ) -> DatabaseResult<Self> {
        let row = sqlx::query_as(
            r#"
            INSERT INTO assignments (id, lesson_id, title, description, max_points, due_date)
            VALUES ($1,$2,$3,$4,$5,$6)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(data.lesson_id)
        .bind(&data.title)
        .bind(&data.description)
        .bind(data.max_points)
        .bind(data.due_date)
        .fetch_one(mm.executor())
        .await?;

        Ok(row)
    }

    async fn update(
        mut self,
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        data: AssignmentCreate,
    ) -> DatabaseResult<Self> {
        sqlx::query(
            "UPDATE assignments SET title = $1, description = $2, max_points = $3, due_date = $4, updated_at = now() WHERE id = $5",
        )
        .bind(&data.title)
        .bind(&data.description)
        .bind(data.max_points)
        .bind(data.due_date)
        .bind(self.id)
        .execute(mm.executor())
        .await?;

        self.title = data.title;
        self.description = data.description;
        self.max_points = data.max_points;
        self.due_date = data.due_date;
        Ok(self)
    }

    async fn delete(self, mm: &ModelManager, _actor: &AuthenticatedUser) -> DatabaseResult<()> {
        sqlx::query("DELETE FROM assignments WHERE id = $1")
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
        let result = sqlx::query_as("SELECT * FROM assignments WHERE id = $1")
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
        let result = sqlx::query_as("SELECT * FROM assignments LIMIT $1 OFFSET $2")
            .bind(limit)
            .bind(offset)
            .fetch_all(mm.executor())
            .await?;
        Ok(result)
    }

    async fn count(mm: &ModelManager, _actor: &AuthenticatedUser) -> DatabaseResult<i64> {
        let result: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM assignments")
            .fetch_one(mm.executor())
            .await?;

        Ok(result)
    }
}

#[async_trait]
impl HasOwner for Assignment {
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

impl Assignment {
    pub async fn find_by_lesson(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        lesson_id: Uuid,
    ) -> DatabaseResult<Option<Self>> {
        let result = sqlx::query_as("SELECT * FROM assignments WHERE lesson_id = $1")
            .bind(lesson_id)
            .fetch_optional(mm.executor())
            .await?;
        Ok(result)
    }
}

// Submissions

#[derive(Debug, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
pub struct AssignmentSubmission {
    id: Uuid,
    assignment_id: Uuid,
    student_id: Uuid,
    submitted_at: DateTime<Utc>,
    submitted_text: String,
    status: String,
    points_earned: Option<i32>,
    teacher_comment: String,
    graded_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct AssignmentSubmissionCreate {
    pub assignment_id: Uuid,
    pub submitted_text: String,
}

impl ResourceTyped for AssignmentSubmission {
    fn get_resource_type() -> crate::model::ResourceType {
        crate::model::ResourceType::AssignmentSubmission
    }
}

impl AssignmentSubmission {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn assignment_id(&self) -> Uuid {
        self.assignment_id
    }

    pub fn student_id(&self) -> Uuid {
        self.student_id
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn points_earned(&self) -> Option<i32> {
        self.points_earned
    }

    pub fn submitted_at(&self) -> &DateTime<Utc> {
        &self.submitted_at
    }

    /// Submitted after the deadline, when one exists.
    pub fn is_late(&self, due_date: Option<&DateTime<Utc>>) -> bool {
        due_date.is_some_and(|due| self.submitted_at > *due)
    }
}

#[async_trait]
impl HasOwner for AssignmentSubmission {
    type OwnerId = uuid::Uuid;

    async fn get_owner_id(
        &self,
        _mm: &ModelManager,
        _actor: &AuthenticatedUser,
    ) -> DatabaseResult<Self::OwnerId> {
        Ok(self.student_id)
    }
}

impl AssignmentSubmission {
    /// A student re-submitting replaces the text and goes back to the
    /// `submitted` state for re-grading.
    pub async fn upsert(
        mm: &ModelManager,
        actor: &AuthenticatedUser,
        data: AssignmentSubmissionCreate,
    ) -> DatabaseResult<Self> {
        let row = sqlx::query_as(
            r#"
            INSERT INTO assignment_submissions (id, assignment_id, student_id, submitted_text)
            VALUES ($1,$2,$3,$4)
            ON CONFLICT (assignment_id, student_id) DO UPDATE
            SET submitted_text = EXCLUDED.submitted_text,
                submitted_at = now(),
                status = 'submitted'
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(data.assignment_id)
        .bind(actor.user_id())
        .bind(&data.submitted_text)
        .fetch_one(mm.executor())
        .await?;

        Ok(row)
    }

    pub async fn find_by_id(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        id: Uuid,
    ) -> DatabaseResult<Option<Self>> {
        let result = sqlx::query_as("SELECT * FROM assignment_submissions WHERE id = $1")
            .bind(id)
            .fetch_optional(mm.executor())
            .await?;
        Ok(result)
    }

    pub async fn all_by_assignment(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        assignment_id: Uuid,
    ) -> DatabaseResult<Vec<Self>> {
        let rows: Vec<Self> = sqlx::query_as(
            "SELECT * FROM assignment_submissions WHERE assignment_id = $1 ORDER BY submitted_at DESC",
        )
        .bind(assignment_id)
        .fetch_all(mm.executor())
        .await?;
        Ok(rows)
    }

    /// Instructor grading; points are clamped to the assignment's maximum.
    pub async fn grade(
        self,
        mm: &ModelManager,
        points: i32,
        comment: &str,
        returned: bool,
    ) -> DatabaseResult<Self> {
        let status = if returned { "returned" } else { "graded" };
        let row = sqlx::query_as(
            r#"
            UPDATE assignment_submissions
            SET points_earned = $1, teacher_comment = $2, status = $3, graded_at = now()
            WHERE id = $4
            RETURNING *
            "#,
        )
        .bind(points)
        .bind(comment)
        .bind(status)
        .bind(self.id)
        .fetch_one(mm.executor())
        .await?;

        Ok(row)
    }
}
