use crate::impl_paginatable_for;
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
pub struct Enrollment {
    id: Uuid,
    student_id: Uuid,
    course_id: Uuid,
    enrolled_at: DateTime<Utc>,
    completed: bool,
    completed_at: Option<DateTime<Utc>>,
    progress_percentage: f64,
}

#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct EnrollmentCreate {
    pub course_id: Uuid,
}

impl ResourceTyped for Enrollment {
    fn get_resource_type() -> crate::model::ResourceType {
        crate::model::ResourceType::Enrollment
    }
}

impl Enrollment {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn student_id(&self) -> Uuid {
        self.student_id
    }

    pub fn course_id(&self) -> Uuid {
        self.course_id
    }

    pub fn completed(&self) -> bool {
        self.completed
    }

    pub fn progress_percentage(&self) -> f64 {
        self.progress_percentage
    }
}

#[async_trait]
impl CrudRepository<Enrollment, EnrollmentCreate, uuid::Uuid> for Enrollment {
    async fn create(
        mm: &ModelManager,
        actor: &AuthenticatedUser,
        data: EnrollmentCreate,
    ) -> DatabaseResult<Self> {
        let row = sqlx::query_as(
            r#"
            INSERT INTO enrollments (id, student_id, course_id)
            VALUES ($1,$2,$3)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(actor.user_id())
        .bind(data.course_id)
        .fetch_one(mm.executor())
        .await?;

        Ok(row)
    }

    async fn update(
        self,
        _mm: &ModelManager,
        _actor: &AuthenticatedUser,
        _data: EnrollmentCreate,
    ) -> DatabaseResult<Self> {
        unimplemented!("Enrollments change through progress recomputation only");
    }

    async fn delete(self, mm: &ModelManager, _actor: &AuthenticatedUser) -> DatabaseResult<()> {
        sqlx::query("DELETE FROM enrollments WHERE id = $1")
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
        let result = sqlx::query_as("SELECT * FROM enrollments WHERE id = $1")
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
            "SELECT * FROM enrollments ORDER BY enrolled_at DESC LIMIT $1 OFFSET $2",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(mm.executor())
        .await?;
        Ok(result)
    }

    async fn count(mm: &ModelManager, actor: &AuthenticatedUser) -> DatabaseResult<i64> {
        let result: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM enrollments WHERE student_id = $1")
                .bind(actor.user_id())
                .fetch_one(mm.executor())
                .await?;

        Ok(result)
    }
}

impl_paginatable_for!(Enrollment, EnrollmentCreate, Uuid);

#[async_trait]
impl HasOwner for Enrollment {
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

impl Enrollment {
    pub async fn find_by_student_course(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        student_id: Uuid,
        course_id: Uuid,
    ) -> DatabaseResult<Option<Self>> {
        let result = sqlx::query_as(
            "SELECT * FROM enrollments WHERE student_id = $1 AND course_id = $2",
        )
        .bind(student_id)
        .bind(course_id)
        .fetch_optional(mm.executor())
        .await?;
        Ok(result)
    }

    /// Returns the enrollment and whether it was just created.
    pub async fn get_or_create(
        mm: &ModelManager,
        actor: &AuthenticatedUser,
        course_id: Uuid,
    ) -> DatabaseResult<(Self, bool)> {
        if let Some(existing) =
            Self::find_by_student_course(mm, actor, actor.user_id(), course_id).await?
        {
            return Ok((existing, false));
        }

        let created = Self::create(mm, actor, EnrollmentCreate { course_id }).await?;
        Ok((created, true))
    }

    /// Re-derives the completion percentage from lesson progress and flips
    /// the enrollment to completed at 100%. Returns the fresh row.
    pub async fn recompute_progress(self, mm: &ModelManager) -> DatabaseResult<Self> {
        let total_lessons: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM lessons l
            JOIN sections s ON s.id = l.section_id
            WHERE s.course_id = $1
            "#,
        )
        .bind(self.course_id)
        .fetch_one(mm.executor())
        .await?;

        let completed_lessons: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM lesson_progress WHERE enrollment_id = $1 AND completed = TRUE",
        )
        .bind(self.id)
        .fetch_one(mm.executor())
        .await?;

        let percentage = if total_lessons > 0 {
            (completed_lessons as f64 / total_lessons as f64) * 100.0
        } else {
            0.0
        };
        let completed = percentage >= 100.0;

        let row = sqlx::query_as(
            r#"
            UPDATE enrollments
            SET progress_percentage = $1,
                completed = $2,
                completed_at = CASE WHEN $2 AND completed_at IS NULL THEN now() ELSE completed_at END
            WHERE id = $3
            RETURNING *
            "#,
        )
        .bind(percentage)
        .bind(completed)
        .bind(self.id)
        .fetch_one(mm.executor())
        .await?;

        Ok(row)
    }

}

// My-courses listing with the course embedded

#[derive(sqlx::FromRow)]
pub struct EnrollmentWithCourseRow {
    pub id: Uuid,
    pub enrolled_at: DateTime<Utc>,
    pub completed: bool,
    pub progress_percentage: f64,
    pub course: serde_json::Value,
}

impl EnrollmentWithCourseRow {
    pub async fn all_by_student(
        mm: &ModelManager,
        actor: &AuthenticatedUser,
    ) -> DatabaseResult<Vec<Self>> {
        let rows: Vec<Self> = sqlx::query_as(
            r#"
            SELECT
                e.id,
                e.enrolled_at,
                e.completed,
                e.progress_percentage,
                json_build_object(
                    'id', c.id,
                    'title', c.title,
                    'slug', c.slug,
                    'subtitle', c.subtitle,
                    'level', c.level,
                    'instructor', u.username,
                    'category', cat.name
                ) AS course
            FROM enrollments e
            JOIN courses c ON c.id = e.course_id
            JOIN users u ON u.id = c.instructor_id
            LEFT JOIN categories cat ON cat.id = c.category_id
            WHERE e.student_id = $1
            ORDER BY e.enrolled_at DESC
            "#,
        )
        .bind(actor.user_id())
        .fetch_all(mm.executor())
        .await?;

        Ok(rows)
    }
}
