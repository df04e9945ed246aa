use crate::model::access::HasOwner;
use crate::model::repo::ResourceTyped;
use crate::model::{ModelManager, error::DatabaseResult};
use crate::web::AuthenticatedUser;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
pub struct Certificate {
    id: Uuid,
    enrollment_id: Uuid,
    certificate_number: String,
    issued_at: DateTime<Utc>,
    student_name: String,
    course_title: String,
    instructor_name: String,
}

#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct CertificateCreate {
    pub enrollment_id: Uuid,
}

impl ResourceTyped for Certificate {
    fn get_resource_type() -> crate::model::ResourceType {
        crate::model::ResourceType::Certificate
    }
}

impl Certificate {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn enrollment_id(&self) -> Uuid {
        self.enrollment_id
    }

    pub fn certificate_number(&self) -> &str {
        &self.certificate_number
    }

    pub fn issued_at(&self) -> &DateTime<Utc> {
        &self.issued_at
    }

    pub fn student_name(&self) -> &str {
        &self.student_name
    }

    pub fn course_title(&self) -> &str {
        &self.course_title
    }

    pub fn instructor_name(&self) -> &str {
        &self.instructor_name
    }

    fn new_number() -> String {
        format!(
            "CM-{}",
            Uuid::new_v4().simple().to_string()[..8].to_uppercase()
        )
    }
}

#[async_trait]
impl HasOwner for Certificate {
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

impl Certificate {
    /// Issues a certificate for a finished enrollment, freezing the holder,
    /// course and instructor names as they are right now. Idempotent per
    /// enrollment.
    pub async fn issue(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        enrollment_id: Uuid,
    ) -> DatabaseResult<Self> {
        if let Some(existing) = sqlx::query_as::<_, Self>(
            "SELECT * FROM certificates WHERE enrollment_id = $1",
        )
        .bind(enrollment_id)
        .fetch_optional(mm.executor())
        .await?
        {
            return Ok(existing);
        }

        let row = sqlx::query_as(
            r#"
            INSERT INTO certificates (id, enrollment_id, certificate_number, student_name, course_title, instructor_name)
            SELECT $1, e.id, $2,
                CASE WHEN st.full_name = '' THEN st.username ELSE st.full_name END,
                c.title,
                CASE WHEN ins.full_name = '' THEN ins.username ELSE ins.full_name END
            FROM enrollments e
            JOIN users st ON st.id = e.student_id
            JOIN courses c ON c.id = e.course_id
            JOIN users ins ON ins.id = c.instructor_id
            WHERE e.id = $3
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(Self::new_number())
        .bind(enrollment_id)
        .fetch_one(mm.executor())
        .await?;

        Ok(row)
    }

    pub async fn find_by_number(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        number: &str,
    ) -> DatabaseResult<Option<Self>> {
        let result = sqlx::query_as("SELECT * FROM certificates WHERE certificate_number = $1")
            .bind(number)
            .fetch_optional(mm.executor())
            .await?;
        Ok(result)
    }

    pub async fn all_by_student(
        mm: &ModelManager,
        actor: &AuthenticatedUser,
    ) -> DatabaseResult<Vec<Self>> {
        let rows: Vec<Self> = sqlx::query_as(
            r#"
            SELECT ce.*
            FROM certificates ce
            JOIN enrollments e ON e.id = ce.enrollment_id
            WHERE e.student_id = $1
            ORDER BY ce.issued_at DESC
            "#,
        )
        .bind(actor.user_id())
        .fetch_all(mm.executor())
        .await?;
        Ok(rows)
    }
}
