use crate::model::access::HasOwner;
use crate::model::repo::ResourceTyped;
use crate::model::{ModelManager, error::DatabaseResult, repo::CrudRepository};
use crate::web::AuthenticatedUser;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
pub struct CourseMedia {
    id: Uuid,
    course_id: Uuid,
    uploaded_by: Uuid,
    original_filename: String,
    title: String,
    description: String,
    media_type: String,
    file_size: i64,
    mime_type: String,
}

#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct CourseMediaCreate {
    pub course_id: Uuid,
    pub original_filename: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Omitted type is inferred from the file extension.
    pub media_type: Option<String>,
    #[serde(default)]
    pub file_size: i64,
    #[serde(default)]
    pub mime_type: String,
}

impl ResourceTyped for CourseMedia {
    fn get_resource_type() -> crate::model::ResourceType {
        crate::model::ResourceType::CourseMedia
    }
}

/// File-extension buckets matching the media library's upload rules.
pub fn infer_media_type(filename: &str) -> &'static str {
    let ext = filename.rsplit('.').next().unwrap_or("").to_lowercase();
    match ext.as_str() {
        "jpg" | "jpeg" | "png" | "gif" | "webp" | "svg" | "bmp" => "image",
        "mp4" | "webm" | "mov" | "avi" | "mkv" => "video",
        "pdf" | "doc" | "docx" | "ppt" | "pptx" | "xls" | "xlsx" | "txt" => "document",
        "mp3" | "wav" | "ogg" | "flac" | "m4a" => "audio",
        _ => "other",
    }
}

impl CourseMedia {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn course_id(&self) -> Uuid {
        self.course_id
    }

    pub fn uploaded_by(&self) -> Uuid {
        self.uploaded_by
    }

    pub fn original_filename(&self) -> &str {
        &self.original_filename
    }

    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    pub fn file_size(&self) -> i64 {
        self.file_size
    }

    pub fn file_size_display(&self) -> String {
        let size = self.file_size as f64;
        const KB: f64 = 1024.0;
        const MB: f64 = 1024.0 * 1024.0;
        const GB: f64 = 1024.0 * 1024.0 * 1024.0;

        if size < KB {
            format!("{} B", self.file_size)
        } else if size < MB {
            format!("{:.1} KB", size / KB)
        } else if size < GB {
            format!("{:.1} MB", size / MB)
        } else {
            format!("{:.1} GB", size / GB)
        }
    }
}

#[async_trait]
impl CrudRepository<CourseMedia, CourseMediaCreate, uuid::Uuid> for CourseMedia {
    async fn create(
        mm: &ModelManager,
        actor: &AuthenticatedUser,
        data: CourseMediaCreate,
    ) -> DatabaseResult<Self> {
        let media_type = data
            .media_type
            .unwrap_or_else(|| infer_media_type(&data.original_filename).to_string());

        let row = sqlx::query_as(
            r#"
            INSERT INTO course_media (id, course_id, uploaded_by, original_filename, title,
                description, media_type, file_size, mime_type)
            VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(data.course_id)
        .bind(actor.user_id())
        .bind(&data.original_filename)
        .bind(&data.title)
        .bind(&data.description)
        .bind(&media_type)
        .bind(data.file_size)
        .bind(&data.mime_type)
        .fetch_one(mm.executor())
        .await?;

        Ok(row)
    }

    async fn update(
        mut self,
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        data: CourseMediaCreate,
    ) -> DatabaseResult<Self> {
        sqlx::query(
            "UPDATE course_media SET title = $1, description = $2, updated_at = now() WHERE id = $3",
        )
        .bind(&data.title)
        .bind(&data.description)
        .bind(self.id)
        .execute(mm.executor())
        .await?;

        self.title = data.title;
        self.description = data.description;
        Ok(self)
    }

    async fn delete(self, mm: &ModelManager, _actor: &AuthenticatedUser) -> DatabaseResult<()> {
        sqlx::query("DELETE FROM course_media WHERE id = $1")
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
        let result = sqlx::query_as("SELECT * FROM course_media WHERE id = $1")
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
            "SELECT * FROM course_media ORDER BY created_at DESC LIMIT $1 OFFSET $2",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(mm.executor())
        .await?;
        Ok(result)
    }

    async fn count(mm: &ModelManager, _actor: &AuthenticatedUser) -> DatabaseResult<i64> {
        let result: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM course_media")
            .fetch_one(mm.executor())
            .await?;

        Ok(result)
    }
}

#[async_trait]
impl HasOwner for CourseMedia {
    type OwnerId = uuid::Uuid;

    /// Media belongs to the course's instructor, not to whoever uploaded it.
    async fn get_owner_id(
        &self,
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
    ) -> DatabaseResult<Self::OwnerId> {
        let instructor_id: Uuid =
            sqlx::query_scalar("SELECT instructor_id FROM courses WHERE id = $1")
                .bind(self.course_id)
                .fetch_one(mm.executor())
                .await?;
        Ok(instructor_id)
    }
}

impl CourseMedia {
    pub async fn all_by_course(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        course_id: Uuid,
    ) -> DatabaseResult<Vec<Self>> {
        let rows: Vec<Self> = sqlx::query_as(
            "SELECT * FROM course_media WHERE course_id = $1 ORDER BY created_at DESC",
        )
        .bind(course_id)
        .fetch_all(mm.executor())
        .await?;
        Ok(rows)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn media_type_from_extension() {
        assert_eq!(infer_media_type("diagram.PNG"), "image");
        assert_eq!(infer_media_type("intro.mp4"), "video");
        assert_eq!(infer_media_type("notes.pdf"), "document");
        assert_eq!(infer_media_type("theme.mp3"), "audio");
        assert_eq!(infer_media_type("archive.tar.gz"), "other");
        assert_eq!(infer_media_type("no_extension"), "other");
    }

    fn media_of_size(file_size: i64) -> CourseMedia {
        CourseMedia {
            id: Uuid::new_v4(),
            course_id: Uuid::new_v4(),
            uploaded_by: Uuid::new_v4(),
            original_filename: String::from("intro.mp4"),
            title: String::new(),
            description: String::new(),
            media_type: String::from("video"),
            file_size,
            mime_type: String::from("video/mp4"),
        }
    }

    #[test]
    fn size_renders_in_the_right_unit() {
        assert_eq!(media_of_size(512).file_size_display(), "512 B");
        assert_eq!(media_of_size(2_048).file_size_display(), "2.0 KB");
        assert_eq!(media_of_size(5 * 1024 * 1024).file_size_display(), "5.0 MB");
        assert_eq!(
            media_of_size(3 * 1024 * 1024 * 1024).file_size_display(),
            "3.0 GB"
        );
    }
}
