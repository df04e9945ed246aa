use crate::impl_paginatable_for;
use crate::model::access::HasOwner;
use crate::model::repo::ResourceTyped;
use crate::model::{ModelManager, error::DatabaseResult, repo::CrudRepository};
use crate::utils::slug::slugify;
use crate::web::AuthenticatedUser;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use sqlx::prelude::Row;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
pub struct Course {
    id: Uuid,
    title: String,
    slug: String,
    subtitle: String,
    description: String,
    instructor_id: Uuid,
    category_id: Option<Uuid>,
    level: String,
    language: String,
    duration_hours: f64,
    price_cents: i64,
    discount_price_cents: Option<i64>,
    is_free: bool,
    learning_outcomes: String,
    requirements: String,
    target_audience: String,
    status: String,
    published_at: Option<DateTime<Utc>>,
    students_count: i32,
    average_rating: f64,
    total_reviews: i32,
}

#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct CourseCreate {
    pub title: String,
    #[serde(default)]
    pub subtitle: String,
    #[serde(default)]
    pub description: String,
    pub category_id: Option<Uuid>,
    #[serde(default = "CourseCreate::default_level")]
    pub level: String,
    #[serde(default = "CourseCreate::default_language")]
    pub language: String,
    #[serde(default)]
    pub duration_hours: f64,
    #[serde(default)]
    pub price_cents: i64,
    pub discount_price_cents: Option<i64>,
    #[serde(default)]
    pub is_free: bool,
    #[serde(default)]
    pub learning_outcomes: String,
    #[serde(default)]
    pub requirements: String,
    #[serde(default)]
    pub target_audience: String,
}

impl CourseCreate {
    fn default_level() -> String {
        String::from("beginner")
    }

    fn default_language() -> String {
        String::from("English")
    }
}

impl ResourceTyped for Course {
    fn get_resource_type() -> crate::model::ResourceType {
        crate::model::ResourceType::Course
    }
}

impl Course {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn slug(&self) -> &str {
        &self.slug
    }

    pub fn instructor_id(&self) -> Uuid {
        self.instructor_id
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn is_published(&self) -> bool {
        self.status == "published"
    }

    pub fn price_cents(&self) -> i64 {
        self.price_cents
    }

    pub fn students_count(&self) -> i32 {
        self.students_count
    }

    pub fn average_rating(&self) -> f64 {
        self.average_rating
    }

    pub fn total_reviews(&self) -> i32 {
        self.total_reviews
    }

    /// Discounted price when the discount undercuts the list price, zero for
    /// free courses.
    pub fn current_price(&self) -> i64 {
        if self.is_free {
            return 0;
        }
        match self.discount_price_cents {
            Some(discount) if discount < self.price_cents => discount,
            _ => self.price_cents,
        }
    }

    pub fn has_discount(&self) -> bool {
        self.discount_price_cents
            .is_some_and(|discount| discount < self.price_cents)
    }

    pub fn is_payable(&self) -> bool {
        !self.is_free && self.current_price() > 0
    }

    async fn unique_slug(mm: &ModelManager, title: &str, own_id: Uuid) -> DatabaseResult<String> {
        let mut base = slugify(title);
        if base.is_empty() {
            // titles that slugify away entirely (e.g. cyrillic) get a random tail
            base = format!("course-{}", &Uuid::new_v4().simple().to_string()[..8]);
        }

        let mut slug = base.clone();
        let mut counter = 1;
        loop {
            let taken: i64 =
                sqlx::query_scalar("SELECT COUNT(*) FROM courses WHERE slug = $1 AND id <> $2")
                    .bind(&slug)
                    .bind(own_id)
                    .fetch_one(mm.executor())
                    .await?;

            if taken == 0 {
                return Ok(slug);
            }
            slug = format!("{base}-{counter}");
            counter += 1;
        }
    }
}

#[async_trait]
impl CrudRepository<Course, CourseCreate, uuid::Uuid> for Course {
    async fn create(
        mm: &ModelManager,
        actor: &AuthenticatedUser,
        data: CourseCreate,
    ) -> DatabaseResult<Self> {
        let id = Uuid::new_v4();
        let slug = Self::unique_slug(mm, &data.title, id).await?;

        let result = sqlx::query(
            r#"
            INSERT INTO courses (id, title, slug, subtitle, description, instructor_id, category_id,
                level, language, duration_hours, price_cents, discount_price_cents, is_free,
                learning_outcomes, requirements, target_audience)
            VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14,$15,$16)
            RETURNING id
            "#,
        )
        .bind(id)
        .bind(&data.title)
        .bind(&slug)
        .bind(&data.subtitle)
        .bind(&data.description)
        .bind(actor.user_id())
        .bind(data.category_id)
        .bind(&data.level)
        .bind(&data.language)
        .bind(data.duration_hours)
        .bind(data.price_cents)
        .bind(data.discount_price_cents)
        .bind(data.is_free)
        .bind(&data.learning_outcomes)
        .bind(&data.requirements)
        .bind(&data.target_audience)
        .fetch_one(mm.executor())
        .await?;

        let id = result.try_get("id")?;
        Ok(Course {
            id,
            title: data.title,
            slug,
            subtitle: data.subtitle,
            description: data.description,
            instructor_id: actor.user_id(),
            category_id: data.category_id,
            level: data.level,
            language: data.language,
            duration_hours: data.duration_hours,
            price_cents: data.price_cents,
            discount_price_cents: data.discount_price_cents,
            is_free: data.is_free,
            learning_outcomes: data.learning_outcomes,
            requirements: data.requirements,
            target_audience: data.target_audience,
            status: String::from("draft"),
            published_at: None,
            students_count: 0,
            average_rating: 0.0,
            total_reviews: 0,
        })
    }

    async fn update(
        mut self,
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        data: CourseCreate,
    ) -> DatabaseResult<Self> {
        sqlx::query(
            r#"
            UPDATE courses SET title = $1, subtitle = $2, description = $3, category_id = $4,
                level = $5, language = $6, duration_hours = $7, price_cents = $8,
                discount_price_cents = $9, is_free = $10, learning_outcomes = $11,
                requirements = $12, target_audience = $13, updated_at = now()
            WHERE id = $14
            "#,
        )
        .bind(&data.title)
        .bind(&data.subtitle)
        .bind(&data.description)
        .bind(data.category_id)
        .bind(&data.level)
        .bind(&data.language)
        .bind(data.duration_hours)
        .bind(data.price_cents)
        .bind(data.discount_price_cents)
        .bind(data.is_free)
        .bind(&data.learning_outcomes)
        .bind(&data.requirements)
        .bind(&data.target_audience)
        .bind(self.id)
        .execute(mm.executor())
        .await?;

        self.title = data.title;
        self.subtitle = data.subtitle;
        self.description = data.description;
        self.category_id = data.category_id;
        self.level = data.level;
        self.language = data.language;
        self.duration_hours = data.duration_hours;
        self.price_cents = data.price_cents;
        self.discount_price_cents = data.discount_price_cents;
        self.is_free = data.is_free;
        self.learning_outcomes = data.learning_outcomes;
        self.requirements = data.requirements;
        self.target_audience = data.target_audience;
        Ok(self)
    }

    async fn delete(self, mm: &ModelManager, _actor: &AuthenticatedUser) -> DatabaseResult<()> {
        sqlx::query("DELETE FROM courses WHERE id = $1")
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
        let result = sqlx::query_as("SELECT * FROM courses WHERE id = $1")
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
            sqlx::query_as("SELECT * FROM courses ORDER BY created_at DESC LIMIT $1 OFFSET $2")
                .bind(limit)
                .bind(offset)
                .fetch_all(mm.executor())
                .await?;
        Ok(result)
    }

    async fn count(mm: &ModelManager, _actor: &AuthenticatedUser) -> DatabaseResult<i64> {
        let result: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM courses")
            .fetch_one(mm.executor())
            .await?;

        Ok(result)
    }
}

impl_paginatable_for!(Course, CourseCreate, Uuid);

#[async_trait]
impl HasOwner for Course {
    type OwnerId = uuid::Uuid;

    async fn get_owner_id(
        &self,
        _mm: &ModelManager,
        _actor: &AuthenticatedUser,
    ) -> DatabaseResult<Self::OwnerId> {
        Ok(self.instructor_id)
    }
}

// Catalog browsing

#[derive(Debug, Clone, Copy, Default, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CatalogSort {
    #[default]
    Newest,
    PriceAsc,
    PriceDesc,
    Rating,
}

impl CatalogSort {
    fn order_clause(self) -> &'static str {
        match self {
            Self::Newest => "c.created_at DESC",
            Self::PriceAsc => "c.price_cents ASC",
            Self::PriceDesc => "c.price_cents DESC",
            Self::Rating => "c.average_rating DESC",
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, utoipa::ToSchema)]
pub struct CatalogFilter {
    pub category: Option<String>,
    pub level: Option<String>,
    #[serde(default)]
    pub free_only: bool,
    pub search: Option<String>,
    #[serde(default)]
    pub sort: CatalogSort,
}

impl Course {
    pub async fn find_by_slug(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        slug: &str,
    ) -> DatabaseResult<Option<Self>> {
        let result = sqlx::query_as("SELECT * FROM courses WHERE slug = $1")
            .bind(slug)
            .fetch_optional(mm.executor())
            .await?;
        Ok(result)
    }

    /// Published courses matching the catalog filter.
    pub async fn catalog_page(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        filter: &CatalogFilter,
        limit: i64,
        offset: i64,
    ) -> DatabaseResult<Vec<Self>> {
        let sql = format!(
            r#"
            SELECT c.*
            FROM courses c
            LEFT JOIN categories cat ON cat.id = c.category_id
            WHERE c.status = 'published'
              AND ($1::text IS NULL OR cat.slug = $1)
              AND ($2::text IS NULL OR c.level = $2)
              AND (NOT $3 OR c.is_free OR c.price_cents = 0)
              AND ($4::text IS NULL OR c.title ILIKE '%' || $4 || '%' OR c.subtitle ILIKE '%' || $4 || '%')
            ORDER BY {}
            LIMIT $5 OFFSET $6
            "#,
            filter.sort.order_clause()
        );

        let result = sqlx::query_as(&sql)
            .bind(filter.category.as_deref())
            .bind(filter.level.as_deref())
            .bind(filter.free_only)
            .bind(filter.search.as_deref())
            .bind(limit)
            .bind(offset)
            .fetch_all(mm.executor())
            .await?;
        Ok(result)
    }

    pub async fn catalog_count(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        filter: &CatalogFilter,
    ) -> DatabaseResult<i64> {
        let result: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM courses c
            LEFT JOIN categories cat ON cat.id = c.category_id
            WHERE c.status = 'published'
              AND ($1::text IS NULL OR cat.slug = $1)
              AND ($2::text IS NULL OR c.level = $2)
              AND (NOT $3 OR c.is_free OR c.price_cents = 0)
              AND ($4::text IS NULL OR c.title ILIKE '%' || $4 || '%' OR c.subtitle ILIKE '%' || $4 || '%')
            "#,
        )
        .bind(filter.category.as_deref())
        .bind(filter.level.as_deref())
        .bind(filter.free_only)
        .bind(filter.search.as_deref())
        .fetch_one(mm.executor())
        .await?;
        Ok(result)
    }

    pub async fn all_by_instructor(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        instructor_id: Uuid,
    ) -> DatabaseResult<Vec<Self>> {
        let result = sqlx::query_as(
            "SELECT * FROM courses WHERE instructor_id = $1 ORDER BY created_at DESC",
        )
        .bind(instructor_id)
        .fetch_all(mm.executor())
        .await?;
        Ok(result)
    }

    /// Publishing needs at least one lesson somewhere in the course.
    pub async fn has_content(&self, mm: &ModelManager) -> DatabaseResult<bool> {
        let result: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM lessons l
                JOIN sections s ON s.id = l.section_id
                WHERE s.course_id = $1
            )
            "#,
        )
        .bind(self.id)
        .fetch_one(mm.executor())
        .await?;
        Ok(result)
    }

    pub async fn set_status(
        mut self,
        mm: &ModelManager,
        status: &str,
    ) -> DatabaseResult<Self> {
        let published_at = if status == "published" {
            Some(Utc::now())
        } else {
            None
        };
        sqlx::query(
            "UPDATE courses SET status = $1, published_at = COALESCE($2, published_at), updated_at = now() WHERE id = $3",
        )
        .bind(status)
        .bind(published_at)
        .bind(self.id)
        .execute(mm.executor())
        .await?;

        self.status = status.to_string();
        if published_at.is_some() {
            self.published_at = published_at;
        }
        Ok(self)
    }

    pub async fn increment_students(&self, mm: &ModelManager) -> DatabaseResult<()> {
        sqlx::query("UPDATE courses SET students_count = students_count + 1 WHERE id = $1")
            .bind(self.id)
            .execute(mm.executor())
            .await?;
        Ok(())
    }
}

// Course detail with nested sections/lessons

#[derive(sqlx::FromRow)]
pub struct CourseWithSectionsRow {
    pub id: Uuid,
    pub sections: serde_json::Value,
}

impl CourseWithSectionsRow {
    pub async fn fetch(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        course_id: Uuid,
    ) -> DatabaseResult<Self> {
        let row: CourseWithSectionsRow = sqlx::query_as(
            r#"
            SELECT
                c.id,
                COALESCE(
                    json_agg(
                        json_build_object(
                            'id', s.id,
                            'title', s.title,
                            'description', s.description,
                            'order_index', s.order_index,
                            'lessons', (
                                SELECT COALESCE(
                                    json_agg(
                                        json_build_object(
                                            'id', l.id,
                                            'title', l.title,
                                            'lesson_type', l.lesson_type,
                                            'order_index', l.order_index,
                                            'duration_minutes', l.duration_minutes,
                                            'is_preview', l.is_preview
                                        )
                                        ORDER BY l.order_index, l.created_at
                                    ),
                                    '[]'
                                )
                                FROM lessons l WHERE l.section_id = s.id
                            )
                        )
                        ORDER BY s.order_index, s.created_at
                    ) FILTER (WHERE s.id IS NOT NULL),
                    '[]'
                ) AS sections
            FROM courses c
            LEFT JOIN sections s ON s.course_id = c.id
            WHERE c.id = $1
            GROUP BY c.id
            "#,
        )
        .bind(course_id)
        .fetch_one(mm.executor())
        .await?;

        Ok(row)
    }
}
