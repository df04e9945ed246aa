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
pub struct PromoCode {
    id: Uuid,
    code: String,
    description: String,
    discount_type: String,
    /// Cents for `fixed`, whole percent for `percent`.
    discount_value: i64,
    max_uses: Option<i32>,
    current_uses: i32,
    is_active: bool,
    valid_from: DateTime<Utc>,
    valid_until: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct PromoCodeCreate {
    pub code: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "PromoCodeCreate::default_discount_type")]
    pub discount_type: String,
    pub discount_value: i64,
    pub max_uses: Option<i32>,
    #[serde(default = "PromoCodeCreate::default_active")]
    pub is_active: bool,
    pub valid_from: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
}

impl PromoCodeCreate {
    fn default_discount_type() -> String {
        String::from("percent")
    }

    fn default_active() -> bool {
        true
    }
}

impl ResourceTyped for PromoCode {
    fn get_resource_type() -> crate::model::ResourceType {
        crate::model::ResourceType::PromoCode
    }
}

impl PromoCode {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn discount_type(&self) -> &str {
        &self.discount_type
    }

    pub fn discount_value(&self) -> i64 {
        self.discount_value
    }

    pub fn current_uses(&self) -> i32 {
        self.current_uses
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid_at(Utc::now())
    }

    /// Active, inside the validity window, and under the usage cap.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        if !self.is_active {
            return false;
        }
        if now < self.valid_from || now > self.valid_until {
            return false;
        }
        if let Some(max) = self.max_uses
            && self.current_uses >= max
        {
            return false;
        }
        true
    }

    /// Price after the discount, never below zero.
    pub fn apply(&self, price_cents: i64) -> i64 {
        let discounted = match self.discount_type.as_str() {
            "fixed" => price_cents - self.discount_value,
            _ => price_cents - price_cents * self.discount_value / 100,
        };
        discounted.max(0)
    }
}

#[async_trait]
impl CrudRepository<PromoCode, PromoCodeCreate, uuid::Uuid> for PromoCode {
    async fn create(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        data: PromoCodeCreate,
    ) -> DatabaseResult<Self> {
        let row = sqlx::query_as(
            r#"
            INSERT INTO promo_codes (id, code, description, discount_type, discount_value,
                max_uses, is_active, valid_from, valid_until)
            VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&data.code)
        .bind(&data.description)
        .bind(&data.discount_type)
        .bind(data.discount_value)
        .bind(data.max_uses)
        .bind(data.is_active)
        .bind(data.valid_from)
        .bind(data.valid_until)
        .fetch_one(mm.executor())
        .await?;

        Ok(row)
    }

    async fn update(
        mut self,
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        data: PromoCodeCreate,
    ) -> DatabaseResult<Self> {
        sqlx::query(
            r#"
            UPDATE promo_codes SET code = $1, description = $2, discount_type = $3,
                discount_value = $4, max_uses = $5, is_active = $6, valid_from = $7, valid_until = $8
            WHERE id = $9
            "#,
        )
        .bind(&data.code)
        .bind(&data.description)
        .bind(&data.discount_type)
        .bind(data.discount_value)
        .bind(data.max_uses)
        .bind(data.is_active)
        .bind(data.valid_from)
        .bind(data.valid_until)
        .bind(self.id)
        .execute(mm.executor())
        .await?;

        self.code = data.code;
        self.description = data.description;
        self.discount_type = data.discount_type;
        self.discount_value = data.discount_value;
        self.max_uses = data.max_uses;
        self.is_active = data.is_active;
        self.valid_from = data.valid_from;
        self.valid_until = data.valid_until;
        Ok(self)
    }

    async fn delete(self, mm: &ModelManager, _actor: &AuthenticatedUser) -> DatabaseResult<()> {
        sqlx::query("DELETE FROM promo_codes WHERE id = $1")
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
        let result = sqlx::query_as("SELECT * FROM promo_codes WHERE id = $1")
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
            sqlx::query_as("SELECT * FROM promo_codes ORDER BY created_at DESC LIMIT $1 OFFSET $2")
                .bind(limit)
                .bind(offset)
                .fetch_all(mm.executor())
                .await?;
        Ok(result)
    }

    async fn count(mm: &ModelManager, _actor: &AuthenticatedUser) -> DatabaseResult<i64> {
        let result: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM promo_codes")
            .fetch_one(mm.executor())
            .await?;

        Ok(result)
    }
}

#[async_trait]
impl HasOwner for PromoCode {
    type OwnerId = uuid::Uuid;

    async fn get_owner_id(
        &self,
        _mm: &ModelManager,
        _actor: &AuthenticatedUser,
    ) -> DatabaseResult<Self::OwnerId> {
        Ok(self.id) // admin-managed
    }
}

// Utils

impl PromoCode {
    pub async fn find_by_code(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        code: &str,
    ) -> DatabaseResult<Option<Self>> {
        let result = sqlx::query_as("SELECT * FROM promo_codes WHERE code = $1")
            .bind(code)
            .fetch_optional(mm.executor())
            .await?;
        Ok(result)
    }

    /// A code with no rows in the join table covers every course.
    pub async fn applies_to_course(
        &self,
        mm: &ModelManager,
        course_id: Uuid,
    ) -> DatabaseResult<bool> {
        let restricted: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM promo_code_courses WHERE promo_code_id = $1")
                .bind(self.id)
                .fetch_one(mm.executor())
                .await?;
        if restricted == 0 {
            return Ok(true);
        }

        let allowed: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM promo_code_courses WHERE promo_code_id = $1 AND course_id = $2)",
        )
        .bind(self.id)
        .bind(course_id)
        .fetch_one(mm.executor())
        .await?;
        Ok(allowed)
    }

    pub async fn restrict_to_course(
        &self,
        mm: &ModelManager,
        course_id: Uuid,
    ) -> DatabaseResult<()> {
        sqlx::query(
            "INSERT INTO promo_code_courses (promo_code_id, course_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(self.id)
        .bind(course_id)
        .execute(mm.executor())
        .await?;
        Ok(())
    }

    pub async fn increment_uses(mut self, mm: &ModelManager) -> DatabaseResult<Self> {
        let current_uses: i32 = sqlx::query_scalar(
            "UPDATE promo_codes SET current_uses = current_uses + 1 WHERE id = $1 RETURNING current_uses",
        )
        .bind(self.id)
        .fetch_one(mm.executor())
        .await?;

        self.current_uses = current_uses;
        Ok(self)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use chrono::Duration;

    fn code(discount_type: &str, discount_value: i64) -> PromoCode {
        let now = Utc::now();
        PromoCode {
            id: Uuid::new_v4(),
            code: String::from("WELCOME"),
            description: String::new(),
            discount_type: discount_type.to_string(),
            discount_value,
            max_uses: Some(10),
            current_uses: 0,
            is_active: true,
            valid_from: now - Duration::days(1),
            valid_until: now + Duration::days(1),
        }
    }

    #[test]
    fn percent_discount_is_proportional() {
        let promo = code("percent", 25);
        assert_eq!(promo.apply(10_000), 7_500);
        assert_eq!(promo.apply(0), 0);
    }

    #[test]
    fn fixed_discount_never_goes_negative() {
        let promo = code("fixed", 5_000);
        assert_eq!(promo.apply(10_000), 5_000);
        assert_eq!(promo.apply(3_000), 0);
    }

    #[test]
    fn validity_checks_window_activity_and_uses() {
        let now = Utc::now();

        let mut promo = code("percent", 10);
        assert!(promo.is_valid_at(now));

        promo.is_active = false;
        assert!(!promo.is_valid_at(now));

        let mut promo = code("percent", 10);
        promo.current_uses = 10;
        assert!(!promo.is_valid_at(now));

        // unlimited uses
        let mut promo = code("percent", 10);
        promo.max_uses = None;
        promo.current_uses = 1_000;
        assert!(promo.is_valid_at(now));

        let promo = code("percent", 10);
        assert!(!promo.is_valid_at(now + Duration::days(2)));
        assert!(!promo.is_valid_at(now - Duration::days(2)));
    }
}
