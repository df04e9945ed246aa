mod common;
use chrono::{Duration, Utc};
use coursemaster::model::entity::{
    Course, CourseCreate, PromoCode, PromoCodeCreate, UserEntity, UserEntityCreateUpdate,
};
use coursemaster::model::{CrudRepository, DbConnection, ModelManager};
use coursemaster::web::{AuthenticatedUser, UserRole};

use crate::common::setup_test_db;

fn course_payload(title: &str, price_cents: i64) -> CourseCreate {
    CourseCreate {
        title: title.to_string(),
        subtitle: String::new(),
        description: String::new(),
        category_id: None,
        level: String::from("beginner"),
        language: String::from("English"),
        duration_hours: 0.0,
        price_cents,
        discount_price_cents: None,
        is_free: false,
        learning_outcomes: String::new(),
        requirements: String::new(),
        target_audience: String::new(),
    }
}

/// Course-restricted promo codes cover only the courses in their join table;
/// an empty table means every course.
#[tokio::test]
async fn promo_course_restrictions_and_usage() {
    let db = setup_test_db().await;
    let mm = ModelManager::new(DbConnection::from_pool(db.pool.clone()));
    let admin = AuthenticatedUser::admin();

    let instructor = UserEntity::create(
        &mm,
        &admin,
        UserEntityCreateUpdate {
            username: String::from("promo_teacher"),
            password_hash: coursemaster::auth::hash_password("pw").unwrap(),
            full_name: String::new(),
            bio: String::new(),
            headline: String::new(),
        },
    )
    .await
    .unwrap()
    .set_role(&mm, &admin, UserRole::Instructor)
    .await
    .unwrap();

    let owner = AuthenticatedUser::new(instructor.id(), instructor.role());
    let covered = Course::create(&mm, &owner, course_payload("Covered course", 10_000))
        .await
        .unwrap();
    let other = Course::create(&mm, &owner, course_payload("Other course", 10_000))
        .await
        .unwrap();

    let now = Utc::now();
    let open_code = PromoCode::create(
        &mm,
        &admin,
        PromoCodeCreate {
            code: String::from("EVERYWHERE"),
            description: String::new(),
            discount_type: String::from("percent"),
            discount_value: 10,
            max_uses: Some(2),
            is_active: true,
            valid_from: now - Duration::days(1),
            valid_until: now + Duration::days(1),
        },
    )
    .await
    .unwrap();

    let restricted = PromoCode::create(
        &mm,
        &admin,
        PromoCodeCreate {
            code: String::from("ONECOURSE"),
            description: String::new(),
            discount_type: String::from("fixed"),
            discount_value: 2_500,
            max_uses: None,
            is_active: true,
            valid_from: now - Duration::days(1),
            valid_until: now + Duration::days(1),
        },
    )
    .await
    .unwrap();
    restricted.restrict_to_course(&mm, covered.id()).await.unwrap();

    // no join rows: valid everywhere
    assert!(open_code.applies_to_course(&mm, covered.id()).await.unwrap());
    assert!(open_code.applies_to_course(&mm, other.id()).await.unwrap());

    // restricted: the listed course only
    assert!(restricted.applies_to_course(&mm, covered.id()).await.unwrap());
    assert!(!restricted.applies_to_course(&mm, other.id()).await.unwrap());

    // usage cap: two uses, then the code stops validating
    let open_code = open_code.increment_uses(&mm).await.unwrap();
    assert!(open_code.is_valid());
    let open_code = open_code.increment_uses(&mm).await.unwrap();
    assert_eq!(open_code.current_uses(), 2);
    assert!(!open_code.is_valid());

    // a fresh read agrees with the in-memory copy
    let reloaded = PromoCode::find_by_code(&mm, &admin, "EVERYWHERE")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(reloaded.current_uses(), 2);
}
