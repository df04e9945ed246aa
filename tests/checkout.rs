mod common;
use reqwest::StatusCode;
use serde_json::json;
use uuid::Uuid;

use crate::common::{
    Action, Flow, FlowDatabase, promote_to_instructor, setup_server, setup_test_db, signin_action,
    signin_admin_action, signup_action,
};

async fn seed_payment_method(db: &FlowDatabase) -> Uuid {
    let id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO payment_methods (id, name, kind, description) VALUES ($1, 'Stripe Card', 'stripe', 'card payments')",
    )
    .bind(id)
    .execute(&db.pool)
    .await
    .unwrap();
    id
}

async fn seed_promo_code(db: &FlowDatabase, code: &str, percent: i64) {
    sqlx::query(
        r#"
        INSERT INTO promo_codes (id, code, discount_type, discount_value, valid_from, valid_until)
        VALUES ($1, $2, 'percent', $3, now() - interval '1 day', now() + interval '1 day')
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(code)
    .bind(percent)
    .execute(&db.pool)
    .await
    .unwrap();
}

/// Checkout end to end: quote with a promo code, stubbed payment, automatic
/// enrollment, then the refund round-trip.
#[tokio::test]
async fn purchase_pay_refund_flow() {
    let pool = setup_test_db().await;
    let mut server = setup_server(&pool).await;

    Flow::new()
        .step(signup_action("teacher", "teacher").with_save_cookies(false))
        .step(signup_action("buyer", "buyer").with_save_cookies(false))
        .run_with_pool(&mut server, &pool)
        .await;

    promote_to_instructor(&pool, "teacher").await;
    let method_id = seed_payment_method(&pool).await;
    seed_promo_code(&pool, "HALF", 50).await;

    let method_for_checkout = method_id.to_string();

    Flow::new()
        .step(signin_action("teacher", "teacher").with_clear_cookies(true))
        .step(
            Action::new("course_create", "POST", "/api/v1/courses/")
                .with_body(json!({
                    "title": "Paid masterclass",
                    "price_cents": 10_000,
                }))
                .with_save_as("course"),
        )
        .step(
            Action::new("section_create", "POST", "/api/v1/sections/")
                .with_dyn_body(|ctx| {
                    json!({ "course_id": ctx.get_id("course"), "title": "Only section" })
                })
                .with_save_as("section"),
        )
        .step(
            Action::new("lesson_create", "POST", "/api/v1/lessons/")
                .with_dyn_body(|ctx| {
                    json!({ "section_id": ctx.get_id("section"), "title": "Only lesson" })
                }),
        )
        .step(
            Action::new("publish", "POST", "dynamic")
                .with_dyn_path(|ctx| format!("/api/v1/courses/{}/publish", ctx.get_id("course"))),
        )
        // the buyer cannot sneak in without paying
        .step(signin_action("buyer", "buyer").with_clear_cookies(true))
        .step(
            Action::new("enroll_unpaid", "POST", "dynamic")
                .with_dyn_path(|ctx| format!("/api/v1/courses/{}/enroll", ctx.get_id("course")))
                .with_expect(StatusCode::BAD_REQUEST),
        )
        // a made-up code is rejected outright
        .step(
            Action::new("checkout_bad_promo", "POST", "/api/v1/checkout/")
                .with_dyn_body(|ctx| {
                    json!({
                        "course_id": ctx.get_id("course"),
                        "promo_code": "NOSUCHCODE",
                    })
                })
                .with_expect(StatusCode::BAD_REQUEST),
        )
        // quote: 50% off through the promo code
        .step(
            Action::new("checkout", "POST", "/api/v1/checkout/")
                .with_dyn_body(move |ctx| {
                    json!({
                        "course_id": ctx.get_id("course"),
                        "promo_code": "HALF",
                        "payment_method_id": method_for_checkout,
                    })
                })
                .assert_body(|body| {
                    assert!(body.contains("\"price_cents\":10000"));
                    assert!(body.contains("\"discount_cents\":5000"));
                    assert!(body.contains("\"total_cents\":5000"));
                    assert!(body.contains("pending"));
                })
                .with_save_as("purchase"),
        )
        .step(
            Action::new("pay", "POST", "dynamic")
                .with_dyn_path(|ctx| format!("/api/v1/checkout/{}/pay", ctx.get_id("purchase")))
                .assert_body(|body| {
                    assert!(body.contains("completed"));
                    assert!(body.contains("succeeded"));
                    assert!(body.contains("txn_"));
                    assert!(body.contains("pi_"));
                }),
        )
        // paying enrolled the buyer
        .step(
            Action::new("my_courses", "GET", "/api/v1/courses/my").assert_body(|body| {
                assert!(body.contains("Paid masterclass"));
            }),
        )
        // a second checkout of the same course is refused
        .step(
            Action::new("checkout_again", "POST", "/api/v1/checkout/")
                .with_dyn_body(|ctx| json!({ "course_id": ctx.get_id("course") }))
                .with_expect(StatusCode::CONFLICT),
        )
        .step(
            Action::new("history", "GET", "/api/v1/checkout/history")
                .with_param("limit", "10")
                .with_param("offset", "0")
                .assert_body(|body| {
                    assert!(body.contains("\"total\":1"));
                }),
        )
        // ask for the money back
        .step(
            Action::new("refund_request", "POST", "dynamic")
                .with_dyn_path(|ctx| {
                    format!("/api/v1/checkout/{}/refund", ctx.get_id("purchase"))
                })
                .with_body(json!({ "reason": "changed my mind" }))
                .assert_body(|body| {
                    assert!(body.contains("pending"));
                    assert!(body.contains("\"refund_amount_cents\":5000"));
                })
                .with_save_as("refund"),
        )
        // only one open request per purchase
        .step(
            Action::new("refund_again", "POST", "dynamic")
                .with_dyn_path(|ctx| {
                    format!("/api/v1/checkout/{}/refund", ctx.get_id("purchase"))
                })
                .with_body(json!({ "reason": "again" }))
                .with_expect(StatusCode::CONFLICT),
        )
        // admin decides
        .step(signin_admin_action().with_clear_cookies(true))
        .step(
            Action::new("refunds_pending", "GET", "/api/v1/checkout/refunds").assert_body(
                |body| {
                    assert!(body.contains("changed my mind"));
                },
            ),
        )
        .step(
            Action::new("refund_approve", "POST", "dynamic")
                .with_dyn_path(|ctx| {
                    format!("/api/v1/checkout/refunds/{}/approve", ctx.get_id("refund"))
                })
                .assert_body(|body| {
                    assert!(body.contains("completed"));
                }),
        )
        // the purchase now reads refunded
        .step(signin_action("buyer", "buyer").with_clear_cookies(true))
        .step(
            Action::new("history_refunded", "GET", "/api/v1/checkout/history")
                .with_param("limit", "10")
                .with_param("offset", "0")
                .assert_body(|body| {
                    assert!(body.contains("refunded"));
                }),
        )
        .run(&mut server, pool)
        .await;
}

/// Free courses never go through checkout.
#[tokio::test]
async fn free_courses_are_not_purchasable() {
    let pool = setup_test_db().await;
    let mut server = setup_server(&pool).await;

    Flow::new()
        .step(signup_action("teacher", "teacher").with_save_cookies(false))
        .step(signup_action("student", "student").with_save_cookies(false))
        .run_with_pool(&mut server, &pool)
        .await;

    promote_to_instructor(&pool, "teacher").await;

    Flow::new()
        .step(signin_action("teacher", "teacher").with_clear_cookies(true))
        .step(
            Action::new("course_create", "POST", "/api/v1/courses/")
                .with_body(json!({ "title": "Free course", "is_free": true }))
                .with_save_as("course"),
        )
        .step(
            Action::new("section_create", "POST", "/api/v1/sections/")
                .with_dyn_body(|ctx| {
                    json!({ "course_id": ctx.get_id("course"), "title": "S" })
                })
                .with_save_as("section"),
        )
        .step(
            Action::new("lesson_create", "POST", "/api/v1/lessons/")
                .with_dyn_body(|ctx| {
                    json!({ "section_id": ctx.get_id("section"), "title": "L" })
                }),
        )
        .step(
            Action::new("publish", "POST", "dynamic")
                .with_dyn_path(|ctx| format!("/api/v1/courses/{}/publish", ctx.get_id("course"))),
        )
        .step(signin_action("student", "student").with_clear_cookies(true))
        .step(
            Action::new("checkout_free", "POST", "/api/v1/checkout/")
                .with_dyn_body(|ctx| json!({ "course_id": ctx.get_id("course") }))
                .with_expect(StatusCode::BAD_REQUEST)
                .assert_body(|body| {
                    assert!(body.contains("free"));
                }),
        )
        // free means enroll directly
        .step(
            Action::new("enroll_free", "POST", "dynamic")
                .with_dyn_path(|ctx| format!("/api/v1/courses/{}/enroll", ctx.get_id("course")))
                .with_expect(StatusCode::OK),
        )
        .run(&mut server, pool)
        .await;
}
