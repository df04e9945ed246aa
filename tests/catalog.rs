mod common;
use reqwest::StatusCode;
use serde_json::json;

use crate::common::{
    Action, Flow, promote_to_instructor, setup_server, setup_test_db, signin_action, signup_action,
};

#[tokio::test]
async fn course_builder_and_catalog_flow() {
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
                .with_body(json!({
                    "title": "Rust for the Impatient",
                    "subtitle": "ownership without tears",
                    "is_free": true,
                    "level": "beginner",
                }))
                .with_expect(StatusCode::OK)
                .assert_body(|body| {
                    assert!(body.contains("rust-for-the-impatient"));
                    assert!(body.contains("draft"));
                })
                .with_save_as("course"),
        )
        // a course without lessons cannot go live
        .step(
            Action::new("publish_empty", "POST", "dynamic")
                .with_dyn_path(|ctx| format!("/api/v1/courses/{}/publish", ctx.get_id("course")))
                .with_expect(StatusCode::BAD_REQUEST),
        )
        .step(
            Action::new("section_create", "POST", "/api/v1/sections/")
                .with_dyn_body(|ctx| {
                    json!({
                        "course_id": ctx.get_id("course"),
                        "title": "Getting started",
                    })
                })
                .with_expect(StatusCode::OK)
                .with_save_as("section"),
        )
        .step(
            Action::new("lesson_create", "POST", "/api/v1/lessons/")
                .with_dyn_body(|ctx| {
                    json!({
                        "section_id": ctx.get_id("section"),
                        "title": "Hello, cargo",
                        "lesson_type": "article",
                        "content": "cargo new hello",
                    })
                })
                .with_expect(StatusCode::OK)
                .with_save_as("lesson"),
        )
        .step(
            Action::new("publish", "POST", "dynamic")
                .with_dyn_path(|ctx| format!("/api/v1/courses/{}/publish", ctx.get_id("course")))
                .with_expect(StatusCode::OK)
                .assert_body(|body| {
                    assert!(body.contains("published"));
                }),
        )
        // the published course shows up in the public catalog
        .step(
            Action::new("catalog", "GET", "/api/v1/courses/catalog")
                .with_param("limit", "10")
                .with_param("offset", "0")
                .with_clear_cookies(true)
                .with_save_cookies(false)
                .with_expect(StatusCode::OK)
                .assert_body(|body| {
                    assert!(body.contains("Rust for the Impatient"));
                }),
        )
        // text search filters it out
        .step(
            Action::new("catalog_search_miss", "GET", "/api/v1/courses/catalog")
                .with_param("limit", "10")
                .with_param("offset", "0")
                .with_param("search", "quantum knitting")
                .with_save_cookies(false)
                .with_expect(StatusCode::OK)
                .assert_body(|body| {
                    assert!(!body.contains("Rust for the Impatient"));
                }),
        )
        // public detail by slug, section tree included
        .step(
            Action::new("detail", "GET", "/api/v1/courses/rust-for-the-impatient")
                .with_save_cookies(false)
                .with_expect(StatusCode::OK)
                .assert_body(|body| {
                    assert!(body.contains("Getting started"));
                    assert!(body.contains("Hello, cargo"));
                }),
        )
        // the teacher takes it down again
        .step(signin_action("teacher", "teacher").with_clear_cookies(true))
        .step(
            Action::new("unpublish", "POST", "dynamic")
                .with_dyn_path(|ctx| {
                    format!("/api/v1/courses/{}/unpublish", ctx.get_id("course"))
                })
                .with_expect(StatusCode::OK),
        )
        // a draft course disappears for everybody else
        .step(
            Action::new("detail_draft", "GET", "/api/v1/courses/rust-for-the-impatient")
                .with_clear_cookies(true)
                .with_save_cookies(false)
                .with_expect(StatusCode::NOT_FOUND),
        )
        .run(&mut server, pool)
        .await;
}

#[tokio::test]
async fn students_cannot_build_courses() {
    let pool = setup_test_db().await;
    let mut server = setup_server(&pool).await;

    Flow::new()
        .step(signup_action("student", "student"))
        .step(
            Action::new("course_create_forbidden", "POST", "/api/v1/courses/")
                .with_body(json!({ "title": "Not allowed" }))
                .with_expect(StatusCode::FORBIDDEN),
        )
        .step(
            Action::new("teaching_forbidden", "GET", "/api/v1/courses/teaching")
                .with_expect(StatusCode::FORBIDDEN),
        )
        .run(&mut server, pool)
        .await;
}
