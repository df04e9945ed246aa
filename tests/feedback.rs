mod common;
use reqwest::StatusCode;
use serde_json::json;

use crate::common::{
    Action, Flow, promote_to_instructor, setup_server, setup_test_db, signin_action, signup_action,
};

fn build_published_course(flow: Flow) -> Flow {
    flow.step(signin_action("teacher", "teacher").with_clear_cookies(true))
        .step(
            Action::new("course_create", "POST", "/api/v1/courses/")
                .with_body(json!({ "title": "Reviewable course", "is_free": true }))
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
                })
                .with_save_as("lesson"),
        )
        .step(
            Action::new("publish", "POST", "dynamic")
                .with_dyn_path(|ctx| format!("/api/v1/courses/{}/publish", ctx.get_id("course"))),
        )
}

/// Reviews: enrollment gate, one per student, and the course aggregates
/// following along.
#[tokio::test]
async fn review_flow_updates_course_stats() {
    let pool = setup_test_db().await;
    let mut server = setup_server(&pool).await;

    Flow::new()
        .step(signup_action("teacher", "teacher").with_save_cookies(false))
        .step(signup_action("student", "student").with_save_cookies(false))
        .run_with_pool(&mut server, &pool)
        .await;

    promote_to_instructor(&pool, "teacher").await;

    build_published_course(Flow::new())
        .step(signin_action("student", "student").with_clear_cookies(true))
        // no enrollment, no review
        .step(
            Action::new("review_unenrolled", "POST", "/api/v1/reviews/")
                .with_dyn_body(|ctx| {
                    json!({
                        "course_id": ctx.get_id("course"),
                        "rating": 5,
                        "comment": "premature praise",
                    })
                })
                .with_expect(StatusCode::BAD_REQUEST),
        )
        .step(
            Action::new("enroll", "POST", "dynamic")
                .with_dyn_path(|ctx| format!("/api/v1/courses/{}/enroll", ctx.get_id("course"))),
        )
        .step(
            Action::new("review_bad_rating", "POST", "/api/v1/reviews/")
                .with_dyn_body(|ctx| {
                    json!({
                        "course_id": ctx.get_id("course"),
                        "rating": 11,
                        "comment": "over the top",
                    })
                })
                .with_expect(StatusCode::BAD_REQUEST),
        )
        .step(
            Action::new("review_create", "POST", "/api/v1/reviews/")
                .with_dyn_body(|ctx| {
                    json!({
                        "course_id": ctx.get_id("course"),
                        "rating": 4,
                        "title": "solid",
                        "comment": "well paced",
                    })
                })
                .with_expect(StatusCode::OK)
                .with_save_as("review"),
        )
        // the second one bounces off the unique pair
        .step(
            Action::new("review_twice", "POST", "/api/v1/reviews/")
                .with_dyn_body(|ctx| {
                    json!({
                        "course_id": ctx.get_id("course"),
                        "rating": 1,
                        "comment": "changed my mind",
                    })
                })
                .with_expect(StatusCode::CONFLICT),
        )
        // the aggregate landed on the course card
        .step(
            Action::new("detail_with_rating", "GET", "/api/v1/courses/reviewable-course")
                .with_save_cookies(false)
                .assert_body(|body| {
                    assert!(body.contains("\"average_rating\":4"));
                    assert!(body.contains("\"total_reviews\":1"));
                    assert!(body.contains("well paced"));
                }),
        )
        // deleting the review resets the aggregates
        .step(
            Action::new("review_delete", "DELETE", "dynamic")
                .with_dyn_path(|ctx| format!("/api/v1/reviews/{}", ctx.get_id("review"))),
        )
        .step(
            Action::new("detail_no_rating", "GET", "/api/v1/courses/reviewable-course")
                .with_save_cookies(false)
                .assert_body(|body| {
                    assert!(body.contains("\"total_reviews\":0"));
                }),
        )
        .run(&mut server, pool)
        .await;
}

/// Comments: participants only, pinning is the instructor's.
#[tokio::test]
async fn comment_flow_with_pinning() {
    let pool = setup_test_db().await;
    let mut server = setup_server(&pool).await;

    Flow::new()
        .step(signup_action("teacher", "teacher").with_save_cookies(false))
        .step(signup_action("student", "student").with_save_cookies(false))
        .run_with_pool(&mut server, &pool)
        .await;

    promote_to_instructor(&pool, "teacher").await;

    build_published_course(Flow::new())
        .step(signin_action("student", "student").with_clear_cookies(true))
        // outsiders stay silent
        .step(
            Action::new("comment_unenrolled", "POST", "/api/v1/comments/")
                .with_dyn_body(|ctx| {
                    json!({ "lesson_id": ctx.get_id("lesson"), "content": "hello?" })
                })
                .with_expect(StatusCode::FORBIDDEN),
        )
        .step(
            Action::new("enroll", "POST", "dynamic")
                .with_dyn_path(|ctx| format!("/api/v1/courses/{}/enroll", ctx.get_id("course"))),
        )
        .step(
            Action::new("comment_create", "POST", "/api/v1/comments/")
                .with_dyn_body(|ctx| {
                    json!({ "lesson_id": ctx.get_id("lesson"), "content": "great lesson" })
                })
                .with_save_as("comment"),
        )
        // students do not pin
        .step(
            Action::new("pin_forbidden", "POST", "dynamic")
                .with_dyn_path(|ctx| format!("/api/v1/comments/{}/pin", ctx.get_id("comment")))
                .with_expect(StatusCode::FORBIDDEN),
        )
        .step(signin_action("teacher", "teacher").with_clear_cookies(true))
        .step(
            Action::new("pin", "POST", "dynamic")
                .with_dyn_path(|ctx| format!("/api/v1/comments/{}/pin", ctx.get_id("comment")))
                .assert_body(|body| {
                    assert!(body.contains("\"is_pinned\":true"));
                }),
        )
        .step(
            Action::new("comment_list", "GET", "dynamic")
                .with_dyn_path(|ctx| format!("/api/v1/comments/lesson/{}", ctx.get_id("lesson")))
                .assert_body(|body| {
                    assert!(body.contains("great lesson"));
                    assert!(body.contains("\"is_pinned\":true"));
                }),
        )
        .run(&mut server, pool)
        .await;
}

/// Assignments: submit, re-submit, instructor grading with point clamping.
#[tokio::test]
async fn assignment_submit_and_grade_flow() {
    let pool = setup_test_db().await;
    let mut server = setup_server(&pool).await;

    Flow::new()
        .step(signup_action("teacher", "teacher").with_save_cookies(false))
        .step(signup_action("student", "student").with_save_cookies(false))
        .run_with_pool(&mut server, &pool)
        .await;

    promote_to_instructor(&pool, "teacher").await;

    build_published_course(Flow::new())
        .step(
            Action::new("assignment_create", "POST", "/api/v1/assignments/")
                .with_dyn_body(|ctx| {
                    json!({
                        "lesson_id": ctx.get_id("lesson"),
                        "title": "Write a parser",
                        "max_points": 20,
                    })
                })
                .with_save_as("assignment"),
        )
        .step(signin_action("student", "student").with_clear_cookies(true))
        .step(
            Action::new("enroll", "POST", "dynamic")
                .with_dyn_path(|ctx| format!("/api/v1/courses/{}/enroll", ctx.get_id("course"))),
        )
        .step(
            Action::new("submit", "POST", "dynamic")
                .with_dyn_path(|ctx| {
                    format!("/api/v1/assignments/{}/submit", ctx.get_id("assignment"))
                })
                .with_body(json!({ "submitted_text": "first draft" }))
                .assert_body(|body| {
                    assert!(body.contains("submitted"));
                })
                .with_save_as("submission"),
        )
        // re-submitting replaces the text and resets the state
        .step(
            Action::new("resubmit", "POST", "dynamic")
                .with_dyn_path(|ctx| {
                    format!("/api/v1/assignments/{}/submit", ctx.get_id("assignment"))
                })
                .with_body(json!({ "submitted_text": "second draft" }))
                .assert_body(|body| {
                    assert!(body.contains("second draft"));
                }),
        )
        .step(signin_action("teacher", "teacher").with_clear_cookies(true))
        // points above max_points get clamped to 20
        .step(
            Action::new("grade", "POST", "dynamic")
                .with_dyn_path(|ctx| {
                    format!(
                        "/api/v1/assignments/submissions/{}/grade",
                        ctx.get_id("submission")
                    )
                })
                .with_body(json!({ "points": 120, "comment": "nice work" }))
                .assert_body(|body| {
                    assert!(body.contains("\"points_earned\":20"));
                    assert!(body.contains("graded"));
                }),
        )
        // no due date was set, so nothing is late
        .step(
            Action::new("assignment_detail", "GET", "dynamic")
                .with_dyn_path(|ctx| format!("/api/v1/assignments/{}", ctx.get_id("assignment")))
                .assert_body(|body| {
                    assert!(body.contains("second draft"));
                    assert!(body.contains("\"is_late\":false"));
                }),
        )
        .run(&mut server, pool)
        .await;
}
