mod common;
use reqwest::StatusCode;
use serde_json::json;

use crate::common::{
    Action, Flow, promote_to_instructor, setup_server, setup_test_db, signin_action, signup_action,
};

/// Quiz building plus the single-correct invariant, then a full attempt.
#[tokio::test]
async fn quiz_build_and_attempt_flow() {
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
                .with_body(json!({ "title": "Quizzes 101", "is_free": true }))
                .with_save_as("course"),
        )
        .step(
            Action::new("section_create", "POST", "/api/v1/sections/")
                .with_dyn_body(|ctx| {
                    json!({ "course_id": ctx.get_id("course"), "title": "Theory" })
                })
                .with_save_as("section"),
        )
        .step(
            Action::new("lesson_create", "POST", "/api/v1/lessons/")
                .with_dyn_body(|ctx| {
                    json!({
                        "section_id": ctx.get_id("section"),
                        "title": "Final test",
                        "lesson_type": "quiz",
                    })
                })
                .with_save_as("lesson"),
        )
        .step(
            Action::new("quiz_create", "POST", "/api/v1/quizzes/")
                .with_dyn_body(|ctx| {
                    json!({
                        "lesson_id": ctx.get_id("lesson"),
                        "title": "Final",
                        "pass_percentage": 50,
                        "attempts_limit": 2,
                    })
                })
                .with_save_as("quiz"),
        )
        // one quiz per lesson
        .step(
            Action::new("quiz_create_again", "POST", "/api/v1/quizzes/")
                .with_dyn_body(|ctx| json!({ "lesson_id": ctx.get_id("lesson") }))
                .with_expect(StatusCode::CONFLICT),
        )
        .step(
            Action::new("question_create", "POST", "/api/v1/quizzes/questions")
                .with_dyn_body(|ctx| {
                    json!({
                        "quiz_id": ctx.get_id("quiz"),
                        "qtype": "single",
                        "text": "Is Rust memory safe?",
                    })
                })
                .with_save_as("q1"),
        )
        .step(
            Action::new("choice_yes", "POST", "/api/v1/quizzes/choices")
                .with_dyn_body(|ctx| {
                    json!({
                        "question_id": ctx.get_id("q1"),
                        "text": "yes",
                        "is_correct": true,
                    })
                })
                .with_save_as("c_yes"),
        )
        // flipping another choice to correct must clear the first one
        .step(
            Action::new("choice_no", "POST", "/api/v1/quizzes/choices")
                .with_dyn_body(|ctx| {
                    json!({
                        "question_id": ctx.get_id("q1"),
                        "text": "no",
                        "is_correct": true,
                    })
                })
                .with_save_as("c_no"),
        )
        .step(
            Action::new("quiz_detail", "GET", "dynamic")
                .with_dyn_path(|ctx| format!("/api/v1/quizzes/{}", ctx.get_id("quiz")))
                .assert_body(|body| {
                    // exactly one correct choice after the invariant kicked in
                    assert_eq!(body.matches("\"is_correct\":true").count(), 1);
                }),
        )
        // a text question stays ungraded
        .step(
            Action::new("question_text", "POST", "/api/v1/quizzes/questions")
                .with_dyn_body(|ctx| {
                    json!({
                        "quiz_id": ctx.get_id("quiz"),
                        "qtype": "text",
                        "text": "Explain borrowing.",
                    })
                })
                .with_save_as("q2"),
        )
        .step(
            Action::new("publish", "POST", "dynamic")
                .with_dyn_path(|ctx| format!("/api/v1/courses/{}/publish", ctx.get_id("course"))),
        )
        // student side
        .step(signin_action("student", "student").with_clear_cookies(true))
        .step(
            Action::new("enroll", "POST", "dynamic")
                .with_dyn_path(|ctx| format!("/api/v1/courses/{}/enroll", ctx.get_id("course"))),
        )
        .step(
            Action::new("attempt_start", "POST", "dynamic")
                .with_dyn_path(|ctx| format!("/api/v1/quizzes/{}/start", ctx.get_id("quiz")))
                .assert_body(|body| {
                    // students never see correct flags
                    assert!(!body.contains("is_correct"));
                    assert!(body.contains("Is Rust memory safe?"));
                })
                .with_save_as("started"),
        )
        .step(
            Action::new("attempt_submit", "POST", "dynamic")
                .with_dyn_path(|ctx| {
                    let attempt_id = ctx
                        .get("started")
                        .get("attempt")
                        .and_then(|a| a.get("id"))
                        .and_then(|id| id.as_str())
                        .expect("no attempt id")
                        .to_string();
                    format!("/api/v1/quizzes/attempts/{}/submit", attempt_id)
                })
                .with_dyn_body(|ctx| {
                    json!({
                        "answers": [
                            {
                                "question_id": ctx.get_id("q1"),
                                "choice_id": ctx.get_id("c_no"),
                            },
                            {
                                "question_id": ctx.get_id("q2"),
                                "text_answer": "Borrowing lends access without ownership.",
                            }
                        ]
                    })
                })
                .assert_body(|body| {
                    // 1 of 2 points, pass bar is 50%
                    assert!(body.contains("\"score\":1"));
                    assert!(body.contains("\"total_points\":2"));
                    assert!(body.contains("\"is_passed\":true"));
                }),
        )
        // attempts_limit is 2: one more start is fine, the next is not
        .step(
            Action::new("attempt_second", "POST", "dynamic")
                .with_dyn_path(|ctx| format!("/api/v1/quizzes/{}/start", ctx.get_id("quiz"))),
        )
        .step(
            Action::new("attempt_over_limit", "POST", "dynamic")
                .with_dyn_path(|ctx| format!("/api/v1/quizzes/{}/start", ctx.get_id("quiz")))
                .with_expect(StatusCode::BAD_REQUEST)
                .assert_body(|body| {
                    assert!(body.contains("attempts limit"));
                }),
        )
        .run(&mut server, pool)
        .await;
}
