mod common;
use reqwest::StatusCode;
use serde_json::json;

use crate::common::{
    Action, Flow, promote_to_instructor, setup_server, setup_test_db, signin_action, signup_action,
};

/// The whole student journey: enroll, answer a quiz step, finish the lesson,
/// earn the certificate and have it publicly verifiable.
#[tokio::test]
async fn enroll_answer_complete_certificate_flow() {
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
                .with_body(json!({ "title": "Async Rust", "is_free": true }))
                .with_save_as("course"),
        )
        .step(
            Action::new("section_create", "POST", "/api/v1/sections/")
                .with_dyn_body(|ctx| {
                    json!({ "course_id": ctx.get_id("course"), "title": "Futures" })
                })
                .with_save_as("section"),
        )
        .step(
            Action::new("lesson_create", "POST", "/api/v1/lessons/")
                .with_dyn_body(|ctx| {
                    json!({
                        "section_id": ctx.get_id("section"),
                        "title": "Polling",
                        "lesson_type": "article",
                    })
                })
                .with_save_as("lesson"),
        )
        .step(
            Action::new("quiz_step_create", "POST", "/api/v1/steps/")
                .with_dyn_body(|ctx| {
                    json!({
                        "lesson_id": ctx.get_id("lesson"),
                        "step_type": "quiz_single",
                        "title": "Executor quiz",
                        "content": {
                            "question": "What drives a future?",
                            "choices": ["a thread", "an executor", "the OS"],
                            "correct_index": 1,
                            "explanation": "Futures are inert until polled."
                        }
                    })
                })
                .with_save_as("quiz_step"),
        )
        .step(
            Action::new("text_step_create", "POST", "/api/v1/steps/")
                .with_dyn_body(|ctx| {
                    json!({
                        "lesson_id": ctx.get_id("lesson"),
                        "step_type": "text",
                        "title": "Recap",
                        "content": { "markdown": "Futures recap", "html": "" }
                    })
                })
                .with_save_as("text_step"),
        )
        .step(
            Action::new("publish", "POST", "dynamic")
                .with_dyn_path(|ctx| format!("/api/v1/courses/{}/publish", ctx.get_id("course"))),
        )
        // over to the student
        .step(signin_action("student", "student").with_clear_cookies(true))
        .step(
            Action::new("enroll", "POST", "dynamic")
                .with_dyn_path(|ctx| format!("/api/v1/courses/{}/enroll", ctx.get_id("course")))
                .assert_body(|body| {
                    assert!(body.contains("progress_percentage"));
                }),
        )
        // the lesson page never leaks the right answer
        .step(
            Action::new("lesson_view", "GET", "dynamic")
                .with_dyn_path(|ctx| format!("/api/v1/lessons/{}", ctx.get_id("lesson")))
                .assert_body(|body| {
                    assert!(body.contains("What drives a future?"));
                    assert!(!body.contains("correct_index"));
                    assert!(!body.contains("Futures are inert"));
                }),
        )
        // the player checkpoints where the student stopped
        .step(
            Action::new("save_position", "POST", "dynamic")
                .with_dyn_path(|ctx| format!("/api/v1/lessons/{}/position", ctx.get_id("lesson")))
                .with_body(json!({ "position": 95 }))
                .assert_body(|body| {
                    assert!(body.contains("\"last_position\":95"));
                }),
        )
        // wrong answer: counted, explained, not completed
        .step(
            Action::new("check_wrong", "POST", "dynamic")
                .with_dyn_path(|ctx| format!("/api/v1/steps/{}/check", ctx.get_id("quiz_step")))
                .with_body(json!({ "answer": { "selected_index": 0 } }))
                .assert_body(|body| {
                    assert!(body.contains("\"is_correct\":false"));
                    assert!(body.contains("Futures are inert"));
                    assert!(body.contains("\"attempts\":1"));
                }),
        )
        // right answer on the second try
        .step(
            Action::new("check_right", "POST", "dynamic")
                .with_dyn_path(|ctx| format!("/api/v1/steps/{}/check", ctx.get_id("quiz_step")))
                .with_body(json!({ "answer": { "selected_index": 1 } }))
                .assert_body(|body| {
                    assert!(body.contains("\"is_correct\":true"));
                    assert!(body.contains("\"attempts\":2"));
                }),
        )
        // quiz steps do not complete by hand
        .step(
            Action::new("complete_interactive", "POST", "dynamic")
                .with_dyn_path(|ctx| {
                    format!("/api/v1/steps/{}/complete", ctx.get_id("quiz_step"))
                })
                .with_expect(StatusCode::BAD_REQUEST),
        )
        .step(
            Action::new("complete_text", "POST", "dynamic")
                .with_dyn_path(|ctx| {
                    format!("/api/v1/steps/{}/complete", ctx.get_id("text_step"))
                })
                .assert_body(|body| {
                    assert!(body.contains("\"completed_steps\":2"));
                    assert!(body.contains("\"total_steps\":2"));
                }),
        )
        // the only lesson done => the course is done and a certificate exists
        .step(
            Action::new("lesson_complete", "POST", "dynamic")
                .with_dyn_path(|ctx| format!("/api/v1/lessons/{}/complete", ctx.get_id("lesson")))
                .assert_body(|body| {
                    assert!(body.contains("\"progress_percentage\":100"));
                    assert!(body.contains("\"course_completed\":true"));
                    assert!(body.contains("CM-"));
                })
                .with_save_as("completion"),
        )
        .step(
            Action::new("my_certificates", "GET", "/api/v1/certificates/my")
                .assert_body(|body| {
                    assert!(body.contains("CM-"));
                    assert!(body.contains("Async Rust"));
                }),
        )
        // anybody can verify the number, no cookie needed
        .step(
            Action::new("verify", "GET", "dynamic")
                .with_dyn_path(|ctx| {
                    let number = ctx
                        .get("completion")
                        .get("certificate_number")
                        .and_then(|n| n.as_str())
                        .expect("no certificate number")
                        .to_string();
                    format!("/api/v1/certificates/verify/{}", number)
                })
                .with_clear_cookies(true)
                .with_save_cookies(false)
                .assert_body(|body| {
                    assert!(body.contains("\"valid\":true"));
                    assert!(body.contains("Async Rust"));
                }),
        )
        // an invented number comes back invalid, still 200
        .step(
            Action::new("verify_bogus", "GET", "/api/v1/certificates/verify/CM-DEADBEEF")
                .with_save_cookies(false)
                .assert_body(|body| {
                    assert!(body.contains("\"valid\":false"));
                }),
        )
        .run(&mut server, pool)
        .await;
}

/// Lessons behind a paywall of enrollment: previews are open, the rest is not.
#[tokio::test]
async fn lesson_access_requires_enrollment() {
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
                .with_body(json!({ "title": "Locked course", "is_free": true }))
                .with_save_as("course"),
        )
        .step(
            Action::new("section_create", "POST", "/api/v1/sections/")
                .with_dyn_body(|ctx| {
                    json!({ "course_id": ctx.get_id("course"), "title": "One" })
                })
                .with_save_as("section"),
        )
        .step(
            Action::new("locked_lesson", "POST", "/api/v1/lessons/")
                .with_dyn_body(|ctx| {
                    json!({
                        "section_id": ctx.get_id("section"),
                        "title": "Members only",
                    })
                })
                .with_save_as("locked"),
        )
        .step(
            Action::new("preview_lesson", "POST", "/api/v1/lessons/")
                .with_dyn_body(|ctx| {
                    json!({
                        "section_id": ctx.get_id("section"),
                        "title": "Free taste",
                        "is_preview": true,
                    })
                })
                .with_save_as("preview"),
        )
        .step(signin_action("student", "student").with_clear_cookies(true))
        .step(
            Action::new("locked_denied", "GET", "dynamic")
                .with_dyn_path(|ctx| format!("/api/v1/lessons/{}", ctx.get_id("locked")))
                .with_expect(StatusCode::FORBIDDEN),
        )
        .step(
            Action::new("preview_open", "GET", "dynamic")
                .with_dyn_path(|ctx| format!("/api/v1/lessons/{}", ctx.get_id("preview")))
                .with_expect(StatusCode::OK)
                .assert_body(|body| {
                    assert!(body.contains("Free taste"));
                }),
        )
        .run(&mut server, pool)
        .await;
}
