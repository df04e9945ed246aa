use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, post, put},
};
use rand::seq::SliceRandom;
use uuid::Uuid;

use crate::{
    model::{
        CrudRepository, ResourceTyped, check_access,
        entity::{
            Enrollment, Lesson, Question, QuestionChoice, QuestionChoiceCreate, QuestionCreate,
            Quiz, QuizAttempt, QuizAttemptCreate, QuizCreate, UserAnswer, UserAnswerCreate,
        },
    },
    web::{
        AppState, AuthenticatedUser, RequestContext, WebError, WebResult,
        dto::quizzes::{
            AttemptResultResponse, AttemptStartResponse, QuestionView, QuestionWithChoices,
            QuizDetailResponse, QuizSubmitRequest,
        },
        error::ErrorResponse,
        middlewares,
    },
};

pub fn routes<S>(state: AppState) -> Router<S> {
    Router::new()
        .route("/", post(quizzes_create_handler))
        .route("/questions", post(questions_create_handler))
        .route(
            "/questions/{id}",
            put(questions_update_handler).delete(questions_delete_handler),
        )
        .route("/choices", post(choices_create_handler))
        .route(
            "/choices/{id}",
            put(choices_update_handler).delete(choices_delete_handler),
        )
        .route("/attempts/{id}", get(attempts_get_handler))
        .route("/attempts/{id}/submit", post(attempts_submit_handler))
        .route("/{id}", get(quizzes_get_handler))
        .route("/{id}/start", post(attempts_start_handler))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            middlewares::extract_context_fn,
        ))
        .with_state(state)
}

async fn questions_with_choices(
    state: &AppState,
    user: &AuthenticatedUser,
    quiz_id: Uuid,
) -> WebResult<Vec<QuestionWithChoices>> {
    let questions = Question::all_by_quiz(state.pool(), user, quiz_id)
        .await
        .map_err(|e| WebError::resource_fetch_error(Question::get_resource_type(), e))?;

    let mut result = Vec::with_capacity(questions.len());
    for question in questions {
        let choices = QuestionChoice::all_by_question(state.pool(), user, question.id())
            .await
            .map_err(|e| {
                WebError::resource_fetch_error(QuestionChoice::get_resource_type(), e)
            })?;
        result.push(QuestionWithChoices { question, choices });
    }
    Ok(result)
}

#[utoipa::path(
    post,
    path = "/api/v1/quizzes/",
    description = "Create the quiz for a lesson of an owned course. One quiz per lesson.",
    request_body = QuizCreate,
    responses(
        (status = 200, description = "Quiz created", body = Quiz),
        (status = 403, description = "Not your course", body = ErrorResponse),
        (status = 404, description = "Lesson not found", body = ErrorResponse),
        (status = 409, description = "Lesson already has a quiz", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "quizzes",
    security(
        ("cookie" = [])
    )
)]
async fn quizzes_create_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Json(payload): Json<QuizCreate>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;

    let lesson = Lesson::find_by_id(state.pool(), user, payload.lesson_id)
        .await
        .map_err(|e| WebError::resource_fetch_error(Lesson::get_resource_type(), e))?
        .ok_or_else(|| WebError::resource_not_found(Lesson::get_resource_type()))?;

    check_access(state.pool(), user, &lesson, user.user_id())
        .await
        .map_err(|e| WebError::for_database_error(Lesson::get_resource_type(), e))?;

    let existing = Quiz::find_by_lesson(state.pool(), user, payload.lesson_id)
        .await
        .map_err(|e| WebError::resource_fetch_error(Quiz::get_resource_type(), e))?;
    if existing.is_some() {
        return Err(WebError::resource_conflict(Quiz::get_resource_type()));
    }

    let created = Quiz::create(state.pool(), user, payload)
        .await
        .map_err(|e| WebError::resource_fetch_error(Quiz::get_resource_type(), e))?;

    Ok((StatusCode::OK, Json(created)))
}

#[utoipa::path(
    get,
    path = "/api/v1/quizzes/{id}",
    description = "Quiz with questions and choices, correct flags included. Builder view, owner only.",
    responses(
        (status = 200, description = "Quiz found", body = QuizDetailResponse),
        (status = 403, description = "Not your course", body = ErrorResponse),
        (status = 404, description = "Quiz not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "quizzes",
    security(
        ("cookie" = [])
    )
)]
async fn quizzes_get_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let quiz = Quiz::find_by_id(state.pool(), user, id)
        .await
        .map_err(|e| WebError::resource_fetch_error(Quiz::get_resource_type(), e))?
        .ok_or_else(|| WebError::resource_not_found(Quiz::get_resource_type()))?;

    check_access(state.pool(), user, &quiz, user.user_id())
        .await
        .map_err(|e| WebError::for_database_error(Quiz::get_resource_type(), e))?;

    let questions = questions_with_choices(&state, user, quiz.id()).await?;

    Ok((StatusCode::OK, Json(QuizDetailResponse { quiz, questions })))
}

#[utoipa::path(
    post,
    path = "/api/v1/quizzes/questions",
    description = "Add a question to an owned quiz",
    request_body = QuestionCreate,
    responses(
        (status = 200, description = "Question created", body = Question),
        (status = 403, description = "Not your course", body = ErrorResponse),
        (status = 404, description = "Quiz not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "quizzes",
    security(
        ("cookie" = [])
    )
)]
async fn questions_create_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Json(payload): Json<QuestionCreate>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;

    let quiz = Quiz::find_by_id(state.pool(), user, payload.quiz_id)
        .await
        .map_err(|e| WebError::resource_fetch_error(Quiz::get_resource_type(), e))?
        .ok_or_else(|| WebError::resource_not_found(Quiz::get_resource_type()))?;

    check_access(state.pool(), user, &quiz, user.user_id())
        .await
        .map_err(|e| WebError::for_database_error(Quiz::get_resource_type(), e))?;

    let created = Question::create(state.pool(), user, payload)
        .await
        .map_err(|e| WebError::resource_fetch_error(Question::get_resource_type(), e))?;

    Ok((StatusCode::OK, Json(created)))
}

async fn owned_question(
    state: &AppState,
    user: &AuthenticatedUser,
    id: Uuid,
) -> WebResult<Question> {
    let found = Question::find_by_id(state.pool(), user, id)
        .await
        .map_err(|e| WebError::resource_fetch_error(Question::get_resource_type(), e))?
        .ok_or_else(|| WebError::resource_not_found(Question::get_resource_type()))?;

    check_access(state.pool(), user, &found, user.user_id())
        .await
        .map_err(|e| WebError::for_database_error(Question::get_resource_type(), e))?;

    Ok(found)
}

#[utoipa::path(
    put,
    path = "/api/v1/quizzes/questions/{id}",
    description = "Update a question of an owned quiz",
    request_body = QuestionCreate,
    responses(
        (status = 200, description = "Question updated", body = Question),
        (status = 403, description = "Not your course", body = ErrorResponse),
        (status = 404, description = "Question not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "quizzes",
    security(
        ("cookie" = [])
    )
)]
async fn questions_update_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<QuestionCreate>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let found = owned_question(&state, user, id).await?;

    let updated = found
        .update(state.pool(), user, payload)
        .await
        .map_err(|e| WebError::resource_fetch_error(Question::get_resource_type(), e))?;

    Ok((StatusCode::OK, Json(updated)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/quizzes/questions/{id}",
    description = "Delete a question of an owned quiz",
    responses(
        (status = 200, description = "Question deleted"),
        (status = 403, description = "Not your course", body = ErrorResponse),
        (status = 404, description = "Question not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "quizzes",
    security(
        ("cookie" = [])
    )
)]
async fn questions_delete_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let found = owned_question(&state, user, id).await?;

    found
        .delete(state.pool(), user)
        .await
        .map_err(|e| WebError::resource_fetch_error(Question::get_resource_type(), e))?;

    Ok(StatusCode::OK)
}

#[utoipa::path(
    post,
    path = "/api/v1/quizzes/choices",
    description = "Add a choice to a question. A correct choice under a single/true-false question clears its siblings.",
    request_body = QuestionChoiceCreate,
    responses(
        (status = 200, description = "Choice created", body = QuestionChoice),
        (status = 403, description = "Not your course", body = ErrorResponse),
        (status = 404, description = "Question not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "quizzes",
    security(
        ("cookie" = [])
    )
)]
async fn choices_create_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Json(payload): Json<QuestionChoiceCreate>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    owned_question(&state, user, payload.question_id).await?;

    let created = QuestionChoice::create(state.pool(), user, payload)
        .await
        .map_err(|e| WebError::resource_fetch_error(QuestionChoice::get_resource_type(), e))?;

    Ok((StatusCode::OK, Json(created)))
}

async fn owned_choice(
    state: &AppState,
    user: &AuthenticatedUser,
    id: Uuid,
) -> WebResult<QuestionChoice> {
    let found = QuestionChoice::find_by_id(state.pool(), user, id)
        .await
        .map_err(|e| WebError::resource_fetch_error(QuestionChoice::get_resource_type(), e))?
        .ok_or_else(|| WebError::resource_not_found(QuestionChoice::get_resource_type()))?;

    check_access(state.pool(), user, &found, user.user_id())
        .await
        .map_err(|e| WebError::for_database_error(QuestionChoice::get_resource_type(), e))?;

    Ok(found)
}

#[utoipa::path(
    put,
    path = "/api/v1/quizzes/choices/{id}",
    description = "Update a choice. The single-correct invariant is kept.",
    request_body = QuestionChoiceCreate,
    responses(
        (status = 200, description = "Choice updated", body = QuestionChoice),
        (status = 403, description = "Not your course", body = ErrorResponse),
        (status = 404, description = "Choice not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "quizzes",
    security(
        ("cookie" = [])
    )
)]
async fn choices_update_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<QuestionChoiceCreate>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let found = owned_choice(&state, user, id).await?;

    let updated = found
        .update(state.pool(), user, payload)
        .await
        .map_err(|e| WebError::resource_fetch_error(QuestionChoice::get_resource_type(), e))?;

    Ok((StatusCode::OK, Json(updated)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/quizzes/choices/{id}",
    description = "Delete a choice",
    responses(
        (status = 200, description = "Choice deleted"),
        (status = 403, description = "Not your course", body = ErrorResponse),
        (status = 404, description = "Choice not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "quizzes",
    security(
        ("cookie" = [])
    )
)]
async fn choices_delete_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let found = owned_choice(&state, user, id).await?;

    found
        .delete(state.pool(), user)
        .await
        .map_err(|e| WebError::resource_fetch_error(QuestionChoice::get_resource_type(), e))?;

    Ok(StatusCode::OK)
}

#[utoipa::path(
    post,
    path = "/api/v1/quizzes/{id}/start",
    description = "Start an attempt. Enrollment required, attempts limit enforced, question order shuffled when the quiz says so.",
    responses(
        (status = 200, description = "Attempt started", body = AttemptStartResponse),
        (status = 400, description = "Attempts limit reached or not enrolled", body = ErrorResponse),
        (status = 404, description = "Quiz not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "quizzes",
    security(
        ("cookie" = [])
    )
)]
async fn attempts_start_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let quiz = Quiz::find_by_id(state.pool(), user, id)
        .await
        .map_err(|e| WebError::resource_fetch_error(Quiz::get_resource_type(), e))?
        .ok_or_else(|| WebError::resource_not_found(Quiz::get_resource_type()))?;

    let lesson = Lesson::find_by_id(state.pool(), user, quiz.lesson_id())
        .await
        .map_err(|e| WebError::resource_fetch_error(Lesson::get_resource_type(), e))?
        .ok_or_else(|| WebError::resource_not_found(Lesson::get_resource_type()))?;
    let course_id = lesson
        .course_id(state.pool())
        .await
        .map_err(|e| WebError::resource_fetch_error(Lesson::get_resource_type(), e))?;

    Enrollment::find_by_student_course(state.pool(), user, user.user_id(), course_id)
        .await
        .map_err(|e| WebError::resource_fetch_error(Enrollment::get_resource_type(), e))?
        .ok_or_else(|| WebError::user_bad_request("you're not enrolled in this course"))?;

    let used = QuizAttempt::count_for_quiz(state.pool(), user, quiz.id())
        .await
        .map_err(|e| WebError::resource_fetch_error(QuizAttempt::get_resource_type(), e))?;
    if used >= quiz.attempts_limit() as i64 {
        return Err(WebError::user_bad_request(format!(
            "attempts limit reached ({})",
            quiz.attempts_limit()
        )));
    }

    let attempt = QuizAttempt::create(
        state.pool(),
        user,
        QuizAttemptCreate { quiz_id: quiz.id() },
    )
    .await
    .map_err(|e| WebError::resource_fetch_error(QuizAttempt::get_resource_type(), e))?;

    let full = questions_with_choices(&state, user, quiz.id()).await?;
    let mut questions: Vec<QuestionView> = full
        .iter()
        .map(|q| QuestionView::from_entity(&q.question, &q.choices))
        .collect();

    if quiz.shuffle_questions() {
        questions.shuffle(&mut rand::rng());
    }

    Ok((
        StatusCode::OK,
        Json(AttemptStartResponse { attempt, questions }),
    ))
}

#[utoipa::path(
    post,
    path = "/api/v1/quizzes/attempts/{id}/submit",
    description = "Submit answers for an open attempt. Choice questions auto-grade, text answers wait for review.",
    request_body = QuizSubmitRequest,
    responses(
        (status = 200, description = "Attempt graded", body = AttemptResultResponse),
        (status = 400, description = "Attempt is already finished", body = ErrorResponse),
        (status = 403, description = "Not your attempt", body = ErrorResponse),
        (status = 404, description = "Attempt not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "quizzes",
    security(
        ("cookie" = [])
    )
)]
async fn attempts_submit_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<QuizSubmitRequest>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let attempt = QuizAttempt::find_by_id(state.pool(), user, id)
        .await
        .map_err(|e| WebError::resource_fetch_error(QuizAttempt::get_resource_type(), e))?
        .ok_or_else(|| WebError::resource_not_found(QuizAttempt::get_resource_type()))?;

    check_access(state.pool(), user, &attempt, user.user_id())
        .await
        .map_err(|e| WebError::for_database_error(QuizAttempt::get_resource_type(), e))?;

    if attempt.completed_at().is_some() {
        return Err(WebError::user_bad_request("this attempt is already finished"));
    }

    let quiz = Quiz::find_by_id(state.pool(), user, attempt.quiz_id())
        .await
        .map_err(|e| WebError::resource_fetch_error(Quiz::get_resource_type(), e))?
        .ok_or_else(|| WebError::resource_not_found(Quiz::get_resource_type()))?;

    let full = questions_with_choices(&state, user, quiz.id()).await?;

    let mut score = 0i32;
    let mut total_points = 0i32;
    for entry in &full {
        total_points += entry.question.points();
    }

    for answer in &payload.answers {
        let Some(entry) = full.iter().find(|q| q.question.id() == answer.question_id) else {
            continue; // answers for foreign questions are dropped
        };

        let (is_correct, points_earned) = if entry.question.qtype() == "text" {
            (None, None) // graded by the instructor later
        } else {
            let correct = answer
                .choice_id
                .and_then(|choice_id| entry.choices.iter().find(|c| c.id() == choice_id))
                .is_some_and(|c| c.is_correct());
            let points = if correct { entry.question.points() } else { 0 };
            score += points;
            (Some(correct), Some(points))
        };

        UserAnswer::create(
            state.pool(),
            user,
            UserAnswerCreate {
                attempt_id: attempt.id(),
                question_id: answer.question_id,
                choice_id: answer.choice_id,
                text_answer: answer.text_answer.clone(),
                is_correct,
                points_earned,
            },
        )
        .await
        .map_err(|e| WebError::resource_fetch_error(UserAnswer::get_resource_type(), e))?;
    }

    let percentage = if total_points > 0 {
        (score as f64 / total_points as f64) * 100.0
    } else {
        0.0
    };
    let is_passed = percentage >= quiz.pass_percentage() as f64;

    let attempt = attempt
        .submit_result(state.pool(), score, total_points, percentage, is_passed)
        .await
        .map_err(|e| WebError::resource_fetch_error(QuizAttempt::get_resource_type(), e))?;

    let answers = UserAnswer::all_by_attempt(state.pool(), user, attempt.id())
        .await
        .map_err(|e| WebError::resource_fetch_error(UserAnswer::get_resource_type(), e))?;

    let questions = if quiz.show_answers() { Some(full) } else { None };

    Ok((
        StatusCode::OK,
        Json(AttemptResultResponse {
            attempt,
            answers,
            questions,
        }),
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/quizzes/attempts/{id}",
    description = "Attempt result. Correct choices are revealed only when the quiz shows answers.",
    responses(
        (status = 200, description = "Attempt found", body = AttemptResultResponse),
        (status = 403, description = "Not your attempt", body = ErrorResponse),
        (status = 404, description = "Attempt not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "quizzes",
    security(
        ("cookie" = [])
    )
)]
async fn attempts_get_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let attempt = QuizAttempt::find_by_id(state.pool(), user, id)
        .await
        .map_err(|e| WebError::resource_fetch_error(QuizAttempt::get_resource_type(), e))?
        .ok_or_else(|| WebError::resource_not_found(QuizAttempt::get_resource_type()))?;

    check_access(state.pool(), user, &attempt, user.user_id())
        .await
        .map_err(|e| WebError::for_database_error(QuizAttempt::get_resource_type(), e))?;

    let quiz = Quiz::find_by_id(state.pool(), user, attempt.quiz_id())
        .await
        .map_err(|e| WebError::resource_fetch_error(Quiz::get_resource_type(), e))?
        .ok_or_else(|| WebError::resource_not_found(Quiz::get_resource_type()))?;

    let answers = UserAnswer::all_by_attempt(state.pool(), user, attempt.id())
        .await
        .map_err(|e| WebError::resource_fetch_error(UserAnswer::get_resource_type(), e))?;

    let questions = if quiz.show_answers() {
        Some(questions_with_choices(&state, user, quiz.id()).await?)
    } else {
        None
    };

    Ok((
        StatusCode::OK,
        Json(AttemptResultResponse {
            attempt,
            answers,
            questions,
        }),
    ))
}
