use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, post},
};
use uuid::Uuid;

use crate::{
    grading::{self, StepContent, StepSubmission},
    model::{
        CrudRepository, ResourceTyped, check_access,
        entity::{Enrollment, Lesson, Step, StepCreate, StepProgress},
    },
    web::{
        AppState, AuthenticatedUser, RequestContext, WebError, WebResult,
        dto::steps::{
            StepCheckRequest, StepCheckResponse, StepCompleteResponse, StepReorderRequest,
        },
        error::ErrorResponse,
        middlewares,
    },
};

pub fn routes<S>(state: AppState) -> Router<S> {
    Router::new()
        .route("/", post(steps_create_handler))
        .route(
            "/lesson/{lesson_id}",
            get(steps_list_handler),
        )
        .route("/lesson/{lesson_id}/reorder", post(steps_reorder_handler))
        .route(
            "/{id}",
            get(steps_get_handler)
                .put(steps_update_handler)
                .delete(steps_delete_handler),
        )
        .route("/{id}/duplicate", post(steps_duplicate_handler))
        .route("/{id}/check", post(steps_check_handler))
        .route("/{id}/complete", post(steps_complete_handler))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            middlewares::extract_context_fn,
        ))
        .with_state(state)
}

async fn owned_lesson(
    state: &AppState,
    user: &AuthenticatedUser,
    lesson_id: Uuid,
) -> WebResult<Lesson> {
    let lesson = Lesson::find_by_id(state.pool(), user, lesson_id)
        .await
        .map_err(|e| WebError::resource_fetch_error(Lesson::get_resource_type(), e))?
        .ok_or_else(|| WebError::resource_not_found(Lesson::get_resource_type()))?;

    check_access(state.pool(), user, &lesson, user.user_id())
        .await
        .map_err(|e| WebError::for_database_error(Lesson::get_resource_type(), e))?;

    Ok(lesson)
}

async fn owned_step(state: &AppState, user: &AuthenticatedUser, id: Uuid) -> WebResult<Step> {
    let found = Step::find_by_id(state.pool(), user, id)
        .await
        .map_err(|e| WebError::resource_fetch_error(Step::get_resource_type(), e))?
        .ok_or_else(|| WebError::resource_not_found(Step::get_resource_type()))?;

    check_access(state.pool(), user, &found, user.user_id())
        .await
        .map_err(|e| WebError::for_database_error(Step::get_resource_type(), e))?;

    Ok(found)
}

/// Enrollment for the course the step's lesson belongs to.
async fn step_enrollment(
    state: &AppState,
    user: &AuthenticatedUser,
    step: &Step,
) -> WebResult<Enrollment> {
    let lesson = Lesson::find_by_id(state.pool(), user, step.lesson_id())
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
        .ok_or_else(|| WebError::user_bad_request("you're not enrolled in this course"))
}

#[utoipa::path(
    post,
    path = "/api/v1/steps/",
    description = "Add a step to a lesson of an owned course. Omitted content gets the kind's default payload.",
    request_body = StepCreate,
    responses(
        (status = 200, description = "Step created", body = Step),
        (status = 403, description = "Not your course", body = ErrorResponse),
        (status = 404, description = "Lesson not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "steps",
    security(
        ("cookie" = [])
    )
)]
async fn steps_create_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Json(payload): Json<StepCreate>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    owned_lesson(&state, user, payload.lesson_id).await?;

    // reject unknown kinds before they land in the database
    let kind = grading::StepKind::parse(&payload.step_type)?;
    if let Some(content) = &payload.content {
        StepContent::from_value(kind, content)?;
    }

    let created = Step::create(state.pool(), user, payload)
        .await
        .map_err(|e| WebError::resource_fetch_error(Step::get_resource_type(), e))?;

    Ok((StatusCode::OK, Json(created)))
}

#[utoipa::path(
    get,
    path = "/api/v1/steps/lesson/{lesson_id}",
    description = "Every step of a lesson with full content. Builder view, owner only.",
    params(
        ("lesson_id" = Uuid, Path, description = "Lesson to list")
    ),
    responses(
        (status = 200, description = "Steps in order", body = Vec<Step>),
        (status = 403, description = "Not your course", body = ErrorResponse),
        (status = 404, description = "Lesson not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "steps",
    security(
        ("cookie" = [])
    )
)]
async fn steps_list_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(lesson_id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    owned_lesson(&state, user, lesson_id).await?;

    let steps = Step::all_by_lesson(state.pool(), user, lesson_id)
        .await
        .map_err(|e| WebError::resource_fetch_error(Step::get_resource_type(), e))?;

    Ok((StatusCode::OK, Json(steps)))
}

#[utoipa::path(
    post,
    path = "/api/v1/steps/lesson/{lesson_id}/reorder",
    description = "Rewrite the lesson's step order to follow the given id list",
    params(
        ("lesson_id" = Uuid, Path, description = "Lesson to reorder")
    ),
    request_body = StepReorderRequest,
    responses(
        (status = 200, description = "Steps reordered"),
        (status = 403, description = "Not your course", body = ErrorResponse),
        (status = 404, description = "Lesson not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "steps",
    security(
        ("cookie" = [])
    )
)]
async fn steps_reorder_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(lesson_id): Path<Uuid>,
    Json(payload): Json<StepReorderRequest>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    owned_lesson(&state, user, lesson_id).await?;

    Step::reorder(state.pool(), user, lesson_id, &payload.step_ids)
        .await
        .map_err(|e| WebError::resource_fetch_error(Step::get_resource_type(), e))?;

    Ok(StatusCode::OK)
}

#[utoipa::path(
    get,
    path = "/api/v1/steps/{id}",
    description = "One step with full content. Owner only.",
    responses(
        (status = 200, description = "Step found", body = Step),
        (status = 403, description = "Not your course", body = ErrorResponse),
        (status = 404, description = "Step not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "steps",
    security(
        ("cookie" = [])
    )
)]
async fn steps_get_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let found = owned_step(&state, user, id).await?;

    Ok((StatusCode::OK, Json(found)))
}

#[utoipa::path(
    put,
    path = "/api/v1/steps/{id}",
    description = "Update a step of an owned course",
    request_body = StepCreate,
    responses(
        (status = 200, description = "Step updated", body = Step),
        (status = 400, description = "Content does not fit the step type", body = ErrorResponse),
        (status = 403, description = "Not your course", body = ErrorResponse),
        (status = 404, description = "Step not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "steps",
    security(
        ("cookie" = [])
    )
)]
async fn steps_update_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<StepCreate>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let found = owned_step(&state, user, id).await?;

    let kind = grading::StepKind::parse(&payload.step_type)?;
    if let Some(content) = &payload.content {
        StepContent::from_value(kind, content)?;
    }

    let updated = found
        .update(state.pool(), user, payload)
        .await
        .map_err(|e| WebError::resource_fetch_error(Step::get_resource_type(), e))?;

    Ok((StatusCode::OK, Json(updated)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/steps/{id}",
    description = "Delete a step of an owned course",
    responses(
        (status = 200, description = "Step deleted"),
        (status = 403, description = "Not your course", body = ErrorResponse),
        (status = 404, description = "Step not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "steps",
    security(
        ("cookie" = [])
    )
)]
async fn steps_delete_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let found = owned_step(&state, user, id).await?;

    found
        .delete(state.pool(), user)
        .await
        .map_err(|e| WebError::resource_fetch_error(Step::get_resource_type(), e))?;

    Ok(StatusCode::OK)
}

#[utoipa::path(
    post,
    path = "/api/v1/steps/{id}/duplicate",
    description = "Copy the step to the end of its lesson with a ' (copy)' title",
    responses(
        (status = 200, description = "Step duplicated", body = Step),
        (status = 403, description = "Not your course", body = ErrorResponse),
        (status = 404, description = "Step not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "steps",
    security(
        ("cookie" = [])
    )
)]
async fn steps_duplicate_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let found = owned_step(&state, user, id).await?;

    let copy = found
        .duplicate(state.pool(), user)
        .await
        .map_err(|e| WebError::resource_fetch_error(Step::get_resource_type(), e))?;

    Ok((StatusCode::OK, Json(copy)))
}

#[utoipa::path(
    post,
    path = "/api/v1/steps/{id}/check",
    description = "Grade a submitted answer, record the attempt, stamp completion when correct",
    request_body = StepCheckRequest,
    responses(
        (status = 200, description = "Answer graded", body = StepCheckResponse),
        (status = 400, description = "Submission does not fit the step", body = ErrorResponse),
        (status = 401, description = "You're not authorized to do this", body = ErrorResponse),
        (status = 404, description = "Step not found", body = ErrorResponse),
        (status = 500, description = "Internal Server Error", body = ErrorResponse),
    ),
    security(
        ("cookie" = [])
    ),
    tag = "steps"
)]
async fn steps_check_handler(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
    Json(req): Json<StepCheckRequest>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let step = Step::find_by_id(state.pool(), user, id)
        .await
        .map_err(|e| WebError::resource_fetch_error(Step::get_resource_type(), e))?
        .ok_or_else(|| WebError::resource_not_found(Step::get_resource_type()))?;

    let kind = step.kind()?;
    let content = StepContent::from_value(kind, step.content())?;
    let submission = StepSubmission::from_value(kind, &req.answer)?;

    let verdict = grading::grade(&content, &submission)?;

    let enrollment = step_enrollment(&state, user, &step).await?;
    let progress = StepProgress::get_or_create(
        state.pool(),
        user,
        enrollment.id(),
        step.id(),
        "in_progress",
    )
    .await
    .map_err(|e| WebError::resource_fetch_error(StepProgress::get_resource_type(), e))?;

    let progress = progress
        .record_attempt(state.pool(), &req.answer, verdict.is_correct, step.points())
        .await
        .map_err(|e| WebError::resource_fetch_error(StepProgress::get_resource_type(), e))?;

    Ok((
        StatusCode::OK,
        Json(StepCheckResponse {
            is_correct: verdict.is_correct,
            message: verdict.message,
            explanation: if verdict.is_correct {
                String::new()
            } else {
                verdict.explanation
            },
            attempts: progress.attempts(),
        }),
    ))
}

#[utoipa::path(
    post,
    path = "/api/v1/steps/{id}/complete",
    description = "Mark a text/video step as done. Interactive steps complete through /check.",
    responses(
        (status = 200, description = "Step completed", body = StepCompleteResponse),
        (status = 400, description = "Step is interactive", body = ErrorResponse),
        (status = 401, description = "You're not authorized to do this", body = ErrorResponse),
        (status = 404, description = "Step not found", body = ErrorResponse),
        (status = 500, description = "Internal Server Error", body = ErrorResponse),
    ),
    security(
        ("cookie" = [])
    ),
    tag = "steps"
)]
async fn steps_complete_handler(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let step = Step::find_by_id(state.pool(), user, id)
        .await
        .map_err(|e| WebError::resource_fetch_error(Step::get_resource_type(), e))?
        .ok_or_else(|| WebError::resource_not_found(Step::get_resource_type()))?;

    let kind = step.kind()?;
    if kind.is_interactive() {
        return Err(WebError::user_bad_request(
            "interactive steps complete by answering, use /check",
        ));
    }

    let enrollment = step_enrollment(&state, user, &step).await?;
    let progress = StepProgress::get_or_create(
        state.pool(),
        user,
        enrollment.id(),
        step.id(),
        "in_progress",
    )
    .await
    .map_err(|e| WebError::resource_fetch_error(StepProgress::get_resource_type(), e))?;

    progress
        .mark_completed(state.pool(), step.points())
        .await
        .map_err(|e| WebError::resource_fetch_error(StepProgress::get_resource_type(), e))?;

    let completed_steps =
        StepProgress::count_completed_for_lesson(state.pool(), enrollment.id(), step.lesson_id())
            .await
            .map_err(|e| WebError::resource_fetch_error(StepProgress::get_resource_type(), e))?;
    let total_steps = Step::count_by_lesson(state.pool(), step.lesson_id())
        .await
        .map_err(|e| WebError::resource_fetch_error(Step::get_resource_type(), e))?;

    Ok((
        StatusCode::OK,
        Json(StepCompleteResponse {
            completed_steps,
            total_steps,
        }),
    ))
}
