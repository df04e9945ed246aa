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
    model::{
        CrudRepository, ResourceTyped, check_access,
        entity::{
            Certificate, Course, Enrollment, Lesson, LessonCreate, LessonProgress, Section, Step,
            StepProgress,
        },
    },
    web::{
        AppState, AuthenticatedUser, RequestContext, WebError, WebResult,
        dto::{
            lessons::{LessonCompleteResponse, LessonPositionRequest, LessonResponse},
            steps::StepStudentView,
        },
        error::ErrorResponse,
        middlewares,
    },
};

pub fn routes<S>(state: AppState) -> Router<S> {
    Router::new()
        .route("/", post(lessons_create_handler))
        .route(
            "/{id}",
            get(lessons_get_handler)
                .put(lessons_update_handler)
                .delete(lessons_delete_handler),
        )
        .route("/{id}/complete", post(lessons_complete_handler))
        .route("/{id}/position", post(lessons_position_handler))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            middlewares::extract_context_fn,
        ))
        .with_state(state)
}

#[utoipa::path(
    post,
    path = "/api/v1/lessons/",
    description = "Add a lesson to a section of an owned course",
    request_body = LessonCreate,
    responses(
        (status = 200, description = "Lesson created", body = Lesson),
        (status = 403, description = "Not your course", body = ErrorResponse),
        (status = 404, description = "Section not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "lessons",
    security(
        ("cookie" = [])
    )
)]
async fn lessons_create_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Json(payload): Json<LessonCreate>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;

    let section = Section::find_by_id(state.pool(), user, payload.section_id)
        .await
        .map_err(|e| WebError::resource_fetch_error(Section::get_resource_type(), e))?
        .ok_or_else(|| WebError::resource_not_found(Section::get_resource_type()))?;

    check_access(state.pool(), user, &section, user.user_id())
        .await
        .map_err(|e| WebError::for_database_error(Section::get_resource_type(), e))?;

    let created = Lesson::create(state.pool(), user, payload)
        .await
        .map_err(|e| WebError::resource_fetch_error(Lesson::get_resource_type(), e))?;

    Ok((StatusCode::OK, Json(created)))
}

async fn owned_lesson(
    state: &AppState,
    user: &AuthenticatedUser,
    id: Uuid,
) -> WebResult<Lesson> {
    let found = Lesson::find_by_id(state.pool(), user, id)
        .await
        .map_err(|e| WebError::resource_fetch_error(Lesson::get_resource_type(), e))?
        .ok_or_else(|| WebError::resource_not_found(Lesson::get_resource_type()))?;

    check_access(state.pool(), user, &found, user.user_id())
        .await
        .map_err(|e| WebError::for_database_error(Lesson::get_resource_type(), e))?;

    Ok(found)
}

#[utoipa::path(
    put,
    path = "/api/v1/lessons/{id}",
    description = "Update a lesson of an owned course",
    request_body = LessonCreate,
    responses(
        (status = 200, description = "Lesson updated", body = Lesson),
        (status = 403, description = "Not your course", body = ErrorResponse),
        (status = 404, description = "Lesson not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "lessons",
    security(
        ("cookie" = [])
    )
)]
async fn lessons_update_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<LessonCreate>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let found = owned_lesson(&state, user, id).await?;

    let updated = found
        .update(state.pool(), user, payload)
        .await
        .map_err(|e| WebError::resource_fetch_error(Lesson::get_resource_type(), e))?;

    Ok((StatusCode::OK, Json(updated)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/lessons/{id}",
    description = "Delete a lesson of an owned course",
    responses(
        (status = 200, description = "Lesson deleted"),
        (status = 403, description = "Not your course", body = ErrorResponse),
        (status = 404, description = "Lesson not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "lessons",
    security(
        ("cookie" = [])
    )
)]
async fn lessons_delete_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let found = owned_lesson(&state, user, id).await?;

    found
        .delete(state.pool(), user)
        .await
        .map_err(|e| WebError::resource_fetch_error(Lesson::get_resource_type(), e))?;

    Ok(StatusCode::OK)
}

#[utoipa::path(
    get,
    path = "/api/v1/lessons/{lesson_id}",
    description = "Lesson page for a student: content, steps without solutions, prev/next ids and own progress. Enrollment required unless the lesson is a preview.",
    params(
        ("lesson_id" = Uuid, Path, description = "ID of the lesson to get")
    ),
    responses(
        (status = 200, description = "Lesson found", body = LessonResponse),
        (status = 403, description = "Enroll first", body = ErrorResponse),
        (status = 404, description = "Lesson not found", body = ErrorResponse),
        (status = 401, description = "You're not authorized to do this", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    security(
        ("cookie" = [])
    ),
    tag = "lessons"
)]
async fn lessons_get_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ctx: RequestContext,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let lesson = Lesson::find_by_id(state.pool(), user, id)
        .await
        .map_err(|e| WebError::resource_fetch_error(Lesson::get_resource_type(), e))?
        .ok_or_else(|| WebError::resource_not_found(Lesson::get_resource_type()))?;

    let course_id = lesson
        .course_id(state.pool())
        .await
        .map_err(|e| WebError::resource_fetch_error(Lesson::get_resource_type(), e))?;

    let enrollment =
        Enrollment::find_by_student_course(state.pool(), user, user.user_id(), course_id)
            .await
            .map_err(|e| WebError::resource_fetch_error(Enrollment::get_resource_type(), e))?;

    if enrollment.is_none() && !lesson.is_preview() {
        let owner = check_access(state.pool(), user, &lesson, user.user_id())
            .await
            .is_ok();
        if !owner {
            return Err(WebError::resource_forbidden(Lesson::get_resource_type()));
        }
    }

    let steps = Step::all_by_lesson(state.pool(), user, lesson.id())
        .await
        .map_err(|e| WebError::resource_fetch_error(Step::get_resource_type(), e))?;
    let steps: Vec<StepStudentView> = steps.iter().map(StepStudentView::from_entity).collect();

    let sequence = Lesson::course_sequence(state.pool(), user, course_id)
        .await
        .map_err(|e| WebError::resource_fetch_error(Lesson::get_resource_type(), e))?;
    let position = sequence.iter().position(|row| row.id == lesson.id());
    let prev_lesson_id = position
        .and_then(|p| p.checked_sub(1))
        .and_then(|p| sequence.get(p))
        .map(|row| row.id);
    let next_lesson_id = position
        .and_then(|p| sequence.get(p + 1))
        .map(|row| row.id);

    // opening a lesson starts its progress record
    let (progress, step_progress) = match &enrollment {
        Some(enrollment) => {
            let progress =
                LessonProgress::get_or_create(state.pool(), user, enrollment.id(), lesson.id())
                    .await
                    .map_err(|e| {
                        WebError::resource_fetch_error(LessonProgress::get_resource_type(), e)
                    })?;
            let step_progress =
                StepProgress::all_for_lesson(state.pool(), user, enrollment.id(), lesson.id())
                    .await
                    .map_err(|e| {
                        WebError::resource_fetch_error(StepProgress::get_resource_type(), e)
                    })?;
            (Some(progress), step_progress)
        }
        None => (None, Vec::new()),
    };

    Ok((
        StatusCode::OK,
        Json(LessonResponse {
            lesson,
            steps,
            prev_lesson_id,
            next_lesson_id,
            progress,
            step_progress,
        }),
    ))
}

#[utoipa::path(
    post,
    path = "/api/v1/lessons/{lesson_id}/complete",
    description = "Mark the lesson done, refresh course progress and issue the certificate when the course hits 100%",
    params(
        ("lesson_id" = Uuid, Path, description = "ID of the lesson to mark")
    ),
    responses(
        (status = 200, description = "Lesson marked", body = LessonCompleteResponse),
        (status = 400, description = "You're not enrolled in this course", body = ErrorResponse),
        (status = 404, description = "Lesson not found", body = ErrorResponse),
        (status = 401, description = "You're not allowed to do this", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    security(
        ("cookie" = [])
    ),
    tag = "lessons"
)]
async fn lessons_complete_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ctx: RequestContext,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let lesson = Lesson::find_by_id(state.pool(), user, id)
        .await
        .map_err(|e| WebError::resource_fetch_error(Lesson::get_resource_type(), e))?
        .ok_or_else(|| WebError::resource_not_found(Lesson::get_resource_type()))?;

    let course_id = lesson
        .course_id(state.pool())
        .await
        .map_err(|e| WebError::resource_fetch_error(Course::get_resource_type(), e))?;

    let enrollment =
        Enrollment::find_by_student_course(state.pool(), user, user.user_id(), course_id)
            .await
            .map_err(|e| WebError::resource_fetch_error(Enrollment::get_resource_type(), e))?
            .ok_or_else(|| WebError::user_bad_request("you're not enrolled in this course"))?;

    let progress =
        LessonProgress::get_or_create(state.pool(), user, enrollment.id(), lesson.id())
            .await
            .map_err(|e| WebError::resource_fetch_error(LessonProgress::get_resource_type(), e))?;
    progress
        .mark_completed(state.pool())
        .await
        .map_err(|e| WebError::resource_fetch_error(LessonProgress::get_resource_type(), e))?;

    let enrollment = enrollment
        .recompute_progress(state.pool())
        .await
        .map_err(|e| WebError::resource_fetch_error(Enrollment::get_resource_type(), e))?;

    let certificate_number = if enrollment.completed() {
        let certificate = Certificate::issue(state.pool(), user, enrollment.id())
            .await
            .map_err(|e| WebError::resource_fetch_error(Certificate::get_resource_type(), e))?;
        Some(certificate.certificate_number().to_string())
    } else {
        None
    };

    Ok((
        StatusCode::OK,
        Json(LessonCompleteResponse {
            progress_percentage: enrollment.progress_percentage(),
            course_completed: enrollment.completed(),
            certificate_number,
        }),
    ))
}

#[utoipa::path(
    post,
    path = "/api/v1/lessons/{lesson_id}/position",
    description = "Remember where the student stopped watching, in seconds",
    params(
        ("lesson_id" = Uuid, Path, description = "ID of the lesson being watched")
    ),
    request_body = LessonPositionRequest,
    responses(
        (status = 200, description = "Position saved", body = LessonProgress),
        (status = 400, description = "You're not enrolled in this course", body = ErrorResponse),
        (status = 404, description = "Lesson not found", body = ErrorResponse),
        (status = 401, description = "You're not allowed to do this", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    security(
        ("cookie" = [])
    ),
    tag = "lessons"
)]
async fn lessons_position_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ctx: RequestContext,
    Json(payload): Json<LessonPositionRequest>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let lesson = Lesson::find_by_id(state.pool(), user, id)
        .await
        .map_err(|e| WebError::resource_fetch_error(Lesson::get_resource_type(), e))?
        .ok_or_else(|| WebError::resource_not_found(Lesson::get_resource_type()))?;

    let course_id = lesson
        .course_id(state.pool())
        .await
        .map_err(|e| WebError::resource_fetch_error(Lesson::get_resource_type(), e))?;

    let enrollment =
        Enrollment::find_by_student_course(state.pool(), user, user.user_id(), course_id)
            .await
            .map_err(|e| WebError::resource_fetch_error(Enrollment::get_resource_type(), e))?
            .ok_or_else(|| WebError::user_bad_request("you're not enrolled in this course"))?;

    let progress =
        LessonProgress::get_or_create(state.pool(), user, enrollment.id(), lesson.id())
            .await
            .map_err(|e| WebError::resource_fetch_error(LessonProgress::get_resource_type(), e))?;
    let progress = progress
        .save_position(state.pool(), payload.position.max(0))
        .await
        .map_err(|e| WebError::resource_fetch_error(LessonProgress::get_resource_type(), e))?;

    Ok((StatusCode::OK, Json(progress)))
}
