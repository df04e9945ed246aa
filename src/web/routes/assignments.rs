use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    model::{
        CrudRepository, ResourceTyped, check_access,
        entity::{
            Assignment, AssignmentCreate, AssignmentSubmission, AssignmentSubmissionCreate,
            Enrollment, Lesson,
        },
    },
    web::{
        AppState, RequestContext, WebError, WebResult, error::ErrorResponse, middlewares,
    },
};

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct AssignmentSubmitBody {
    pub submitted_text: String,
}

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct AssignmentGradeBody {
    pub points: i32,
    #[serde(default)]
    pub comment: String,
    /// `true` sends the work back for another try instead of accepting it.
    #[serde(default)]
    pub returned: bool,
}

/// Instructor view of one assignment with everything students sent in.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct AssignmentDetailResponse {
    pub assignment: Assignment,
    pub submissions: Vec<SubmissionRow>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct SubmissionRow {
    pub is_late: bool,
    pub submission: AssignmentSubmission,
}

pub fn routes<S>(state: AppState) -> Router<S> {
    Router::new()
        .route("/", post(assignments_create_handler))
        .route("/{id}", get(assignments_get_handler))
        .route("/{id}/submit", post(assignments_submit_handler))
        .route("/submissions/{id}/grade", post(submissions_grade_handler))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            middlewares::extract_context_fn,
        ))
        .with_state(state)
}

#[utoipa::path(
    post,
    path = "/api/v1/assignments/",
    description = "Create the assignment for a lesson of an owned course. One per lesson.",
    request_body = AssignmentCreate,
    responses(
        (status = 200, description = "Assignment created", body = Assignment),
        (status = 403, description = "Not your course", body = ErrorResponse),
        (status = 404, description = "Lesson not found", body = ErrorResponse),
        (status = 409, description = "Lesson already has an assignment", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "assignments",
    security(
        ("cookie" = [])
    )
)]
async fn assignments_create_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Json(payload): Json<AssignmentCreate>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;

    let lesson = Lesson::find_by_id(state.pool(), user, payload.lesson_id)
        .await
        .map_err(|e| WebError::resource_fetch_error(Lesson::get_resource_type(), e))?
        .ok_or_else(|| WebError::resource_not_found(Lesson::get_resource_type()))?;

    check_access(state.pool(), user, &lesson, user.user_id())
        .await
        .map_err(|e| WebError::for_database_error(Lesson::get_resource_type(), e))?;

    let existing = Assignment::find_by_lesson(state.pool(), user, payload.lesson_id)
        .await
        .map_err(|e| WebError::resource_fetch_error(Assignment::get_resource_type(), e))?;
    if existing.is_some() {
        return Err(WebError::resource_conflict(Assignment::get_resource_type()));
    }

    let created = Assignment::create(state.pool(), user, payload)
        .await
        .map_err(|e| WebError::resource_fetch_error(Assignment::get_resource_type(), e))?;

    Ok((StatusCode::OK, Json(created)))
}

#[utoipa::path(
    get,
    path = "/api/v1/assignments/{id}",
    description = "Assignment with all submissions. Owner only.",
    responses(
        (status = 200, description = "Assignment found", body = AssignmentDetailResponse),
        (status = 403, description = "Not your course", body = ErrorResponse),
        (status = 404, description = "Assignment not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "assignments",
    security(
        ("cookie" = [])
    )
)]
async fn assignments_get_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let assignment = Assignment::find_by_id(state.pool(), user, id)
        .await
        .map_err(|e| WebError::resource_fetch_error(Assignment::get_resource_type(), e))?
        .ok_or_else(|| WebError::resource_not_found(Assignment::get_resource_type()))?;

    check_access(state.pool(), user, &assignment, user.user_id())
        .await
        .map_err(|e| WebError::for_database_error(Assignment::get_resource_type(), e))?;

    let submissions = AssignmentSubmission::all_by_assignment(state.pool(), user, assignment.id())
        .await
        .map_err(|e| {
            WebError::resource_fetch_error(AssignmentSubmission::get_resource_type(), e)
        })?;
    let submissions = submissions
        .into_iter()
        .map(|submission| SubmissionRow {
            is_late: submission.is_late(assignment.due_date()),
            submission,
        })
        .collect();

    Ok((
        StatusCode::OK,
        Json(AssignmentDetailResponse {
            assignment,
            submissions,
        }),
    ))
}

#[utoipa::path(
    post,
    path = "/api/v1/assignments/{id}/submit",
    description = "Submit (or replace) your text for an assignment. Re-submitting goes back to the `submitted` state.",
    request_body = AssignmentSubmitBody,
    responses(
        (status = 200, description = "Submission stored", body = AssignmentSubmission),
        (status = 400, description = "You're not enrolled in this course", body = ErrorResponse),
        (status = 404, description = "Assignment not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "assignments",
    security(
        ("cookie" = [])
    )
)]
async fn assignments_submit_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AssignmentSubmitBody>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let assignment = Assignment::find_by_id(state.pool(), user, id)
        .await
        .map_err(|e| WebError::resource_fetch_error(Assignment::get_resource_type(), e))?
        .ok_or_else(|| WebError::resource_not_found(Assignment::get_resource_type()))?;

    let lesson = Lesson::find_by_id(state.pool(), user, assignment.lesson_id())
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

    let submission = AssignmentSubmission::upsert(
        state.pool(),
        user,
        AssignmentSubmissionCreate {
            assignment_id: assignment.id(),
            submitted_text: payload.submitted_text,
        },
    )
    .await
    .map_err(|e| WebError::resource_fetch_error(AssignmentSubmission::get_resource_type(), e))?;

    Ok((StatusCode::OK, Json(submission)))
}

#[utoipa::path(
    post,
    path = "/api/v1/assignments/submissions/{id}/grade",
    description = "Grade a submission. Points are clamped to the assignment's maximum.",
    request_body = AssignmentGradeBody,
    responses(
        (status = 200, description = "Submission graded", body = AssignmentSubmission),
        (status = 403, description = "Not your course", body = ErrorResponse),
        (status = 404, description = "Submission not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "assignments",
    security(
        ("cookie" = [])
    )
)]
async fn submissions_grade_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AssignmentGradeBody>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let submission = AssignmentSubmission::find_by_id(state.pool(), user, id)
        .await
        .map_err(|e| {
            WebError::resource_fetch_error(AssignmentSubmission::get_resource_type(), e)
        })?
        .ok_or_else(|| {
            WebError::resource_not_found(AssignmentSubmission::get_resource_type())
        })?;

    let assignment = Assignment::find_by_id(state.pool(), user, submission.assignment_id())
        .await
        .map_err(|e| WebError::resource_fetch_error(Assignment::get_resource_type(), e))?
        .ok_or_else(|| WebError::resource_not_found(Assignment::get_resource_type()))?;

    // grading is for the course's instructor
    check_access(state.pool(), user, &assignment, user.user_id())
        .await
        .map_err(|e| WebError::for_database_error(Assignment::get_resource_type(), e))?;

    let points = payload.points.clamp(0, assignment.max_points());
    let graded = submission
        .grade(state.pool(), points, &payload.comment, payload.returned)
        .await
        .map_err(|e| {
            WebError::resource_fetch_error(AssignmentSubmission::get_resource_type(), e)
        })?;

    Ok((StatusCode::OK, Json(graded)))
}

