use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, post, put},
};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    model::{
        CrudRepository, ResourceTyped, check_access,
        entity::{Enrollment, Lesson, LessonComment, LessonCommentCreate},
    },
    web::{
        AppState, AuthenticatedUser, RequestContext, WebError, WebResult, error::ErrorResponse,
        middlewares,
    },
};

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct CommentRow {
    pub is_edited: bool,
    pub comment: LessonComment,
}

pub fn routes<S>(state: AppState) -> Router<S> {
    Router::new()
        .route("/", post(comments_create_handler))
        .route("/lesson/{lesson_id}", get(comments_list_handler))
        .route(
            "/{id}",
            put(comments_update_handler).delete(comments_delete_handler),
        )
        .route("/{id}/pin", post(comments_pin_handler))
        .route("/{id}/unpin", post(comments_unpin_handler))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            middlewares::extract_context_fn,
        ))
        .with_state(state)
}

/// Commenting needs a stake in the course: an enrollment or ownership.
async fn check_participant(
    state: &AppState,
    user: &AuthenticatedUser,
    lesson: &Lesson,
) -> WebResult<()> {
    let course_id = lesson
        .course_id(state.pool())
        .await
        .map_err(|e| WebError::resource_fetch_error(Lesson::get_resource_type(), e))?;

    let enrolled =
        Enrollment::find_by_student_course(state.pool(), user, user.user_id(), course_id)
            .await
            .map_err(|e| WebError::resource_fetch_error(Enrollment::get_resource_type(), e))?
            .is_some();

    if enrolled {
        return Ok(());
    }

    let owner = check_access(state.pool(), user, lesson, user.user_id())
        .await
        .is_ok();
    if owner {
        return Ok(());
    }

    Err(WebError::resource_forbidden(
        LessonComment::get_resource_type(),
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/comments/lesson/{lesson_id}",
    description = "Approved comments of a lesson, pinned first, then newest",
    params(
        ("lesson_id" = Uuid, Path, description = "Lesson to list comments for")
    ),
    responses(
        (status = 200, description = "Comments", body = Vec<CommentRow>),
        (status = 401, description = "You're not authorized", body = ErrorResponse),
        (status = 404, description = "Lesson not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "comments",
    security(
        ("cookie" = [])
    )
)]
async fn comments_list_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(lesson_id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;

    Lesson::find_by_id(state.pool(), user, lesson_id)
        .await
        .map_err(|e| WebError::resource_fetch_error(Lesson::get_resource_type(), e))?
        .ok_or_else(|| WebError::resource_not_found(Lesson::get_resource_type()))?;

    let comments = LessonComment::all_by_lesson(state.pool(), user, lesson_id)
        .await
        .map_err(|e| WebError::resource_fetch_error(LessonComment::get_resource_type(), e))?;
    let comments: Vec<CommentRow> = comments
        .into_iter()
        .map(|comment| CommentRow {
            is_edited: comment.is_edited(),
            comment,
        })
        .collect();

    Ok((StatusCode::OK, Json(comments)))
}

#[utoipa::path(
    post,
    path = "/api/v1/comments/",
    description = "Comment on a lesson. Enrolled students and the course's instructor only.",
    request_body = LessonCommentCreate,
    responses(
        (status = 200, description = "Comment created", body = LessonComment),
        (status = 403, description = "Enroll into the course first", body = ErrorResponse),
        (status = 404, description = "Lesson not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "comments",
    security(
        ("cookie" = [])
    )
)]
async fn comments_create_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Json(payload): Json<LessonCommentCreate>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;

    let lesson = Lesson::find_by_id(state.pool(), user, payload.lesson_id)
        .await
        .map_err(|e| WebError::resource_fetch_error(Lesson::get_resource_type(), e))?
        .ok_or_else(|| WebError::resource_not_found(Lesson::get_resource_type()))?;

    check_participant(&state, user, &lesson).await?;

    let created = LessonComment::create(state.pool(), user, payload)
        .await
        .map_err(|e| WebError::resource_fetch_error(LessonComment::get_resource_type(), e))?;

    Ok((StatusCode::OK, Json(created)))
}

async fn own_comment(
    state: &AppState,
    user: &AuthenticatedUser,
    id: Uuid,
) -> WebResult<LessonComment> {
    let found = LessonComment::find_by_id(state.pool(), user, id)
        .await
        .map_err(|e| WebError::resource_fetch_error(LessonComment::get_resource_type(), e))?
        .ok_or_else(|| WebError::resource_not_found(LessonComment::get_resource_type()))?;

    check_access(state.pool(), user, &found, user.user_id())
        .await
        .map_err(|e| WebError::for_database_error(LessonComment::get_resource_type(), e))?;

    Ok(found)
}

#[utoipa::path(
    put,
    path = "/api/v1/comments/{id}",
    description = "Edit your own comment",
    request_body = LessonCommentCreate,
    responses(
        (status = 200, description = "Comment updated", body = LessonComment),
        (status = 403, description = "Not your comment", body = ErrorResponse),
        (status = 404, description = "Comment not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "comments",
    security(
        ("cookie" = [])
    )
)]
async fn comments_update_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<LessonCommentCreate>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let found = own_comment(&state, user, id).await?;

    let updated = found
        .update(state.pool(), user, payload)
        .await
        .map_err(|e| WebError::resource_fetch_error(LessonComment::get_resource_type(), e))?;

    Ok((StatusCode::OK, Json(updated)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/comments/{id}",
    description = "Delete your own comment",
    responses(
        (status = 200, description = "Comment deleted"),
        (status = 403, description = "Not your comment", body = ErrorResponse),
        (status = 404, description = "Comment not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "comments",
    security(
        ("cookie" = [])
    )
)]
async fn comments_delete_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let found = own_comment(&state, user, id).await?;

    found
        .delete(state.pool(), user)
        .await
        .map_err(|e| WebError::resource_fetch_error(LessonComment::get_resource_type(), e))?;

    Ok(StatusCode::OK)
}

async fn set_pinned(
    state: &AppState,
    ctx: &RequestContext,
    id: Uuid,
    pinned: bool,
) -> WebResult<LessonComment> {
    let user = ctx.user()?;

    let found = LessonComment::find_by_id(state.pool(), user, id)
        .await
        .map_err(|e| WebError::resource_fetch_error(LessonComment::get_resource_type(), e))?
        .ok_or_else(|| WebError::resource_not_found(LessonComment::get_resource_type()))?;

    // pinning belongs to the course's instructor, not the comment's author
    let lesson = Lesson::find_by_id(state.pool(), user, found.lesson_id())
        .await
        .map_err(|e| WebError::resource_fetch_error(Lesson::get_resource_type(), e))?
        .ok_or_else(|| WebError::resource_not_found(Lesson::get_resource_type()))?;

    check_access(state.pool(), user, &lesson, user.user_id())
        .await
        .map_err(|e| WebError::for_database_error(LessonComment::get_resource_type(), e))?;

    let updated = found
        .set_pinned(state.pool(), pinned)
        .await
        .map_err(|e| WebError::resource_fetch_error(LessonComment::get_resource_type(), e))?;

    Ok(updated)
}

#[utoipa::path(
    post,
    path = "/api/v1/comments/{id}/pin",
    description = "Pin a comment to the top of the lesson (instructor)",
    responses(
        (status = 200, description = "Comment pinned", body = LessonComment),
        (status = 403, description = "Not your course", body = ErrorResponse),
        (status = 404, description = "Comment not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "comments",
    security(
        ("cookie" = [])
    )
)]
async fn comments_pin_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let updated = set_pinned(&state, &ctx, id, true).await?;
    Ok((StatusCode::OK, Json(updated)))
}

#[utoipa::path(
    post,
    path = "/api/v1/comments/{id}/unpin",
    description = "Unpin a comment (instructor)",
    responses(
        (status = 200, description = "Comment unpinned", body = LessonComment),
        (status = 403, description = "Not your course", body = ErrorResponse),
        (status = 404, description = "Comment not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "comments",
    security(
        ("cookie" = [])
    )
)]
async fn comments_unpin_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let updated = set_pinned(&state, &ctx, id, false).await?;
    Ok((StatusCode::OK, Json(updated)))
}
