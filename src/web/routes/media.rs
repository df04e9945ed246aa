use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, post, put},
};
use uuid::Uuid;

use crate::{
    model::{
        CrudRepository, ResourceTyped, check_access,
        entity::{Course, CourseMedia, CourseMediaCreate},
    },
    web::{
        AppState, AuthenticatedUser, RequestContext, WebError, WebResult,
        dto::media::MediaResponse, error::ErrorResponse, middlewares,
    },
};

pub fn routes<S>(state: AppState) -> Router<S> {
    Router::new()
        .route("/", post(media_create_handler))
        .route("/course/{course_id}", get(media_list_handler))
        .route(
            "/{id}",
            put(media_update_handler).delete(media_delete_handler),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            middlewares::extract_context_fn,
        ))
        .with_state(state)
}

#[utoipa::path(
    post,
    path = "/api/v1/media/",
    description = "Register an uploaded file for an owned course. The file itself lands in uploads/ out of band; the type is inferred from the extension when not given.",
    request_body = CourseMediaCreate,
    responses(
        (status = 200, description = "Media registered", body = MediaResponse),
        (status = 403, description = "Not your course", body = ErrorResponse),
        (status = 404, description = "Course not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "media",
    security(
        ("cookie" = [])
    )
)]
async fn media_create_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Json(payload): Json<CourseMediaCreate>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;

    let course = Course::find_by_id(state.pool(), user, payload.course_id)
        .await
        .map_err(|e| WebError::resource_fetch_error(Course::get_resource_type(), e))?
        .ok_or_else(|| WebError::resource_not_found(Course::get_resource_type()))?;

    check_access(state.pool(), user, &course, user.user_id())
        .await
        .map_err(|e| WebError::for_database_error(Course::get_resource_type(), e))?;

    let created = CourseMedia::create(state.pool(), user, payload)
        .await
        .map_err(|e| WebError::resource_fetch_error(CourseMedia::get_resource_type(), e))?;

    Ok((StatusCode::OK, Json(MediaResponse::from(created))))
}

#[utoipa::path(
    get,
    path = "/api/v1/media/course/{course_id}",
    description = "Media library of an owned course, newest first",
    params(
        ("course_id" = Uuid, Path, description = "Course to list media for")
    ),
    responses(
        (status = 200, description = "Media records", body = Vec<MediaResponse>),
        (status = 403, description = "Not your course", body = ErrorResponse),
        (status = 404, description = "Course not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "media",
    security(
        ("cookie" = [])
    )
)]
async fn media_list_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(course_id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;

    let course = Course::find_by_id(state.pool(), user, course_id)
        .await
        .map_err(|e| WebError::resource_fetch_error(Course::get_resource_type(), e))?
        .ok_or_else(|| WebError::resource_not_found(Course::get_resource_type()))?;

    check_access(state.pool(), user, &course, user.user_id())
        .await
        .map_err(|e| WebError::for_database_error(Course::get_resource_type(), e))?;

    let media = CourseMedia::all_by_course(state.pool(), user, course_id)
        .await
        .map_err(|e| WebError::resource_fetch_error(CourseMedia::get_resource_type(), e))?;
    let media: Vec<MediaResponse> = media.into_iter().map(MediaResponse::from).collect();

    Ok((StatusCode::OK, Json(media)))
}

async fn owned_media(
    state: &AppState,
    user: &AuthenticatedUser,
    id: Uuid,
) -> WebResult<CourseMedia> {
    let found = CourseMedia::find_by_id(state.pool(), user, id)
        .await
        .map_err(|e| WebError::resource_fetch_error(CourseMedia::get_resource_type(), e))?
        .ok_or_else(|| WebError::resource_not_found(CourseMedia::get_resource_type()))?;

    check_access(state.pool(), user, &found, user.user_id())
        .await
        .map_err(|e| WebError::for_database_error(CourseMedia::get_resource_type(), e))?;

    Ok(found)
}

#[utoipa::path(
    put,
    path = "/api/v1/media/{id}",
    description = "Update a media record's title and description",
    request_body = CourseMediaCreate,
    responses(
        (status = 200, description = "Media updated", body = MediaResponse),
        (status = 403, description = "Not your course", body = ErrorResponse),
        (status = 404, description = "Media not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "media",
    security(
        ("cookie" = [])
    )
)]
async fn media_update_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CourseMediaCreate>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let found = owned_media(&state, user, id).await?;

    let updated = found
        .update(state.pool(), user, payload)
        .await
        .map_err(|e| WebError::resource_fetch_error(CourseMedia::get_resource_type(), e))?;

    Ok((StatusCode::OK, Json(MediaResponse::from(updated))))
}

#[utoipa::path(
    delete,
    path = "/api/v1/media/{id}",
    description = "Delete a media record",
    responses(
        (status = 200, description = "Media deleted"),
        (status = 403, description = "Not your course", body = ErrorResponse),
        (status = 404, description = "Media not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "media",
    security(
        ("cookie" = [])
    )
)]
async fn media_delete_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let found = owned_media(&state, user, id).await?;

    found
        .delete(state.pool(), user)
        .await
        .map_err(|e| WebError::resource_fetch_error(CourseMedia::get_resource_type(), e))?;

    Ok(StatusCode::OK)
}
