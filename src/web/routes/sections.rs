use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{post, put},
};
use uuid::Uuid;

use crate::{
    model::{
        CrudRepository, ResourceTyped, check_access,
        entity::{Course, Section, SectionCreate},
    },
    web::{
        AppState, RequestContext, WebError, WebResult, error::ErrorResponse, middlewares,
    },
};

pub fn routes<S>(state: AppState) -> Router<S> {
    Router::new()
        .route("/", post(sections_create_handler))
        .route(
            "/{id}",
            put(sections_update_handler).delete(sections_delete_handler),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            middlewares::extract_context_fn,
        ))
        .with_state(state)
}

#[utoipa::path(
    post,
    path = "/api/v1/sections/",
    description = "Add a section to an owned course",
    request_body = SectionCreate,
    responses(
        (status = 200, description = "Section created", body = Section),
        (status = 403, description = "Not your course", body = ErrorResponse),
        (status = 404, description = "Course not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "sections",
    security(
        ("cookie" = [])
    )
)]
async fn sections_create_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Json(payload): Json<SectionCreate>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;

    let course = Course::find_by_id(state.pool(), user, payload.course_id)
        .await
        .map_err(|e| WebError::resource_fetch_error(Course::get_resource_type(), e))?
        .ok_or_else(|| WebError::resource_not_found(Course::get_resource_type()))?;

    check_access(state.pool(), user, &course, user.user_id())
        .await
        .map_err(|e| WebError::for_database_error(Course::get_resource_type(), e))?;

    let created = Section::create(state.pool(), user, payload)
        .await
        .map_err(|e| WebError::resource_fetch_error(Section::get_resource_type(), e))?;

    Ok((StatusCode::OK, Json(created)))
}

async fn owned_section(
    state: &AppState,
    user: &crate::web::AuthenticatedUser,
    id: Uuid,
) -> WebResult<Section> {
    let found = Section::find_by_id(state.pool(), user, id)
        .await
        .map_err(|e| WebError::resource_fetch_error(Section::get_resource_type(), e))?
        .ok_or_else(|| WebError::resource_not_found(Section::get_resource_type()))?;

    check_access(state.pool(), user, &found, user.user_id())
        .await
        .map_err(|e| WebError::for_database_error(Section::get_resource_type(), e))?;

    Ok(found)
}

#[utoipa::path(
    put,
    path = "/api/v1/sections/{id}",
    description = "Update a section of an owned course",
    request_body = SectionCreate,
    responses(
        (status = 200, description = "Section updated", body = Section),
        (status = 403, description = "Not your course", body = ErrorResponse),
        (status = 404, description = "Section not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "sections",
    security(
        ("cookie" = [])
    )
)]
async fn sections_update_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SectionCreate>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let found = owned_section(&state, user, id).await?;

    let updated = found
        .update(state.pool(), user, payload)
        .await
        .map_err(|e| WebError::resource_fetch_error(Section::get_resource_type(), e))?;

    Ok((StatusCode::OK, Json(updated)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/sections/{id}",
    description = "Delete a section of an owned course",
    responses(
        (status = 200, description = "Section deleted"),
        (status = 403, description = "Not your course", body = ErrorResponse),
        (status = 404, description = "Section not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "sections",
    security(
        ("cookie" = [])
    )
)]
async fn sections_delete_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let found = owned_section(&state, user, id).await?;

    found
        .delete(state.pool(), user)
        .await
        .map_err(|e| WebError::resource_fetch_error(Section::get_resource_type(), e))?;

    Ok(StatusCode::OK)
}
