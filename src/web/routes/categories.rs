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
        CrudRepository, ResourceTyped,
        entity::{Category, CategoryCreate},
    },
    web::{
        AppState, RequestContext, UserRole, WebError, WebResult, error::ErrorResponse, middlewares,
    },
};

pub fn routes<S>(state: AppState) -> Router<S> {
    Router::new()
        .route("/", get(categories_list_handler).post(categories_create_handler))
        .route(
            "/{id}",
            put(categories_update_handler).delete(categories_delete_handler),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            middlewares::extract_context_fn,
        ))
        .with_state(state)
}

#[utoipa::path(
    get,
    path = "/api/v1/categories/",
    description = "List every category. Public.",
    responses(
        (status = 200, description = "All categories", body = Vec<Category>),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "categories"
)]
async fn categories_list_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
) -> WebResult<impl IntoResponse> {
    let actor = ctx
        .maybe_user()
        .cloned()
        .unwrap_or_else(crate::web::AuthenticatedUser::admin);
    let categories = Category::all(state.pool(), &actor)
        .await
        .map_err(|e| WebError::resource_fetch_error(Category::get_resource_type(), e))?;

    Ok((StatusCode::OK, Json(categories)))
}

#[utoipa::path(
    post,
    path = "/api/v1/categories/",
    description = "Create a category (admin only)",
    request_body = CategoryCreate,
    responses(
        (status = 200, description = "Category created", body = Category),
        (status = 403, description = "You're not an admin to do this", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "categories",
    security(
        ("cookie" = [])
    )
)]
async fn categories_create_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Json(payload): Json<CategoryCreate>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    if user.user_role() != UserRole::Admin {
        return Err(WebError::resource_forbidden(Category::get_resource_type()));
    }

    let created = Category::create(state.pool(), user, payload)
        .await
        .map_err(|e| WebError::resource_fetch_error(Category::get_resource_type(), e))?;

    Ok((StatusCode::OK, Json(created)))
}

#[utoipa::path(
    put,
    path = "/api/v1/categories/{id}",
    description = "Update a category (admin only)",
    request_body = CategoryCreate,
    responses(
        (status = 200, description = "Category updated", body = Category),
        (status = 403, description = "You're not an admin to do this", body = ErrorResponse),
        (status = 404, description = "Category not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "categories",
    security(
        ("cookie" = [])
    )
)]
async fn categories_update_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CategoryCreate>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    if user.user_role() != UserRole::Admin {
        return Err(WebError::resource_forbidden(Category::get_resource_type()));
    }

    let found = Category::find_by_id(state.pool(), user, id)
        .await
        .map_err(|e| WebError::resource_fetch_error(Category::get_resource_type(), e))?
        .ok_or_else(|| WebError::resource_not_found(Category::get_resource_type()))?;

    let updated = found
        .update(state.pool(), user, payload)
        .await
        .map_err(|e| WebError::resource_fetch_error(Category::get_resource_type(), e))?;

    Ok((StatusCode::OK, Json(updated)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/categories/{id}",
    description = "Delete a category (admin only)",
    responses(
        (status = 200, description = "Category deleted"),
        (status = 403, description = "You're not an admin to do this", body = ErrorResponse),
        (status = 404, description = "Category not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "categories",
    security(
        ("cookie" = [])
    )
)]
async fn categories_delete_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    if user.user_role() != UserRole::Admin {
        return Err(WebError::resource_forbidden(Category::get_resource_type()));
    }

    let found = Category::find_by_id(state.pool(), user, id)
        .await
        .map_err(|e| WebError::resource_fetch_error(Category::get_resource_type(), e))?
        .ok_or_else(|| WebError::resource_not_found(Category::get_resource_type()))?;

    found
        .delete(state.pool(), user)
        .await
        .map_err(|e| WebError::resource_fetch_error(Category::get_resource_type(), e))?;

    Ok(StatusCode::OK)
}
