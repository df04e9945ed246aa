use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, post, put},
};
use uuid::Uuid;

use crate::{
    model::{
        CrudRepository, ResourceTyped, check_access,
        entity::{Enrollment, Review, ReviewCreate},
    },
    web::{
        AppState, AuthenticatedUser, RequestContext, WebError, WebResult, error::ErrorResponse,
        middlewares, routes::PaginationQuery,
    },
};

pub fn routes<S>(state: AppState) -> Router<S> {
    Router::new()
        .route("/", post(reviews_create_handler))
        .route("/course/{course_id}", get(reviews_list_handler))
        .route(
            "/{id}",
            put(reviews_update_handler).delete(reviews_delete_handler),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            middlewares::extract_context_fn,
        ))
        .with_state(state)
}

fn validate_rating(rating: i32) -> WebResult<()> {
    if !(1..=5).contains(&rating) {
        return Err(WebError::user_bad_request("rating must be between 1 and 5"));
    }
    Ok(())
}

#[utoipa::path(
    get,
    path = "/api/v1/reviews/course/{course_id}",
    description = "Approved reviews of a course, newest first. Public.",
    params(
        ("course_id" = Uuid, Path, description = "Course to list reviews for")
    ),
    responses(
        (status = 200, description = "Approved reviews", body = Vec<Review>),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "reviews"
)]
async fn reviews_list_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(course_id): Path<Uuid>,
    Query(page): Query<PaginationQuery>,
) -> WebResult<impl IntoResponse> {
    let actor = ctx
        .maybe_user()
        .cloned()
        .unwrap_or_else(AuthenticatedUser::admin);

    let reviews =
        Review::approved_by_course(state.pool(), &actor, course_id, page.limit, page.offset)
            .await
            .map_err(|e| WebError::resource_fetch_error(Review::get_resource_type(), e))?;

    Ok((StatusCode::OK, Json(reviews)))
}

#[utoipa::path(
    post,
    path = "/api/v1/reviews/",
    description = "Review a course you're enrolled in. One review per student per course.",
    request_body = ReviewCreate,
    responses(
        (status = 200, description = "Review created", body = Review),
        (status = 400, description = "Not enrolled or rating out of range", body = ErrorResponse),
        (status = 409, description = "You already reviewed this course", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "reviews",
    security(
        ("cookie" = [])
    )
)]
async fn reviews_create_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Json(payload): Json<ReviewCreate>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    validate_rating(payload.rating)?;

    Enrollment::find_by_student_course(state.pool(), user, user.user_id(), payload.course_id)
        .await
        .map_err(|e| WebError::resource_fetch_error(Enrollment::get_resource_type(), e))?
        .ok_or_else(|| WebError::user_bad_request("enroll into the course before reviewing it"))?;

    let existing =
        Review::find_by_course_student(state.pool(), user, payload.course_id, user.user_id())
            .await
            .map_err(|e| WebError::resource_fetch_error(Review::get_resource_type(), e))?;
    if existing.is_some() {
        return Err(WebError::resource_conflict(Review::get_resource_type()));
    }

    let created = Review::create(state.pool(), user, payload)
        .await
        .map_err(|e| WebError::resource_fetch_error(Review::get_resource_type(), e))?;

    Ok((StatusCode::OK, Json(created)))
}

async fn own_review(
    state: &AppState,
    user: &AuthenticatedUser,
    id: Uuid,
) -> WebResult<Review> {
    let found = Review::find_by_id(state.pool(), user, id)
        .await
        .map_err(|e| WebError::resource_fetch_error(Review::get_resource_type(), e))?
        .ok_or_else(|| WebError::resource_not_found(Review::get_resource_type()))?;

    check_access(state.pool(), user, &found, user.user_id())
        .await
        .map_err(|e| WebError::for_database_error(Review::get_resource_type(), e))?;

    Ok(found)
}

#[utoipa::path(
    put,
    path = "/api/v1/reviews/{id}",
    description = "Update your own review",
    request_body = ReviewCreate,
    responses(
        (status = 200, description = "Review updated", body = Review),
        (status = 403, description = "Not your review", body = ErrorResponse),
        (status = 404, description = "Review not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "reviews",
    security(
        ("cookie" = [])
    )
)]
async fn reviews_update_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ReviewCreate>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    validate_rating(payload.rating)?;
    let found = own_review(&state, user, id).await?;

    let updated = found
        .update(state.pool(), user, payload)
        .await
        .map_err(|e| WebError::resource_fetch_error(Review::get_resource_type(), e))?;

    Ok((StatusCode::OK, Json(updated)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/reviews/{id}",
    description = "Delete your own review",
    responses(
        (status = 200, description = "Review deleted"),
        (status = 403, description = "Not your review", body = ErrorResponse),
        (status = 404, description = "Review not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "reviews",
    security(
        ("cookie" = [])
    )
)]
async fn reviews_delete_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let found = own_review(&state, user, id).await?;

    found
        .delete(state.pool(), user)
        .await
        .map_err(|e| WebError::resource_fetch_error(Review::get_resource_type(), e))?;

    Ok(StatusCode::OK)
}
