use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, post},
};
use uuid::Uuid;

use crate::{
    model::{
        CrudRepository, Page, ResourceTyped, check_access,
        entity::{
            CatalogFilter, Course, CourseCreate, CourseWithSectionsRow, Enrollment,
            EnrollmentWithCourseRow, Purchase, Review,
        },
    },
    web::{
        AppState, AuthenticatedUser, RequestContext, WebError, WebResult,
        dto::courses::{CourseDetailResponse, EnrolledCourseResponse},
        error::ErrorResponse,
        middlewares,
        routes::PaginationQuery,
    },
};

pub fn routes<S>(state: AppState) -> Router<S> {
    Router::new()
        .route("/catalog", get(courses_catalog_handler))
        .route("/my", get(courses_my_handler))
        .route("/teaching", get(courses_teaching_handler))
        .route("/", post(courses_create_handler))
        // one wildcard name for the whole position: GET reads it as a slug,
        // the write handlers as a course id
        .route(
            "/{slug}",
            get(courses_detail_handler)
                .put(courses_update_handler)
                .delete(courses_delete_handler),
        )
        .route("/{slug}/publish", post(courses_publish_handler))
        .route("/{slug}/unpublish", post(courses_unpublish_handler))
        .route("/{slug}/enroll", post(courses_enroll_handler))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            middlewares::extract_context_fn,
        ))
        .with_state(state)
}

#[utoipa::path(
    get,
    path = "/api/v1/courses/catalog",
    description = "Published courses matching the filter. Public.",
    responses(
        (status = 200, description = "One catalog page", body = Page<Course>),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "courses"
)]
async fn courses_catalog_handler(
    ctx: RequestContext,
    Query(filter): Query<CatalogFilter>,
    Query(page): Query<PaginationQuery>,
    State(state): State<AppState>,
) -> WebResult<impl IntoResponse> {
    let actor = ctx
        .maybe_user()
        .cloned()
        .unwrap_or_else(AuthenticatedUser::admin);

    let items = Course::catalog_page(state.pool(), &actor, &filter, page.limit, page.offset)
        .await
        .map_err(|e| WebError::resource_fetch_error(Course::get_resource_type(), e))?;
    let total = Course::catalog_count(state.pool(), &actor, &filter)
        .await
        .map_err(|e| WebError::resource_fetch_error(Course::get_resource_type(), e))?;

    Ok((
        StatusCode::OK,
        Json(Page::new(items, total, page.limit, page.offset)),
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/courses/{slug}",
    description = "Course page by slug: course, section tree, recent approved reviews. Drafts are visible to their instructor only.",
    params(
        ("slug" = String, Path, description = "Course slug")
    ),
    responses(
        (status = 200, description = "Course found", body = CourseDetailResponse),
        (status = 404, description = "Course not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "courses"
)]
async fn courses_detail_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> WebResult<impl IntoResponse> {
    let actor = ctx
        .maybe_user()
        .cloned()
        .unwrap_or_else(AuthenticatedUser::admin);

    let course = Course::find_by_slug(state.pool(), &actor, &slug)
        .await
        .map_err(|e| WebError::resource_fetch_error(Course::get_resource_type(), e))?
        .ok_or_else(|| WebError::resource_not_found(Course::get_resource_type()))?;

    // unpublished courses exist only for their author (and admins)
    if !course.is_published() {
        let visible = ctx
            .maybe_user()
            .is_some_and(|u| u.is_admin() || u.user_id() == course.instructor_id());
        if !visible {
            return Err(WebError::resource_not_found(Course::get_resource_type()));
        }
    }

    let sections = CourseWithSectionsRow::fetch(state.pool(), &actor, course.id())
        .await
        .map_err(|e| WebError::resource_fetch_error(Course::get_resource_type(), e))?
        .sections;
    let reviews = Review::approved_by_course(state.pool(), &actor, course.id(), 10, 0)
        .await
        .map_err(|e| WebError::resource_fetch_error(Review::get_resource_type(), e))?;

    Ok((
        StatusCode::OK,
        Json(CourseDetailResponse::new(course, sections, reviews)),
    ))
}

#[utoipa::path(
    post,
    path = "/api/v1/courses/",
    description = "Create a draft course (instructor)",
    request_body = CourseCreate,
    responses(
        (status = 200, description = "Course created", body = Course),
        (status = 403, description = "Only instructors create courses", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "courses",
    security(
        ("cookie" = [])
    )
)]
async fn courses_create_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Json(payload): Json<CourseCreate>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    if !user.is_instructor() {
        return Err(WebError::resource_forbidden(Course::get_resource_type()));
    }

    let created = Course::create(state.pool(), user, payload)
        .await
        .map_err(|e| WebError::resource_fetch_error(Course::get_resource_type(), e))?;

    Ok((StatusCode::OK, Json(created)))
}

async fn owned_course(
    state: &AppState,
    user: &AuthenticatedUser,
    id: Uuid,
) -> WebResult<Course> {
    let found = Course::find_by_id(state.pool(), user, id)
        .await
        .map_err(|e| WebError::resource_fetch_error(Course::get_resource_type(), e))?
        .ok_or_else(|| WebError::resource_not_found(Course::get_resource_type()))?;

    check_access(state.pool(), user, &found, user.user_id())
        .await
        .map_err(|e| WebError::for_database_error(Course::get_resource_type(), e))?;

    Ok(found)
}

#[utoipa::path(
    put,
    path = "/api/v1/courses/{id}",
    description = "Update an owned course",
    request_body = CourseCreate,
    responses(
        (status = 200, description = "Course updated", body = Course),
        (status = 403, description = "Not your course", body = ErrorResponse),
        (status = 404, description = "Course not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "courses",
    security(
        ("cookie" = [])
    )
)]
async fn courses_update_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CourseCreate>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let found = owned_course(&state, user, id).await?;

    let updated = found
        .update(state.pool(), user, payload)
        .await
        .map_err(|e| WebError::resource_fetch_error(Course::get_resource_type(), e))?;

    Ok((StatusCode::OK, Json(updated)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/courses/{id}",
    description = "Delete an owned course",
    responses(
        (status = 200, description = "Course deleted"),
        (status = 403, description = "Not your course", body = ErrorResponse),
        (status = 404, description = "Course not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "courses",
    security(
        ("cookie" = [])
    )
)]
async fn courses_delete_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let found = owned_course(&state, user, id).await?;

    found
        .delete(state.pool(), user)
        .await
        .map_err(|e| WebError::resource_fetch_error(Course::get_resource_type(), e))?;

    Ok(StatusCode::OK)
}

#[utoipa::path(
    post,
    path = "/api/v1/courses/{id}/publish",
    description = "Publish an owned course. Needs at least one lesson.",
    responses(
        (status = 200, description = "Course published", body = Course),
        (status = 400, description = "Course has no content yet", body = ErrorResponse),
        (status = 403, description = "Not your course", body = ErrorResponse),
        (status = 404, description = "Course not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "courses",
    security(
        ("cookie" = [])
    )
)]
async fn courses_publish_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let found = owned_course(&state, user, id).await?;

    let has_content = found
        .has_content(state.pool())
        .await
        .map_err(|e| WebError::resource_fetch_error(Course::get_resource_type(), e))?;
    if !has_content {
        return Err(WebError::user_bad_request(
            "add at least one section with a lesson before publishing",
        ));
    }

    let published = found
        .set_status(state.pool(), "published")
        .await
        .map_err(|e| WebError::resource_fetch_error(Course::get_resource_type(), e))?;

    Ok((StatusCode::OK, Json(published)))
}

#[utoipa::path(
    post,
    path = "/api/v1/courses/{id}/unpublish",
    description = "Take an owned course back to draft",
    responses(
        (status = 200, description = "Course unpublished", body = Course),
        (status = 403, description = "Not your course", body = ErrorResponse),
        (status = 404, description = "Course not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "courses",
    security(
        ("cookie" = [])
    )
)]
async fn courses_unpublish_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let found = owned_course(&state, user, id).await?;

    let draft = found
        .set_status(state.pool(), "draft")
        .await
        .map_err(|e| WebError::resource_fetch_error(Course::get_resource_type(), e))?;

    Ok((StatusCode::OK, Json(draft)))
}

#[utoipa::path(
    post,
    path = "/api/v1/courses/{id}/enroll",
    description = "Enroll into a published course. Paid courses need a completed purchase first.",
    responses(
        (status = 200, description = "Enrolled", body = Enrollment),
        (status = 400, description = "Course must be bought first", body = ErrorResponse),
        (status = 404, description = "Course not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "courses",
    security(
        ("cookie" = [])
    )
)]
async fn courses_enroll_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;

    let course = Course::find_by_id(state.pool(), user, id)
        .await
        .map_err(|e| WebError::resource_fetch_error(Course::get_resource_type(), e))?
        .ok_or_else(|| WebError::resource_not_found(Course::get_resource_type()))?;

    if !course.is_published() {
        return Err(WebError::resource_not_found(Course::get_resource_type()));
    }

    if course.is_payable() {
        let purchase =
            Purchase::find_by_student_course(state.pool(), user, user.user_id(), course.id())
                .await
                .map_err(|e| WebError::resource_fetch_error(Purchase::get_resource_type(), e))?;

        let paid = purchase.is_some_and(|p| p.is_completed());
        if !paid {
            return Err(WebError::user_bad_request(
                "this course is paid, complete the purchase first",
            ));
        }
    }

    let (enrollment, created) = Enrollment::get_or_create(state.pool(), user, course.id())
        .await
        .map_err(|e| WebError::resource_fetch_error(Enrollment::get_resource_type(), e))?;

    if created {
        course
            .increment_students(state.pool())
            .await
            .map_err(|e| WebError::resource_fetch_error(Course::get_resource_type(), e))?;
    }

    Ok((StatusCode::OK, Json(enrollment)))
}

#[utoipa::path(
    get,
    path = "/api/v1/courses/my",
    description = "Courses the student is enrolled in, with progress",
    responses(
        (status = 200, description = "Enrollments with courses", body = Vec<EnrolledCourseResponse>),
        (status = 401, description = "You're not authorized", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "courses",
    security(
        ("cookie" = [])
    )
)]
async fn courses_my_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let rows = EnrollmentWithCourseRow::all_by_student(state.pool(), user)
        .await
        .map_err(|e| WebError::resource_fetch_error(Enrollment::get_resource_type(), e))?;

    let courses: Vec<EnrolledCourseResponse> =
        rows.into_iter().map(EnrolledCourseResponse::from).collect();
    Ok((StatusCode::OK, Json(courses)))
}

#[utoipa::path(
    get,
    path = "/api/v1/courses/teaching",
    description = "Courses the signed-in instructor owns, drafts included",
    responses(
        (status = 200, description = "Own courses", body = Vec<Course>),
        (status = 403, description = "Only instructors have a teaching list", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "courses",
    security(
        ("cookie" = [])
    )
)]
async fn courses_teaching_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    if !user.is_instructor() {
        return Err(WebError::resource_forbidden(Course::get_resource_type()));
    }

    let courses = Course::all_by_instructor(state.pool(), user, user.user_id())
        .await
        .map_err(|e| WebError::resource_fetch_error(Course::get_resource_type(), e))?;

    Ok((StatusCode::OK, Json(courses)))
}
