use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::get,
};

use crate::{
    model::{
        CrudRepository, ResourceTyped, check_access,
        entity::{Certificate, Course, Enrollment},
    },
    web::{
        AppState, AuthenticatedUser, RequestContext, WebError, WebResult,
        dto::certificates::CertificateVerifyResponse, error::ErrorResponse, middlewares,
    },
};

pub fn routes<S>(state: AppState) -> Router<S> {
    Router::new()
        .route("/my", get(certificates_my_handler))
        .route("/verify/{number}", get(certificates_verify_handler))
        .route("/{number}", get(certificates_get_handler))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            middlewares::extract_context_fn,
        ))
        .with_state(state)
}

#[utoipa::path(
    get,
    path = "/api/v1/certificates/my",
    description = "Certificates earned by the signed-in student",
    responses(
        (status = 200, description = "Own certificates", body = Vec<Certificate>),
        (status = 401, description = "You're not authorized", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "certificates",
    security(
        ("cookie" = [])
    )
)]
async fn certificates_my_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let certificates = Certificate::all_by_student(state.pool(), user)
        .await
        .map_err(|e| WebError::resource_fetch_error(Certificate::get_resource_type(), e))?;

    Ok((StatusCode::OK, Json(certificates)))
}

#[utoipa::path(
    get,
    path = "/api/v1/certificates/{number}",
    description = "Full certificate by number. Its holder and the course's instructor only.",
    params(
        ("number" = String, Path, description = "Certificate number, e.g. CM-1A2B3C4D")
    ),
    responses(
        (status = 200, description = "Certificate found", body = Certificate),
        (status = 403, description = "Not yours", body = ErrorResponse),
        (status = 404, description = "Certificate not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "certificates",
    security(
        ("cookie" = [])
    )
)]
async fn certificates_get_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(number): Path<String>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let certificate = Certificate::find_by_number(state.pool(), user, &number)
        .await
        .map_err(|e| WebError::resource_fetch_error(Certificate::get_resource_type(), e))?
        .ok_or_else(|| WebError::resource_not_found(Certificate::get_resource_type()))?;

    let holder = check_access(state.pool(), user, &certificate, user.user_id())
        .await
        .is_ok();

    if !holder {
        // the course's instructor may look certificates up too
        let enrollment = Enrollment::find_by_id(state.pool(), user, certificate.enrollment_id())
            .await
            .map_err(|e| WebError::resource_fetch_error(Enrollment::get_resource_type(), e))?
            .ok_or_else(|| WebError::resource_not_found(Certificate::get_resource_type()))?;
        let course = Course::find_by_id(state.pool(), user, enrollment.course_id())
            .await
            .map_err(|e| WebError::resource_fetch_error(Course::get_resource_type(), e))?
            .ok_or_else(|| WebError::resource_not_found(Certificate::get_resource_type()))?;

        if course.instructor_id() != user.user_id() {
            return Err(WebError::resource_forbidden(
                Certificate::get_resource_type(),
            ));
        }
    }

    Ok((StatusCode::OK, Json(certificate)))
}

#[utoipa::path(
    get,
    path = "/api/v1/certificates/verify/{number}",
    description = "Public verification: who holds the certificate and for which course. Unknown numbers come back with valid=false.",
    params(
        ("number" = String, Path, description = "Certificate number to verify")
    ),
    responses(
        (status = 200, description = "Verification result", body = CertificateVerifyResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "certificates"
)]
async fn certificates_verify_handler(
    State(state): State<AppState>,
    Path(number): Path<String>,
) -> WebResult<impl IntoResponse> {
    let admin = AuthenticatedUser::admin();
    let found = Certificate::find_by_number(state.pool(), &admin, &number)
        .await
        .map_err(|e| WebError::resource_fetch_error(Certificate::get_resource_type(), e))?;

    let response = match found {
        Some(certificate) => CertificateVerifyResponse::found(&certificate),
        None => CertificateVerifyResponse::not_found(&number),
    };

    Ok((StatusCode::OK, Json(response)))
}
