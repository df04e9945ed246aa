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
    Config,
    model::{
        CrudRepository, PaginatableRepository, ResourceTyped, check_access,
        entity::{
            Course, Enrollment, Payment, PaymentCreate, PaymentMethod, PromoCode, Purchase,
            PurchaseCreate, Refund, RefundCreate,
        },
    },
    payments::{PaymentError, ProcessorKind},
    web::{
        AppState, AuthenticatedUser, RequestContext, UserRole, WebError, WebResult,
        dto::checkout::{CheckoutRequest, PayResponse, RefundRejectBody, RefundRequestBody},
        error::ErrorResponse,
        middlewares,
        routes::PaginationQuery,
    },
};

pub fn routes<S>(state: AppState) -> Router<S> {
    Router::new()
        .route("/", post(checkout_create_handler))
        .route("/methods", get(checkout_methods_handler))
        .route("/history", get(checkout_history_handler))
        .route("/refunds", get(refunds_pending_handler))
        .route("/refunds/{id}/approve", post(refunds_approve_handler))
        .route("/refunds/{id}/reject", post(refunds_reject_handler))
        .route("/{id}/pay", post(checkout_pay_handler))
        .route("/{id}/success", post(checkout_success_handler))
        .route("/{id}/failed", post(checkout_failed_handler))
        .route("/{id}/refund", post(refunds_request_handler))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            middlewares::extract_context_fn,
        ))
        .with_state(state)
}

#[utoipa::path(
    get,
    path = "/api/v1/checkout/methods",
    description = "Payment methods a purchase can go through",
    responses(
        (status = 200, description = "Active methods", body = Vec<PaymentMethod>),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "checkout"
)]
async fn checkout_methods_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
) -> WebResult<impl IntoResponse> {
    let actor = ctx
        .maybe_user()
        .cloned()
        .unwrap_or_else(AuthenticatedUser::admin);
    let methods = PaymentMethod::all_active(state.pool(), &actor)
        .await
        .map_err(|e| WebError::resource_fetch_error(PaymentMethod::get_resource_type(), e))?;

    Ok((StatusCode::OK, Json(methods)))
}

#[utoipa::path(
    post,
    path = "/api/v1/checkout/",
    description = "Create a pending purchase for a paid course, applying a promo code when given. Free courses enroll directly instead.",
    request_body = CheckoutRequest,
    responses(
        (status = 200, description = "Purchase created", body = Purchase),
        (status = 400, description = "Free course or bad promo code", body = ErrorResponse),
        (status = 404, description = "Course not found", body = ErrorResponse),
        (status = 409, description = "Course already purchased", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "checkout",
    security(
        ("cookie" = [])
    )
)]
async fn checkout_create_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Json(payload): Json<CheckoutRequest>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;

    let course = Course::find_by_id(state.pool(), user, payload.course_id)
        .await
        .map_err(|e| WebError::resource_fetch_error(Course::get_resource_type(), e))?
        .ok_or_else(|| WebError::resource_not_found(Course::get_resource_type()))?;

    if !course.is_published() {
        return Err(WebError::resource_not_found(Course::get_resource_type()));
    }
    if !course.is_payable() {
        return Err(PaymentError::NothingToPay.into());
    }

    let existing =
        Purchase::find_by_student_course(state.pool(), user, user.user_id(), course.id())
            .await
            .map_err(|e| WebError::resource_fetch_error(Purchase::get_resource_type(), e))?;
    if let Some(existing) = existing {
        if existing.is_completed() {
            return Err(PaymentError::AlreadyPurchased.into());
        }
        // an open purchase is the quote; hand it back instead of duplicating
        return Ok((StatusCode::OK, Json(existing)));
    }

    let price_cents = course.current_price();
    let mut total_cents = price_cents;
    let mut promo_code = String::new();

    if let Some(code) = payload
        .promo_code
        .as_deref()
        .filter(|code| !code.is_empty())
    {
        let promo = PromoCode::find_by_code(state.pool(), user, code)
            .await
            .map_err(|e| WebError::resource_fetch_error(PromoCode::get_resource_type(), e))?
            .ok_or_else(|| PaymentError::PromoCodeInvalid(String::from("unknown code")))?;

        if !promo.is_valid() {
            return Err(PaymentError::PromoCodeInvalid(String::from(
                "code is expired or exhausted",
            ))
            .into());
        }
        let applies = promo
            .applies_to_course(state.pool(), course.id())
            .await
            .map_err(|e| WebError::resource_fetch_error(PromoCode::get_resource_type(), e))?;
        if !applies {
            return Err(PaymentError::PromoCodeInvalid(String::from(
                "code does not cover this course",
            ))
            .into());
        }

        total_cents = promo.apply(price_cents);
        promo_code = code.to_string();
    }

    if let Some(method_id) = payload.payment_method_id {
        let method = PaymentMethod::find_by_id(state.pool(), user, method_id)
            .await
            .map_err(|e| WebError::resource_fetch_error(PaymentMethod::get_resource_type(), e))?
            .ok_or_else(|| WebError::resource_not_found(PaymentMethod::get_resource_type()))?;
        if !method.is_active() {
            return Err(PaymentError::MethodInactive.into());
        }
    }

    let purchase = Purchase::create(
        state.pool(),
        user,
        PurchaseCreate {
            course_id: course.id(),
            price_cents,
            discount_cents: price_cents - total_cents,
            total_cents,
            promo_code,
            payment_method_id: payload.payment_method_id,
        },
    )
    .await
    .map_err(|e| WebError::resource_fetch_error(Purchase::get_resource_type(), e))?;

    Ok((StatusCode::OK, Json(purchase)))
}

async fn own_purchase(
    state: &AppState,
    user: &AuthenticatedUser,
    id: Uuid,
) -> WebResult<Purchase> {
    let found = Purchase::find_by_id(state.pool(), user, id)
        .await
        .map_err(|e| WebError::resource_fetch_error(Purchase::get_resource_type(), e))?
        .ok_or_else(|| WebError::resource_not_found(Purchase::get_resource_type()))?;

    check_access(state.pool(), user, &found, user.user_id())
        .await
        .map_err(|e| WebError::for_database_error(Purchase::get_resource_type(), e))?;

    Ok(found)
}

/// Completed purchases pull the student into the course.
async fn enroll_purchased(
    state: &AppState,
    user: &AuthenticatedUser,
    course_id: Uuid,
) -> WebResult<()> {
    let (_, created) = Enrollment::get_or_create(state.pool(), user, course_id)
        .await
        .map_err(|e| WebError::resource_fetch_error(Enrollment::get_resource_type(), e))?;

    if created {
        let course = Course::find_by_id(state.pool(), user, course_id)
            .await
            .map_err(|e| WebError::resource_fetch_error(Course::get_resource_type(), e))?;
        if let Some(course) = course {
            course
                .increment_students(state.pool())
                .await
                .map_err(|e| WebError::resource_fetch_error(Course::get_resource_type(), e))?;
        }
    }
    Ok(())
}

#[utoipa::path(
    post,
    path = "/api/v1/checkout/{id}/pay",
    description = "Run the purchase through its payment method, record the payment, complete the purchase and enroll the buyer",
    responses(
        (status = 200, description = "Payment captured", body = PayResponse),
        (status = 400, description = "No payment method chosen", body = ErrorResponse),
        (status = 403, description = "Not your purchase", body = ErrorResponse),
        (status = 404, description = "Purchase not found", body = ErrorResponse),
        (status = 409, description = "Purchase is not payable", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "checkout",
    security(
        ("cookie" = [])
    )
)]
async fn checkout_pay_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let purchase = own_purchase(&state, user, id).await?;

    // failed purchases may be retried
    if !matches!(purchase.status(), "pending" | "failed") {
        return Err(PaymentError::NotPayable(purchase.status().to_string()).into());
    }

    let method_id = purchase
        .payment_method_id()
        .ok_or_else(|| WebError::user_bad_request("choose a payment method first"))?;
    let method = PaymentMethod::find_by_id(state.pool(), user, method_id)
        .await
        .map_err(|e| WebError::resource_fetch_error(PaymentMethod::get_resource_type(), e))?
        .ok_or_else(|| WebError::resource_not_found(PaymentMethod::get_resource_type()))?;
    if !method.is_active() {
        return Err(PaymentError::MethodInactive.into());
    }

    let kind = ProcessorKind::parse(method.kind())?;
    let currency = Config::get_or_init(false).await.payment().currency();

    let charge = state
        .payments()
        .charge(kind, purchase.total_cents(), currency)
        .await?;

    let payment = Payment::record_charge(
        state.pool(),
        user,
        PaymentCreate {
            purchase_id: purchase.id(),
            amount_cents: purchase.total_cents(),
            currency: currency.to_string(),
        },
        &charge,
    )
    .await
    .map_err(|e| WebError::resource_fetch_error(Payment::get_resource_type(), e))?;

    let payment = payment
        .mark_succeeded(state.pool())
        .await
        .map_err(|e| WebError::resource_fetch_error(Payment::get_resource_type(), e))?;

    let purchase = purchase
        .mark_completed(state.pool(), &charge.transaction_id)
        .await
        .map_err(|e| WebError::resource_fetch_error(Purchase::get_resource_type(), e))?;

    if !purchase.promo_code().is_empty() {
        let promo = PromoCode::find_by_code(state.pool(), user, purchase.promo_code())
            .await
            .map_err(|e| WebError::resource_fetch_error(PromoCode::get_resource_type(), e))?;
        if let Some(promo) = promo {
            promo
                .increment_uses(state.pool())
                .await
                .map_err(|e| WebError::resource_fetch_error(PromoCode::get_resource_type(), e))?;
        }
    }

    enroll_purchased(&state, user, purchase.course_id()).await?;

    Ok((StatusCode::OK, Json(PayResponse { purchase, payment })))
}

#[utoipa::path(
    post,
    path = "/api/v1/checkout/{id}/success",
    description = "Processor redirect landing: confirms the purchase went through and the buyer is enrolled. Idempotent.",
    responses(
        (status = 200, description = "Purchase confirmed", body = Purchase),
        (status = 403, description = "Not your purchase", body = ErrorResponse),
        (status = 404, description = "Purchase not found", body = ErrorResponse),
        (status = 409, description = "Purchase was never captured", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "checkout",
    security(
        ("cookie" = [])
    )
)]
async fn checkout_success_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let purchase = own_purchase(&state, user, id).await?;

    if !purchase.is_completed() {
        return Err(PaymentError::NotPayable(purchase.status().to_string()).into());
    }

    enroll_purchased(&state, user, purchase.course_id()).await?;

    Ok((StatusCode::OK, Json(purchase)))
}

#[utoipa::path(
    post,
    path = "/api/v1/checkout/{id}/failed",
    description = "Processor redirect landing for a failed charge: flips the purchase and its payment to failed",
    responses(
        (status = 200, description = "Failure recorded", body = Purchase),
        (status = 403, description = "Not your purchase", body = ErrorResponse),
        (status = 404, description = "Purchase not found", body = ErrorResponse),
        (status = 409, description = "Purchase is already completed", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "checkout",
    security(
        ("cookie" = [])
    )
)]
async fn checkout_failed_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let purchase = own_purchase(&state, user, id).await?;

    if purchase.is_completed() {
        return Err(PaymentError::NotPayable(purchase.status().to_string()).into());
    }

    if let Some(payment) = Payment::find_by_purchase(state.pool(), user, purchase.id())
        .await
        .map_err(|e| WebError::resource_fetch_error(Payment::get_resource_type(), e))?
    {
        payment
            .mark_failed(state.pool(), "processor reported failure")
            .await
            .map_err(|e| WebError::resource_fetch_error(Payment::get_resource_type(), e))?;
    }

    let purchase = purchase
        .mark_failed(state.pool())
        .await
        .map_err(|e| WebError::resource_fetch_error(Purchase::get_resource_type(), e))?;

    Ok((StatusCode::OK, Json(purchase)))
}

#[utoipa::path(
    get,
    path = "/api/v1/checkout/history",
    description = "Own purchases, newest first",
    responses(
        (status = 200, description = "Purchase history", body = crate::model::Page<Purchase>),
        (status = 401, description = "You're not authorized", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "checkout",
    security(
        ("cookie" = [])
    )
)]
async fn checkout_history_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Query(page): Query<PaginationQuery>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let purchases = Purchase::page(state.pool(), user, page.limit, page.offset)
        .await
        .map_err(|e| WebError::resource_fetch_error(Purchase::get_resource_type(), e))?;

    Ok((StatusCode::OK, Json(purchases)))
}

#[utoipa::path(
    post,
    path = "/api/v1/checkout/{id}/refund",
    description = "Ask for your money back on a completed purchase",
    request_body = RefundRequestBody,
    responses(
        (status = 200, description = "Refund requested", body = Refund),
        (status = 400, description = "Purchase is not completed", body = ErrorResponse),
        (status = 403, description = "Not your purchase", body = ErrorResponse),
        (status = 404, description = "Purchase not found", body = ErrorResponse),
        (status = 409, description = "A refund is already pending", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "checkout",
    security(
        ("cookie" = [])
    )
)]
async fn refunds_request_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<RefundRequestBody>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let purchase = own_purchase(&state, user, id).await?;

    if !purchase.is_completed() {
        return Err(WebError::user_bad_request(
            "only completed purchases can be refunded",
        ));
    }

    let pending = Refund::find_pending_by_purchase(state.pool(), user, purchase.id())
        .await
        .map_err(|e| WebError::resource_fetch_error(Refund::get_resource_type(), e))?;
    if pending.is_some() {
        return Err(WebError::resource_conflict(Refund::get_resource_type()));
    }

    let refund = Refund::create(
        state.pool(),
        user,
        RefundCreate {
            purchase_id: purchase.id(),
            reason: payload.reason,
            refund_amount_cents: purchase.total_cents(),
        },
    )
    .await
    .map_err(|e| WebError::resource_fetch_error(Refund::get_resource_type(), e))?;

    Ok((StatusCode::OK, Json(refund)))
}

#[utoipa::path(
    get,
    path = "/api/v1/checkout/refunds",
    description = "Refund requests waiting for a decision (admin)",
    responses(
        (status = 200, description = "Pending refunds", body = Vec<Refund>),
        (status = 403, description = "You're not an admin to do this", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "checkout",
    security(
        ("cookie" = [])
    )
)]
async fn refunds_pending_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    if user.user_role() != UserRole::Admin {
        return Err(WebError::resource_forbidden(Refund::get_resource_type()));
    }

    let refunds = Refund::all_pending(state.pool(), user)
        .await
        .map_err(|e| WebError::resource_fetch_error(Refund::get_resource_type(), e))?;

    Ok((StatusCode::OK, Json(refunds)))
}

/// The decision belongs to the admin or the instructor who sold the course.
async fn refund_for_decision(
    state: &AppState,
    user: &AuthenticatedUser,
    id: Uuid,
) -> WebResult<(Refund, Purchase)> {
    let refund = Refund::find_by_id(state.pool(), user, id)
        .await
        .map_err(|e| WebError::resource_fetch_error(Refund::get_resource_type(), e))?
        .ok_or_else(|| WebError::resource_not_found(Refund::get_resource_type()))?;

    if !refund.is_pending() {
        return Err(WebError::user_bad_request("this refund is already decided"));
    }

    let purchase = Purchase::find_by_id(state.pool(), user, refund.purchase_id())
        .await
        .map_err(|e| WebError::resource_fetch_error(Purchase::get_resource_type(), e))?
        .ok_or_else(|| WebError::resource_not_found(Purchase::get_resource_type()))?;

    if !user.is_admin() {
        let course = Course::find_by_id(state.pool(), user, purchase.course_id())
            .await
            .map_err(|e| WebError::resource_fetch_error(Course::get_resource_type(), e))?
            .ok_or_else(|| WebError::resource_not_found(Course::get_resource_type()))?;
        if course.instructor_id() != user.user_id() {
            return Err(WebError::resource_forbidden(Refund::get_resource_type()));
        }
    }

    Ok((refund, purchase))
}

#[utoipa::path(
    post,
    path = "/api/v1/checkout/refunds/{id}/approve",
    description = "Approve a refund: the purchase becomes refunded and its payment canceled",
    responses(
        (status = 200, description = "Refund completed", body = Refund),
        (status = 400, description = "Refund is already decided", body = ErrorResponse),
        (status = 403, description = "Not your call", body = ErrorResponse),
        (status = 404, description = "Refund not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "checkout",
    security(
        ("cookie" = [])
    )
)]
async fn refunds_approve_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let (refund, purchase) = refund_for_decision(&state, user, id).await?;

    purchase
        .mark_refunded(state.pool(), refund.reason(), refund.refund_amount_cents())
        .await
        .map_err(|e| WebError::resource_fetch_error(Purchase::get_resource_type(), e))?;

    if let Some(payment) = Payment::find_by_purchase(state.pool(), user, refund.purchase_id())
        .await
        .map_err(|e| WebError::resource_fetch_error(Payment::get_resource_type(), e))?
    {
        payment
            .mark_canceled(state.pool())
            .await
            .map_err(|e| WebError::resource_fetch_error(Payment::get_resource_type(), e))?;
    }

    let refund = refund
        .approve(state.pool())
        .await
        .map_err(|e| WebError::resource_fetch_error(Refund::get_resource_type(), e))?;

    Ok((StatusCode::OK, Json(refund)))
}

#[utoipa::path(
    post,
    path = "/api/v1/checkout/refunds/{id}/reject",
    description = "Reject a refund with a reason",
    request_body = RefundRejectBody,
    responses(
        (status = 200, description = "Refund rejected", body = Refund),
        (status = 400, description = "Refund is already decided", body = ErrorResponse),
        (status = 403, description = "Not your call", body = ErrorResponse),
        (status = 404, description = "Refund not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "checkout",
    security(
        ("cookie" = [])
    )
)]
async fn refunds_reject_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<RefundRejectBody>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let (refund, _purchase) = refund_for_decision(&state, user, id).await?;

    let refund = refund
        .reject(state.pool(), &payload.rejection_reason)
        .await
        .map_err(|e| WebError::resource_fetch_error(Refund::get_resource_type(), e))?;

    Ok((StatusCode::OK, Json(refund)))
}
