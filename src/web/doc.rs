use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{Modify, OpenApi};

pub struct CookieAuthModifier;

impl Modify for CookieAuthModifier {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(schema) = openapi.components.as_mut() {
            schema.add_security_scheme(
                "cookie",
                SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::with_description(
                    "SID",
                    "JWT token for current user",
                ))),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::web::routes::user::user_signup_handler,
        crate::web::routes::user::user_signin_handler,
        crate::web::routes::user::user_me_handler,
        crate::web::routes::user::user_list_handler,
        crate::web::routes::user::user_update_handler,
        crate::web::routes::user::user_delete_handler,
        crate::web::routes::user::user_role_handler,
        crate::web::routes::categories::categories_list_handler,
        crate::web::routes::categories::categories_create_handler,
        crate::web::routes::courses::courses_catalog_handler,
        crate::web::routes::courses::courses_detail_handler,
        crate::web::routes::courses::courses_create_handler,
        crate::web::routes::courses::courses_publish_handler,
        crate::web::routes::courses::courses_enroll_handler,
        crate::web::routes::courses::courses_my_handler,
        crate::web::routes::courses::courses_teaching_handler,
        crate::web::routes::sections::sections_create_handler,
        crate::web::routes::lessons::lessons_create_handler,
        crate::web::routes::lessons::lessons_get_handler,
        crate::web::routes::lessons::lessons_complete_handler,
        crate::web::routes::lessons::lessons_position_handler,
        crate::web::routes::steps::steps_create_handler,
        crate::web::routes::steps::steps_list_handler,
        crate::web::routes::steps::steps_reorder_handler,
        crate::web::routes::steps::steps_duplicate_handler,
        crate::web::routes::steps::steps_check_handler,
        crate::web::routes::steps::steps_complete_handler,
        crate::web::routes::quizzes::quizzes_create_handler,
        crate::web::routes::quizzes::quizzes_get_handler,
        crate::web::routes::quizzes::attempts_start_handler,
        crate::web::routes::quizzes::attempts_submit_handler,
        crate::web::routes::quizzes::attempts_get_handler,
        crate::web::routes::reviews::reviews_list_handler,
        crate::web::routes::reviews::reviews_create_handler,
        crate::web::routes::comments::comments_list_handler,
        crate::web::routes::comments::comments_create_handler,
        crate::web::routes::assignments::assignments_create_handler,
        crate::web::routes::assignments::assignments_submit_handler,
        crate::web::routes::assignments::submissions_grade_handler,
        crate::web::routes::certificates::certificates_my_handler,
        crate::web::routes::certificates::certificates_verify_handler,
        crate::web::routes::checkout::checkout_methods_handler,
        crate::web::routes::checkout::checkout_create_handler,
        crate::web::routes::checkout::checkout_pay_handler,
        crate::web::routes::checkout::checkout_history_handler,
        crate::web::routes::checkout::refunds_request_handler,
        crate::web::routes::media::media_create_handler,
        crate::web::routes::media::media_list_handler,
    ),
    modifiers(&CookieAuthModifier),
)]
pub struct ApiDoc;
