use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use tower_cookies::Cookies;

use crate::{
    Config, auth,
    model::{CrudRepository, ResourceTyped, entity::UserEntity},
    web::{AppState, RequestContext, context::AuthenticatedUser, error::WebError},
};

pub static AUTH_TOKEN: &str = "SID";

/// Turns the SID cookie into the request's `AuthenticatedUser`. Anonymous
/// requests pass through with an empty context; a cookie that fails
/// signature validation is rejected outright.
pub async fn extract_context_fn(
    State(state): State<AppState>,
    cookies: Cookies,
    mut req: Request,
    next: Next,
) -> Result<Response, WebError> {
    let user = match cookies.get(AUTH_TOKEN) {
        Some(token) => resolve_user(&state, token.value()).await?,
        None => None,
    };

    req.extensions_mut().insert(RequestContext::new(user));
    Ok(next.run(req).await)
}

/// The role lives on the user row, not in the token, so a promotion or
/// demotion takes effect on the next request. A deleted user resolves to an
/// anonymous context, as does a token whose subject is not a uuid.
async fn resolve_user(
    state: &AppState,
    token: &str,
) -> Result<Option<AuthenticatedUser>, WebError> {
    let claims = auth::process_token(token, Config::get_or_init(false).await.app().jwt())
        .map_err(|e| WebError::auth_cookie_invalid(AUTH_TOKEN, e))?;

    let Ok(id) = claims.claims.sub.parse::<uuid::Uuid>() else {
        tracing::warn!("SID token carries a non-uuid subject");
        return Ok(None);
    };

    let user = UserEntity::find_by_id(state.pool(), &AuthenticatedUser::admin(), id)
        .await
        .map_err(|e| WebError::resource_fetch_error(UserEntity::get_resource_type(), e))?;

    Ok(user.map(|user| AuthenticatedUser::new(id, user.role())))
}
