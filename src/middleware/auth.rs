use axum::{body::Body, extract::State, http::Request, middleware::Next, response::Response};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};

use crate::{
    AppState, access::AuthUser, error::AppError, routes::user::User, utils::verify_token,
};

/// Resolves the bearer credential to a loaded [`AuthUser`] and makes it
/// available to handlers as a request extension. Applied to every
/// protected route group.
pub async fn auth_middleware(
    State(state): State<AppState>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let TypedHeader(Authorization(bearer)) = bearer.ok_or(AppError::Unauthorized)?;
    let user = resolve_user(&state, bearer.token()).await?;
    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}

/// Variant for anonymous-permitted endpoints (donations, feedback): a valid
/// token attaches the caller's identity, anything else proceeds anonymous.
pub async fn optional_auth_middleware(
    State(state): State<AppState>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    if let Some(TypedHeader(Authorization(bearer))) = bearer {
        if let Ok(user) = resolve_user(&state, bearer.token()).await {
            req.extensions_mut().insert(user);
        }
    }
    next.run(req).await
}

async fn resolve_user(state: &AppState, token: &str) -> Result<AuthUser, AppError> {
    let claims = verify_token(token, &state.config).map_err(|_| AppError::Unauthorized)?;
    let user = User::find_by_id(&state.pool, &claims.sub)
        .await?
        .ok_or(AppError::Unauthorized)?;
    if !user.is_active {
        return Err(AppError::Unauthorized);
    }
    Ok(AuthUser {
        user_id: user.user_id,
        role: user.role,
    })
}
