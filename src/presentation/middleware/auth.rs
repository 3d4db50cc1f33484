//! Authentication Middleware
//!
//! Resolves the access token (Bearer header first, then the access-token
//! cookie) through the auth service and stores the caller in the request
//! extensions, where the [`AuthUser`] and
//! [`MaybeAuthUser`](crate::presentation::http::extractors::MaybeAuthUser)
//! extractors pick it up.

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::CookieJar;

use crate::domain::User;
use crate::shared::error::AppError;
use crate::startup::AppState;

/// Authenticated caller, inserted into request extensions.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub is_verified: bool,
}

impl From<&User> for AuthUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            is_verified: user.is_verified,
        }
    }
}

/// The raw access token of an authenticated request, needed to revoke it on
/// logout.
#[derive(Debug, Clone)]
pub struct AccessToken(pub String);

/// Access token from `Authorization: Bearer` or the access-token cookie.
pub fn extract_token(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    let bearer = headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());

    if let Some(token) = bearer {
        return Some(token.to_string());
    }

    CookieJar::from_headers(headers)
        .get(cookie_name)
        .map(|c| c.value().to_string())
        .filter(|t| !t.is_empty())
}

/// Reject requests without a valid, unrevoked access token.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = extract_token(request.headers(), &state.settings.jwt.access_cookie_name)
        .ok_or_else(AppError::not_authenticated)?;

    let user = state.services.auth.authenticate(&token).await?;

    request.extensions_mut().insert(AuthUser::from(&user));
    request.extensions_mut().insert(AccessToken(token));

    Ok(next.run(request).await)
}

/// Attach the caller when a valid token is present; never rejects.
pub async fn optional_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    if let Some(token) = extract_token(request.headers(), &state.settings.jwt.access_cookie_name) {
        match state.services.auth.authenticate(&token).await {
            Ok(user) => {
                request.extensions_mut().insert(AuthUser::from(&user));
                request.extensions_mut().insert(AccessToken(token));
            }
            Err(e) => tracing::debug!(error = %e, "Ignoring invalid optional credential"),
        }
    }

    next.run(request).await
}
