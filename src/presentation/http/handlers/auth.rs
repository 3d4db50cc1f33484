//! Authentication Handlers
//!
//! Tokens are returned in the body and mirrored into HttpOnly cookies for
//! browser clients.

use axum::{extract::State, http::StatusCode, Extension, Json};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

use crate::application::dto::request::{ChangePasswordRequest, LoginRequest, LogoutRequest, RefreshTokenRequest, RegisterRequest};
use crate::application::dto::response::{AuthResponse, TokenResponse, UserResponse};
use crate::config::JwtSettings;
use crate::presentation::http::extractors::{AuthUser, ValidatedJson};
use crate::presentation::middleware::AccessToken;
use crate::shared::error::AppError;
use crate::shared::response::ApiResponse;
use crate::startup::AppState;

fn auth_cookie(name: &str, value: String, settings: &JwtSettings) -> Cookie<'static> {
    Cookie::build((name.to_string(), value))
        .http_only(true)
        .secure(settings.secure_cookies)
        .same_site(SameSite::Lax)
        .path("/")
        .build()
}

fn with_token_cookies(jar: CookieJar, tokens: &TokenResponse, settings: &JwtSettings) -> CookieJar {
    jar.add(auth_cookie(&settings.access_cookie_name, tokens.access_token.clone(), settings))
        .add(auth_cookie(&settings.refresh_cookie_name, tokens.refresh_token.clone(), settings))
}

/// Expired cookies are sent whether or not the request carried any.
fn without_token_cookies(jar: CookieJar, settings: &JwtSettings) -> CookieJar {
    jar.add(removal_cookie(&settings.access_cookie_name))
        .add(removal_cookie(&settings.refresh_cookie_name))
}

fn removal_cookie(name: &str) -> Cookie<'static> {
    let mut cookie = Cookie::build((name.to_string(), "")).path("/").build();
    cookie.make_removal();
    cookie
}

/// Register a new user
pub async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    ValidatedJson(body): ValidatedJson<RegisterRequest>,
) -> Result<(StatusCode, CookieJar, ApiResponse<AuthResponse>), AppError> {
    let response = state.services.auth.register(body).await?;
    let jar = with_token_cookies(jar, &response.tokens, &state.settings.jwt);

    Ok((
        StatusCode::CREATED,
        jar,
        ApiResponse::ok(response).with_message("Registration successful"),
    ))
}

/// Login with credentials
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    ValidatedJson(body): ValidatedJson<LoginRequest>,
) -> Result<(CookieJar, ApiResponse<AuthResponse>), AppError> {
    let response = state.services.auth.login(body).await?;
    let jar = with_token_cookies(jar, &response.tokens, &state.settings.jwt);

    Ok((jar, ApiResponse::ok(response).with_message("Login successful")))
}

/// Exchange a refresh token for a new pair
pub async fn refresh_token(
    State(state): State<AppState>,
    jar: CookieJar,
    ValidatedJson(body): ValidatedJson<RefreshTokenRequest>,
) -> Result<(CookieJar, ApiResponse<TokenResponse>), AppError> {
    let tokens = state.services.auth.refresh(&body.refresh_token).await?;
    let jar = with_token_cookies(jar, &tokens, &state.settings.jwt);

    Ok((jar, ApiResponse::ok(tokens)))
}

/// Revoke the current tokens and clear the cookies
pub async fn logout(
    State(state): State<AppState>,
    Extension(AccessToken(access_token)): Extension<AccessToken>,
    jar: CookieJar,
    body: Option<Json<LogoutRequest>>,
) -> Result<(CookieJar, ApiResponse), AppError> {
    let refresh_token = body
        .and_then(|Json(b)| b.refresh_token)
        .or_else(|| {
            jar.get(&state.settings.jwt.refresh_cookie_name)
                .map(|c| c.value().to_string())
        });

    state
        .services
        .auth
        .logout(&access_token, refresh_token.as_deref())
        .await?;

    let jar = without_token_cookies(jar, &state.settings.jwt);
    Ok((jar, ApiResponse::message("Logged out")))
}

/// Get current authenticated user
pub async fn me(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<ApiResponse<UserResponse>, AppError> {
    let user = state.services.users.get_me(auth.id).await?;
    Ok(ApiResponse::ok(user))
}

pub async fn change_password(
    State(state): State<AppState>,
    auth: AuthUser,
    ValidatedJson(body): ValidatedJson<ChangePasswordRequest>,
) -> Result<ApiResponse, AppError> {
    state.services.auth.change_password(auth.id, body).await?;
    Ok(ApiResponse::message("Password changed"))
}
