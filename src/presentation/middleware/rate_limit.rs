//! Rate Limiting Middleware
//!
//! Fixed-window rate limiting keyed by `limiter:identity`. The identity is
//! the authenticated user when known, otherwise the client IP. Counters live
//! in a [`RateLimitStore`] (Redis when configured, in-process otherwise).
//!
//! Every response carries `X-RateLimit-Limit`, `X-RateLimit-Remaining` and
//! `X-RateLimit-Reset`; rejected requests also get `Retry-After`.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header, HeaderMap, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::Utc;

use crate::config::{LimiterSettings, RateLimitSettings};
use crate::infrastructure::cache::RateLimitStore;
use crate::infrastructure::metrics;
use crate::presentation::middleware::auth::AuthUser;
use crate::shared::error::AppError;
use crate::startup::AppState;

// ============================================================================
// Limiters
// ============================================================================

/// The configured limiters. Each one counts in its own key space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Limiter {
    /// Every `/api/v1` request
    Api,
    /// Register, login and refresh
    Auth,
    PostCreate,
    CommentCreate,
    MessageSend,
    Follow,
}

impl Limiter {
    pub fn name(&self) -> &'static str {
        match self {
            Limiter::Api => "api",
            Limiter::Auth => "auth",
            Limiter::PostCreate => "post_create",
            Limiter::CommentCreate => "comment_create",
            Limiter::MessageSend => "message_send",
            Limiter::Follow => "follow",
        }
    }

    fn settings(&self, settings: &RateLimitSettings) -> LimiterSettings {
        match self {
            Limiter::Api => settings.api,
            Limiter::Auth => settings.auth,
            Limiter::PostCreate => settings.post_create,
            Limiter::CommentCreate => settings.comment_create,
            Limiter::MessageSend => settings.message_send,
            Limiter::Follow => settings.follow,
        }
    }
}

// ============================================================================
// Rate Limiter
// ============================================================================

/// Outcome of one counted request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitInfo {
    pub allowed: bool,
    /// Maximum requests allowed in the window
    pub limit: u32,
    /// Requests left in the current window
    pub remaining: u32,
    /// Unix timestamp (seconds) when the window resets
    pub reset_at: i64,
    /// Seconds until the window resets
    pub retry_after: u64,
}

/// Applies the configured limits on top of a counter store.
#[derive(Clone)]
pub struct RateLimiter {
    store: Arc<dyn RateLimitStore>,
    settings: RateLimitSettings,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn RateLimitStore>, settings: RateLimitSettings) -> Self {
        Self { store, settings }
    }

    pub fn is_enabled(&self) -> bool {
        self.settings.enabled
    }

    pub fn trusted_proxies(&self) -> &[IpAddr] {
        &self.settings.trusted_proxies
    }

    /// Count one request for `identity` at `now_ms`.
    ///
    /// The first hit of a window (or the first after it elapsed) counts 1;
    /// the request is rejected once the count exceeds the maximum.
    pub async fn check_at(&self, limiter: Limiter, identity: &str, now_ms: i64) -> Result<RateLimitInfo, AppError> {
        let config = limiter.settings(&self.settings);
        let key = format!("{}:{}", limiter.name(), identity);

        let window = self.store.hit(&key, config.window_ms, now_ms).await?;
        let remaining_ms = (window.reset_at_ms - now_ms).max(0);

        Ok(RateLimitInfo {
            allowed: window.count <= config.max_requests,
            limit: config.max_requests,
            remaining: config.max_requests.saturating_sub(window.count),
            reset_at: (window.reset_at_ms + 999).div_euclid(1000),
            retry_after: ((remaining_ms + 999) / 1000) as u64,
        })
    }

    pub async fn check(&self, limiter: Limiter, identity: &str) -> Result<RateLimitInfo, AppError> {
        self.check_at(limiter, identity, Utc::now().timestamp_millis()).await
    }
}

// ============================================================================
// Identifier Extraction
// ============================================================================

/// Rate limit identity of a request.
///
/// Priority:
/// 1. Authenticated user ID
/// 2. First address in X-Forwarded-For, then X-Real-IP, only when the
///    socket peer is one of `trusted_proxies`; any client can set them
/// 3. Socket address
fn extract_identifier(request: &Request, client_ip: Option<IpAddr>, trusted_proxies: &[IpAddr]) -> String {
    if let Some(user) = request.extensions().get::<AuthUser>() {
        return format!("user:{}", user.id);
    }

    let from_trusted_proxy = client_ip.is_some_and(|peer| trusted_proxies.contains(&peer));
    if from_trusted_proxy {
        if let Some(ip) = forwarded_ip(request.headers()) {
            return format!("ip:{}", ip);
        }
    }

    match client_ip {
        Some(ip) => format!("ip:{}", ip),
        None => {
            tracing::warn!("Could not determine client identifier for rate limiting");
            "ip:unknown".to_string()
        }
    }
}

/// Client address reported by a reverse proxy.
fn forwarded_ip(headers: &HeaderMap) -> Option<IpAddr> {
    let forwarded_for = headers
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.split(',').next())
        .and_then(|ip| ip.trim().parse().ok());

    forwarded_for.or_else(|| {
        headers
            .get("x-real-ip")
            .and_then(|h| h.to_str().ok())
            .and_then(|ip| ip.trim().parse().ok())
    })
}

// ============================================================================
// Middleware Functions
// ============================================================================

/// Limits every `/api/v1` request.
pub async fn rate_limit_api(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    rate_limit_inner(state, request, next, Limiter::Api).await
}

/// Stricter limit on credential endpoints.
pub async fn rate_limit_auth(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    rate_limit_inner(state, request, next, Limiter::Auth).await
}

pub async fn rate_limit_post_create(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    rate_limit_inner(state, request, next, Limiter::PostCreate).await
}

pub async fn rate_limit_comment_create(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    rate_limit_inner(state, request, next, Limiter::CommentCreate).await
}

pub async fn rate_limit_message_send(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    rate_limit_inner(state, request, next, Limiter::MessageSend).await
}

pub async fn rate_limit_follow(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    rate_limit_inner(state, request, next, Limiter::Follow).await
}

async fn rate_limit_inner(
    state: AppState,
    request: Request,
    next: Next,
    limiter: Limiter,
) -> Response {
    if !state.rate_limiter.is_enabled() {
        return next.run(request).await;
    }

    let client_ip = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ci| ci.0.ip());
    let identifier = extract_identifier(&request, client_ip, state.rate_limiter.trusted_proxies());

    let info = match state.rate_limiter.check(limiter, &identifier).await {
        Ok(info) => info,
        Err(e) => {
            // Store outage: let the request through rather than fail the API
            tracing::error!(error = %e, limiter = limiter.name(), "Rate limiter store error");
            return next.run(request).await;
        }
    };

    if info.allowed {
        let mut response = next.run(request).await;
        add_rate_limit_headers(response.headers_mut(), &info);
        return response;
    }

    tracing::warn!(
        identifier = %identifier,
        limiter = limiter.name(),
        retry_after = info.retry_after,
        "Rate limit exceeded"
    );
    metrics::record_rate_limited(limiter.name());

    let mut response = AppError::RateLimited {
        retry_after: info.retry_after,
    }
    .into_response();
    add_rate_limit_headers(response.headers_mut(), &info);
    if let Ok(v) = HeaderValue::from_str(&info.retry_after.to_string()) {
        response.headers_mut().insert(header::RETRY_AFTER, v);
    }
    response
}

/// Limiters nest (the API-wide one wraps per-route ones); the innermost
/// limiter's headers are kept.
fn add_rate_limit_headers(headers: &mut HeaderMap, info: &RateLimitInfo) {
    if headers.contains_key("X-RateLimit-Limit") {
        return;
    }
    if let Ok(v) = HeaderValue::from_str(&info.limit.to_string()) {
        headers.insert("X-RateLimit-Limit", v);
    }
    if let Ok(v) = HeaderValue::from_str(&info.remaining.to_string()) {
        headers.insert("X-RateLimit-Remaining", v);
    }
    if let Ok(v) = HeaderValue::from_str(&info.reset_at.to_string()) {
        headers.insert("X-RateLimit-Reset", v);
    }
}

// ============================================================================
// Tests
// ============================================================================
