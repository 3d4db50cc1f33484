//! Middleware
//!
//! Tower middleware for request processing.

pub mod auth;
pub mod cors;
pub mod logging;
pub mod rate_limit;
pub mod security;

pub use auth::{optional_auth, require_auth, AccessToken, AuthUser};
pub use rate_limit::{
    rate_limit_api,
    rate_limit_auth,
    rate_limit_comment_create,
    rate_limit_follow,
    rate_limit_message_send,
    rate_limit_post_create,
    Limiter,
    RateLimitInfo,
    RateLimiter,
};
pub use security::{create_security_headers_layer, SecurityHeadersConfig, SecurityHeadersLayer};
