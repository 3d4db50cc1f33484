//! Security Headers Middleware
//!
//! Adds hardening headers to every response. The API only serves JSON and
//! uploaded media, so the content policy forbids everything except images
//! being embedded by other origins.

use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};

use axum::{
    body::Body,
    http::{header, HeaderMap, HeaderName, HeaderValue, Request, Response},
};
use tower::{Layer, Service};

/// Security headers configuration
#[derive(Clone, Debug)]
pub struct SecurityHeadersConfig {
    /// Send `Strict-Transport-Security`; only meaningful behind HTTPS
    pub enable_hsts: bool,
    pub hsts_max_age: u64,
    pub content_security_policy: String,
    pub referrer_policy: String,
    /// `Cross-Origin-Resource-Policy`; uploads are embedded by web clients
    pub cross_origin_resource_policy: String,
}

impl Default for SecurityHeadersConfig {
    fn default() -> Self {
        Self {
            enable_hsts: false,
            hsts_max_age: 31_536_000,
            content_security_policy: "default-src 'none'; frame-ancestors 'none'".to_string(),
            referrer_policy: "no-referrer".to_string(),
            cross_origin_resource_policy: "cross-origin".to_string(),
        }
    }
}

impl SecurityHeadersConfig {
    /// HSTS is only sent in production.
    pub fn for_environment(environment: &str) -> Self {
        Self {
            enable_hsts: environment.eq_ignore_ascii_case("production"),
            ..Self::default()
        }
    }
}

/// Layer that adds security headers to responses
#[derive(Clone, Default)]
pub struct SecurityHeadersLayer {
    config: SecurityHeadersConfig,
}

impl SecurityHeadersLayer {
    pub fn with_config(config: SecurityHeadersConfig) -> Self {
        Self { config }
    }
}

impl<S> Layer<S> for SecurityHeadersLayer {
    type Service = SecurityHeadersMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        SecurityHeadersMiddleware {
            inner,
            config: self.config.clone(),
        }
    }
}

/// Middleware service that adds security headers
#[derive(Clone)]
pub struct SecurityHeadersMiddleware<S> {
    inner: S,
    config: SecurityHeadersConfig,
}

impl<S> Service<Request<Body>> for SecurityHeadersMiddleware<S>
where
    S: Service<Request<Body>, Response = Response<Body>> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request<Body>) -> Self::Future {
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let config = self.config.clone();

        Box::pin(async move {
            let mut response = inner.call(request).await?;
            apply_security_headers(response.headers_mut(), &config);
            Ok(response)
        })
    }
}

fn apply_security_headers(headers: &mut HeaderMap, config: &SecurityHeadersConfig) {
    headers.insert(header::X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    headers.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));

    if config.enable_hsts {
        if let Ok(value) = HeaderValue::from_str(&format!("max-age={}; includeSubDomains", config.hsts_max_age)) {
            headers.insert(header::STRICT_TRANSPORT_SECURITY, value);
        }
    }

    // Handlers may set their own policy (e.g. served files)
    if !headers.contains_key(header::CONTENT_SECURITY_POLICY) {
        if let Ok(value) = HeaderValue::from_str(&config.content_security_policy) {
            headers.insert(header::CONTENT_SECURITY_POLICY, value);
        }
    }
    if let Ok(value) = HeaderValue::from_str(&config.referrer_policy) {
        headers.insert(header::REFERRER_POLICY, value);
    }
    if let Ok(value) = HeaderValue::from_str(&config.cross_origin_resource_policy) {
        headers.insert(HeaderName::from_static("cross-origin-resource-policy"), value);
    }
}

/// Security headers layer for the given environment name.
pub fn create_security_headers_layer(environment: &str) -> SecurityHeadersLayer {
    SecurityHeadersLayer::with_config(SecurityHeadersConfig::for_environment(environment))
}
