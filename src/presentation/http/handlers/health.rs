//! Health Check Handlers
//!
//! Provides health check endpoints for Kubernetes-style liveness and readiness checks.
//!
//! # Endpoints
//! - `GET /health` - Basic health check
//! - `GET /health/live` - Liveness check (is the server running?)
//! - `GET /health/ready` - Readiness check (can the server accept traffic?)

use std::time::Instant;

use axum::{extract::State, http::StatusCode, Json};
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use serde::Serialize;

use crate::infrastructure::{cache, database};
use crate::startup::AppState;

/// Server start time for uptime calculation
static SERVER_START: Lazy<Instant> = Lazy::new(Instant::now);
static SERVER_START_TIME: Lazy<DateTime<Utc>> = Lazy::new(Utc::now);

/// Initialize the server start time (call during startup)
pub fn init_server_start() {
    Lazy::force(&SERVER_START);
    Lazy::force(&SERVER_START_TIME);
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// Detailed health check response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailedHealthResponse {
    pub status: HealthStatus,
    pub version: &'static str,
    pub uptime_seconds: u64,
    pub started_at: String,
    pub checks: HealthChecks,
}

#[derive(Debug, Serialize)]
pub struct HealthChecks {
    pub repository: ServiceHealth,
    /// Absent when no Redis URL is configured
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redis: Option<ServiceHealth>,
}

/// Health status for individual services
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceHealth {
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ServiceHealth {
    fn timed(started: Instant, degraded_after_ms: u64) -> Self {
        let latency = started.elapsed().as_millis() as u64;
        Self {
            status: if latency < degraded_after_ms {
                HealthStatus::Healthy
            } else {
                HealthStatus::Degraded
            },
            latency_ms: Some(latency),
            message: None,
        }
    }

    fn failed(message: String) -> Self {
        Self {
            status: HealthStatus::Unhealthy,
            latency_ms: None,
            message: Some(message),
        }
    }
}

/// Overall health status
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

#[derive(Debug, Serialize)]
pub struct LivenessResponse {
    pub status: &'static str,
}

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Liveness check - checks if the server is running
pub async fn liveness() -> Json<LivenessResponse> {
    Json(LivenessResponse { status: "alive" })
}

/// Readiness check - 200 when the repository backend (and Redis, if
/// configured) answer, 503 otherwise
pub async fn readiness(State(state): State<AppState>) -> (StatusCode, Json<DetailedHealthResponse>) {
    let repository = check_repository(&state).await;
    let redis = check_redis(&state).await;
    let overall_status = determine_overall_status(&repository, redis.as_ref());

    let response = DetailedHealthResponse {
        status: overall_status,
        version: env!("CARGO_PKG_VERSION"),
        uptime_seconds: SERVER_START.elapsed().as_secs(),
        started_at: SERVER_START_TIME.to_rfc3339(),
        checks: HealthChecks { repository, redis },
    };

    let status_code = match overall_status {
        HealthStatus::Healthy | HealthStatus::Degraded => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(response))
}

async fn check_repository(state: &AppState) -> ServiceHealth {
    let Some(pool) = &state.db else {
        return ServiceHealth {
            status: HealthStatus::Healthy,
            latency_ms: None,
            message: Some("in-memory backend".into()),
        };
    };

    let start = Instant::now();
    match database::ping(pool).await {
        Ok(()) => ServiceHealth::timed(start, 100),
        Err(e) => ServiceHealth::failed(format!("Database connection failed: {}", e)),
    }
}

async fn check_redis(state: &AppState) -> Option<ServiceHealth> {
    let conn = state.redis.as_ref()?;

    let start = Instant::now();
    Some(match cache::ping(conn).await {
        Ok(()) => ServiceHealth::timed(start, 50),
        Err(e) => ServiceHealth::failed(format!("Redis connection failed: {}", e)),
    })
}

/// Redis holds the revocation list, so losing it is as fatal as losing the
/// repository.
fn determine_overall_status(repository: &ServiceHealth, redis: Option<&ServiceHealth>) -> HealthStatus {
    let statuses = std::iter::once(repository.status).chain(redis.map(|r| r.status));

    statuses.fold(HealthStatus::Healthy, |overall, status| match (overall, status) {
        (HealthStatus::Unhealthy, _) | (_, HealthStatus::Unhealthy) => HealthStatus::Unhealthy,
        (HealthStatus::Degraded, _) | (_, HealthStatus::Degraded) => HealthStatus::Degraded,
        _ => HealthStatus::Healthy,
    })
}
