//! Infrastructure Layer
//!
//! Contains implementations for external services including:
//! - Database repositories (PostgreSQL) and their in-memory counterparts
//! - Revocation list and rate-limit counters (in-process or Redis)
//! - Media storage (local filesystem)
//! - Prometheus metrics

pub mod cache;
pub mod database;
pub mod media;
pub mod metrics;
pub mod repositories;
