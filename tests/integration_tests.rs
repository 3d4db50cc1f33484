//! Integration Tests Entry Point
//!
//! Tests are organized by module:
//! - `api/` - REST API endpoint tests against the in-memory backend
//! - `repositories/` - PostgreSQL repository tests (ignored without a database)
//! - `common/` - Shared test utilities

mod api;
mod common;
mod repositories;

// Re-export common utilities for tests
pub use common::*;
