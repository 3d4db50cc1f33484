//! HTTP API
//!
//! Routes, handlers and extractors for the `/api/v1` surface.

pub mod extractors;
pub mod handlers;
pub mod routes;
