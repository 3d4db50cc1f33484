//! # Social API Library
//!
//! HTTP/JSON backend for a photo-sharing social network:
//! - Accounts with JWT access/refresh tokens and a revocation list
//! - Posts with media, comments with one level of replies, likes
//! - Follows with follow requests for private accounts
//! - Direct and group conversations with messages and reactions
//! - 24-hour stories with view tracking, hashtags
//!
//! ## Architecture
//!
//! The crate follows Clean Architecture principles:
//!
//! - **Domain Layer**: Entities, repository traits and visibility rules
//! - **Application Layer**: Services and DTOs
//! - **Infrastructure Layer**: PostgreSQL/in-memory repositories, Redis, media store, metrics
//! - **Presentation Layer**: HTTP routes, handlers and middleware
//!
//! ## Module Structure
//!
//! ```text
//! social_api/
//! +-- config/         Configuration management
//! +-- domain/         Entities, value objects and repository traits
//! +-- application/    Services and DTOs
//! +-- infrastructure/ Repositories, cache, media and metrics
//! +-- presentation/   HTTP routes, handlers and middleware
//! +-- shared/         Errors, response envelope, validation, snowflake IDs
//! ```

// Configuration module
pub mod config;

// Domain layer - Core business logic
pub mod domain;

// Application layer - Business services
pub mod application;

// Infrastructure layer - External implementations
pub mod infrastructure;

// Presentation layer - HTTP handlers
pub mod presentation;

// Shared utilities
pub mod shared;

// Application startup and state management
pub mod startup;

// Telemetry and observability
pub mod telemetry;
