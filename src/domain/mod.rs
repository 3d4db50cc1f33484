//! # Domain Layer
//!
//! The domain layer contains the core business rules of the social API.
//! It is independent of any external frameworks or infrastructure concerns.
//!
//! ## Structure
//!
//! - **entities**: Core domain entities (User, Post, Comment, Conversation, etc.)
//! - **value_objects**: Immutable value types (Pagination, Page)
//! - **services**: Domain services for rules spanning several entities
//!
//! ## Design Principles
//!
//! - No dependencies on infrastructure or presentation layers
//! - Repository traits define data access contracts
//! - Entities encapsulate domain behavior

pub mod entities;
pub mod services;
pub mod value_objects;

// Re-export commonly used types
pub use entities::*;
pub use services::*;
pub use value_objects::*;
