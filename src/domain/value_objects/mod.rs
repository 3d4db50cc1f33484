//! # Domain Value Objects
//!
//! Immutable value types that represent domain concepts without identity.
//!
//! ## Value Objects
//!
//! - **Pagination / Page / PageMeta**: 1-based offset pagination

mod pagination;

pub use pagination::*;
