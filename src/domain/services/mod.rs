//! # Domain Services
//!
//! Domain services encapsulate business rules that don't naturally belong to
//! a single entity.
//!
//! ## Services
//!
//! - **VisibilityService**: Private-account visibility of profiles, posts and stories

mod visibility_service;

pub use visibility_service::*;
