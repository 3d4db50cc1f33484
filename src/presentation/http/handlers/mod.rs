//! HTTP Handlers
//!
//! Request handlers for all HTTP endpoints. Handlers only translate between
//! HTTP and the application services in [`crate::application::services`].

pub mod auth;
pub mod comment;
pub mod conversation;
pub mod hashtag;
pub mod health;
pub mod message;
pub mod post;
pub mod story;
pub mod user;
