//! Application Layer
//!
//! Services implementing the API's use cases and the request/response DTOs
//! they exchange with the presentation layer. Services talk to storage only
//! through the domain repository traits and the media store.

pub mod dto;
pub mod services;
