//! REST API endpoint tests

mod auth_tests;
mod comment_tests;
mod conversation_tests;
mod health_tests;
mod hashtag_tests;
mod post_tests;
mod rate_limit_tests;
mod story_tests;
mod user_tests;
