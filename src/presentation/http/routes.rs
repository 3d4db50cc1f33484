//! Route Configuration
//!
//! Configures all HTTP routes for the API.
//!
//! Each resource is split into a public router (optional authentication)
//! and a protected one (authentication required); the two are merged so the
//! same path can carry both kinds of method. Per-action limiters sit inside
//! the authentication layer so they count per user.

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    response::IntoResponse,
    routing::{delete, get, post, put},
    Router,
};
use tower_http::services::ServeDir;

use super::handlers;
use crate::infrastructure::metrics;
use crate::presentation::middleware::{
    create_security_headers_layer, optional_auth, rate_limit_api, rate_limit_auth, rate_limit_comment_create,
    rate_limit_follow, rate_limit_message_send, rate_limit_post_create, require_auth,
};
use crate::presentation::middleware::cors::create_cors_layer;
use crate::presentation::middleware::logging::create_trace_layer;
use crate::shared::error::AppError;
use crate::startup::AppState;

/// Headroom for the text fields of a multipart form.
const FORM_OVERHEAD_BYTES: usize = 64 * 1024;

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    let settings = state.settings.clone();

    Router::new()
        .nest("/api/v1", api_routes(&state))
        // Health check endpoints
        .route("/health", get(handlers::health::health_check))
        .route("/health/live", get(handlers::health::liveness))
        .route("/health/ready", get(handlers::health::readiness))
        // Prometheus metrics endpoint
        .route("/metrics", get(metrics_handler))
        // Files written by the local media store
        .nest_service("/uploads", ServeDir::new(&settings.media.upload_dir))
        .fallback(route_not_found)
        .layer(middleware::from_fn(metrics::track_metrics))
        .layer(create_security_headers_layer(&settings.environment))
        .layer(create_trace_layer())
        .layer(create_cors_layer(&settings.cors))
        .with_state(state)
}

/// Prometheus metrics endpoint handler
async fn metrics_handler() -> impl IntoResponse {
    let metrics = metrics::gather_metrics();
    (
        [(
            axum::http::header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        metrics,
    )
}

async fn route_not_found() -> AppError {
    AppError::not_found("ROUTE_NOT_FOUND", "Route not found")
}

/// API v1 routes
fn api_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .nest("/auth", auth_routes(state))
        .nest("/users", user_routes(state))
        .nest("/posts", post_routes(state))
        .nest("/comments", comment_routes(state))
        .nest("/conversations", conversation_routes(state))
        .nest("/messages", message_routes(state))
        .nest("/stories", story_routes(state))
        .nest("/hashtags", hashtag_routes(state))
        // Apply API rate limiting to all API routes
        .route_layer(middleware::from_fn_with_state(state.clone(), rate_limit_api))
}

fn public(state: &AppState, router: Router<AppState>) -> Router<AppState> {
    router.route_layer(middleware::from_fn_with_state(state.clone(), optional_auth))
}

fn protected(state: &AppState, router: Router<AppState>) -> Router<AppState> {
    router.route_layer(middleware::from_fn_with_state(state.clone(), require_auth))
}

/// Largest accepted multipart body for `files` uploads.
fn upload_limit(state: &AppState, files: usize) -> DefaultBodyLimit {
    DefaultBodyLimit::max(state.settings.media.max_file_size * files + FORM_OVERHEAD_BYTES)
}

/// Authentication routes; credential endpoints have a stricter limiter
fn auth_routes(state: &AppState) -> Router<AppState> {
    let credentials = Router::new()
        .route("/register", post(handlers::auth::register))
        .route("/login", post(handlers::auth::login))
        .route("/refresh", post(handlers::auth::refresh_token))
        .route_layer(middleware::from_fn_with_state(state.clone(), rate_limit_auth));

    let session = Router::new()
        .route("/logout", post(handlers::auth::logout))
        .route("/me", get(handlers::auth::me))
        .route("/password", put(handlers::auth::change_password));

    credentials.merge(protected(state, session))
}

fn user_routes(state: &AppState) -> Router<AppState> {
    let follow_limit = middleware::from_fn_with_state(state.clone(), rate_limit_follow);

    let open = Router::new()
        .route("/search", get(handlers::user::search_users))
        .route("/{user}", get(handlers::user::get_profile))
        .route("/{user}/followers", get(handlers::user::followers))
        .route("/{user}/following", get(handlers::user::following));

    let owned = Router::new()
        .route("/me", put(handlers::user::update_profile))
        .route(
            "/me/avatar",
            post(handlers::user::upload_avatar)
                .layer(upload_limit(state, 1))
                .delete(handlers::user::remove_avatar),
        )
        .route("/me/follow-requests", get(handlers::user::follow_requests))
        .route("/me/follow-requests/{id}", delete(handlers::user::reject_follow_request))
        .route("/me/follow-requests/{id}/accept", post(handlers::user::accept_follow_request))
        .route(
            "/{user}/follow",
            post(handlers::user::follow)
                .delete(handlers::user::unfollow)
                .route_layer(follow_limit),
        );

    public(state, open).merge(protected(state, owned))
}

fn post_routes(state: &AppState) -> Router<AppState> {
    let max_files = state.settings.media.max_files_per_post;

    let open = Router::new()
        .route("/explore", get(handlers::post::explore))
        .route("/user/{id}", get(handlers::post::user_posts))
        .route("/{id}", get(handlers::post::get_post))
        .route("/{id}/likes", get(handlers::post::post_likes))
        .route("/{id}/comments", get(handlers::comment::list_comments));

    let owned = Router::new()
        .route(
            "/",
            post(handlers::post::create_post)
                .layer(upload_limit(state, max_files))
                .route_layer(middleware::from_fn_with_state(state.clone(), rate_limit_post_create)),
        )
        .route("/feed", get(handlers::post::feed))
        .route(
            "/{id}",
            put(handlers::post::update_post).delete(handlers::post::delete_post),
        )
        .route("/{id}/archive", post(handlers::post::archive_post))
        .route("/{id}/unarchive", post(handlers::post::unarchive_post))
        .route(
            "/{id}/like",
            post(handlers::post::like_post).delete(handlers::post::unlike_post),
        )
        .route(
            "/{id}/comments",
            post(handlers::comment::create_comment)
                .route_layer(middleware::from_fn_with_state(state.clone(), rate_limit_comment_create)),
        );

    public(state, open).merge(protected(state, owned))
}

fn comment_routes(state: &AppState) -> Router<AppState> {
    let open = Router::new().route("/{id}/replies", get(handlers::comment::list_replies));

    let owned = Router::new()
        .route(
            "/{id}",
            put(handlers::comment::update_comment).delete(handlers::comment::delete_comment),
        )
        .route(
            "/{id}/like",
            post(handlers::comment::like_comment).delete(handlers::comment::unlike_comment),
        );

    public(state, open).merge(protected(state, owned))
}

fn conversation_routes(state: &AppState) -> Router<AppState> {
    let router = Router::new()
        .route(
            "/",
            post(handlers::conversation::create_conversation).get(handlers::conversation::list_conversations),
        )
        .route(
            "/{id}",
            get(handlers::conversation::get_conversation)
                .put(handlers::conversation::rename_conversation)
                .delete(handlers::conversation::delete_conversation),
        )
        .route("/{id}/members", post(handlers::conversation::add_members))
        .route("/{id}/members/{userId}", delete(handlers::conversation::remove_member))
        .route("/{id}/read", post(handlers::conversation::mark_read))
        .route(
            "/{id}/messages",
            post(handlers::message::send_message)
                .route_layer(middleware::from_fn_with_state(state.clone(), rate_limit_message_send))
                .get(handlers::message::get_messages),
        );

    protected(state, router)
}

fn message_routes(state: &AppState) -> Router<AppState> {
    let router = Router::new()
        .route(
            "/{id}",
            put(handlers::message::edit_message).delete(handlers::message::delete_message),
        )
        .route("/{id}/reactions", post(handlers::message::add_reaction))
        .route("/{id}/reactions/{emoji}", delete(handlers::message::remove_reaction));

    protected(state, router)
}

fn story_routes(state: &AppState) -> Router<AppState> {
    let open = Router::new().route("/user/{id}", get(handlers::story::user_stories));

    let owned = Router::new()
        .route(
            "/",
            post(handlers::story::create_story).layer(upload_limit(state, 1)),
        )
        .route("/feed", get(handlers::story::story_feed))
        .route("/{id}", delete(handlers::story::delete_story))
        .route("/{id}/view", post(handlers::story::view_story))
        .route("/{id}/viewers", get(handlers::story::story_viewers));

    public(state, open).merge(protected(state, owned))
}

fn hashtag_routes(state: &AppState) -> Router<AppState> {
    let router = Router::new()
        .route("/trending", get(handlers::hashtag::trending))
        .route("/search", get(handlers::hashtag::search))
        .route("/{name}", get(handlers::hashtag::get_hashtag))
        .route("/{name}/posts", get(handlers::hashtag::hashtag_posts));

    public(state, router)
}
