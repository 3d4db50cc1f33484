//! # Social API
//!
//! HTTP API backend for a photo-sharing social network.
//!
//! This is the application entry point that initializes:
//! - Tracing/logging subsystem
//! - Configuration loading
//! - Repository backend, Redis and media store
//! - HTTP server

use anyhow::Result;
use tracing::info;

use social_api::config::Settings;
use social_api::startup::Application;

#[tokio::main]
async fn main() -> Result<()> {
    social_api::telemetry::init_tracing();

    info!("Starting Social API...");

    // Load configuration from environment and config files
    let settings = Settings::load()?;
    info!(
        host = %settings.server.host,
        port = %settings.server.port,
        environment = %settings.environment,
        backend = ?settings.storage.backend,
        "Configuration loaded"
    );

    let application = Application::build(settings).await?;

    info!("Server ready to accept connections");
    application.run_until_stopped().await?;

    Ok(())
}
