//! Application settings and configuration structures.

use std::net::IpAddr;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

/// Root configuration structure containing all application settings.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Server configuration (host, port)
    pub server: ServerSettings,

    /// Which repository backend to use
    pub storage: StorageSettings,

    /// Database configuration (PostgreSQL)
    pub database: DatabaseSettings,

    /// Redis configuration (shared revocation list and rate limits)
    pub redis: RedisSettings,

    /// JWT authentication settings
    pub jwt: JwtSettings,

    /// Snowflake ID generator settings
    pub snowflake: SnowflakeSettings,

    /// Rate limiting configuration
    pub rate_limit: RateLimitSettings,

    /// Media upload configuration
    pub media: MediaSettings,

    /// Story lifetime configuration
    pub stories: StorySettings,

    /// CORS configuration
    pub cors: CorsSettings,

    /// Current environment (development, staging, production)
    pub environment: String,
}

/// Server binding configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    /// Host address to bind to (e.g., "0.0.0.0")
    pub host: String,

    /// Port number to listen on
    pub port: u16,
}

/// Repository backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// PostgreSQL through sqlx
    Postgres,
    /// Process-local maps; single instance only
    Memory,
}

/// Storage configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageSettings {
    pub backend: StorageBackend,
}

/// PostgreSQL database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    /// Database connection URL
    pub url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of connections to maintain
    pub min_connections: u32,

    /// Connection acquire timeout in seconds
    pub acquire_timeout: u64,

    /// Run embedded migrations on startup
    pub run_migrations: bool,
}

/// Redis configuration.
///
/// When `url` is unset the revocation list and rate-limit counters live in
/// process memory and are not shared between instances.
#[derive(Debug, Clone, Deserialize)]
pub struct RedisSettings {
    /// Redis connection URL
    pub url: Option<String>,

    /// Key prefix for all entries written by this service
    pub key_prefix: String,
}

/// JWT authentication configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct JwtSettings {
    /// Secret key for signing access tokens
    pub secret: String,

    /// Secret key for signing refresh tokens
    pub refresh_secret: String,

    /// Access token expiry in minutes
    pub access_token_expiry_minutes: i64,

    /// Refresh token expiry in days
    pub refresh_token_expiry_days: i64,

    /// Cookie carrying the access token for browser clients
    pub access_cookie_name: String,

    /// Cookie carrying the refresh token for browser clients
    pub refresh_cookie_name: String,

    /// Mark auth cookies `Secure`
    pub secure_cookies: bool,
}

/// Snowflake ID generator configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SnowflakeSettings {
    /// Machine/worker ID (0-31)
    pub machine_id: u16,

    /// Custom epoch timestamp in milliseconds
    pub epoch: u64,
}

/// A single fixed-window limiter.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct LimiterSettings {
    /// Requests allowed per window
    pub max_requests: u32,

    /// Window length in milliseconds
    pub window_ms: u64,
}

/// Rate limiting configuration, one limiter per endpoint family.
#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitSettings {
    /// Master switch
    pub enabled: bool,

    pub api: LimiterSettings,
    pub auth: LimiterSettings,
    pub post_create: LimiterSettings,
    pub comment_create: LimiterSettings,
    pub message_send: LimiterSettings,
    pub follow: LimiterSettings,

    /// Reverse proxies whose `X-Forwarded-For` / `X-Real-IP` are believed.
    /// Forwarded headers from any other peer are ignored.
    #[serde(default)]
    pub trusted_proxies: Vec<IpAddr>,
}

/// Crop behaviour of a transformation profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CropMode {
    /// Shrink to fit inside the box, keep aspect ratio
    Limit,
    /// Scale and centre-crop to exactly the box
    Fill,
}

/// Resize/crop/quality profile applied to uploaded images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct TransformProfile {
    pub width: u32,
    pub height: u32,
    pub crop: CropMode,
    pub quality: u8,
}

/// Media upload configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct MediaSettings {
    /// Directory where uploaded files are written
    pub upload_dir: String,

    /// Public URL prefix the upload directory is served under
    pub public_base_url: String,

    /// Maximum accepted size of a single file in bytes
    pub max_file_size: usize,

    /// Maximum number of files attached to one post
    pub max_files_per_post: usize,

    pub post_profile: TransformProfile,
    pub story_profile: TransformProfile,
    pub avatar_profile: TransformProfile,
}

/// Story lifetime configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StorySettings {
    /// Hours a story stays visible
    pub lifetime_hours: i64,

    /// Seconds between sweeps of expired stories
    pub cleanup_interval_secs: u64,
}

/// CORS configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct CorsSettings {
    /// Allowed origins (comma-separated in env)
    pub allowed_origins: Vec<String>,
}

/// Minimum required length for JWT secret (256 bits = 32 bytes)
pub const MIN_JWT_SECRET_LENGTH: usize = 32;

impl Settings {
    /// Load settings from environment variables and configuration files.
    ///
    /// The loading order is:
    /// 1. built-in defaults
    /// 2. config/default.toml (base configuration)
    /// 3. config/{RUN_ENV}.toml (environment-specific overrides)
    /// 4. Environment variables (highest priority)
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if configuration cannot be loaded or parsed,
    /// or if a JWT secret is too short.
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let environment = std::env::var("RUN_ENV").unwrap_or_else(|_| "development".into());

        Self::default_builder(&environment)?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // APP__SERVER__PORT=3000 -> server.port = 3000
            .add_source(
                Environment::default()
                    .prefix("APP")
                    .separator("__")
                    .try_parsing(true)
                    // APP__RATE_LIMIT__TRUSTED_PROXIES=10.0.0.2,10.0.0.3
                    .list_separator(",")
                    .with_list_parse_key("rate_limit.trusted_proxies"),
            )
            .set_override_option("server.host", std::env::var("SERVER_HOST").ok())?
            .set_override_option("server.port", std::env::var("SERVER_PORT").ok())?
            .set_override_option("database.url", std::env::var("DATABASE_URL").ok())?
            .set_override_option("redis.url", std::env::var("REDIS_URL").ok())?
            .set_override_option("jwt.secret", std::env::var("JWT_SECRET").ok())?
            .set_override_option(
                "jwt.refresh_secret",
                std::env::var("JWT_REFRESH_SECRET").ok(),
            )?
            .set_override_option(
                "snowflake.machine_id",
                std::env::var("SNOWFLAKE_MACHINE_ID").ok(),
            )?
            .build()?
            .try_deserialize()
            .and_then(Self::validated)
    }

    /// Settings built only from defaults plus the given JWT secrets.
    ///
    /// Uses the in-memory backend; intended for tests and local demos.
    pub fn for_testing(secret: &str) -> Result<Self, ConfigError> {
        Self::default_builder("test")?
            .set_override("storage.backend", "memory")?
            .set_override("jwt.secret", secret)?
            .set_override("jwt.refresh_secret", format!("{secret}-refresh"))?
            .build()?
            .try_deserialize()
            .and_then(Self::validated)
    }

    fn default_builder(
        environment: &str,
    ) -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        Config::builder()
            .set_default("environment", environment)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 3000)?
            .set_default("storage.backend", "postgres")?
            .set_default("database.url", "postgres://localhost/social")?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 2)?
            .set_default("database.acquire_timeout", 30)?
            .set_default("database.run_migrations", true)?
            .set_default("redis.key_prefix", "social")?
            .set_default("jwt.access_token_expiry_minutes", 15)?
            .set_default("jwt.refresh_token_expiry_days", 7)?
            .set_default("jwt.access_cookie_name", "accessToken")?
            .set_default("jwt.refresh_cookie_name", "refreshToken")?
            .set_default("jwt.secure_cookies", false)?
            .set_default("snowflake.machine_id", 1)?
            .set_default("snowflake.epoch", 1_577_836_800_000_u64)? // 2020-01-01
            .set_default("rate_limit.enabled", true)?
            .set_default("rate_limit.api.max_requests", 100)?
            .set_default("rate_limit.api.window_ms", 15 * 60 * 1000)?
            .set_default("rate_limit.auth.max_requests", 5)?
            .set_default("rate_limit.auth.window_ms", 15 * 60 * 1000)?
            .set_default("rate_limit.post_create.max_requests", 10)?
            .set_default("rate_limit.post_create.window_ms", 60 * 60 * 1000)?
            .set_default("rate_limit.comment_create.max_requests", 30)?
            .set_default("rate_limit.comment_create.window_ms", 15 * 60 * 1000)?
            .set_default("rate_limit.message_send.max_requests", 60)?
            .set_default("rate_limit.message_send.window_ms", 60 * 1000)?
            .set_default("rate_limit.follow.max_requests", 50)?
            .set_default("rate_limit.follow.window_ms", 60 * 60 * 1000)?
            .set_default("media.upload_dir", "uploads")?
            .set_default("media.public_base_url", "http://localhost:3000/uploads")?
            .set_default("media.max_file_size", 10 * 1024 * 1024)?
            .set_default("media.max_files_per_post", 10)?
            .set_default("media.post_profile.width", 1080)?
            .set_default("media.post_profile.height", 1350)?
            .set_default("media.post_profile.crop", "limit")?
            .set_default("media.post_profile.quality", 85)?
            .set_default("media.story_profile.width", 1080)?
            .set_default("media.story_profile.height", 1920)?
            .set_default("media.story_profile.crop", "fill")?
            .set_default("media.story_profile.quality", 80)?
            .set_default("media.avatar_profile.width", 400)?
            .set_default("media.avatar_profile.height", 400)?
            .set_default("media.avatar_profile.crop", "fill")?
            .set_default("media.avatar_profile.quality", 85)?
            .set_default("stories.lifetime_hours", 24)?
            .set_default("stories.cleanup_interval_secs", 600)?
            .set_default("cors.allowed_origins", vec!["http://localhost:3000"])
    }

    fn validated(settings: Self) -> Result<Self, ConfigError> {
        for (name, secret) in [
            ("JWT secret", &settings.jwt.secret),
            ("JWT refresh secret", &settings.jwt.refresh_secret),
        ] {
            if secret.len() < MIN_JWT_SECRET_LENGTH {
                return Err(ConfigError::Message(format!(
                    "{} must be at least {} characters. Current length: {}",
                    name,
                    MIN_JWT_SECRET_LENGTH,
                    secret.len()
                )));
            }
        }
        Ok(settings)
    }

    /// Get the full server address as a string.
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
