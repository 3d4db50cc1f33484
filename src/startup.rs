//! Application Startup
//!
//! Backend selection, shared state and server initialization.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::Router;
use chrono::Utc;
use redis::aio::ConnectionManager;
use sqlx::PgPool;
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::application::services::{Services, StoryService};
use crate::config::{Settings, StorageBackend};
use crate::infrastructure::cache::{
    self, MemoryRateLimitStore, MemoryRevocationList, RateLimitStore, RedisRateLimitStore, RedisRevocationList,
    TokenRevocationList,
};
use crate::infrastructure::database;
use crate::infrastructure::media::{LocalMediaStore, MediaStore};
use crate::infrastructure::repositories::{MemoryStore, Repositories};
use crate::presentation::http::handlers::health;
use crate::presentation::http::routes;
use crate::presentation::middleware::RateLimiter;

/// How often in-process revocation and rate-limit entries are purged.
const MEMORY_PURGE_INTERVAL: Duration = Duration::from_secs(60);

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub services: Services,
    pub repos: Repositories,
    pub rate_limiter: RateLimiter,
    /// Set when `storage.backend = postgres`
    pub db: Option<PgPool>,
    /// Set when `redis.url` is configured
    pub redis: Option<ConnectionManager>,
}

impl AppState {
    /// Connect the configured backends.
    pub async fn connect(settings: Settings) -> Result<Self> {
        let (repos, db) = match settings.storage.backend {
            StorageBackend::Postgres => {
                let pool = database::create_pool(&settings.database)
                    .await
                    .context("Failed to connect to PostgreSQL")?;
                info!("Database connection pool created");

                if settings.database.run_migrations {
                    database::run_migrations(&pool).await.context("Failed to run migrations")?;
                    info!("Database migrations applied");
                }
                (Repositories::postgres(pool.clone()), Some(pool))
            }
            StorageBackend::Memory => {
                info!("Using in-memory repositories; data is lost on restart");
                (Repositories::in_memory(MemoryStore::new()), None)
            }
        };

        let redis = match &settings.redis.url {
            Some(url) => Some(
                cache::create_redis_client(url)
                    .await
                    .context("Failed to connect to Redis")?,
            ),
            None => None,
        };

        let (revocations, rate_store): (Arc<dyn TokenRevocationList>, Arc<dyn RateLimitStore>) = match &redis {
            Some(conn) => (
                Arc::new(RedisRevocationList::new(conn.clone(), settings.redis.key_prefix.clone())),
                Arc::new(RedisRateLimitStore::new(conn.clone(), settings.redis.key_prefix.clone())),
            ),
            None => {
                info!("No Redis configured; revocation list and rate limits are per instance");
                let revocations = Arc::new(MemoryRevocationList::new());
                let rate_store = Arc::new(MemoryRateLimitStore::new());
                spawn_memory_purge(revocations.clone(), rate_store.clone());
                (revocations, rate_store)
            }
        };

        let media: Arc<dyn MediaStore> = Arc::new(LocalMediaStore::from_settings(&settings.media));

        Ok(Self::assemble(settings, repos, media, revocations, rate_store, db, redis))
    }

    /// Fully in-process state over the given media store.
    pub fn in_memory(settings: Settings, media: Arc<dyn MediaStore>) -> Self {
        Self::assemble(
            settings,
            Repositories::in_memory(MemoryStore::new()),
            media,
            Arc::new(MemoryRevocationList::new()),
            Arc::new(MemoryRateLimitStore::new()),
            None,
            None,
        )
    }

    fn assemble(
        settings: Settings,
        repos: Repositories,
        media: Arc<dyn MediaStore>,
        revocations: Arc<dyn TokenRevocationList>,
        rate_store: Arc<dyn RateLimitStore>,
        db: Option<PgPool>,
        redis: Option<ConnectionManager>,
    ) -> Self {
        let services = Services::new(&settings, &repos, media, revocations);
        let rate_limiter = RateLimiter::new(rate_store, settings.rate_limit.clone());

        Self {
            settings: Arc::new(settings),
            services,
            repos,
            rate_limiter,
            db,
            redis,
        }
    }
}

/// Router with every layer applied, ready to serve `state`.
pub fn build_router(state: AppState) -> Router {
    routes::create_router(state)
}

/// Periodically delete expired stories and their media.
pub fn spawn_story_cleanup(stories: Arc<dyn StoryService>, every: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            match stories.cleanup_expired().await {
                Ok(0) => {}
                Ok(removed) => info!(removed, "Expired stories cleaned up"),
                Err(e) => error!(error = %e, "Story cleanup failed"),
            }
        }
    });
}

fn spawn_memory_purge(revocations: Arc<MemoryRevocationList>, rate_store: Arc<MemoryRateLimitStore>) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(MEMORY_PURGE_INTERVAL);
        loop {
            ticker.tick().await;
            revocations.purge_expired();
            rate_store.purge_expired(Utc::now().timestamp_millis());
        }
    });
}

/// Application instance
pub struct Application {
    listener: TcpListener,
    router: Router,
}

impl Application {
    /// Build the application from settings
    pub async fn build(settings: Settings) -> Result<Self> {
        health::init_server_start();

        let addr = settings.server_addr();
        let cleanup_every = Duration::from_secs(settings.stories.cleanup_interval_secs.max(1));

        let state = AppState::connect(settings).await?;
        spawn_story_cleanup(state.services.stories.clone(), cleanup_every);

        let router = build_router(state);

        let listener = TcpListener::bind(&addr)
            .await
            .with_context(|| format!("Failed to bind {}", addr))?;
        info!("Listening on {}", listener.local_addr()?);

        Ok(Self { listener, router })
    }

    /// Run the server until stopped
    pub async fn run_until_stopped(self) -> Result<()> {
        axum::serve(
            self.listener,
            self.router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await?;
        Ok(())
    }

    /// Get the bound address
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
