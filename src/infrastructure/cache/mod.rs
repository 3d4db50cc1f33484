//! Cache Module
//!
//! Short-lived shared state that lives outside the relational store:
//! the access/refresh token revocation list and rate-limit counters.
//!
//! Both have two implementations: an in-process one backed by `DashMap`
//! (single instance only) and a Redis one shared by every instance. The
//! Redis variants are selected when `redis.url` is configured.
//!
//! # Architecture
//!
//! ```text
//! +-----------------------+      +--------------------+
//! | TokenRevocationList   |      |  RateLimitStore    |  <-- Abstract interfaces
//! +-----------------------+      +--------------------+
//!      |            |                 |           |
//!   Memory*      Redis*            Memory*      Redis*
//!                   \                            /
//!                    +--- ConnectionManager ----+
//! ```

mod rate_limit_store;
mod revocation;

pub use rate_limit_store::{MemoryRateLimitStore, RateLimitStore, RedisRateLimitStore, WindowState};
pub use revocation::{
    token_fingerprint, MemoryRevocationList, RedisRevocationList, TokenRevocationList,
};

use redis::aio::ConnectionManager;
use redis::Client;
use tracing::{info, instrument};

/// Creates a Redis connection manager with automatic reconnection.
#[instrument(skip(url))]
pub async fn create_redis_client(url: &str) -> Result<ConnectionManager, redis::RedisError> {
    info!("Connecting to Redis...");
    let client = Client::open(url)?;
    let manager = ConnectionManager::new(client).await?;
    info!("Redis connection established");
    Ok(manager)
}

/// Round-trip a `PING`, used by the readiness check.
pub async fn ping(conn: &ConnectionManager) -> Result<(), redis::RedisError> {
    let mut conn = conn.clone();
    redis::cmd("PING").query_async::<String>(&mut conn).await.map(|_| ())
}

/// Cache key prefixes.
///
/// Every key is additionally namespaced with `redis.key_prefix`.
pub mod keys {
    /// Prefix for revoked token fingerprints (e.g., "revoked:<sha256>")
    pub const REVOKED_TOKEN: &str = "revoked:";

    /// Prefix for rate limiting counters (e.g., "ratelimit:auth:ip:10.0.0.1")
    pub const RATE_LIMIT: &str = "ratelimit:";

    /// Generates a namespaced key
    #[inline]
    pub fn namespaced(namespace: &str, prefix: &str, id: impl std::fmt::Display) -> String {
        format!("{}:{}{}", namespace, prefix, id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_namespaced_key() {
        assert_eq!(
            keys::namespaced("social", keys::RATE_LIMIT, "auth:ip:1.2.3.4"),
            "social:ratelimit:auth:ip:1.2.3.4"
        );
    }
}
