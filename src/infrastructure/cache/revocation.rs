//! Token revocation list.
//!
//! Tokens are stored by SHA-256 fingerprint, never in plain text, and are
//! forgotten once they would have expired anyway.

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use sha2::{Digest, Sha256};
use tracing::debug;

use super::keys;
use crate::shared::error::AppError;

/// Hex SHA-256 of a raw token.
pub fn token_fingerprint(token: &str) -> String {
    format!("{:x}", Sha256::digest(token.as_bytes()))
}

/// Set of tokens that must be rejected before their natural expiry.
#[async_trait]
pub trait TokenRevocationList: Send + Sync {
    /// Revoke `token` until `expires_at` (unix seconds).
    async fn revoke(&self, token: &str, expires_at: i64) -> Result<(), AppError>;

    async fn is_revoked(&self, token: &str) -> Result<bool, AppError>;
}

/// In-process revocation list. Entries are not shared between instances.
#[derive(Default)]
pub struct MemoryRevocationList {
    entries: DashMap<String, i64>,
}

impl MemoryRevocationList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop entries whose token has expired.
    pub fn purge_expired(&self) {
        let now = Utc::now().timestamp();
        self.entries.retain(|_, expires_at| *expires_at > now);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl TokenRevocationList for MemoryRevocationList {
    async fn revoke(&self, token: &str, expires_at: i64) -> Result<(), AppError> {
        self.purge_expired();
        if expires_at > Utc::now().timestamp() {
            self.entries.insert(token_fingerprint(token), expires_at);
        }
        Ok(())
    }

    async fn is_revoked(&self, token: &str) -> Result<bool, AppError> {
        let now = Utc::now().timestamp();
        Ok(self
            .entries
            .get(&token_fingerprint(token))
            .is_some_and(|expires_at| *expires_at > now))
    }
}

/// Redis-backed revocation list shared by every instance.
#[derive(Clone)]
pub struct RedisRevocationList {
    conn: ConnectionManager,
    namespace: String,
}

impl RedisRevocationList {
    pub fn new(conn: ConnectionManager, namespace: impl Into<String>) -> Self {
        Self {
            conn,
            namespace: namespace.into(),
        }
    }

    fn key(&self, token: &str) -> String {
        keys::namespaced(&self.namespace, keys::REVOKED_TOKEN, token_fingerprint(token))
    }
}

#[async_trait]
impl TokenRevocationList for RedisRevocationList {
    async fn revoke(&self, token: &str, expires_at: i64) -> Result<(), AppError> {
        let ttl = expires_at - Utc::now().timestamp();
        if ttl <= 0 {
            return Ok(());
        }
        let mut conn = self.conn.clone();
        let key = self.key(token);
        conn.set_ex::<_, _, ()>(&key, 1, ttl as u64).await?;
        debug!(key = %key, ttl, "Token revoked");
        Ok(())
    }

    async fn is_revoked(&self, token: &str) -> Result<bool, AppError> {
        let mut conn = self.conn.clone();
        let exists: bool = conn.exists(self.key(token)).await?;
        Ok(exists)
    }
}
