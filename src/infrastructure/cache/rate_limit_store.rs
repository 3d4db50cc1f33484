//! Fixed-window counters for the rate limiter.
//!
//! A window starts with the first hit for a key (count = 1) and lasts
//! `window_ms`. Hits inside the window increment the count; the first hit
//! after it elapses starts a new window.

use async_trait::async_trait;
use dashmap::DashMap;
use redis::aio::ConnectionManager;

use super::keys;
use crate::shared::error::AppError;

/// Counter state after recording a hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowState {
    /// Hits recorded in the current window, including this one
    pub count: u32,
    /// Unix milliseconds at which the current window ends
    pub reset_at_ms: i64,
}

/// Storage for fixed-window hit counters.
#[async_trait]
pub trait RateLimitStore: Send + Sync {
    /// Record one hit for `key` at `now_ms` and return the window state.
    async fn hit(&self, key: &str, window_ms: u64, now_ms: i64) -> Result<WindowState, AppError>;
}

/// In-process counters. Not shared between instances.
#[derive(Default)]
pub struct MemoryRateLimitStore {
    windows: DashMap<String, WindowState>,
}

impl MemoryRateLimitStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget windows that ended before `now_ms`.
    pub fn purge_expired(&self, now_ms: i64) {
        self.windows.retain(|_, w| w.reset_at_ms > now_ms);
    }
}

#[async_trait]
impl RateLimitStore for MemoryRateLimitStore {
    async fn hit(&self, key: &str, window_ms: u64, now_ms: i64) -> Result<WindowState, AppError> {
        let mut entry = self.windows.entry(key.to_string()).or_insert(WindowState {
            count: 0,
            reset_at_ms: now_ms + window_ms as i64,
        });

        if entry.count == 0 || now_ms >= entry.reset_at_ms {
            *entry = WindowState {
                count: 1,
                reset_at_ms: now_ms + window_ms as i64,
            };
        } else {
            entry.count = entry.count.saturating_add(1);
        }

        Ok(*entry)
    }
}

/// Redis counters shared by every instance.
///
/// `INCR` and `PEXPIRE` run atomically in a Lua script; the key's remaining
/// TTL gives the window end.
#[derive(Clone)]
pub struct RedisRateLimitStore {
    conn: ConnectionManager,
    namespace: String,
}

impl RedisRateLimitStore {
    pub fn new(conn: ConnectionManager, namespace: impl Into<String>) -> Self {
        Self {
            conn,
            namespace: namespace.into(),
        }
    }
}

#[async_trait]
impl RateLimitStore for RedisRateLimitStore {
    async fn hit(&self, key: &str, window_ms: u64, now_ms: i64) -> Result<WindowState, AppError> {
        let script = redis::Script::new(
            r#"
            local count = redis.call('INCR', KEYS[1])
            if count == 1 then
                redis.call('PEXPIRE', KEYS[1], ARGV[1])
            end
            local ttl = redis.call('PTTL', KEYS[1])
            if ttl < 0 then
                redis.call('PEXPIRE', KEYS[1], ARGV[1])
                ttl = tonumber(ARGV[1])
            end
            return {count, ttl}
            "#,
        );

        let mut conn = self.conn.clone();
        let (count, ttl_ms): (i64, i64) = script
            .key(keys::namespaced(&self.namespace, keys::RATE_LIMIT, key))
            .arg(window_ms as i64)
            .invoke_async(&mut conn)
            .await?;

        Ok(WindowState {
            count: count.clamp(0, u32::MAX as i64) as u32,
            reset_at_ms: now_ms + ttl_ms,
        })
    }
}
