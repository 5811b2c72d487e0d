//! Token cache capability.
//!
//! The client only talks to [`TokenCache`]; which implementation backs it is
//! decided once, when the client is built.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::warn;

pub mod memory;
pub mod redis;
pub mod token;

pub use memory::InMemoryTokenCache;
pub use redis::RedisTokenCache;
pub use token::{Token, TokenResponse};

use crate::utils::constants::ENV_REDIS_URL;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache connection error: {0}")]
    Connection(String),
    #[error("cache serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[async_trait]
pub trait TokenCache: Send + Sync {
    /// Token stored under `key`, if the store still has it.
    async fn get(&self, key: &str) -> Result<Option<Token>, CacheError>;

    /// Store `token` under `key`. Stores that support expiry drop it after `ttl`.
    async fn set(&self, key: &str, token: &Token, ttl: Duration) -> Result<(), CacheError>;
}

static PROCESS_CACHE: OnceLock<Arc<InMemoryTokenCache>> = OnceLock::new();

/// Process-wide in-memory cache shared by every client that was given no cache.
pub fn process_cache() -> Arc<InMemoryTokenCache> {
    PROCESS_CACHE
        .get_or_init(|| Arc::new(InMemoryTokenCache::new()))
        .clone()
}

/// Pick a cache when the caller did not inject one: Redis when `REDIS_URL` is
/// set, otherwise the process-wide in-memory cache.
pub fn select_cache() -> Result<Arc<dyn TokenCache>, CacheError> {
    match std::env::var(ENV_REDIS_URL) {
        Ok(url) if !url.is_empty() => Ok(Arc::new(RedisTokenCache::new(&url)?)),
        _ => {
            warn!(
                "no token cache provided and no {} environment variable found, using in-memory cache",
                ENV_REDIS_URL
            );
            Ok(process_cache())
        }
    }
}
