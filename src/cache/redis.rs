use std::time::Duration;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Client, RedisError};
use tokio::sync::OnceCell;
use tracing::debug;

use crate::cache::{CacheError, Token, TokenCache};

/// Redis-backed token cache shared between processes.
///
/// The connection is opened on first use, so building one never blocks.
pub struct RedisTokenCache {
    client: Client,
    conn: OnceCell<MultiplexedConnection>,
}

impl RedisTokenCache {
    /// `url` is a Redis connection URL such as `redis://127.0.0.1:6379`.
    pub fn new(url: &str) -> Result<Self, CacheError> {
        let client = Client::open(url).map_err(map_redis_error)?;
        Ok(Self { client, conn: OnceCell::new() })
    }

    async fn connection(&self) -> Result<MultiplexedConnection, CacheError> {
        let conn = self
            .conn
            .get_or_try_init(|| async {
                debug!("opening token cache connection");
                self.client.get_multiplexed_async_connection().await
            })
            .await
            .map_err(map_redis_error)?;
        Ok(conn.clone())
    }
}

#[async_trait]
impl TokenCache for RedisTokenCache {
    async fn get(&self, key: &str) -> Result<Option<Token>, CacheError> {
        let mut conn = self.connection().await?;
        let payload: Option<String> = conn.get(key).await.map_err(map_redis_error)?;
        payload.as_deref().map(decode_token).transpose()
    }

    async fn set(&self, key: &str, token: &Token, ttl: Duration) -> Result<(), CacheError> {
        let Some(seconds) = expiry_seconds(ttl) else {
            debug!("token for '{}' expires within the cache buffer, not storing it", key);
            return Ok(());
        };
        let payload = encode_token(token)?;
        let mut conn = self.connection().await?;
        conn.set_ex::<_, _, ()>(key, payload, seconds)
            .await
            .map_err(map_redis_error)?;
        Ok(())
    }
}

// `SET` without `EX` never expires, so a zero TTL means nothing is written.
fn expiry_seconds(ttl: Duration) -> Option<u64> {
    Some(ttl.as_secs()).filter(|&seconds| seconds > 0)
}

fn encode_token(token: &Token) -> Result<String, CacheError> {
    Ok(serde_json::to_string(token)?)
}

fn decode_token(payload: &str) -> Result<Token, CacheError> {
    Ok(serde_json::from_str(payload)?)
}

fn map_redis_error(err: RedisError) -> CacheError {
    CacheError::Connection(err.to_string())
}
