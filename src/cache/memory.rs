use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::cache::{CacheError, Token, TokenCache};

/// Map-backed token cache.
///
/// Nothing is persisted and nothing is shared between processes. The TTL passed
/// to `set` is ignored; readers rely on [`Token::is_expired`].
#[derive(Debug, Clone, Default)]
pub struct InMemoryTokenCache {
    inner: Arc<RwLock<HashMap<String, Token>>>,
}

impl InMemoryTokenCache {
    pub fn new() -> Self {
        Self { inner: Arc::new(RwLock::new(HashMap::new())) }
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}

#[async_trait]
impl TokenCache for InMemoryTokenCache {
    async fn get(&self, key: &str) -> Result<Option<Token>, CacheError> {
        Ok(self.inner.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, token: &Token, _ttl: Duration) -> Result<(), CacheError> {
        let mut map = self.inner.write().await;
        map.insert(key.to_owned(), token.clone());
        Ok(())
    }
}
