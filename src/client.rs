//! Machine-to-machine client.
//!
//! Resolves client-credentials tokens through three tiers (memory, shared cache,
//! token endpoint) and sends bearer-authorized requests to one service.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::cache::{self, Token, TokenCache, TokenResponse};
use crate::config::{CredentialOverrides, Credentials};
use crate::error::{M2mError, Result};
use crate::helpers::time::{cache_ttl_seconds, get_instant, get_token_cache_buffer_seconds};
use crate::observability::metrics::{get_metrics, status_class, TIER_CACHE, TIER_ENDPOINT, TIER_MEMORY};
use crate::utils::constants::{DEFAULT_HTTP_TIMEOUT_SECS, GRANT_TYPE_CLIENT_CREDENTIALS};

/// Authenticated client for a single service.
///
/// Clones share the held token, the cache and the closed state.
#[derive(Clone)]
pub struct M2MClient {
    inner: Arc<Inner>,
}

struct Inner {
    service: Option<String>,
    credentials: Credentials,
    http: Client,
    cache: Arc<dyn TokenCache>,
    token_cache_buffer: u64,
    token: RwLock<Option<Token>>,
    closed: AtomicBool,
}

impl std::fmt::Debug for M2MClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("M2MClient")
            .field("service", &self.inner.service)
            .field("credentials", &self.inner.credentials)
            .field("token_cache_buffer", &self.inner.token_cache_buffer)
            .field("closed", &self.is_closed())
            .finish()
    }
}

#[derive(Default)]
pub struct M2MClientBuilder {
    service: Option<String>,
    overrides: CredentialOverrides,
    cache: Option<Arc<dyn TokenCache>>,
    token_cache_buffer: Option<u64>,
    timeout: Option<Duration>,
}

impl M2MClientBuilder {
    pub fn service(mut self, service: impl Into<String>) -> Self {
        self.service = Some(service.into());
        self
    }

    pub fn client_id(mut self, client_id: impl Into<String>) -> Self {
        self.overrides.client_id = Some(client_id.into());
        self
    }

    pub fn client_secret(mut self, client_secret: impl Into<String>) -> Self {
        self.overrides.client_secret = Some(client_secret.into());
        self
    }

    pub fn audience(mut self, audience: impl Into<String>) -> Self {
        self.overrides.audience = Some(audience.into());
        self
    }

    pub fn auth_base_url(mut self, auth_base_url: impl Into<String>) -> Self {
        self.overrides.auth_base_url = Some(auth_base_url.into());
        self
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.overrides.base_url = Some(base_url.into());
        self
    }

    pub fn cache(mut self, cache: Arc<dyn TokenCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Seconds taken off a token's lifetime before it is written to the cache.
    pub fn token_cache_buffer(mut self, seconds: u64) -> Self {
        self.token_cache_buffer = Some(seconds);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn build(self) -> Result<M2MClient> {
        let credentials = Credentials::resolve(self.service.as_deref(), self.overrides)?;
        let cache = match self.cache {
            Some(cache) => cache,
            None => cache::select_cache()
                .map_err(|e| M2mError::Configuration(format!("token cache: {}", e)))?,
        };
        let http = Client::builder()
            .timeout(self.timeout.unwrap_or(Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS)))
            .build()?;

        Ok(M2MClient {
            inner: Arc::new(Inner {
                service: self.service.map(|s| s.to_uppercase()),
                credentials,
                http,
                cache,
                token_cache_buffer: get_token_cache_buffer_seconds(self.token_cache_buffer),
                token: RwLock::new(None),
                closed: AtomicBool::new(false),
            }),
        })
    }
}

impl M2MClient {
    pub fn builder() -> M2MClientBuilder {
        M2MClientBuilder::default()
    }

    /// Client for `service` with every credential taken from the environment.
    pub fn for_service(service: &str) -> Result<Self> {
        Self::builder().service(service).build()
    }

    pub fn service(&self) -> Option<&str> {
        self.inner.service.as_deref()
    }

    pub fn credentials(&self) -> &Credentials {
        &self.inner.credentials
    }

    pub fn token_cache_buffer(&self) -> u64 {
        self.inner.token_cache_buffer
    }

    pub fn cache_key(&self) -> String {
        self.inner.credentials.cache_key()
    }

    /// Cache consulted on a memory miss.
    pub fn cache(&self) -> &Arc<dyn TokenCache> {
        &self.inner.cache
    }

    /// Token currently held in memory, expired or not. `None` once closed.
    pub async fn token(&self) -> Option<Token> {
        if self.is_closed() {
            self.release_token().await;
            return None;
        }
        self.inner.token.read().await.clone()
    }

    /// Put a token in memory, replacing whatever was held.
    pub async fn set_token(&self, token: Token) {
        *self.inner.token.write().await = Some(token);
    }

    /// Release the client. Further requests fail.
    ///
    /// The held token is dropped here unless the lock is busy, in which case it is
    /// dropped by the next `token`, `fetch_token` or `send` call.
    pub fn close(&self) {
        if !self.inner.closed.swap(true, Ordering::SeqCst) {
            debug!("closing client for '{}'", self.name());
            if let Ok(mut token) = self.inner.token.try_write() {
                *token = None;
            }
        }
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    /// Resolve a valid token: memory, then shared cache, then token endpoint.
    ///
    /// Concurrent callers on the same client may each reach the endpoint and each
    /// write the cache; the last write wins.
    pub async fn fetch_token(&self) -> Result<Token> {
        self.ensure_open().await?;
        let metrics = get_metrics().await;
        let start = get_instant();

        if let Some(token) = self.inner.token.read().await.as_ref().filter(|t| !t.is_expired()) {
            info!("Using m2m token from memory");
            metrics.token_resolutions.with_label_values(&[TIER_MEMORY]).inc();
            return Ok(token.clone());
        }

        info!("No m2m token found in memory. Fetching token from cache");
        let key = self.cache_key();
        match self.inner.cache.get(&key).await {
            Ok(Some(token)) if !token.is_expired() => {
                info!("Retrieved token from the cache");
                self.set_token(token.clone()).await;
                metrics.token_resolutions.with_label_values(&[TIER_CACHE]).inc();
                metrics.token_fetch_duration.with_label_values(&[TIER_CACHE]).observe(start.elapsed().as_secs_f64());
                return Ok(token);
            }
            Ok(_) => {}
            Err(err) => warn!("token cache lookup for '{}' failed: {}", self.name(), err),
        }

        info!("No m2m token found in cache. Fetching token from token endpoint");
        let token = self.request_token().await.inspect_err(|_| {
            metrics.token_endpoint_failures.inc();
        })?;

        info!("Saving m2m token to cache");
        let ttl = cache_ttl_seconds(token.expires_in, self.inner.token_cache_buffer);
        if let Err(err) = self.inner.cache.set(&key, &token, Duration::from_secs(ttl)).await {
            warn!("saving token for '{}' to cache failed: {}", self.name(), err);
        }
        self.set_token(token.clone()).await;

        metrics.token_resolutions.with_label_values(&[TIER_ENDPOINT]).inc();
        metrics.token_fetch_duration.with_label_values(&[TIER_ENDPOINT]).observe(start.elapsed().as_secs_f64());
        Ok(token)
    }

    async fn request_token(&self) -> Result<Token> {
        let creds = &self.inner.credentials;
        let form = [
            ("grant_type", GRANT_TYPE_CLIENT_CREDENTIALS),
            ("client_id", creds.client_id.as_str()),
            ("client_secret", creds.client_secret.as_str()),
            ("audience", creds.audience.as_str()),
        ];
        let response = self.inner.http.post(&creds.auth_base_url).form(&form).send().await?;
        let response = raise_on_4xx_5xx(response).await?;
        let body = response.text().await?;
        let token: TokenResponse = serde_json::from_str(&body)?;
        Ok(token.into())
    }

    /// Bearer-authorized request against `base_url/path`.
    pub async fn request(&self, method: Method, path: &str) -> Result<RequestBuilder> {
        let token = self.fetch_token().await?;
        let url = join_url(&self.inner.credentials.base_url, path);
        debug!("{} {}", method, url);
        Ok(self.inner.http.request(method, url).bearer_auth(token.access_token))
    }

    /// Send a request built by [`M2MClient::request`]; 4xx/5xx become errors.
    pub async fn send(&self, request: RequestBuilder) -> Result<Response> {
        self.ensure_open().await?;
        let response = request.send().await?;
        get_metrics()
            .await
            .service_responses
            .with_label_values(&[status_class(response.status().as_u16()).as_str()])
            .inc();
        raise_on_4xx_5xx(response).await
    }

    pub async fn get_json<T, Q>(&self, path: &str, query: &Q) -> Result<T>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        let request = self.request(Method::GET, path).await?.query(query);
        decode_json(self.send(request).await?).await
    }

    pub async fn post_json<T, B>(&self, path: &str, body: &B) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let request = self.request(Method::POST, path).await?.json(body);
        decode_json(self.send(request).await?).await
    }

    async fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            self.release_token().await;
            return Err(M2mError::Closed(self.name()));
        }
        Ok(())
    }

    async fn release_token(&self) {
        self.inner.token.write().await.take();
    }

    fn name(&self) -> String {
        self.inner
            .service
            .clone()
            .unwrap_or_else(|| self.inner.credentials.audience.clone())
    }
}

/// Turn a 4xx/5xx response into [`M2mError::HttpStatus`].
pub async fn raise_on_4xx_5xx(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_client_error() || status.is_server_error() {
        let url = response.url().to_string();
        let body = response.text().await.unwrap_or_default();
        warn!("request to {} failed with {}", url, status);
        return Err(M2mError::HttpStatus { status, url, body });
    }
    Ok(response)
}

async fn decode_json<T: DeserializeOwned>(response: Response) -> Result<T> {
    let body = response.text().await?;
    Ok(serde_json::from_str(&body)?)
}

fn join_url(base_url: &str, path: &str) -> String {
    if path.is_empty() {
        return base_url.to_owned();
    }
    format!("{}/{}", base_url.trim_end_matches('/'), path.trim_start_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::InMemoryTokenCache;

    fn client() -> M2MClient {
        M2MClient::builder()
            .client_id("id")
            .client_secret("secret")
            .audience("aud")
            .auth_base_url("http://127.0.0.1:1/oauth/token")
            .base_url("http://127.0.0.1:1")
            .cache(Arc::new(InMemoryTokenCache::new()))
            .build()
            .unwrap()
    }

    #[test]
    fn urls_are_joined_with_a_single_slash() {
        assert_eq!(join_url("https://svc.test.com", "claims"), "https://svc.test.com/claims");
        assert_eq!(join_url("https://svc.test.com/", "/claims"), "https://svc.test.com/claims");
        assert_eq!(join_url("https://svc.test.com/v1", "signed_url/"), "https://svc.test.com/v1/signed_url/");
        assert_eq!(join_url("https://svc.test.com", ""), "https://svc.test.com");
    }

    #[test]
    fn missing_configuration_is_reported() {
        let err = M2MClient::builder().client_id("id").build().unwrap_err();
        assert!(matches!(err, M2mError::Configuration(_)));
    }

    #[test]
    fn buffer_defaults_to_sixty_seconds() {
        assert_eq!(client().token_cache_buffer(), 60);
        assert_eq!(client().cache_key(), "idaud");
    }

    #[tokio::test]
    async fn closed_client_refuses_to_fetch() {
        let client = client();
        client.set_token(Token::new("held", 3600)).await;
        client.clone().close();

        assert!(client.is_closed());
        assert!(client.token().await.is_none());
        assert!(matches!(client.fetch_token().await, Err(M2mError::Closed(_))));
    }

    #[tokio::test]
    async fn token_held_under_a_busy_lock_is_released_after_close() {
        let client = client();
        client.set_token(Token::new("held", 3600)).await;

        let reader = client.inner.token.read().await;
        client.close();
        drop(reader);
        assert!(client.inner.token.read().await.is_some());

        assert!(matches!(client.fetch_token().await, Err(M2mError::Closed(_))));
        assert!(client.inner.token.read().await.is_none());
    }

    #[tokio::test]
    async fn closed_client_reports_no_token_even_when_close_could_not_clear_it() {
        let client = client();
        client.set_token(Token::new("held", 3600)).await;

        let reader = client.inner.token.read().await;
        client.close();
        drop(reader);

        assert!(client.token().await.is_none());
        assert!(client.inner.token.read().await.is_none());
    }
}
