// tests/common/mod.rs
pub use serde_json::json;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use httpmock::Method::POST;
use httpmock::{Mock, MockServer};

use crate::cache::TokenCache;
use crate::client::M2MClient;
use crate::utils::constants::{ENV_CLIENT_ID, ENV_CLIENT_SECRET, ENV_TOKEN_ENDPOINT};

pub const TOKEN_PATH: &str = "/oauth/token";
pub const ACCESS_TOKEN: &str = "test_access_token";

static SEQ: AtomicUsize = AtomicUsize::new(0);

/// Audience no other test uses, so the process-wide cache never leaks between tests.
pub fn unique_audience(prefix: &str) -> String {
    format!("https://{}-{}.test.com", prefix, SEQ.fetch_add(1, Ordering::SeqCst))
}

/// Token endpoint answering with `expires_in` seconds of validity.
pub async fn mock_token_endpoint<'a>(server: &'a MockServer, expires_in: i64) -> Mock<'a> {
    server
        .mock_async(|when, then| {
            when.method(POST).path(TOKEN_PATH);
            then.status(200)
                .header("Content-Type", "application/json")
                .json_body(json!({
                    "access_token": ACCESS_TOKEN,
                    "expires_in": expires_in,
                    "token_type": "Bearer"
                }));
        })
        .await
}

/// Client with explicit credentials against `server`, using `cache`.
pub fn build_client(server: &MockServer, audience: &str, cache: Arc<dyn TokenCache>) -> M2MClient {
    M2MClient::builder()
        .client_id("test_client")
        .client_secret("test_secret")
        .audience(audience)
        .auth_base_url(server.url(TOKEN_PATH))
        .base_url(server.base_url())
        .cache(cache)
        .build()
        .expect("client")
}

/// Point `service` and the shared credentials at `server` through the environment.
/// Callers must be `#[serial]`.
pub fn set_service_env(service: &str, server: &MockServer) -> String {
    let audience = unique_audience(&service.to_lowercase());
    std::env::set_var(ENV_CLIENT_ID, "test_client");
    std::env::set_var(ENV_CLIENT_SECRET, "test_secret");
    std::env::set_var(ENV_TOKEN_ENDPOINT, server.url(TOKEN_PATH));
    std::env::set_var(format!("{}_AUDIENCE", service.to_uppercase()), &audience);
    std::env::set_var(format!("{}_URL", service.to_uppercase()), server.base_url());
    audience
}
