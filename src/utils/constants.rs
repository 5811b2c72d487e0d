//! Shared constants and invariants

pub const DEFAULT_TOKEN_CACHE_BUFFER_SECS: u64 = 60;
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

pub const GRANT_TYPE_CLIENT_CREDENTIALS: &str = "client_credentials";
pub const DEFAULT_TOKEN_TYPE: &str = "Bearer";

// Environment
pub const ENV_CLIENT_ID: &str = "AUTH0_CLIENT_ID";
pub const ENV_CLIENT_SECRET: &str = "AUTH0_CLIENT_SECRET";
pub const ENV_TOKEN_ENDPOINT: &str = "TOKEN_ENDPOINT";
pub const ENV_REDIS_URL: &str = "REDIS_URL";
pub const ENV_SERVICE_URL_SUFFIX: &str = "_URL";
pub const ENV_SERVICE_AUDIENCE_SUFFIX: &str = "_AUDIENCE";
