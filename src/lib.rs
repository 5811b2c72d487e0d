//! # M2M Client Library
//!
//! Obtains and caches OAuth2 client-credentials tokens, attaches them to
//! outbound calls against backend services, and drains paginated endpoints.
//!
//! Modules:
//! - `cache` — token cache capability (in-memory, Redis)
//! - `client` — the token-resolving M2M client
//! - `inject` — supplies a ready client to service calls
//! - `pagination` — paginator and fetch-all helpers
//! - `services` — typed calls to the backend services

pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod helpers;
pub mod inject;
pub mod observability;
pub mod pagination;
pub mod services;
pub mod utils;

#[cfg(test)]
mod tests;


pub use crate::cache::{InMemoryTokenCache, RedisTokenCache, Token, TokenCache};
pub use crate::client::{M2MClient, M2MClientBuilder};
pub use crate::error::{M2mError, Result};
pub use crate::inject::{get_client, get_or_create_client, with_client, ClientGuard};
pub use crate::pagination::{fetch_all, PageParams, PaginatedResponse, Paginator};
