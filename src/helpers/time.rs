use chrono::Utc;
use tokio::time::Instant;

use crate::utils::constants::DEFAULT_TOKEN_CACHE_BUFFER_SECS;

pub fn get_token_cache_buffer_seconds(token_cache_buffer: Option<u64>) -> u64 {
    token_cache_buffer.unwrap_or(DEFAULT_TOKEN_CACHE_BUFFER_SECS)
}

/// Seconds a freshly fetched token may live in the shared cache.
///
/// The buffer is subtracted from `expires_in`; when that would go negative the
/// unmodified `expires_in` is used instead.
pub fn cache_ttl_seconds(expires_in: i64, token_cache_buffer: u64) -> u64 {
    let buffer = i64::try_from(token_cache_buffer).unwrap_or(i64::MAX);
    let mut ttl = expires_in.saturating_sub(buffer);
    if ttl < 0 {
        ttl = expires_in;
    }
    ttl.max(0) as u64
}

pub fn now_i64() -> i64 {
    Utc::now().timestamp()
}

pub fn get_instant() -> Instant {
    Instant::now()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ttl_subtracts_buffer() {
        assert_eq!(cache_ttl_seconds(86400, 60), 86340);
        assert_eq!(cache_ttl_seconds(60, 60), 0);
    }

    #[test]
    fn ttl_never_goes_negative() {
        assert_eq!(cache_ttl_seconds(30, 60), 30);
        assert_eq!(cache_ttl_seconds(-5, 0), 0);
    }

    #[test]
    fn huge_buffer_falls_back_to_expires_in() {
        assert_eq!(cache_ttl_seconds(30, u64::MAX), 30);
        assert_eq!(cache_ttl_seconds(i64::MIN, u64::MAX), 0);
    }

    #[test]
    fn buffer_defaults_to_a_minute() {
        assert_eq!(get_token_cache_buffer_seconds(None), 60);
        assert_eq!(get_token_cache_buffer_seconds(Some(5)), 5);
    }
}
