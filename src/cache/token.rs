use serde::{Deserialize, Serialize};

use crate::helpers::time::now_i64;
use crate::utils::constants::DEFAULT_TOKEN_TYPE;

/// Access token held by a client and, serialized, by the token cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub expires_at: i64, // UNIX TIMESTAMP
}

impl Token {
    pub fn new(access_token: impl Into<String>, expires_in: i64) -> Self {
        Self {
            access_token: access_token.into(),
            token_type: DEFAULT_TOKEN_TYPE.to_owned(),
            expires_in,
            expires_at: now_i64() + expires_in,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.expires_at <= now_i64()
    }
}

/// Body returned by the token endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    pub expires_in: i64,
    /// Some providers send it as a float timestamp.
    #[serde(default)]
    pub expires_at: Option<f64>,
}

impl From<TokenResponse> for Token {
    fn from(response: TokenResponse) -> Self {
        let expires_at = response
            .expires_at
            .map(|ts| ts as i64)
            .unwrap_or_else(|| now_i64() + response.expires_in);
        Self {
            access_token: response.access_token,
            token_type: response.token_type,
            expires_in: response.expires_in,
            expires_at,
        }
    }
}

fn default_token_type() -> String {
    DEFAULT_TOKEN_TYPE.to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn expiry_is_inclusive() {
        let mut token = Token::new("abc", 3600);
        assert!(!token.is_expired());

        token.expires_at = now_i64();
        assert!(token.is_expired());
    }

    #[test]
    fn response_without_expires_at_is_computed_from_expires_in() {
        let response: TokenResponse =
            serde_json::from_value(json!({"access_token": "abc", "expires_in": 120})).unwrap();
        let before = now_i64();
        let token = Token::from(response);

        assert_eq!(token.token_type, "Bearer");
        assert!(token.expires_at >= before + 120);
        assert!(token.expires_at <= now_i64() + 120);
    }

    #[test]
    fn response_with_float_expires_at_is_kept() {
        let response: TokenResponse = serde_json::from_value(json!({
            "access_token": "abc",
            "token_type": "Bearer",
            "expires_in": 86400,
            "expires_at": 1_900_000_000.75
        }))
        .unwrap();

        assert_eq!(Token::from(response).expires_at, 1_900_000_000);
    }
}
