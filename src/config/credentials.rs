use std::env;

use crate::error::{M2mError, Result};
use crate::utils::constants::{
    ENV_CLIENT_ID, ENV_CLIENT_SECRET, ENV_SERVICE_AUDIENCE_SUFFIX, ENV_SERVICE_URL_SUFFIX,
    ENV_TOKEN_ENDPOINT,
};

/// Identity and endpoints a client authenticates with. Fixed for the client's lifetime.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
    pub audience: String,
    pub auth_base_url: String,
    pub base_url: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"***")
            .field("audience", &self.audience)
            .field("auth_base_url", &self.auth_base_url)
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// Explicitly supplied credential values. Anything left `None` falls back to the
/// environment of the named service.
#[derive(Debug, Clone, Default)]
pub struct CredentialOverrides {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub audience: Option<String>,
    pub auth_base_url: Option<String>,
    pub base_url: Option<String>,
}

impl CredentialOverrides {
    fn is_complete(&self) -> bool {
        [
            &self.client_id,
            &self.client_secret,
            &self.audience,
            &self.auth_base_url,
            &self.base_url,
        ]
        .iter()
        .all(|value| value.as_deref().is_some_and(|v| !v.is_empty()))
    }
}

impl Credentials {
    /// Resolve credentials for `service` (upper-cased for the environment lookups).
    ///
    /// Without a service name every override must be present.
    pub fn resolve(service: Option<&str>, overrides: CredentialOverrides) -> Result<Self> {
        let service = match service.filter(|s| !s.is_empty()) {
            Some(service) => service.to_uppercase(),
            None if overrides.is_complete() => String::new(),
            None => {
                return Err(M2mError::Configuration(
                    "if service is not provided, all of client_id, client_secret, auth_base_url, audience and base_url must be provided".to_owned(),
                ))
            }
        };

        Ok(Self {
            client_id: explicit_or_env(overrides.client_id, ENV_CLIENT_ID)?,
            client_secret: explicit_or_env(overrides.client_secret, ENV_CLIENT_SECRET)?,
            auth_base_url: explicit_or_env(overrides.auth_base_url, ENV_TOKEN_ENDPOINT)?,
            audience: explicit_or_env(
                overrides.audience,
                &format!("{}{}", service, ENV_SERVICE_AUDIENCE_SUFFIX),
            )?,
            base_url: explicit_or_env(
                overrides.base_url,
                &format!("{}{}", service, ENV_SERVICE_URL_SUFFIX),
            )?,
        })
    }

    /// Key the token is cached under: `client_id` immediately followed by `audience`.
    pub fn cache_key(&self) -> String {
        format!("{}{}", self.client_id, self.audience)
    }
}

fn explicit_or_env(explicit: Option<String>, var: &str) -> Result<String> {
    if let Some(value) = explicit.filter(|v| !v.is_empty()) {
        return Ok(value);
    }
    env::var(var)
        .ok()
        .filter(|v| !v.is_empty())
        .ok_or_else(|| M2mError::Configuration(format!("environment variable {} is not set", var)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn full_overrides() -> CredentialOverrides {
        CredentialOverrides {
            client_id: Some("id".into()),
            client_secret: Some("secret".into()),
            audience: Some("https://api.example.com".into()),
            auth_base_url: Some("https://auth.example.com/oauth/token".into()),
            base_url: Some("https://api.example.com".into()),
        }
    }

    #[test]
    fn explicit_credentials_need_no_service() {
        let creds = Credentials::resolve(None, full_overrides()).unwrap();
        assert_eq!(creds.cache_key(), "idhttps://api.example.com");
    }

    #[test]
    fn partial_credentials_without_service_fail() {
        let mut overrides = full_overrides();
        overrides.base_url = None;
        let err = Credentials::resolve(None, overrides).unwrap_err();
        assert!(matches!(err, M2mError::Configuration(_)));
    }

    #[test]
    #[serial]
    fn service_name_is_upper_cased_for_env_lookup() {
        std::env::set_var(ENV_CLIENT_ID, "env-id");
        std::env::set_var(ENV_CLIENT_SECRET, "env-secret");
        std::env::set_var(ENV_TOKEN_ENDPOINT, "https://auth.example.com/oauth/token");
        std::env::set_var("BILLING_AUDIENCE", "https://billing.example.com");
        std::env::set_var("BILLING_URL", "https://billing.example.com/api");

        let overrides = CredentialOverrides { client_id: Some("explicit-id".into()), ..Default::default() };
        let creds = Credentials::resolve(Some("billing"), overrides).unwrap();

        assert_eq!(creds.client_id, "explicit-id");
        assert_eq!(creds.client_secret, "env-secret");
        assert_eq!(creds.audience, "https://billing.example.com");
        assert_eq!(creds.base_url, "https://billing.example.com/api");

        std::env::remove_var("BILLING_AUDIENCE");
        std::env::remove_var("BILLING_URL");
    }

    #[test]
    #[serial]
    fn missing_env_fallback_names_the_variable() {
        std::env::set_var(ENV_CLIENT_ID, "env-id");
        std::env::set_var(ENV_CLIENT_SECRET, "env-secret");
        std::env::set_var(ENV_TOKEN_ENDPOINT, "https://auth.example.com/oauth/token");
        std::env::remove_var("NOWHERE_AUDIENCE");

        let err = Credentials::resolve(Some("nowhere"), CredentialOverrides::default()).unwrap_err();
        assert!(err.to_string().contains("NOWHERE_AUDIENCE"));
    }

    #[test]
    fn debug_hides_the_secret() {
        let creds = Credentials::resolve(None, full_overrides()).unwrap();
        assert!(!format!("{:?}", creds).contains("secret\""));
    }
}
