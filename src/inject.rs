//! Hands an authenticated client to service calls.
//!
//! A caller-supplied client is used as-is and left open. Otherwise a client is
//! created for the service, its token fetched up front, and it is closed again on
//! every exit path.

use std::future::Future;
use std::ops::Deref;

use tracing::debug;

use crate::client::M2MClient;
use crate::error::Result;

/// Return the supplied client, or create one for `service`.
///
/// The flag is `true` when the client came from the caller. `None` counts as not
/// supplied.
pub fn get_or_create_client(service: &str, client: Option<&M2MClient>) -> Result<(M2MClient, bool)> {
    match client {
        Some(client) => Ok((client.clone(), true)),
        None => Ok((M2MClient::for_service(service)?, false)),
    }
}

/// Client lease that closes the client on drop when it owns it.
#[derive(Debug)]
pub struct ClientGuard {
    client: M2MClient,
    owned: bool,
}

impl ClientGuard {
    pub fn owned(client: M2MClient) -> Self {
        Self { client, owned: true }
    }

    pub fn adopted(client: M2MClient) -> Self {
        Self { client, owned: false }
    }

    pub fn is_owned(&self) -> bool {
        self.owned
    }

    pub fn client(&self) -> &M2MClient {
        &self.client
    }
}

impl Deref for ClientGuard {
    type Target = M2MClient;

    fn deref(&self) -> &Self::Target {
        &self.client
    }
}

impl Drop for ClientGuard {
    fn drop(&mut self) {
        if self.owned {
            self.client.close();
        }
    }
}

/// Create a client for `service` with its token already fetched.
///
/// The client is closed when the returned guard is dropped.
pub async fn get_client(service: &str) -> Result<ClientGuard> {
    let guard = ClientGuard::owned(M2MClient::for_service(service)?);
    guard.fetch_token().await?;
    Ok(guard)
}

/// Run `f` with a ready client for `service`.
pub async fn with_client<F, Fut, T>(service: &str, client: Option<&M2MClient>, f: F) -> Result<T>
where
    F: FnOnce(M2MClient) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let (client, supplied) = get_or_create_client(service, client)?;
    let guard = if supplied {
        ClientGuard::adopted(client)
    } else {
        debug!("injecting new client for '{}'", service);
        let guard = ClientGuard::owned(client);
        guard.fetch_token().await?;
        guard
    };

    f(guard.client().clone()).await
}
