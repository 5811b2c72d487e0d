use crate::client::M2MClient;
use crate::error::Result;
use crate::inject::with_client;
use crate::pagination::PageParams;
use crate::services::schema::{PageOfClaims, PageOfOrganisations};
use crate::services::Service;

pub async fn get_organisations(client: Option<&M2MClient>, params: PageParams) -> Result<PageOfOrganisations> {
    with_client(Service::Authinator.as_str(), client, |client| async move {
        client.get_json("organisations", &params).await
    })
    .await
}

pub async fn get_claims(client: Option<&M2MClient>, params: PageParams) -> Result<PageOfClaims> {
    with_client(Service::Authinator.as_str(), client, |client| async move {
        client.get_json("claims", &params).await
    })
    .await
}
