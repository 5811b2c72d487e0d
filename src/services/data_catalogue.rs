use reqwest::multipart::{Form, Part};
use serde_json::{json, Value};
use tracing::info;

use crate::client::{raise_on_4xx_5xx, M2MClient};
use crate::error::Result;
use crate::inject::with_client;
use crate::services::schema::{FileRecord, FileType, NewFileRecord, SignedUrl};
use crate::services::Service;

pub async fn get_file_type(
    client: Option<&M2MClient>,
    feed_identifier: &str,
    feed_version: i64,
) -> Result<FileType> {
    with_client(Service::DataCatalogue.as_str(), client, |client| async move {
        client
            .get_json(
                "file_types",
                &[("feed_identifier", feed_identifier.to_owned()), ("feed_version", feed_version.to_string())],
            )
            .await
    })
    .await
}

pub async fn get_signed_url(
    client: Option<&M2MClient>,
    feed_identifier: &str,
    feed_version: i64,
) -> Result<SignedUrl> {
    with_client(Service::DataCatalogue.as_str(), client, |client| async move {
        client
            .post_json(
                "signed_url/",
                &json!({"feed_identifier": feed_identifier, "feed_version": feed_version}),
            )
            .await
    })
    .await
}

pub async fn post_file_record(client: Option<&M2MClient>, record: &NewFileRecord) -> Result<FileRecord> {
    with_client(Service::DataCatalogue.as_str(), client, |client| async move {
        client.post_json("records", record).await
    })
    .await
}

/// Upload `file` to a signed URL, then catalogue it, all with one client.
pub async fn upload_and_catalogue_file(
    client: Option<&M2MClient>,
    file: Vec<u8>,
    feed_identifier: &str,
    feed_version: i64,
    file_meta: Value,
) -> Result<FileRecord> {
    with_client(Service::DataCatalogue.as_str(), client, |client| async move {
        let signed_url = get_signed_url(Some(&client), feed_identifier, feed_version).await?;
        upload_using_signed_url(file, &signed_url).await?;
        let record = NewFileRecord::new(feed_identifier, feed_version, signed_url.file_path.clone(), file_meta);
        post_file_record(Some(&client), &record).await
    })
    .await
}

/// Multipart POST of `file` to the signed URL. No bearer token is sent.
pub async fn upload_using_signed_url(file: Vec<u8>, signed_url: &SignedUrl) -> Result<()> {
    let file_name = signed_url.fields.get("key").cloned().unwrap_or_default();
    let mut form = Form::new();
    for (name, value) in &signed_url.fields {
        form = form.text(name.clone(), value.clone());
    }
    form = form.part("file", Part::bytes(file).file_name(file_name));

    let response = reqwest::Client::new()
        .post(&signed_url.signed_url)
        .multipart(form)
        .send()
        .await?;
    raise_on_4xx_5xx(response).await?;
    info!("File uploaded successfully to {}", signed_url.file_path);
    Ok(())
}
