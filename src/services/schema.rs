use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::pagination::PaginatedResponse;

pub const DEFAULT_ORGANISATION: &str = "atheon";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileType {
    pub feed_identifier: String,
    pub feed_version: i64,
    pub json_schema: String,
    pub active: bool,
    pub storage_backend: String,
    pub flow_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organisation {
    pub id: i64,
    pub host_name: String,
    pub verbose_name: String,
}

pub type PageOfOrganisations = PaginatedResponse<Organisation>;
pub type PageOfClaims = PaginatedResponse<Value>;

/// Pre-signed upload target. `fields` are posted alongside the file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedUrl {
    pub fields: HashMap<String, String>,
    pub file_path: String,
    pub signed_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    pub feed_identifier: String,
    pub feed_version: i64,
    pub file_location: String,
    pub catalogued_time: DateTime<Utc>,
    pub posted_by: String,
    pub organisation: String,
    #[serde(deserialize_with = "file_meta_from_object_or_string")]
    pub file_meta: Value,
}

/// Body of a new file record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewFileRecord {
    pub feed_identifier: String,
    pub feed_version: i64,
    pub file_location: String,
    pub organisation: String,
    pub file_meta: Value,
}

impl NewFileRecord {
    pub fn new(
        feed_identifier: impl Into<String>,
        feed_version: i64,
        file_location: impl Into<String>,
        file_meta: Value,
    ) -> Self {
        Self {
            feed_identifier: feed_identifier.into(),
            feed_version,
            file_location: file_location.into(),
            organisation: DEFAULT_ORGANISATION.to_owned(),
            file_meta,
        }
    }

    pub fn with_organisation(mut self, organisation: impl Into<String>) -> Self {
        self.organisation = organisation.into();
        self
    }
}

// The catalogue sometimes returns file_meta as a single-quoted dict string.
fn file_meta_from_object_or_string<'de, D>(deserializer: D) -> Result<Value, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(raw) => {
            serde_json::from_str(&raw.replace('\'', "\"")).map_err(serde::de::Error::custom)
        }
        other => Ok(other),
    }
}
