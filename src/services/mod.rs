//! Backend services reachable with an M2M token.

pub mod authinator;
pub mod data_catalogue;
pub mod schema;

/// Service names; the upper-cased form prefixes the `{SERVICE}_URL` and
/// `{SERVICE}_AUDIENCE` environment variables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Service {
    Authinator,
    DataCatalogue,
}

impl Service {
    pub fn as_str(&self) -> &'static str {
        match self {
            Service::Authinator => "AUTHINATOR",
            Service::DataCatalogue => "DATA_CATALOGUE",
        }
    }
}

impl AsRef<str> for Service {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl std::fmt::Display for Service {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
