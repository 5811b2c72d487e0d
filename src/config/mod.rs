pub mod credentials;
pub mod settings;

pub use credentials::{CredentialOverrides, Credentials};
