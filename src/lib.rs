#![warn(clippy::pedantic)]
#![warn(clippy::cargo)]
#![deny(warnings)]
#![allow(clippy::multiple_crate_versions)]

//! SAML 2.0 relying party registrations.
//!
//! A [`Registration`] pairs one relying party (service provider) with one
//! asserting party ([`ProviderDetails`]) and partitions their X.509
//! [`Credential`]s by usage. Registrations are assembled with builders and
//! validated once, at `build()` time; the result is immutable.

/// Version of the saml-registration crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod credential;
pub mod error;
pub mod provider_details;
pub mod registration;
pub mod settings;
pub mod summary;
pub mod utils;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

/// Re-export commonly used items
pub use credential::{
    filter_credentials, CategorizedCredentials, Credential, CredentialSet, CredentialUsage,
};
pub use error::{ConfigurationError, ConfigurationResult};
pub use provider_details::{MessageBinding, ProviderDetails, ProviderDetailsBuilder};
pub use registration::{Registration, RegistrationBuilder, DEFAULT_ENTITY_ID_TEMPLATE};
pub use settings::{RegistrationSettings, SettingsError};
pub use summary::RegistrationSummary;
