//! Secret-free view of a built registration
//!
//! Used by the `saml-registration` binary to report what was loaded. Only
//! certificate fingerprints and usages appear; key material never does.

use crate::credential::{Credential, CredentialUsage};
use crate::provider_details::{MessageBinding, ProviderDetails};
use crate::registration::Registration;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CredentialSummary {
    pub fingerprint: String,
    pub usages: Vec<CredentialUsage>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssertingPartySummary {
    pub entity_id: String,
    pub wants_authn_requests_signed: bool,
    pub single_sign_on_service_location: String,
    pub single_sign_on_service_binding: MessageBinding,
    pub verification_credentials: Vec<CredentialSummary>,
    pub encryption_credentials: Vec<CredentialSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegistrationSummary {
    pub registration_id: String,
    pub entity_id: String,
    pub assertion_consumer_service_location: String,
    pub signing_credentials: Vec<CredentialSummary>,
    pub decryption_credentials: Vec<CredentialSummary>,
    pub asserting_party: AssertingPartySummary,
}

impl From<&Credential> for CredentialSummary {
    fn from(credential: &Credential) -> Self {
        Self {
            fingerprint: credential.fingerprint(),
            usages: credential.usages().collect(),
        }
    }
}

impl From<&ProviderDetails> for AssertingPartySummary {
    fn from(details: &ProviderDetails) -> Self {
        Self {
            entity_id: details.entity_id().to_string(),
            wants_authn_requests_signed: details.wants_authn_requests_signed(),
            single_sign_on_service_location: details.single_sign_on_service_location().to_string(),
            single_sign_on_service_binding: details.single_sign_on_service_binding(),
            verification_credentials: summarize(details.verification_x509_credentials()),
            encryption_credentials: summarize(details.encryption_x509_credentials()),
        }
    }
}

impl From<&Registration> for RegistrationSummary {
    fn from(registration: &Registration) -> Self {
        Self {
            registration_id: registration.registration_id().to_string(),
            entity_id: registration.entity_id().to_string(),
            assertion_consumer_service_location: registration
                .assertion_consumer_service_location()
                .to_string(),
            signing_credentials: summarize(registration.signing_x509_credentials()),
            decryption_credentials: summarize(registration.decryption_x509_credentials()),
            asserting_party: AssertingPartySummary::from(registration.provider_details()),
        }
    }
}

fn summarize(credentials: &[Credential]) -> Vec<CredentialSummary> {
    credentials.iter().map(CredentialSummary::from).collect()
}
