//! Test fixtures providing pre-built credentials and registrations

use crate::credential::Credential;
use crate::provider_details::{ProviderDetails, ProviderDetailsBuilder};
use crate::registration::{Registration, RegistrationBuilder};

use super::constants::{
    TEST_ACS_LOCATION, TEST_DECRYPTION_KEY, TEST_IDP_CERTIFICATE, TEST_IDP_ENTITY_ID,
    TEST_IDP_SSO_LOCATION, TEST_REGISTRATION_ID, TEST_SIGNING_KEY, TEST_SP_CERTIFICATE,
};

/// Central fixture provider for all test data
pub struct TestFixtures;

impl TestFixtures {
    /// Relying party `SIGNING` credential
    #[must_use]
    pub fn signing_credential() -> Credential {
        Credential::signing(TEST_SIGNING_KEY, TEST_SP_CERTIFICATE)
            .expect("fixture signing credential is valid")
    }

    /// Relying party `DECRYPTION` credential
    #[must_use]
    pub fn decryption_credential() -> Credential {
        Credential::decryption(TEST_DECRYPTION_KEY, TEST_SP_CERTIFICATE)
            .expect("fixture decryption credential is valid")
    }

    /// Asserting party `VERIFICATION` credential
    #[must_use]
    pub fn verification_credential() -> Credential {
        Credential::verification(TEST_IDP_CERTIFICATE)
            .expect("fixture verification credential is valid")
    }

    /// Asserting party `ENCRYPTION` credential
    #[must_use]
    pub fn encryption_credential() -> Credential {
        Credential::encryption(TEST_IDP_CERTIFICATE)
            .expect("fixture encryption credential is valid")
    }

    /// Asserting party builder with entity id, SSO location and a verification credential
    #[must_use]
    pub fn provider_details_builder() -> ProviderDetailsBuilder {
        ProviderDetails::builder()
            .entity_id(TEST_IDP_ENTITY_ID)
            .single_sign_on_service_location(TEST_IDP_SSO_LOCATION)
            .verification_x509_credentials(|c| {
                c.insert(Self::verification_credential());
            })
    }

    /// Minimal valid builder: default entity id, one signing credential
    #[must_use]
    pub fn registration_builder() -> RegistrationBuilder {
        Registration::with_registration_id(TEST_REGISTRATION_ID)
            .assertion_consumer_service_location(TEST_ACS_LOCATION)
            .signing_x509_credentials(|c| {
                c.insert(Self::signing_credential());
            })
            .provider_details(|_| Self::provider_details_builder())
    }

    /// Registration with all four credential buckets populated
    #[must_use]
    pub fn full_registration() -> Registration {
        Self::registration_builder()
            .entity_id("https://sp.example/saml2/service-provider-metadata/simplesamlphp")
            .decryption_x509_credentials(|c| {
                c.insert(Self::decryption_credential());
            })
            .provider_details(|d| {
                d.encryption_x509_credentials(|c| {
                    c.insert(Self::encryption_credential());
                })
            })
            .build()
            .expect("fixture registration is valid")
    }
}
