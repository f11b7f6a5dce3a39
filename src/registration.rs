//! Relying party registrations
//!
//! A [`Registration`] binds one relying party (service provider) to one
//! asserting party (identity provider), keyed by an arbitrary `registrationId`:
//!
//! ```rust
//! use saml_registration::{Credential, Registration};
//!
//! # fn main() -> Result<(), saml_registration::ConfigurationError> {
//! let signing = Credential::signing("sp-private-key", "sp-certificate")?;
//! let verification = Credential::verification("idp-certificate")?;
//!
//! let registration = Registration::with_registration_id("simplesamlphp")
//!     .entity_id("{baseUrl}/saml2/service-provider-metadata/{registrationId}")
//!     .signing_x509_credentials(|c| {
//!         c.insert(signing);
//!     })
//!     .assertion_consumer_service_location("{baseUrl}/login/saml2/sso/{registrationId}")
//!     .provider_details(|details| {
//!         details
//!             .entity_id("https://idp.example/saml2/idp/metadata.php")
//!             .verification_x509_credentials(|c| {
//!                 c.insert(verification);
//!             })
//!             .single_sign_on_service_location("https://idp.example/saml2/idp/SSOService.php")
//!     })
//!     .build()?;
//!
//! assert_eq!(registration.registration_id(), "simplesamlphp");
//! # Ok(())
//! # }
//! ```

use crate::credential::{CategorizedCredentials, Credential, CredentialSet, CredentialUsage};
use crate::error::{require_text, ConfigurationError, ConfigurationResult};
use crate::provider_details::{require_usage, ProviderDetails, ProviderDetailsBuilder};
use crate::utils::logging::LoggingHelper;

/// Relying party entity id used when none is configured.
pub const DEFAULT_ENTITY_ID_TEMPLATE: &str =
    "{baseUrl}/saml2/service-provider-metadata/{registrationId}";

/// Validated, immutable relying party / asserting party pair.
///
/// Only obtainable from [`RegistrationBuilder::build`]; safe to share across
/// threads once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    registration_id: String,
    entity_id: String,
    assertion_consumer_service_location: String,
    credentials: Vec<Credential>,
    signing_x509_credentials: Vec<Credential>,
    decryption_x509_credentials: Vec<Credential>,
    provider_details: ProviderDetails,
}

impl Registration {
    /// Start a builder for the given registration id.
    #[must_use]
    pub fn with_registration_id(registration_id: impl Into<String>) -> RegistrationBuilder {
        RegistrationBuilder::new(registration_id)
    }

    /// Create a builder pre-populated from every field of this registration.
    ///
    /// The derived builder is validated again in full by its own `build()`.
    #[must_use]
    pub fn to_builder(&self) -> RegistrationBuilder {
        RegistrationBuilder::from(self)
    }

    /// The unique id of this relying party / asserting party pair
    #[must_use]
    pub fn registration_id(&self) -> &str {
        &self.registration_id
    }

    /// The relying party's `EntityID`.
    ///
    /// May contain the placeholders `baseUrl`, `registrationId`, `baseScheme`,
    /// `baseHost` and `basePort`, which callers resolve against the request.
    #[must_use]
    pub fn entity_id(&self) -> &str {
        &self.entity_id
    }

    /// `<AssertionConsumerService Location="..."/>`, possibly templated
    #[must_use]
    pub fn assertion_consumer_service_location(&self) -> &str {
        &self.assertion_consumer_service_location
    }

    /// Keys the relying party signs with
    #[must_use]
    pub fn signing_x509_credentials(&self) -> &[Credential] {
        &self.signing_x509_credentials
    }

    /// Keys the relying party decrypts with
    #[must_use]
    pub fn decryption_x509_credentials(&self) -> &[Credential] {
        &self.decryption_x509_credentials
    }

    #[must_use]
    pub fn provider_details(&self) -> &ProviderDetails {
        &self.provider_details
    }

    /// Every credential of both parties, signing, decryption, verification and
    /// encryption in that order.
    #[deprecated(
        note = "use `signing_x509_credentials`, `decryption_x509_credentials` or the provider details buckets instead"
    )]
    #[must_use]
    pub fn credentials(&self) -> &[Credential] {
        &self.credentials
    }

    #[deprecated(note = "use `provider_details().entity_id()` instead")]
    #[must_use]
    pub fn remote_idp_entity_id(&self) -> &str {
        self.provider_details.entity_id()
    }

    #[deprecated(note = "use `assertion_consumer_service_location` instead")]
    #[must_use]
    pub fn assertion_consumer_service_url_template(&self) -> &str {
        &self.assertion_consumer_service_location
    }

    #[deprecated(note = "use `provider_details().single_sign_on_service_location()` instead")]
    #[must_use]
    pub fn idp_web_sso_url(&self) -> &str {
        self.provider_details.single_sign_on_service_location()
    }

    #[deprecated(note = "use `entity_id` instead")]
    #[must_use]
    pub fn local_entity_id_template(&self) -> &str {
        &self.entity_id
    }

    #[deprecated(note = "use `signing_x509_credentials` instead")]
    #[must_use]
    pub fn signing_credentials(&self) -> Vec<Credential> {
        self.signing_x509_credentials.clone()
    }

    #[deprecated(note = "use `decryption_x509_credentials` instead")]
    #[must_use]
    pub fn decryption_credentials(&self) -> Vec<Credential> {
        self.decryption_x509_credentials.clone()
    }

    #[deprecated(note = "use `provider_details().verification_x509_credentials()` instead")]
    #[must_use]
    pub fn verification_credentials(&self) -> Vec<Credential> {
        self.provider_details.verification_x509_credentials().to_vec()
    }

    #[deprecated(note = "use `provider_details().encryption_x509_credentials()` instead")]
    #[must_use]
    pub fn encryption_credentials(&self) -> Vec<Credential> {
        self.provider_details.encryption_x509_credentials().to_vec()
    }

    /// Enforce the registration invariants on already-reconciled parts.
    fn validated(
        registration_id: &str,
        entity_id: &str,
        assertion_consumer_service_location: Option<&str>,
        signing: CredentialSet,
        decryption: CredentialSet,
        provider_details: ProviderDetails,
    ) -> ConfigurationResult<Self> {
        require_text(Some(registration_id), "registrationId")?;
        require_text(Some(entity_id), "entityId")?;
        require_text(
            assertion_consumer_service_location,
            "assertionConsumerServiceLocation",
        )?;

        let mut credentials = CredentialSet::new();
        credentials.extend(&signing);
        credentials.extend(&decryption);
        credentials.extend(provider_details.verification_x509_credentials());
        credentials.extend(provider_details.encryption_x509_credentials());
        if credentials.is_empty() {
            return Err(ConfigurationError::EmptyCollection {
                field: "credentials",
            });
        }

        require_usage(&signing, "signingX509Credentials", CredentialUsage::Signing)?;
        require_usage(
            &decryption,
            "decryptionX509Credentials",
            CredentialUsage::Decryption,
        )?;

        Ok(Self {
            registration_id: registration_id.to_string(),
            entity_id: entity_id.to_string(),
            assertion_consumer_service_location: assertion_consumer_service_location
                .unwrap_or_default()
                .to_string(),
            credentials: credentials.into_vec(),
            signing_x509_credentials: signing.into_vec(),
            decryption_x509_credentials: decryption.into_vec(),
            provider_details,
        })
    }
}

/// Accumulates relying party configuration; last write wins per field.
#[derive(Debug, Clone)]
pub struct RegistrationBuilder {
    registration_id: String,
    entity_id: String,
    assertion_consumer_service_location: Option<String>,
    provider_details: ProviderDetailsBuilder,
    credentials: CredentialSet,
    signing_x509_credentials: CredentialSet,
    decryption_x509_credentials: CredentialSet,
}

impl RegistrationBuilder {
    #[must_use]
    pub fn new(registration_id: impl Into<String>) -> Self {
        Self {
            registration_id: registration_id.into(),
            entity_id: DEFAULT_ENTITY_ID_TEMPLATE.to_string(),
            assertion_consumer_service_location: None,
            provider_details: ProviderDetailsBuilder::default(),
            credentials: CredentialSet::new(),
            signing_x509_credentials: CredentialSet::new(),
            decryption_x509_credentials: CredentialSet::new(),
        }
    }

    #[must_use]
    pub fn registration_id(mut self, registration_id: impl Into<String>) -> Self {
        self.registration_id = registration_id.into();
        self
    }

    /// Set the relying party's `EntityID` (defaults to [`DEFAULT_ENTITY_ID_TEMPLATE`]).
    #[must_use]
    pub fn entity_id(mut self, entity_id: impl Into<String>) -> Self {
        self.entity_id = entity_id.into();
        self
    }

    /// Apply `mutate` to the signing credential set.
    #[must_use]
    pub fn signing_x509_credentials(mut self, mutate: impl FnOnce(&mut CredentialSet)) -> Self {
        mutate(&mut self.signing_x509_credentials);
        self
    }

    /// Apply `mutate` to the decryption credential set.
    #[must_use]
    pub fn decryption_x509_credentials(mut self, mutate: impl FnOnce(&mut CredentialSet)) -> Self {
        mutate(&mut self.decryption_x509_credentials);
        self
    }

    #[must_use]
    pub fn assertion_consumer_service_location(mut self, location: impl Into<String>) -> Self {
        self.assertion_consumer_service_location = Some(location.into());
        self
    }

    /// Configure the nested asserting party builder.
    #[must_use]
    pub fn provider_details(
        mut self,
        configure: impl FnOnce(ProviderDetailsBuilder) -> ProviderDetailsBuilder,
    ) -> Self {
        self.provider_details = configure(std::mem::take(&mut self.provider_details));
        self
    }

    /// Apply `mutate` to the flat, unbucketed credential set.
    ///
    /// At build time these credentials are sorted by usage into the relying
    /// party and asserting party buckets.
    #[deprecated(
        note = "use `signing_x509_credentials` / `decryption_x509_credentials`, or the provider details buckets"
    )]
    #[must_use]
    pub fn credentials(mut self, mutate: impl FnOnce(&mut CredentialSet)) -> Self {
        mutate(&mut self.credentials);
        self
    }

    #[deprecated(note = "use `assertion_consumer_service_location` instead")]
    #[must_use]
    pub fn assertion_consumer_service_url_template(self, template: impl Into<String>) -> Self {
        self.assertion_consumer_service_location(template)
    }

    #[deprecated(note = "use `provider_details` instead")]
    #[must_use]
    pub fn remote_idp_entity_id(self, entity_id: impl Into<String>) -> Self {
        let entity_id = entity_id.into();
        self.provider_details(|details| details.entity_id(entity_id))
    }

    #[deprecated(note = "use `provider_details` instead")]
    #[must_use]
    pub fn idp_web_sso_url(self, url: impl Into<String>) -> Self {
        let url = url.into();
        self.provider_details(|details| details.single_sign_on_service_location(url))
    }

    #[deprecated(note = "use `entity_id` instead")]
    #[must_use]
    pub fn local_entity_id_template(self, template: impl Into<String>) -> Self {
        self.entity_id(template)
    }

    /// Reconcile, validate and produce an immutable registration.
    ///
    /// The builder is left untouched, so a failed build can be corrected and retried.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - the nested provider details fail their own validation
    /// - `registrationId`, `entityId` or `assertionConsumerServiceLocation` is blank
    /// - no credential is configured on either side
    /// - a signing credential lacks `SIGNING`, or a decryption credential lacks `DECRYPTION`
    pub fn build(&self) -> ConfigurationResult<Registration> {
        let mut signing = self.signing_x509_credentials.clone();
        let mut decryption = self.decryption_x509_credentials.clone();
        let mut provider_details = self.provider_details.clone();

        if !self.credentials.is_empty() {
            let categorized = CategorizedCredentials::from_credentials(&self.credentials);
            LoggingHelper::log_legacy_credentials_reconciled(&self.registration_id, &categorized);
            signing.extend(categorized.signing);
            decryption.extend(categorized.decryption);
            provider_details = provider_details
                .verification_x509_credentials(|c| c.extend(categorized.verification))
                .encryption_x509_credentials(|c| c.extend(categorized.encryption));
        }

        provider_details
            .build()
            .and_then(|provider_details| {
                Registration::validated(
                    &self.registration_id,
                    &self.entity_id,
                    self.assertion_consumer_service_location.as_deref(),
                    signing,
                    decryption,
                    provider_details,
                )
            })
            .inspect(LoggingHelper::log_registration_built)
            .inspect_err(|err| {
                LoggingHelper::log_registration_rejected(&self.registration_id, err);
            })
    }
}

impl From<&Registration> for RegistrationBuilder {
    fn from(registration: &Registration) -> Self {
        let details = registration.provider_details();
        Self::new(registration.registration_id())
            .entity_id(registration.entity_id())
            .signing_x509_credentials(|c| c.extend(registration.signing_x509_credentials()))
            .decryption_x509_credentials(|c| c.extend(registration.decryption_x509_credentials()))
            .assertion_consumer_service_location(registration.assertion_consumer_service_location())
            .provider_details(|_| ProviderDetailsBuilder::from(details))
    }
}
