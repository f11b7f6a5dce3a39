//! Asserting party (identity provider) configuration
//!
//! [`ProviderDetails`] mirrors the asserting party's `<IDPSSODescriptor>`: its
//! entity id, whether it wants signed `AuthnRequest`s, its verification and
//! encryption certificates, and where and how to send authentication requests.

use crate::credential::{Credential, CredentialSet, CredentialUsage};
use crate::error::{require_text, ConfigurationError, ConfigurationResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// HTTP transport used to carry a SAML protocol message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageBinding {
    /// HTTP-Redirect binding (deflated, base64 and URL encoded query parameter)
    #[default]
    Redirect,
    /// HTTP-POST binding (base64 encoded form field)
    Post,
}

impl MessageBinding {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Redirect => "REDIRECT",
            Self::Post => "POST",
        }
    }

    /// The SAML 2.0 binding URN, as found in metadata `Binding="..."` attributes.
    #[must_use]
    pub const fn urn(self) -> &'static str {
        match self {
            Self::Redirect => "urn:oasis:names:tc:SAML:2.0:bindings:HTTP-Redirect",
            Self::Post => "urn:oasis:names:tc:SAML:2.0:bindings:HTTP-POST",
        }
    }
}

impl fmt::Display for MessageBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validated, immutable asserting party configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderDetails {
    entity_id: String,
    wants_authn_requests_signed: bool,
    verification_x509_credentials: Vec<Credential>,
    encryption_x509_credentials: Vec<Credential>,
    single_sign_on_service_location: String,
    single_sign_on_service_binding: MessageBinding,
}

impl ProviderDetails {
    #[must_use]
    pub fn builder() -> ProviderDetailsBuilder {
        ProviderDetailsBuilder::default()
    }

    /// Create a builder pre-populated with every field of this record.
    #[must_use]
    pub fn to_builder(&self) -> ProviderDetailsBuilder {
        ProviderDetailsBuilder::from(self)
    }

    /// The asserting party's `EntityID`.
    ///
    /// May contain the placeholders `baseUrl`, `registrationId`, `baseScheme`,
    /// `baseHost` and `basePort`, which callers resolve against the request.
    #[must_use]
    pub fn entity_id(&self) -> &str {
        &self.entity_id
    }

    /// The asserting party's `WantAuthnRequestsSigned` preference
    #[must_use]
    pub fn wants_authn_requests_signed(&self) -> bool {
        self.wants_authn_requests_signed
    }

    /// Certificates used to verify the asserting party's signatures
    #[must_use]
    pub fn verification_x509_credentials(&self) -> &[Credential] {
        &self.verification_x509_credentials
    }

    /// Certificates used to encrypt messages for the asserting party
    #[must_use]
    pub fn encryption_x509_credentials(&self) -> &[Credential] {
        &self.encryption_x509_credentials
    }

    /// `<SingleSignOnService Location="..."/>`
    #[must_use]
    pub fn single_sign_on_service_location(&self) -> &str {
        &self.single_sign_on_service_location
    }

    /// `<SingleSignOnService Binding="..."/>`
    #[must_use]
    pub fn single_sign_on_service_binding(&self) -> MessageBinding {
        self.single_sign_on_service_binding
    }

    #[deprecated(note = "use `single_sign_on_service_location` instead")]
    #[must_use]
    pub fn web_sso_url(&self) -> &str {
        &self.single_sign_on_service_location
    }

    #[deprecated(note = "use `wants_authn_requests_signed` instead")]
    #[must_use]
    pub fn sign_authn_request(&self) -> bool {
        self.wants_authn_requests_signed
    }

    #[deprecated(note = "use `single_sign_on_service_binding` instead")]
    #[must_use]
    pub fn binding(&self) -> MessageBinding {
        self.single_sign_on_service_binding
    }
}

/// Accumulates asserting party configuration; last write wins per field.
#[derive(Debug, Clone)]
pub struct ProviderDetailsBuilder {
    entity_id: Option<String>,
    wants_authn_requests_signed: bool,
    verification_x509_credentials: CredentialSet,
    encryption_x509_credentials: CredentialSet,
    single_sign_on_service_location: Option<String>,
    single_sign_on_service_binding: MessageBinding,
}

impl Default for ProviderDetailsBuilder {
    fn default() -> Self {
        Self {
            entity_id: None,
            wants_authn_requests_signed: true,
            verification_x509_credentials: CredentialSet::new(),
            encryption_x509_credentials: CredentialSet::new(),
            single_sign_on_service_location: None,
            single_sign_on_service_binding: MessageBinding::Redirect,
        }
    }
}

impl ProviderDetailsBuilder {
    #[must_use]
    pub fn entity_id(mut self, entity_id: impl Into<String>) -> Self {
        self.entity_id = Some(entity_id.into());
        self
    }

    #[must_use]
    pub fn wants_authn_requests_signed(mut self, wants_authn_requests_signed: bool) -> Self {
        self.wants_authn_requests_signed = wants_authn_requests_signed;
        self
    }

    /// Apply `mutate` to the verification credential set.
    #[must_use]
    pub fn verification_x509_credentials(mut self, mutate: impl FnOnce(&mut CredentialSet)) -> Self {
        mutate(&mut self.verification_x509_credentials);
        self
    }

    /// Apply `mutate` to the encryption credential set.
    #[must_use]
    pub fn encryption_x509_credentials(mut self, mutate: impl FnOnce(&mut CredentialSet)) -> Self {
        mutate(&mut self.encryption_x509_credentials);
        self
    }

    #[must_use]
    pub fn single_sign_on_service_location(mut self, location: impl Into<String>) -> Self {
        self.single_sign_on_service_location = Some(location.into());
        self
    }

    #[must_use]
    pub fn single_sign_on_service_binding(mut self, binding: MessageBinding) -> Self {
        self.single_sign_on_service_binding = binding;
        self
    }

    #[deprecated(note = "use `single_sign_on_service_location` instead")]
    #[must_use]
    pub fn web_sso_url(self, url: impl Into<String>) -> Self {
        self.single_sign_on_service_location(url)
    }

    #[deprecated(note = "use `wants_authn_requests_signed` instead")]
    #[must_use]
    pub fn sign_authn_request(self, sign_authn_request: bool) -> Self {
        self.wants_authn_requests_signed(sign_authn_request)
    }

    #[deprecated(note = "use `single_sign_on_service_binding` instead")]
    #[must_use]
    pub fn binding(self, binding: MessageBinding) -> Self {
        self.single_sign_on_service_binding(binding)
    }

    /// Validate the accumulated configuration and produce an immutable record.
    ///
    /// The builder is left untouched, so a failed build can be corrected and retried.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `entityId` or `singleSignOnServiceLocation` is unset or blank
    /// - a verification credential lacks the `VERIFICATION` usage
    /// - an encryption credential lacks the `ENCRYPTION` usage
    pub fn build(&self) -> ConfigurationResult<ProviderDetails> {
        require_text(self.entity_id.as_deref(), "entityId")?;
        require_usage(
            &self.verification_x509_credentials,
            "verificationX509Credentials",
            CredentialUsage::Verification,
        )?;
        require_usage(
            &self.encryption_x509_credentials,
            "encryptionX509Credentials",
            CredentialUsage::Encryption,
        )?;
        require_text(
            self.single_sign_on_service_location.as_deref(),
            "singleSignOnServiceLocation",
        )?;

        Ok(ProviderDetails {
            entity_id: self.entity_id.clone().unwrap_or_default(),
            wants_authn_requests_signed: self.wants_authn_requests_signed,
            verification_x509_credentials: self.verification_x509_credentials.clone().into_vec(),
            encryption_x509_credentials: self.encryption_x509_credentials.clone().into_vec(),
            single_sign_on_service_location: self
                .single_sign_on_service_location
                .clone()
                .unwrap_or_default(),
            single_sign_on_service_binding: self.single_sign_on_service_binding,
        })
    }
}

impl From<&ProviderDetails> for ProviderDetailsBuilder {
    fn from(details: &ProviderDetails) -> Self {
        Self::default()
            .entity_id(details.entity_id())
            .wants_authn_requests_signed(details.wants_authn_requests_signed())
            .verification_x509_credentials(|c| c.extend(details.verification_x509_credentials()))
            .encryption_x509_credentials(|c| c.extend(details.encryption_x509_credentials()))
            .single_sign_on_service_location(details.single_sign_on_service_location())
            .single_sign_on_service_binding(details.single_sign_on_service_binding())
    }
}

/// Fail unless every credential in `credentials` declares `usage`.
pub(crate) fn require_usage<'a>(
    credentials: impl IntoIterator<Item = &'a Credential>,
    field: &'static str,
    usage: CredentialUsage,
) -> ConfigurationResult<()> {
    if credentials
        .into_iter()
        .all(|credential| credential.has_usage(usage))
    {
        Ok(())
    } else {
        Err(ConfigurationError::UsageMismatch { field, usage })
    }
}
