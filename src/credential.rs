//! Usage-tagged X.509 credentials
//!
//! A [`Credential`] is an opaque handle over certificate material (and, for the
//! relying party's own keys, a private key) plus the usages it was declared
//! for. The material is never parsed here; only the declared usages are checked.

use crate::error::{ConfigurationError, ConfigurationResult};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

/// The role a credential is permitted to play in a SAML exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CredentialUsage {
    /// Relying party key used to sign outgoing messages
    Signing,
    /// Relying party key used to decrypt incoming assertions
    Decryption,
    /// Asserting party certificate used to verify incoming signatures
    Verification,
    /// Asserting party certificate used to encrypt outgoing messages
    Encryption,
}

impl CredentialUsage {
    /// All usages, in bucket order.
    pub const ALL: [Self; 4] = [
        Self::Signing,
        Self::Decryption,
        Self::Verification,
        Self::Encryption,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Signing => "SIGNING",
            Self::Decryption => "DECRYPTION",
            Self::Verification => "VERIFICATION",
            Self::Encryption => "ENCRYPTION",
        }
    }

    /// Whether this usage needs a private key (relying party side).
    #[must_use]
    pub const fn requires_private_key(self) -> bool {
        matches!(self, Self::Signing | Self::Decryption)
    }
}

impl fmt::Display for CredentialUsage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(PartialEq, Eq, Hash)]
struct CredentialInner {
    private_key: Option<String>,
    certificate: String,
    usages: BTreeSet<CredentialUsage>,
}

/// An immutable, cheaply cloneable credential with one or more usage tags.
///
/// Clones share the same underlying material; equality compares the material
/// and usages.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Credential {
    inner: Arc<CredentialInner>,
}

impl Credential {
    /// Create a relying party credential backed by a private key.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - the private key or certificate is empty
    /// - no usage is given
    /// - a usage other than `SIGNING` or `DECRYPTION` is given
    pub fn with_private_key(
        private_key: impl Into<String>,
        certificate: impl Into<String>,
        usages: impl IntoIterator<Item = CredentialUsage>,
    ) -> ConfigurationResult<Self> {
        let private_key = private_key.into();
        if private_key.trim().is_empty() {
            return Err(ConfigurationError::MissingField {
                field: "privateKey",
            });
        }
        Self::create(Some(private_key), certificate.into(), usages, "private key")
    }

    /// Create an asserting party credential from its certificate alone.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - the certificate is empty
    /// - no usage is given
    /// - a usage other than `VERIFICATION` or `ENCRYPTION` is given
    pub fn new(
        certificate: impl Into<String>,
        usages: impl IntoIterator<Item = CredentialUsage>,
    ) -> ConfigurationResult<Self> {
        Self::create(None, certificate.into(), usages, "certificate-only")
    }

    /// Shorthand for a `SIGNING` credential.
    ///
    /// # Errors
    ///
    /// See [`Credential::with_private_key`].
    pub fn signing(
        private_key: impl Into<String>,
        certificate: impl Into<String>,
    ) -> ConfigurationResult<Self> {
        Self::with_private_key(private_key, certificate, [CredentialUsage::Signing])
    }

    /// Shorthand for a `DECRYPTION` credential.
    ///
    /// # Errors
    ///
    /// See [`Credential::with_private_key`].
    pub fn decryption(
        private_key: impl Into<String>,
        certificate: impl Into<String>,
    ) -> ConfigurationResult<Self> {
        Self::with_private_key(private_key, certificate, [CredentialUsage::Decryption])
    }

    /// Shorthand for a `VERIFICATION` credential.
    ///
    /// # Errors
    ///
    /// See [`Credential::new`].
    pub fn verification(certificate: impl Into<String>) -> ConfigurationResult<Self> {
        Self::new(certificate, [CredentialUsage::Verification])
    }

    /// Shorthand for an `ENCRYPTION` credential.
    ///
    /// # Errors
    ///
    /// See [`Credential::new`].
    pub fn encryption(certificate: impl Into<String>) -> ConfigurationResult<Self> {
        Self::new(certificate, [CredentialUsage::Encryption])
    }

    fn create(
        private_key: Option<String>,
        certificate: String,
        usages: impl IntoIterator<Item = CredentialUsage>,
        kind: &'static str,
    ) -> ConfigurationResult<Self> {
        if certificate.trim().is_empty() {
            return Err(ConfigurationError::MissingField {
                field: "certificate",
            });
        }

        let usages: BTreeSet<CredentialUsage> = usages.into_iter().collect();
        if usages.is_empty() {
            return Err(ConfigurationError::EmptyCollection { field: "usages" });
        }

        let keyed = private_key.is_some();
        if let Some(&usage) = usages
            .iter()
            .find(|usage| usage.requires_private_key() != keyed)
        {
            return Err(ConfigurationError::UnsupportedUsage { usage, kind });
        }

        Ok(Self {
            inner: Arc::new(CredentialInner {
                private_key,
                certificate,
                usages,
            }),
        })
    }

    /// Opaque certificate material
    #[must_use]
    pub fn certificate(&self) -> &str {
        &self.inner.certificate
    }

    /// Opaque private key material, present only for relying party credentials
    #[must_use]
    pub fn private_key(&self) -> Option<&str> {
        self.inner.private_key.as_deref()
    }

    /// Declared usages in bucket order
    pub fn usages(&self) -> impl Iterator<Item = CredentialUsage> + '_ {
        self.inner.usages.iter().copied()
    }

    #[must_use]
    pub fn has_usage(&self, usage: CredentialUsage) -> bool {
        self.inner.usages.contains(&usage)
    }

    #[must_use]
    pub fn is_signing_credential(&self) -> bool {
        self.has_usage(CredentialUsage::Signing)
    }

    #[must_use]
    pub fn is_decryption_credential(&self) -> bool {
        self.has_usage(CredentialUsage::Decryption)
    }

    #[must_use]
    pub fn is_signature_verification_credential(&self) -> bool {
        self.has_usage(CredentialUsage::Verification)
    }

    #[must_use]
    pub fn is_encryption_credential(&self) -> bool {
        self.has_usage(CredentialUsage::Encryption)
    }

    /// SHA-256 of the certificate material, base64url encoded without padding.
    ///
    /// Safe to log; identifies the certificate without revealing key material.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        let digest = Sha256::digest(self.inner.certificate.as_bytes());
        URL_SAFE_NO_PAD.encode(digest)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("fingerprint", &self.fingerprint())
            .field("usages", &self.inner.usages)
            .field(
                "private_key",
                &self.inner.private_key.as_ref().map(|_| "[redacted]"),
            )
            .finish()
    }
}

/// Insertion-ordered, duplicate-free collection of credentials.
///
/// This is the mutable collection builder mutators receive, so callers can add
/// to, remove from or merge into a bucket instead of replacing it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CredentialSet {
    credentials: Vec<Credential>,
}

impl CredentialSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a credential, returning `false` if an equal one is already present.
    pub fn insert(&mut self, credential: Credential) -> bool {
        if self.contains(&credential) {
            return false;
        }
        self.credentials.push(credential);
        true
    }

    /// Remove a credential, returning whether it was present.
    pub fn remove(&mut self, credential: &Credential) -> bool {
        let before = self.credentials.len();
        self.credentials.retain(|c| c != credential);
        before != self.credentials.len()
    }

    pub fn retain(&mut self, keep: impl FnMut(&Credential) -> bool) {
        self.credentials.retain(keep);
    }

    pub fn clear(&mut self) {
        self.credentials.clear();
    }

    #[must_use]
    pub fn contains(&self, credential: &Credential) -> bool {
        self.credentials.contains(credential)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.credentials.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.credentials.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Credential> {
        self.credentials.iter()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[Credential] {
        &self.credentials
    }

    pub(crate) fn into_vec(self) -> Vec<Credential> {
        self.credentials
    }
}

impl Extend<Credential> for CredentialSet {
    fn extend<I: IntoIterator<Item = Credential>>(&mut self, iter: I) {
        for credential in iter {
            self.insert(credential);
        }
    }
}

impl<'a> Extend<&'a Credential> for CredentialSet {
    fn extend<I: IntoIterator<Item = &'a Credential>>(&mut self, iter: I) {
        self.extend(iter.into_iter().cloned());
    }
}

impl FromIterator<Credential> for CredentialSet {
    fn from_iter<I: IntoIterator<Item = Credential>>(iter: I) -> Self {
        let mut set = Self::new();
        set.extend(iter);
        set
    }
}

impl<'a> IntoIterator for &'a CredentialSet {
    type Item = &'a Credential;
    type IntoIter = std::slice::Iter<'a, Credential>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Return, in input order, the credentials matching `predicate`.
///
/// The input is never modified; an empty input yields an empty result.
pub fn filter_credentials<'a, I, P>(credentials: I, predicate: P) -> Vec<Credential>
where
    I: IntoIterator<Item = &'a Credential>,
    P: Fn(&Credential) -> bool,
{
    credentials
        .into_iter()
        .filter(|&credential| predicate(credential))
        .cloned()
        .collect()
}

/// A flat credential collection partitioned into the four usage buckets.
///
/// A credential carrying several usages lands in every bucket it matches.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategorizedCredentials {
    pub signing: Vec<Credential>,
    pub decryption: Vec<Credential>,
    pub verification: Vec<Credential>,
    pub encryption: Vec<Credential>,
}

impl CategorizedCredentials {
    #[must_use]
    pub fn from_credentials<'a, I>(credentials: I) -> Self
    where
        I: IntoIterator<Item = &'a Credential>,
        I::IntoIter: Clone,
    {
        let credentials = credentials.into_iter();
        Self {
            signing: filter_credentials(credentials.clone(), Credential::is_signing_credential),
            decryption: filter_credentials(
                credentials.clone(),
                Credential::is_decryption_credential,
            ),
            verification: filter_credentials(
                credentials.clone(),
                Credential::is_signature_verification_credential,
            ),
            encryption: filter_credentials(credentials, Credential::is_encryption_credential),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.signing.is_empty()
            && self.decryption.is_empty()
            && self.verification.is_empty()
            && self.encryption.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures::TestFixtures;

    #[test]
    fn test_usage_serializes_as_upper_case() {
        assert_eq!(
            serde_json::to_string(&CredentialUsage::Verification).unwrap(),
            "\"VERIFICATION\""
        );
        let usage: CredentialUsage = serde_json::from_str("\"DECRYPTION\"").unwrap();
        assert_eq!(usage, CredentialUsage::Decryption);
        assert_eq!(CredentialUsage::Encryption.to_string(), "ENCRYPTION");
    }

    #[test]
    fn test_each_usage_lands_in_its_own_bucket() {
        for usage in CredentialUsage::ALL {
            let credential = if usage.requires_private_key() {
                Credential::with_private_key("key", "cert", [usage]).unwrap()
            } else {
                Credential::new("cert", [usage]).unwrap()
            };
            let categorized = CategorizedCredentials::from_credentials([&credential]);

            let buckets = [
                &categorized.signing,
                &categorized.decryption,
                &categorized.verification,
                &categorized.encryption,
            ];
            for (bucket_usage, bucket) in CredentialUsage::ALL.iter().zip(buckets) {
                assert_eq!(bucket.len(), usize::from(*bucket_usage == usage), "{usage}");
            }
        }
    }

    #[test]
    fn test_predicates_follow_declared_usages() {
        let credential = Credential::with_private_key(
            "key",
            "cert",
            [CredentialUsage::Signing, CredentialUsage::Decryption],
        )
        .unwrap();

        assert!(credential.is_signing_credential());
        assert!(credential.is_decryption_credential());
        assert!(!credential.is_signature_verification_credential());
        assert!(!credential.is_encryption_credential());
        assert_eq!(
            credential.usages().collect::<Vec<_>>(),
            vec![CredentialUsage::Signing, CredentialUsage::Decryption]
        );
    }

    #[test]
    fn test_keyed_credentials_reject_certificate_only_usages() {
        let err = Credential::with_private_key("key", "cert", [CredentialUsage::Verification])
            .unwrap_err();
        assert_eq!(
            err,
            ConfigurationError::UnsupportedUsage {
                usage: CredentialUsage::Verification,
                kind: "private key",
            }
        );

        let err = Credential::new("cert", [CredentialUsage::Signing]).unwrap_err();
        assert!(matches!(
            err,
            ConfigurationError::UnsupportedUsage {
                usage: CredentialUsage::Signing,
                ..
            }
        ));
    }

    #[test]
    fn test_construction_requires_material_and_usages() {
        assert_eq!(
            Credential::new("", [CredentialUsage::Verification]).unwrap_err(),
            ConfigurationError::MissingField {
                field: "certificate"
            }
        );
        assert_eq!(
            Credential::signing(" ", "cert").unwrap_err(),
            ConfigurationError::MissingField {
                field: "privateKey"
            }
        );
        assert_eq!(
            Credential::new("cert", []).unwrap_err(),
            ConfigurationError::EmptyCollection { field: "usages" }
        );
    }

    #[test]
    fn test_debug_redacts_private_key() {
        let credential = Credential::signing("super-secret-key", "cert").unwrap();
        let debug = format!("{credential:?}");
        assert!(!debug.contains("super-secret-key"));
        assert!(debug.contains("[redacted]"));
        assert!(debug.contains(&credential.fingerprint()));
    }

    #[test]
    fn test_fingerprint_is_stable_and_distinct() {
        let a = Credential::verification("cert-a").unwrap();
        let b = Credential::encryption("cert-a").unwrap();
        let c = Credential::verification("cert-c").unwrap();

        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_ne!(a.fingerprint(), c.fingerprint());
        // 32 byte digest, base64url without padding
        assert_eq!(a.fingerprint().len(), 43);
    }

    #[test]
    fn test_credential_set_is_ordered_and_unique() {
        let signing = TestFixtures::signing_credential();
        let verification = TestFixtures::verification_credential();

        let mut set = CredentialSet::new();
        assert!(set.insert(signing.clone()));
        assert!(set.insert(verification.clone()));
        assert!(!set.insert(signing.clone()));
        assert_eq!(set.as_slice(), &[signing.clone(), verification.clone()]);

        assert!(set.remove(&signing));
        assert!(!set.remove(&signing));
        assert_eq!(set.len(), 1);

        set.extend([&signing, &verification]);
        assert_eq!(set.as_slice(), &[verification, signing]);
    }

    #[test]
    fn test_filter_preserves_order_without_mutating_input() {
        let first = Credential::verification("cert-1").unwrap();
        let signing = TestFixtures::signing_credential();
        let second = Credential::verification("cert-2").unwrap();
        let input = vec![first.clone(), signing.clone(), second.clone()];

        let filtered = filter_credentials(&input, Credential::is_signature_verification_credential);

        assert_eq!(filtered, vec![first.clone(), second.clone()]);
        assert_eq!(input, vec![first, signing, second]);
        assert!(filter_credentials(&[], Credential::is_signing_credential).is_empty());
    }

    #[test]
    fn test_categorize_places_multi_usage_credentials_in_every_bucket() {
        let dual = Credential::new(
            "idp-cert",
            [CredentialUsage::Verification, CredentialUsage::Encryption],
        )
        .unwrap();
        let signing = TestFixtures::signing_credential();
        let input = vec![signing.clone(), dual.clone()];

        let categorized = CategorizedCredentials::from_credentials(&input);

        assert_eq!(categorized.signing, vec![signing]);
        assert!(categorized.decryption.is_empty());
        assert_eq!(categorized.verification, vec![dual.clone()]);
        assert_eq!(categorized.encryption, vec![dual]);
        assert!(CategorizedCredentials::from_credentials(&Vec::new()).is_empty());
    }
}
