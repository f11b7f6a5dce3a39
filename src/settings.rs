use crate::credential::{Credential, CredentialUsage};
use crate::error::ConfigurationError;
use crate::provider_details::{MessageBinding, ProviderDetailsBuilder};
use crate::registration::{Registration, RegistrationBuilder};
use crate::utils::logging::LoggingHelper;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variable naming a directory whose `Settings.toml` overrides `./Settings.toml`
pub const SETTINGS_DIR_ENV: &str = "SAML_SETTINGS_DIR";

const SETTINGS_FILE_NAME: &str = "Settings.toml";

/// Errors raised while loading settings or turning them into registrations
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse settings: {0}")]
    Parse(#[from] basic_toml::Error),

    #[error("invalid registration {registration_id:?}: {source}")]
    Configuration {
        registration_id: String,
        #[source]
        source: ConfigurationError,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RegistrationSettings {
    #[serde(default)]
    pub logging: LoggingSettings,
    #[serde(default)]
    pub registrations: Vec<RelyingPartySettings>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// One relying party registration as written in `Settings.toml`
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RelyingPartySettings {
    pub registration_id: String,
    /// Defaults to `{baseUrl}/saml2/service-provider-metadata/{registrationId}`
    pub entity_id: Option<String>,
    pub assertion_consumer_service_location: Option<String>,
    #[serde(default)]
    pub signing_credentials: Vec<CredentialSettings>,
    #[serde(default)]
    pub decryption_credentials: Vec<CredentialSettings>,
    /// Deprecated flat list, sorted into buckets by usage at build time
    #[serde(default)]
    pub credentials: Vec<CredentialSettings>,
    #[serde(default)]
    pub asserting_party: AssertingPartySettings,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AssertingPartySettings {
    pub entity_id: Option<String>,
    /// Defaults to `true`
    pub wants_authn_requests_signed: Option<bool>,
    #[serde(default)]
    pub verification_credentials: Vec<CredentialSettings>,
    #[serde(default)]
    pub encryption_credentials: Vec<CredentialSettings>,
    pub single_sign_on_service_location: Option<String>,
    /// Defaults to `REDIRECT`
    pub single_sign_on_service_binding: Option<MessageBinding>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CredentialSettings {
    // Direct values
    pub certificate: Option<String>,
    pub private_key: Option<String>,

    // File locations, used when no direct value is given
    pub certificate_path: Option<String>,
    pub private_key_path: Option<String>,

    // Environment variable name overriding the private key
    pub private_key_env: Option<String>,

    #[serde(default)]
    pub usages: Vec<CredentialUsage>,
}

impl RegistrationSettings {
    /// Load settings from configuration files and environment variables
    ///
    /// Settings are loaded with the following priority (highest to lowest):
    /// 1. Environment variables
    /// 2. Settings.toml in `SAML_SETTINGS_DIR` (if specified and exists)
    /// 3. Settings.toml in current directory (if exists)
    /// 4. Default settings
    ///
    /// # Errors
    ///
    /// Returns an error if a settings file cannot be read or parsed
    pub fn load() -> Result<Self, SettingsError> {
        let mut settings = Self::default();

        let default_config_path = PathBuf::from(SETTINGS_FILE_NAME);
        if default_config_path.exists() {
            settings = Self::load_from_path(&default_config_path)?;
        }

        if let Ok(settings_dir) = std::env::var(SETTINGS_DIR_ENV) {
            let override_path = Path::new(&settings_dir).join(SETTINGS_FILE_NAME);
            if override_path.exists() {
                settings = Self::load_from_path(&override_path)?;
            } else {
                LoggingHelper::log_settings_dir_without_file(&override_path);
            }
        }

        Self::apply_env_overrides(&mut settings);

        Ok(settings)
    }

    /// Read and parse a single settings file, without environment overrides
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed
    pub fn load_from_path(path: &Path) -> Result<Self, SettingsError> {
        let toml_content = read_file(path)?;
        let settings = Self::from_toml_str(&toml_content)?;
        LoggingHelper::log_settings_loaded(path);
        Ok(settings)
    }

    /// Parse settings from TOML text
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is malformed or does not match the settings layout
    pub fn from_toml_str(toml_content: &str) -> Result<Self, SettingsError> {
        Ok(basic_toml::from_str(toml_content)?)
    }

    /// Apply environment variable overrides to settings
    pub fn apply_env_overrides(settings: &mut Self) {
        Self::apply_logging_env_overrides(&mut settings.logging);
    }

    fn apply_logging_env_overrides(logging_settings: &mut LoggingSettings) {
        if let Ok(log_level) = std::env::var("RUST_LOG") {
            logging_settings.level = log_level;
        }
    }

    /// Get registration settings by id
    #[must_use]
    pub fn get_registration(&self, registration_id: &str) -> Option<&RelyingPartySettings> {
        self.registrations
            .iter()
            .find(|r| r.registration_id == registration_id)
    }

    /// Build every configured registration, stopping at the first invalid one
    ///
    /// # Errors
    ///
    /// Returns an error if a credential file cannot be read or a registration
    /// fails validation
    pub fn build_registrations(&self) -> Result<Vec<Registration>, SettingsError> {
        self.registrations
            .iter()
            .map(RelyingPartySettings::build)
            .collect()
    }
}

impl RelyingPartySettings {
    /// Feed these settings into a registration builder
    ///
    /// # Errors
    ///
    /// Returns an error if a credential entry is empty, unreadable or declares
    /// usages its key material cannot serve
    #[allow(deprecated)]
    pub fn to_builder(&self) -> Result<RegistrationBuilder, SettingsError> {
        let signing = self.resolve_all(&self.signing_credentials, "signingX509Credentials")?;
        let decryption =
            self.resolve_all(&self.decryption_credentials, "decryptionX509Credentials")?;
        let legacy = self.resolve_all(&self.credentials, "credentials")?;
        let provider_details = self.asserting_party_builder()?;

        let mut builder = Registration::with_registration_id(&self.registration_id)
            .signing_x509_credentials(|c| c.extend(signing))
            .decryption_x509_credentials(|c| c.extend(decryption))
            .provider_details(|_| provider_details);

        if !legacy.is_empty() {
            builder = builder.credentials(|c| c.extend(legacy));
        }
        if let Some(entity_id) = &self.entity_id {
            builder = builder.entity_id(entity_id);
        }
        if let Some(location) = &self.assertion_consumer_service_location {
            builder = builder.assertion_consumer_service_location(location);
        }

        Ok(builder)
    }

    /// Build and validate the registration these settings describe
    ///
    /// # Errors
    ///
    /// See [`RelyingPartySettings::to_builder`] and [`RegistrationBuilder::build`]
    pub fn build(&self) -> Result<Registration, SettingsError> {
        self.to_builder()?
            .build()
            .map_err(|source| self.configuration_error(source))
    }

    fn asserting_party_builder(&self) -> Result<ProviderDetailsBuilder, SettingsError> {
        let party = &self.asserting_party;
        let verification =
            self.resolve_all(&party.verification_credentials, "verificationX509Credentials")?;
        let encryption =
            self.resolve_all(&party.encryption_credentials, "encryptionX509Credentials")?;

        let mut builder = ProviderDetailsBuilder::default()
            .verification_x509_credentials(|c| c.extend(verification))
            .encryption_x509_credentials(|c| c.extend(encryption));

        if let Some(entity_id) = &party.entity_id {
            builder = builder.entity_id(entity_id);
        }
        if let Some(wants_signed) = party.wants_authn_requests_signed {
            builder = builder.wants_authn_requests_signed(wants_signed);
        }
        if let Some(location) = &party.single_sign_on_service_location {
            builder = builder.single_sign_on_service_location(location);
        }
        if let Some(binding) = party.single_sign_on_service_binding {
            builder = builder.single_sign_on_service_binding(binding);
        }

        Ok(builder)
    }

    fn resolve_all(
        &self,
        entries: &[CredentialSettings],
        field: &'static str,
    ) -> Result<Vec<Credential>, SettingsError> {
        entries
            .iter()
            .map(|entry| {
                entry
                    .resolve(field)?
                    .map_err(|source| self.configuration_error(source))
            })
            .collect()
    }

    fn configuration_error(&self, source: ConfigurationError) -> SettingsError {
        SettingsError::Configuration {
            registration_id: self.registration_id.clone(),
            source,
        }
    }
}

impl CredentialSettings {
    /// Get the certificate, preferring the inline value over the file
    ///
    /// # Errors
    ///
    /// Returns an error if the certificate file cannot be read
    pub fn get_certificate(&self) -> Result<Option<String>, SettingsError> {
        resolve_material(self.certificate.as_ref(), self.certificate_path.as_deref())
    }

    /// Get the private key, checking the environment variable first, then the
    /// inline value, then the file
    ///
    /// # Errors
    ///
    /// Returns an error if the private key file cannot be read
    pub fn get_private_key(&self) -> Result<Option<String>, SettingsError> {
        if let Some(env_var) = &self.private_key_env {
            if let Ok(value) = std::env::var(env_var) {
                return Ok(Some(value));
            }
        }
        resolve_material(self.private_key.as_ref(), self.private_key_path.as_deref())
    }

    /// Turn this entry into a credential.
    ///
    /// I/O failures are reported in the outer result, configuration defects in
    /// the inner one so the caller can attach the registration id.
    fn resolve(
        &self,
        field: &'static str,
    ) -> Result<Result<Credential, ConfigurationError>, SettingsError> {
        let Some(certificate) = self.get_certificate()? else {
            return Ok(Err(ConfigurationError::NullElement { field }));
        };
        let usages = self.usages.iter().copied();

        Ok(match self.get_private_key()? {
            Some(private_key) => Credential::with_private_key(private_key, certificate, usages),
            None => Credential::new(certificate, usages),
        })
    }
}

fn resolve_material(
    inline: Option<&String>,
    path: Option<&str>,
) -> Result<Option<String>, SettingsError> {
    if let Some(value) = inline {
        return Ok(Some(value.clone()));
    }
    path.map(|path| read_file(Path::new(path))).transpose()
}

fn read_file(path: &Path) -> Result<String, SettingsError> {
    fs::read_to_string(path).map_err(|source| SettingsError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;

    const SETTINGS: &str = r#"
[logging]
level = "debug"

[[registrations]]
registration_id = "simplesamlphp"
assertion_consumer_service_location = "{baseUrl}/login/saml2/sso/{registrationId}"

[[registrations.signing_credentials]]
private_key = "sp-key"
certificate = "sp-cert"
usages = ["SIGNING"]

[registrations.asserting_party]
entity_id = "https://idp.example/metadata"
single_sign_on_service_location = "https://idp.example/sso"
single_sign_on_service_binding = "POST"
wants_authn_requests_signed = false

[[registrations.asserting_party.verification_credentials]]
certificate = "idp-cert"
usages = ["VERIFICATION"]
"#;

    fn clean_env_vars() {
        std::env::remove_var(SETTINGS_DIR_ENV);
        std::env::remove_var("RUST_LOG");
        std::env::remove_var("TEST_SP_PRIVATE_KEY");
    }

    #[test]
    fn test_parse_and_build() {
        let settings = RegistrationSettings::from_toml_str(SETTINGS).unwrap();
        assert_eq!(settings.logging.level, "debug");

        let registrations = settings.build_registrations().unwrap();
        assert_eq!(registrations.len(), 1);

        let registration = &registrations[0];
        assert_eq!(registration.registration_id(), "simplesamlphp");
        assert_eq!(
            registration.entity_id(),
            "{baseUrl}/saml2/service-provider-metadata/{registrationId}"
        );
        assert_eq!(registration.signing_x509_credentials().len(), 1);

        let details = registration.provider_details();
        assert_eq!(details.single_sign_on_service_binding(), MessageBinding::Post);
        assert!(!details.wants_authn_requests_signed());
        assert_eq!(details.verification_x509_credentials().len(), 1);
    }

    #[test]
    fn test_defaults_when_empty() {
        let settings = RegistrationSettings::from_toml_str("").unwrap();
        assert_eq!(settings.logging.level, "info");
        assert!(settings.registrations.is_empty());
        assert!(settings.build_registrations().unwrap().is_empty());
    }

    #[test]
    fn test_unknown_usage_is_a_parse_error() {
        let toml = r#"
[[registrations]]
registration_id = "bad"

[[registrations.signing_credentials]]
certificate = "cert"
usages = ["SIGN"]
"#;
        assert!(matches!(
            RegistrationSettings::from_toml_str(toml),
            Err(SettingsError::Parse(_))
        ));
    }

    #[test]
    fn test_credential_without_certificate_is_null_element() {
        let relying_party = RelyingPartySettings {
            registration_id: "sp-1".to_string(),
            signing_credentials: vec![CredentialSettings {
                private_key: Some("key".to_string()),
                usages: vec![CredentialUsage::Signing],
                ..Default::default()
            }],
            ..Default::default()
        };

        match relying_party.build() {
            Err(SettingsError::Configuration {
                registration_id,
                source,
            }) => {
                assert_eq!(registration_id, "sp-1");
                assert_eq!(
                    source,
                    ConfigurationError::NullElement {
                        field: "signingX509Credentials"
                    }
                );
            }
            other => panic!("expected configuration error, got {other:?}"),
        }
    }

    fn certificate_less_entry(usage: CredentialUsage) -> Vec<CredentialSettings> {
        vec![CredentialSettings {
            private_key: usage.requires_private_key().then(|| "key".to_string()),
            usages: vec![usage],
            ..Default::default()
        }]
    }

    fn null_element_field(relying_party: &RelyingPartySettings) -> &'static str {
        match relying_party.build() {
            Err(SettingsError::Configuration {
                source: ConfigurationError::NullElement { field },
                ..
            }) => field,
            other => panic!("expected null element error, got {other:?}"),
        }
    }

    #[test]
    fn test_every_credential_list_reports_null_elements() {
        let base = RegistrationSettings::from_toml_str(SETTINGS).unwrap().registrations[0].clone();

        let mut relying_party = base.clone();
        relying_party.decryption_credentials = certificate_less_entry(CredentialUsage::Decryption);
        assert_eq!(null_element_field(&relying_party), "decryptionX509Credentials");

        let mut relying_party = base.clone();
        relying_party.credentials = certificate_less_entry(CredentialUsage::Verification);
        assert_eq!(null_element_field(&relying_party), "credentials");

        let mut relying_party = base.clone();
        relying_party.asserting_party.verification_credentials =
            certificate_less_entry(CredentialUsage::Verification);
        assert_eq!(null_element_field(&relying_party), "verificationX509Credentials");

        let mut relying_party = base;
        relying_party.asserting_party.encryption_credentials =
            certificate_less_entry(CredentialUsage::Encryption);
        assert_eq!(null_element_field(&relying_party), "encryptionX509Credentials");
    }

    #[test]
    fn test_invalid_registration_names_the_registration() {
        let mut settings = RegistrationSettings::from_toml_str(SETTINGS).unwrap();
        settings.registrations[0].assertion_consumer_service_location = None;

        let err = settings.build_registrations().unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid registration \"simplesamlphp\": assertionConsumerServiceLocation cannot be empty"
        );
    }

    #[test]
    fn test_legacy_flat_credentials_are_bucketed() {
        let toml = r#"
[[registrations]]
registration_id = "legacy"
assertion_consumer_service_location = "{baseUrl}/login/saml2/sso/{registrationId}"

[[registrations.credentials]]
private_key = "sp-key"
certificate = "sp-cert"
usages = ["SIGNING"]

[[registrations.credentials]]
certificate = "idp-cert"
usages = ["VERIFICATION"]

[registrations.asserting_party]
entity_id = "https://idp.example/metadata"
single_sign_on_service_location = "https://idp.example/sso"
"#;
        let settings = RegistrationSettings::from_toml_str(toml).unwrap();
        let registration = settings.get_registration("legacy").unwrap().build().unwrap();

        assert_eq!(registration.signing_x509_credentials().len(), 1);
        assert_eq!(
            registration
                .provider_details()
                .verification_x509_credentials()
                .len(),
            1
        );
        assert!(settings.get_registration("missing").is_none());
    }

    #[test]
    fn test_credentials_read_from_files() {
        let mut certificate = tempfile::NamedTempFile::new().unwrap();
        write!(certificate, "file-cert").unwrap();
        let mut private_key = tempfile::NamedTempFile::new().unwrap();
        write!(private_key, "file-key").unwrap();

        let entry = CredentialSettings {
            certificate_path: Some(certificate.path().display().to_string()),
            private_key_path: Some(private_key.path().display().to_string()),
            usages: vec![CredentialUsage::Decryption],
            ..Default::default()
        };

        assert_eq!(entry.get_certificate().unwrap().as_deref(), Some("file-cert"));
        assert_eq!(entry.get_private_key().unwrap().as_deref(), Some("file-key"));
    }

    #[test]
    fn test_missing_credential_file_is_io_error() {
        let entry = CredentialSettings {
            certificate_path: Some("/nonexistent/idp.pem".to_string()),
            usages: vec![CredentialUsage::Verification],
            ..Default::default()
        };

        match entry.get_certificate() {
            Err(SettingsError::Io { path, .. }) => {
                assert_eq!(path, PathBuf::from("/nonexistent/idp.pem"));
            }
            other => panic!("expected io error, got {other:?}"),
        }
    }

    #[test]
    #[serial]
    fn test_private_key_env_override() {
        clean_env_vars();

        let entry = CredentialSettings {
            certificate: Some("cert".to_string()),
            private_key: Some("inline-key".to_string()),
            private_key_env: Some("TEST_SP_PRIVATE_KEY".to_string()),
            usages: vec![CredentialUsage::Signing],
            ..Default::default()
        };
        assert_eq!(entry.get_private_key().unwrap().as_deref(), Some("inline-key"));

        std::env::set_var("TEST_SP_PRIVATE_KEY", "env-key");
        assert_eq!(entry.get_private_key().unwrap().as_deref(), Some("env-key"));

        clean_env_vars();
    }

    #[test]
    #[serial]
    fn test_settings_dir_precedence() {
        clean_env_vars();

        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(SETTINGS_FILE_NAME), SETTINGS).unwrap();
        std::env::set_var(SETTINGS_DIR_ENV, dir.path());

        let settings = RegistrationSettings::load().unwrap();
        assert_eq!(settings.logging.level, "debug");
        assert!(settings.get_registration("simplesamlphp").is_some());

        // Environment variables override file values
        std::env::set_var("RUST_LOG", "trace");
        let settings = RegistrationSettings::load().unwrap();
        assert_eq!(settings.logging.level, "trace");

        clean_env_vars();
    }
}
