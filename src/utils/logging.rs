// Centralized logging for registration construction and settings loading
use crate::credential::{CategorizedCredentials, Credential};
use crate::error::ConfigurationError;
use crate::registration::Registration;
use env_logger::Env;
use log::{debug, info, warn, LevelFilter};
use std::path::Path;

/// Install `env_logger` before any settings are read.
///
/// When `RUST_LOG` is set its directives filter records as usual. Otherwise
/// the logger accepts every record and the global maximum starts at `level`;
/// [`apply_log_level`] can move it once the configured level is known.
///
/// # Errors
///
/// Returns an error if a global logger has already been installed
pub fn init_logging(level: &str) -> Result<(), log::SetLoggerError> {
    let rust_log_set = std::env::var_os(env_logger::DEFAULT_FILTER_ENV).is_some();
    env_logger::Builder::from_env(Env::default().default_filter_or("trace")).try_init()?;
    if !rust_log_set {
        apply_log_level(level);
    }
    Ok(())
}

/// Set the global maximum log level from a plain level name such as `debug`.
///
/// Anything that is not a single level (a `RUST_LOG` directive list, a typo)
/// leaves the current maximum alone.
pub fn apply_log_level(level: &str) {
    if let Ok(filter) = level.parse::<LevelFilter>() {
        log::set_max_level(filter);
    }
}

pub struct LoggingHelper;

impl LoggingHelper {
    /// Log a successfully built registration; only fingerprints are logged
    pub fn log_registration_built(registration: &Registration) {
        let details = registration.provider_details();
        debug!(
            "Built registration {} (entity_id={}, acs={}, signing={:?}, decryption={:?})",
            registration.registration_id(),
            registration.entity_id(),
            registration.assertion_consumer_service_location(),
            Self::fingerprints(registration.signing_x509_credentials()),
            Self::fingerprints(registration.decryption_x509_credentials()),
        );
        debug!(
            "Asserting party for {}: entity_id={}, sso={} ({}), wants_authn_requests_signed={}, verification={:?}, encryption={:?}",
            registration.registration_id(),
            details.entity_id(),
            details.single_sign_on_service_location(),
            details.single_sign_on_service_binding(),
            details.wants_authn_requests_signed(),
            Self::fingerprints(details.verification_x509_credentials()),
            Self::fingerprints(details.encryption_x509_credentials()),
        );
    }

    /// Log that the deprecated flat credential list was sorted into buckets
    pub fn log_legacy_credentials_reconciled(
        registration_id: &str,
        categorized: &CategorizedCredentials,
    ) {
        warn!(
            "Registration {registration_id} uses the deprecated flat credentials list; \
             reconciled into signing={}, decryption={}, verification={}, encryption={}",
            categorized.signing.len(),
            categorized.decryption.len(),
            categorized.verification.len(),
            categorized.encryption.len(),
        );
    }

    /// Log a rejected build with the offending field
    pub fn log_registration_rejected(registration_id: &str, error: &ConfigurationError) {
        warn!(
            "Rejected registration {registration_id:?}: {error} (field: {})",
            error.field()
        );
    }

    /// Log the settings file a configuration was read from
    pub fn log_settings_loaded(path: &Path) {
        info!("✓ Loaded registration settings from {}", path.display());
    }

    /// Log a settings directory override that had no settings file
    pub fn log_settings_dir_without_file(path: &Path) {
        info!(
            "ℹ SAML_SETTINGS_DIR set but no Settings.toml found at: {}",
            path.display()
        );
    }

    fn fingerprints(credentials: &[Credential]) -> Vec<String> {
        credentials.iter().map(Credential::fingerprint).collect()
    }
}
