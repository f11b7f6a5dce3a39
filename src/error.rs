//! Configuration error types
//!
//! Every failure raised while building a registration is a caller configuration
//! defect. They are reported once, at `build()` time, and never lazily from an
//! accessor.

use crate::credential::CredentialUsage;
use thiserror::Error;

/// Result type for registration construction.
pub type ConfigurationResult<T> = Result<T, ConfigurationError>;

/// A registration, provider details record or credential was configured incorrectly.
///
/// All variants are the same kind of failure (invalid configuration) and are
/// distinguished by the field they name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    /// A required string field is unset, empty or whitespace only.
    #[error("{field} cannot be empty")]
    MissingField { field: &'static str },

    /// A collection that must hold at least one element is empty.
    #[error("{field} cannot be empty")]
    EmptyCollection { field: &'static str },

    /// A collection entry resolved to nothing.
    #[error("{field} cannot have null values")]
    NullElement { field: &'static str },

    /// A credential sits in a bucket whose usage it does not declare.
    #[error("All {field} must have a usage of {usage} set")]
    UsageMismatch {
        field: &'static str,
        usage: CredentialUsage,
    },

    /// A credential declares a usage its key material cannot serve.
    #[error("{usage} usage is not supported for {kind} credentials")]
    UnsupportedUsage {
        usage: CredentialUsage,
        kind: &'static str,
    },
}

impl ConfigurationError {
    /// Name of the offending field (or credential kind)
    #[must_use]
    pub const fn field(&self) -> &'static str {
        match self {
            Self::MissingField { field }
            | Self::EmptyCollection { field }
            | Self::NullElement { field }
            | Self::UsageMismatch { field, .. } => field,
            Self::UnsupportedUsage { kind, .. } => kind,
        }
    }
}

/// Fail with [`ConfigurationError::MissingField`] unless `value` holds visible text.
pub(crate) fn require_text(value: Option<&str>, field: &'static str) -> ConfigurationResult<()> {
    match value {
        Some(text) if !text.trim().is_empty() => Ok(()),
        _ => Err(ConfigurationError::MissingField { field }),
    }
}
