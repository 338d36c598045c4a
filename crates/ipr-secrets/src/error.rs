//! Error types for secret resolution

use ipr_model::Diagnostics;

/// Errors from a private store backend
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// Backend could not serve the request
    #[error("private store unavailable: {0}")]
    Unavailable(String),

    /// Backend refused the write
    #[error("private store rejected write to {key:?}: {message}")]
    Rejected {
        /// Key being written
        key: String,
        /// Backend message
        message: String,
    },
}

/// Errors while resolving secret references
#[derive(Debug, Clone, thiserror::Error)]
pub enum SecretError {
    /// Private store failed
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Stored vault could not be decoded
    #[error("stored vault under {key:?} is corrupt: {message}")]
    Corrupt {
        /// Store key
        key: String,
        /// Decoder message
        message: String,
    },

    /// Vault could not be encoded for storage
    #[error("cannot encode vault: {0}")]
    Encode(String),

    /// Request and response disagree on one or more secret values
    #[error("cannot resolve secret references: {0}")]
    Malformed(Diagnostics),
}

impl SecretError {
    /// Field errors, if the failure was per-field
    #[must_use]
    pub fn diagnostics(&self) -> Option<&Diagnostics> {
        match self {
            Self::Malformed(diags) => Some(diags),
            _ => None,
        }
    }
}
