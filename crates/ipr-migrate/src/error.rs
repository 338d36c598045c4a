//! Error types for schema migration

use ipr_model::Diagnostics;

/// Errors while upgrading a stored record
#[derive(Debug, Clone, thiserror::Error)]
pub enum MigrationError {
    /// No converter starts at the recorded version
    #[error("no migration from version {from} (current is {current})")]
    UnsupportedVersion {
        /// Recorded version
        from: u32,
        /// Latest known version
        current: u32,
    },

    /// Stored record does not have the shape of its recorded version
    #[error("record is not a valid version {version} policy: {message}")]
    Decode {
        /// Recorded version
        version: u32,
        /// Decoder message
        message: String,
    },

    /// One or more fields failed to convert
    #[error("migration {from} -> {to} failed: {diagnostics}")]
    Malformed {
        /// Source version
        from: u32,
        /// Target version
        to: u32,
        /// Every field that failed
        diagnostics: Diagnostics,
    },

    /// Converted record could not be re-encoded
    #[error("cannot encode version {version} record: {message}")]
    Encode {
        /// Target version
        version: u32,
        /// Encoder message
        message: String,
    },
}

impl MigrationError {
    /// Decode failure for `version`
    pub fn decode(version: u32, source: &serde_json::Error) -> Self {
        Self::Decode {
            version,
            message: source.to_string(),
        }
    }

    /// Encode failure for `version`
    pub fn encode(version: u32, source: &serde_json::Error) -> Self {
        Self::Encode {
            version,
            message: source.to_string(),
        }
    }

    /// Field errors, if the failure was per-field
    #[must_use]
    pub fn diagnostics(&self) -> Option<&Diagnostics> {
        match self {
            Self::Malformed { diagnostics, .. } => Some(diagnostics),
            _ => None,
        }
    }
}
