//! Error types for semantic equality

use ipr_model::Diagnostics;

/// Errors while comparing records
#[derive(Debug, Clone, thiserror::Error)]
pub enum EqualityError {
    /// One or more fields could not be parsed or merged
    #[error("cannot compare records: {0}")]
    Malformed(#[from] Diagnostics),
}

impl EqualityError {
    /// Every field error found
    #[must_use]
    pub fn diagnostics(&self) -> &Diagnostics {
        match self {
            Self::Malformed(diags) => diags,
        }
    }
}
