//! Error types for IPR Core

use ipr_defaults::DefaultsError;
use ipr_equality::EqualityError;
use ipr_migrate::MigrationError;
use ipr_model::Diagnostics;
use ipr_secrets::SecretError;

/// Main reconciler error type
#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    /// Package defaults could not be resolved
    #[error("defaults: {0}")]
    Defaults(#[from] DefaultsError),

    /// Records could not be compared
    #[error("equality: {0}")]
    Equality(#[from] EqualityError),

    /// Stored record could not be upgraded
    #[error("migration: {0}")]
    Migration(#[from] MigrationError),

    /// Secret references could not be resolved
    #[error("secrets: {0}")]
    Secret(#[from] SecretError),

    /// Record could not be converted to its wire form
    #[error("invalid record: {0}")]
    InvalidRecord(Diagnostics),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),
}

impl ReconcileError {
    /// Every field error behind this failure, if it was per-field
    #[must_use]
    pub fn diagnostics(&self) -> Option<&Diagnostics> {
        match self {
            Self::Defaults(DefaultsError::Shape(diags))
            | Self::InvalidRecord(diags) => Some(diags),
            Self::Equality(e) => Some(e.diagnostics()),
            Self::Migration(e) => e.diagnostics(),
            Self::Secret(e) => e.diagnostics(),
            Self::Defaults(_) | Self::Config(_) => None,
        }
    }
}

/// Result type for reconciler operations
pub type ReconcileResult<T> = Result<T, ReconcileError>;
