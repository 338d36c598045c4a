//! Error types for defaults resolution

use ipr_model::Diagnostics;

/// Errors while resolving package defaults
///
/// `Clone` so a failed cache population can be handed to every waiting caller.
#[derive(Debug, Clone, thiserror::Error)]
pub enum DefaultsError {
    /// Descriptor did not decode
    #[error("malformed package descriptor: {0}")]
    Descriptor(String),

    /// Descriptor decoded but has the wrong shape
    #[error("malformed package descriptor: {0}")]
    Shape(Diagnostics),

    /// The package source failed
    #[error("package source failed for {package}: {message}")]
    Source {
        /// Package the lookup was for
        package: String,
        /// Source-specific message
        message: String,
    },
}

impl DefaultsError {
    /// Create descriptor decode error
    #[must_use]
    pub fn descriptor(source: &serde_json::Error) -> Self {
        Self::Descriptor(source.to_string())
    }

    /// Create package source error
    pub fn source_failed(package: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Source {
            package: package.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_error_display() {
        let err = DefaultsError::source_failed("nginx@1.2.0", "connection refused");
        assert_eq!(
            err.to_string(),
            "package source failed for nginx@1.2.0: connection refused"
        );
    }

    #[test]
    fn descriptor_error_display() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = DefaultsError::descriptor(&json_err);
        assert!(err.to_string().starts_with("malformed package descriptor"));
    }
}
