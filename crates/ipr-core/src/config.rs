//! Reconciler configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

use ipr_defaults::DefaultsCache;
use ipr_secrets::{SecretResolver, DEFAULT_SECRETS_KEY};

use crate::error::{ReconcileError, ReconcileResult};

/// Reconciler configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcileConfig {
    /// Maximum packages kept in the defaults cache
    pub defaults_cache_capacity: u64,
    /// Defaults cache entry lifetime in seconds; `None` keeps entries until evicted
    pub defaults_cache_ttl_secs: Option<u64>,
    /// Private store key reserved for the secret vault
    pub secrets_key: String,
    /// Record a response `vars` map with no keys as unset
    pub empty_vars_as_unset: bool,
}

impl ReconcileConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from TOML
    ///
    /// Missing keys take their default.
    ///
    /// # Errors
    /// Returns error if the TOML is invalid or a key has the wrong type
    pub fn from_toml_str(text: &str) -> ReconcileResult<Self> {
        toml::from_str(text).map_err(|e| ReconcileError::Config(e.to_string()))
    }

    /// With defaults cache capacity
    #[inline]
    #[must_use]
    pub fn with_cache_capacity(mut self, capacity: u64) -> Self {
        self.defaults_cache_capacity = capacity;
        self
    }

    /// With defaults cache entry lifetime
    #[inline]
    #[must_use]
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.defaults_cache_ttl_secs = Some(ttl.as_secs());
        self
    }

    /// With secret vault store key
    #[inline]
    #[must_use]
    pub fn with_secrets_key(mut self, key: impl Into<String>) -> Self {
        self.secrets_key = key.into();
        self
    }

    /// With handling of empty response vars
    #[inline]
    #[must_use]
    pub fn with_empty_vars_as_unset(mut self, unset: bool) -> Self {
        self.empty_vars_as_unset = unset;
        self
    }

    /// Check values
    ///
    /// # Errors
    /// Returns error if the vault key is empty or the cache cannot hold an entry
    pub fn validate(&self) -> ReconcileResult<()> {
        if self.secrets_key.is_empty() {
            return Err(ReconcileError::Config("secrets_key must not be empty".to_string()));
        }
        if self.defaults_cache_capacity == 0 {
            return Err(ReconcileError::Config(
                "defaults_cache_capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Defaults cache sized by this configuration
    #[must_use]
    pub fn build_cache(&self) -> DefaultsCache {
        match self.defaults_cache_ttl_secs {
            Some(secs) => {
                DefaultsCache::with_ttl(self.defaults_cache_capacity, Duration::from_secs(secs))
            }
            None => DefaultsCache::new(self.defaults_cache_capacity),
        }
    }

    /// Secret resolver using the configured vault key
    #[must_use]
    pub fn build_secrets(&self) -> SecretResolver {
        SecretResolver::new(self.secrets_key.clone())
    }
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            defaults_cache_capacity: 1_000,
            defaults_cache_ttl_secs: None,
            secrets_key: DEFAULT_SECRETS_KEY.to_string(),
            empty_vars_as_unset: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = ReconcileConfig::new();
        assert_eq!(config.defaults_cache_capacity, 1_000);
        assert_eq!(config.defaults_cache_ttl_secs, None);
        assert_eq!(config.secrets_key, "secrets");
        assert!(config.empty_vars_as_unset);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn builder() {
        let config = ReconcileConfig::new()
            .with_cache_capacity(10)
            .with_cache_ttl(Duration::from_secs(60))
            .with_secrets_key("vault")
            .with_empty_vars_as_unset(false);
        assert_eq!(config.defaults_cache_capacity, 10);
        assert_eq!(config.defaults_cache_ttl_secs, Some(60));
        assert_eq!(config.build_secrets().key(), "vault");
        assert!(!config.empty_vars_as_unset);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = ReconcileConfig::from_toml_str(
            r#"
            defaults_cache_ttl_secs = 300
            secrets_key = "vault"
            "#,
        )
        .unwrap();
        assert_eq!(config.defaults_cache_capacity, 1_000);
        assert_eq!(config.defaults_cache_ttl_secs, Some(300));
        assert_eq!(config.secrets_key, "vault");
        assert!(config.empty_vars_as_unset);
    }

    #[test]
    fn wrong_type_is_a_config_error() {
        let err = ReconcileConfig::from_toml_str("empty_vars_as_unset = \"yes\"").unwrap_err();
        assert!(matches!(err, ReconcileError::Config(_)));
    }

    #[test]
    fn empty_vault_key_is_rejected() {
        let config = ReconcileConfig::new().with_secrets_key("");
        assert!(config.validate().is_err());
    }
}
