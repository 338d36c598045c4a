//! Per-package defaults cache using moka
//!
//! Resolving defaults is pure, so the result for a package name and version
//! can be shared by every policy built from that package. The cache is an
//! explicit object owned by the caller; independent instances never share
//! entries.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use moka::sync::Cache;

use ipr_model::DefaultsMap;

use crate::descriptor::PackageDescriptor;
use crate::error::DefaultsError;
use crate::resolver::resolve_defaults;

/// Package identity a defaults map is cached under
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PackageKey {
    /// Package name
    pub name: String,
    /// Package version
    pub version: String,
}

impl PackageKey {
    /// Create key
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }
}

impl fmt::Display for PackageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.version)
    }
}

/// Where package descriptors come from
///
/// `Ok(None)` means the package is unknown, which resolves to no defaults.
pub trait PackageSource {
    /// Fetch the descriptor for a package
    ///
    /// # Errors
    /// Returns error if the lookup itself failed
    fn fetch(&self, key: &PackageKey) -> Result<Option<PackageDescriptor>, DefaultsError>;
}

impl<F> PackageSource for F
where
    F: Fn(&PackageKey) -> Result<Option<PackageDescriptor>, DefaultsError>,
{
    fn fetch(&self, key: &PackageKey) -> Result<Option<PackageDescriptor>, DefaultsError> {
        self(key)
    }
}

/// Statistics for cache monitoring
#[derive(Debug, Clone, Copy, Default)]
pub struct CacheStats {
    /// Number of entries in cache
    pub entry_count: u64,
}

/// Defaults cache keyed by package
///
/// Safe for concurrent population: racing callers for the same key are
/// coalesced into one resolution, readers only ever observe complete
/// entries, and failed resolutions are not cached.
#[derive(Debug, Clone)]
pub struct DefaultsCache {
    inner: Cache<PackageKey, Arc<DefaultsMap>>,
}

impl DefaultsCache {
    /// Create cache with max capacity (packages)
    #[inline]
    #[must_use]
    pub fn new(max_capacity: u64) -> Self {
        Self {
            inner: Cache::new(max_capacity),
        }
    }

    /// Create cache with time-based expiration
    #[inline]
    #[must_use]
    pub fn with_ttl(max_capacity: u64, ttl: Duration) -> Self {
        Self {
            inner: Cache::builder()
                .max_capacity(max_capacity)
                .time_to_live(ttl)
                .build(),
        }
    }

    /// Cached defaults for a package
    #[inline]
    #[must_use]
    pub fn get(&self, key: &PackageKey) -> Option<Arc<DefaultsMap>> {
        self.inner.get(key)
    }

    /// Cached defaults, resolving from `source` on a miss
    ///
    /// # Errors
    /// Returns error if the source fails or the descriptor is malformed
    pub fn get_or_resolve(
        &self,
        key: &PackageKey,
        source: &dyn PackageSource,
    ) -> Result<Arc<DefaultsMap>, DefaultsError> {
        self.try_get_or_insert_with(key, || {
            let descriptor = source.fetch(key)?;
            resolve_defaults(descriptor.as_ref())
        })
    }

    /// Cached defaults, computing them with `f` on a miss
    ///
    /// # Errors
    /// Returns the error of `f`; nothing is cached in that case
    pub fn try_get_or_insert_with<F>(
        &self,
        key: &PackageKey,
        f: F,
    ) -> Result<Arc<DefaultsMap>, DefaultsError>
    where
        F: FnOnce() -> Result<DefaultsMap, DefaultsError>,
    {
        if let Some(cached) = self.inner.get(key) {
            tracing::trace!(package = %key, "defaults cache hit");
            return Ok(cached);
        }

        self.inner
            .try_get_with(key.clone(), || {
                tracing::debug!(package = %key, "resolving package defaults");
                f().map(Arc::new)
            })
            .map_err(|e| (*e).clone())
    }

    /// Invalidate cache entry
    #[inline]
    pub fn invalidate(&self, key: &PackageKey) {
        self.inner.invalidate(key);
    }

    /// Invalidate all entries
    #[inline]
    pub fn invalidate_all(&self) {
        self.inner.invalidate_all();
    }

    /// Get cache statistics
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        self.inner.run_pending_tasks();
        CacheStats {
            entry_count: self.inner.entry_count(),
        }
    }
}

impl Default for DefaultsCache {
    /// Create cache with default capacity (1,000 packages)
    fn default() -> Self {
        Self::new(1_000)
    }
}
