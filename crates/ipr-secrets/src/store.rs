//! Private store seam
//!
//! Byte-blob storage scoped to one record instance. The vault only ever
//! reads and writes its own key; every other key belongs to the caller.

use std::collections::BTreeMap;

use crate::error::StoreError;

/// Per-record key-value store
pub trait PrivateStore {
    /// Read the blob under `key`
    ///
    /// `Ok(None)` means nothing was stored yet.
    ///
    /// # Errors
    /// Returns error if the backend fails
    fn get_key(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    /// Replace the blob under `key`
    ///
    /// # Errors
    /// Returns error if the backend fails or refuses the write
    fn set_key(&mut self, key: &str, value: Vec<u8>) -> Result<(), StoreError>;
}

/// In-memory store, for tests and offline tools
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InMemoryPrivateStore {
    entries: BTreeMap<String, Vec<u8>>,
}

impl InMemoryPrivateStore {
    /// Create empty store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is stored
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Stored keys
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

impl PrivateStore for InMemoryPrivateStore {
    fn get_key(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set_key(&mut self, key: &str, value: Vec<u8>) -> Result<(), StoreError> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_key_is_none() {
        let store = InMemoryPrivateStore::new();
        assert_eq!(store.get_key("secrets").unwrap(), None);
        assert!(store.is_empty());
    }

    #[test]
    fn set_then_get() {
        let mut store = InMemoryPrivateStore::new();
        store.set_key("secrets", b"{}".to_vec()).unwrap();
        store.set_key("other", b"x".to_vec()).unwrap();
        assert_eq!(store.get_key("secrets").unwrap(), Some(b"{}".to_vec()));
        assert_eq!(store.keys().collect::<Vec<_>>(), vec!["other", "secrets"]);
    }
}
