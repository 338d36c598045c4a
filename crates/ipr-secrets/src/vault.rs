//! Secret vault
//!
//! Handle id to plaintext map for one record, persisted as a JSON object
//! under a single private store key.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde_json::Value;

use crate::error::SecretError;
use crate::reference::SecretRef;
use crate::store::PrivateStore;

/// Handle to plaintext map
///
/// `Debug` never shows plaintext.
#[derive(Clone, Default, PartialEq)]
pub struct SecretVault {
    entries: BTreeMap<String, Value>,
}

impl SecretVault {
    /// Create empty vault
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the vault stored under `key`
    ///
    /// Nothing stored yet gives an empty vault.
    ///
    /// # Errors
    /// Returns error if the store fails or the blob is not a JSON object
    pub fn load<S>(store: &S, key: &str) -> Result<Self, SecretError>
    where
        S: PrivateStore + ?Sized,
    {
        let Some(bytes) = store.get_key(key)? else {
            return Ok(Self::new());
        };
        let entries: BTreeMap<String, Value> =
            serde_json::from_slice(&bytes).map_err(|e| SecretError::Corrupt {
                key: key.to_string(),
                message: e.to_string(),
            })?;
        Ok(Self { entries })
    }

    /// Store the vault under `key`
    ///
    /// # Errors
    /// Returns error if encoding or the store fails
    pub fn save<S>(&self, store: &mut S, key: &str) -> Result<(), SecretError>
    where
        S: PrivateStore + ?Sized,
    {
        let bytes =
            serde_json::to_vec(&self.entries).map_err(|e| SecretError::Encode(e.to_string()))?;
        store.set_key(key, bytes)?;
        Ok(())
    }

    /// Plaintext recorded for a handle
    #[inline]
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Value> {
        self.entries.get(id)
    }

    /// Record plaintext for a handle
    pub fn insert(&mut self, id: impl Into<String>, plaintext: Value) {
        self.entries.insert(id.into(), plaintext);
    }

    /// Plaintext for a reference
    ///
    /// A multi-value reference resolves only when every id is recorded.
    #[must_use]
    pub fn lookup(&self, reference: &SecretRef) -> Option<Value> {
        match reference {
            SecretRef::Single { id } => self.get(id).cloned(),
            SecretRef::Multi { ids } => ids
                .iter()
                .map(|id| self.get(id).cloned())
                .collect::<Option<Vec<_>>>()
                .map(Value::Array),
        }
    }

    /// Drop every entry whose handle is not in `live`
    ///
    /// Returns the number of entries dropped.
    pub fn prune(&mut self, live: &BTreeSet<String>) -> usize {
        let before = self.entries.len();
        self.entries.retain(|id, _| live.contains(id));
        before - self.entries.len()
    }

    /// Recorded handle ids
    pub fn handles(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Number of entries
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the vault is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for SecretVault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretVault")
            .field("handles", &self.entries.keys().collect::<Vec<_>>())
            .field("values", &"[redacted]")
            .finish()
    }
}
