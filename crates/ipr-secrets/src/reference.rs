//! Secret reference decoding
//!
//! A response var value is one of:
//!
//! - a plain JSON value
//! - a reference handle `{"isSecretRef": true, "id": "..."}` or
//!   `{"isSecretRef": true, "ids": ["...", ...]}`
//! - either of the above wrapped one level as `{"type": "...", "value": ...}`
//!
//! [`decode_var`] is the only place that tells these apart.

use serde::Deserialize;
use serde_json::Value;

const WRAPPER_FIELD: &str = "value";
const MARKER_FIELD: &str = "isSecretRef";

/// Opaque handle a server returns in place of a secret value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecretRef {
    /// Handle for a single value
    Single {
        /// Handle id
        id: String,
    },
    /// One handle per element of a list value
    Multi {
        /// Handle ids, in list order
        ids: Vec<String>,
    },
}

impl SecretRef {
    /// Every handle id carried
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        let (single, multi) = match self {
            Self::Single { id } => (Some(id.as_str()), &[][..]),
            Self::Multi { ids } => (None, ids.as_slice()),
        };
        single.into_iter().chain(multi.iter().map(String::as_str))
    }
}

/// Decoded response var value
#[derive(Debug, Clone, PartialEq)]
pub enum VarValue<'a> {
    /// Ordinary value, already unwrapped
    Plain(&'a Value),
    /// Secret reference handle
    Secret(SecretRef),
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSecretRef {
    is_secret_ref: bool,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    ids: Option<Vec<String>>,
}

/// Decode one response var value
#[must_use]
pub fn decode_var(raw: &Value) -> VarValue<'_> {
    let inner = unwrapped(raw);
    match as_secret_ref(inner) {
        Some(reference) => VarValue::Secret(reference),
        None => VarValue::Plain(inner),
    }
}

/// The slot [`decode_var`] looked at: the wrapped value, or `raw` itself
pub(crate) fn leaf_mut(raw: &mut Value) -> &mut Value {
    if is_wrapper(raw) {
        &mut raw[WRAPPER_FIELD]
    } else {
        raw
    }
}

fn unwrapped(raw: &Value) -> &Value {
    match raw {
        Value::Object(map) => map.get(WRAPPER_FIELD).unwrap_or(raw),
        _ => raw,
    }
}

fn is_wrapper(raw: &Value) -> bool {
    matches!(raw, Value::Object(map) if map.contains_key(WRAPPER_FIELD))
}

fn as_secret_ref(value: &Value) -> Option<SecretRef> {
    let Value::Object(map) = value else {
        return None;
    };
    if !map.contains_key(MARKER_FIELD) {
        return None;
    }
    let raw = RawSecretRef::deserialize(value).ok()?;
    if !raw.is_secret_ref {
        return None;
    }
    match (raw.id, raw.ids) {
        (Some(id), _) => Some(SecretRef::Single { id }),
        (None, Some(ids)) => Some(SecretRef::Multi { ids }),
        (None, None) => None,
    }
}
