//! Normalized JSON values
//!
//! A JSON document kept as text exactly as it was declared or stored, but
//! compared by parsed structure. Whitespace and key order never count as a
//! difference.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::error::{FieldError, FieldPath};

/// JSON object map
pub type JsonObject = serde_json::Map<String, Value>;

/// JSON document held as text
///
/// `Null` means the field was left unset; `Unknown` is the transient
/// "not yet computed" state and is never persisted (it serializes as null).
///
/// Equality rules:
/// - two values compare by parsed structure
/// - `Null == Null` and `Unknown == Unknown`
/// - `Null` never equals `Unknown`, in either order
/// - anything else falls back to raw equality
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum NormalizedJson {
    /// Field is unset
    #[default]
    Null,
    /// Value is not known yet
    Unknown,
    /// JSON text
    Value(String),
}

impl NormalizedJson {
    /// Create from JSON text (not validated)
    #[inline]
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self::Value(text.into())
    }

    /// Unset value
    #[inline]
    #[must_use]
    pub fn null() -> Self {
        Self::Null
    }

    /// Not-yet-known value
    #[inline]
    #[must_use]
    pub fn unknown() -> Self {
        Self::Unknown
    }

    /// Create from a parsed JSON value (compact serialization)
    #[must_use]
    pub fn from_value(value: &Value) -> Self {
        Self::Value(value.to_string())
    }

    /// Create from a JSON object map
    #[inline]
    #[must_use]
    pub fn from_object(object: JsonObject) -> Self {
        Self::from_value(&Value::Object(object))
    }

    /// Treat an empty string as unset
    ///
    /// Older records stored "no value" as `""`.
    #[must_use]
    pub fn from_legacy(text: Option<&str>) -> Self {
        match text {
            None | Some("") => Self::Null,
            Some(text) => Self::new(text),
        }
    }

    /// Whether the field is unset
    #[inline]
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Whether the value is not yet known
    #[inline]
    #[must_use]
    pub fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown)
    }

    /// Raw JSON text, if known and set
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Value(text) => Some(text),
            Self::Null | Self::Unknown => None,
        }
    }

    /// Parse the JSON text
    ///
    /// Returns `None` for unset or unknown values.
    ///
    /// # Errors
    /// Returns error if the text is not valid JSON
    pub fn parse(&self) -> Result<Option<Value>, serde_json::Error> {
        self.as_str().map(serde_json::from_str::<Value>).transpose()
    }

    /// Parse the JSON text as an object, labelling failures with `path`
    ///
    /// # Errors
    /// Returns error if the text is not valid JSON or not an object
    pub fn parse_object(&self, path: &FieldPath) -> Result<Option<JsonObject>, FieldError> {
        match self.parse() {
            Ok(None) => Ok(None),
            Ok(Some(Value::Object(object))) => Ok(Some(object)),
            Ok(Some(other)) => Err(FieldError::not_an_object(path.clone(), &other)),
            Err(e) => Err(FieldError::invalid_json(path.clone(), &e)),
        }
    }

    /// Structural equality
    ///
    /// # Errors
    /// Returns error if either side holds invalid JSON
    pub fn semantically_equal(&self, other: &Self) -> Result<bool, serde_json::Error> {
        match (self, other) {
            (Self::Value(a), Self::Value(b)) => {
                if a == b {
                    return Ok(true);
                }
                let a: Value = serde_json::from_str(a)?;
                let b: Value = serde_json::from_str(b)?;
                Ok(a == b)
            }
            _ => Ok(self == other),
        }
    }

    /// Structural equality, labelling failures with `path`
    ///
    /// # Errors
    /// Returns error if either side holds invalid JSON
    pub fn semantically_equal_at(&self, other: &Self, path: &FieldPath) -> Result<bool, FieldError> {
        self.semantically_equal(other)
            .map_err(|e| FieldError::invalid_json(path.clone(), &e))
    }
}

impl From<&str> for NormalizedJson {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

impl From<Option<String>> for NormalizedJson {
    fn from(text: Option<String>) -> Self {
        text.map_or(Self::Null, Self::Value)
    }
}

impl Serialize for NormalizedJson {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Value(text) => serializer.serialize_some(text),
            Self::Null | Self::Unknown => serializer.serialize_none(),
        }
    }
}

impl<'de> Deserialize<'de> for NormalizedJson {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Option::<String>::deserialize(deserializer).map(Self::from)
    }
}

/// Name of a JSON value's type, for messages
#[must_use]
pub(crate) fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FieldErrorKind;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn whitespace_is_ignored() {
        let a = NormalizedJson::new(r#"{"a":"b"}"#);
        let b = NormalizedJson::new(r#"{"a": "b"}"#);
        assert!(a.semantically_equal(&b).unwrap());
    }

    #[test]
    fn different_values_differ() {
        let a = NormalizedJson::new(r#"{"a":"b"}"#);
        let b = NormalizedJson::new(r#"{"a":"c"}"#);
        assert!(!a.semantically_equal(&b).unwrap());
    }

    #[test]
    fn key_order_is_ignored() {
        let a = NormalizedJson::new(r#"{"x":1,"y":[1,2]}"#);
        let b = NormalizedJson::new(r#"{"y":[1,2],"x":1}"#);
        assert!(a.semantically_equal(&b).unwrap());
    }

    #[test]
    fn null_and_unknown_rules() {
        let null = NormalizedJson::null();
        let unknown = NormalizedJson::unknown();
        assert!(null.semantically_equal(&NormalizedJson::Null).unwrap());
        assert!(unknown.semantically_equal(&NormalizedJson::Unknown).unwrap());
        assert!(!null.semantically_equal(&unknown).unwrap());
        assert!(!unknown.semantically_equal(&null).unwrap());
    }

    #[test]
    fn null_vs_empty_object_is_raw_inequality() {
        let null = NormalizedJson::null();
        let empty = NormalizedJson::new("{}");
        assert!(!null.semantically_equal(&empty).unwrap());
        assert!(!empty.semantically_equal(&null).unwrap());
    }

    #[test]
    fn invalid_json_is_an_error() {
        let a = NormalizedJson::new("{not json");
        let b = NormalizedJson::new("{}");
        assert!(a.semantically_equal(&b).is_err());

        let err = a
            .semantically_equal_at(&b, &FieldPath::attr("vars_json"))
            .unwrap_err();
        assert_eq!(err.path, FieldPath::attr("vars_json"));
    }

    #[test]
    fn identical_text_short_circuits() {
        // Identical text is equal even when it would not parse
        let a = NormalizedJson::new("{not json");
        assert!(a.semantically_equal(&a.clone()).unwrap());
    }

    #[test]
    fn parse_object_rejects_non_objects() {
        let path = FieldPath::attr("vars");
        let err = NormalizedJson::new("[1]").parse_object(&path).unwrap_err();
        assert_eq!(err.kind, FieldErrorKind::NotAnObject { found: "array" });
        assert_eq!(NormalizedJson::Null.parse_object(&path).unwrap(), None);
    }

    #[test]
    fn legacy_empty_string_is_null() {
        assert_eq!(NormalizedJson::from_legacy(Some("")), NormalizedJson::Null);
        assert_eq!(NormalizedJson::from_legacy(None), NormalizedJson::Null);
        assert_eq!(
            NormalizedJson::from_legacy(Some("{}")),
            NormalizedJson::new("{}")
        );
    }

    #[test]
    fn serde_as_optional_string() {
        let value = NormalizedJson::new(r#"{"a":1}"#);
        assert_eq!(serde_json::to_value(&value).unwrap(), json!(r#"{"a":1}"#));
        assert_eq!(serde_json::to_value(NormalizedJson::Null).unwrap(), json!(null));
        assert_eq!(serde_json::to_value(NormalizedJson::Unknown).unwrap(), json!(null));

        let back: NormalizedJson = serde_json::from_value(json!(null)).unwrap();
        assert!(back.is_null());
    }

    proptest! {
        #[test]
        fn prop_formatting_never_matters(
            entries in proptest::collection::btree_map("[a-z]{1,6}", any::<i64>(), 0..6)
        ) {
            let value = serde_json::to_value(&entries).unwrap();
            let compact = NormalizedJson::new(serde_json::to_string(&value).unwrap());
            let pretty = NormalizedJson::new(serde_json::to_string_pretty(&value).unwrap());
            prop_assert!(compact.semantically_equal(&pretty).unwrap());
            prop_assert!(pretty.semantically_equal(&compact).unwrap());
        }
    }
}
