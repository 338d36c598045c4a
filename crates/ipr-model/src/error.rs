//! Per-field errors and their accumulation
//!
//! Every pass over a record collects [`FieldError`]s into [`Diagnostics`]
//! instead of stopping at the first problem, so a single run reports every
//! malformed field.

use std::fmt;

/// Location of a field inside a policy record
///
/// Rendered as `inputs["nginx-logfile"].streams["nginx.access"].vars`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct FieldPath {
    segments: Vec<Segment>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Segment {
    Attr(String),
    Key(String),
    Index(usize),
}

impl FieldPath {
    /// Empty path (the record itself)
    #[inline]
    #[must_use]
    pub fn root() -> Self {
        Self::default()
    }

    /// Path starting at a top-level attribute
    #[inline]
    #[must_use]
    pub fn attr(name: impl Into<String>) -> Self {
        Self::root().child(name)
    }

    /// Append an attribute segment
    #[inline]
    #[must_use]
    pub fn child(mut self, name: impl Into<String>) -> Self {
        self.segments.push(Segment::Attr(name.into()));
        self
    }

    /// Append a map key segment
    #[inline]
    #[must_use]
    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.segments.push(Segment::Key(key.into()));
        self
    }

    /// Append a list index segment
    #[inline]
    #[must_use]
    pub fn index(mut self, index: usize) -> Self {
        self.segments.push(Segment::Index(index));
        self
    }

    /// Whether this is the root path
    #[inline]
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return f.write_str("<record>");
        }
        for (i, segment) in self.segments.iter().enumerate() {
            match segment {
                Segment::Attr(name) if i == 0 => write!(f, "{name}")?,
                Segment::Attr(name) => write!(f, ".{name}")?,
                Segment::Key(key) => write!(f, "[{key:?}]")?,
                Segment::Index(index) => write!(f, "[{index}]")?,
            }
        }
        Ok(())
    }
}

/// What went wrong with a field
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FieldErrorKind {
    /// Value is not valid JSON
    #[error("invalid JSON: {0}")]
    InvalidJson(String),

    /// JSON is valid but not an object where one is required
    #[error("expected a JSON object, found {found}")]
    NotAnObject {
        /// JSON type actually found
        found: &'static str,
    },

    /// JSON object does not have the expected shape
    #[error("unexpected shape: {0}")]
    Shape(String),

    /// Key appears more than once where it must be unique
    #[error("duplicate key {0:?}")]
    DuplicateKey(String),

    /// Secret handle list and plaintext list differ in length
    #[error("secret reference lists {handles} ids but the request holds {values} values")]
    SecretCardinality {
        /// Number of handle ids in the response
        handles: usize,
        /// Number of plaintext values in the request
        values: usize,
    },

    /// Multi-value secret handle against a scalar request value
    #[error("multi-value secret reference against a non-list request value")]
    SecretNotAList,
}

/// Error attached to a field location
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{path}: {kind}")]
pub struct FieldError {
    /// Where the error occurred
    pub path: FieldPath,
    /// What went wrong
    pub kind: FieldErrorKind,
}

impl FieldError {
    /// Create error at path
    #[inline]
    #[must_use]
    pub fn new(path: FieldPath, kind: FieldErrorKind) -> Self {
        Self { path, kind }
    }

    /// Invalid JSON at path
    #[inline]
    #[must_use]
    pub fn invalid_json(path: FieldPath, source: &serde_json::Error) -> Self {
        Self::new(path, FieldErrorKind::InvalidJson(source.to_string()))
    }

    /// Non-object JSON at path where an object is required
    #[must_use]
    pub fn not_an_object(path: FieldPath, found: &serde_json::Value) -> Self {
        Self::new(
            path,
            FieldErrorKind::NotAnObject {
                found: crate::normalized::json_type_name(found),
            },
        )
    }
}

/// Accumulated field errors from one pass
///
/// Empty diagnostics mean success; [`Diagnostics::finish`] turns them into
/// a `Result`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics {
    errors: Vec<FieldError>,
}

impl Diagnostics {
    /// Create empty diagnostics
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an error
    #[inline]
    pub fn push(&mut self, error: FieldError) {
        self.errors.push(error);
    }

    /// Record every error from another pass
    #[inline]
    pub fn append(&mut self, other: Diagnostics) {
        self.errors.extend(other.errors);
    }

    /// Keep the value of a fallible step, recording its errors
    ///
    /// Returns `None` when the step failed.
    #[inline]
    pub fn absorb<T>(&mut self, result: Result<T, Diagnostics>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(errors) => {
                self.append(errors);
                None
            }
        }
    }

    /// Whether no errors were recorded
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Number of errors
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Iterate over errors
    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.errors.iter()
    }

    /// `Ok(value)` if no errors were recorded
    ///
    /// # Errors
    /// Returns `self` if any error was recorded
    #[inline]
    pub fn finish<T>(self, value: T) -> Result<T, Self> {
        if self.errors.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

impl From<FieldError> for Diagnostics {
    fn from(error: FieldError) -> Self {
        Self {
            errors: vec![error],
        }
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.errors.as_slice() {
            [] => f.write_str("no errors"),
            [single] => write!(f, "{single}"),
            many => {
                write!(f, "{} errors: ", many.len())?;
                for (i, error) in many.iter().enumerate() {
                    if i > 0 {
                        f.write_str("; ")?;
                    }
                    write!(f, "{error}")?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for Diagnostics {}

impl IntoIterator for Diagnostics {
    type Item = FieldError;
    type IntoIter = std::vec::IntoIter<FieldError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_path_display() {
        let path = FieldPath::attr("inputs")
            .key("nginx-logfile")
            .child("streams")
            .key("nginx.access")
            .child("vars");
        assert_eq!(
            path.to_string(),
            r#"inputs["nginx-logfile"].streams["nginx.access"].vars"#
        );
    }

    #[test]
    fn field_path_index() {
        let path = FieldPath::attr("input").index(2).child("streams_json");
        assert_eq!(path.to_string(), "input[2].streams_json");
        assert!(FieldPath::root().is_root());
    }

    #[test]
    fn diagnostics_finish() {
        let diags = Diagnostics::new();
        assert_eq!(diags.finish(7), Ok(7));

        let mut diags = Diagnostics::new();
        diags.push(FieldError::new(
            FieldPath::attr("vars_json"),
            FieldErrorKind::NotAnObject { found: "array" },
        ));
        let err = diags.finish(()).unwrap_err();
        assert_eq!(err.len(), 1);
        assert_eq!(
            err.to_string(),
            "vars_json: expected a JSON object, found array"
        );
    }

    #[test]
    fn diagnostics_display_many() {
        let mut diags = Diagnostics::new();
        diags.push(FieldError::new(
            FieldPath::attr("a"),
            FieldErrorKind::DuplicateKey("x".to_string()),
        ));
        diags.push(FieldError::new(
            FieldPath::attr("b"),
            FieldErrorKind::SecretNotAList,
        ));
        assert!(diags.to_string().starts_with("2 errors: a: duplicate key"));
    }

    #[test]
    fn diagnostics_absorb() {
        let mut diags = Diagnostics::new();
        assert_eq!(diags.absorb(Ok::<_, Diagnostics>(1)), Some(1));
        let failed: Result<i32, Diagnostics> = Err(FieldError::new(
            FieldPath::attr("x"),
            FieldErrorKind::Shape("bad".to_string()),
        )
        .into());
        assert_eq!(diags.absorb(failed), None);
        assert_eq!(diags.len(), 1);
    }
}
