//! Stream-level equality

use std::collections::BTreeMap;

use ipr_model::{FieldError, FieldPath, Stream, Streams};

/// Whether two defaults-merged streams are equal
///
/// # Errors
/// Returns error if either vars blob is invalid JSON
pub fn streams_equal(a: &Stream, b: &Stream, path: &FieldPath) -> Result<bool, FieldError> {
    let vars_equal = a.vars.semantically_equal_at(&b.vars, &path.clone().child("vars"))?;
    Ok(a.enabled == b.enabled && vars_equal)
}

/// Streams that are not explicitly disabled
///
/// An unset map is the same as an empty one.
#[must_use]
pub fn enabled_streams(streams: Option<&Streams>) -> BTreeMap<&str, &Stream> {
    streams
        .into_iter()
        .flatten()
        .filter(|(_, stream)| !stream.enabled.is_explicitly_disabled())
        .map(|(id, stream)| (id.as_str(), stream))
        .collect()
}
