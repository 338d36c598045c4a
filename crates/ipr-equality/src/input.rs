//! Input-level equality

use ipr_model::{Diagnostics, FieldPath, Input};

use crate::stream::{enabled_streams, streams_equal};

/// Whether two defaults-merged inputs are equal
///
/// The inputs' own `enabled` is not compared: disablement of an input is
/// handled one level up. Streams are compared after erasing the explicitly
/// disabled ones from both sides, so a disabled stream present on only one
/// side never counts as a difference.
///
/// # Errors
/// Returns every vars blob that is invalid JSON
pub fn merged_inputs_equal(a: &Input, b: &Input, path: &FieldPath) -> Result<bool, Diagnostics> {
    let mut diags = Diagnostics::new();

    let vars_equal = match a.vars.semantically_equal_at(&b.vars, &path.clone().child("vars")) {
        Ok(equal) => equal,
        Err(e) => {
            diags.push(e);
            false
        }
    };

    let a_streams = enabled_streams(a.streams.as_ref());
    let b_streams = enabled_streams(b.streams.as_ref());
    let mut streams_equal_all = a_streams.len() == b_streams.len();
    let streams_path = path.clone().child("streams");
    for (id, a_stream) in &a_streams {
        let Some(b_stream) = b_streams.get(id) else {
            streams_equal_all = false;
            continue;
        };
        match streams_equal(a_stream, b_stream, &streams_path.clone().key(*id)) {
            Ok(true) => {}
            Ok(false) => {
                tracing::trace!(%path, stream = %id, "stream differs");
                streams_equal_all = false;
            }
            Err(e) => {
                diags.push(e);
                streams_equal_all = false;
            }
        }
    }

    diags.finish(vars_equal && streams_equal_all)
}

/// Whether a defaults-merged input is functionally enabled
///
/// An explicit `enabled` decides. Otherwise the input counts as enabled when
/// any stream is not explicitly disabled, and as disabled when every stream
/// is. With no stream state at all the input is treated as enabled.
#[must_use]
pub fn input_effectively_enabled(merged: &Input) -> bool {
    if let Some(enabled) = merged.enabled.as_bool() {
        return enabled;
    }
    match &merged.streams {
        Some(streams) if !streams.is_empty() => streams
            .values()
            .any(|stream| !stream.enabled.is_explicitly_disabled()),
        _ => true,
    }
}
