//! Defaults merging
//!
//! Fills every field a record left unset with the package default and leaves
//! every explicitly set field untouched. The result is a comparison view only;
//! it is never stored.
//!
//! Merging is idempotent: merging an already-merged record against the same
//! defaults returns it unchanged.

use ipr_model::{
    Diagnostics, FieldError, FieldPath, Input, InputDefaults, NormalizedJson, Stream,
    StreamDefaults, Streams,
};

/// Fill keys missing from `source` vars with those from `defaults`
///
/// - `source` unset: the defaults, unchanged
/// - `defaults` unset or unknown: the source, unchanged
/// - `source` unknown: stays unknown
/// - no key missing: the source text, unchanged
///
/// # Errors
/// Returns error if either side is not a JSON object
pub fn merge_vars(
    source: &NormalizedJson,
    defaults: &NormalizedJson,
    path: &FieldPath,
) -> Result<NormalizedJson, FieldError> {
    match (source, defaults) {
        (_, NormalizedJson::Null | NormalizedJson::Unknown) | (NormalizedJson::Unknown, _) => {
            Ok(source.clone())
        }
        (NormalizedJson::Null, _) => Ok(defaults.clone()),
        (NormalizedJson::Value(_), NormalizedJson::Value(_)) => {
            let (Some(mut merged), Some(default_vars)) =
                (source.parse_object(path)?, defaults.parse_object(path)?)
            else {
                return Ok(source.clone());
            };

            let mut added = 0usize;
            for (key, value) in default_vars {
                if !merged.contains_key(&key) {
                    merged.insert(key, value);
                    added += 1;
                }
            }

            if added == 0 {
                Ok(source.clone())
            } else {
                tracing::trace!(%path, added, "filled vars from defaults");
                Ok(NormalizedJson::from_object(merged))
            }
        }
    }
}

/// Merge one stream with its defaults
///
/// # Errors
/// Returns error if either vars blob is not a JSON object
pub fn merge_stream(
    stream: &Stream,
    defaults: &StreamDefaults,
    path: &FieldPath,
) -> Result<Stream, FieldError> {
    Ok(Stream {
        enabled: stream.enabled.or(defaults.enabled),
        vars: merge_vars(&stream.vars, &defaults.vars, &path.clone().child("vars"))?,
    })
}

/// Merge a stream map with per-stream defaults
///
/// An unset map is built fresh from the defaults (and stays unset when there
/// are none). Streams only in the defaults are inserted wholesale; streams on
/// both sides are merged; streams only in the source are kept as-is.
///
/// # Errors
/// Returns every stream whose vars could not be merged
pub fn merge_streams(
    streams: Option<&Streams>,
    defaults: &InputDefaults,
    path: &FieldPath,
) -> Result<Option<Streams>, Diagnostics> {
    let Some(streams) = streams else {
        if defaults.streams.is_empty() {
            return Ok(None);
        }
        let fresh = defaults
            .streams
            .iter()
            .map(|(id, d)| (id.clone(), Stream::new(d.enabled, d.vars.clone())))
            .collect();
        return Ok(Some(fresh));
    };

    let mut diags = Diagnostics::new();
    let mut merged = streams.clone();
    for (id, stream_defaults) in &defaults.streams {
        match merged.get_mut(id) {
            None => {
                merged.insert(
                    id.clone(),
                    Stream::new(stream_defaults.enabled, stream_defaults.vars.clone()),
                );
            }
            Some(stream) => {
                match merge_stream(stream, stream_defaults, &path.clone().key(id.as_str())) {
                    Ok(filled) => *stream = filled,
                    Err(e) => diags.push(e),
                }
            }
        }
    }
    diags.finish(Some(merged))
}

/// Merge an input with its defaults
///
/// Uses `defaults` when given, otherwise the input's own attachment; with
/// neither the input is returned unchanged. The input's `enabled` is never
/// filled here: only streams carry default enablement.
///
/// # Errors
/// Returns every field that could not be merged
pub fn merge_input(
    input: &Input,
    defaults: Option<&InputDefaults>,
    path: &FieldPath,
) -> Result<Input, Diagnostics> {
    let Some(defaults) = defaults.or(input.defaults.as_ref()) else {
        return Ok(input.clone());
    };

    let mut diags = Diagnostics::new();
    let vars = match merge_vars(&input.vars, &defaults.vars, &path.clone().child("vars")) {
        Ok(vars) => vars,
        Err(e) => {
            diags.push(e);
            input.vars.clone()
        }
    };
    let streams = diags
        .absorb(merge_streams(
            input.streams.as_ref(),
            defaults,
            &path.clone().child("streams"),
        ))
        .unwrap_or_else(|| input.streams.clone());

    diags.finish(Input {
        enabled: input.enabled,
        vars,
        defaults: input.defaults.clone(),
        streams,
    })
}
