//! 1 → 2 and 0 → 2 converters
//!
//! Generation 2 is the current [`IntegrationPolicy`]. Inputs move from a
//! list into a map keyed by `input_id`, and each input's streams blob is
//! decoded into a map of stream id to `{enabled, vars}`.

use serde::Deserialize;
use serde_json::Value;

use ipr_model::{
    Diagnostics, Enabled, FieldError, FieldErrorKind, FieldPath, Input, Inputs,
    IntegrationPolicy, NormalizedJson, Stream, Streams,
};

use crate::error::MigrationError;
use crate::v0::PolicyV0;
use crate::v1::{v0_to_v1, InputV1, PolicyV1};

/// One entry of a stored streams blob
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct StoredStream {
    enabled: Option<bool>,
    vars: Option<Value>,
}

/// Upgrade a generation 1 record to generation 2
///
/// Every field is checked before failing. Invalid JSON in any vars or
/// streams blob, a streams entry with the wrong shape, or an empty or
/// repeated input id fails the whole record; nothing is converted
/// best-effort.
///
/// # Errors
/// Returns [`MigrationError::Malformed`] listing every failing field
pub fn v1_to_v2(record: &PolicyV1) -> Result<IntegrationPolicy, MigrationError> {
    let mut diags = Diagnostics::new();

    if let Err(e) = record.vars_json.parse() {
        diags.push(FieldError::invalid_json(FieldPath::attr("vars_json"), &e));
    }
    let inputs = record
        .input
        .as_deref()
        .map(|list| convert_inputs(list, &mut diags));

    let policy = IntegrationPolicy {
        id: record.id.clone(),
        policy_id: record.policy_id.clone(),
        name: record.name.clone(),
        namespace: record.namespace.clone(),
        agent_policy_id: record.agent_policy_id.clone(),
        agent_policy_ids: record.agent_policy_ids.clone(),
        description: record.description.clone(),
        enabled: record.enabled,
        force: record.force,
        integration_name: record.integration_name.clone(),
        integration_version: record.integration_version.clone(),
        output_id: None,
        inputs,
        vars_json: record.vars_json.clone(),
        space_ids: record.space_ids.clone(),
    };

    diags
        .finish(policy)
        .map_err(|diagnostics| MigrationError::Malformed {
            from: 1,
            to: 2,
            diagnostics,
        })
}

/// Upgrade a generation 0 record straight to generation 2
///
/// # Errors
/// Returns error if the 1 → 2 step fails
pub fn v0_to_v2(record: &PolicyV0) -> Result<IntegrationPolicy, MigrationError> {
    v1_to_v2(&v0_to_v1(record))
}

fn convert_inputs(list: &[InputV1], diags: &mut Diagnostics) -> Inputs {
    let mut inputs = Inputs::new();
    for (i, input) in list.iter().enumerate() {
        let path = FieldPath::attr("input").index(i);

        if let Err(e) = input.vars_json.parse() {
            diags.push(FieldError::invalid_json(path.clone().child("vars_json"), &e));
        }
        let streams = diags
            .absorb(decode_streams(&input.streams_json, &path.clone().child("streams_json")))
            .flatten();

        if input.input_id.is_empty() {
            diags.push(FieldError::new(
                path.child("input_id"),
                FieldErrorKind::Shape("empty input id".to_string()),
            ));
            continue;
        }
        if inputs.contains_key(&input.input_id) {
            diags.push(FieldError::new(
                path.child("input_id"),
                FieldErrorKind::DuplicateKey(input.input_id.clone()),
            ));
            continue;
        }

        inputs.insert(
            input.input_id.clone(),
            Input {
                enabled: Enabled::from(input.enabled),
                vars: input.vars_json.clone(),
                defaults: None,
                streams,
            },
        );
    }
    tracing::trace!(inputs = inputs.len(), "inputs keyed by id");
    inputs
}

/// Decode a streams blob into a stream map
///
/// An unset blob, or one holding an empty object, yields `None`.
fn decode_streams(blob: &NormalizedJson, path: &FieldPath) -> Result<Option<Streams>, Diagnostics> {
    let entries = match blob.parse() {
        Ok(None) => return Ok(None),
        Ok(Some(Value::Object(entries))) => entries,
        Ok(Some(other)) => return Err(FieldError::not_an_object(path.clone(), &other).into()),
        Err(e) => return Err(FieldError::invalid_json(path.clone(), &e).into()),
    };
    if entries.is_empty() {
        return Ok(None);
    }

    let mut diags = Diagnostics::new();
    let mut streams = Streams::new();
    for (id, entry) in entries {
        let entry_path = path.clone().key(id.as_str());
        if !entry.is_object() {
            diags.push(FieldError::not_an_object(entry_path, &entry));
            continue;
        }
        let stored: StoredStream = match serde_json::from_value(entry) {
            Ok(stored) => stored,
            Err(e) => {
                diags.push(FieldError::new(entry_path, FieldErrorKind::Shape(e.to_string())));
                continue;
            }
        };
        let vars = match stored.vars {
            None | Some(Value::Null) => NormalizedJson::Null,
            Some(vars @ Value::Object(_)) => NormalizedJson::from_value(&vars),
            Some(other) => {
                diags.push(FieldError::not_an_object(entry_path.child("vars"), &other));
                continue;
            }
        };
        streams.insert(id, Stream::new(Enabled::from(stored.enabled), vars));
    }
    diags.finish(Some(streams))
}
