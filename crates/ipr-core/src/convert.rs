//! Record ↔ wire conversion
//!
//! The stored record keeps vars as JSON text; the wire form carries them
//! as JSON maps.

use std::collections::BTreeMap;

use serde_json::Value;

use ipr_model::{
    Diagnostics, Enabled, FieldPath, Input, InputPayload, Inputs, IntegrationPolicy, JsonObject,
    NormalizedJson, PackageRef, PolicyRequest, PolicyResponse, Stream, StreamPayload, Streams,
};
use ipr_secrets::{decode_var, VarValue};

/// Conversion between [`IntegrationPolicy`] and its wire payloads
pub trait WireConvert: Sized {
    /// Build the create/update request
    ///
    /// # Errors
    /// Returns every vars field that is not a JSON object
    fn to_request(&self) -> Result<PolicyRequest, Diagnostics>;

    /// Build a record from the server's response
    ///
    /// Wrapped var values are unwrapped; unresolved secret handles are kept
    /// as they are. With `empty_vars_as_unset`, a vars map with no keys is
    /// recorded as unset.
    fn from_response(response: &PolicyResponse, empty_vars_as_unset: bool) -> Self;
}

impl WireConvert for IntegrationPolicy {
    fn to_request(&self) -> Result<PolicyRequest, Diagnostics> {
        let mut diags = Diagnostics::new();
        let vars = parse_vars(&self.vars_json, &FieldPath::attr("vars_json"), &mut diags);
        let inputs = self.inputs.as_ref().map(|inputs| {
            inputs
                .iter()
                .map(|(id, input)| {
                    let path = FieldPath::attr("inputs").key(id.as_str());
                    (id.clone(), input_payload(input, &path, &mut diags))
                })
                .collect()
        });

        diags.finish(PolicyRequest {
            id: self.id.clone(),
            name: self.name.clone(),
            namespace: self.namespace.clone(),
            description: self.description.clone(),
            policy_id: self.agent_policy_id.clone(),
            policy_ids: self.agent_policy_ids.clone(),
            output_id: self.output_id.clone(),
            force: self.force,
            package: PackageRef {
                name: self.integration_name.clone(),
                version: self.integration_version.clone(),
            },
            vars,
            inputs,
        })
    }

    fn from_response(response: &PolicyResponse, empty_vars_as_unset: bool) -> Self {
        let vars_to_json = |vars: Option<&JsonObject>| record_vars(vars, empty_vars_as_unset);

        let inputs: Inputs = response
            .inputs
            .iter()
            .map(|(id, payload)| {
                let streams = payload.streams.as_ref().map(|streams| {
                    streams
                        .iter()
                        .map(|(stream_id, stream)| {
                            (
                                stream_id.clone(),
                                Stream::new(
                                    Enabled::from(stream.enabled),
                                    vars_to_json(stream.vars.as_ref()),
                                ),
                            )
                        })
                        .collect::<Streams>()
                });
                let input = Input {
                    enabled: Enabled::from(payload.enabled),
                    vars: vars_to_json(payload.vars.as_ref()),
                    defaults: None,
                    streams,
                };
                (id.clone(), input)
            })
            .collect();

        let package = response.package.clone().unwrap_or_default();
        Self {
            id: Some(response.id.clone()),
            policy_id: Some(response.id.clone()),
            name: response.name.clone(),
            namespace: response.namespace.clone(),
            agent_policy_id: response.policy_id.clone(),
            agent_policy_ids: response.policy_ids.clone(),
            description: response.description.clone(),
            enabled: response.enabled,
            force: None,
            integration_name: package.name,
            integration_version: package.version,
            output_id: response.output_id.clone(),
            inputs: (!inputs.is_empty()).then_some(inputs),
            vars_json: vars_to_json(response.vars.as_ref()),
            space_ids: response
                .space_ids
                .as_ref()
                .map(|ids| ids.iter().cloned().collect()),
        }
    }
}

fn input_payload(input: &Input, path: &FieldPath, diags: &mut Diagnostics) -> InputPayload {
    let vars = parse_vars(&input.vars, &path.clone().child("vars"), diags);
    let streams = input.streams.as_ref().map(|streams| {
        streams
            .iter()
            .map(|(id, stream)| {
                let stream_path = path.clone().child("streams").key(id.as_str()).child("vars");
                let payload = StreamPayload {
                    enabled: stream.enabled.as_bool(),
                    vars: parse_vars(&stream.vars, &stream_path, diags),
                };
                (id.clone(), payload)
            })
            .collect::<BTreeMap<_, _>>()
    });
    InputPayload {
        enabled: input.enabled.as_bool(),
        vars,
        streams,
    }
}

fn parse_vars(vars: &NormalizedJson, path: &FieldPath, diags: &mut Diagnostics) -> Option<JsonObject> {
    match vars.parse_object(path) {
        Ok(object) => object,
        Err(e) => {
            diags.push(e);
            None
        }
    }
}

/// Response vars as stored text, with wrappers removed
fn record_vars(vars: Option<&JsonObject>, empty_as_unset: bool) -> NormalizedJson {
    let Some(vars) = vars else {
        return NormalizedJson::Null;
    };
    if vars.is_empty() && empty_as_unset {
        return NormalizedJson::Null;
    }
    let plain: JsonObject = vars
        .iter()
        .map(|(name, raw)| {
            let value = match decode_var(raw) {
                VarValue::Plain(value) => value.clone(),
                VarValue::Secret(_) => raw.clone(),
            };
            (name.clone(), value)
        })
        .collect();
    NormalizedJson::from_value(&Value::Object(plain))
}
