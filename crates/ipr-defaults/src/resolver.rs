//! Defaults resolution
//!
//! Computes, for every input a package offers, its variable defaults and the
//! defaults of the streams attached to it.
//!
//! Inputs declared by a policy template are keyed `"<template>-<input type>"`.
//! Input types that only appear in data streams are keyed by the bare type.

use std::collections::BTreeMap;

use serde_json::Value;

use ipr_model::{DefaultsMap, Enabled, InputDefaults, JsonObject, NormalizedJson, StreamDefaults};

use crate::descriptor::{PackageDescriptor, VarDecl};
use crate::error::DefaultsError;

/// Resolve the defaults map for a package
///
/// A missing descriptor yields an empty map. The result does not depend on
/// the order of templates, data streams or variables in the descriptor;
/// descriptors that declare the same input, stream or variable twice are
/// rejected.
///
/// # Errors
/// Returns error if the descriptor has the wrong shape or duplicate keys
pub fn resolve_defaults(descriptor: Option<&PackageDescriptor>) -> Result<DefaultsMap, DefaultsError> {
    let Some(descriptor) = descriptor else {
        return Ok(DefaultsMap::new());
    };
    descriptor.validate()?;

    let mut streams_by_input = stream_defaults_by_input(descriptor);
    let mut defaults = DefaultsMap::new();

    for template in &descriptor.policy_templates {
        for input in &template.inputs {
            let id = format!("{}-{}", template.name, input.input_type);
            let streams = streams_by_input
                .get(&input.input_type)
                .cloned()
                .unwrap_or_default();
            defaults.insert(
                id,
                InputDefaults {
                    vars: var_defaults(&input.vars),
                    streams,
                },
            );
        }
    }

    // Input types referenced only by data streams
    let templated: Vec<&str> = descriptor
        .policy_templates
        .iter()
        .flat_map(|t| t.inputs.iter().map(|i| i.input_type.as_str()))
        .collect();
    streams_by_input.retain(|input_type, _| !templated.contains(&input_type.as_str()));
    for (input_type, streams) in streams_by_input {
        defaults.entry(input_type).or_insert(InputDefaults {
            vars: NormalizedJson::Null,
            streams,
        });
    }

    tracing::debug!(
        package = %descriptor.name,
        version = %descriptor.version,
        inputs = defaults.len(),
        "resolved package defaults"
    );
    Ok(defaults)
}

/// Stream defaults grouped by input type, then by dataset
fn stream_defaults_by_input(
    descriptor: &PackageDescriptor,
) -> BTreeMap<String, BTreeMap<String, StreamDefaults>> {
    let mut grouped: BTreeMap<String, BTreeMap<String, StreamDefaults>> = BTreeMap::new();
    for data_stream in &descriptor.data_streams {
        for stream in &data_stream.streams {
            grouped.entry(stream.input.clone()).or_default().insert(
                data_stream.dataset.clone(),
                StreamDefaults {
                    enabled: Enabled::from(stream.enabled),
                    vars: var_defaults(&stream.vars),
                },
            );
        }
    }
    grouped
}

/// Default value of each declared variable
///
/// Explicit default if present, an empty list for multi-value variables,
/// otherwise the variable is omitted.
fn var_defaults(vars: &[VarDecl]) -> NormalizedJson {
    let mut object = JsonObject::new();
    for var in vars {
        if let Some(default) = &var.default {
            object.insert(var.name.clone(), default.clone());
        } else if var.multi == Some(true) {
            object.insert(var.name.clone(), Value::Array(Vec::new()));
        }
    }
    NormalizedJson::from_object(object)
}
