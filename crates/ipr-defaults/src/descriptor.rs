//! Package descriptor
//!
//! The subset of package metadata that carries variable defaults: policy
//! templates with their inputs, and data streams with their streams.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use ipr_model::{Diagnostics, FieldError, FieldErrorKind, FieldPath};

use crate::error::DefaultsError;

/// Package metadata
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PackageDescriptor {
    /// Package name
    #[serde(default)]
    pub name: String,
    /// Package version
    #[serde(default)]
    pub version: String,
    /// Policy templates
    #[serde(default)]
    pub policy_templates: Vec<PolicyTemplate>,
    /// Data streams
    #[serde(default)]
    pub data_streams: Vec<DataStream>,
}

/// Named set of inputs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyTemplate {
    /// Template name
    pub name: String,
    /// Inputs offered by the template
    #[serde(default)]
    pub inputs: Vec<TemplateInput>,
}

/// Input declared by a policy template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateInput {
    /// Input type
    #[serde(rename = "type")]
    pub input_type: String,
    /// Variable declarations
    #[serde(default)]
    pub vars: Vec<VarDecl>,
}

/// Data stream of a package
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataStream {
    /// Data stream type (logs, metrics, ...)
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    /// Dataset name, the stream id
    pub dataset: String,
    /// Streams, one per input type
    #[serde(default)]
    pub streams: Vec<DataStreamStream>,
}

/// Stream of a data stream, attached to one input type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataStreamStream {
    /// Input type this stream attaches to
    pub input: String,
    /// Default enablement
    #[serde(default)]
    pub enabled: Option<bool>,
    /// Variable declarations
    #[serde(default)]
    pub vars: Vec<VarDecl>,
}

/// Variable declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VarDecl {
    /// Variable name
    pub name: String,
    /// Explicit default value
    #[serde(default)]
    pub default: Option<Value>,
    /// Whether the variable holds a list
    #[serde(default)]
    pub multi: Option<bool>,
}

impl PackageDescriptor {
    /// Parse from JSON string
    ///
    /// # Errors
    /// Returns error if the JSON is invalid or has the wrong shape
    pub fn from_json(json: &str) -> Result<Self, DefaultsError> {
        let descriptor: Self =
            serde_json::from_str(json).map_err(|e| DefaultsError::descriptor(&e))?;
        descriptor.validate()?;
        Ok(descriptor)
    }

    /// Decode from a JSON value
    ///
    /// # Errors
    /// Returns error if the value has the wrong shape
    pub fn from_value(value: Value) -> Result<Self, DefaultsError> {
        let descriptor: Self =
            serde_json::from_value(value).map_err(|e| DefaultsError::descriptor(&e))?;
        descriptor.validate()?;
        Ok(descriptor)
    }

    /// Check the identifiers defaults are keyed by
    ///
    /// Every template name, input type, dataset, stream input and variable
    /// name must be non-empty. Input ids (`"<template>-<type>"`), streams
    /// (input type and dataset) and variable names within one declaration
    /// must be unique. All problems are reported together.
    ///
    /// # Errors
    /// Returns every empty or duplicate identifier found
    pub fn validate(&self) -> Result<(), DefaultsError> {
        let mut diags = Diagnostics::new();

        let mut input_ids = BTreeSet::new();
        for (t, template) in self.policy_templates.iter().enumerate() {
            let path = FieldPath::attr("policy_templates").index(t);
            require(&mut diags, &template.name, path.clone().child("name"));
            for (i, input) in template.inputs.iter().enumerate() {
                let path = path.clone().child("inputs").index(i);
                let type_path = path.clone().child("type");
                if require(&mut diags, &input.input_type, type_path.clone()) {
                    let id = format!("{}-{}", template.name, input.input_type);
                    unique(&mut diags, &mut input_ids, id, type_path);
                }
                check_vars(&mut diags, &input.vars, &path);
            }
        }

        let mut streams = BTreeSet::new();
        for (d, data_stream) in self.data_streams.iter().enumerate() {
            let path = FieldPath::attr("data_streams").index(d);
            let has_dataset =
                require(&mut diags, &data_stream.dataset, path.clone().child("dataset"));
            for (s, stream) in data_stream.streams.iter().enumerate() {
                let path = path.clone().child("streams").index(s);
                let input_path = path.clone().child("input");
                if require(&mut diags, &stream.input, input_path.clone()) && has_dataset {
                    let key = format!("{}:{}", stream.input, data_stream.dataset);
                    unique(&mut diags, &mut streams, key, input_path);
                }
                check_vars(&mut diags, &stream.vars, &path);
            }
        }

        diags.finish(()).map_err(DefaultsError::Shape)
    }
}

fn check_vars(diags: &mut Diagnostics, vars: &[VarDecl], parent: &FieldPath) {
    let mut names = BTreeSet::new();
    for (v, var) in vars.iter().enumerate() {
        let path = parent.clone().child("vars").index(v).child("name");
        if require(diags, &var.name, path.clone()) {
            unique(diags, &mut names, var.name.clone(), path);
        }
    }
}

/// Whether `value` is non-empty; reports it otherwise
fn require(diags: &mut Diagnostics, value: &str, path: FieldPath) -> bool {
    if value.is_empty() {
        diags.push(FieldError::new(
            path,
            FieldErrorKind::Shape("must not be empty".to_string()),
        ));
        return false;
    }
    true
}

fn unique(diags: &mut Diagnostics, seen: &mut BTreeSet<String>, key: String, path: FieldPath) {
    if seen.contains(&key) {
        diags.push(FieldError::new(path, FieldErrorKind::DuplicateKey(key)));
    } else {
        seen.insert(key);
    }
}
