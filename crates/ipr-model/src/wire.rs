//! Transport boundary
//!
//! Shapes of the request sent to the server and the response it returns.
//! Vars are JSON maps; in a response each var value may be wrapped as
//! `{type, value}` and secret values are replaced by reference handles.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::normalized::JsonObject;

/// Package a policy is built from
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PackageRef {
    /// Package name
    pub name: String,
    /// Package version
    pub version: String,
}

/// Create/update request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyRequest {
    /// Record id (create with a fixed id)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Policy name
    pub name: String,
    /// Data stream namespace
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    /// Description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Single agent policy target
    #[serde(skip_serializing_if = "Option::is_none")]
    pub policy_id: Option<String>,
    /// Agent policy targets
    #[serde(skip_serializing_if = "Option::is_none")]
    pub policy_ids: Option<Vec<String>>,
    /// Output target
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_id: Option<String>,
    /// Force the operation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub force: Option<bool>,
    /// Package
    pub package: PackageRef,
    /// Policy-level variables
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vars: Option<JsonObject>,
    /// Inputs keyed by input id
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inputs: Option<BTreeMap<String, InputPayload>>,
}

/// Authoritative record returned by the server
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyResponse {
    /// Record id
    pub id: String,
    /// Policy name
    pub name: String,
    /// Data stream namespace
    pub namespace: Option<String>,
    /// Description
    pub description: Option<String>,
    /// Whether the policy is enabled
    pub enabled: Option<bool>,
    /// Single agent policy target
    pub policy_id: Option<String>,
    /// Agent policy targets
    pub policy_ids: Option<Vec<String>>,
    /// Output target
    pub output_id: Option<String>,
    /// Package
    pub package: Option<PackageRef>,
    /// Policy-level variables
    pub vars: Option<JsonObject>,
    /// Inputs keyed by input id
    pub inputs: BTreeMap<String, InputPayload>,
    /// Every secret handle the record currently holds
    pub secret_references: Option<Vec<SecretReference>>,
    /// Spaces the policy belongs to
    pub space_ids: Option<Vec<String>>,
}

/// One input on the wire
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputPayload {
    /// Enablement
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    /// Input-level variables
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vars: Option<JsonObject>,
    /// Streams keyed by stream id
    #[serde(skip_serializing_if = "Option::is_none")]
    pub streams: Option<BTreeMap<String, StreamPayload>>,
}

/// One stream on the wire
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamPayload {
    /// Enablement
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    /// Stream-level variables
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vars: Option<JsonObject>,
}

/// Entry of a response's secret reference list
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SecretReference {
    /// Handle id
    pub id: String,
}

impl PolicyResponse {
    /// Every var map in the response, mutably
    ///
    /// Policy vars first, then each input's vars followed by its streams'.
    pub fn var_maps_mut(&mut self) -> impl Iterator<Item = &mut JsonObject> {
        let inputs = self.inputs.values_mut().flat_map(|input| {
            let streams = input
                .streams
                .iter_mut()
                .flat_map(|streams| streams.values_mut())
                .filter_map(|stream| stream.vars.as_mut());
            input.vars.as_mut().into_iter().chain(streams)
        });
        self.vars.as_mut().into_iter().chain(inputs)
    }

    /// Every var map in the response
    pub fn var_maps(&self) -> impl Iterator<Item = &JsonObject> {
        let inputs = self.inputs.values().flat_map(|input| {
            let streams = input
                .streams
                .iter()
                .flat_map(|streams| streams.values())
                .filter_map(|stream| stream.vars.as_ref());
            input.vars.as_ref().into_iter().chain(streams)
        });
        self.vars.as_ref().into_iter().chain(inputs)
    }
}
