//! Generation 1 record and the 0 → 1 converter
//!
//! Same list shape as generation 0, but JSON-bearing fields are
//! [`NormalizedJson`] and an empty string is stored as unset. Adds
//! `agent_policy_ids` and `space_ids`.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use ipr_model::NormalizedJson;

use crate::v0::{InputV0, PolicyV0};

/// Generation 1 integration policy
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyV1 {
    /// Record id
    pub id: Option<String>,
    /// Server-assigned policy id
    pub policy_id: Option<String>,
    /// Policy name
    pub name: String,
    /// Data stream namespace
    pub namespace: Option<String>,
    /// Single agent policy target
    pub agent_policy_id: Option<String>,
    /// Alternate agent policy targets
    pub agent_policy_ids: Option<Vec<String>>,
    /// Free-form description
    pub description: Option<String>,
    /// Whether the policy is enabled
    pub enabled: Option<bool>,
    /// Force the operation on managed policies
    pub force: Option<bool>,
    /// Package name
    pub integration_name: String,
    /// Package version
    pub integration_version: String,
    /// Inputs in declaration order
    pub input: Option<Vec<InputV1>>,
    /// Policy-level variables
    pub vars_json: NormalizedJson,
    /// Spaces the policy belongs to
    pub space_ids: Option<BTreeSet<String>>,
}

/// Generation 1 input list entry
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputV1 {
    /// Input id
    pub input_id: String,
    /// Enablement
    pub enabled: Option<bool>,
    /// All streams of the input as one JSON document
    pub streams_json: NormalizedJson,
    /// Input-level variables
    pub vars_json: NormalizedJson,
}

/// Upgrade a generation 0 record to generation 1
///
/// Empty strings in JSON-bearing fields become unset; the new fields start
/// unset. Everything else is carried over as is.
#[must_use]
pub fn v0_to_v1(record: &PolicyV0) -> PolicyV1 {
    PolicyV1 {
        id: record.id.clone(),
        policy_id: record.policy_id.clone(),
        name: record.name.clone(),
        namespace: record.namespace.clone(),
        agent_policy_id: record.agent_policy_id.clone(),
        agent_policy_ids: None,
        description: record.description.clone(),
        enabled: record.enabled,
        force: record.force,
        integration_name: record.integration_name.clone(),
        integration_version: record.integration_version.clone(),
        input: record
            .input
            .as_ref()
            .map(|inputs| inputs.iter().map(input_v0_to_v1).collect()),
        vars_json: NormalizedJson::from_legacy(record.vars_json.as_deref()),
        space_ids: None,
    }
}

fn input_v0_to_v1(input: &InputV0) -> InputV1 {
    InputV1 {
        input_id: input.input_id.clone(),
        enabled: input.enabled,
        streams_json: NormalizedJson::from_legacy(input.streams_json.as_deref()),
        vars_json: NormalizedJson::from_legacy(input.vars_json.as_deref()),
    }
}
