//! Generation 0 record
//!
//! Oldest stored shape. JSON-bearing fields are raw strings with no
//! guarantee of validity, and inputs are an ordered list.

use serde::{Deserialize, Serialize};

/// Generation 0 integration policy
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyV0 {
    /// Record id
    pub id: Option<String>,
    /// Server-assigned policy id
    pub policy_id: Option<String>,
    /// Policy name
    pub name: String,
    /// Data stream namespace
    pub namespace: Option<String>,
    /// Agent policy target
    pub agent_policy_id: Option<String>,
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
    pub input: Option<Vec<InputV0>>,
    /// Policy-level variables, raw
    pub vars_json: Option<String>,
}

/// Generation 0 input list entry
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputV0 {
    /// Input id
    pub input_id: String,
    /// Enablement
    pub enabled: Option<bool>,
    /// All streams of the input as one JSON document, raw
    pub streams_json: Option<String>,
    /// Input-level variables, raw
    pub vars_json: Option<String>,
}
