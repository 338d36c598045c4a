//! Current (generation 2) integration policy record

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::defaults::InputDefaults;
use crate::enabled::Enabled;
use crate::normalized::NormalizedJson;

/// Inputs keyed by input id
pub type Inputs = BTreeMap<String, Input>;

/// Streams keyed by stream id
pub type Streams = BTreeMap<String, Stream>;

/// Integration policy as stored
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntegrationPolicy {
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
    /// Output target
    pub output_id: Option<String>,
    /// Inputs; `None` when left unset
    pub inputs: Option<Inputs>,
    /// Policy-level variables
    pub vars_json: NormalizedJson,
    /// Spaces the policy belongs to
    pub space_ids: Option<BTreeSet<String>>,
}

/// One input of a policy
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Input {
    /// Enablement
    pub enabled: Enabled,
    /// Input-level variables
    pub vars: NormalizedJson,
    /// Package defaults, present only while comparing
    #[serde(skip)]
    pub defaults: Option<InputDefaults>,
    /// Streams; `None` when left unset
    pub streams: Option<Streams>,
}

/// One stream of an input
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Stream {
    /// Enablement
    pub enabled: Enabled,
    /// Stream-level variables
    pub vars: NormalizedJson,
}

impl IntegrationPolicy {
    /// Inputs, treating unset as empty
    #[must_use]
    pub fn inputs_or_empty(&self) -> &Inputs {
        static EMPTY: Inputs = BTreeMap::new();
        self.inputs.as_ref().unwrap_or(&EMPTY)
    }

    /// Attach defaults to every input that has an entry in `defaults`
    ///
    /// Inputs without an entry have their attachment cleared.
    pub fn attach_defaults(&mut self, defaults: &crate::DefaultsMap) {
        if let Some(inputs) = self.inputs.as_mut() {
            for (id, input) in inputs.iter_mut() {
                input.defaults = defaults.get(id).cloned();
            }
        }
    }

    /// Copy with every defaults attachment removed
    #[must_use]
    pub fn without_defaults(mut self) -> Self {
        if let Some(inputs) = self.inputs.as_mut() {
            for input in inputs.values_mut() {
                input.defaults = None;
            }
        }
        self
    }
}

impl Input {
    /// Input with the given enablement and vars, no streams
    #[inline]
    #[must_use]
    pub fn new(enabled: Enabled, vars: NormalizedJson) -> Self {
        Self {
            enabled,
            vars,
            defaults: None,
            streams: None,
        }
    }

    /// Add a stream
    #[must_use]
    pub fn with_stream(mut self, id: impl Into<String>, stream: Stream) -> Self {
        self.streams
            .get_or_insert_with(BTreeMap::new)
            .insert(id.into(), stream);
        self
    }

    /// Attach defaults
    #[inline]
    #[must_use]
    pub fn with_defaults(mut self, defaults: InputDefaults) -> Self {
        self.defaults = Some(defaults);
        self
    }
}

impl Stream {
    /// Stream with the given enablement and vars
    #[inline]
    #[must_use]
    pub fn new(enabled: Enabled, vars: NormalizedJson) -> Self {
        Self { enabled, vars }
    }
}
