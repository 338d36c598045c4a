//! Ordered upgrade chain
//!
//! Each registered step converts a stored record from one generation to the
//! next. [`MigrationRegistry::upgrade`] applies every step from the recorded
//! version up to [`CURRENT_VERSION`]. A new generation is one more
//! `register` call; existing steps stay as they are.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use ipr_model::IntegrationPolicy;

use crate::error::MigrationError;
use crate::v0::PolicyV0;
use crate::v1::{v0_to_v1, PolicyV1};
use crate::v2::v1_to_v2;

/// Latest stored generation
pub const CURRENT_VERSION: u32 = 2;

/// Converter from one stored generation to the next
///
/// Takes the record by reference; the source is never modified.
pub type MigrationTransformFn = fn(&Value) -> Result<Value, MigrationError>;

/// Description of a registered step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MigrationStep {
    /// Source generation
    pub from_version: u32,
    /// Target generation
    pub to_version: u32,
    /// What the step does
    pub description: &'static str,
}

/// Registry of upgrade steps, ordered by source generation
#[derive(Debug)]
pub struct MigrationRegistry {
    steps: Vec<(MigrationStep, MigrationTransformFn)>,
}

impl MigrationRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self { steps: Vec::new() }
    }

    /// Registry with every known step
    #[must_use]
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.register(
            MigrationStep {
                from_version: 0,
                to_version: 1,
                description: "normalize JSON fields, empty string to unset",
            },
            step_0_to_1,
        );
        registry.register(
            MigrationStep {
                from_version: 1,
                to_version: 2,
                description: "key inputs by id, decode streams blobs",
            },
            step_1_to_2,
        );
        registry
    }

    /// Register a step
    pub fn register(&mut self, step: MigrationStep, transform: MigrationTransformFn) {
        self.steps.push((step, transform));
        self.steps.sort_by_key(|(step, _)| step.from_version);
    }

    /// Step starting at `from`
    #[must_use]
    pub fn find(&self, from: u32) -> Option<&(MigrationStep, MigrationTransformFn)> {
        self.steps.iter().find(|(step, _)| step.from_version == from)
    }

    /// All registered steps
    #[must_use]
    pub fn steps(&self) -> &[(MigrationStep, MigrationTransformFn)] {
        &self.steps
    }

    /// Latest generation reachable through the registered steps
    #[must_use]
    pub fn latest_version(&self) -> u32 {
        self.steps
            .iter()
            .map(|(step, _)| step.to_version)
            .max()
            .unwrap_or(0)
    }

    /// Upgrade a stored record from `from` to the latest generation
    ///
    /// A record already at the latest generation is returned as is.
    ///
    /// # Errors
    /// Returns error if no step starts at `from`, or a step fails
    pub fn upgrade(&self, record: &Value, from: u32) -> Result<Value, MigrationError> {
        let latest = self.latest_version();
        if from > latest {
            return Err(MigrationError::UnsupportedVersion {
                from,
                current: latest,
            });
        }

        let mut current = record.clone();
        let mut version = from;
        while version < latest {
            let (step, transform) = self.find(version).ok_or(MigrationError::UnsupportedVersion {
                from: version,
                current: latest,
            })?;
            current = transform(&current)?;
            tracing::debug!(
                from = step.from_version,
                to = step.to_version,
                step = step.description,
                "migration step applied"
            );
            version = step.to_version;
        }
        Ok(current)
    }

    /// Upgrade a stored record and decode it as the current record type
    ///
    /// # Errors
    /// Returns error if the upgrade fails or the result does not decode
    pub fn upgrade_to_current(
        &self,
        record: &Value,
        from: u32,
    ) -> Result<IntegrationPolicy, MigrationError> {
        let upgraded = self.upgrade(record, from)?;
        serde_json::from_value(upgraded).map_err(|e| MigrationError::decode(CURRENT_VERSION, &e))
    }
}

impl Default for MigrationRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

fn step_0_to_1(record: &Value) -> Result<Value, MigrationError> {
    let v0: PolicyV0 = decode(record, 0)?;
    encode(&v0_to_v1(&v0), 1)
}

fn step_1_to_2(record: &Value) -> Result<Value, MigrationError> {
    let v1: PolicyV1 = decode(record, 1)?;
    encode(&v1_to_v2(&v1)?, 2)
}

fn decode<T: DeserializeOwned>(record: &Value, version: u32) -> Result<T, MigrationError> {
    T::deserialize(record).map_err(|e| MigrationError::decode(version, &e))
}

fn encode<T: Serialize>(record: &T, version: u32) -> Result<Value, MigrationError> {
    serde_json::to_value(record).map_err(|e| MigrationError::encode(version, &e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ipr_model::{Enabled, NormalizedJson};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn stored_v0() -> Value {
        json!({
            "name": "nginx-1",
            "integration_name": "nginx",
            "integration_version": "1.0.0",
            "agent_policy_id": "agent-1",
            "vars_json": "",
            "input": [{
                "input_id": "a",
                "vars_json": "",
                "streams_json": "{\"s1\":{\"enabled\":true}}"
            }]
        })
    }

    #[test]
    fn standard_chain_reaches_current() {
        let registry = MigrationRegistry::standard();
        assert_eq!(registry.latest_version(), CURRENT_VERSION);
        assert_eq!(registry.steps().len(), 2);
    }

    #[test]
    fn upgrade_from_generation_zero() {
        let registry = MigrationRegistry::standard();
        let policy = registry.upgrade_to_current(&stored_v0(), 0).unwrap();

        assert!(policy.vars_json.is_null());
        assert_eq!(policy.agent_policy_id.as_deref(), Some("agent-1"));
        let input = &policy.inputs_or_empty()["a"];
        assert!(input.vars.is_null());
        let stream = &input.streams.as_ref().unwrap()["s1"];
        assert_eq!(stream.enabled, Enabled::True);
        assert_eq!(stream.vars, NormalizedJson::Null);
    }

    #[test]
    fn chain_matches_direct_converter() {
        let registry = MigrationRegistry::standard();
        let via_chain = registry.upgrade_to_current(&stored_v0(), 0).unwrap();
        let v0: PolicyV0 = serde_json::from_value(stored_v0()).unwrap();
        assert_eq!(via_chain, crate::v2::v0_to_v2(&v0).unwrap());
    }

    #[test]
    fn current_record_is_returned_as_is() {
        let registry = MigrationRegistry::standard();
        let record = json!({"name": "x", "inputs": {"a": {"enabled": true}}});
        assert_eq!(registry.upgrade(&record, CURRENT_VERSION).unwrap(), record);
    }

    #[test]
    fn source_record_is_untouched() {
        let registry = MigrationRegistry::standard();
        let record = stored_v0();
        let _ = registry.upgrade(&record, 0).unwrap();
        assert_eq!(record, stored_v0());
    }

    #[test]
    fn future_version_is_rejected() {
        let registry = MigrationRegistry::standard();
        let err = registry.upgrade(&json!({}), 3).unwrap_err();
        assert!(matches!(err, MigrationError::UnsupportedVersion { from: 3, current: 2 }));
    }

    #[test]
    fn wrong_shape_is_a_decode_error() {
        let registry = MigrationRegistry::standard();
        let err = registry.upgrade(&json!({"input": "not a list"}), 0).unwrap_err();
        assert!(matches!(err, MigrationError::Decode { version: 0, .. }));
    }

    #[test]
    fn malformed_streams_blob_blocks_the_record() {
        let registry = MigrationRegistry::standard();
        let record = json!({
            "name": "x",
            "input": [{"input_id": "a", "streams_json": "{broken"}]
        });
        let err = registry.upgrade(&record, 1).unwrap_err();
        assert!(err.to_string().contains("input[0].streams_json"));
    }

    #[test]
    fn gap_in_chain_is_reported() {
        let mut registry = MigrationRegistry::new();
        registry.register(
            MigrationStep {
                from_version: 1,
                to_version: 2,
                description: "only the last step",
            },
            step_1_to_2,
        );
        let err = registry.upgrade(&json!({}), 0).unwrap_err();
        assert!(matches!(err, MigrationError::UnsupportedVersion { from: 0, .. }));
    }
}
