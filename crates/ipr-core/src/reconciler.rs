//! Reconciler
//!
//! Turns the server's authoritative response into the record to store,
//! keeping the declared or previously stored representation wherever it is
//! semantically the same as what the server returned.
//!
//! ```text
//! response ─► secrets (write/read path) ─► record ─┐
//!                                                  ├─► attach defaults ─► equality ─► keep / replace
//!            planned or prior record ──────────────┘
//! ```

use std::sync::Arc;

use ipr_defaults::{CacheStats, DefaultsCache, PackageKey, PackageSource};
use ipr_equality::{inputs_equal, EqualityError, SemanticEq};
use ipr_migrate::MigrationRegistry;
use ipr_model::{DefaultsMap, FieldPath, IntegrationPolicy, PolicyRequest, PolicyResponse};
use ipr_secrets::{PrivateStore, ResolveStats, SecretResolver};
use serde_json::Value;

use crate::config::ReconcileConfig;
use crate::convert::WireConvert;
use crate::error::{ReconcileError, ReconcileResult};

/// Attributes whose drift a read reports
pub const TRACKED_ATTRIBUTES: &[&str] = &[
    "name",
    "namespace",
    "description",
    "enabled",
    "agent_policy_id",
    "agent_policy_ids",
    "output_id",
    "integration_version",
    "vars_json",
    "inputs",
];

/// Result of reconciling a read
#[derive(Debug, Clone, PartialEq)]
pub struct ReadOutcome {
    /// Record to store
    pub policy: IntegrationPolicy,
    /// Attributes that changed on the server, in [`TRACKED_ATTRIBUTES`] order
    pub drift: Vec<&'static str>,
    /// Secret resolution counters
    pub secrets: ResolveStats,
}

impl ReadOutcome {
    /// Whether anything drifted
    #[inline]
    #[must_use]
    pub fn has_drift(&self) -> bool {
        !self.drift.is_empty()
    }
}

/// Reconciles integration policy records against server responses
///
/// Holds the defaults cache, which is shared by every record reconciled
/// through this instance.
#[derive(Debug)]
pub struct Reconciler {
    config: ReconcileConfig,
    defaults: DefaultsCache,
    secrets: SecretResolver,
    migrations: MigrationRegistry,
}

impl Reconciler {
    /// Create reconciler
    ///
    /// # Errors
    /// Returns error if the configuration is invalid
    pub fn new(config: ReconcileConfig) -> ReconcileResult<Self> {
        config.validate()?;
        Ok(Self::with_valid_config(config))
    }

    fn with_valid_config(config: ReconcileConfig) -> Self {
        Self {
            defaults: config.build_cache(),
            secrets: config.build_secrets(),
            migrations: MigrationRegistry::standard(),
            config,
        }
    }

    /// Configuration in use
    #[inline]
    #[must_use]
    pub fn config(&self) -> &ReconcileConfig {
        &self.config
    }

    /// Defaults cache statistics
    #[must_use]
    pub fn cache_stats(&self) -> CacheStats {
        self.defaults.stats()
    }

    /// Defaults for a package, resolved once per package version
    ///
    /// # Errors
    /// Returns error if the source fails or the descriptor is malformed
    pub fn defaults_for(
        &self,
        key: &PackageKey,
        source: &dyn PackageSource,
    ) -> ReconcileResult<Arc<DefaultsMap>> {
        Ok(self.defaults.get_or_resolve(key, source)?)
    }

    /// Upgrade a stored record of generation `from` to the current shape
    ///
    /// # Errors
    /// Returns error if the record cannot be upgraded
    pub fn migrate(&self, stored: &Value, from: u32) -> ReconcileResult<IntegrationPolicy> {
        Ok(self.migrations.upgrade_to_current(stored, from)?)
    }

    /// Build the request for a planned record
    ///
    /// # Errors
    /// Returns every vars field that is not a JSON object
    pub fn request_for(&self, planned: &IntegrationPolicy) -> ReconcileResult<PolicyRequest> {
        planned.to_request().map_err(ReconcileError::InvalidRecord)
    }

    /// Record to store after a create or update
    ///
    /// Secret handles in `response` are replaced with the plaintext sent in
    /// `request`. The planned `vars_json` and `inputs` are kept wherever they
    /// equal the observed ones after applying package defaults.
    ///
    /// # Errors
    /// Returns error if secrets, defaults or equality fail
    pub fn after_write<S>(
        &self,
        planned: &IntegrationPolicy,
        request: &PolicyRequest,
        response: PolicyResponse,
        store: &mut S,
        source: &dyn PackageSource,
    ) -> ReconcileResult<IntegrationPolicy>
    where
        S: PrivateStore + ?Sized,
    {
        let (response, _) = self.secrets.after_write(request, response, store)?;
        let observed = IntegrationPolicy::from_response(&response, self.config.empty_vars_as_unset);
        let mut policy = self.reconcile(planned, observed, source)?;
        policy.force = planned.force;
        Ok(policy)
    }

    /// Record to store after a read, with the attributes that drifted
    ///
    /// # Errors
    /// Returns error if secrets, defaults or equality fail
    pub fn after_read<S>(
        &self,
        prior: &IntegrationPolicy,
        response: PolicyResponse,
        store: &mut S,
        source: &dyn PackageSource,
    ) -> ReconcileResult<ReadOutcome>
    where
        S: PrivateStore + ?Sized,
    {
        let (response, secrets) = self.secrets.after_read(response, store)?;
        let observed = IntegrationPolicy::from_response(&response, self.config.empty_vars_as_unset);
        let mut policy = self.reconcile(prior, observed, source)?;
        policy.force = prior.force;

        let drift = drifted_attributes(prior, &policy);
        if drift.is_empty() {
            tracing::debug!(policy = %policy.name, "no drift");
        } else {
            tracing::info!(policy = %policy.name, ?drift, "drift detected");
        }
        Ok(ReadOutcome {
            policy,
            drift,
            secrets,
        })
    }

    /// Merge `observed` into the representation of `known`
    fn reconcile(
        &self,
        known: &IntegrationPolicy,
        observed: IntegrationPolicy,
        source: &dyn PackageSource,
    ) -> ReconcileResult<IntegrationPolicy> {
        let key = package_key(known, &observed);
        let defaults = self.defaults_for(&key, source)?;

        let mut result = observed;

        let vars_equal = known
            .vars_json
            .semantically_equal_at(&result.vars_json, &FieldPath::attr("vars_json"))
            .map_err(|e| ReconcileError::Equality(EqualityError::Malformed(e.into())))?;
        if vars_equal {
            result.vars_json = known.vars_json.clone();
        }

        let mut known_with_defaults = known.clone();
        known_with_defaults.attach_defaults(&defaults);
        result.attach_defaults(&defaults);
        if inputs_equal(known_with_defaults.inputs.as_ref(), result.inputs.as_ref())? {
            tracing::debug!(package = %key, "inputs unchanged, keeping known representation");
            result.inputs = known.inputs.clone();
        } else {
            tracing::debug!(package = %key, "inputs changed, taking observed representation");
        }

        keep_target_shape(known, &mut result);
        if result.space_ids.is_none() {
            result.space_ids = known.space_ids.clone();
        }

        Ok(result.without_defaults())
    }
}

impl Default for Reconciler {
    fn default() -> Self {
        Self::with_valid_config(ReconcileConfig::default())
    }
}

/// Package the defaults come from: observed identity, else the known one
fn package_key(known: &IntegrationPolicy, observed: &IntegrationPolicy) -> PackageKey {
    if observed.integration_name.is_empty() {
        PackageKey::new(&known.integration_name, &known.integration_version)
    } else {
        PackageKey::new(&observed.integration_name, &observed.integration_version)
    }
}

/// Keep whichever agent policy field the known record used
///
/// A record declared with only `agent_policy_id` keeps `agent_policy_ids`
/// unset, and the other way round.
fn keep_target_shape(known: &IntegrationPolicy, result: &mut IntegrationPolicy) {
    match (&known.agent_policy_id, &known.agent_policy_ids) {
        (Some(_), None) => {
            let ids = result.agent_policy_ids.take();
            if result.agent_policy_id.is_none() {
                result.agent_policy_id = ids.and_then(|ids| ids.into_iter().next());
            }
        }
        (None, Some(_)) => {
            let id = result.agent_policy_id.take();
            if result.agent_policy_ids.is_none() {
                result.agent_policy_ids = id.map(|id| vec![id]);
            }
        }
        _ => {}
    }
}

fn drifted_attributes(prior: &IntegrationPolicy, current: &IntegrationPolicy) -> Vec<&'static str> {
    TRACKED_ATTRIBUTES
        .iter()
        .copied()
        .filter(|attribute| match *attribute {
            "name" => prior.name != current.name,
            "namespace" => prior.namespace != current.namespace,
            "description" => prior.description != current.description,
            "enabled" => prior.enabled != current.enabled,
            "agent_policy_id" => prior.agent_policy_id != current.agent_policy_id,
            "agent_policy_ids" => prior.agent_policy_ids != current.agent_policy_ids,
            "output_id" => prior.output_id != current.output_id,
            "integration_version" => prior.integration_version != current.integration_version,
            // Kept representations are identical; anything else was replaced
            "vars_json" => prior.vars_json != current.vars_json,
            "inputs" => prior.inputs != current.inputs,
            _ => false,
        })
        .collect()
}

/// Whether two stored records are the same, ignoring formatting and defaults
///
/// Every tracked attribute is compared: plain attributes by value,
/// `vars_json` and `inputs` semantically.
///
/// # Errors
/// Returns error if either record holds malformed JSON
pub fn records_equal(
    a: &IntegrationPolicy,
    b: &IntegrationPolicy,
    defaults: &DefaultsMap,
) -> ReconcileResult<bool> {
    let plain_drift = drifted_attributes(a, b)
        .into_iter()
        .any(|attribute| !matches!(attribute, "vars_json" | "inputs"));
    if plain_drift {
        return Ok(false);
    }

    let mut a = a.clone();
    let mut b = b.clone();
    a.attach_defaults(defaults);
    b.attach_defaults(defaults);
    Ok(a.semantic_eq(&b)?)
}
