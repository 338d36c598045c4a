//! Write path and read path
//!
//! Both paths load the record's vault, prune entries whose handle the
//! response no longer carries, replace every reference handle in the
//! response vars with plaintext, and store the vault again.
//!
//! - **write**: plaintext comes from the request at the same position and
//!   is recorded in the vault; the vault is the fallback when the request
//!   has no value there
//! - **read**: plaintext comes from the vault only
//!
//! A handle with no plaintext available is left in place.

use std::collections::BTreeSet;

use serde_json::Value;

use ipr_model::{
    Diagnostics, FieldError, FieldErrorKind, FieldPath, JsonObject, PolicyRequest, PolicyResponse,
};

use crate::error::SecretError;
use crate::reference::{decode_var, leaf_mut, SecretRef, VarValue};
use crate::store::PrivateStore;
use crate::vault::SecretVault;

/// Default private store key of the vault
pub const DEFAULT_SECRETS_KEY: &str = "secrets";

/// Counters for one pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolveStats {
    /// Handles recorded from the request
    pub captured: usize,
    /// Handles replaced with plaintext
    pub resolved: usize,
    /// Handles left in place
    pub unresolved: usize,
    /// Vault entries dropped as stale
    pub pruned: usize,
}

/// Resolves secret references against a record's vault
#[derive(Debug, Clone)]
pub struct SecretResolver {
    key: String,
}

impl SecretResolver {
    /// Resolver using the vault under `key`
    #[inline]
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }

    /// Private store key of the vault
    #[inline]
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Write path: replace handles with the plaintext sent in `request`
    ///
    /// Nothing is stored when the request and response disagree.
    ///
    /// # Errors
    /// Returns [`SecretError::Malformed`] if a multi-value handle meets a
    /// request value that is not a list of the same length, or error if the
    /// store fails
    pub fn after_write<S>(
        &self,
        request: &PolicyRequest,
        mut response: PolicyResponse,
        store: &mut S,
    ) -> Result<(PolicyResponse, ResolveStats), SecretError>
    where
        S: PrivateStore + ?Sized,
    {
        let mut vault = SecretVault::load(&*store, &self.key)?;
        let mut stats = ResolveStats {
            pruned: vault.prune(&live_handles(&response)),
            ..ResolveStats::default()
        };

        let mut diags = Diagnostics::new();
        rewrite_response(&mut response, Some(request), &mut vault, &mut stats, &mut diags);
        if !diags.is_empty() {
            return Err(SecretError::Malformed(diags));
        }

        vault.save(store, &self.key)?;
        tracing::debug!(
            captured = stats.captured,
            resolved = stats.resolved,
            unresolved = stats.unresolved,
            pruned = stats.pruned,
            vault = vault.len(),
            "secrets resolved after write"
        );
        Ok((response, stats))
    }

    /// Read path: replace handles with plaintext recorded earlier
    ///
    /// # Errors
    /// Returns error if the store fails or holds a corrupt vault
    pub fn after_read<S>(
        &self,
        mut response: PolicyResponse,
        store: &mut S,
    ) -> Result<(PolicyResponse, ResolveStats), SecretError>
    where
        S: PrivateStore + ?Sized,
    {
        let mut vault = SecretVault::load(&*store, &self.key)?;
        let mut stats = ResolveStats {
            pruned: vault.prune(&live_handles(&response)),
            ..ResolveStats::default()
        };

        let mut diags = Diagnostics::new();
        rewrite_response(&mut response, None, &mut vault, &mut stats, &mut diags);
        if !diags.is_empty() {
            return Err(SecretError::Malformed(diags));
        }

        vault.save(store, &self.key)?;
        tracing::debug!(
            resolved = stats.resolved,
            unresolved = stats.unresolved,
            pruned = stats.pruned,
            "secrets resolved after read"
        );
        Ok((response, stats))
    }
}

impl Default for SecretResolver {
    fn default() -> Self {
        Self::new(DEFAULT_SECRETS_KEY)
    }
}

/// Every handle a response currently holds
///
/// The union of its `secret_references` list and the handles embedded in
/// its vars.
#[must_use]
pub fn live_handles(response: &PolicyResponse) -> BTreeSet<String> {
    let mut live: BTreeSet<String> = response
        .secret_references
        .iter()
        .flatten()
        .map(|reference| reference.id.clone())
        .collect();
    for vars in response.var_maps() {
        for value in vars.values() {
            if let VarValue::Secret(reference) = decode_var(value) {
                live.extend(reference.ids().map(str::to_string));
            }
        }
    }
    live
}

fn rewrite_response(
    response: &mut PolicyResponse,
    request: Option<&PolicyRequest>,
    vault: &mut SecretVault,
    stats: &mut ResolveStats,
    diags: &mut Diagnostics,
) {
    let mut pass = Pass { vault, stats, diags };

    if let Some(vars) = response.vars.as_mut() {
        let sent = request.and_then(|r| r.vars.as_ref());
        pass.rewrite_vars(vars, sent, &FieldPath::attr("vars"));
    }

    for (id, input) in &mut response.inputs {
        let sent_input = request
            .and_then(|r| r.inputs.as_ref())
            .and_then(|inputs| inputs.get(id));
        let path = FieldPath::attr("inputs").key(id.as_str());

        if let Some(vars) = input.vars.as_mut() {
            let sent = sent_input.and_then(|i| i.vars.as_ref());
            pass.rewrite_vars(vars, sent, &path.clone().child("vars"));
        }

        for (stream_id, stream) in input.streams.iter_mut().flatten() {
            let Some(vars) = stream.vars.as_mut() else {
                continue;
            };
            let sent = sent_input
                .and_then(|i| i.streams.as_ref())
                .and_then(|streams| streams.get(stream_id))
                .and_then(|s| s.vars.as_ref());
            let stream_path = path.clone().child("streams").key(stream_id.as_str()).child("vars");
            pass.rewrite_vars(vars, sent, &stream_path);
        }
    }
}

struct Pass<'a> {
    vault: &'a mut SecretVault,
    stats: &'a mut ResolveStats,
    diags: &'a mut Diagnostics,
}

impl Pass<'_> {
    fn rewrite_vars(&mut self, vars: &mut JsonObject, sent: Option<&JsonObject>, path: &FieldPath) {
        for (name, slot) in vars.iter_mut() {
            let reference = match decode_var(slot) {
                VarValue::Secret(reference) => reference,
                VarValue::Plain(_) => continue,
            };
            let var_path = path.clone().key(name.as_str());
            let plaintext = match sent.and_then(|sent| sent.get(name)) {
                Some(value) => self.capture(&reference, value, var_path.clone()),
                None => self.vault.lookup(&reference),
            };
            match plaintext {
                Some(value) => {
                    *leaf_mut(slot) = value;
                    self.stats.resolved += 1;
                }
                None => {
                    self.stats.unresolved += 1;
                    tracing::warn!(
                        path = %var_path,
                        handles = ?reference.ids().collect::<Vec<_>>(),
                        "secret reference left unresolved"
                    );
                }
            }
        }
    }

    /// Record the plaintext sent for a handle
    fn capture(&mut self, reference: &SecretRef, sent: &Value, path: FieldPath) -> Option<Value> {
        match reference {
            SecretRef::Single { id } => {
                self.vault.insert(id.clone(), sent.clone());
                self.stats.captured += 1;
                Some(sent.clone())
            }
            SecretRef::Multi { ids } => {
                let Value::Array(values) = sent else {
                    self.diags
                        .push(FieldError::new(path, FieldErrorKind::SecretNotAList));
                    return None;
                };
                if ids.len() != values.len() {
                    self.diags.push(FieldError::new(
                        path,
                        FieldErrorKind::SecretCardinality {
                            handles: ids.len(),
                            values: values.len(),
                        },
                    ));
                    return None;
                }
                for (id, value) in ids.iter().zip(values) {
                    self.vault.insert(id.clone(), value.clone());
                }
                self.stats.captured += ids.len();
                Some(sent.clone())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryPrivateStore;
    use ipr_model::{InputPayload, SecretReference, StreamPayload};
    use ipr_test_utils::object;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn handle(id: &str) -> Value {
        json!({"isSecretRef": true, "id": id})
    }

    fn request_with(vars: Value) -> PolicyRequest {
        PolicyRequest {
            name: "p".to_string(),
            vars: Some(object(vars)),
            ..PolicyRequest::default()
        }
    }

    fn response_with(vars: Value, references: &[&str]) -> PolicyResponse {
        PolicyResponse {
            id: "p-1".to_string(),
            vars: Some(object(vars)),
            secret_references: Some(
                references
                    .iter()
                    .map(|id| SecretReference { id: (*id).to_string() })
                    .collect(),
            ),
            ..PolicyResponse::default()
        }
    }

    #[test]
    fn write_then_read_round_trip() {
        let resolver = SecretResolver::default();
        let mut store = InMemoryPrivateStore::new();

        let request = request_with(json!({"password": "hunter2", "user": "elastic"}));
        let response = response_with(json!({"password": handle("h1"), "user": "elastic"}), &["h1"]);
        let (written, stats) = resolver.after_write(&request, response, &mut store).unwrap();
        assert_eq!(written.vars, Some(object(json!({"password": "hunter2", "user": "elastic"}))));
        assert_eq!(stats.captured, 1);

        let vault = SecretVault::load(&store, "secrets").unwrap();
        assert_eq!(vault.get("h1"), Some(&json!("hunter2")));

        let fresh = response_with(json!({"password": handle("h1"), "user": "elastic"}), &["h1"]);
        let (read, stats) = resolver.after_read(fresh, &mut store).unwrap();
        assert_eq!(read.vars, Some(object(json!({"password": "hunter2", "user": "elastic"}))));
        assert_eq!(stats.resolved, 1);
        assert_eq!(stats.unresolved, 0);
    }

    #[test]
    fn wrapped_handle_keeps_its_wrapper() {
        let resolver = SecretResolver::default();
        let mut store = InMemoryPrivateStore::new();
        let request = request_with(json!({"password": "hunter2"}));
        let response = response_with(
            json!({"password": {"type": "password", "value": handle("h1")}}),
            &["h1"],
        );
        let (written, _) = resolver.after_write(&request, response, &mut store).unwrap();
        assert_eq!(
            written.vars,
            Some(object(json!({"password": {"type": "password", "value": "hunter2"}})))
        );
    }

    #[test]
    fn multi_value_handles_are_captured_position_by_position() {
        let resolver = SecretResolver::default();
        let mut store = InMemoryPrivateStore::new();
        let request = request_with(json!({"tokens": ["a", "b"]}));
        let response = response_with(
            json!({"tokens": {"isSecretRef": true, "ids": ["h1", "h2"]}}),
            &["h1", "h2"],
        );
        let (written, stats) = resolver.after_write(&request, response, &mut store).unwrap();
        assert_eq!(written.vars, Some(object(json!({"tokens": ["a", "b"]}))));
        assert_eq!(stats.captured, 2);

        let vault = SecretVault::load(&store, "secrets").unwrap();
        assert_eq!(vault.get("h1"), Some(&json!("a")));
        assert_eq!(vault.get("h2"), Some(&json!("b")));
    }

    #[test]
    fn multi_value_length_mismatch_is_fatal() {
        let resolver = SecretResolver::default();
        let mut store = InMemoryPrivateStore::new();
        let request = request_with(json!({"tokens": ["a"]}));
        let response = response_with(
            json!({"tokens": {"isSecretRef": true, "ids": ["h1", "h2"]}}),
            &["h1", "h2"],
        );
        let err = resolver.after_write(&request, response, &mut store).unwrap_err();
        let error = err.diagnostics().unwrap().iter().next().unwrap().clone();
        assert_eq!(error.path.to_string(), r#"vars["tokens"]"#);
        assert_eq!(
            error.kind,
            FieldErrorKind::SecretCardinality {
                handles: 2,
                values: 1
            }
        );
        // Nothing stored on failure
        assert!(store.is_empty());
    }

    #[test]
    fn multi_value_handle_against_scalar_is_fatal() {
        let resolver = SecretResolver::default();
        let mut store = InMemoryPrivateStore::new();
        let request = request_with(json!({"tokens": "a"}));
        let response = response_with(
            json!({"tokens": {"isSecretRef": true, "ids": ["h1"]}}),
            &["h1"],
        );
        let err = resolver.after_write(&request, response, &mut store).unwrap_err();
        assert_eq!(
            err.diagnostics().unwrap().iter().next().unwrap().kind,
            FieldErrorKind::SecretNotAList
        );
    }

    #[test]
    fn single_handle_against_list_stores_the_list() {
        let resolver = SecretResolver::default();
        let mut store = InMemoryPrivateStore::new();
        let request = request_with(json!({"hosts": ["a", "b"]}));
        let response = response_with(json!({"hosts": handle("h1")}), &["h1"]);
        let (written, _) = resolver.after_write(&request, response, &mut store).unwrap();
        assert_eq!(written.vars, Some(object(json!({"hosts": ["a", "b"]}))));
        let vault = SecretVault::load(&store, "secrets").unwrap();
        assert_eq!(vault.get("h1"), Some(&json!(["a", "b"])));
    }

    #[test]
    fn unknown_handle_is_left_in_place() {
        let resolver = SecretResolver::default();
        let mut store = InMemoryPrivateStore::new();
        let response = response_with(json!({"password": handle("h9")}), &["h9"]);
        let (read, stats) = resolver.after_read(response, &mut store).unwrap();
        assert_eq!(read.vars, Some(object(json!({"password": handle("h9")}))));
        assert_eq!(stats.unresolved, 1);
    }

    #[test]
    fn stale_entries_are_pruned() {
        let resolver = SecretResolver::default();
        let mut store = InMemoryPrivateStore::new();
        let mut vault = SecretVault::new();
        vault.insert("old", json!("rotated-away"));
        vault.insert("h1", json!("hunter2"));
        vault.save(&mut store, "secrets").unwrap();

        let response = response_with(json!({"password": handle("h1")}), &[]);
        let (_, stats) = resolver.after_read(response, &mut store).unwrap();
        assert_eq!(stats.pruned, 1);

        let vault = SecretVault::load(&store, "secrets").unwrap();
        assert_eq!(vault.handles().collect::<Vec<_>>(), vec!["h1"]);
    }

    #[test]
    fn listed_references_keep_their_entries() {
        let mut store = InMemoryPrivateStore::new();
        let mut vault = SecretVault::new();
        vault.insert("h1", json!("hunter2"));
        vault.save(&mut store, "secrets").unwrap();

        // Not embedded in vars but still listed
        let response = response_with(json!({}), &["h1"]);
        let (_, stats) = SecretResolver::default().after_read(response, &mut store).unwrap();
        assert_eq!(stats.pruned, 0);
    }

    #[test]
    fn read_path_resolves_multi_value_when_complete() {
        let mut store = InMemoryPrivateStore::new();
        let mut vault = SecretVault::new();
        vault.insert("h1", json!("a"));
        vault.insert("h2", json!("b"));
        vault.save(&mut store, "secrets").unwrap();

        let response = response_with(
            json!({"tokens": {"isSecretRef": true, "ids": ["h1", "h2"]}}),
            &["h1", "h2"],
        );
        let (read, _) = SecretResolver::default().after_read(response, &mut store).unwrap();
        assert_eq!(read.vars, Some(object(json!({"tokens": ["a", "b"]}))));
    }

    #[test]
    fn input_and_stream_vars_are_paired_with_the_request() {
        let resolver = SecretResolver::default();
        let mut store = InMemoryPrivateStore::new();
        let request = PolicyRequest {
            inputs: Some(
                [(
                    "sql-metrics".to_string(),
                    InputPayload {
                        vars: Some(object(json!({"password": "input-secret"}))),
                        streams: Some(
                            [(
                                "sql.query".to_string(),
                                StreamPayload {
                                    enabled: Some(true),
                                    vars: Some(object(json!({"dsn": "stream-secret"}))),
                                },
                            )]
                            .into_iter()
                            .collect(),
                        ),
                        ..InputPayload::default()
                    },
                )]
                .into_iter()
                .collect(),
            ),
            ..PolicyRequest::default()
        };
        let response = PolicyResponse {
            inputs: [(
                "sql-metrics".to_string(),
                InputPayload {
                    vars: Some(object(json!({"password": handle("h1")}))),
                    streams: Some(
                        [(
                            "sql.query".to_string(),
                            StreamPayload {
                                enabled: Some(true),
                                vars: Some(object(json!({"dsn": handle("h2")}))),
                            },
                        )]
                        .into_iter()
                        .collect(),
                    ),
                    ..InputPayload::default()
                },
            )]
            .into_iter()
            .collect(),
            ..PolicyResponse::default()
        };

        let (written, stats) = resolver.after_write(&request, response, &mut store).unwrap();
        assert_eq!(stats.captured, 2);
        let input = &written.inputs["sql-metrics"];
        assert_eq!(input.vars, Some(object(json!({"password": "input-secret"}))));
        let stream = &input.streams.as_ref().unwrap()["sql.query"];
        assert_eq!(stream.vars, Some(object(json!({"dsn": "stream-secret"}))));
    }

    #[test]
    fn missing_request_value_falls_back_to_vault() {
        let resolver = SecretResolver::default();
        let mut store = InMemoryPrivateStore::new();
        let mut vault = SecretVault::new();
        vault.insert("h1", json!("hunter2"));
        vault.save(&mut store, "secrets").unwrap();

        let request = request_with(json!({}));
        let response = response_with(json!({"password": handle("h1")}), &["h1"]);
        let (written, stats) = resolver.after_write(&request, response, &mut store).unwrap();
        assert_eq!(written.vars, Some(object(json!({"password": "hunter2"}))));
        assert_eq!(stats.captured, 0);
        assert_eq!(stats.resolved, 1);
    }

    #[test]
    fn other_store_keys_are_untouched() {
        let resolver = SecretResolver::new("vault");
        let mut store = InMemoryPrivateStore::new();
        store.set_key("secrets", b"caller data".to_vec()).unwrap();
        let request = request_with(json!({"password": "hunter2"}));
        let response = response_with(json!({"password": handle("h1")}), &["h1"]);
        resolver.after_write(&request, response, &mut store).unwrap();
        assert_eq!(store.get_key("secrets").unwrap(), Some(b"caller data".to_vec()));
        assert!(store.get_key("vault").unwrap().is_some());
    }
}
