use ipr_core::prelude::*;
use ipr_equality::inputs_equal;
use ipr_model::{Enabled, Input, Inputs, NormalizedJson, SecretReference, Stream};
use ipr_secrets::SecretResolver;
use ipr_test_utils::{declared_policy, nginx_defaults, nginx_response, nginx_source, object};
use proptest::prelude::*;
use serde_json::{json, Value};

fn arb_plaintext() -> impl Strategy<Value = Value> {
    prop_oneof![
        "[a-zA-Z0-9!@#]{1,16}".prop_map(Value::String),
        any::<i64>().prop_map(Value::from),
        proptest::collection::vec("[a-z]{1,6}", 0..4).prop_map(|items| json!(items)),
    ]
}

proptest! {
    #[test]
    fn prop_secret_round_trip(
        name in "[a-z_]{1,10}",
        plaintext in arb_plaintext(),
        handle in "[a-f0-9]{8}",
    ) {
        let resolver = SecretResolver::default();
        let mut store = InMemoryPrivateStore::new();
        let reference = json!({"isSecretRef": true, "id": handle.clone()});

        let request = PolicyRequest {
            vars: Some(object(json!({ name.clone(): plaintext.clone() }))),
            ..PolicyRequest::default()
        };
        let response = PolicyResponse {
            vars: Some(object(json!({ name.clone(): reference.clone() }))),
            secret_references: Some(vec![SecretReference { id: handle.clone() }]),
            ..PolicyResponse::default()
        };

        let (written, _) = resolver.after_write(&request, response.clone(), &mut store).unwrap();
        prop_assert_eq!(&written.vars.as_ref().unwrap()[&name], &plaintext);

        let (read, stats) = resolver.after_read(response, &mut store).unwrap();
        prop_assert_eq!(&read.vars.as_ref().unwrap()[&name], &plaintext);
        prop_assert_eq!(stats.unresolved, 0);
    }

    #[test]
    fn prop_reformatted_vars_never_drift(indent in 0usize..4, reorder in any::<bool>()) {
        let reconciler = Reconciler::default();
        let mut store = InMemoryPrivateStore::new();

        let pad = " ".repeat(indent);
        let vars = if reorder {
            format!(r#"{{{pad}"b":{pad}2,{pad}"a":{pad}1{pad}}}"#)
        } else {
            format!(r#"{{"a":{pad}1,{pad}"b":2}}"#)
        };
        let prior = IntegrationPolicy {
            vars_json: NormalizedJson::new(vars),
            ..declared_policy()
        };
        let mut response = nginx_response();
        response.vars = Some(object(json!({"a": 1, "b": 2})));

        let outcome = reconciler
            .after_read(&prior, response, &mut store, &nginx_source)
            .unwrap();
        prop_assert!(!outcome.drift.contains(&"vars_json"));
        prop_assert_eq!(outcome.policy.vars_json, prior.vars_json);
    }

    #[test]
    fn prop_disabled_streams_never_count(
        extra in proptest::collection::btree_map("s[0-9]", "[a-z]{1,5}", 0..4),
        on_declared_side in any::<bool>(),
    ) {
        let defaults = nginx_defaults();
        let base = Input::new(Enabled::True, NormalizedJson::new(r#"{"hosts":[]}"#))
            .with_stream("nginx.stubstatus", Stream::new(Enabled::True, NormalizedJson::Null));

        let mut with_extra = base.clone();
        for (id, tag) in &extra {
            with_extra = with_extra.with_stream(
                id.clone(),
                Stream::new(Enabled::False, NormalizedJson::new(format!(r#"{{"tag":"{tag}"}}"#))),
            );
        }

        let mut a: Inputs = [("nginx-nginx/metrics".to_string(), base)].into_iter().collect();
        let mut b: Inputs = [("nginx-nginx/metrics".to_string(), with_extra)].into_iter().collect();
        if on_declared_side {
            std::mem::swap(&mut a, &mut b);
        }
        for input in a.values_mut().chain(b.values_mut()) {
            input.defaults = defaults.get("nginx-nginx/metrics").cloned();
        }

        prop_assert!(inputs_equal(Some(&a), Some(&b)).unwrap());
        prop_assert!(inputs_equal(Some(&b), Some(&a)).unwrap());
    }
}
