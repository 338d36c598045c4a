//! Testing utilities for IPR workspace
//!
//! Shared fixtures: record builders, a sample package and the matching
//! server response.

#![allow(missing_docs)]

use ipr_defaults::{resolve_defaults, DefaultsError, PackageDescriptor, PackageKey};
use ipr_model::{
    DefaultsMap, Enabled, Input, InputPayload, IntegrationPolicy, NormalizedJson, PackageRef,
    PolicyResponse, Stream, StreamPayload,
};
use serde_json::{json, Value};

pub fn json(text: &str) -> NormalizedJson {
    NormalizedJson::new(text)
}

pub fn input(enabled: Enabled, vars: NormalizedJson) -> Input {
    Input::new(enabled, vars)
}

pub fn stream(enabled: Enabled, vars: NormalizedJson) -> Stream {
    Stream::new(enabled, vars)
}

pub fn object(value: Value) -> serde_json::Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => panic!("expected a JSON object, got {other}"),
    }
}

/// Package with one logfile input (two streams, one off by default) and one
/// metrics input.
pub fn nginx_descriptor() -> PackageDescriptor {
    PackageDescriptor::from_value(json!({
        "name": "nginx",
        "version": "1.2.0",
        "policy_templates": [{
            "name": "nginx",
            "inputs": [
                {"type": "logfile", "vars": [{"name": "tags", "default": ["nginx"]}]},
                {"type": "nginx/metrics", "vars": [
                    {"name": "hosts", "multi": true},
                    {"name": "period", "default": "10s"}
                ]}
            ]
        }],
        "data_streams": [
            {"dataset": "nginx.access", "streams": [
                {"input": "logfile", "enabled": true, "vars": [{"name": "paths", "default": ["/var/log/nginx/access.log"]}]}
            ]},
            {"dataset": "nginx.error", "streams": [
                {"input": "logfile", "enabled": false, "vars": [{"name": "paths", "default": ["/var/log/nginx/error.log"]}]}
            ]},
            {"dataset": "nginx.stubstatus", "streams": [
                {"input": "nginx/metrics", "enabled": true, "vars": [{"name": "server_status_path", "default": "/nginx_status"}]}
            ]}
        ]
    }))
    .unwrap()
}

pub fn nginx_key() -> PackageKey {
    PackageKey::new("nginx", "1.2.0")
}

pub fn nginx_defaults() -> DefaultsMap {
    resolve_defaults(Some(&nginx_descriptor())).unwrap()
}

/// Package source that only knows the nginx fixture
pub fn nginx_source(key: &PackageKey) -> Result<Option<PackageDescriptor>, DefaultsError> {
    Ok((*key == nginx_key()).then(nginx_descriptor))
}

/// What a user would declare: only the metrics input, vars partly set
pub fn declared_policy() -> IntegrationPolicy {
    IntegrationPolicy {
        name: "nginx-1".to_string(),
        namespace: Some("default".to_string()),
        agent_policy_id: Some("agent-policy-1".to_string()),
        integration_name: "nginx".to_string(),
        integration_version: "1.2.0".to_string(),
        inputs: Some(
            [(
                "nginx-nginx/metrics".to_string(),
                input(Enabled::True, json(r#"{"hosts":["http://127.0.0.1:80"]}"#)),
            )]
            .into_iter()
            .collect(),
        ),
        ..IntegrationPolicy::default()
    }
}

/// What the server echoes back for [`declared_policy`]: every default filled
/// in, and the logfile input returned disabled
pub fn nginx_response() -> PolicyResponse {
    PolicyResponse {
        id: "policy-1".to_string(),
        name: "nginx-1".to_string(),
        namespace: Some("default".to_string()),
        enabled: Some(true),
        policy_id: Some("agent-policy-1".to_string()),
        package: Some(PackageRef {
            name: "nginx".to_string(),
            version: "1.2.0".to_string(),
        }),
        vars: None,
        inputs: [
            (
                "nginx-logfile".to_string(),
                InputPayload {
                    enabled: Some(false),
                    vars: Some(object(json!({"tags": ["nginx"]}))),
                    streams: Some(
                        [(
                            "nginx.access".to_string(),
                            StreamPayload {
                                enabled: Some(false),
                                vars: Some(object(json!({"paths": ["/var/log/nginx/access.log"]}))),
                            },
                        )]
                        .into_iter()
                        .collect(),
                    ),
                },
            ),
            (
                "nginx-nginx/metrics".to_string(),
                InputPayload {
                    enabled: Some(true),
                    vars: Some(object(json!({
                        "hosts": ["http://127.0.0.1:80"],
                        "period": "10s"
                    }))),
                    streams: Some(
                        [(
                            "nginx.stubstatus".to_string(),
                            StreamPayload {
                                enabled: Some(true),
                                vars: Some(object(json!({"server_status_path": "/nginx_status"}))),
                            },
                        )]
                        .into_iter()
                        .collect(),
                    ),
                },
            ),
        ]
        .into_iter()
        .collect(),
        ..PolicyResponse::default()
    }
}
