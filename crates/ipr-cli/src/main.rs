//! `iprctl`: offline tooling for stored integration policy records

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use serde_json::{Map, Value};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use ipr_core::{records_equal, ReconcileConfig, Reconciler};
use ipr_defaults::{resolve_defaults, PackageDescriptor};
use ipr_model::{DefaultsMap, IntegrationPolicy, NormalizedJson};

fn cli() -> Command {
    Command::new("iprctl")
        .version(ipr_core::VERSION)
        .about("Integration policy record tooling")
        .subcommand_required(true)
        .arg(
            Arg::new("log-json")
                .long("log-json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON lines"),
        )
        .subcommand(
            Command::new("migrate")
                .about("Upgrade a stored record to the current generation")
                .arg(
                    Arg::new("from")
                        .long("from")
                        .required(true)
                        .value_parser(value_parser!(u32))
                        .help("Generation the stored record was written with"),
                )
                .arg(
                    Arg::new("file")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("Stored record as JSON"),
                ),
        )
        .subcommand(
            Command::new("defaults")
                .about("Print the defaults derived from a package descriptor")
                .arg(
                    Arg::new("descriptor")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("Package descriptor as JSON"),
                ),
        )
        .subcommand(
            Command::new("diff")
                .about("Compare two records; exits 1 when they differ")
                .arg(
                    Arg::new("old")
                        .required(true)
                        .value_parser(value_parser!(PathBuf)),
                )
                .arg(
                    Arg::new("new")
                        .required(true)
                        .value_parser(value_parser!(PathBuf)),
                )
                .arg(
                    Arg::new("package")
                        .long("package")
                        .value_parser(value_parser!(PathBuf))
                        .help("Package descriptor whose defaults are ignored when comparing"),
                ),
        )
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn main() -> Result<ExitCode> {
    let matches = cli().get_matches();
    init_tracing(matches.get_flag("log-json"));

    match matches.subcommand() {
        Some(("migrate", args)) => {
            let from = *args.get_one::<u32>("from").context("missing --from")?;
            let policy = migrate(path_arg(args, "file")?, from)?;
            println!("{}", serde_json::to_string_pretty(&policy)?);
            Ok(ExitCode::SUCCESS)
        }
        Some(("defaults", args)) => {
            let defaults = defaults(path_arg(args, "descriptor")?)?;
            println!("{}", serde_json::to_string_pretty(&defaults_to_json(&defaults)?)?);
            Ok(ExitCode::SUCCESS)
        }
        Some(("diff", args)) => {
            let package = args.get_one::<PathBuf>("package").map(PathBuf::as_path);
            let same = diff(path_arg(args, "old")?, path_arg(args, "new")?, package)?;
            if same {
                println!("no drift");
                Ok(ExitCode::SUCCESS)
            } else {
                println!("drift");
                Ok(ExitCode::from(1))
            }
        }
        _ => Ok(ExitCode::SUCCESS),
    }
}

fn path_arg<'a>(args: &'a ArgMatches, name: &str) -> Result<&'a Path> {
    args.get_one::<PathBuf>(name)
        .map(PathBuf::as_path)
        .with_context(|| format!("missing <{name}>"))
}

fn read_json(path: &Path) -> Result<Value> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}

fn migrate(path: &Path, from: u32) -> Result<IntegrationPolicy> {
    let stored = read_json(path)?;
    let reconciler = Reconciler::new(ReconcileConfig::default())?;
    let policy = reconciler
        .migrate(&stored, from)
        .with_context(|| format!("migrating {} from generation {from}", path.display()))?;
    info!(file = %path.display(), from, "record migrated");
    Ok(policy)
}

fn defaults(path: &Path) -> Result<DefaultsMap> {
    let descriptor = PackageDescriptor::from_value(read_json(path)?)
        .with_context(|| format!("loading descriptor {}", path.display()))?;
    let defaults = resolve_defaults(Some(&descriptor))?;
    debug!(inputs = defaults.len(), "defaults resolved");
    Ok(defaults)
}

fn diff(old: &Path, new: &Path, package: Option<&Path>) -> Result<bool> {
    let old: IntegrationPolicy = serde_json::from_value(read_json(old)?)
        .with_context(|| format!("decoding {}", old.display()))?;
    let new: IntegrationPolicy = serde_json::from_value(read_json(new)?)
        .with_context(|| format!("decoding {}", new.display()))?;
    let defaults = match package {
        Some(path) => defaults(path)?,
        None => DefaultsMap::new(),
    };
    Ok(records_equal(&old, &new, &defaults)?)
}

fn json_value(json: &NormalizedJson, path: &str) -> Result<Value> {
    let parsed = json
        .parse()
        .with_context(|| format!("defaults for {path} are not valid JSON"))?;
    Ok(parsed.unwrap_or(Value::Null))
}

fn defaults_to_json(defaults: &DefaultsMap) -> Result<Value> {
    let mut inputs = Map::new();
    for (id, input) in defaults {
        let mut streams = Map::new();
        for (stream_id, stream) in &input.streams {
            let entry = serde_json::json!({
                "enabled": stream.enabled.as_bool(),
                "vars": json_value(&stream.vars, &format!("{id}/{stream_id}"))?,
            });
            streams.insert(stream_id.clone(), entry);
        }
        let entry = serde_json::json!({
            "vars": json_value(&input.vars, id)?,
            "streams": streams,
        });
        inputs.insert(id.clone(), entry);
    }
    Ok(Value::Object(inputs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ipr_model::InputDefaults;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, value: &Value) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, value.to_string()).unwrap();
        path
    }

    fn descriptor() -> Value {
        json!({
            "name": "nginx",
            "version": "1.2.0",
            "policy_templates": [{
                "name": "nginx",
                "inputs": [{"type": "nginx/metrics", "vars": [
                    {"name": "period", "type": "text", "default": "10s"}
                ]}]
            }]
        })
    }

    #[test]
    fn cli_definition_is_consistent() {
        cli().debug_assert();
    }

    #[test]
    fn diff_exit_flag_parses() {
        let matches = cli()
            .try_get_matches_from(["iprctl", "diff", "a.json", "b.json", "--package", "p.json"])
            .unwrap();
        let (name, args) = matches.subcommand().unwrap();
        assert_eq!(name, "diff");
        assert_eq!(path_arg(args, "old").unwrap(), Path::new("a.json"));
    }

    #[test]
    fn migrate_reads_legacy_file() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "v0.json", &json!({
            "name": "nginx-1",
            "vars_json": "",
            "input": [{"input_id": "nginx-nginx/metrics", "enabled": true, "streams_json": ""}]
        }));
        let policy = migrate(&path, 0).unwrap();
        assert_eq!(policy.name, "nginx-1");
        assert!(policy.vars_json.is_null());
        assert!(policy.inputs_or_empty().contains_key("nginx-nginx/metrics"));
    }

    #[test]
    fn migrate_reports_the_file() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "v7.json", &json!({}));
        let err = migrate(&path, 7).unwrap_err();
        assert!(format!("{err:#}").contains("v7.json"));
    }

    #[test]
    fn defaults_are_printed_per_input() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "nginx.json", &descriptor());
        let printed = defaults_to_json(&defaults(&path).unwrap()).unwrap();
        assert_eq!(printed["nginx-nginx/metrics"]["vars"], json!({"period": "10s"}));
    }

    #[test]
    fn diff_ignores_formatting_and_defaults() {
        let dir = TempDir::new().unwrap();
        let old = write(&dir, "old.json", &json!({
            "name": "nginx-1",
            "integration_name": "nginx",
            "integration_version": "1.2.0",
            "vars_json": "{\"a\": 1}",
            "inputs": {"nginx-nginx/metrics": {"enabled": true, "vars": null}}
        }));
        let new = write(&dir, "new.json", &json!({
            "name": "nginx-1",
            "integration_name": "nginx",
            "integration_version": "1.2.0",
            "vars_json": "{\"a\":1}",
            "inputs": {"nginx-nginx/metrics": {"enabled": true, "vars": "{\"period\":\"10s\"}"}}
        }));
        let package = write(&dir, "nginx.json", &descriptor());

        assert!(!diff(&old, &new, None).unwrap());
        assert!(diff(&old, &new, Some(package.as_path())).unwrap());
    }

    #[test]
    fn diff_reports_plain_attribute_change() {
        let dir = TempDir::new().unwrap();
        let old = write(&dir, "old.json", &json!({"name": "a", "namespace": "default"}));
        let new = write(&dir, "new.json", &json!({"name": "b", "namespace": "prod"}));
        assert!(!diff(&old, &new, None).unwrap());
        assert!(diff(&old, &old, None).unwrap());
    }

    #[test]
    fn unparseable_defaults_are_an_error() {
        let mut defaults = DefaultsMap::new();
        defaults.insert(
            "nginx-logfile".to_string(),
            InputDefaults::with_vars(NormalizedJson::new("{not json")),
        );
        let err = defaults_to_json(&defaults).unwrap_err();
        assert!(format!("{err:#}").contains("nginx-logfile"));
    }
}
