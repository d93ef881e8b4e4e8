// tests/config_validation.rs

mod common;
use crate::common::init_tracing;

use std::fs;
use std::time::Duration;

use spawnwatch::config::{load_and_validate, LaunchFile, RawLaunchFile};
use spawnwatch::errors::SpawnwatchError;
use spawnwatch::launch::EnvSpec;

fn parse(toml_text: &str) -> Result<LaunchFile, SpawnwatchError> {
    let raw: RawLaunchFile = toml::from_str(toml_text).expect("fixture TOML must parse");
    LaunchFile::try_from(raw)
}

#[test]
fn minimal_file_gets_supervisor_defaults() {
    init_tracing();

    let file = parse(
        r#"
        [launch]
        program = "/usr/bin/true"
        "#,
    )
    .unwrap();

    let policy = file.to_policy();
    assert_eq!(policy.window, Duration::from_millis(3000));
    assert_eq!(policy.tick, Duration::from_millis(100));

    let request = file.to_request();
    assert!(request.args.is_empty());
    assert!(matches!(request.env, EnvSpec::Inherit { ref overrides } if overrides.is_empty()));
}

#[test]
fn full_file_round_trips_into_request_and_policy() {
    init_tracing();

    let file = parse(
        r#"
        [launch]
        program = "/opt/relay/bin/relayd"
        args = ["--data-dir", "/var/lib/relay"]
        inherit_env = false

        [launch.env]
        RELAY_LOG = "notice"

        [supervisor]
        startup_window_ms = 1500
        tick_ms = 50
        "#,
    )
    .unwrap();

    let request = file.to_request();
    assert_eq!(request.program.to_str(), Some("/opt/relay/bin/relayd"));
    assert_eq!(request.args, vec!["--data-dir", "/var/lib/relay"]);
    match &request.env {
        EnvSpec::Explicit(vars) => {
            assert_eq!(vars, &[("RELAY_LOG".to_string(), "notice".to_string())])
        }
        other => panic!("expected explicit env, got {other:?}"),
    }

    let policy = file.to_policy();
    assert_eq!(policy.window, Duration::from_millis(1500));
    assert_eq!(policy.tick, Duration::from_millis(50));
}

#[test]
fn empty_program_is_rejected() {
    let err = parse(
        r#"
        [launch]
        program = "  "
        "#,
    )
    .unwrap_err();
    assert!(matches!(err, SpawnwatchError::ConfigError(_)), "got: {err}");
}

#[test]
fn zero_tick_is_rejected() {
    let err = parse(
        r#"
        [launch]
        program = "/usr/bin/true"

        [supervisor]
        tick_ms = 0
        "#,
    )
    .unwrap_err();
    assert!(matches!(err, SpawnwatchError::ConfigError(_)), "got: {err}");
}

#[test]
fn tick_larger_than_window_is_rejected() {
    let err = parse(
        r#"
        [launch]
        program = "/usr/bin/true"

        [supervisor]
        startup_window_ms = 100
        tick_ms = 200
        "#,
    )
    .unwrap_err();
    assert!(matches!(err, SpawnwatchError::ConfigError(_)), "got: {err}");
}

#[test]
fn env_name_with_equals_is_rejected() {
    let err = parse(
        r#"
        [launch]
        program = "/usr/bin/true"

        [launch.env]
        "BAD=NAME" = "value"
        "#,
    )
    .unwrap_err();
    assert!(matches!(err, SpawnwatchError::ConfigError(_)), "got: {err}");
}

#[test]
fn loader_reads_from_disk_and_validates() {
    init_tracing();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("Spawnwatch.toml");
    fs::write(
        &path,
        r#"
        [launch]
        program = "/usr/bin/true"

        [supervisor]
        startup_window_ms = 800
        "#,
    )
    .unwrap();

    let file = load_and_validate(&path).unwrap();
    assert_eq!(file.to_policy().window, Duration::from_millis(800));

    let missing = load_and_validate(dir.path().join("nope.toml"));
    assert!(matches!(missing, Err(SpawnwatchError::IoError(_))));
}
