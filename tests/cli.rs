//! End-to-end checks of the `stagecrew` binary that never reach a model backend.

#![allow(deprecated)]

use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;
use tempfile::TempDir;

const SCRUBBED_ENV: [&str; 12] = [
    "OPENAI_API_KEY",
    "GROQ_API_KEY",
    "DEEPSEEK_API_KEY",
    "OLLAMA_HOST",
    "STAGECREW_API_KEY",
    "STAGECREW_PROVIDER",
    "STAGECREW_MODEL",
    "STAGECREW_API_BASE",
    "STAGECREW_PROFILE",
    "STAGECREW_CONFIG",
    "STAGECREW_TELEMETRY_ENABLED",
    "RUST_LOG",
];

/// Binary running in `dir` with no provider credentials in its environment.
fn stagecrew(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("stagecrew").unwrap();
    cmd.current_dir(dir);
    for key in SCRUBBED_ENV {
        cmd.env_remove(key);
    }
    cmd
}

#[test]
fn unknown_scenario_fails_before_touching_the_backend() {
    let tmp = TempDir::new().unwrap();

    stagecrew(tmp.path())
        .args(["run", "bogus"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("[INPUT] unknown scenario 'bogus'"))
        .stderr(predicate::str::contains(
            "conference, marketing, research_paper, software",
        ));

    assert!(std::fs::read_dir(tmp.path()).unwrap().next().is_none());
}

#[test]
fn missing_scenario_on_empty_stdin_is_an_input_error() {
    let tmp = TempDir::new().unwrap();

    stagecrew(tmp.path())
        .arg("run")
        .write_stdin("")
        .assert()
        .failure()
        .stdout(predicate::str::contains("Enter scenario:"))
        .stderr(predicate::str::contains("no scenario provided"));
}

#[test]
fn valid_scenario_without_credentials_is_a_config_error() {
    let tmp = TempDir::new().unwrap();

    stagecrew(tmp.path())
        .args(["run", "conference"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("[CONFIG]"))
        .stderr(predicate::str::contains("no provider could be auto-detected"));
}

#[test]
fn scenarios_command_lists_builtins() {
    let tmp = TempDir::new().unwrap();

    stagecrew(tmp.path())
        .arg("scenarios")
        .assert()
        .success()
        .stdout(predicate::str::contains("- conference:"))
        .stdout(predicate::str::contains("- software:"));
}

#[test]
fn doctor_reports_missing_credentials() {
    let tmp = TempDir::new().unwrap();

    stagecrew(tmp.path())
        .arg("doctor")
        .assert()
        .success()
        .stdout(predicate::str::contains("- OPENAI_API_KEY: missing"))
        .stdout(predicate::str::contains("Auto provider resolution: none"));
}

#[test]
fn profiles_show_reads_config_file() {
    let tmp = TempDir::new().unwrap();
    std::fs::create_dir_all(tmp.path().join(".stagecrew")).unwrap();
    std::fs::write(
        tmp.path().join(".stagecrew/config.toml"),
        "[profiles.fast]\nprovider = \"groq\"\nmax_tokens = 400\n",
    )
    .unwrap();

    stagecrew(tmp.path())
        .args(["--profile", "fast", "profiles", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Provider: groq"))
        .stdout(predicate::str::contains("Max tokens: 400"));
}

#[test]
fn invalid_temperature_is_rejected() {
    let tmp = TempDir::new().unwrap();

    stagecrew(tmp.path())
        .args(["--temperature", "4.0", "scenarios"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("[CONFIG] invalid generation settings"));
}

#[test]
fn telemetry_report_handles_missing_file() {
    let tmp = TempDir::new().unwrap();

    stagecrew(tmp.path())
        .args(["telemetry", "report"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No telemetry file found"));
}
