//! CLI integration tests
//!
//! Runs the `llmgate` binary against a throwaway configuration and checks
//! output formats and exit codes.

use std::fs;
use std::net::TcpListener;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

fn llmgate_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_llmgate"))
}

/// Writes a config whose engine address has nothing listening on it
fn write_config(dir: &Path) -> PathBuf {
    let port = TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port();
    let path = dir.join("config.yaml");
    let yaml = format!(
        "host: \"127.0.0.1:{}\"\nmodels_dir: \"{}\"\nengine_bin: \"{}\"\n",
        port,
        dir.join("models").display(),
        dir.join("llama-server").display()
    );
    fs::write(&path, yaml).unwrap();
    path
}

fn run(config: &Path, args: &[&str]) -> Output {
    Command::new(llmgate_bin())
        .arg("--config")
        .arg(config)
        .args(args)
        .env_remove("LLMGATE_HOST")
        .env_remove("LLMGATE_MODELS_DIR")
        .env_remove("LLMGATE_ENGINE_BIN")
        .env_remove("LLMGATE_PROTOCOL")
        .output()
        .expect("Failed to run llmgate")
}

#[test]
fn test_help() {
    let output = Command::new(llmgate_bin()).arg("--help").output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("pull"));
    assert!(stdout.contains("switch"));
    assert!(stdout.contains("chat"));
}

#[test]
fn test_catalog_json() {
    let temp = TempDir::new().unwrap();
    let config = write_config(temp.path());

    let output = run(&config, &["catalog", "--tier", "cpu", "--format", "json"]);

    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let entries = value.as_array().unwrap();
    assert!(!entries.is_empty());
    assert!(entries.iter().all(|e| e["tier"] == "cpu"));
    assert!(entries.iter().all(|e| e["installed"] == false));
}

#[test]
fn test_models_empty() {
    let temp = TempDir::new().unwrap();
    let config = write_config(temp.path());

    let output = run(&config, &["models"]);

    assert!(output.status.success());
    assert_eq!(
        String::from_utf8_lossy(&output.stdout).trim(),
        "No models installed"
    );
}

#[test]
fn test_delete_missing_model_fails() {
    let temp = TempDir::new().unwrap();
    let config = write_config(temp.path());

    let output = run(&config, &["delete", "no-such-model"]);

    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Error [not_found]"));
}

#[test]
fn test_status_reports_engine_down() {
    let temp = TempDir::new().unwrap();
    let config = write_config(temp.path());

    let output = run(&config, &["status", "--format", "json"]);

    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["status"]["running"], false);
    assert_eq!(value["status"]["engine_state"]["state"], "stopped");
    assert_eq!(value["status"]["installed_count"], 0);
}

#[test]
fn test_invalid_config_fails() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("config.yaml");
    fs::write(&path, "engine:\n  threads: 0\n").unwrap();

    let output = run(&path, &["models"]);

    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Invalid configuration"));
}
