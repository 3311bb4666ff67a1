//! Integration tests for the rtconfig commands.

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use std::path::Path;
use tempfile::TempDir;

const SCHEMA: &str = r#"{
  "title": "App Settings",
  "type": "object",
  "additionalProperties": false,
  "required": ["db"],
  "properties": {
    "db": {
      "type": "object",
      "required": ["host", "port"],
      "properties": {
        "host": {"type": "string"},
        "port": {"type": "integer"}
      }
    }
  }
}"#;

fn rtconfig_cmd() -> Command {
    let mut cmd = cargo_bin_cmd!("rtconfig");
    cmd.env_remove("RTCONFIG_CONFIG_ROOT").env("NO_COLOR", "1");
    cmd
}

fn root_with(files: &[(&str, &str)]) -> TempDir {
    let temp = TempDir::new().unwrap();
    for (name, contents) in files {
        std::fs::write(temp.path().join(name), contents).unwrap();
    }
    temp
}

fn root_arg(path: &Path) -> &str {
    path.to_str().unwrap()
}

#[test]
fn test_validate_succeeds_on_valid_config() {
    let temp = root_with(&[
        ("schema.json", SCHEMA),
        ("development.yaml", "db:\n  host: localhost\n  port: 5432\n"),
    ]);

    rtconfig_cmd()
        .args(["validate", "development", "-c", root_arg(temp.path())])
        .assert()
        .success()
        .stdout(predicate::str::contains("is valid"));
}

#[test]
fn test_validate_accepts_qualified_path() {
    let temp = root_with(&[
        ("schema.json", SCHEMA),
        ("production.json", r#"{"db": {"host": "${DB_HOST}", "port": 5432}}"#),
    ]);
    let file = temp.path().join("production.json");

    rtconfig_cmd()
        .args([
            "validate",
            file.to_str().unwrap(),
            "--config-root",
            root_arg(temp.path()),
        ])
        .assert()
        .success();
}

#[test]
fn test_validate_reports_violations() {
    let temp = root_with(&[
        ("schema.json", SCHEMA),
        ("staging.yaml", "db:\n  host: localhost\n  port: not-a-number\n"),
    ]);

    rtconfig_cmd()
        .args(["validate", "staging", "-c", root_arg(temp.path())])
        .assert()
        .failure()
        .stderr(predicate::str::contains("/db/port"));
}

#[test]
fn test_validate_requires_schema() {
    let temp = root_with(&[("development.json", r#"{"a": 1}"#)]);

    rtconfig_cmd()
        .args(["validate", "development", "-c", root_arg(temp.path())])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No schema file found"));
}

#[test]
fn test_validate_missing_file() {
    let temp = root_with(&[("schema.json", SCHEMA)]);

    rtconfig_cmd()
        .args(["validate", "production", "-c", root_arg(temp.path())])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No config file found"));
}

#[test]
fn test_validate_reads_root_from_env() {
    let temp = root_with(&[
        ("schema.json", SCHEMA),
        ("development.yml", "db:\n  host: localhost\n  port: 5432\n"),
    ]);

    rtconfig_cmd()
        .env("RTCONFIG_CONFIG_ROOT", temp.path())
        .args(["validate", "development"])
        .assert()
        .success();
}

#[test]
fn test_decrypt_refuses_plain_file() {
    let temp = root_with(&[("development.yaml", "db:\n  host: localhost\n")]);
    let file = temp.path().join("development.yaml");

    rtconfig_cmd()
        .args(["decrypt", file.to_str().unwrap(), "-c", root_arg(temp.path())])
        .assert()
        .failure()
        .stderr(predicate::str::contains("is already decrypted"));

    // Untouched
    let content = std::fs::read_to_string(&file).unwrap();
    assert_eq!(content, "db:\n  host: localhost\n");
}

#[test]
fn test_generate_types_writes_file() {
    let temp = root_with(&[("schema.json", SCHEMA)]);

    rtconfig_cmd()
        .args([
            "generate-types",
            "-c",
            root_arg(temp.path()),
            "--root-type-name",
            "AppConfig",
            "--file-name",
            "app_config.rs",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("app_config.rs"));

    let generated = std::fs::read_to_string(temp.path().join("app_config.rs")).unwrap();
    assert!(generated.contains("pub struct AppConfig {"));
    assert!(generated.contains("pub struct AppSettings {"));
}

#[test]
fn test_generate_types_requires_schema() {
    let temp = TempDir::new().unwrap();

    rtconfig_cmd()
        .args(["generate-types", "-c", root_arg(temp.path())])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No schema file found"));
}

#[test]
fn test_version_and_help() {
    rtconfig_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("rtconfig"));

    rtconfig_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("validate"))
        .stdout(predicate::str::contains("decrypt"))
        .stdout(predicate::str::contains("generate-types"));
}

/// Writes an executable `sops` stand-in into `dir` and returns a `PATH`
/// with `dir` first.
#[cfg(unix)]
fn fake_sops(dir: &Path, script: &str) -> std::ffi::OsString {
    use std::os::unix::fs::PermissionsExt;

    let bin = dir.join("sops");
    std::fs::write(&bin, script).unwrap();
    std::fs::set_permissions(&bin, std::fs::Permissions::from_mode(0o755)).unwrap();

    let mut paths = vec![dir.to_path_buf()];
    if let Some(existing) = std::env::var_os("PATH") {
        paths.extend(std::env::split_paths(&existing));
    }
    std::env::join_paths(paths).unwrap()
}

const ENCRYPTED_YAML: &str = "db:\n  host: \"ENC[AES256_GCM,data:abc]\"\n  port: \"ENC[AES256_GCM,data:def]\"\nsops:\n  version: 3.8.1\n";

#[cfg(unix)]
#[test]
fn test_decrypt_reports_backend_not_encrypted() {
    let temp = root_with(&[("production.yaml", ENCRYPTED_YAML)]);
    let bin = TempDir::new().unwrap();
    let path = fake_sops(
        bin.path(),
        "#!/bin/sh\necho 'sops metadata not found' >&2\nexit 1\n",
    );
    let file = temp.path().join("production.yaml");

    rtconfig_cmd()
        .env("PATH", path)
        .args(["decrypt", file.to_str().unwrap(), "-c", root_arg(temp.path())])
        .assert()
        .failure()
        .stderr(predicate::str::contains("is already decrypted"));
}

#[cfg(unix)]
#[test]
fn test_decrypt_writes_output_and_validates_it() {
    let temp = root_with(&[("schema.json", SCHEMA), ("production.yaml", ENCRYPTED_YAML)]);
    let bin = TempDir::new().unwrap();
    // Invoked as: sops --decrypt --output <out> <in>
    let path = fake_sops(
        bin.path(),
        "#!/bin/sh\nprintf 'db:\\n  host: localhost\\n  port: 5432\\n' > \"$3\"\n",
    );
    let file = temp.path().join("production.yaml");
    let output = temp.path().join("production.decrypted.yaml");

    rtconfig_cmd()
        .env("PATH", path)
        .args([
            "decrypt",
            file.to_str().unwrap(),
            output.to_str().unwrap(),
            "-c",
            root_arg(temp.path()),
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Decrypted"))
        .stdout(predicate::str::contains("production.decrypted.yaml is valid"));

    let written = std::fs::read_to_string(&output).unwrap();
    assert_eq!(written, "db:\n  host: localhost\n  port: 5432\n");
    // Input left encrypted
    assert_eq!(std::fs::read_to_string(&file).unwrap(), ENCRYPTED_YAML);
}
