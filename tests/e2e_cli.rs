//! CLI end-to-end tests
//!
//! Tests for the collectforge command-line interface.

use assert_cmd::prelude::*;
use predicates::prelude::*;
use serde_json::json;
use std::fs;
use std::path::Path;
use std::process::Command;
use tempfile::{tempdir, TempDir};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const VINYL_MODULE: &str = r#"
key = "vinyl"
version = "0.3.0"
name = "Vinyl"

[[fields]]
key = "title"
type = "TEXT"
"#;

/// Get a command for the collectforge binary
#[allow(deprecated)]
fn collectforge_cmd() -> Command {
    Command::cargo_bin("collectforge").unwrap()
}

/// A command bound to a fresh import directory and an empty config file.
fn isolated_cmd(temp: &TempDir) -> Command {
    let config = temp.path().join("config.toml");
    if !config.exists() {
        fs::write(&config, "").unwrap();
    }
    let mut cmd = collectforge_cmd();
    cmd.arg("--config")
        .arg(&config)
        .arg("--import-dir")
        .arg(temp.path().join("modules"));
    cmd
}

fn write_definition(dir: &Path, name: &str, contents: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).unwrap();
    path
}

#[test]
fn test_cli_no_args_shows_help() {
    let mut cmd = collectforge_cmd();
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn test_cli_help_flag() {
    let mut cmd = collectforge_cmd();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("collectforge"))
        .stdout(predicate::str::contains("Usage"));
}

#[test]
fn test_cli_version_command() {
    let temp = tempdir().unwrap();
    isolated_cmd(&temp)
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_cli_modules_list_shows_builtins() {
    let temp = tempdir().unwrap();
    isolated_cmd(&temp)
        .args(["modules", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("books"))
        .stdout(predicate::str::contains("coins"))
        .stdout(predicate::str::contains("builtin"));
}

#[test]
fn test_cli_modules_show_json() {
    let temp = tempdir().unwrap();
    let output = isolated_cmd(&temp)
        .args(["modules", "show", "books", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let module: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(module["module_key"], json!("books"));
    assert_eq!(module["source"], json!("BUILTIN"));
    assert_eq!(module["contract"]["providers"][0]["key"], json!("openlibrary"));
}

#[test]
fn test_cli_modules_show_unknown() {
    let temp = tempdir().unwrap();
    isolated_cmd(&temp)
        .args(["modules", "show", "stamps"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("module not found: stamps"));
}

#[test]
fn test_cli_modules_raw_prints_source() {
    let temp = tempdir().unwrap();
    isolated_cmd(&temp)
        .args(["modules", "raw", "coins"])
        .assert()
        .success()
        .stdout(predicate::str::contains("key = \"coins\""));
}

#[test]
fn test_cli_import_then_remove() {
    let temp = tempdir().unwrap();
    let file = write_definition(temp.path(), "vinyl.toml", VINYL_MODULE);

    isolated_cmd(&temp)
        .args(["modules", "import"])
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains("Imported vinyl v0.3.0"));
    assert!(temp.path().join("modules").join("vinyl.toml").exists());

    isolated_cmd(&temp)
        .args(["modules", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("vinyl"))
        .stdout(predicate::str::contains("imported"));

    isolated_cmd(&temp)
        .args(["modules", "remove", "vinyl"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Removed vinyl.toml"));
    assert!(!temp.path().join("modules").join("vinyl.toml").exists());
}

#[test]
fn test_cli_import_persists_across_runs() {
    let temp = tempdir().unwrap();
    let modules = temp.path().join("modules");
    fs::create_dir_all(&modules).unwrap();
    write_definition(&modules, "z-vinyl.toml", VINYL_MODULE);
    let newer = write_definition(
        temp.path(),
        "a-vinyl.toml",
        &VINYL_MODULE.replace("0.3.0", "0.4.0"),
    );

    isolated_cmd(&temp)
        .args(["modules", "import"])
        .arg(&newer)
        .assert()
        .success()
        .stdout(predicate::str::contains("Imported vinyl v0.4.0"));

    let output = isolated_cmd(&temp)
        .args(["modules", "show", "vinyl", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let module: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(module["version"], json!("0.4.0"));

    isolated_cmd(&temp)
        .args(["modules", "remove", "vinyl"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Removed a-vinyl.toml"));
    isolated_cmd(&temp)
        .args(["modules", "show", "vinyl"])
        .assert()
        .failure();
}

#[test]
fn test_cli_remove_builtin_fails() {
    let temp = tempdir().unwrap();
    isolated_cmd(&temp)
        .args(["modules", "remove", "books"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot be removed"));
}

#[test]
fn test_cli_import_invalid_lists_issues() {
    let temp = tempdir().unwrap();
    let file = write_definition(
        temp.path(),
        "bad.toml",
        "key = \"bad\"\nversion = \"x\"\nname = \"\"\n",
    );

    isolated_cmd(&temp)
        .args(["modules", "import"])
        .arg(&file)
        .assert()
        .failure()
        .stderr(predicate::str::contains("version:"))
        .stderr(predicate::str::contains("name: must not be empty"));
    assert!(!temp.path().join("modules").join("bad.toml").exists());
}

#[test]
fn test_cli_scan_reports_outcomes() {
    let temp = tempdir().unwrap();
    let modules = temp.path().join("modules");
    fs::create_dir_all(&modules).unwrap();
    write_definition(&modules, "vinyl.toml", VINYL_MODULE);
    write_definition(&modules, "broken.toml", "key = ");

    isolated_cmd(&temp)
        .args(["modules", "scan"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Skipped: 1"))
        .stdout(predicate::str::contains("Failed: 1"))
        .stdout(predicate::str::contains("broken.toml"));
}

#[test]
fn test_cli_validate_good_definition() {
    let temp = tempdir().unwrap();
    let file = write_definition(temp.path(), "vinyl.toml", VINYL_MODULE);

    isolated_cmd(&temp)
        .arg("validate")
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains("Module definition is valid"))
        .stdout(predicate::str::contains("Checksum:"));
}

#[test]
fn test_cli_validate_nonexistent_file() {
    let temp = tempdir().unwrap();
    isolated_cmd(&temp)
        .args(["validate", "/nonexistent/path/module.toml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read definition file"));
}

#[test]
fn test_cli_providers_lists_builtin_providers() {
    let temp = tempdir().unwrap();
    isolated_cmd(&temp)
        .arg("providers")
        .assert()
        .success()
        .stdout(predicate::str::contains("openlibrary"))
        .stdout(predicate::str::contains("googlebooks"))
        .stdout(predicate::str::contains("missing API key"));
}

#[test]
fn test_cli_lookup_rejects_malformed_identifier() {
    let temp = tempdir().unwrap();
    isolated_cmd(&temp)
        .args(["lookup", "books", "9780441013593"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid argument"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_cli_lookup_against_mock_provider() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/books"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ISBN:9780441013593": {
                "title": "Dune",
                "authors": [{ "name": "Frank Herbert" }],
                "number_of_pages": 535,
                "cover": { "large": "https://covers.example/dune-L.jpg" }
            }
        })))
        .mount(&server)
        .await;

    let temp = tempdir().unwrap();
    fs::write(
        temp.path().join("config.toml"),
        format!(
            r#"
[lookup]
provider_timeout_ms = 5000
overall_timeout_ms = 10000

[[providers]]
key = "openlibrary"
base_url = "{}"

[[providers]]
key = "googlebooks"
enabled = false
"#,
            server.uri()
        ),
    )
    .unwrap();

    let output = isolated_cmd(&temp)
        .args(["lookup", "books", "ISBN:978-0-441-01359-3", "--json"])
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let response: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(response["module_key"], json!("books"));
    assert_eq!(response["best"]["provider_key"], json!("openlibrary"));
    assert_eq!(response["merged_attributes"]["title"], json!("Dune"));
    assert_eq!(response["merged_attributes"]["authors"], json!("Frank Herbert"));
    assert_eq!(response["merged_attributes"]["pages"], json!(535));
    assert_eq!(
        response["assets"][0]["url"],
        json!("https://covers.example/dune-L.jpg")
    );
}
