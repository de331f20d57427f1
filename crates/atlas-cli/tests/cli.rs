//! End-to-end tests for the `atlas` binary.

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::{tempdir, TempDir};

/// Test context with an isolated working directory and settings file.
struct TestContext {
    temp_dir: TempDir,
    settings_path: PathBuf,
}

impl TestContext {
    fn new() -> Self {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        let settings_path = temp_dir.path().join("state").join("settings.json");
        Self {
            temp_dir,
            settings_path,
        }
    }

    fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    fn command(&self) -> Command {
        let mut cmd = Command::cargo_bin("atlas").expect("Binary not found");
        cmd.current_dir(self.path())
            .env("ATLAS_SETTINGS_PATH", &self.settings_path)
            .env_remove("ATLAS_CONFIG_PATH")
            .env_remove("ATLAS_API_URL")
            .env_remove("ATLAS_API_TOKEN")
            .env_remove("ATLAS_LOG_LEVEL")
            .env_remove("RUST_LOG");
        cmd
    }
}

#[test]
fn test_base_path_collapses_detail_routes() {
    let ctx = TestContext::new();
    ctx.command()
        .args(["base-path", "/sales/invoices/42", "/sales/invoices/new"])
        .assert()
        .success()
        .stdout(predicate::str::contains("/sales/invoices/42 -> /sales/invoices"))
        .stdout(predicate::str::contains("/sales/invoices/new -> /sales/invoices"));
}

#[test]
fn test_modules_json_lists_registry() {
    let ctx = TestContext::new();
    let output = ctx.command().args(["modules", "--format", "json"]).output().unwrap();
    assert!(output.status.success());

    let modules: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let keys: Vec<&str> = modules
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|m| m["key"].as_str())
        .collect();
    assert!(keys.contains(&"sales"));
    assert!(keys.contains(&"home"));
}

#[test]
fn test_unknown_module_suggests_close_match() {
    let ctx = TestContext::new();
    ctx.command()
        .args(["modules", "sale"])
        .assert()
        .code(6)
        .stderr(predicate::str::contains("unknown module 'sale'"))
        .stderr(predicate::str::contains("did you mean: sales"));
}

#[test]
fn test_global_set_persists_across_runs() {
    let ctx = TestContext::new();
    ctx.command().args(["global", "set", "edit", "on"]).assert().success();
    ctx.command().args(["global", "set", "delete", "off"]).assert().success();

    ctx.command()
        .args(["global", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("view: off"))
        .stdout(predicate::str::contains("edit: on"))
        .stdout(predicate::str::contains("delete: off"));

    let raw = std::fs::read_to_string(&ctx.settings_path).unwrap();
    assert!(raw.contains("\"atlas.rbac.global.edit\": \"1\""));
    assert!(raw.contains("\"atlas.rbac.global.delete\": \"0\""));
}

#[test]
fn test_global_rejects_unknown_action() {
    let ctx = TestContext::new();
    ctx.command()
        .args(["global", "set", "approve", "on"])
        .assert()
        .code(5)
        .stderr(predicate::str::contains("not a global override action"));
    assert!(!ctx.settings_path.exists());
}

#[test]
fn test_check_against_backend() {
    let mut server = mockito::Server::new();
    let _permissions = server
        .mock("GET", "/admin/user-permissions")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{
                "modules": ["sales"],
                "permissions": [
                    {"module_key": "sales", "feature_key": "customers", "can_view": true}
                ],
                "role_features": ["sales:customers"]
            }"#,
        )
        .create();
    let _overrides = server
        .mock("GET", "/admin/users/alice/feature-permissions")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"items": []}"#)
        .create();

    let ctx = TestContext::new();
    let output = ctx
        .command()
        .env("ATLAS_API_URL", server.url())
        .args([
            "check",
            "--user",
            "alice",
            "--feature",
            "sales:customers",
            "--feature",
            "sales:invoices",
            "--path",
            "/sales/customers/9",
            "--format",
            "json",
        ])
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["user"], "alice");
    assert_eq!(report["is_super"], false);
    assert_eq!(report["modules"], serde_json::json!(["sales"]));

    let granted: Vec<bool> = report["checks"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["granted"].as_bool().unwrap())
        .collect();
    assert_eq!(granted, vec![true, false, true]);
}

#[test]
fn test_check_fails_closed_when_backend_errors() {
    let mut server = mockito::Server::new();
    let _permissions = server
        .mock("GET", "/admin/user-permissions")
        .with_status(503)
        .create();

    let ctx = TestContext::new();
    ctx.command()
        .env("ATLAS_API_URL", server.url())
        .args(["check", "--user", "alice", "--feature", "sales:customers"])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("failed to load permissions for alice"));
}

#[test]
fn test_check_rejects_unknown_action() {
    let ctx = TestContext::new();
    ctx.command()
        .args(["check", "--user", "alice", "--action", "approve"])
        .assert()
        .code(5)
        .stderr(predicate::str::contains("unknown action 'approve'"));
}
