//! End-to-End CLI Tests for cmdhub
//!
//! Runs the host binary with the `vm` and `storage` modules linked in.

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::Value;
use tempfile::TempDir;

/// Get a command pointing to the cmdhub binary, isolated from any user config
fn cmdhub(config_dir: &TempDir) -> Command {
    let mut cmd = cargo_bin_cmd!("cmdhub");
    cmd.env("CMDHUB_CONFIG", config_dir.path().join("config.toml"));
    cmd
}

fn stdout_json(output: &std::process::Output) -> Value {
    serde_json::from_slice(&output.stdout).expect("stdout is JSON")
}

// ============================================
// Basic CLI Tests
// ============================================

mod cli_basics {
    use super::*;

    #[test]
    fn shows_help() {
        let temp = TempDir::new().unwrap();
        cmdhub(&temp)
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("cmdhub"))
            .stdout(predicate::str::contains("resolve"));
    }

    #[test]
    fn shows_version() {
        let temp = TempDir::new().unwrap();
        cmdhub(&temp)
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
    }

    #[test]
    fn lists_linked_modules() {
        let temp = TempDir::new().unwrap();
        cmdhub(&temp)
            .arg("modules")
            .assert()
            .success()
            .stdout(predicate::str::contains("vm"))
            .stdout(predicate::str::contains("cmdhub-storage"));
    }
}

// ============================================
// Command Table Tests
// ============================================

mod command_table {
    use super::*;

    #[test]
    fn json_table_is_sorted_by_name() {
        let temp = TempDir::new().unwrap();
        let output = cmdhub(&temp)
            .args(["commands", "--json"])
            .output()
            .unwrap();
        assert!(output.status.success());

        let table = stdout_json(&output);
        let names: Vec<&str> = table
            .as_object()
            .expect("object")
            .keys()
            .map(String::as_str)
            .collect();
        assert_eq!(
            names,
            vec![
                "storage account create",
                "storage account list",
                "storage container list",
                "vm create",
                "vm delete",
                "vm list",
                "vm show",
            ]
        );
        assert_eq!(table["vm create"]["handler"], "cmdhub_vm::create_vm");
        assert_eq!(table["storage account create"]["confirmation"], false);
    }

    #[test]
    fn module_hint_limits_the_table() {
        let temp = TempDir::new().unwrap();
        cmdhub(&temp)
            .args(["commands", "--module", "vm"])
            .assert()
            .success()
            .stdout(predicate::str::contains("vm create"))
            .stdout(predicate::str::contains("storage").not());
    }

    #[test]
    fn unknown_module_hint_falls_back_to_everything() {
        let temp = TempDir::new().unwrap();
        cmdhub(&temp)
            .args(["commands", "--module", "network"])
            .assert()
            .success()
            .stdout(predicate::str::contains("vm create"))
            .stdout(predicate::str::contains("storage account list"));
    }

    #[test]
    fn describe_renders_command_help() {
        let temp = TempDir::new().unwrap();
        cmdhub(&temp)
            .args(["describe", "vm", "create"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Create a virtual machine"))
            .stdout(predicate::str::contains("--resourcegroup"))
            .stdout(predicate::str::contains("vm/create.md"));
    }

    #[test]
    fn describe_unknown_command_fails() {
        let temp = TempDir::new().unwrap();
        cmdhub(&temp)
            .args(["describe", "vm", "resize"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("is not a command"));
    }
}

// ============================================
// Resolve Tests
// ============================================

mod resolve {
    use super::*;

    #[test]
    fn resolves_invocation_to_handler() {
        let temp = TempDir::new().unwrap();
        let output = cmdhub(&temp)
            .args(["resolve", "--", "vm", "show", "-g", "rg", "-n", "web01"])
            .output()
            .unwrap();
        assert!(output.status.success());

        let resolved = stdout_json(&output);
        assert_eq!(resolved["command"], "vm show");
        assert_eq!(resolved["handler"], "cmdhub_vm::show_vm");
        assert_eq!(resolved["arguments"]["resourcegroup"], "rg");
        assert_eq!(resolved["arguments"]["name"], "web01");
    }

    #[test]
    fn applies_defaults_and_flags() {
        let temp = TempDir::new().unwrap();
        let output = cmdhub(&temp)
            .args([
                "resolve", "--", "vm", "create", "-g", "rg", "-n", "web01", "-l", "westeurope",
                "--no-wait",
            ])
            .output()
            .unwrap();
        assert!(output.status.success());

        let resolved = stdout_json(&output);
        assert_eq!(resolved["arguments"]["size"], "Standard_B1s");
        assert_eq!(resolved["arguments"]["no_wait"], true);
    }

    #[test]
    fn missing_required_argument_fails() {
        let temp = TempDir::new().unwrap();
        cmdhub(&temp)
            .args(["resolve", "--", "vm", "show", "-g", "rg"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("--name"));
    }

    #[test]
    fn rejects_value_outside_choices() {
        let temp = TempDir::new().unwrap();
        cmdhub(&temp)
            .args([
                "resolve", "--", "storage", "account", "create", "-g", "rg", "-n", "logs0001",
                "-l", "westeurope", "--sku", "Ultra",
            ])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Ultra"));
    }
}

// ============================================
// Config Tests
// ============================================

mod config {
    use super::*;

    #[test]
    fn invalid_config_falls_back_to_defaults() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("config.toml"), "collision_policy = 42\n").unwrap();
        cmdhub(&temp)
            .args(["commands", "--module", "vm"])
            .assert()
            .success()
            .stdout(predicate::str::contains("vm list"));
    }

    #[test]
    fn explicit_config_flag_is_accepted() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("hub.toml");
        std::fs::write(&path, "collision_policy = \"fail\"\n").unwrap();
        cmdhub(&temp)
            .arg("--config")
            .arg(&path)
            .arg("modules")
            .assert()
            .success();
    }
}
