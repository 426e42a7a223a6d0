use assert_cmd::Command;
use hoist_test_helpers::fixtures::{
    COMPANION_COUNTER, INTERFACE_COMPANION, NOTHING_TO_LOWER, STANDALONE_SINGLETON,
};
use indoc::indoc;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn hoist_cmd() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("hoist"))
}

/// Test lowering a single document prints the lowered IR
#[test]
fn test_lower_single_file() {
    let temp_dir = TempDir::new().unwrap();
    let input = temp_dir.path().join("Counter.yaml");
    fs::write(&input, COMPANION_COUNTER).unwrap();

    hoist_cmd()
        .arg("lower")
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::contains("program Counter.kt"))
        .stdout(predicate::str::contains(
            "field count#f3: Int [static] = 0",
        ))
        .stdout(predicate::str::contains("static init { Counter::Companion#f0.register() }"));
}

/// Test directories are scanned for documents and the config file is skipped
#[test]
fn test_lower_directory() {
    let temp_dir = TempDir::new().unwrap();
    let nested = temp_dir.path().join("nested");
    fs::create_dir_all(&nested).unwrap();
    fs::write(temp_dir.path().join("a_counter.yaml"), COMPANION_COUNTER).unwrap();
    fs::write(nested.join("registry.yml"), STANDALONE_SINGLETON).unwrap();
    fs::write(temp_dir.path().join("notes.txt"), "not a document").unwrap();
    fs::write(temp_dir.path().join("hoist.yaml"), "verify: true\n").unwrap();

    hoist_cmd()
        .arg("lower")
        .arg(temp_dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("program Counter.kt"))
        .stdout(predicate::str::contains("program Registry.kt"));
}

/// Test JSON output lists the relocations
#[test]
fn test_lower_json_report() {
    let temp_dir = TempDir::new().unwrap();
    let input = temp_dir.path().join("Api.yaml");
    fs::write(&input, INTERFACE_COMPANION).unwrap();

    let output = hoist_cmd()
        .args(["lower", "--format", "json", "--sequential"])
        .arg(&input)
        .output()
        .unwrap();
    assert!(output.status.success());

    let reports: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let relocations = reports[0]["relocations"].as_array().unwrap();
    assert_eq!(relocations.len(), 2);
    assert_eq!(relocations[0]["kind"], "hoisted");
    assert_eq!(relocations[0]["to"], "Api.VERSION");
    assert_eq!(reports[0]["relocated_initializers"], 0);
}

/// Test the config file changes which annotation exposes interface fields
#[test]
fn test_lower_with_config() {
    let temp_dir = TempDir::new().unwrap();
    let input = temp_dir.path().join("Api.yaml");
    fs::write(&input, INTERFACE_COMPANION.replace("JvmField", "Expose")).unwrap();
    let config = temp_dir.path().join("custom.yaml");
    fs::write(&config, "direct_field_annotation: Expose\n").unwrap();

    hoist_cmd()
        .arg("lower")
        .arg("--config")
        .arg(&config)
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::contains("field DEFAULT#f5: Api [static, final] @Expose"));
}

/// Test invalid config is reported
#[test]
fn test_lower_with_invalid_config() {
    let temp_dir = TempDir::new().unwrap();
    let input = temp_dir.path().join("Plain.yaml");
    fs::write(&input, NOTHING_TO_LOWER).unwrap();
    fs::write(temp_dir.path().join("hoist.yaml"), "unknown_key: 1\n").unwrap();

    hoist_cmd()
        .arg("lower")
        .arg(&input)
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid config"));
}

/// Test a broken document fails with the file name in the message
#[test]
fn test_lower_broken_document() {
    let temp_dir = TempDir::new().unwrap();
    let input = temp_dir.path().join("Broken.yaml");
    fs::write(
        &input,
        indoc! {r#"
            name: Broken.kt
            functions:
              - name: main
                body:
                  - stmt: return
                    value: { expr: get, name: missing }
        "#},
    )
    .unwrap();

    hoist_cmd()
        .arg("lower")
        .arg(&input)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Broken.yaml"))
        .stderr(predicate::str::contains("unknown variable `missing`"));
}

/// Test missing inputs are reported
#[test]
fn test_lower_missing_input() {
    hoist_cmd()
        .args(["lower", "does/not/exist.yaml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("input not found"));
}

/// Test a session lowers units in dependency order
#[test]
fn test_session_build_order() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join("Counter.yaml"), COMPANION_COUNTER).unwrap();
    fs::write(temp_dir.path().join("Registry.yaml"), STANDALONE_SINGLETON).unwrap();
    fs::write(temp_dir.path().join("Plain.yaml"), NOTHING_TO_LOWER).unwrap();
    let manifest = temp_dir.path().join("session.yaml");
    fs::write(
        &manifest,
        indoc! {r#"
            units:
              - name: app
                version: "1.0"
                sources: [Counter.yaml]
                dependencies:
                  - name: registry
                  - name: stdlib
                    version: "1.9"
              - name: registry
                version: "1.0"
                sources: [Registry.yaml]
              - name: tools
                version: "0.1"
                sources: [Plain.yaml]
        "#},
    )
    .unwrap();

    let output = hoist_cmd()
        .arg("session")
        .arg(&manifest)
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let registry = stdout.find("unit registry@1.0").unwrap();
    let app = stdout.find("unit app@1.0").unwrap();
    assert!(registry < app, "dependencies come first:\n{stdout}");
    assert!(stdout.contains("depends on registry, stdlib@1.9"));

    hoist_cmd()
        .arg("session")
        .arg(&manifest)
        .args(["--unit", "app"])
        .assert()
        .success()
        .stdout(predicate::str::contains("unit app@1.0"))
        .stdout(predicate::str::contains("unit tools@0.1").not());
}

/// Test dependency cycles are reported
#[test]
fn test_session_cycle() {
    let temp_dir = TempDir::new().unwrap();
    let manifest = temp_dir.path().join("session.yaml");
    fs::write(
        &manifest,
        indoc! {r#"
            units:
              - { name: a, version: "1", dependencies: [{ name: b }] }
              - { name: b, version: "1", dependencies: [{ name: a }] }
        "#},
    )
    .unwrap();

    hoist_cmd()
        .arg("session")
        .arg(&manifest)
        .assert()
        .failure()
        .stderr(predicate::str::contains("dependency cycle: a -> b -> a"));
}
