use std::fs;
use std::path::PathBuf;

use assert_cmd::Command; // Bring Command into scope
use predicates::prelude::*; // Bring predicate traits into scope
use tempfile::TempDir;

fn write_file(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, contents).expect("write test file");
    path
}

fn graft() -> Command {
    let mut cmd = Command::cargo_bin("graft").expect("graft binary");
    cmd.env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_order_puts_dependencies_first() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    let batch = write_file(
        &dir,
        "batch.json",
        r#"{ "plugins": [
            { "name": "core", "priority": 10 },
            { "name": "app", "priority": 100, "dependencies": ["core"] },
            { "name": "extra", "priority": 50 }
        ] }"#,
    );

    graft()
        .arg("order")
        .arg(&batch)
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "1. core (priority 10)\n2. app (priority 100, after core)\n3. extra (priority 50)\n",
        ));

    Ok(())
}

#[test]
fn test_order_reports_cycle() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    let batch = write_file(
        &dir,
        "batch.json",
        r#"{ "plugins": [
            { "name": "a", "dependencies": ["b"] },
            { "name": "b", "dependencies": ["a"] }
        ] }"#,
    );

    graft()
        .arg("order")
        .arg(&batch)
        .assert()
        .code(1)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("error:"))
        .stderr(predicate::str::contains("Circular dependency detected: a -> b -> a"));

    Ok(())
}

#[test]
fn test_order_reports_missing_dependency() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    let batch = write_file(
        &dir,
        "batch.json",
        r#"{ "plugins": [ { "name": "a", "dependencies": ["ghost"] } ] }"#,
    );

    graft()
        .arg("order")
        .arg(&batch)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Plugin 'a' depends on 'ghost', which is not loaded"));

    Ok(())
}

#[test]
fn test_apply_merges_and_overrides() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    let batch = write_file(
        &dir,
        "batch.json",
        r#"{ "plugins": [
            { "name": "p1", "contributions": { "global": { "items": [1, 2], "util": "p1" } } },
            { "name": "p2", "conflict_strategy": "MERGE",
              "contributions": { "global": { "items": [3] } } },
            { "name": "p3", "contributions": { "global": { "util": "p3" }, "custom": { "flag": true } } }
        ] }"#,
    );

    let output = graft().arg("apply").arg(&batch).output()?;
    assert!(output.status.success());

    let context: serde_json::Value = serde_json::from_slice(&output.stdout)?;
    assert_eq!(context["global"]["items"], serde_json::json!([1, 2, 3]));
    assert_eq!(context["global"]["util"], serde_json::json!("p3"));
    assert_eq!(context["custom"]["flag"], serde_json::json!(true));
    assert_eq!(context["parsers"], serde_json::json!({}));

    // The override of global.util is reported, the merge is not.
    let stderr = String::from_utf8(output.stderr)?;
    assert!(stderr.contains("global.util"), "{}", stderr);
    assert!(!stderr.contains("global.items"), "{}", stderr);

    Ok(())
}

#[test]
fn test_apply_prints_owners() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    let batch = write_file(
        &dir,
        "batch.json",
        r#"{ "plugins": [
            { "name": "p1", "contributions": { "global": { "util": 1, "only": 1 } } },
            { "name": "p2", "conflict_strategy": "PRIORITY", "contributions": { "global": { "util": 2 } } }
        ] }"#,
    );

    graft()
        .arg("apply")
        .arg(&batch)
        .arg("--owners")
        .assert()
        .success()
        .stdout(predicate::str::contains("Owners:"))
        .stdout(predicate::str::contains("global.only -> p1"))
        .stdout(predicate::str::contains("global.util -> p2"));

    Ok(())
}

#[test]
fn test_config_default_strategy_applies_to_batch() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    let config = write_file(&dir, "graft.toml", "default_conflict_strategy = \"ERROR\"\n");
    let batch = write_file(
        &dir,
        "batch.yaml",
        "plugins:\n  - name: p1\n    contributions:\n      global:\n        x: 1\n  - name: p2\n    contributions:\n      global:\n        x: 2\n",
    );

    graft()
        .arg("--config")
        .arg(&config)
        .arg("apply")
        .arg(&batch)
        .assert()
        .code(1)
        .stderr(predicate::str::contains(
            "Conflict on 'global.x': plugin 'p2' attempted to overwrite a property owned by plugin 'p1'",
        ));

    Ok(())
}

#[test]
fn test_run_survives_after_run_failures() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    let batch = write_file(
        &dir,
        "batch.json",
        r#"{ "plugins": [
            { "name": "p1", "priority": 1,
              "hooks": { "before_run": ["prepare"], "after_run": ["fail: upload refused"] } },
            { "name": "p2", "hooks": { "after_run": ["done"] } }
        ] }"#,
    );

    graft()
        .arg("run")
        .arg(&batch)
        .assert()
        .success()
        .stdout(predicate::str::contains("[p1] before-run: prepare"))
        .stdout(predicate::str::contains("[p2] after-run: done"))
        .stdout(predicate::str::contains("Run completed (2 after-run hooks, 1 failed)"))
        .stderr(predicate::str::contains("upload refused"));

    Ok(())
}

#[test]
fn test_run_before_run_failure_triggers_on_error() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    let batch = write_file(
        &dir,
        "batch.json",
        r#"{ "plugins": [
            { "name": "guard", "priority": 1,
              "hooks": { "before_run": ["fail: not ready"], "on_error": ["cleanup"] } },
            { "name": "late", "hooks": { "before_run": ["never"], "after_run": ["never"] } }
        ] }"#,
    );

    graft()
        .arg("run")
        .arg(&batch)
        .assert()
        .code(1)
        .stdout(predicate::str::contains("[guard] on-error: cleanup (Lifecycle hook failed"))
        .stdout(predicate::str::contains("never").not())
        .stderr(predicate::str::contains(
            "error: Lifecycle hook failed: before-run hook #0 of plugin 'guard' failed: not ready",
        ));

    Ok(())
}

#[test]
fn test_run_script_failure_skips_after_run() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    let batch = write_file(
        &dir,
        "batch.json",
        r#"{ "plugins": [
            { "name": "p1", "hooks": { "after_run": ["skipped"], "on_error": ["report"] } }
        ] }"#,
    );

    graft()
        .arg("run")
        .arg(&batch)
        .arg("--fail-script")
        .assert()
        .failure()
        .stdout(predicate::str::contains("[p1] on-error: report (script"))
        .stdout(predicate::str::contains("skipped").not())
        .stderr(predicate::str::contains("exited with a failure"));

    Ok(())
}

#[test]
fn test_unreadable_batch_is_reported() {
    graft()
        .arg("order")
        .arg("does-not-exist.json")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Configuration error in 'does-not-exist.json'"));
}
