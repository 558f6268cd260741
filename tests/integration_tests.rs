//! Integration tests for the mjop CLI
//!
//! Each test runs the binary against a fresh project directory and checks
//! both its output and the record it leaves on disk.

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn mjop(dir: &TempDir) -> Command {
    let mut cmd = cargo_bin_cmd!("mjop");
    cmd.current_dir(dir.path())
        .env_remove("MJOP_RECORD_ID")
        .env_remove("MJOP_SYNC_URL")
        .env_remove("MJOP_DATA_DIR")
        .env_remove("MJOP_LOG")
        .env_remove("RUST_LOG");
    cmd
}

fn init_project() -> TempDir {
    let dir = TempDir::new().unwrap();
    mjop(&dir).arg("init").assert().success();
    dir
}

fn record(dir: &Path) -> Value {
    let raw = fs::read_to_string(dir.join(".mjop/data/default.json")).unwrap();
    serde_json::from_str(&raw).unwrap()
}

/// Run a command that prints one created id per line and return them.
fn created_ids(dir: &TempDir, args: &[&str]) -> Vec<String> {
    let output = mjop(dir).args(args).output().unwrap();
    assert!(
        output.status.success(),
        "{:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.contains(' '))
        .map(str::to_string)
        .collect()
}

fn add_element(dir: &TempDir, name: &str, extra: &[&str]) -> String {
    let mut args = vec!["element", "add", name];
    args.extend_from_slice(extra);
    let ids = created_ids(dir, &args);
    assert_eq!(ids.len(), 1);
    ids[0].clone()
}

// =============================================================================
// Basic CLI Tests
// =============================================================================

mod cli_basics {
    use super::*;

    #[test]
    fn test_mjop_help() {
        cargo_bin_cmd!("mjop").arg("--help").assert().success();
    }

    #[test]
    fn test_init_creates_structure() {
        let dir = TempDir::new().unwrap();
        mjop(&dir)
            .arg("init")
            .assert()
            .success()
            .stdout(predicate::str::contains("Initialized mjop project"));

        assert!(dir.path().join(".mjop/mjop.toml").exists());
        let snapshot = record(dir.path());
        assert_eq!(snapshot["globalElements"], Value::Array(vec![]));
        assert_eq!(snapshot["taskGroups"], Value::Array(vec![]));
    }

    #[test]
    fn test_init_idempotent() {
        let dir = init_project();
        mjop(&dir)
            .arg("init")
            .assert()
            .success()
            .stdout(predicate::str::contains("already initialized"));
    }

    #[test]
    fn test_config_validate_defaults() {
        let dir = init_project();
        mjop(&dir)
            .args(["config", "validate"])
            .assert()
            .success()
            .stdout(predicate::str::contains("valid"));
    }

    #[test]
    fn test_config_validate_reports_problems() {
        let dir = init_project();
        fs::write(
            dir.path().join(".mjop/mjop.toml"),
            "[schedule]\ndefault_total_years = 0\n",
        )
        .unwrap();
        mjop(&dir)
            .args(["config", "validate"])
            .assert()
            .failure()
            .stdout(predicate::str::contains("default_total_years"));
    }

    #[test]
    fn test_record_flag_selects_record() {
        let dir = init_project();
        add_element(&dir, "Dak", &["--record", "other"]);
        assert!(dir.path().join(".mjop/data/other.json").exists());
        assert_eq!(record(dir.path())["globalElements"], Value::Array(vec![]));
    }
}

// =============================================================================
// Elements, spaces and defects
// =============================================================================

mod entities {
    use super::*;

    #[test]
    fn test_element_add_persists() {
        let dir = init_project();
        let id = add_element(&dir, "Dakgoot", &["--category", "dak"]);

        let snapshot = record(dir.path());
        let elements = snapshot["globalElements"].as_array().unwrap();
        assert_eq!(elements.len(), 1);
        assert_eq!(elements[0]["id"], Value::String(id));
        assert_eq!(elements[0]["name"], "Dakgoot");
        assert!(elements[0]["gebreken"]["ernstig"].is_array());
        assert_eq!(elements[0]["inspectionReports"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_space_delete_warns_when_referenced() {
        let dir = init_project();
        let space = created_ids(&dir, &["space", "add", "Kelder", "--all-floors"]);
        add_element(&dir, "CV-ketel", &["--space", &space[0]]);

        mjop(&dir)
            .args(["space", "delete", &space[0]])
            .assert()
            .success()
            .stderr(predicate::str::contains("warning:"));

        mjop(&dir)
            .arg("show")
            .assert()
            .success()
            .stdout(predicate::str::contains("Unknown space"));
    }

    #[test]
    fn test_defects_add_and_duplicate_warning() {
        let dir = init_project();
        let id = add_element(&dir, "Kozijn", &[]);

        mjop(&dir)
            .args(["defect", "add", &id, "ernstig", "houtrot", "scheur"])
            .assert()
            .success();
        mjop(&dir)
            .args(["defect", "add", &id, "ernstig", "houtrot"])
            .assert()
            .success()
            .stderr(predicate::str::contains("warning:"));

        let snapshot = record(dir.path());
        let ernstig = &snapshot["globalElements"][0]["gebreken"]["ernstig"];
        assert_eq!(ernstig.as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_unknown_defect_category_fails() {
        let dir = init_project();
        let id = add_element(&dir, "Kozijn", &[]);
        mjop(&dir)
            .args(["defect", "add", &id, "kritiek", "houtrot"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Unknown defect category"));
    }

    #[test]
    fn test_delete_missing_element_fails() {
        let dir = init_project();
        mjop(&dir)
            .args(["element", "delete", "does-not-exist"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("not found"));
    }
}

// =============================================================================
// Scheduling
// =============================================================================

mod scheduling {
    use super::*;

    #[test]
    fn test_one_off_schedule_commits_group() {
        let dir = init_project();
        let a = add_element(&dir, "Dak", &[]);
        let b = add_element(&dir, "Goot", &[]);

        let groups = created_ids(
            &dir,
            &[
                "schedule", "--name", "Schilderwerk", "--date", "2026-05-01", "--cost", "1000",
                "--element", &a, "--element", &b,
            ],
        );
        assert_eq!(groups.len(), 2);

        let snapshot = record(dir.path());
        assert_eq!(snapshot["taskGroups"].as_array().unwrap().len(), 2);
        assert_eq!(snapshot["offerGroups"].as_array().unwrap().len(), 2);
        for element in snapshot["globalElements"].as_array().unwrap() {
            let tasks = element["tasks"].as_array().unwrap();
            assert_eq!(tasks.len(), 1);
            assert_eq!(tasks[0]["isGrouped"], true);
        }
    }

    #[test]
    fn test_periodic_schedule_with_indexation() {
        let dir = init_project();
        let a = add_element(&dir, "Dak", &[]);

        mjop(&dir)
            .args([
                "schedule", "--name", "Inspectie", "--date", "2025-01-15", "--cost", "100",
                "--every", "12", "--years", "3", "--index-rate", "10", "--element", &a,
            ])
            .assert()
            .success();

        mjop(&dir)
            .args(["overview", "--json"])
            .assert()
            .success()
            .stdout(predicate::str::contains("\"2025\""))
            .stdout(predicate::str::contains("\"2027\""))
            .stdout(predicate::str::contains("121.0"));
    }

    #[test]
    fn test_repeated_element_is_scheduled_once() {
        let dir = init_project();
        let a = add_element(&dir, "Dak", &[]);

        let groups = created_ids(
            &dir,
            &[
                "schedule", "--name", "Reinigen", "--date", "2026-06-01", "--cost", "80",
                "--element", &a, "--element", &a,
            ],
        );
        assert_eq!(groups.len(), 1);

        let snapshot = record(dir.path());
        assert_eq!(snapshot["taskGroups"].as_array().unwrap().len(), 1);
        assert_eq!(snapshot["globalElements"][0]["tasks"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_dry_run_commits_nothing() {
        let dir = init_project();
        let a = add_element(&dir, "Dak", &[]);

        mjop(&dir)
            .args([
                "schedule", "--name", "Reparatie", "--date", "2026-01-01", "--cost", "50",
                "--element", &a, "--dry-run",
            ])
            .assert()
            .success()
            .stdout(predicate::str::contains("Dry run"));

        assert_eq!(record(dir.path())["taskGroups"], Value::Array(vec![]));
    }

    #[test]
    fn test_invalid_request_reports_fields() {
        let dir = init_project();
        let a = add_element(&dir, "Dak", &[]);

        mjop(&dir)
            .args([
                "schedule", "--name", "X", "--date", "not-a-date", "--cost=-5", "--element", &a,
            ])
            .assert()
            .failure()
            .stderr(predicate::str::contains("baseDate"))
            .stderr(predicate::str::contains("cost"));
    }

    #[test]
    fn test_conflicts_reported_and_blocked_when_configured() {
        let dir = init_project();
        fs::write(
            dir.path().join(".mjop/mjop.toml"),
            "[schedule]\nblock_on_conflicts = true\n",
        )
        .unwrap();
        let a = add_element(&dir, "Dak", &[]);
        let base = [
            "schedule", "--name", "Vervangen", "--date", "2026-03-01", "--cost", "500",
            "--element", &a,
        ];

        mjop(&dir).args(base).assert().success();
        mjop(&dir)
            .args(base)
            .assert()
            .failure()
            .stdout(predicate::str::contains("Conflicts:"))
            .stderr(predicate::str::contains("--allow-conflicts"));

        mjop(&dir).args(base).arg("--allow-conflicts").assert().success();
        mjop(&dir)
            .arg("conflicts")
            .assert()
            .success()
            .stdout(predicate::str::contains("overlapping task pair"));
    }

    #[test]
    fn test_group_delete_detaches_tasks() {
        let dir = init_project();
        let a = add_element(&dir, "Dak", &[]);
        let groups = created_ids(
            &dir,
            &[
                "schedule", "--name", "Reinigen", "--date", "2026-06-01", "--cost", "80",
                "--element", &a,
            ],
        );

        mjop(&dir)
            .args(["group", "delete", &groups[0]])
            .assert()
            .success();

        let snapshot = record(dir.path());
        assert_eq!(snapshot["taskGroups"], Value::Array(vec![]));
        assert_eq!(snapshot["offerGroups"], Value::Array(vec![]));
        let task = &snapshot["globalElements"][0]["tasks"][0];
        assert_eq!(task["isGrouped"], false);
        assert!(task["groupId"].is_null());
    }

    #[test]
    fn test_group_edit_changes_cost() {
        let dir = init_project();
        let a = add_element(&dir, "Dak", &[]);
        let groups = created_ids(
            &dir,
            &[
                "schedule", "--name", "Reinigen", "--date", "2026-06-01", "--cost", "80",
                "--element", &a,
            ],
        );

        mjop(&dir)
            .args(["group", "edit", &groups[0], "--cost", "95.5", "--name", "Grondig reinigen"])
            .assert()
            .success();

        let snapshot = record(dir.path());
        let task = &snapshot["globalElements"][0]["tasks"][0];
        assert_eq!(task["cost"], 95.5);
        assert_eq!(task["name"], "Grondig reinigen");
        assert_eq!(snapshot["taskGroups"][0]["baseCost"], 95.5);
    }
}

// =============================================================================
// Sync without a remote
// =============================================================================

mod sync {
    use super::*;

    #[test]
    fn test_push_without_remote_fails() {
        let dir = init_project();
        mjop(&dir)
            .arg("push")
            .assert()
            .failure()
            .stderr(predicate::str::contains("No remote endpoint configured"));
    }

    #[test]
    fn test_show_json_prints_snapshot() {
        let dir = init_project();
        add_element(&dir, "Dak", &[]);
        mjop(&dir)
            .args(["show", "--json"])
            .assert()
            .success()
            .stdout(predicate::str::contains("\"globalElements\""))
            .stdout(predicate::str::contains("\"Dak\""));
    }
}
