use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

struct Workspace {
    tmp: TempDir,
    config: std::path::PathBuf,
    data: std::path::PathBuf,
}

impl Workspace {
    fn new() -> Self {
        let tmp = tempfile::tempdir().unwrap();
        let config = tmp.path().join("config");
        let data = tmp.path().join("data");
        Self {
            tmp,
            config,
            data,
        }
    }

    fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("runway").unwrap();
        cmd.env("RUNWAY_CONFIG_DIR", &self.config)
            .env("HOME", self.tmp.path())
            .env_remove("RUST_LOG");
        cmd
    }

    fn init(&self, source: &str) {
        self.cmd()
            .args(["init", "--data-dir"])
            .arg(&self.data)
            .args(["--source", source])
            .assert()
            .success()
            .stdout(predicate::str::contains("Initialized runway"));
    }

    fn write_json(&self, name: &str, value: serde_json::Value) {
        write_file(&self.data.join(name), &serde_json::to_string_pretty(&value).unwrap());
    }

    fn seed_json(&self) {
        self.init("json");
        self.write_json(
            "expenses.json",
            serde_json::json!([
                { "id": "e1", "date": "2025-01-05", "amount": 100, "category": "Food", "accountId": "chk" },
                { "id": "e2", "date": { "seconds": 1738411200, "nanoseconds": 0 }, "amount": "$50.00", "category": "Food", "accountId": "card" },
                { "id": "e3", "date": "2025-02-01T00:00:00Z", "amount": "500", "category": "Rent", "accountId": "chk" }
            ]),
        );
        self.write_json(
            "earnings.json",
            serde_json::json!([
                { "id": "i1", "date": "2025-01-20", "amount": 2000, "category": "Sales", "accountId": "chk" }
            ]),
        );
    }
}

fn write_file(path: &Path, content: &str) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}

#[test]
fn test_categories_json_from_json_store() {
    let ws = Workspace::new();
    ws.seed_json();

    let output = ws.cmd().args(["categories", "--json"]).output().unwrap();
    assert!(output.status.success());
    let slices: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let value_of = |name: &str| {
        slices
            .as_array()
            .unwrap()
            .iter()
            .find(|s| s["name"] == name)
            .map(|s| s["value"].as_f64().unwrap())
    };
    assert_eq!(value_of("Food"), Some(150.0));
    assert_eq!(value_of("Rent"), Some(500.0));
}

#[test]
fn test_account_filter_narrows_categories() {
    let ws = Workspace::new();
    ws.seed_json();

    let output = ws
        .cmd()
        .args(["categories", "--json", "--account", "card"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let slices: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let slices = slices.as_array().unwrap();
    assert_eq!(slices.len(), 1);
    assert_eq!(slices[0]["name"], "Food");
    assert_eq!(slices[0]["value"].as_f64(), Some(50.0));
}

#[test]
fn test_single_date_bound_is_rejected() {
    let ws = Workspace::new();
    ws.seed_json();

    ws.cmd()
        .args(["summary", "--from", "2025-01-01"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--from requires --to"));
}

#[test]
fn test_runway_defaults_to_twelve_months() {
    let ws = Workspace::new();
    ws.seed_json();

    let output = ws.cmd().args(["runway", "--json"]).output().unwrap();
    assert!(output.status.success());
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["month_count"], 12);
    // (2000 - 650) / (650 / 12) = 24.9
    assert_eq!(report["months"], 25);
}

#[test]
fn test_runway_over_selected_month() {
    let ws = Workspace::new();
    ws.seed_json();

    let output = ws
        .cmd()
        .args(["runway", "--json", "--month", "2025-02"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["month_count"], 1);
    // February: no earnings, 550 of expenses
    assert_eq!(report["months"], -1);
}

#[test]
fn test_invalid_month_fails() {
    let ws = Workspace::new();
    ws.seed_json();

    ws.cmd()
        .args(["runway", "--month", "2025-13"])
        .assert()
        .failure()
        .stderr(predicate::str::starts_with("Error:"));
}

#[test]
fn test_detail_csv_export() {
    let ws = Workspace::new();
    ws.seed_json();
    let out = ws.data.join("exports").join("food.csv");

    ws.cmd()
        .args(["detail", "--kind", "expense", "--category", "Food", "--csv"])
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("Wrote 2 row(s)"));

    let content = std::fs::read_to_string(&out).unwrap();
    let mut lines = content.lines();
    assert_eq!(
        lines.next(),
        Some("type,category,date,amount,accountId,description")
    );
    assert_eq!(lines.count(), 2);
}

#[test]
fn test_demo_then_summary_on_sqlite() {
    let ws = Workspace::new();
    ws.init("sqlite");
    assert!(ws.data.join("runway.db").exists());

    ws.cmd()
        .arg("demo")
        .assert()
        .success()
        .stdout(predicate::str::contains("Loaded"));

    ws.cmd()
        .arg("summary")
        .assert()
        .success()
        .stdout(predicate::str::contains("Profit & Loss"))
        .stdout(predicate::str::contains("RUNWAY"));

    ws.cmd()
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Expenses:"));
}

#[test]
fn test_fresh_json_store_is_empty_not_broken() {
    let ws = Workspace::new();
    ws.init("json");
    assert!(ws.data.join("expenses.json").exists());
    assert!(ws.data.join("earnings.json").exists());

    ws.cmd()
        .arg("summary")
        .assert()
        .success()
        .stdout(predicate::str::contains("0 of 0 records matched"));
    ws.cmd()
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("No records yet"));
}

#[test]
fn test_missing_store_reports_load_error() {
    let ws = Workspace::new();
    ws.init("json");
    std::fs::remove_file(ws.data.join("earnings.json")).unwrap();
    ws.cmd()
        .arg("summary")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load records"));
}

#[test]
fn test_completions() {
    let ws = Workspace::new();
    ws.cmd()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("runway"));
}
