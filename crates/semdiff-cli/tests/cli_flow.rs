use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use rusqlite::Connection;
use tempfile::TempDir;

fn bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_semdiff"))
}

struct Env {
    dir: TempDir,
}

impl Env {
    fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("tempdir should succeed"),
        }
    }

    fn db(&self) -> PathBuf {
        self.dir.path().join("data").join("semdiff.sqlite3")
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn command(&self, db: &Path) -> Command {
        let mut cmd = Command::new(bin());
        cmd.arg("--db")
            .arg(db)
            .env_remove("SEMDIFF_DB")
            .env_remove("SEMDIFF_PASSWORD")
            .env("SEMDIFF_CONFIG", self.path("config.toml"))
            .env("XDG_CONFIG_HOME", self.path("xdg-config"))
            .env("XDG_DATA_HOME", self.path("xdg-data"))
            .env("NO_COLOR", "1");
        cmd
    }

    fn run(&self, args: &[&str]) -> Output {
        self.run_on(&self.db(), args)
    }

    fn run_on(&self, db: &Path, args: &[&str]) -> Output {
        self.command(db)
            .args(args)
            .output()
            .expect("command should run")
    }

    fn run_ok(&self, args: &[&str]) -> String {
        let output = self.run(args);
        assert_success(&output, args);
        String::from_utf8_lossy(&output.stdout).to_string()
    }
}

fn assert_success(output: &Output, args: &[&str]) {
    assert!(
        output.status.success(),
        "{:?} failed: stdout={}, stderr={}",
        args,
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
}

fn plain_value<'a>(stdout: &'a str, key: &str) -> Option<&'a str> {
    stdout
        .lines()
        .find_map(|line| line.strip_prefix(key)?.strip_prefix('='))
}

#[test]
fn test_cli_init_seeds_scales_and_writes_config() {
    let env = Env::new();
    let stdout = env.run_ok(&["init"]);
    assert_eq!(plain_value(&stdout, "status"), Some("ok"));
    assert_eq!(plain_value(&stdout, "seeded_scales"), Some("8"));
    assert!(env.db().exists());

    let config = std::fs::read_to_string(env.path("config.toml")).expect("config should exist");
    assert!(config.contains("semdiff.sqlite3"));

    // Re-running init keeps existing scales.
    let stdout = env.run_ok(&["init"]);
    assert_eq!(plain_value(&stdout, "seeded_scales"), Some("0"));

    let conn = Connection::open(env.db()).expect("open should succeed");
    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM scales", [], |row| row.get(0))
        .expect("count should succeed");
    assert_eq!(count, 8);
}

#[test]
fn test_cli_student_rate_and_ratings_json() {
    let env = Env::new();
    env.run_ok(&["init"]);

    let stdout = env.run_ok(&[
        "student", "add", "--class", "3A", "--number", "4", "--first", "Léa", "--last", "Martin",
    ]);
    let id = plain_value(&stdout, "id").expect("id line").to_string();

    let list = env.run_ok(&["student", "list", "--json"]);
    let students: serde_json::Value = serde_json::from_str(&list).expect("parse list json");
    let array = students.as_array().expect("list output array");
    assert_eq!(array.len(), 1);
    assert_eq!(array[0]["last_name"], "Martin");

    // Values outside the scale range are clamped.
    let stdout = env.run_ok(&["rate", &id, "actif", "7"]);
    assert_eq!(plain_value(&stdout, "value"), Some("3"));
    let stdout = env.run_ok(&["rate", &id, "actif", "-1", "--delta"]);
    assert_eq!(plain_value(&stdout, "value"), Some("2"));

    let ratings = env.run_ok(&["ratings", &id, "--json"]);
    let views: serde_json::Value = serde_json::from_str(&ratings).expect("parse ratings json");
    let actif = views
        .as_array()
        .expect("ratings array")
        .iter()
        .find(|v| v["scale_id"] == "actif")
        .expect("actif view");
    assert_eq!(actif["value"], 2.0);

    let history = env.run_ok(&["ratings", &id, "--history", "--json"]);
    let events: serde_json::Value = serde_json::from_str(&history).expect("parse history json");
    assert_eq!(events.as_array().map(Vec::len), Some(2));
}

#[test]
fn test_cli_notes_and_checks() {
    let env = Env::new();
    env.run_ok(&["init", "--no-seed"]);
    env.run_ok(&[
        "student", "add", "--class", "3A", "--number", "1", "--first", "Tom", "--last", "Dupont",
    ]);

    env.run_ok(&["note", "add", "1", "Great presentation", "--tag", "oral", "--tag", " oral "]);
    let notes = env.run_ok(&["note", "list", "1", "--json"]);
    let notes: serde_json::Value = serde_json::from_str(&notes).expect("parse notes json");
    assert_eq!(notes[0]["text"], "Great presentation");
    assert_eq!(notes[0]["tags"], serde_json::json!(["oral"]));

    env.run_ok(&["check", "add", "homework", "Homework done"]);
    env.run_ok(&["check", "mark", "1", "homework"]);
    let marks = env.run_ok(&["check", "show", "1", "--json"]);
    let marks: serde_json::Value = serde_json::from_str(&marks).expect("parse checks json");
    assert_eq!(marks[0]["check_id"], "homework");
    assert_eq!(marks[0]["value"], true);

    let missing = env.run(&["check", "mark", "1", "nope"]);
    assert_eq!(missing.status.code(), Some(3));
}

#[test]
fn test_cli_export_import_round_trip() {
    let env = Env::new();
    env.run_ok(&["init"]);
    env.run_ok(&[
        "student", "add", "--class", "3A", "--number", "1", "--first", "Alice", "--last", "Durand",
    ]);
    env.run_ok(&[
        "student", "add", "--class", "3A", "--number", "2", "--first", "Bob", "--last", "Petit",
    ]);

    let csv_path = env.path("students.csv");
    let csv_arg = csv_path.to_string_lossy().to_string();
    let stdout = env.run_ok(&["export", "students", "--out", &csv_arg]);
    assert_eq!(plain_value(&stdout, "rows"), Some("2"));

    let other_db = env.path("other.sqlite3");
    assert_success(&env.run_on(&other_db, &["init"]), &["init"]);
    let import = env.run_on(&other_db, &["import", "students", &csv_arg]);
    assert_success(&import, &["import"]);
    let stdout = String::from_utf8_lossy(&import.stdout);
    assert_eq!(plain_value(&stdout, "inserted"), Some("2"));

    // Importing again merges onto the same (class, number) pairs.
    let again = env.run_on(&other_db, &["import", "students", &csv_arg]);
    let stdout = String::from_utf8_lossy(&again.stdout);
    assert_eq!(plain_value(&stdout, "inserted"), Some("0"));
    assert_eq!(plain_value(&stdout, "merged"), Some("2"));
}

#[test]
fn test_cli_exit_codes() {
    let env = Env::new();

    let missing_db = env.run(&["student", "list"]);
    assert_eq!(missing_db.status.code(), Some(3));
    assert!(String::from_utf8_lossy(&missing_db.stderr).contains("semdiff init"));

    env.run_ok(&["init"]);
    env.run_ok(&[
        "student", "add", "--class", "3A", "--number", "1", "--first", "Tom", "--last", "Dupont",
        "--id", "10",
    ]);

    let unknown_student = env.run(&["rate", "99", "actif", "1"]);
    assert_eq!(unknown_student.status.code(), Some(3));

    let unknown_scale = env.run(&["rate", "10", "nope", "1"]);
    assert_eq!(unknown_scale.status.code(), Some(3));

    let duplicate = env.run(&[
        "student", "add", "--class", "3B", "--number", "2", "--first", "Ana", "--last", "Lopez",
        "--id", "10",
    ]);
    assert_eq!(duplicate.status.code(), Some(5));

    // No terminal to confirm on.
    let delete = env.run(&["student", "delete", "10"]);
    assert_eq!(delete.status.code(), Some(4));

    env.run_ok(&["student", "delete", "10", "--yes"]);
    let gone = env.run(&["student", "show", "10"]);
    assert_eq!(gone.status.code(), Some(3));
}

#[test]
fn test_cli_student_edit_moves_ratings() {
    let env = Env::new();
    env.run_ok(&["init"]);
    env.run_ok(&[
        "student", "add", "--class", "3A", "--number", "1", "--first", "Tom", "--last", "Dupont",
        "--id", "1",
    ]);
    env.run_ok(&["rate", "1", "actif", "2"]);

    let stdout = env.run_ok(&["student", "edit", "1", "--id", "500"]);
    assert_eq!(plain_value(&stdout, "id"), Some("500"));

    let ratings = env.run_ok(&["ratings", "500", "--history", "--json"]);
    let events: serde_json::Value = serde_json::from_str(&ratings).expect("parse history json");
    assert_eq!(events[0]["student_id"], 500);

    let nothing = env.run(&["student", "edit", "500"]);
    assert_eq!(nothing.status.code(), Some(4));
}

#[test]
fn test_cli_sync_status_counts_queued_changes() {
    let env = Env::new();
    env.run_ok(&["init"]);

    let stdout = env.run_ok(&["sync", "--status"]);
    assert_eq!(plain_value(&stdout, "pending"), Some("0"));
    assert_eq!(plain_value(&stdout, "last_sync"), Some("0"));
    assert_eq!(plain_value(&stdout, "logged_in"), Some("false"));

    env.run_ok(&[
        "student", "add", "--class", "3A", "--number", "1", "--first", "Tom", "--last", "Dupont",
    ]);
    env.run_ok(&["rate", "1", "actif", "1"]);

    let stdout = env.run_ok(&["sync", "--status"]);
    let pending: usize = plain_value(&stdout, "pending")
        .expect("pending line")
        .parse()
        .expect("pending should be a number");
    assert!(pending >= 2);

    env.run_ok(&["remote", "url", "http://127.0.0.1:9/api/"]);
    let stdout = env.run_ok(&["remote", "url"]);
    assert_eq!(stdout.trim(), "http://127.0.0.1:9/api");
}

#[test]
fn test_cli_seating_swap() {
    let env = Env::new();
    env.run_ok(&["init", "--no-seed"]);
    env.run_ok(&[
        "student", "add", "--class", "3A", "--number", "1", "--first", "Tom", "--last", "Dupont",
        "--id", "1",
    ]);

    let plan = env.run_ok(&["seating", "show", "3A", "--json"]);
    let plan: serde_json::Value = serde_json::from_str(&plan).expect("parse plan json");
    assert_eq!(plan["seats"].as_array().map(Vec::len), Some(48));
    assert_eq!(plan["seats"][0], 1);

    let stdout = env.run_ok(&["seating", "swap", "3A", "0", "5"]);
    assert_eq!(plain_value(&stdout, "5"), Some("1"));
    assert_eq!(plain_value(&stdout, "0"), Some("-"));

    let out_of_range = env.run(&["seating", "swap", "3A", "0", "48"]);
    assert_eq!(out_of_range.status.code(), Some(4));
}
