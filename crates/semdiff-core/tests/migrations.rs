use rusqlite::{params, Connection};
use tempfile::tempdir;

use semdiff_core::storage::sqlite::migrations::SCHEMA_VERSION;
use semdiff_core::storage::{SqliteStorage, StorageEngine};
use semdiff_core::SemdiffError;

/// Hand-built database at schema version 1: scales without ordering or
/// polarity columns, and one bound-less scale.
fn write_v1_database(path: &std::path::Path) {
    let conn = Connection::open(path).expect("v1 database should open");
    conn.execute_batch(
        r#"
        CREATE TABLE students (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            class_name TEXT NOT NULL,
            number INTEGER NOT NULL,
            first_name TEXT NOT NULL,
            last_name TEXT NOT NULL,
            gender TEXT,
            updated_at INTEGER NOT NULL
        );
        CREATE TABLE scales (
            id TEXT PRIMARY KEY,
            left_label TEXT NOT NULL,
            right_label TEXT NOT NULL,
            min REAL,
            max REAL,
            updated_at INTEGER NOT NULL
        );
        CREATE TABLE ratings (
            id TEXT PRIMARY KEY,
            student_id INTEGER NOT NULL,
            scale_id TEXT NOT NULL,
            value REAL NOT NULL,
            recorded_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        );
        CREATE TABLE notes (
            id TEXT PRIMARY KEY,
            student_id INTEGER NOT NULL,
            text TEXT NOT NULL,
            tags_json TEXT,
            recorded_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        );
        PRAGMA user_version = 1;
        "#,
    )
    .expect("v1 schema should apply");

    for (id, min, max) in [
        ("zeta", Some(-3.0), Some(3.0)),
        ("alpha", None, None),
        ("mid", Some(0.0), Some(10.0)),
    ] {
        conn.execute(
            "INSERT INTO scales (id, left_label, right_label, min, max, updated_at) VALUES (?1, 'l', 'r', ?2, ?3, 5)",
            params![id, min, max],
        )
        .expect("scale insert should succeed");
    }
    conn.execute(
        "INSERT INTO students (class_name, number, first_name, last_name, updated_at) VALUES ('X', 1, 'Alice', 'A', 5)",
        [],
    )
    .expect("student insert should succeed");
}

#[test]
fn test_v1_database_is_upgraded_with_backfilled_order() {
    let dir = tempdir().expect("tempdir should be created");
    let path = dir.path().join("semdiff.sqlite3");
    write_v1_database(&path);

    let storage = SqliteStorage::open(&path).expect("open should migrate");
    assert_eq!(storage.schema_version().unwrap(), SCHEMA_VERSION);

    let scales = storage.list_scales().expect("scales should list");
    let order: Vec<(&str, i64)> = scales
        .iter()
        .map(|s| (s.id.as_str(), s.sort_index))
        .collect();
    assert_eq!(order, vec![("alpha", 0), ("mid", 1), ("zeta", 2)]);

    let alpha = &scales[0];
    assert_eq!((alpha.min, alpha.max), (-3.0, 3.0));
    assert!(alpha.higher_is_better);
    assert_eq!(scales[1].max, 10.0);

    // data from v1 survives, and later tables exist
    assert_eq!(storage.list_students().unwrap().len(), 1);
    storage
        .set_setting("last_sync", "0")
        .expect("settings table should exist");
    storage
        .ensure_seating_for_class("X")
        .expect("seating table should exist");
}

#[test]
fn test_reopening_is_a_no_op() {
    let dir = tempdir().expect("tempdir should be created");
    let path = dir.path().join("semdiff.sqlite3");
    write_v1_database(&path);

    {
        let storage = SqliteStorage::open(&path).expect("first open should migrate");
        storage
            .update_scales_order(&["zeta".to_string()])
            .expect("reorder should succeed");
    }

    let storage = SqliteStorage::open(&path).expect("second open should succeed");
    let ids: Vec<String> = storage
        .list_scales()
        .unwrap()
        .into_iter()
        .map(|s| s.id)
        .collect();
    assert_eq!(ids, vec!["zeta", "alpha", "mid"]);
}

#[test]
fn test_partially_indexed_scales_keep_existing_indexes() {
    let dir = tempdir().expect("tempdir should be created");
    let path = dir.path().join("semdiff.sqlite3");
    write_v1_database(&path);

    {
        // A v1 file that already gained the column (and one index) out of band.
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch("ALTER TABLE scales ADD COLUMN sort_index INTEGER;")
            .unwrap();
        conn.execute("UPDATE scales SET sort_index = 7 WHERE id = 'zeta'", [])
            .unwrap();
    }

    let storage = SqliteStorage::open(&path).expect("open should migrate");
    let zeta = storage.get_scale("zeta").unwrap().unwrap();
    let alpha = storage.get_scale("alpha").unwrap().unwrap();
    let mid = storage.get_scale("mid").unwrap().unwrap();
    assert_eq!(zeta.sort_index, 7);
    assert_eq!(alpha.sort_index, 0);
    assert_eq!(mid.sort_index, 1);
}

#[test]
fn test_newer_schema_is_rejected() {
    let dir = tempdir().expect("tempdir should be created");
    let path = dir.path().join("future.sqlite3");
    {
        let conn = Connection::open(&path).unwrap();
        conn.pragma_update(None, "user_version", SCHEMA_VERSION + 1)
            .unwrap();
    }

    match SqliteStorage::open(&path) {
        Err(SemdiffError::Migration(message)) => assert!(message.contains("newer")),
        Err(other) => panic!("unexpected error: {}", other),
        Ok(_) => panic!("newer schema should be rejected"),
    }
}
