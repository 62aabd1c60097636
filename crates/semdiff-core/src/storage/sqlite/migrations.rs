//! Versioned schema migrations.
//!
//! The schema version lives in `PRAGMA user_version`. Each step runs in its
//! own transaction that also bumps the version, so a failure leaves the
//! database at the last completed step.

use rusqlite::{Connection, Transaction};
use tracing::debug;

use crate::error::{Result, SemdiffError};

/// Newest schema version this build knows.
pub const SCHEMA_VERSION: i64 = 7;

struct Migration {
    version: i64,
    description: &'static str,
    apply: fn(&Transaction<'_>) -> Result<()>,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        description: "base tables",
        apply: v1_base_tables,
    },
    Migration {
        version: 2,
        description: "scale sort index",
        apply: v2_scale_sort_index,
    },
    Migration {
        version: 3,
        description: "scale polarity",
        apply: v3_scale_polarity,
    },
    Migration {
        version: 4,
        description: "change log",
        apply: v4_change_log,
    },
    Migration {
        version: 5,
        description: "seating plans",
        apply: v5_seating,
    },
    Migration {
        version: 6,
        description: "checks",
        apply: v6_checks,
    },
    Migration {
        version: 7,
        description: "settings",
        apply: v7_settings,
    },
];

/// Current `user_version` of the database.
pub fn schema_version(conn: &Connection) -> Result<i64> {
    let version: i64 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;
    Ok(version)
}

/// Bring the database up to [`SCHEMA_VERSION`].
///
/// # Returns
///
/// Returns the final schema version.
///
/// # Errors
///
/// Returns `SemdiffError::Migration` if the database is newer than this
/// build or a step fails.
pub fn migrate(conn: &mut Connection) -> Result<i64> {
    let current = schema_version(conn)?;
    if current > SCHEMA_VERSION {
        return Err(SemdiffError::Migration(format!(
            "Database schema version {} is newer than supported version {}",
            current, SCHEMA_VERSION
        )));
    }

    for migration in MIGRATIONS.iter().filter(|m| m.version > current) {
        debug!(
            version = migration.version,
            description = migration.description,
            "applying migration"
        );
        let tx = conn.transaction()?;
        (migration.apply)(&tx).map_err(|e| {
            SemdiffError::Migration(format!(
                "v{} ({}) failed: {}",
                migration.version, migration.description, e
            ))
        })?;
        tx.pragma_update(None, "user_version", migration.version)?;
        tx.commit()?;
    }

    schema_version(conn)
}

fn table_has_column(tx: &Transaction<'_>, table: &str, column: &str) -> Result<bool> {
    let sql = format!("PRAGMA table_info({})", table);
    let mut stmt = tx.prepare(&sql)?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let name: String = row.get(1)?;
        if name == column {
            return Ok(true);
        }
    }
    Ok(false)
}

fn v1_base_tables(tx: &Transaction<'_>) -> Result<()> {
    tx.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS students (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            class_name TEXT NOT NULL,
            number INTEGER NOT NULL,
            first_name TEXT NOT NULL,
            last_name TEXT NOT NULL,
            gender TEXT,
            updated_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_students_class ON students(class_name);
        CREATE INDEX IF NOT EXISTS idx_students_last_name ON students(last_name);

        CREATE TABLE IF NOT EXISTS scales (
            id TEXT PRIMARY KEY,
            left_label TEXT NOT NULL,
            right_label TEXT NOT NULL,
            min REAL,
            max REAL,
            updated_at INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS ratings (
            id TEXT PRIMARY KEY,
            student_id INTEGER NOT NULL,
            scale_id TEXT NOT NULL,
            value REAL NOT NULL,
            recorded_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_ratings_student ON ratings(student_id);
        CREATE INDEX IF NOT EXISTS idx_ratings_scale ON ratings(scale_id);
        CREATE INDEX IF NOT EXISTS idx_ratings_recorded ON ratings(recorded_at);

        CREATE TABLE IF NOT EXISTS notes (
            id TEXT PRIMARY KEY,
            student_id INTEGER NOT NULL,
            text TEXT NOT NULL,
            tags_json TEXT,
            recorded_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_notes_student ON notes(student_id);
        CREATE INDEX IF NOT EXISTS idx_notes_recorded ON notes(recorded_at);
        "#,
    )?;
    Ok(())
}

fn v2_scale_sort_index(tx: &Transaction<'_>) -> Result<()> {
    if !table_has_column(tx, "scales", "sort_index")? {
        tx.execute_batch("ALTER TABLE scales ADD COLUMN sort_index INTEGER;")?;
    }
    tx.execute_batch("CREATE INDEX IF NOT EXISTS idx_scales_sort ON scales(sort_index);")?;

    let unindexed: Vec<String> = {
        let mut stmt = tx.prepare("SELECT id FROM scales WHERE sort_index IS NULL ORDER BY id")?;
        let ids = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;
        ids
    };
    for (index, id) in unindexed.iter().enumerate() {
        tx.execute(
            "UPDATE scales SET sort_index = ?1 WHERE id = ?2",
            rusqlite::params![index as i64, id],
        )?;
    }
    debug!(backfilled = unindexed.len(), "scale sort_index backfill");
    Ok(())
}

fn v3_scale_polarity(tx: &Transaction<'_>) -> Result<()> {
    if !table_has_column(tx, "scales", "higher_is_better")? {
        tx.execute_batch(
            "ALTER TABLE scales ADD COLUMN higher_is_better INTEGER NOT NULL DEFAULT 1;",
        )?;
    }
    Ok(())
}

fn v4_change_log(tx: &Transaction<'_>) -> Result<()> {
    tx.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS changes (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            entity TEXT NOT NULL,
            data TEXT NOT NULL,
            updated_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_changes_entity ON changes(entity);
        "#,
    )?;
    Ok(())
}

fn v5_seating(tx: &Transaction<'_>) -> Result<()> {
    tx.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS seating (
            class_name TEXT PRIMARY KEY,
            seats_json TEXT NOT NULL,
            updated_at INTEGER NOT NULL
        );
        "#,
    )?;
    Ok(())
}

fn v6_checks(tx: &Transaction<'_>) -> Result<()> {
    tx.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS checks (
            id TEXT PRIMARY KEY,
            label TEXT NOT NULL,
            sort_index INTEGER,
            updated_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_checks_sort ON checks(sort_index);

        CREATE TABLE IF NOT EXISTS check_marks (
            id TEXT PRIMARY KEY,
            student_id INTEGER NOT NULL,
            check_id TEXT NOT NULL,
            value INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_check_marks_student ON check_marks(student_id);
        CREATE INDEX IF NOT EXISTS idx_check_marks_check ON check_marks(check_id);
        "#,
    )?;
    Ok(())
}

fn v7_settings(tx: &Transaction<'_>) -> Result<()> {
    tx.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );
        "#,
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_database_reaches_latest_version() {
        let mut conn = Connection::open_in_memory().unwrap();
        assert_eq!(schema_version(&conn).unwrap(), 0);
        assert_eq!(migrate(&mut conn).unwrap(), SCHEMA_VERSION);
        // second run is a no-op
        assert_eq!(migrate(&mut conn).unwrap(), SCHEMA_VERSION);
    }

    #[test]
    fn test_newer_database_is_rejected() {
        let mut conn = Connection::open_in_memory().unwrap();
        conn.pragma_update(None, "user_version", SCHEMA_VERSION + 1)
            .unwrap();
        let err = migrate(&mut conn).unwrap_err();
        assert!(matches!(err, SemdiffError::Migration(_)));
    }

    #[test]
    fn test_versions_are_strictly_increasing() {
        let versions: Vec<i64> = MIGRATIONS.iter().map(|m| m.version).collect();
        assert!(versions.windows(2).all(|w| w[0] + 1 == w[1]));
        assert_eq!(versions.last().copied(), Some(SCHEMA_VERSION));
    }
}
