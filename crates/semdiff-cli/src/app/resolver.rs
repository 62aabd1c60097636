//! Path resolution for config and database files, and record lookups.

use std::path::{Path, PathBuf};

use semdiff_core::storage::{Scale, Student};
use semdiff_core::StorageEngine;

use crate::config::{default_config_path, default_database_path, SemdiffConfig};
use crate::constants::env;
use crate::errors::CliError;

/// Resolve the config file path, checking SEMDIFF_CONFIG first.
pub fn resolve_config_path() -> anyhow::Result<PathBuf> {
    if let Ok(value) = std::env::var(env::CONFIG) {
        if !value.trim().is_empty() {
            return Ok(PathBuf::from(value));
        }
    }
    default_config_path()
}

/// Resolve the database path: `--db`/SEMDIFF_DB, then config, then the
/// XDG data default.
pub fn resolve_database_path(
    flag: Option<&str>,
    config: &SemdiffConfig,
) -> anyhow::Result<PathBuf> {
    if let Some(path) = flag.filter(|p| !p.trim().is_empty()) {
        return Ok(PathBuf::from(path));
    }
    if let Some(path) = config.database.path.as_deref() {
        return Ok(PathBuf::from(path));
    }
    default_database_path()
}

/// Error message when the database file is missing.
pub fn missing_database_message(path: &Path) -> String {
    format!(
        "No database found at {}\n\nRun:\n  semdiff init\n\nOr specify a database path:\n  SEMDIFF_DB=/path/to/semdiff.sqlite3 semdiff init",
        path.display()
    )
}

pub fn require_student<S: StorageEngine + ?Sized>(
    storage: &S,
    id: i64,
) -> anyhow::Result<Student> {
    storage.get_student(id)?.ok_or_else(|| {
        CliError::not_found(
            format!("Student {} not found", id),
            "Hint: Run `semdiff student list` to see student ids.",
        )
        .into()
    })
}

pub fn require_scale<S: StorageEngine + ?Sized>(storage: &S, id: &str) -> anyhow::Result<Scale> {
    storage.get_scale(id)?.ok_or_else(|| {
        CliError::not_found(
            format!("Scale \"{}\" not found", id),
            "Hint: Run `semdiff scale list` to see available scales.",
        )
        .into()
    })
}
