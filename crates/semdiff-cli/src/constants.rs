//! Constants used throughout the CLI.

/// Exit codes for the CLI.
///
/// These follow common Unix conventions:
/// - 0: Success
/// - 1: General error (used by anyhow for unhandled errors)
/// - 2: Misuse of shell command (reserved by shells)
/// - 3+: Application-specific errors
pub mod exit_codes {
    /// Resource not found (database, student, scale, note).
    pub const NOT_FOUND: i32 = 3;

    /// Invalid user input or arguments.
    pub const INVALID_INPUT: i32 = 4;

    /// Write rejected because it would collide with existing data.
    pub const CONFLICT: i32 = 5;
}

/// Environment variables read by the CLI.
pub mod env {
    pub const CONFIG: &str = "SEMDIFF_CONFIG";
    pub const LOG: &str = "SEMDIFF_LOG";
}

/// Directory name under the XDG config and data homes.
pub const APP_DIR: &str = "semdiff";

pub const CONFIG_FILE: &str = "config.toml";

pub const DATABASE_FILE: &str = "semdiff.sqlite3";

/// Default HTTP timeout for sync and login requests.
pub const DEFAULT_SYNC_TIMEOUT_SECS: u64 = 30;
