//! # SemDiff Core
//!
//! Core library for SemDiff - an offline-first classroom observation tracker.
//!
//! This crate provides the local data layer, its schema migrations, and the
//! last-write-wins synchronization protocol, independent of the CLI interface.
//!
//! ## Architecture
//!
//! - **storage**: entity types, `StorageEngine` repository trait, change log,
//!   and the SQLite implementation with versioned migrations
//! - **sync**: push/pull engine, transport trait, and the HTTP transport
//! - **store**: application state object with a read-through cache and
//!   derived values (current ratings, percentages, filters)
//! - **transfer**: CSV export and import of students and latest ratings
//! - **seed**: default scale catalogue

pub mod error;
pub mod fs;
pub mod percent;
pub mod seed;
pub mod storage;
pub mod store;
pub mod sync;
pub mod transfer;

pub use error::{Result, SemdiffError};
pub use storage::{ChangeLog, SqliteStorage, StorageEngine};

/// Core version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Current wall-clock time in milliseconds since the Unix epoch.
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_now_ms_is_after_2020() {
        assert!(now_ms() > 1_577_836_800_000);
    }
}
