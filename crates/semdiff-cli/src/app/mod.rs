//! Application-level utilities for the SemDiff CLI.
//!
//! This module provides:
//! - Path resolution for config and database files
//! - Lazily loaded config and storage shared by command handlers
//! - Lookups that turn missing records into not-found errors

mod context;
mod resolver;

// Re-export public API
pub use context::AppContext;
pub use resolver::{require_scale, require_student, resolve_config_path};
