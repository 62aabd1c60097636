//! UI primitives for the SemDiff CLI.
//!
//! - **Context**: output mode and terminal detection
//! - **Theme**: badges and owo-colors styles
//! - **Render**: tables, headers, hints, key-value lines
//! - **Progress**: spinner for network calls
//! - **Format**: timestamps, values, truncation

mod context;
pub mod format;
pub mod progress;
pub mod render;
pub mod theme;

pub use context::{OutputMode, UiContext};
pub use theme::Badge;

pub use render::{
    badge, blank_line, header, hint, kv, print, print_error, print_json, simple_table,
};

pub use progress::Spinner;

pub use format::{format_percent, format_timestamp, format_value, truncate};
