//! Output formatting helpers for the CLI.

mod json;

pub use json::{check_views, class_counts, rating_views, student_detail_json};
