//! JSON output for composite views.

use std::collections::HashMap;

use serde::Serialize;

use semdiff_core::storage::{CheckDef, Note, Rating, Scale, Student};

/// A scale paired with a student's current value on it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RatingView {
    pub scale_id: String,
    pub left_label: String,
    pub right_label: String,
    pub value: Option<f64>,
    pub percent: Option<f64>,
    pub recorded_at: Option<i64>,
}

/// One view per scale, in scale order; unrated scales have no value.
pub fn rating_views(scales: &[Scale], current: &HashMap<String, Rating>) -> Vec<RatingView> {
    scales
        .iter()
        .map(|scale| {
            let rating = current.get(&scale.id);
            RatingView {
                scale_id: scale.id.clone(),
                left_label: scale.left_label.clone(),
                right_label: scale.right_label.clone(),
                value: rating.map(|r| r.value),
                percent: rating.map(|r| scale.percent(r.value)),
                recorded_at: rating.map(|r| r.recorded_at),
            }
        })
        .collect()
}

#[derive(Debug, Serialize)]
pub struct CheckView<'a> {
    pub check_id: &'a str,
    pub label: &'a str,
    pub value: bool,
}

pub fn check_views<'a>(checks: &'a [CheckDef], marks: &HashMap<String, bool>) -> Vec<CheckView<'a>> {
    checks
        .iter()
        .map(|check| CheckView {
            check_id: &check.id,
            label: &check.label,
            value: marks.get(&check.id).copied().unwrap_or(false),
        })
        .collect()
}

pub fn student_detail_json(
    student: &Student,
    ratings: &[RatingView],
    notes: &[Note],
    checks: &[CheckView<'_>],
) -> serde_json::Value {
    serde_json::json!({
        "student": student,
        "ratings": ratings,
        "notes": notes,
        "checks": checks,
    })
}

/// Class names with their student counts, in name order.
pub fn class_counts(students: &[Student]) -> Vec<(String, usize)> {
    let mut counts: Vec<(String, usize)> = Vec::new();
    for student in students {
        match counts.iter_mut().find(|(name, _)| *name == student.class_name) {
            Some((_, n)) => *n += 1,
            None => counts.push((student.class_name.clone(), 1)),
        }
    }
    counts.sort_by(|a, b| a.0.cmp(&b.0));
    counts
}
