//! Core data types for the storage layer.
//!
//! Records read from storage are always fully defaulted. The `*Input` types
//! carry the optional fields callers may omit; their `normalize` methods are
//! the single place where defaults are applied.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{Result, SemdiffError};
use crate::percent::{clamp, compute_percent};

/// Number of slots in a seating plan (6 rows of 8 seats).
pub const SEAT_COUNT: usize = 48;

/// Lower bound applied to scales created without one.
pub const DEFAULT_SCALE_MIN: f64 = -3.0;

/// Upper bound applied to scales created without one.
pub const DEFAULT_SCALE_MAX: f64 = 3.0;

/// Well-known keys of the settings table.
pub mod settings_keys {
    /// Base URL of the remote API (e.g. `http://localhost:8000/api`).
    pub const API_BASE: &str = "api_base";
    /// Bearer token for the remote API.
    pub const TOKEN: &str = "token";
    /// Watermark of the last successful pull, in epoch milliseconds.
    pub const LAST_SYNC: &str = "last_sync";
}

/// API base used when none has been configured.
pub const DEFAULT_API_BASE: &str = "http://localhost:8000/api";

fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// --- Students ---

/// A student. `id` is the stable identity referenced by every other record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Student {
    pub id: i64,
    pub class_name: String,
    pub number: i64,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub updated_at: i64,
}

impl Student {
    /// "First Last", as shown in listings.
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Builder for inserting or replacing a student.
#[derive(Debug, Clone, PartialEq)]
pub struct NewStudent {
    /// Explicit id; `None` lets storage assign the next one.
    pub id: Option<i64>,
    pub class_name: String,
    pub number: i64,
    pub first_name: String,
    pub last_name: String,
    pub gender: Option<String>,
    /// Write timestamp; storage stamps the current time when absent.
    pub updated_at: Option<i64>,
}

impl NewStudent {
    pub fn new(
        class_name: impl Into<String>,
        number: i64,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            class_name: class_name.into(),
            number,
            first_name: first_name.into(),
            last_name: last_name.into(),
            gender: None,
            updated_at: None,
        }
    }

    pub fn with_id(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_gender(mut self, gender: impl Into<String>) -> Self {
        self.gender = Some(gender.into());
        self
    }

    pub fn with_updated_at(mut self, updated_at: i64) -> Self {
        self.updated_at = Some(updated_at);
        self
    }
}

impl From<Student> for NewStudent {
    fn from(student: Student) -> Self {
        Self {
            id: Some(student.id),
            class_name: student.class_name,
            number: student.number,
            first_name: student.first_name,
            last_name: student.last_name,
            gender: student.gender,
            updated_at: Some(student.updated_at),
        }
    }
}

/// Input for the identity-changing student update.
///
/// Every `None` field keeps the stored value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StudentUpdate {
    pub id: i64,
    pub new_id: Option<i64>,
    pub class_name: Option<String>,
    pub number: Option<i64>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub gender: Option<String>,
}

impl StudentUpdate {
    pub fn new(id: i64) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }

    pub fn new_id(mut self, new_id: i64) -> Self {
        self.new_id = Some(new_id);
        self
    }

    pub fn class_name(mut self, class_name: impl Into<String>) -> Self {
        self.class_name = Some(class_name.into());
        self
    }

    pub fn number(mut self, number: i64) -> Self {
        self.number = Some(number);
        self
    }

    pub fn first_name(mut self, first_name: impl Into<String>) -> Self {
        self.first_name = Some(first_name.into());
        self
    }

    pub fn last_name(mut self, last_name: impl Into<String>) -> Self {
        self.last_name = Some(last_name.into());
        self
    }

    pub fn gender(mut self, gender: impl Into<String>) -> Self {
        self.gender = Some(gender.into());
        self
    }

    /// Apply the update to `current`, producing the row that will be stored.
    pub fn apply_to(&self, current: &Student, now: i64) -> Student {
        Student {
            id: self.new_id.unwrap_or(current.id),
            class_name: self
                .class_name
                .clone()
                .unwrap_or_else(|| current.class_name.clone()),
            number: self.number.unwrap_or(current.number),
            first_name: self
                .first_name
                .clone()
                .unwrap_or_else(|| current.first_name.clone()),
            last_name: self
                .last_name
                .clone()
                .unwrap_or_else(|| current.last_name.clone()),
            gender: self.gender.clone().or_else(|| current.gender.clone()),
            updated_at: now,
        }
    }
}

// --- Scales ---

/// A bipolar rating axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scale {
    pub id: String,
    pub left_label: String,
    pub right_label: String,
    pub min: f64,
    pub max: f64,
    pub sort_index: i64,
    pub higher_is_better: bool,
    pub updated_at: i64,
}

impl Scale {
    /// Clamp a raw value into this scale's range.
    pub fn clamp(&self, value: f64) -> f64 {
        clamp(value, self.min, self.max)
    }

    /// Percentage used for aggregate colouring: 100 is always "good".
    pub fn percent(&self, value: f64) -> f64 {
        let pct = compute_percent(value, self.min, self.max);
        if self.higher_is_better || self.min == self.max {
            pct
        } else {
            100.0 - pct
        }
    }
}

/// Scale as supplied by callers or remote payloads; optional fields are
/// defaulted by [`ScaleInput::normalize`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScaleInput {
    pub id: String,
    pub left_label: String,
    pub right_label: String,
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
    #[serde(default)]
    pub sort_index: Option<i64>,
    #[serde(default)]
    pub higher_is_better: Option<bool>,
    #[serde(default)]
    pub updated_at: Option<i64>,
}

impl ScaleInput {
    pub fn new(
        id: impl Into<String>,
        left_label: impl Into<String>,
        right_label: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            left_label: left_label.into(),
            right_label: right_label.into(),
            min: None,
            max: None,
            sort_index: None,
            higher_is_better: None,
            updated_at: None,
        }
    }

    pub fn with_range(mut self, min: f64, max: f64) -> Self {
        self.min = Some(min);
        self.max = Some(max);
        self
    }

    pub fn with_sort_index(mut self, sort_index: i64) -> Self {
        self.sort_index = Some(sort_index);
        self
    }

    pub fn with_higher_is_better(mut self, higher_is_better: bool) -> Self {
        self.higher_is_better = Some(higher_is_better);
        self
    }

    pub fn with_updated_at(mut self, updated_at: i64) -> Self {
        self.updated_at = Some(updated_at);
        self
    }

    /// Apply defaults. `fallback_sort_index` is used when none was supplied.
    pub fn normalize(self, fallback_sort_index: i64, now: i64) -> Scale {
        Scale {
            id: self.id,
            left_label: self.left_label,
            right_label: self.right_label,
            min: self.min.unwrap_or(DEFAULT_SCALE_MIN),
            max: self.max.unwrap_or(DEFAULT_SCALE_MAX),
            sort_index: self.sort_index.unwrap_or(fallback_sort_index),
            higher_is_better: self.higher_is_better.unwrap_or(true),
            updated_at: self.updated_at.unwrap_or(now),
        }
    }

    /// Edit-boundary check; storage itself accepts any range.
    pub fn validate_range(&self) -> Result<()> {
        let min = self.min.unwrap_or(DEFAULT_SCALE_MIN);
        let max = self.max.unwrap_or(DEFAULT_SCALE_MAX);
        if !min.is_finite() || !max.is_finite() {
            return Err(SemdiffError::Validation(format!(
                "Scale '{}' bounds must be finite",
                self.id
            )));
        }
        if min >= max {
            return Err(SemdiffError::Validation(format!(
                "Scale '{}' requires min < max (got {} >= {})",
                self.id, min, max
            )));
        }
        Ok(())
    }
}

impl From<Scale> for ScaleInput {
    fn from(scale: Scale) -> Self {
        Self {
            id: scale.id,
            left_label: scale.left_label,
            right_label: scale.right_label,
            min: Some(scale.min),
            max: Some(scale.max),
            sort_index: Some(scale.sort_index),
            higher_is_better: Some(scale.higher_is_better),
            updated_at: Some(scale.updated_at),
        }
    }
}

// --- Ratings ---

/// One observation of a student on a scale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rating {
    pub id: String,
    pub student_id: i64,
    pub scale_id: String,
    pub value: f64,
    pub recorded_at: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub updated_at: i64,
}

/// Builder for writing a rating event.
#[derive(Debug, Clone, PartialEq)]
pub struct RatingInput {
    pub id: String,
    pub student_id: i64,
    pub scale_id: String,
    pub value: f64,
    pub recorded_at: i64,
    pub updated_at: Option<i64>,
}

impl RatingInput {
    pub fn new(
        id: impl Into<String>,
        student_id: i64,
        scale_id: impl Into<String>,
        value: f64,
        recorded_at: i64,
    ) -> Self {
        Self {
            id: id.into(),
            student_id,
            scale_id: scale_id.into(),
            value,
            recorded_at,
            updated_at: None,
        }
    }

    pub fn with_updated_at(mut self, updated_at: i64) -> Self {
        self.updated_at = Some(updated_at);
        self
    }

    pub fn normalize(self, now: i64) -> Rating {
        Rating {
            id: self.id,
            student_id: self.student_id,
            scale_id: self.scale_id,
            value: self.value,
            recorded_at: self.recorded_at,
            updated_at: self.updated_at.unwrap_or(now),
        }
    }
}

// --- Notes ---

/// Freeform note about a student.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub id: String,
    pub student_id: i64,
    pub text: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: Vec<String>,
    pub recorded_at: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub updated_at: i64,
}

/// Builder for writing a note.
#[derive(Debug, Clone, PartialEq)]
pub struct NoteInput {
    pub id: String,
    pub student_id: i64,
    pub text: String,
    pub tags: Vec<String>,
    pub recorded_at: i64,
    pub updated_at: Option<i64>,
}

impl NoteInput {
    pub fn new(
        id: impl Into<String>,
        student_id: i64,
        text: impl Into<String>,
        recorded_at: i64,
    ) -> Self {
        Self {
            id: id.into(),
            student_id,
            text: text.into(),
            tags: Vec::new(),
            recorded_at,
            updated_at: None,
        }
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    pub fn with_updated_at(mut self, updated_at: i64) -> Self {
        self.updated_at = Some(updated_at);
        self
    }

    pub fn normalize(self, now: i64) -> Note {
        Note {
            id: self.id,
            student_id: self.student_id,
            text: self.text,
            tags: normalize_tags(&self.tags),
            recorded_at: self.recorded_at,
            updated_at: self.updated_at.unwrap_or(now),
        }
    }
}

/// Trim tags, drop empty ones, and remove duplicates keeping the first
/// occurrence.
pub fn normalize_tags(tags: &[String]) -> Vec<String> {
    let mut normalized: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let trimmed = tag.trim();
        if trimmed.is_empty() || normalized.iter().any(|t| t == trimmed) {
            continue;
        }
        normalized.push(trimmed.to_string());
    }
    normalized
}

// --- Checks ---

/// Definition of a boolean attribute tracked per student.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckDef {
    pub id: String,
    pub label: String,
    pub sort_index: i64,
    pub updated_at: i64,
}

/// Builder for inserting or replacing a check definition.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckInput {
    pub id: String,
    pub label: String,
    pub sort_index: Option<i64>,
    pub updated_at: Option<i64>,
}

impl CheckInput {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            sort_index: None,
            updated_at: None,
        }
    }

    pub fn with_sort_index(mut self, sort_index: i64) -> Self {
        self.sort_index = Some(sort_index);
        self
    }

    pub fn normalize(self, fallback_sort_index: i64, now: i64) -> CheckDef {
        CheckDef {
            id: self.id,
            label: self.label,
            sort_index: self.sort_index.unwrap_or(fallback_sort_index),
            updated_at: self.updated_at.unwrap_or(now),
        }
    }
}

/// Value of one check for one student.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckMark {
    pub id: String,
    pub student_id: i64,
    pub check_id: String,
    pub value: bool,
    pub updated_at: i64,
}

/// Deterministic key of a check mark.
pub fn check_mark_id(student_id: i64, check_id: &str) -> String {
    format!("{}:{}", student_id, check_id)
}

// --- Seating ---

/// Seat assignments of one class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeatingPlan {
    pub class_name: String,
    pub seats: Vec<Option<i64>>,
    pub updated_at: i64,
}

impl SeatingPlan {
    pub fn empty(class_name: impl Into<String>, updated_at: i64) -> Self {
        Self {
            class_name: class_name.into(),
            seats: vec![None; SEAT_COUNT],
            updated_at,
        }
    }

    /// Slot currently holding `student_id`.
    pub fn position_of(&self, student_id: i64) -> Option<usize> {
        self.seats.iter().position(|s| *s == Some(student_id))
    }

    pub fn first_empty(&self) -> Option<usize> {
        self.seats.iter().position(Option::is_none)
    }

    /// Student ids in slot order.
    pub fn occupants(&self) -> impl Iterator<Item = i64> + '_ {
        self.seats.iter().flatten().copied()
    }

    /// Replace every occurrence of `from` with `to`. Returns true if any
    /// slot changed.
    pub fn replace_student(&mut self, from: i64, to: i64) -> bool {
        let mut changed = false;
        for seat in self.seats.iter_mut() {
            if *seat == Some(from) {
                *seat = Some(to);
                changed = true;
            }
        }
        changed
    }

    /// Empty every slot holding `student_id`. Returns true if any slot changed.
    pub fn vacate(&mut self, student_id: i64) -> bool {
        let mut changed = false;
        for seat in self.seats.iter_mut() {
            if *seat == Some(student_id) {
                *seat = None;
                changed = true;
            }
        }
        changed
    }
}

// --- Change log ---

/// Entity kinds that take part in sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeEntity {
    Students,
    Scales,
    Ratings,
    Notes,
}

impl ChangeEntity {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeEntity::Students => "students",
            ChangeEntity::Scales => "scales",
            ChangeEntity::Ratings => "ratings",
            ChangeEntity::Notes => "notes",
        }
    }
}

impl fmt::Display for ChangeEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChangeEntity {
    type Err = SemdiffError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "students" => Ok(ChangeEntity::Students),
            "scales" => Ok(ChangeEntity::Scales),
            "ratings" => Ok(ChangeEntity::Ratings),
            "notes" => Ok(ChangeEntity::Notes),
            other => Err(SemdiffError::Validation(format!(
                "Unknown change entity: {}",
                other
            ))),
        }
    }
}

/// Full snapshot of a locally written record.
#[derive(Debug, Clone, PartialEq)]
pub enum ChangeRecord {
    Student(Student),
    Scale(Scale),
    Rating(Rating),
    Note(Note),
}

impl ChangeRecord {
    pub fn entity(&self) -> ChangeEntity {
        match self {
            ChangeRecord::Student(_) => ChangeEntity::Students,
            ChangeRecord::Scale(_) => ChangeEntity::Scales,
            ChangeRecord::Rating(_) => ChangeEntity::Ratings,
            ChangeRecord::Note(_) => ChangeEntity::Notes,
        }
    }

    pub fn updated_at(&self) -> i64 {
        match self {
            ChangeRecord::Student(s) => s.updated_at,
            ChangeRecord::Scale(s) => s.updated_at,
            ChangeRecord::Rating(r) => r.updated_at,
            ChangeRecord::Note(n) => n.updated_at,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        let json = match self {
            ChangeRecord::Student(s) => serde_json::to_string(s)?,
            ChangeRecord::Scale(s) => serde_json::to_string(s)?,
            ChangeRecord::Rating(r) => serde_json::to_string(r)?,
            ChangeRecord::Note(n) => serde_json::to_string(n)?,
        };
        Ok(json)
    }

    /// Decode a stored snapshot; the entity tag selects the record type.
    pub fn from_json(entity: ChangeEntity, data: &str) -> Result<Self> {
        let record = match entity {
            ChangeEntity::Students => ChangeRecord::Student(serde_json::from_str(data)?),
            ChangeEntity::Scales => ChangeRecord::Scale(serde_json::from_str(data)?),
            ChangeEntity::Ratings => ChangeRecord::Rating(serde_json::from_str(data)?),
            ChangeEntity::Notes => ChangeRecord::Note(serde_json::from_str(data)?),
        };
        Ok(record)
    }
}

/// One queued change awaiting upload.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeRow {
    pub id: i64,
    pub record: ChangeRecord,
    pub updated_at: i64,
}

impl ChangeRow {
    pub fn entity(&self) -> ChangeEntity {
        self.record.entity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scale_input_defaults() {
        let scale = ScaleInput::new("participation", "Low", "High").normalize(4, 1000);
        assert_eq!(scale.min, -3.0);
        assert_eq!(scale.max, 3.0);
        assert_eq!(scale.sort_index, 4);
        assert!(scale.higher_is_better);
        assert_eq!(scale.updated_at, 1000);
    }

    #[test]
    fn test_scale_range_validation() {
        assert!(ScaleInput::new("a", "l", "r").validate_range().is_ok());
        assert!(ScaleInput::new("a", "l", "r")
            .with_range(2.0, 2.0)
            .validate_range()
            .is_err());
        assert!(ScaleInput::new("a", "l", "r")
            .with_range(3.0, -3.0)
            .validate_range()
            .is_err());
    }

    #[test]
    fn test_scale_percent_inverts_when_lower_is_better() {
        let scale = ScaleInput::new("noise", "Quiet", "Loud")
            .with_higher_is_better(false)
            .normalize(0, 0);
        assert_eq!(scale.percent(3.0), 0.0);
        assert_eq!(scale.percent(-3.0), 100.0);
    }

    #[test]
    fn test_normalize_tags_preserves_order() {
        let tags = vec![
            " math ".to_string(),
            "".to_string(),
            "reading".to_string(),
            "math".to_string(),
        ];
        assert_eq!(normalize_tags(&tags), vec!["math", "reading"]);
    }

    #[test]
    fn test_student_update_keeps_unset_fields() {
        let current = Student {
            id: 3,
            class_name: "1A".into(),
            number: 7,
            first_name: "Jane".into(),
            last_name: "Doe".into(),
            gender: Some("F".into()),
            updated_at: 10,
        };
        let updated = StudentUpdate::new(3).new_id(9).last_name("Roe").apply_to(&current, 99);
        assert_eq!(updated.id, 9);
        assert_eq!(updated.class_name, "1A");
        assert_eq!(updated.last_name, "Roe");
        assert_eq!(updated.gender.as_deref(), Some("F"));
        assert_eq!(updated.updated_at, 99);
    }

    #[test]
    fn test_seating_plan_helpers() {
        let mut plan = SeatingPlan::empty("X", 0);
        plan.seats[0] = Some(1);
        plan.seats[5] = Some(2);
        assert_eq!(plan.first_empty(), Some(1));
        assert!(plan.replace_student(2, 8));
        assert_eq!(plan.position_of(8), Some(5));
        assert!(plan.vacate(1));
        assert_eq!(plan.occupants().collect::<Vec<_>>(), vec![8]);
    }

    #[test]
    fn test_note_accepts_null_tags() {
        let note: Note = serde_json::from_str(
            r#"{"id":"n1","student_id":1,"text":"hi","tags":null,"recorded_at":5,"updated_at":null}"#,
        )
        .unwrap();
        assert!(note.tags.is_empty());
        assert_eq!(note.updated_at, 0);
    }

    #[test]
    fn test_change_record_json_round_trip_keeps_entity() {
        let rating = Rating {
            id: "r1".into(),
            student_id: 1,
            scale_id: "participation".into(),
            value: 2.0,
            recorded_at: 10,
            updated_at: 11,
        };
        let record = ChangeRecord::Rating(rating.clone());
        let json = record.to_json().unwrap();
        let decoded = ChangeRecord::from_json(ChangeEntity::Ratings, &json).unwrap();
        assert_eq!(decoded, ChangeRecord::Rating(rating));
        assert!(ChangeRecord::from_json(ChangeEntity::Students, &json).is_err());
    }
}
