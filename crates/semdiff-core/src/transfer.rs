//! CSV export and import of students and latest ratings.
//!
//! Imports write straight to the repository and do not enter the change
//! log.

use csv::{ReaderBuilder, StringRecord, Writer};
use tracing::debug;
use uuid::Uuid;

use crate::error::{Result, SemdiffError};
use crate::storage::traits::StorageEngine;
use crate::storage::types::{NewStudent, RatingInput};

pub const STUDENTS_HEADER: [&str; 5] = ["class_name", "year", "number", "first_name", "last_name"];
pub const RATINGS_HEADER: [&str; 5] = [
    "student_number",
    "class_name",
    "scale_id",
    "value",
    "recorded_at",
];

/// What to do when an imported student matches an existing (class, number).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DuplicateStrategy {
    /// Overwrite the existing student's names.
    #[default]
    Merge,
    /// Leave the existing student untouched.
    Skip,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StudentImportReport {
    pub inserted: usize,
    pub merged: usize,
    pub skipped: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RatingImportReport {
    pub inserted: usize,
    pub skipped: usize,
}

fn finish(writer: Writer<Vec<u8>>) -> Result<String> {
    let bytes = writer
        .into_inner()
        .map_err(|e| SemdiffError::Storage(format!("CSV flush failed: {}", e)))?;
    String::from_utf8(bytes)
        .map_err(|e| SemdiffError::Storage(format!("CSV output is not UTF-8: {}", e)))
}

/// Every student, one row each; `year` is always empty.
pub fn export_students_csv<S: StorageEngine + ?Sized>(storage: &S) -> Result<String> {
    let mut writer = Writer::from_writer(Vec::new());
    writer.write_record(STUDENTS_HEADER)?;
    for student in storage.list_students()? {
        let number = student.number.to_string();
        writer.write_record([
            student.class_name.as_str(),
            "",
            number.as_str(),
            student.first_name.as_str(),
            student.last_name.as_str(),
        ])?;
    }
    finish(writer)
}

/// One row per (student, scale) holding that pair's current value.
pub fn export_ratings_csv<S: StorageEngine + ?Sized>(storage: &S) -> Result<String> {
    let students = storage.list_students()?;
    let scales = storage.list_scales()?;

    let mut writer = Writer::from_writer(Vec::new());
    writer.write_record(RATINGS_HEADER)?;
    for student in &students {
        let current = storage.current_ratings(student.id)?;
        for scale in &scales {
            if let Some(rating) = current.get(&scale.id) {
                writer.write_record([
                    student.number.to_string(),
                    student.class_name.clone(),
                    scale.id.clone(),
                    rating.value.to_string(),
                    rating.recorded_at.to_string(),
                ])?;
            }
        }
    }
    finish(writer)
}

/// Column positions resolved from a header row.
struct Columns {
    header: StringRecord,
    file: &'static str,
}

impl Columns {
    fn new(header: &StringRecord, file: &'static str) -> Self {
        Self {
            header: header.iter().map(str::trim).collect(),
            file,
        }
    }

    fn optional(&self, name: &str) -> Option<usize> {
        self.header.iter().position(|h| h == name)
    }

    fn required(&self, name: &str) -> Result<usize> {
        self.optional(name).ok_or_else(|| {
            SemdiffError::Validation(format!("Invalid {} header: missing '{}'", self.file, name))
        })
    }
}

fn field<'r>(record: &'r StringRecord, index: usize) -> &'r str {
    record.get(index).unwrap_or("").trim()
}

fn parse_number<T: std::str::FromStr>(
    record: &StringRecord,
    index: usize,
    name: &str,
    line: usize,
) -> Result<T> {
    let raw = field(record, index);
    raw.parse::<T>().map_err(|_| {
        SemdiffError::Validation(format!("Line {}: invalid {} '{}'", line, name, raw))
    })
}

fn csv_reader(text: &str) -> csv::Reader<&[u8]> {
    ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes())
}

/// Import students, matching existing ones on (class, number).
///
/// # Errors
///
/// Returns `SemdiffError::Validation` if a required column is missing or a
/// number does not parse.
pub fn import_students_csv<S: StorageEngine + ?Sized>(
    storage: &S,
    text: &str,
    strategy: DuplicateStrategy,
) -> Result<StudentImportReport> {
    let mut report = StudentImportReport::default();
    if text.trim().is_empty() {
        return Ok(report);
    }

    let mut reader = csv_reader(text);
    let columns = Columns::new(reader.headers()?, "students.csv");
    let i_class = columns.required("class_name")?;
    let i_number = columns.required("number")?;
    let i_first = columns.required("first_name")?;
    let i_last = columns.required("last_name")?;

    for (index, record) in reader.records().enumerate() {
        let record = record?;
        let line = index + 2;
        let class_name = field(&record, i_class);
        let number: i64 = parse_number(&record, i_number, "number", line)?;
        let first_name = field(&record, i_first);
        let last_name = field(&record, i_last);

        let existing = storage
            .list_students_in_class(class_name)?
            .into_iter()
            .find(|s| s.number == number);
        match (existing, strategy) {
            (Some(student), DuplicateStrategy::Merge) => {
                let mut merged = NewStudent::from(student);
                merged.first_name = first_name.to_string();
                merged.last_name = last_name.to_string();
                merged.updated_at = None;
                storage.upsert_student(&merged)?;
                report.merged += 1;
            }
            (Some(_), DuplicateStrategy::Skip) => report.skipped += 1,
            (None, _) => {
                storage.add_student(&NewStudent::new(class_name, number, first_name, last_name))?;
                report.inserted += 1;
            }
        }
    }

    debug!(?report, "students imported");
    Ok(report)
}

/// Import rating events.
///
/// Students are resolved by number, and by class when the row (or
/// `default_class`) names one. Rows with an unknown scale or student are
/// skipped. Each imported event has `updated_at = recorded_at`.
pub fn import_ratings_csv<S: StorageEngine + ?Sized>(
    storage: &S,
    text: &str,
    default_class: Option<&str>,
) -> Result<RatingImportReport> {
    let mut report = RatingImportReport::default();
    if text.trim().is_empty() {
        return Ok(report);
    }

    let mut reader = csv_reader(text);
    let columns = Columns::new(reader.headers()?, "ratings.csv");
    let i_number = columns.required("student_number")?;
    let i_scale = columns.required("scale_id")?;
    let i_value = columns.required("value")?;
    let i_recorded = columns.required("recorded_at")?;
    let i_class = columns.optional("class_name");

    let scale_ids: Vec<String> = storage.list_scales()?.into_iter().map(|s| s.id).collect();
    let students = storage.list_students()?;

    for (index, record) in reader.records().enumerate() {
        let record = record?;
        let line = index + 2;
        let number: i64 = parse_number(&record, i_number, "student_number", line)?;
        let scale_id = field(&record, i_scale);
        let value: f64 = parse_number(&record, i_value, "value", line)?;
        let recorded_at: i64 = parse_number(&record, i_recorded, "recorded_at", line)?;
        let class_name = match i_class {
            Some(i) => field(&record, i),
            None => default_class.unwrap_or(""),
        };

        if !scale_ids.iter().any(|id| id == scale_id) {
            report.skipped += 1;
            continue;
        }
        let Some(student) = students
            .iter()
            .find(|s| s.number == number && (class_name.is_empty() || s.class_name == class_name))
        else {
            report.skipped += 1;
            continue;
        };

        let rating = RatingInput::new(
            Uuid::now_v7().to_string(),
            student.id,
            scale_id,
            value,
            recorded_at,
        )
        .with_updated_at(recorded_at);
        storage.upsert_rating(&rating)?;
        report.inserted += 1;
    }

    debug!(?report, "ratings imported");
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::SqliteStorage;

    #[test]
    fn test_export_students_header_and_empty_year() {
        let storage = SqliteStorage::open_in_memory().unwrap();
        storage
            .add_student(&NewStudent::new("X", 1, "Alice", "A"))
            .unwrap();
        let csv = export_students_csv(&storage).unwrap();
        let mut lines = csv.lines();
        assert_eq!(lines.next(), Some("class_name,year,number,first_name,last_name"));
        assert_eq!(lines.next(), Some("X,,1,Alice,A"));
    }

    #[test]
    fn test_import_students_missing_header_is_rejected() {
        let storage = SqliteStorage::open_in_memory().unwrap();
        let err = import_students_csv(&storage, "class_name,number\nX,1\n", DuplicateStrategy::Merge)
            .unwrap_err();
        assert!(matches!(err, SemdiffError::Validation(_)));
    }

    #[test]
    fn test_import_students_skip_strategy() {
        let storage = SqliteStorage::open_in_memory().unwrap();
        storage
            .add_student(&NewStudent::new("X", 1, "Alice", "A"))
            .unwrap();
        let text = "class_name,number,first_name,last_name\nX,1,Alicia,Z\nX,2,Bob,B\n";
        let report = import_students_csv(&storage, text, DuplicateStrategy::Skip).unwrap();
        assert_eq!(
            report,
            StudentImportReport {
                inserted: 1,
                merged: 0,
                skipped: 1
            }
        );
        let alice = &storage.list_students_in_class("X").unwrap()[0];
        assert_eq!(alice.first_name, "Alice");
    }

    #[test]
    fn test_import_ratings_skips_unknown_scale_and_student() {
        let storage = SqliteStorage::open_in_memory().unwrap();
        storage
            .add_student(&NewStudent::new("X", 1, "Alice", "A"))
            .unwrap();
        storage
            .upsert_scale(&crate::storage::types::ScaleInput::new("p", "Low", "High"))
            .unwrap();
        let text = "student_number,scale_id,value,recorded_at\n1,p,2,100\n1,nope,1,100\n9,p,1,100\n";
        let report = import_ratings_csv(&storage, text, Some("X")).unwrap();
        assert_eq!(report, RatingImportReport { inserted: 1, skipped: 2 });
    }
}
