//! Row mapping between SQLite tables and storage types.

use rusqlite::Row;

use crate::error::{Result, SemdiffError};
use crate::storage::types::{
    ChangeEntity, ChangeRecord, ChangeRow, CheckDef, CheckMark, Note, Rating, Scale, SeatingPlan,
    Student, DEFAULT_SCALE_MAX, DEFAULT_SCALE_MIN, SEAT_COUNT,
};

pub(super) const STUDENT_COLUMNS: &str =
    "id, class_name, number, first_name, last_name, gender, updated_at";
pub(super) const SCALE_COLUMNS: &str =
    "id, left_label, right_label, min, max, sort_index, higher_is_better, updated_at";
pub(super) const RATING_COLUMNS: &str = "id, student_id, scale_id, value, recorded_at, updated_at";
pub(super) const NOTE_COLUMNS: &str = "id, student_id, text, tags_json, recorded_at, updated_at";
pub(super) const CHECK_COLUMNS: &str = "id, label, sort_index, updated_at";
pub(super) const CHECK_MARK_COLUMNS: &str = "id, student_id, check_id, value, updated_at";

pub(super) fn student_from_row(row: &Row<'_>) -> rusqlite::Result<Student> {
    Ok(Student {
        id: row.get(0)?,
        class_name: row.get(1)?,
        number: row.get(2)?,
        first_name: row.get(3)?,
        last_name: row.get(4)?,
        gender: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

/// Rows written before v2/v3 may lack bounds; they are defaulted here.
pub(super) fn scale_from_row(row: &Row<'_>) -> rusqlite::Result<Scale> {
    let min: Option<f64> = row.get(3)?;
    let max: Option<f64> = row.get(4)?;
    let sort_index: Option<i64> = row.get(5)?;
    let higher_is_better: Option<bool> = row.get(6)?;
    Ok(Scale {
        id: row.get(0)?,
        left_label: row.get(1)?,
        right_label: row.get(2)?,
        min: min.unwrap_or(DEFAULT_SCALE_MIN),
        max: max.unwrap_or(DEFAULT_SCALE_MAX),
        sort_index: sort_index.unwrap_or(0),
        higher_is_better: higher_is_better.unwrap_or(true),
        updated_at: row.get(7)?,
    })
}

pub(super) fn rating_from_row(row: &Row<'_>) -> rusqlite::Result<Rating> {
    Ok(Rating {
        id: row.get(0)?,
        student_id: row.get(1)?,
        scale_id: row.get(2)?,
        value: row.get(3)?,
        recorded_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

pub(super) fn check_from_row(row: &Row<'_>) -> rusqlite::Result<CheckDef> {
    let sort_index: Option<i64> = row.get(2)?;
    Ok(CheckDef {
        id: row.get(0)?,
        label: row.get(1)?,
        sort_index: sort_index.unwrap_or(0),
        updated_at: row.get(3)?,
    })
}

pub(super) fn check_mark_from_row(row: &Row<'_>) -> rusqlite::Result<CheckMark> {
    Ok(CheckMark {
        id: row.get(0)?,
        student_id: row.get(1)?,
        check_id: row.get(2)?,
        value: row.get(3)?,
        updated_at: row.get(4)?,
    })
}

/// Raw row data from the notes table, before tag decoding.
#[derive(Debug)]
pub(super) struct NoteRow {
    pub id: String,
    pub student_id: i64,
    pub text: String,
    pub tags_json: Option<String>,
    pub recorded_at: i64,
    pub updated_at: i64,
}

impl NoteRow {
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            student_id: row.get(1)?,
            text: row.get(2)?,
            tags_json: row.get(3)?,
            recorded_at: row.get(4)?,
            updated_at: row.get(5)?,
        })
    }
}

impl TryFrom<NoteRow> for Note {
    type Error = SemdiffError;

    fn try_from(row: NoteRow) -> Result<Self> {
        let tags: Vec<String> = match row.tags_json {
            Some(ref value) => serde_json::from_str(value)
                .map_err(|e| SemdiffError::Storage(format!("Invalid tags JSON: {}", e)))?,
            None => Vec::new(),
        };
        Ok(Note {
            id: row.id,
            student_id: row.student_id,
            text: row.text,
            tags,
            recorded_at: row.recorded_at,
            updated_at: row.updated_at,
        })
    }
}

/// Raw row data from the seating table.
#[derive(Debug)]
pub(super) struct SeatingRow {
    pub class_name: String,
    pub seats_json: String,
    pub updated_at: i64,
}

impl SeatingRow {
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            class_name: row.get(0)?,
            seats_json: row.get(1)?,
            updated_at: row.get(2)?,
        })
    }
}

impl TryFrom<SeatingRow> for SeatingPlan {
    type Error = SemdiffError;

    fn try_from(row: SeatingRow) -> Result<Self> {
        let seats: Vec<Option<i64>> = serde_json::from_str(&row.seats_json)
            .map_err(|e| SemdiffError::Storage(format!("Invalid seats JSON: {}", e)))?;
        if seats.len() != SEAT_COUNT {
            return Err(SemdiffError::Storage(format!(
                "Seating plan for '{}' has {} slots, expected {}",
                row.class_name,
                seats.len(),
                SEAT_COUNT
            )));
        }
        Ok(SeatingPlan {
            class_name: row.class_name,
            seats,
            updated_at: row.updated_at,
        })
    }
}

/// Raw row data from the changes table.
#[derive(Debug)]
pub(super) struct ChangeRowRaw {
    pub id: i64,
    pub entity: String,
    pub data: String,
    pub updated_at: i64,
}

impl ChangeRowRaw {
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            entity: row.get(1)?,
            data: row.get(2)?,
            updated_at: row.get(3)?,
        })
    }
}

impl TryFrom<ChangeRowRaw> for ChangeRow {
    type Error = SemdiffError;

    fn try_from(row: ChangeRowRaw) -> Result<Self> {
        let entity: ChangeEntity = row.entity.parse()?;
        let record = ChangeRecord::from_json(entity, &row.data).map_err(|e| {
            SemdiffError::Storage(format!("Invalid change {} snapshot: {}", row.id, e))
        })?;
        Ok(ChangeRow {
            id: row.id,
            record,
            updated_at: row.updated_at,
        })
    }
}
