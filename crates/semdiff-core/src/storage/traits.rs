//! Storage engine trait definitions.
//!
//! `StorageEngine` is the repository: every read and write of the local
//! tables goes through it, and it owns the multi-table invariants (cascades,
//! seat consistency, total scale ordering). `ChangeLog` is the queue of
//! locally authored snapshots waiting to be pushed.

use std::collections::HashMap;

use super::types::{
    ChangeRecord, ChangeRow, CheckDef, CheckInput, CheckMark, NewStudent, Note, NoteInput, Rating,
    RatingInput, Scale, ScaleInput, SeatingPlan, Student, StudentUpdate,
};
use crate::error::Result;

/// Repository interface for the local observation database.
///
/// All implementations must ensure:
/// - Multi-table operations are atomic (all or nothing)
/// - Returned records are fully defaulted
/// - Deleting a student never leaves ratings, notes, marks or seats behind
pub trait StorageEngine: Send + Sync {
    // --- Student operations ---

    /// Insert a new student.
    ///
    /// # Returns
    ///
    /// Returns the student id (auto-assigned when the input has none).
    ///
    /// # Errors
    ///
    /// Returns `SemdiffError::Conflict` if the explicit id already exists.
    fn add_student(&self, student: &NewStudent) -> Result<i64>;

    /// Insert or replace a student by id.
    fn upsert_student(&self, student: &NewStudent) -> Result<i64>;

    /// Get a student by id.
    ///
    /// # Returns
    ///
    /// Returns `Ok(Some(student))` if found, `Ok(None)` if not found.
    fn get_student(&self, id: i64) -> Result<Option<Student>>;

    /// List all students ordered by last name, first name, then id.
    fn list_students(&self) -> Result<Vec<Student>>;

    /// List the students of one class, same ordering as `list_students`.
    fn list_students_in_class(&self, class_name: &str) -> Result<Vec<Student>>;

    /// Distinct class names, sorted.
    fn list_classes(&self) -> Result<Vec<String>>;

    /// Delete a student with its ratings, notes, check marks and seats.
    ///
    /// Deleting an absent id is a no-op.
    fn delete_student(&self, id: i64) -> Result<()>;

    /// Update a student, optionally changing its id and class.
    ///
    /// Dependent records follow the new id, seating plans are rewritten and
    /// a class change moves the student into the new class's plan.
    ///
    /// # Returns
    ///
    /// Returns the final student id.
    ///
    /// # Errors
    ///
    /// - `SemdiffError::NotFound` if the source student does not exist
    /// - `SemdiffError::Conflict` if the new id is held by another student
    fn update_student_cascade(&self, update: &StudentUpdate) -> Result<i64>;

    /// Delete every student of a class with their dependents and the class's
    /// seating plan.
    ///
    /// # Returns
    ///
    /// Returns the number of students deleted.
    fn delete_class_cascade(&self, class_name: &str) -> Result<usize>;

    // --- Scale operations ---

    /// Insert or replace a scale.
    ///
    /// A new scale without a sort index is appended after the current last
    /// one; an existing scale without one keeps its position.
    fn upsert_scale(&self, scale: &ScaleInput) -> Result<String>;

    fn get_scale(&self, id: &str) -> Result<Option<Scale>>;

    /// All scales ordered by sort index, then id.
    fn list_scales(&self) -> Result<Vec<Scale>>;

    /// Delete a scale. Ratings on it are kept as history.
    fn delete_scale(&self, id: &str) -> Result<()>;

    /// Reassign sort indexes so the listed ids come first, in order.
    ///
    /// Unknown ids are ignored and repeated ids use their first position.
    /// Unlisted scales follow in their previous relative order.
    ///
    /// # Returns
    ///
    /// Returns the complete new ordering.
    fn update_scales_order(&self, ids: &[String]) -> Result<Vec<Scale>>;

    // --- Rating operations ---

    /// Insert a rating event, or overwrite the event with the same id.
    ///
    /// # Errors
    ///
    /// Returns `SemdiffError::Validation` for a non-finite value.
    fn upsert_rating(&self, rating: &RatingInput) -> Result<String>;

    fn get_rating(&self, id: &str) -> Result<Option<Rating>>;

    /// Ratings of a student in ascending `recorded_at` order.
    fn list_ratings_by_student(&self, student_id: i64) -> Result<Vec<Rating>>;

    /// Ratings on a scale in ascending `recorded_at` order.
    fn list_ratings_by_scale(&self, scale_id: &str) -> Result<Vec<Rating>>;

    fn delete_rating(&self, id: &str) -> Result<()>;

    /// Latest rating of a student on a scale by `recorded_at`.
    fn current_rating(&self, student_id: i64, scale_id: &str) -> Result<Option<Rating>>;

    /// Latest rating of a student on every scale it was rated on.
    fn current_ratings(&self, student_id: i64) -> Result<HashMap<String, Rating>>;

    // --- Note operations ---

    fn upsert_note(&self, note: &NoteInput) -> Result<String>;
    fn get_note(&self, id: &str) -> Result<Option<Note>>;
    fn list_notes_by_student(&self, student_id: i64) -> Result<Vec<Note>>;
    fn delete_note(&self, id: &str) -> Result<()>;

    // --- Check operations ---

    /// Insert or replace a check definition (same append rule as scales).
    fn upsert_check(&self, check: &CheckInput) -> Result<String>;
    fn get_check(&self, id: &str) -> Result<Option<CheckDef>>;
    fn list_checks(&self) -> Result<Vec<CheckDef>>;

    /// Delete a check definition together with its marks.
    fn delete_check(&self, id: &str) -> Result<()>;

    /// Same ordering contract as `update_scales_order`.
    fn update_checks_order(&self, ids: &[String]) -> Result<Vec<CheckDef>>;

    /// Set the value of one check for one student.
    ///
    /// # Errors
    ///
    /// Returns `SemdiffError::NotFound` if the student or check is missing.
    fn set_check_mark(&self, student_id: i64, check_id: &str, value: bool) -> Result<CheckMark>;

    /// Check values of a student keyed by check id.
    fn check_marks_for_student(&self, student_id: i64) -> Result<HashMap<String, bool>>;

    // --- Seating operations ---

    fn get_seating_plan(&self, class_name: &str) -> Result<Option<SeatingPlan>>;

    /// Return the class's plan, synthesizing and persisting one if absent.
    ///
    /// A synthesized plan seats the class's students sorted by last name in
    /// the first slots.
    fn ensure_seating_for_class(&self, class_name: &str) -> Result<SeatingPlan>;

    /// Store a seating plan after validating it.
    ///
    /// # Errors
    ///
    /// Returns `SemdiffError::Validation` if:
    /// - The plan does not have exactly 48 slots
    /// - A student is seated twice
    /// - A seated student does not exist or belongs to another class
    fn upsert_seating_plan(&self, plan: &SeatingPlan) -> Result<()>;

    /// Swap the contents of two slots of a class's plan.
    fn swap_seats(&self, class_name: &str, a: usize, b: usize) -> Result<SeatingPlan>;

    // --- Settings ---

    fn get_setting(&self, key: &str) -> Result<Option<String>>;
    fn set_setting(&self, key: &str, value: &str) -> Result<()>;
    fn delete_setting(&self, key: &str) -> Result<()>;
}

/// Append-only FIFO of local writes pending upload.
pub trait ChangeLog: Send + Sync {
    /// Append a snapshot.
    ///
    /// # Returns
    ///
    /// Returns the sequential id of the new row.
    fn enqueue_change(&self, record: &ChangeRecord) -> Result<i64>;

    /// All pending rows in insertion order.
    fn pending_changes(&self) -> Result<Vec<ChangeRow>>;

    fn change_count(&self) -> Result<usize>;

    /// Remove every row with `id <= max_id`.
    ///
    /// Rows appended after the pending set was read stay queued.
    fn clear_changes_through(&self, max_id: i64) -> Result<usize>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_traits_are_object_safe() {
        fn _accepts_storage_engine(_engine: &dyn StorageEngine) {}
        fn _accepts_change_log(_log: &dyn ChangeLog) {}
    }
}
