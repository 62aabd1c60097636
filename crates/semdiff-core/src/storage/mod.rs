//! Storage layer: entity types, repository traits and the SQLite backend.

pub mod sqlite;
pub mod traits;
pub mod types;

pub use sqlite::SqliteStorage;
pub use traits::{ChangeLog, StorageEngine};
pub use types::{
    check_mark_id, normalize_tags, settings_keys, ChangeEntity, ChangeRecord, ChangeRow, CheckDef,
    CheckInput, CheckMark, NewStudent, Note, NoteInput, Rating, RatingInput, Scale, ScaleInput,
    SeatingPlan, Student, StudentUpdate, DEFAULT_API_BASE, DEFAULT_SCALE_MAX, DEFAULT_SCALE_MIN,
    SEAT_COUNT,
};
