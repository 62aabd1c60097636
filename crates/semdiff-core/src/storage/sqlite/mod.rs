//! SQLite storage backend.
//!
//! One connection behind a mutex. Every multi-table operation runs inside a
//! single SQLite transaction so readers never observe half a cascade.

mod change_log;
mod merge;
pub mod migrations;
mod row;

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

use crate::error::{Result, SemdiffError};
use crate::now_ms;
use crate::storage::traits::StorageEngine;
use crate::storage::types::{
    check_mark_id, CheckDef, CheckInput, CheckMark, NewStudent, Note, NoteInput, Rating,
    RatingInput, Scale, ScaleInput, SeatingPlan, Student, StudentUpdate, SEAT_COUNT,
};

use row::{
    check_from_row, check_mark_from_row, rating_from_row, scale_from_row, student_from_row,
    NoteRow, SeatingRow, CHECK_COLUMNS, CHECK_MARK_COLUMNS, NOTE_COLUMNS, RATING_COLUMNS,
    SCALE_COLUMNS, STUDENT_COLUMNS,
};

const STUDENT_ORDER: &str =
    "ORDER BY last_name COLLATE NOCASE, first_name COLLATE NOCASE, id";

/// SQLite-backed repository and change log.
pub struct SqliteStorage {
    path: Option<PathBuf>,
    conn: Mutex<Connection>,
}

impl SqliteStorage {
    /// Open (or create) a database file and migrate it to the latest schema.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(Duration::from_secs(5))?;
        Self::from_connection(conn, Some(path.to_path_buf()))
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn, None)
    }

    fn from_connection(mut conn: Connection, path: Option<PathBuf>) -> Result<Self> {
        let version = migrations::migrate(&mut conn)?;
        debug!(version, path = ?path, "database opened");
        Ok(Self {
            path,
            conn: Mutex::new(conn),
        })
    }

    /// Backing file, or `None` for in-memory databases.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn schema_version(&self) -> Result<i64> {
        let conn = self.lock_conn()?;
        migrations::schema_version(&conn)
    }

    /// Lock the database connection, returning an error if the mutex is poisoned.
    fn lock_conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| SemdiffError::Storage("SQLite connection poisoned".to_string()))
    }
}

// --- Connection-level helpers shared by the trait impls ---

fn fetch_student(conn: &Connection, id: i64) -> Result<Option<Student>> {
    let sql = format!("SELECT {} FROM students WHERE id = ?1", STUDENT_COLUMNS);
    Ok(conn.query_row(&sql, [id], student_from_row).optional()?)
}

fn query_students(conn: &Connection, class_name: Option<&str>) -> Result<Vec<Student>> {
    let students = match class_name {
        Some(class_name) => {
            let sql = format!(
                "SELECT {} FROM students WHERE class_name = ?1 {}",
                STUDENT_COLUMNS, STUDENT_ORDER
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map([class_name], student_from_row)?;
            rows.collect::<std::result::Result<Vec<_>, _>>()?
        }
        None => {
            let sql = format!("SELECT {} FROM students {}", STUDENT_COLUMNS, STUDENT_ORDER);
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map([], student_from_row)?;
            rows.collect::<std::result::Result<Vec<_>, _>>()?
        }
    };
    Ok(students)
}

fn write_student(conn: &Connection, student: &Student) -> Result<()> {
    conn.execute(
        r#"
        INSERT INTO students (id, class_name, number, first_name, last_name, gender, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        ON CONFLICT(id) DO UPDATE SET
            class_name = excluded.class_name,
            number = excluded.number,
            first_name = excluded.first_name,
            last_name = excluded.last_name,
            gender = excluded.gender,
            updated_at = excluded.updated_at
        "#,
        params![
            student.id,
            student.class_name,
            student.number,
            student.first_name,
            student.last_name,
            student.gender,
            student.updated_at
        ],
    )?;
    Ok(())
}

/// Insert a student without an id and return the assigned one.
fn insert_new_student(conn: &Connection, student: &NewStudent, updated_at: i64) -> Result<i64> {
    conn.execute(
        r#"
        INSERT INTO students (class_name, number, first_name, last_name, gender, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        "#,
        params![
            student.class_name,
            student.number,
            student.first_name,
            student.last_name,
            student.gender,
            updated_at
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

fn student_from_new(student: &NewStudent, id: i64, now: i64) -> Student {
    Student {
        id,
        class_name: student.class_name.clone(),
        number: student.number,
        first_name: student.first_name.clone(),
        last_name: student.last_name.clone(),
        gender: student.gender.clone(),
        updated_at: student.updated_at.unwrap_or(now),
    }
}

fn fetch_scale(conn: &Connection, id: &str) -> Result<Option<Scale>> {
    let sql = format!("SELECT {} FROM scales WHERE id = ?1", SCALE_COLUMNS);
    Ok(conn.query_row(&sql, [id], scale_from_row).optional()?)
}

fn query_scales(conn: &Connection) -> Result<Vec<Scale>> {
    let sql = format!("SELECT {} FROM scales ORDER BY sort_index, id", SCALE_COLUMNS);
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], scale_from_row)?;
    Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
}

fn write_scale(conn: &Connection, scale: &Scale) -> Result<()> {
    conn.execute(
        r#"
        INSERT INTO scales (id, left_label, right_label, min, max, sort_index, higher_is_better, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        ON CONFLICT(id) DO UPDATE SET
            left_label = excluded.left_label,
            right_label = excluded.right_label,
            min = excluded.min,
            max = excluded.max,
            sort_index = excluded.sort_index,
            higher_is_better = excluded.higher_is_better,
            updated_at = excluded.updated_at
        "#,
        params![
            scale.id,
            scale.left_label,
            scale.right_label,
            scale.min,
            scale.max,
            scale.sort_index,
            scale.higher_is_better,
            scale.updated_at
        ],
    )?;
    Ok(())
}

/// `max(sort_index) + 1`, or 0 for an empty table. `table` is a fixed name.
fn next_sort_index(conn: &Connection, table: &str) -> Result<i64> {
    let sql = format!("SELECT COALESCE(MAX(sort_index) + 1, 0) FROM {}", table);
    Ok(conn.query_row(&sql, [], |row| row.get(0))?)
}

/// Sort index a scale takes when written: explicit, existing, or appended.
fn resolve_scale_sort_index(conn: &Connection, input: &ScaleInput) -> Result<i64> {
    if let Some(index) = input.sort_index {
        return Ok(index);
    }
    match fetch_scale(conn, &input.id)? {
        Some(existing) => Ok(existing.sort_index),
        None => next_sort_index(conn, "scales"),
    }
}

/// Total reordering of a `(id, sort_index, updated_at)` table.
///
/// Listed known ids take 0..k-1, the rest follow in their prior order.
/// Only rows whose index changes are written.
fn reorder_table(conn: &Connection, table: &str, ids: &[String], now: i64) -> Result<usize> {
    let current: Vec<(String, i64)> = {
        let sql = format!(
            "SELECT id, COALESCE(sort_index, 0) FROM {} ORDER BY sort_index, id",
            table
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
        rows.collect::<std::result::Result<Vec<_>, _>>()?
    };

    let known: HashSet<&str> = current.iter().map(|(id, _)| id.as_str()).collect();
    let mut seen: HashSet<&str> = HashSet::new();
    let mut order: Vec<&str> = Vec::with_capacity(current.len());
    for id in ids {
        if known.contains(id.as_str()) && seen.insert(id.as_str()) {
            order.push(id.as_str());
        }
    }
    for (id, _) in &current {
        if seen.insert(id.as_str()) {
            order.push(id.as_str());
        }
    }

    let previous: HashMap<&str, i64> = current
        .iter()
        .map(|(id, index)| (id.as_str(), *index))
        .collect();
    let sql = format!(
        "UPDATE {} SET sort_index = ?1, updated_at = ?2 WHERE id = ?3",
        table
    );
    let mut changed = 0;
    for (index, id) in order.iter().enumerate() {
        let index = index as i64;
        if previous.get(id).copied() != Some(index) {
            conn.execute(&sql, params![index, now, id])?;
            changed += 1;
        }
    }
    Ok(changed)
}

fn write_rating(conn: &Connection, rating: &Rating) -> Result<()> {
    conn.execute(
        r#"
        INSERT INTO ratings (id, student_id, scale_id, value, recorded_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        ON CONFLICT(id) DO UPDATE SET
            student_id = excluded.student_id,
            scale_id = excluded.scale_id,
            value = excluded.value,
            recorded_at = excluded.recorded_at,
            updated_at = excluded.updated_at
        "#,
        params![
            rating.id,
            rating.student_id,
            rating.scale_id,
            rating.value,
            rating.recorded_at,
            rating.updated_at
        ],
    )?;
    Ok(())
}

fn fetch_rating(conn: &Connection, id: &str) -> Result<Option<Rating>> {
    let sql = format!("SELECT {} FROM ratings WHERE id = ?1", RATING_COLUMNS);
    Ok(conn.query_row(&sql, [id], rating_from_row).optional()?)
}

fn write_note(conn: &Connection, note: &Note) -> Result<()> {
    let tags_json = serde_json::to_string(&note.tags)?;
    conn.execute(
        r#"
        INSERT INTO notes (id, student_id, text, tags_json, recorded_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        ON CONFLICT(id) DO UPDATE SET
            student_id = excluded.student_id,
            text = excluded.text,
            tags_json = excluded.tags_json,
            recorded_at = excluded.recorded_at,
            updated_at = excluded.updated_at
        "#,
        params![
            note.id,
            note.student_id,
            note.text,
            tags_json,
            note.recorded_at,
            note.updated_at
        ],
    )?;
    Ok(())
}

fn fetch_note(conn: &Connection, id: &str) -> Result<Option<Note>> {
    let sql = format!("SELECT {} FROM notes WHERE id = ?1", NOTE_COLUMNS);
    let row = conn.query_row(&sql, [id], NoteRow::from_row).optional()?;
    row.map(Note::try_from).transpose()
}

fn fetch_check(conn: &Connection, id: &str) -> Result<Option<CheckDef>> {
    let sql = format!("SELECT {} FROM checks WHERE id = ?1", CHECK_COLUMNS);
    Ok(conn.query_row(&sql, [id], check_from_row).optional()?)
}

fn query_checks(conn: &Connection) -> Result<Vec<CheckDef>> {
    let sql = format!("SELECT {} FROM checks ORDER BY sort_index, id", CHECK_COLUMNS);
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], check_from_row)?;
    Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
}

fn fetch_seating(conn: &Connection, class_name: &str) -> Result<Option<SeatingPlan>> {
    let row = conn
        .query_row(
            "SELECT class_name, seats_json, updated_at FROM seating WHERE class_name = ?1",
            [class_name],
            SeatingRow::from_row,
        )
        .optional()?;
    row.map(SeatingPlan::try_from).transpose()
}

fn query_seating(conn: &Connection) -> Result<Vec<SeatingPlan>> {
    let mut stmt = conn.prepare("SELECT class_name, seats_json, updated_at FROM seating")?;
    let rows = stmt
        .query_map([], SeatingRow::from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    rows.into_iter().map(SeatingPlan::try_from).collect()
}

fn write_seating(conn: &Connection, plan: &SeatingPlan) -> Result<()> {
    let seats_json = serde_json::to_string(&plan.seats)?;
    conn.execute(
        r#"
        INSERT INTO seating (class_name, seats_json, updated_at)
        VALUES (?1, ?2, ?3)
        ON CONFLICT(class_name) DO UPDATE SET
            seats_json = excluded.seats_json,
            updated_at = excluded.updated_at
        "#,
        params![plan.class_name, seats_json, plan.updated_at],
    )?;
    Ok(())
}

/// Default plan: students by last name (stable on id) in the first slots.
fn synthesize_seating(conn: &Connection, class_name: &str, now: i64) -> Result<SeatingPlan> {
    let sql = format!(
        "SELECT {} FROM students WHERE class_name = ?1 ORDER BY last_name COLLATE NOCASE, id",
        STUDENT_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let students = stmt
        .query_map([class_name], student_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut plan = SeatingPlan::empty(class_name, now);
    for (slot, student) in plan.seats.iter_mut().zip(students.iter()) {
        *slot = Some(student.id);
    }
    Ok(plan)
}

fn ensure_seating(conn: &Connection, class_name: &str, now: i64) -> Result<SeatingPlan> {
    if let Some(plan) = fetch_seating(conn, class_name)? {
        return Ok(plan);
    }
    let plan = synthesize_seating(conn, class_name, now)?;
    write_seating(conn, &plan)?;
    debug!(class = class_name, seated = plan.occupants().count(), "seating synthesized");
    Ok(plan)
}

/// Empty every slot holding `student_id`, in all plans.
fn vacate_everywhere(conn: &Connection, student_id: i64, now: i64) -> Result<()> {
    for mut plan in query_seating(conn)? {
        if plan.vacate(student_id) {
            plan.updated_at = now;
            write_seating(conn, &plan)?;
        }
    }
    Ok(())
}

fn delete_student_dependents(conn: &Connection, student_id: i64) -> Result<()> {
    conn.execute("DELETE FROM ratings WHERE student_id = ?1", [student_id])?;
    conn.execute("DELETE FROM notes WHERE student_id = ?1", [student_id])?;
    conn.execute("DELETE FROM check_marks WHERE student_id = ?1", [student_id])?;
    Ok(())
}

fn fetch_setting(conn: &Connection, key: &str) -> Result<Option<String>> {
    Ok(conn
        .query_row("SELECT value FROM settings WHERE key = ?1", [key], |row| {
            row.get(0)
        })
        .optional()?)
}

fn validate_slot(slot: usize) -> Result<()> {
    if slot >= SEAT_COUNT {
        return Err(SemdiffError::Validation(format!(
            "Seat {} is out of range (0..{})",
            slot, SEAT_COUNT
        )));
    }
    Ok(())
}

impl StorageEngine for SqliteStorage {
    fn add_student(&self, student: &NewStudent) -> Result<i64> {
        let mut conn = self.lock_conn()?;
        let tx = conn.transaction()?;
        let now = now_ms();

        let id = match student.id {
            Some(id) => {
                if fetch_student(&tx, id)?.is_some() {
                    return Err(SemdiffError::Conflict(format!(
                        "Student {} already exists",
                        id
                    )));
                }
                write_student(&tx, &student_from_new(student, id, now))?;
                id
            }
            None => insert_new_student(&tx, student, student.updated_at.unwrap_or(now))?,
        };

        tx.commit()?;
        Ok(id)
    }

    fn upsert_student(&self, student: &NewStudent) -> Result<i64> {
        let conn = self.lock_conn()?;
        let now = now_ms();
        match student.id {
            Some(id) => {
                write_student(&conn, &student_from_new(student, id, now))?;
                Ok(id)
            }
            None => insert_new_student(&conn, student, student.updated_at.unwrap_or(now)),
        }
    }

    fn get_student(&self, id: i64) -> Result<Option<Student>> {
        let conn = self.lock_conn()?;
        fetch_student(&conn, id)
    }

    fn list_students(&self) -> Result<Vec<Student>> {
        let conn = self.lock_conn()?;
        query_students(&conn, None)
    }

    fn list_students_in_class(&self, class_name: &str) -> Result<Vec<Student>> {
        let conn = self.lock_conn()?;
        query_students(&conn, Some(class_name))
    }

    fn list_classes(&self) -> Result<Vec<String>> {
        let conn = self.lock_conn()?;
        let mut stmt =
            conn.prepare("SELECT DISTINCT class_name FROM students ORDER BY class_name")?;
        let rows = stmt.query_map([], |row| row.get(0))?;
        Ok(rows.collect::<std::result::Result<Vec<String>, _>>()?)
    }

    fn delete_student(&self, id: i64) -> Result<()> {
        let mut conn = self.lock_conn()?;
        let tx = conn.transaction()?;
        let now = now_ms();

        delete_student_dependents(&tx, id)?;
        vacate_everywhere(&tx, id, now)?;
        let removed = tx.execute("DELETE FROM students WHERE id = ?1", [id])?;

        tx.commit()?;
        debug!(student = id, removed, "student deleted");
        Ok(())
    }

    fn update_student_cascade(&self, update: &StudentUpdate) -> Result<i64> {
        let mut conn = self.lock_conn()?;
        let tx = conn.transaction()?;
        let now = now_ms();

        let current = fetch_student(&tx, update.id)?
            .ok_or_else(|| SemdiffError::NotFound(format!("Student {}", update.id)))?;
        let target = update.apply_to(&current, now);
        let old_id = current.id;
        let new_id = target.id;

        if new_id != old_id {
            if fetch_student(&tx, new_id)?.is_some() {
                return Err(SemdiffError::Conflict(format!(
                    "Student {} already exists",
                    new_id
                )));
            }

            tx.execute(
                "UPDATE ratings SET student_id = ?1 WHERE student_id = ?2",
                params![new_id, old_id],
            )?;
            tx.execute(
                "UPDATE notes SET student_id = ?1 WHERE student_id = ?2",
                params![new_id, old_id],
            )?;
            tx.execute("DELETE FROM check_marks WHERE student_id = ?1", [new_id])?;
            tx.execute(
                r#"
                UPDATE check_marks
                SET student_id = ?1, id = CAST(?1 AS TEXT) || ':' || check_id, updated_at = ?3
                WHERE student_id = ?2
                "#,
                params![new_id, old_id, now],
            )?;

            for mut plan in query_seating(&tx)? {
                if plan.replace_student(old_id, new_id) {
                    plan.updated_at = now;
                    write_seating(&tx, &plan)?;
                }
            }

            tx.execute("DELETE FROM students WHERE id = ?1", [old_id])?;
        }
        write_student(&tx, &target)?;

        if target.class_name != current.class_name {
            if let Some(mut old_plan) = fetch_seating(&tx, &current.class_name)? {
                if old_plan.vacate(new_id) {
                    old_plan.updated_at = now;
                    write_seating(&tx, &old_plan)?;
                }
            }

            let mut new_plan = ensure_seating(&tx, &target.class_name, now)?;
            if new_plan.position_of(new_id).is_none() {
                match new_plan.first_empty() {
                    Some(slot) => {
                        new_plan.seats[slot] = Some(new_id);
                        new_plan.updated_at = now;
                        write_seating(&tx, &new_plan)?;
                    }
                    None => debug!(
                        student = new_id,
                        class = %target.class_name,
                        "no free seat in target class"
                    ),
                }
            }
        }

        tx.commit()?;
        debug!(from = old_id, to = new_id, "student cascade update");
        Ok(new_id)
    }

    fn delete_class_cascade(&self, class_name: &str) -> Result<usize> {
        let mut conn = self.lock_conn()?;
        let tx = conn.transaction()?;

        for table in ["ratings", "notes", "check_marks"] {
            let sql = format!(
                "DELETE FROM {} WHERE student_id IN (SELECT id FROM students WHERE class_name = ?1)",
                table
            );
            tx.execute(&sql, [class_name])?;
        }
        let removed = tx.execute("DELETE FROM students WHERE class_name = ?1", [class_name])?;
        tx.execute("DELETE FROM seating WHERE class_name = ?1", [class_name])?;

        tx.commit()?;
        debug!(class = class_name, removed, "class deleted");
        Ok(removed)
    }

    fn upsert_scale(&self, scale: &ScaleInput) -> Result<String> {
        let mut conn = self.lock_conn()?;
        let tx = conn.transaction()?;

        let sort_index = resolve_scale_sort_index(&tx, scale)?;
        let normalized = scale.clone().normalize(sort_index, now_ms());
        write_scale(&tx, &normalized)?;

        tx.commit()?;
        Ok(normalized.id)
    }

    fn get_scale(&self, id: &str) -> Result<Option<Scale>> {
        let conn = self.lock_conn()?;
        fetch_scale(&conn, id)
    }

    fn list_scales(&self) -> Result<Vec<Scale>> {
        let conn = self.lock_conn()?;
        query_scales(&conn)
    }

    fn delete_scale(&self, id: &str) -> Result<()> {
        let conn = self.lock_conn()?;
        conn.execute("DELETE FROM scales WHERE id = ?1", [id])?;
        Ok(())
    }

    fn update_scales_order(&self, ids: &[String]) -> Result<Vec<Scale>> {
        let mut conn = self.lock_conn()?;
        let tx = conn.transaction()?;

        let changed = reorder_table(&tx, "scales", ids, now_ms())?;
        let scales = query_scales(&tx)?;

        tx.commit()?;
        debug!(changed, "scales reordered");
        Ok(scales)
    }

    fn upsert_rating(&self, rating: &RatingInput) -> Result<String> {
        if !rating.value.is_finite() {
            return Err(SemdiffError::Validation(format!(
                "Rating value must be finite (got {})",
                rating.value
            )));
        }
        let conn = self.lock_conn()?;
        let normalized = rating.clone().normalize(now_ms());
        write_rating(&conn, &normalized)?;
        Ok(normalized.id)
    }

    fn get_rating(&self, id: &str) -> Result<Option<Rating>> {
        let conn = self.lock_conn()?;
        fetch_rating(&conn, id)
    }

    fn list_ratings_by_student(&self, student_id: i64) -> Result<Vec<Rating>> {
        let conn = self.lock_conn()?;
        let sql = format!(
            "SELECT {} FROM ratings WHERE student_id = ?1 ORDER BY recorded_at, updated_at, id",
            RATING_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map([student_id], rating_from_row)?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    fn list_ratings_by_scale(&self, scale_id: &str) -> Result<Vec<Rating>> {
        let conn = self.lock_conn()?;
        let sql = format!(
            "SELECT {} FROM ratings WHERE scale_id = ?1 ORDER BY recorded_at, updated_at, id",
            RATING_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map([scale_id], rating_from_row)?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    fn delete_rating(&self, id: &str) -> Result<()> {
        let conn = self.lock_conn()?;
        conn.execute("DELETE FROM ratings WHERE id = ?1", [id])?;
        Ok(())
    }

    fn current_rating(&self, student_id: i64, scale_id: &str) -> Result<Option<Rating>> {
        let conn = self.lock_conn()?;
        let sql = format!(
            r#"
            SELECT {} FROM ratings
            WHERE student_id = ?1 AND scale_id = ?2
            ORDER BY recorded_at DESC, updated_at DESC, id DESC
            LIMIT 1
            "#,
            RATING_COLUMNS
        );
        Ok(conn
            .query_row(&sql, params![student_id, scale_id], rating_from_row)
            .optional()?)
    }

    fn current_ratings(&self, student_id: i64) -> Result<HashMap<String, Rating>> {
        // Ascending order: the last rating seen per scale is the current one.
        let ratings = self.list_ratings_by_student(student_id)?;
        let mut current = HashMap::new();
        for rating in ratings {
            current.insert(rating.scale_id.clone(), rating);
        }
        Ok(current)
    }

    fn upsert_note(&self, note: &NoteInput) -> Result<String> {
        let conn = self.lock_conn()?;
        let normalized = note.clone().normalize(now_ms());
        write_note(&conn, &normalized)?;
        Ok(normalized.id)
    }

    fn get_note(&self, id: &str) -> Result<Option<Note>> {
        let conn = self.lock_conn()?;
        fetch_note(&conn, id)
    }

    fn list_notes_by_student(&self, student_id: i64) -> Result<Vec<Note>> {
        let conn = self.lock_conn()?;
        let sql = format!(
            "SELECT {} FROM notes WHERE student_id = ?1 ORDER BY recorded_at, id",
            NOTE_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map([student_id], NoteRow::from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        rows.into_iter().map(Note::try_from).collect()
    }

    fn delete_note(&self, id: &str) -> Result<()> {
        let conn = self.lock_conn()?;
        conn.execute("DELETE FROM notes WHERE id = ?1", [id])?;
        Ok(())
    }

    fn upsert_check(&self, check: &CheckInput) -> Result<String> {
        let mut conn = self.lock_conn()?;
        let tx = conn.transaction()?;

        let sort_index = match check.sort_index {
            Some(index) => index,
            None => match fetch_check(&tx, &check.id)? {
                Some(existing) => existing.sort_index,
                None => next_sort_index(&tx, "checks")?,
            },
        };
        let normalized = check.clone().normalize(sort_index, now_ms());
        tx.execute(
            r#"
            INSERT INTO checks (id, label, sort_index, updated_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(id) DO UPDATE SET
                label = excluded.label,
                sort_index = excluded.sort_index,
                updated_at = excluded.updated_at
            "#,
            params![
                normalized.id,
                normalized.label,
                normalized.sort_index,
                normalized.updated_at
            ],
        )?;

        tx.commit()?;
        Ok(normalized.id)
    }

    fn get_check(&self, id: &str) -> Result<Option<CheckDef>> {
        let conn = self.lock_conn()?;
        fetch_check(&conn, id)
    }

    fn list_checks(&self) -> Result<Vec<CheckDef>> {
        let conn = self.lock_conn()?;
        query_checks(&conn)
    }

    fn delete_check(&self, id: &str) -> Result<()> {
        let mut conn = self.lock_conn()?;
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM check_marks WHERE check_id = ?1", [id])?;
        tx.execute("DELETE FROM checks WHERE id = ?1", [id])?;
        tx.commit()?;
        Ok(())
    }

    fn update_checks_order(&self, ids: &[String]) -> Result<Vec<CheckDef>> {
        let mut conn = self.lock_conn()?;
        let tx = conn.transaction()?;

        reorder_table(&tx, "checks", ids, now_ms())?;
        let checks = query_checks(&tx)?;

        tx.commit()?;
        Ok(checks)
    }

    fn set_check_mark(&self, student_id: i64, check_id: &str, value: bool) -> Result<CheckMark> {
        let conn = self.lock_conn()?;
        if fetch_student(&conn, student_id)?.is_none() {
            return Err(SemdiffError::NotFound(format!("Student {}", student_id)));
        }
        if fetch_check(&conn, check_id)?.is_none() {
            return Err(SemdiffError::NotFound(format!("Check '{}'", check_id)));
        }

        let mark = CheckMark {
            id: check_mark_id(student_id, check_id),
            student_id,
            check_id: check_id.to_string(),
            value,
            updated_at: now_ms(),
        };
        conn.execute(
            r#"
            INSERT INTO check_marks (id, student_id, check_id, value, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(id) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
            params![
                mark.id,
                mark.student_id,
                mark.check_id,
                mark.value,
                mark.updated_at
            ],
        )?;
        Ok(mark)
    }

    fn check_marks_for_student(&self, student_id: i64) -> Result<HashMap<String, bool>> {
        let conn = self.lock_conn()?;
        let sql = format!(
            "SELECT {} FROM check_marks WHERE student_id = ?1",
            CHECK_MARK_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let marks = stmt
            .query_map([student_id], check_mark_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(marks.into_iter().map(|m| (m.check_id, m.value)).collect())
    }

    fn get_seating_plan(&self, class_name: &str) -> Result<Option<SeatingPlan>> {
        let conn = self.lock_conn()?;
        fetch_seating(&conn, class_name)
    }

    fn ensure_seating_for_class(&self, class_name: &str) -> Result<SeatingPlan> {
        let mut conn = self.lock_conn()?;
        let tx = conn.transaction()?;
        let plan = ensure_seating(&tx, class_name, now_ms())?;
        tx.commit()?;
        Ok(plan)
    }

    fn upsert_seating_plan(&self, plan: &SeatingPlan) -> Result<()> {
        if plan.seats.len() != SEAT_COUNT {
            return Err(SemdiffError::Validation(format!(
                "Seating plan must have {} slots (got {})",
                SEAT_COUNT,
                plan.seats.len()
            )));
        }

        let mut conn = self.lock_conn()?;
        let tx = conn.transaction()?;

        let mut seated = HashSet::new();
        for student_id in plan.occupants() {
            if !seated.insert(student_id) {
                return Err(SemdiffError::Validation(format!(
                    "Student {} is seated more than once",
                    student_id
                )));
            }
            match fetch_student(&tx, student_id)? {
                Some(student) if student.class_name == plan.class_name => {}
                Some(student) => {
                    return Err(SemdiffError::Validation(format!(
                        "Student {} belongs to class '{}', not '{}'",
                        student_id, student.class_name, plan.class_name
                    )))
                }
                None => {
                    return Err(SemdiffError::Validation(format!(
                        "Student {} does not exist",
                        student_id
                    )))
                }
            }
        }

        let stamped = SeatingPlan {
            updated_at: now_ms(),
            ..plan.clone()
        };
        write_seating(&tx, &stamped)?;
        tx.commit()?;
        Ok(())
    }

    fn swap_seats(&self, class_name: &str, a: usize, b: usize) -> Result<SeatingPlan> {
        validate_slot(a)?;
        validate_slot(b)?;

        let mut conn = self.lock_conn()?;
        let tx = conn.transaction()?;
        let now = now_ms();

        let mut plan = ensure_seating(&tx, class_name, now)?;
        plan.seats.swap(a, b);
        plan.updated_at = now;
        write_seating(&tx, &plan)?;

        tx.commit()?;
        Ok(plan)
    }

    fn get_setting(&self, key: &str) -> Result<Option<String>> {
        let conn = self.lock_conn()?;
        fetch_setting(&conn, key)
    }

    fn set_setting(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.lock_conn()?;
        conn.execute(
            r#"
            INSERT INTO settings (key, value) VALUES (?1, ?2)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value
            "#,
            params![key, value],
        )?;
        Ok(())
    }

    fn delete_setting(&self, key: &str) -> Result<()> {
        let conn = self.lock_conn()?;
        conn.execute("DELETE FROM settings WHERE key = ?1", [key])?;
        Ok(())
    }
}
