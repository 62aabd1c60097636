//! Application state over the repository.
//!
//! `AppStore` keeps read-through caches of repository reads, derives values
//! from them (current ratings, filters, recent students) and forwards writes
//! to the repository, queueing a snapshot in the change log after each
//! successful write. The repository stays authoritative: every cache can be
//! refreshed with the matching `load_*` call.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;
use uuid::Uuid;

use crate::error::{Result, SemdiffError};
use crate::now_ms;
use crate::percent::clamp;
use crate::storage::traits::{ChangeLog, StorageEngine};
use crate::storage::types::{
    ChangeRecord, CheckDef, NewStudent, Note, NoteInput, Rating, RatingInput, Scale, ScaleInput,
    Student, StudentUpdate, DEFAULT_SCALE_MAX, DEFAULT_SCALE_MIN,
};
use crate::sync::status::SyncStatus;

/// Maximum length of the recent-students list.
pub const MAX_RECENT_STUDENTS: usize = 8;

/// How the student filter query is matched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FilterMode {
    /// Haystack starts with the query.
    #[default]
    Prefix,
    /// Query characters appear in the haystack in order.
    Fuzzy,
}

fn is_subsequence(query: &str, target: &str) -> bool {
    let mut wanted = query.chars().peekable();
    for c in target.chars() {
        match wanted.peek() {
            Some(q) if *q == c => {
                wanted.next();
            }
            Some(_) => {}
            None => break,
        }
    }
    wanted.peek().is_none()
}

fn haystack(student: &Student) -> String {
    format!(
        "{} {} {} {}",
        student.last_name, student.first_name, student.class_name, student.number
    )
    .to_lowercase()
}

/// Explicit application state; one per open database.
pub struct AppStore<S: StorageEngine + ChangeLog> {
    storage: Arc<S>,
    status: Arc<SyncStatus>,

    students: Vec<Student>,
    scales: Vec<Scale>,
    checks: Vec<CheckDef>,
    ratings_by_student: HashMap<i64, Vec<Rating>>,
    notes_by_student: HashMap<i64, Vec<Note>>,
    check_marks_by_student: HashMap<i64, HashMap<String, bool>>,

    filter_query: String,
    filter_mode: FilterMode,
    active_student: Option<i64>,
    recent_students: Vec<i64>,
}

impl<S: StorageEngine + ChangeLog> AppStore<S> {
    pub fn new(storage: Arc<S>) -> Self {
        Self::with_status(storage, Arc::new(SyncStatus::default()))
    }

    /// Share a status object so writes show up as in-flight work.
    pub fn with_status(storage: Arc<S>, status: Arc<SyncStatus>) -> Self {
        Self {
            storage,
            status,
            students: Vec::new(),
            scales: Vec::new(),
            checks: Vec::new(),
            ratings_by_student: HashMap::new(),
            notes_by_student: HashMap::new(),
            check_marks_by_student: HashMap::new(),
            filter_query: String::new(),
            filter_mode: FilterMode::default(),
            active_student: None,
            recent_students: Vec::new(),
        }
    }

    pub fn storage(&self) -> &Arc<S> {
        &self.storage
    }

    pub fn status(&self) -> &Arc<SyncStatus> {
        &self.status
    }

    // --- Loaders ---

    pub fn load_students(&mut self) -> Result<()> {
        self.students = self.storage.list_students()?;
        Ok(())
    }

    pub fn load_scales(&mut self) -> Result<()> {
        self.scales = self.storage.list_scales()?;
        Ok(())
    }

    pub fn load_checks(&mut self) -> Result<()> {
        self.checks = self.storage.list_checks()?;
        Ok(())
    }

    pub fn load_ratings_for_student(&mut self, student_id: i64) -> Result<()> {
        let ratings = self.storage.list_ratings_by_student(student_id)?;
        self.ratings_by_student.insert(student_id, ratings);
        Ok(())
    }

    /// Notes are cached newest first.
    pub fn load_notes_for_student(&mut self, student_id: i64) -> Result<()> {
        let mut notes = self.storage.list_notes_by_student(student_id)?;
        notes.reverse();
        self.notes_by_student.insert(student_id, notes);
        Ok(())
    }

    pub fn load_check_marks_for_student(&mut self, student_id: i64) -> Result<()> {
        let marks = self.storage.check_marks_for_student(student_id)?;
        self.check_marks_by_student.insert(student_id, marks);
        Ok(())
    }

    // --- Cached views ---

    pub fn students(&self) -> &[Student] {
        &self.students
    }

    pub fn scales(&self) -> &[Scale] {
        &self.scales
    }

    pub fn checks(&self) -> &[CheckDef] {
        &self.checks
    }

    pub fn ratings_for(&self, student_id: i64) -> &[Rating] {
        self.ratings_by_student
            .get(&student_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn notes_for(&self, student_id: i64) -> &[Note] {
        self.notes_by_student
            .get(&student_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn check_marks_for(&self, student_id: i64) -> Option<&HashMap<String, bool>> {
        self.check_marks_by_student.get(&student_id)
    }

    // --- Filtering ---

    /// Set the filter query; `mode` keeps the current mode when `None`.
    pub fn set_student_filter(&mut self, query: impl Into<String>, mode: Option<FilterMode>) {
        self.filter_query = query.into();
        if let Some(mode) = mode {
            self.filter_mode = mode;
        }
    }

    /// Cached students matching the filter over "last first class number".
    pub fn filtered_students(&self) -> Vec<&Student> {
        let query = self.filter_query.trim().to_lowercase();
        if query.is_empty() {
            return self.students.iter().collect();
        }
        self.students
            .iter()
            .filter(|s| {
                let hay = haystack(s);
                match self.filter_mode {
                    FilterMode::Prefix => hay.starts_with(&query),
                    FilterMode::Fuzzy => is_subsequence(&query, &hay),
                }
            })
            .collect()
    }

    pub fn set_active_student(&mut self, student_id: Option<i64>) {
        self.active_student = student_id;
    }

    pub fn active_student(&self) -> Option<i64> {
        self.active_student
    }

    // --- Recent students ---

    /// Move `student_id` to the front of the recent list (max 8, unique).
    pub fn add_recent_student(&mut self, student_id: i64) {
        self.recent_students.retain(|id| *id != student_id);
        self.recent_students.insert(0, student_id);
        self.recent_students.truncate(MAX_RECENT_STUDENTS);
    }

    pub fn recent_student_ids(&self) -> &[i64] {
        &self.recent_students
    }

    /// Recent students that are present in the student cache.
    pub fn recent_students(&self) -> Vec<&Student> {
        self.recent_students
            .iter()
            .filter_map(|id| self.students.iter().find(|s| s.id == *id))
            .collect()
    }

    // --- Ratings ---

    /// Current value from the rating cache; `None` if not loaded or unrated.
    ///
    /// Ties resolve the same way as `StorageEngine::current_rating`.
    pub fn rating_value(&self, student_id: i64, scale_id: &str) -> Option<f64> {
        self.ratings_for(student_id)
            .iter()
            .filter(|r| r.scale_id == scale_id)
            .max_by(|a, b| {
                (a.recorded_at, a.updated_at, &a.id).cmp(&(b.recorded_at, b.updated_at, &b.id))
            })
            .map(|r| r.value)
    }

    /// Record a new rating event clamped to the scale's range.
    ///
    /// # Returns
    ///
    /// Returns the value actually stored.
    pub fn set_rating(&mut self, student_id: i64, scale_id: &str, value: f64) -> Result<f64> {
        let status = Arc::clone(&self.status);
        let _saving = status.begin();

        let (min, max) = match self.storage.get_scale(scale_id)? {
            Some(scale) => (scale.min, scale.max),
            None => (DEFAULT_SCALE_MIN, DEFAULT_SCALE_MAX),
        };
        let clamped = clamp(value, min, max);
        let ts = now_ms();
        let input = RatingInput::new(Uuid::now_v7().to_string(), student_id, scale_id, clamped, ts)
            .with_updated_at(ts);
        let rating = input.clone().normalize(ts);
        self.storage.upsert_rating(&input)?;

        let list = self.ratings_by_student.entry(student_id).or_default();
        list.push(rating.clone());
        list.sort_by(|a, b| {
            (a.recorded_at, a.updated_at, &a.id).cmp(&(b.recorded_at, b.updated_at, &b.id))
        });

        self.storage
            .enqueue_change(&ChangeRecord::Rating(rating))?;
        Ok(clamped)
    }

    /// Apply `delta` to the cached current value (0 when unrated).
    pub fn adjust_rating(&mut self, student_id: i64, scale_id: &str, delta: f64) -> Result<f64> {
        let current = self.rating_value(student_id, scale_id).unwrap_or(0.0);
        self.set_rating(student_id, scale_id, current + delta)
    }

    /// Mean percentage of the class's current values on a scale.
    ///
    /// Percentages follow [`Scale::percent`], so 100 is always the good end.
    /// Returns `None` when the scale is unknown or nobody is rated.
    pub fn class_average_percent(&self, class_name: &str, scale_id: &str) -> Result<Option<f64>> {
        let Some(scale) = self.storage.get_scale(scale_id)? else {
            return Ok(None);
        };
        let mut total = 0.0;
        let mut count = 0usize;
        for student in self.storage.list_students_in_class(class_name)? {
            if let Some(rating) = self.storage.current_rating(student.id, scale_id)? {
                total += scale.percent(rating.value);
                count += 1;
            }
        }
        if count == 0 {
            return Ok(None);
        }
        Ok(Some(total / count as f64))
    }

    // --- Notes ---

    pub fn add_note(&mut self, student_id: i64, text: &str, tags: Vec<String>) -> Result<Note> {
        let status = Arc::clone(&self.status);
        let _saving = status.begin();

        let ts = now_ms();
        let input = NoteInput::new(Uuid::now_v7().to_string(), student_id, text, ts)
            .with_tags(tags)
            .with_updated_at(ts);
        let note = input.clone().normalize(ts);
        self.storage.upsert_note(&input)?;

        let list = self.notes_by_student.entry(student_id).or_default();
        list.insert(0, note.clone());
        list.sort_by(|a, b| b.recorded_at.cmp(&a.recorded_at));

        self.storage.enqueue_change(&ChangeRecord::Note(note.clone()))?;
        Ok(note)
    }

    // --- Scales ---

    /// Validate and write a scale, then queue its stored snapshot.
    pub fn upsert_scale(&mut self, input: &ScaleInput) -> Result<Scale> {
        input.validate_range()?;
        self.storage.upsert_scale(input)?;
        self.load_scales()?;

        let scale = self
            .scales
            .iter()
            .find(|s| s.id == input.id)
            .cloned()
            .ok_or_else(|| SemdiffError::NotFound(format!("Scale '{}'", input.id)))?;
        self.storage
            .enqueue_change(&ChangeRecord::Scale(scale.clone()))?;
        Ok(scale)
    }

    pub fn delete_scale(&mut self, id: &str) -> Result<()> {
        self.storage.delete_scale(id)?;
        self.load_scales()
    }

    /// Reorder scales and queue every scale's new snapshot.
    pub fn reorder_scales(&mut self, ids: &[String]) -> Result<()> {
        self.scales = self.storage.update_scales_order(ids)?;
        for scale in &self.scales {
            self.storage
                .enqueue_change(&ChangeRecord::Scale(scale.clone()))?;
        }
        Ok(())
    }

    // --- Checks ---

    pub fn set_check_mark(&mut self, student_id: i64, check_id: &str, value: bool) -> Result<()> {
        self.storage.set_check_mark(student_id, check_id, value)?;
        self.check_marks_by_student
            .entry(student_id)
            .or_default()
            .insert(check_id.to_string(), value);
        Ok(())
    }

    // --- Student administration ---

    pub fn add_student(&mut self, student: &NewStudent) -> Result<i64> {
        let id = self.storage.add_student(student)?;
        self.enqueue_student(id)?;
        self.load_students()?;
        Ok(id)
    }

    /// Update name, number, gender or class. Changing the id is rejected;
    /// use [`AppStore::update_student_identity`].
    pub fn update_student(&mut self, update: &StudentUpdate) -> Result<()> {
        if update.new_id.is_some_and(|new_id| new_id != update.id) {
            return Err(SemdiffError::Validation(
                "Changing a student id requires an identity update".to_string(),
            ));
        }
        self.storage.update_student_cascade(update)?;
        self.enqueue_student(update.id)?;
        self.load_students()
    }

    /// Cascade update that may change the student's id.
    ///
    /// # Returns
    ///
    /// Returns the final id.
    pub fn update_student_identity(&mut self, update: &StudentUpdate) -> Result<i64> {
        let new_id = self.storage.update_student_cascade(update)?;
        if new_id != update.id {
            self.move_cached_student(update.id, new_id);
        }
        self.enqueue_student(new_id)?;
        self.load_students()?;
        Ok(new_id)
    }

    pub fn delete_student(&mut self, student_id: i64) -> Result<()> {
        self.storage.delete_student(student_id)?;
        self.forget_student(student_id);
        self.load_students()
    }

    pub fn delete_class(&mut self, class_name: &str) -> Result<usize> {
        let removed = self.storage.delete_class_cascade(class_name)?;
        self.ratings_by_student.clear();
        self.notes_by_student.clear();
        self.check_marks_by_student.clear();
        self.load_students()?;
        let students = &self.students;
        self.recent_students
            .retain(|id| students.iter().any(|s| s.id == *id));
        if self
            .active_student
            .is_some_and(|id| !students.iter().any(|s| s.id == id))
        {
            self.active_student = None;
        }
        Ok(removed)
    }

    fn enqueue_student(&self, student_id: i64) -> Result<()> {
        let student = self
            .storage
            .get_student(student_id)?
            .ok_or_else(|| SemdiffError::NotFound(format!("Student {}", student_id)))?;
        self.storage.enqueue_change(&ChangeRecord::Student(student))?;
        Ok(())
    }

    fn forget_student(&mut self, student_id: i64) {
        self.ratings_by_student.remove(&student_id);
        self.notes_by_student.remove(&student_id);
        self.check_marks_by_student.remove(&student_id);
        self.recent_students.retain(|id| *id != student_id);
        if self.active_student == Some(student_id) {
            self.active_student = None;
        }
    }

    fn move_cached_student(&mut self, from: i64, to: i64) {
        debug!(from, to, "re-keying cached student");
        self.ratings_by_student.remove(&from);
        self.notes_by_student.remove(&from);
        self.check_marks_by_student.remove(&from);
        for id in self.recent_students.iter_mut() {
            if *id == from {
                *id = to;
            }
        }
        if self.active_student == Some(from) {
            self.active_student = Some(to);
        }
    }
}
