use std::sync::Arc;

use semdiff_core::storage::{
    ChangeEntity, ChangeLog, ChangeRecord, NewStudent, ScaleInput, SqliteStorage, StorageEngine,
    StudentUpdate,
};
use semdiff_core::store::{AppStore, FilterMode, MAX_RECENT_STUDENTS};
use semdiff_core::SemdiffError;

fn setup() -> AppStore<SqliteStorage> {
    let storage = SqliteStorage::open_in_memory().expect("storage should open");
    AppStore::new(Arc::new(storage))
}

fn add(store: &mut AppStore<SqliteStorage>, class: &str, number: i64, first: &str, last: &str) -> i64 {
    store
        .add_student(&NewStudent::new(class, number, first, last))
        .expect("add_student should succeed")
}

#[test]
fn test_set_rating_clamps_and_queues() {
    let mut store = setup();
    let id = add(&mut store, "X", 1, "Alice", "A");
    store
        .upsert_scale(&ScaleInput::new("p", "Low", "High").with_range(0.0, 10.0))
        .expect("upsert_scale should succeed");
    let queued_before = store.storage().change_count().unwrap();

    let stored = store.set_rating(id, "p", 42.0).expect("set_rating should succeed");
    assert_eq!(stored, 10.0);
    assert_eq!(store.rating_value(id, "p"), Some(10.0));

    let current = store.storage().current_rating(id, "p").unwrap().unwrap();
    assert_eq!(current.value, 10.0);
    assert_eq!(current.recorded_at, current.updated_at);

    let pending = store.storage().pending_changes().unwrap();
    assert_eq!(pending.len(), queued_before + 1);
    assert_eq!(pending.last().unwrap().entity(), ChangeEntity::Ratings);
    assert_eq!(store.status().syncing_count(), 0);
}

#[test]
fn test_unknown_scale_uses_default_range() {
    let mut store = setup();
    let id = add(&mut store, "X", 1, "Alice", "A");
    assert_eq!(store.set_rating(id, "ghost", -9.0).unwrap(), -3.0);
}

#[test]
fn test_adjust_rating_starts_from_zero() {
    let mut store = setup();
    let id = add(&mut store, "X", 1, "Alice", "A");
    store.upsert_scale(&ScaleInput::new("p", "Low", "High")).unwrap();

    assert_eq!(store.adjust_rating(id, "p", 1.0).unwrap(), 1.0);
    assert_eq!(store.adjust_rating(id, "p", 1.0).unwrap(), 2.0);
    assert_eq!(store.adjust_rating(id, "p", 5.0).unwrap(), 3.0);
    assert_eq!(store.rating_value(id, "p"), Some(3.0));
    assert_eq!(store.ratings_for(id).len(), 3);
}

#[test]
fn test_back_to_back_ratings_keep_the_last_write() {
    let mut store = setup();
    let id = add(&mut store, "X", 1, "Alice", "A");
    store.upsert_scale(&ScaleInput::new("p", "Low", "High")).unwrap();

    // Tight loop so many pairs land in the same millisecond.
    for _ in 0..200 {
        store.set_rating(id, "p", 0.0).expect("set_rating should succeed");
        let last = store
            .adjust_rating(id, "p", 1.0)
            .expect("adjust_rating should succeed");
        assert_eq!(last, 1.0);

        let current = store.storage().current_rating(id, "p").unwrap().unwrap();
        assert_eq!(current.value, last);
        assert_eq!(store.rating_value(id, "p"), Some(last));
    }

    let history = store.storage().list_ratings_by_student(id).unwrap();
    assert_eq!(history.len(), 400);
    assert_eq!(history.last().unwrap().value, 1.0);
}

#[test]
fn test_add_note_caches_newest_first() {
    let mut store = setup();
    let id = add(&mut store, "X", 1, "Alice", "A");
    let note = store
        .add_note(id, "Helped a classmate", vec![" oral ".into(), "oral".into(), "".into()])
        .expect("add_note should succeed");

    assert_eq!(note.tags, vec!["oral".to_string()]);
    assert_eq!(store.notes_for(id)[0].id, note.id);
    let pending = store.storage().pending_changes().unwrap();
    match &pending.last().unwrap().record {
        ChangeRecord::Note(queued) => assert_eq!(queued.id, note.id),
        other => panic!("unexpected record: {:?}", other),
    }
}

#[test]
fn test_upsert_scale_rejects_inverted_range() {
    let mut store = setup();
    let err = store
        .upsert_scale(&ScaleInput::new("p", "Low", "High").with_range(5.0, 5.0))
        .unwrap_err();
    assert!(matches!(err, SemdiffError::Validation(_)));
    assert!(store.storage().get_scale("p").unwrap().is_none());
    assert_eq!(store.storage().change_count().unwrap(), 0);
}

#[test]
fn test_reorder_scales_queues_every_scale() {
    let mut store = setup();
    for id in ["a", "b", "c"] {
        store.upsert_scale(&ScaleInput::new(id, "l", "r")).unwrap();
    }
    let before = store.storage().change_count().unwrap();

    store
        .reorder_scales(&["c".to_string(), "a".to_string()])
        .expect("reorder should succeed");

    let ids: Vec<&str> = store.scales().iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, vec!["c", "a", "b"]);
    assert_eq!(store.storage().change_count().unwrap(), before + 3);
}

#[test]
fn test_filter_prefix_and_fuzzy() {
    let mut store = setup();
    add(&mut store, "1A", 1, "Jane", "Doe");
    add(&mut store, "1A", 2, "John", "Smith");
    add(&mut store, "2B", 3, "Ada", "Dupont");

    store.set_student_filter("du", None);
    let names: Vec<&str> = store
        .filtered_students()
        .iter()
        .map(|s| s.last_name.as_str())
        .collect();
    assert_eq!(names, vec!["Dupont"]);

    store.set_student_filter("djn", Some(FilterMode::Fuzzy));
    let names: Vec<&str> = store
        .filtered_students()
        .iter()
        .map(|s| s.last_name.as_str())
        .collect();
    assert_eq!(names, vec!["Doe"]);

    store.set_student_filter("", None);
    assert_eq!(store.filtered_students().len(), 3);
}

#[test]
fn test_recent_students_are_unique_and_bounded() {
    let mut store = setup();
    for n in 1..=10 {
        let id = add(&mut store, "X", n, "S", &format!("L{}", n));
        store.add_recent_student(id);
    }
    let first = store.recent_student_ids()[MAX_RECENT_STUDENTS - 1];
    store.add_recent_student(first);

    let recent = store.recent_student_ids();
    assert_eq!(recent.len(), MAX_RECENT_STUDENTS);
    assert_eq!(recent[0], first);
    let mut unique = recent.to_vec();
    unique.sort();
    unique.dedup();
    assert_eq!(unique.len(), MAX_RECENT_STUDENTS);
}

#[test]
fn test_class_average_percent_respects_polarity() {
    let mut store = setup();
    let a = add(&mut store, "X", 1, "A", "A");
    let b = add(&mut store, "X", 2, "B", "B");
    add(&mut store, "X", 3, "C", "C");
    store
        .upsert_scale(&ScaleInput::new("good", "l", "r").with_range(0.0, 10.0))
        .unwrap();
    store
        .upsert_scale(
            &ScaleInput::new("bad", "l", "r")
                .with_range(0.0, 10.0)
                .with_higher_is_better(false),
        )
        .unwrap();

    store.set_rating(a, "good", 10.0).unwrap();
    store.set_rating(b, "good", 0.0).unwrap();
    store.set_rating(a, "bad", 2.0).unwrap();

    assert_eq!(store.class_average_percent("X", "good").unwrap(), Some(50.0));
    assert_eq!(store.class_average_percent("X", "bad").unwrap(), Some(80.0));
    assert_eq!(store.class_average_percent("Y", "good").unwrap(), None);
    assert_eq!(store.class_average_percent("X", "ghost").unwrap(), None);
}

#[test]
fn test_update_student_rejects_id_change() {
    let mut store = setup();
    let id = add(&mut store, "X", 1, "Alice", "A");
    let err = store
        .update_student(&StudentUpdate::new(id).new_id(id + 100))
        .unwrap_err();
    assert!(matches!(err, SemdiffError::Validation(_)));
    assert!(store.storage().get_student(id).unwrap().is_some());

    store
        .update_student(&StudentUpdate::new(id).first_name("Alicia"))
        .expect("update should succeed");
    assert_eq!(store.students()[0].first_name, "Alicia");
}

#[test]
fn test_identity_update_rekeys_recent_and_active() {
    let mut store = setup();
    let id = add(&mut store, "X", 1, "Alice", "A");
    store.add_recent_student(id);
    store.set_active_student(Some(id));

    let new_id = store
        .update_student_identity(&StudentUpdate::new(id).new_id(500))
        .expect("identity update should succeed");

    assert_eq!(new_id, 500);
    assert_eq!(store.recent_student_ids(), &[500]);
    assert_eq!(store.active_student(), Some(500));
    assert_eq!(store.students()[0].id, 500);
}

#[test]
fn test_delete_student_clears_selection() {
    let mut store = setup();
    let id = add(&mut store, "X", 1, "Alice", "A");
    store.add_recent_student(id);
    store.set_active_student(Some(id));

    store.delete_student(id).expect("delete should succeed");

    assert!(store.students().is_empty());
    assert!(store.recent_student_ids().is_empty());
    assert_eq!(store.active_student(), None);
}
