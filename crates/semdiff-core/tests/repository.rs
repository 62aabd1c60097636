use semdiff_core::storage::{
    CheckInput, NewStudent, NoteInput, RatingInput, ScaleInput, SeatingPlan, SqliteStorage,
    StorageEngine, StudentUpdate, SEAT_COUNT,
};
use semdiff_core::SemdiffError;

fn storage() -> SqliteStorage {
    SqliteStorage::open_in_memory().expect("in-memory storage should open")
}

fn add(storage: &SqliteStorage, class: &str, number: i64, first: &str, last: &str) -> i64 {
    storage
        .add_student(&NewStudent::new(class, number, first, last))
        .expect("add_student should succeed")
}

fn rate(storage: &SqliteStorage, id: &str, student: i64, scale: &str, value: f64, at: i64) {
    storage
        .upsert_rating(&RatingInput::new(id, student, scale, value, at).with_updated_at(at))
        .expect("upsert_rating should succeed");
}

#[test]
fn test_students_are_listed_by_last_then_first_name() {
    let storage = storage();
    add(&storage, "1A", 1, "Zoé", "martin");
    add(&storage, "1A", 2, "Alice", "Martin");
    add(&storage, "1B", 3, "Paul", "Bernard");

    let names: Vec<String> = storage
        .list_students()
        .expect("list should succeed")
        .iter()
        .map(|s| s.display_name())
        .collect();
    assert_eq!(names, vec!["Paul Bernard", "Alice Martin", "Zoé martin"]);

    assert_eq!(
        storage.list_classes().expect("classes should list"),
        vec!["1A".to_string(), "1B".to_string()]
    );
    assert_eq!(
        storage
            .list_students_in_class("1B")
            .expect("class list should succeed")
            .len(),
        1
    );
}

#[test]
fn test_delete_student_removes_dependents_and_is_idempotent() {
    let storage = storage();
    let alice = add(&storage, "X", 1, "Alice", "A");
    let bob = add(&storage, "X", 2, "Bob", "B");
    storage
        .upsert_scale(&ScaleInput::new("p", "Low", "High"))
        .expect("scale should save");
    storage
        .upsert_check(&CheckInput::new("homework", "Homework"))
        .expect("check should save");

    rate(&storage, "r1", alice, "p", 1.0, 100);
    rate(&storage, "r2", bob, "p", 2.0, 100);
    storage
        .upsert_note(&NoteInput::new("n1", alice, "late", 100))
        .expect("note should save");
    storage
        .set_check_mark(alice, "homework", true)
        .expect("mark should save");
    let plan = storage
        .ensure_seating_for_class("X")
        .expect("seating should be synthesized");
    assert!(plan.position_of(alice).is_some());

    storage.delete_student(alice).expect("delete should succeed");

    assert!(storage.get_student(alice).unwrap().is_none());
    assert!(storage.list_ratings_by_student(alice).unwrap().is_empty());
    assert!(storage.list_notes_by_student(alice).unwrap().is_empty());
    assert!(storage.check_marks_for_student(alice).unwrap().is_empty());
    let plan = storage.get_seating_plan("X").unwrap().unwrap();
    assert_eq!(plan.position_of(alice), None);
    assert!(plan.position_of(bob).is_some());
    assert_eq!(storage.list_ratings_by_student(bob).unwrap().len(), 1);

    // absent id
    storage
        .delete_student(alice)
        .expect("second delete should be a no-op");
}

#[test]
fn test_current_rating_uses_latest_recorded_at() {
    let storage = storage();
    let s = add(&storage, "X", 1, "Alice", "A");
    rate(&storage, "late", s, "p", 2.0, 2000);
    rate(&storage, "early", s, "p", 1.0, 1000);
    rate(&storage, "other", s, "q", -1.0, 500);

    let current = storage
        .current_rating(s, "p")
        .expect("query should succeed")
        .expect("rating should exist");
    assert_eq!(current.value, 2.0);

    let all = storage.current_ratings(s).expect("query should succeed");
    assert_eq!(all.len(), 2);
    assert_eq!(all["p"].id, "late");
    assert_eq!(all["q"].value, -1.0);

    let ordered: Vec<String> = storage
        .list_ratings_by_student(s)
        .unwrap()
        .into_iter()
        .map(|r| r.id)
        .collect();
    assert_eq!(ordered, vec!["other", "early", "late"]);
}

#[test]
fn test_upsert_rating_rejects_non_finite_values() {
    let storage = storage();
    let err = storage
        .upsert_rating(&RatingInput::new("r", 1, "p", f64::NAN, 1))
        .unwrap_err();
    assert!(matches!(err, SemdiffError::Validation(_)));
}

#[test]
fn test_scale_defaults_and_append_order() {
    let storage = storage();
    storage
        .upsert_scale(&ScaleInput::new("b", "l", "r"))
        .unwrap();
    storage
        .upsert_scale(&ScaleInput::new("a", "l", "r").with_range(0.0, 10.0))
        .unwrap();

    let scales = storage.list_scales().unwrap();
    assert_eq!(scales[0].id, "b");
    assert_eq!(scales[0].sort_index, 0);
    assert_eq!((scales[0].min, scales[0].max), (-3.0, 3.0));
    assert!(scales[0].higher_is_better);
    assert_eq!(scales[1].id, "a");
    assert_eq!(scales[1].sort_index, 1);

    // existing scale without an index keeps its position
    storage
        .upsert_scale(&ScaleInput::new("b", "left", "right"))
        .unwrap();
    let b = storage.get_scale("b").unwrap().unwrap();
    assert_eq!(b.sort_index, 0);
    assert_eq!(b.left_label, "left");
}

#[test]
fn test_update_scales_order_total_ordering() {
    let storage = storage();
    for id in ["a", "b", "c", "d"] {
        storage
            .upsert_scale(&ScaleInput::new(id, "l", "r"))
            .unwrap();
    }

    let ids: Vec<String> = ["c", "ghost", "a", "c"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    let ordered = storage
        .update_scales_order(&ids)
        .expect("reorder should succeed");

    let got: Vec<(&str, i64)> = ordered
        .iter()
        .map(|s| (s.id.as_str(), s.sort_index))
        .collect();
    assert_eq!(got, vec![("c", 0), ("a", 1), ("b", 2), ("d", 3)]);

    let listed: Vec<String> = storage
        .list_scales()
        .unwrap()
        .into_iter()
        .map(|s| s.id)
        .collect();
    assert_eq!(listed, vec!["c", "a", "b", "d"]);
}

#[test]
fn test_delete_scale_keeps_rating_history() {
    let storage = storage();
    let s = add(&storage, "X", 1, "Alice", "A");
    storage
        .upsert_scale(&ScaleInput::new("p", "l", "r"))
        .unwrap();
    rate(&storage, "r1", s, "p", 1.0, 10);
    storage.delete_scale("p").unwrap();
    assert!(storage.get_scale("p").unwrap().is_none());
    assert_eq!(storage.list_ratings_by_scale("p").unwrap().len(), 1);
}

#[test]
fn test_rename_cascade_moves_everything() {
    let storage = storage();
    let a = storage
        .add_student(&NewStudent::new("X", 1, "Alice", "A").with_id(1))
        .unwrap();
    storage
        .upsert_check(&CheckInput::new("homework", "Homework"))
        .unwrap();
    rate(&storage, "r1", a, "p", 1.0, 10);
    storage
        .upsert_note(&NoteInput::new("n1", a, "note", 10))
        .unwrap();
    storage.set_check_mark(a, "homework", true).unwrap();
    storage.ensure_seating_for_class("X").unwrap();

    let new_id = storage
        .update_student_cascade(&StudentUpdate::new(1).new_id(42))
        .expect("cascade should succeed");
    assert_eq!(new_id, 42);

    assert!(storage.get_student(1).unwrap().is_none());
    assert_eq!(storage.get_student(42).unwrap().unwrap().first_name, "Alice");
    assert_eq!(storage.get_rating("r1").unwrap().unwrap().student_id, 42);
    assert_eq!(storage.get_note("n1").unwrap().unwrap().student_id, 42);
    assert_eq!(
        storage.check_marks_for_student(42).unwrap().get("homework"),
        Some(&true)
    );
    assert!(storage.check_marks_for_student(1).unwrap().is_empty());
    let plan = storage.get_seating_plan("X").unwrap().unwrap();
    assert_eq!(plan.position_of(42), Some(0));
    assert_eq!(plan.position_of(1), None);
}

#[test]
fn test_rename_collision_is_rejected_without_mutation() {
    let storage = storage();
    storage
        .add_student(&NewStudent::new("X", 1, "Alice", "A").with_id(1))
        .unwrap();
    storage
        .add_student(&NewStudent::new("X", 2, "Bob", "B").with_id(2))
        .unwrap();
    rate(&storage, "r1", 1, "p", 1.0, 10);

    let err = storage
        .update_student_cascade(&StudentUpdate::new(1).new_id(2).first_name("Changed"))
        .unwrap_err();
    assert!(matches!(err, SemdiffError::Conflict(_)));

    assert_eq!(storage.get_student(1).unwrap().unwrap().first_name, "Alice");
    assert_eq!(storage.get_student(2).unwrap().unwrap().first_name, "Bob");
    assert_eq!(storage.get_rating("r1").unwrap().unwrap().student_id, 1);
}

#[test]
fn test_update_missing_student_is_not_found() {
    let storage = storage();
    let err = storage
        .update_student_cascade(&StudentUpdate::new(99).first_name("X"))
        .unwrap_err();
    assert!(matches!(err, SemdiffError::NotFound(_)));
}

#[test]
fn test_class_change_moves_seat() {
    let storage = storage();
    let a = add(&storage, "X", 1, "Alice", "A");
    let b = add(&storage, "Y", 1, "Bob", "B");
    storage.ensure_seating_for_class("X").unwrap();
    storage.ensure_seating_for_class("Y").unwrap();

    storage
        .update_student_cascade(&StudentUpdate::new(a).class_name("Y"))
        .unwrap();

    let x = storage.get_seating_plan("X").unwrap().unwrap();
    let y = storage.get_seating_plan("Y").unwrap().unwrap();
    assert_eq!(x.occupants().count(), 0);
    assert_eq!(y.position_of(b), Some(0));
    assert_eq!(y.position_of(a), Some(1));
    assert_eq!(storage.get_student(a).unwrap().unwrap().class_name, "Y");
}

#[test]
fn test_class_change_synthesizes_missing_plan() {
    let storage = storage();
    let a = add(&storage, "X", 1, "Alice", "A");
    storage
        .update_student_cascade(&StudentUpdate::new(a).class_name("Z"))
        .unwrap();
    let z = storage.get_seating_plan("Z").unwrap().unwrap();
    assert_eq!(z.position_of(a), Some(0));
    assert_eq!(z.occupants().count(), 1);
}

#[test]
fn test_delete_class_cascade() {
    let storage = storage();
    let a = add(&storage, "X", 1, "Alice", "A");
    let b = add(&storage, "X", 2, "Bob", "B");
    let c = add(&storage, "Y", 1, "Carol", "C");
    rate(&storage, "ra", a, "p", 1.0, 1);
    rate(&storage, "rb", b, "p", 1.0, 1);
    rate(&storage, "rc", c, "p", 1.0, 1);
    storage.ensure_seating_for_class("X").unwrap();

    let removed = storage.delete_class_cascade("X").unwrap();
    assert_eq!(removed, 2);
    assert!(storage.list_students_in_class("X").unwrap().is_empty());
    assert!(storage.get_rating("ra").unwrap().is_none());
    assert!(storage.get_rating("rb").unwrap().is_none());
    assert!(storage.get_rating("rc").unwrap().is_some());
    assert!(storage.get_seating_plan("X").unwrap().is_none());
    assert_eq!(storage.list_classes().unwrap(), vec!["Y".to_string()]);
}

#[test]
fn test_note_tags_are_normalized() {
    let storage = storage();
    let tags = vec![
        " math".to_string(),
        "".to_string(),
        "math".to_string(),
        "reading ".to_string(),
    ];
    storage
        .upsert_note(&NoteInput::new("n", 1, "text", 5).with_tags(tags))
        .unwrap();
    let note = storage.get_note("n").unwrap().unwrap();
    assert_eq!(note.tags, vec!["math", "reading"]);
}

#[test]
fn test_seating_synthesis_sorts_by_last_name() {
    let storage = storage();
    let z = add(&storage, "X", 1, "Z", "Zed");
    let a = add(&storage, "X", 2, "A", "Abel");
    let plan = storage.ensure_seating_for_class("X").unwrap();
    assert_eq!(plan.seats.len(), SEAT_COUNT);
    assert_eq!(plan.seats[0], Some(a));
    assert_eq!(plan.seats[1], Some(z));
    assert_eq!(plan.seats[2], None);

    // existing plan is returned unchanged
    add(&storage, "X", 3, "B", "Aaron");
    let again = storage.ensure_seating_for_class("X").unwrap();
    assert_eq!(again.seats, plan.seats);
}

#[test]
fn test_upsert_seating_plan_validation() {
    let storage = storage();
    let a = add(&storage, "X", 1, "Alice", "A");
    let other = add(&storage, "Y", 1, "Bob", "B");

    let short = SeatingPlan {
        class_name: "X".into(),
        seats: vec![None; 10],
        updated_at: 0,
    };
    assert!(matches!(
        storage.upsert_seating_plan(&short),
        Err(SemdiffError::Validation(_))
    ));

    let mut duplicate = SeatingPlan::empty("X", 0);
    duplicate.seats[0] = Some(a);
    duplicate.seats[1] = Some(a);
    assert!(matches!(
        storage.upsert_seating_plan(&duplicate),
        Err(SemdiffError::Validation(_))
    ));

    let mut wrong_class = SeatingPlan::empty("X", 0);
    wrong_class.seats[0] = Some(other);
    assert!(matches!(
        storage.upsert_seating_plan(&wrong_class),
        Err(SemdiffError::Validation(_))
    ));

    let mut missing = SeatingPlan::empty("X", 0);
    missing.seats[0] = Some(999);
    assert!(matches!(
        storage.upsert_seating_plan(&missing),
        Err(SemdiffError::Validation(_))
    ));

    let mut valid = SeatingPlan::empty("X", 0);
    valid.seats[47] = Some(a);
    storage.upsert_seating_plan(&valid).expect("valid plan should save");
    assert_eq!(
        storage.get_seating_plan("X").unwrap().unwrap().position_of(a),
        Some(47)
    );
}

#[test]
fn test_swap_seats() {
    let storage = storage();
    let a = add(&storage, "X", 1, "Alice", "A");
    let b = add(&storage, "X", 2, "Bob", "B");
    let plan = storage.swap_seats("X", 0, 1).expect("swap should succeed");
    assert_eq!(plan.seats[0], Some(b));
    assert_eq!(plan.seats[1], Some(a));

    let plan = storage.swap_seats("X", 1, 10).unwrap();
    assert_eq!(plan.seats[1], None);
    assert_eq!(plan.seats[10], Some(a));
}

#[test]
fn test_checks_and_marks() {
    let storage = storage();
    let s = add(&storage, "X", 1, "Alice", "A");
    storage
        .upsert_check(&CheckInput::new("homework", "Homework"))
        .unwrap();
    storage
        .upsert_check(&CheckInput::new("material", "Material"))
        .unwrap();

    let mark = storage.set_check_mark(s, "homework", true).unwrap();
    assert_eq!(mark.id, format!("{}:homework", s));
    storage.set_check_mark(s, "homework", false).unwrap();
    let marks = storage.check_marks_for_student(s).unwrap();
    assert_eq!(marks.len(), 1);
    assert_eq!(marks.get("homework"), Some(&false));

    assert!(matches!(
        storage.set_check_mark(s, "ghost", true),
        Err(SemdiffError::NotFound(_))
    ));

    let order = storage
        .update_checks_order(&["material".to_string()])
        .unwrap();
    assert_eq!(order[0].id, "material");
    assert_eq!(order[1].id, "homework");

    storage.delete_check("homework").unwrap();
    assert!(storage.check_marks_for_student(s).unwrap().is_empty());
    assert_eq!(storage.list_checks().unwrap().len(), 1);
}
