//! End-to-end scenarios from the spec's testable-properties section, driven
//! entirely through `Database`'s public statement surface.

use relbase_core::engine::Database;
use relbase_core::engine::metadata;
use relbase_core::value::Value;

fn fresh_db(dir: &tempfile::TempDir, name: &str) -> Database {
    Database::create(dir.path(), name).unwrap()
}

#[test]
fn scenario_create_insert_select() {
    let tmp = tempfile::tempdir().unwrap();
    let mut db = fresh_db(&tmp, "school");
    db.create_table(
        "classroom",
        vec!["building".into(), "room".into(), "capacity".into()],
        vec!["str".into(), "str".into(), "int".into()],
        Vec::new(),
        None,
    )
    .unwrap();
    db.insert_into("classroom", &["Packard".into(), "101".into(), "500".into()]).unwrap();
    db.insert_into("classroom", &["Watson".into(), "100".into(), "30".into()]).unwrap();

    let rows = db.select("*", "classroom", Some("capacity>40")).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0][0], Value::Str("Packard".into()));
    assert_eq!(rows[0][1], Value::Str("101".into()));
    assert_eq!(rows[0][2], Value::Int(500));
}

#[test]
fn scenario_primary_key_uniqueness() {
    let tmp = tempfile::tempdir().unwrap();
    let mut db = fresh_db(&tmp, "school");
    db.create_table(
        "department",
        vec!["dept_name".into(), "building".into(), "budget".into()],
        vec!["str".into(), "str".into(), "int".into()],
        Vec::new(),
        Some(0),
    )
    .unwrap();
    db.insert_into("department", &["Biology".into(), "Watson".into(), "90000".into()]).unwrap();
    let err = db.insert_into("department", &["Biology".into(), "Watson".into(), "90000".into()]);
    assert!(err.is_err());

    let length_rows = db.select("*", metadata::META_LENGTH, None).unwrap();
    let department_length = length_rows
        .iter()
        .find(|r| r[0] == Value::Str("department".into()))
        .unwrap();
    assert_eq!(department_length[1], Value::Int(1));
}

#[test]
fn scenario_delete_then_reinsert_reuses_slot() {
    let tmp = tempfile::tempdir().unwrap();
    let mut db = fresh_db(&tmp, "school");
    db.create_table(
        "classroom",
        vec!["building".into(), "room".into(), "capacity".into()],
        vec!["str".into(), "str".into(), "int".into()],
        Vec::new(),
        None,
    )
    .unwrap();
    db.insert_into("classroom", &["Packard".into(), "101".into(), "500".into()]).unwrap();
    db.insert_into("classroom", &["Watson".into(), "100".into(), "30".into()]).unwrap();
    db.delete_from("classroom", "room=100").unwrap();

    let stack_rows = db.select("*", metadata::META_INSERT_STACK, None).unwrap();
    let classroom_stack = stack_rows.iter().find(|r| r[0] == Value::Str("classroom".into())).unwrap();
    assert_eq!(classroom_stack[1], Value::List(vec![Value::Int(1)]));

    db.insert_into("classroom", &["Taylor".into(), "3128".into(), "70".into()]).unwrap();
    let rows = db.select("*", "classroom", None).unwrap();
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().any(|r| r[0] == Value::Str("Taylor".into())));
}

#[test]
fn scenario_index_speeds_up_equality_select() {
    let tmp = tempfile::tempdir().unwrap();
    let mut db = fresh_db(&tmp, "school");
    db.create_table(
        "department",
        vec!["dept_name".into(), "building".into()],
        vec!["str".into(), "str".into()],
        Vec::new(),
        Some(0),
    )
    .unwrap();
    db.insert_into("department", &["Biology".into(), "Watson".into()]).unwrap();
    db.insert_into("department", &["Physics".into(), "Wren".into()]).unwrap();
    db.create_index("dept_pk", "department").unwrap();

    let row = db.select_indexed("department", "dept_name=Biology").unwrap();
    assert_eq!(row.unwrap()[1], Value::Str("Watson".into()));
}

#[test]
fn scenario_join_strategy_selector() {
    let tmp = tempfile::tempdir().unwrap();
    let mut db = fresh_db(&tmp, "school");
    db.create_table(
        "instructor",
        vec!["id".into(), "name".into(), "dept_name".into(), "salary".into()],
        vec!["int".into(), "str".into(), "str".into(), "int".into()],
        Vec::new(),
        Some(0),
    )
    .unwrap();
    db.create_table(
        "advisor",
        vec!["s_id".into(), "i_id".into()],
        vec!["int".into(), "int".into()],
        Vec::new(),
        Some(0),
    )
    .unwrap();
    db.insert_into("instructor", &["1".into(), "Alice".into(), "Biology".into(), "90000".into()]).unwrap();
    db.insert_into("instructor", &["2".into(), "Bob".into(), "Physics".into(), "85000".into()]).unwrap();
    db.insert_into("advisor", &["10".into(), "1".into()]).unwrap();
    db.insert_into("advisor", &["11".into(), "2".into()]).unwrap();
    db.create_index("instructor_pk", "instructor").unwrap();

    // instructor.id = advisor.i_id: i_id is not advisor's own primary key
    // (s_id is), only instructor is indexed -> index-nested-loop.
    let (method, rows) = db.join("inner", "instructor", "advisor", "id=i_id").unwrap();
    assert_eq!(method, relbase_core::table::join::JoinMethod::IndexNestedLoop);
    assert_eq!(rows.len(), 2);

    // instructor.id = advisor.s_id: neither side's pk matches s_id's column
    // position consistently as a join key both ways, falls back appropriately.
    db.create_index("advisor_pk", "advisor").unwrap();
    let (method2, rows2) = db.join("inner", "advisor", "instructor", "s_id=id").unwrap();
    // advisor.s_id is advisor's own pk and instructor.id is instructor's own
    // pk -> sort-merge.
    assert_eq!(method2, relbase_core::table::join::JoinMethod::SortMerge);
    assert_eq!(rows2.len(), 0); // no matching keys between s_id and id values
}

#[test]
fn scenario_lock_respects_peer_process() {
    let tmp = tempfile::tempdir().unwrap();
    {
        let mut db = fresh_db(&tmp, "school");
        db.create_table("classroom", vec!["building".into()], vec!["str".into()], Vec::new(), None).unwrap();
        db.lock_table("classroom").unwrap();
    }

    // A fresh Database handle over the same directory observes the lock
    // written by the previous handle and skips the mutation.
    let mut db2 = Database::open(tmp.path(), "school").unwrap();
    db2.insert_into("classroom", &["Packard".into()]).unwrap();
    let rows = db2.select("*", "classroom", None).unwrap();
    assert!(rows.is_empty());
}

#[test]
fn save_database_then_load_database_round_trips() {
    let tmp = tempfile::tempdir().unwrap();
    {
        let mut db = fresh_db(&tmp, "school");
        db.create_table(
            "department",
            vec!["dept_name".into(), "building".into()],
            vec!["str".into(), "str".into()],
            Vec::new(),
            Some(0),
        )
        .unwrap();
        db.insert_into("department", &["Biology".into(), "Watson".into()]).unwrap();
        db.insert_into("department", &["Physics".into(), "Wren".into()]).unwrap();
        db.delete_from("department", "dept_name=Biology").unwrap();
        db.save_database().unwrap();
    }

    let mut reloaded = Database::load_database(tmp.path(), "school").unwrap();
    let rows = reloaded.select("*", "department", None).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0][0], Value::Str("Physics".into()));
}
