//! Integration tests for the Database
//!
//! These tests verify:
//! - Table creation and lookup
//! - Row operations through the database handle
//! - Persistence across close/reopen (pages, catalog, indices)
//! - Error reporting when a row operation and the catalog rewrite both fail
//! - Concurrent writers on one table

use std::fs;
use std::sync::Arc;
use std::thread;

use tempfile::TempDir;
use tuplestore::page::{CompareOp, Constraint, LogicalOp};
use tuplestore::tuple::{ColumnDef, ColumnType, ColumnValues, Schema, Value};
use tuplestore::{Config, Database, StoreError};

// =============================================================================
// Helper Functions
// =============================================================================

fn config(dir: &TempDir, capacity: usize) -> Config {
    Config::builder()
        .data_dir(dir.path())
        .max_rows_per_page(capacity)
        .sync_writes(false)
        .build()
}

fn create_db(capacity: usize) -> (Database, TempDir) {
    let dir = TempDir::new().unwrap();
    let db = Database::open(config(&dir, capacity)).unwrap();
    (db, dir)
}

fn students() -> Schema {
    Schema::new(
        "students",
        "id",
        vec![
            ColumnDef::new("id", ColumnType::Int),
            ColumnDef::new("name", ColumnType::Text),
            ColumnDef::new("gpa", ColumnType::Double),
        ],
    )
    .unwrap()
}

fn row(id: i64, name: &str, gpa: f64) -> ColumnValues {
    let mut values = ColumnValues::new();
    values.insert("id".to_string(), Value::Int(id));
    values.insert("name".to_string(), Value::from(name));
    values.insert("gpa".to_string(), Value::Double(gpa));
    values
}

fn single(column: &str, value: impl Into<Value>) -> ColumnValues {
    let mut values = ColumnValues::new();
    values.insert(column.to_string(), value.into());
    values
}

// =============================================================================
// Table Tests
// =============================================================================

#[test]
fn test_open_empty_directory() {
    let (db, dir) = create_db(4);

    assert!(db.table_names().is_empty());
    assert_eq!(db.data_dir(), dir.path());
    assert_eq!(db.config().max_rows_per_page, 4);
}

#[test]
fn test_open_rejects_zero_capacity() {
    let dir = TempDir::new().unwrap();

    let result = Database::open(config(&dir, 0));

    assert!(matches!(result, Err(StoreError::Config(_))));
}

#[test]
fn test_create_table_writes_catalog() {
    let (db, _dir) = create_db(4);

    db.create_table(students()).unwrap();

    assert_eq!(db.table_names(), vec!["students".to_string()]);
    let catalog = Database::read_catalog(&db.catalog_path("students")).unwrap();
    assert_eq!(catalog.schema, students());
    assert!(catalog.pages.is_empty());
}

#[test]
fn test_create_table_twice_fails() {
    let (db, _dir) = create_db(4);
    db.create_table(students()).unwrap();

    let result = db.create_table(students());

    assert!(matches!(result, Err(StoreError::TableExists(_))));
}

#[test]
fn test_unknown_table() {
    let (db, _dir) = create_db(4);

    assert!(matches!(
        db.insert("ghosts", &row(1, "a", 1.0)),
        Err(StoreError::TableNotFound(_))
    ));
    assert!(matches!(
        db.get("ghosts", &Value::Int(1)),
        Err(StoreError::TableNotFound(_))
    ));
}

// =============================================================================
// Row Tests
// =============================================================================

#[test]
fn test_insert_get_update_delete() {
    let (db, _dir) = create_db(4);
    db.create_table(students()).unwrap();

    db.insert("students", &row(1, "alice", 3.1)).unwrap();
    db.insert("students", &row(2, "bob", 2.4)).unwrap();

    db.update("students", &Value::Int(2), &single("gpa", 2.9)).unwrap();
    let bob = db.get("students", &Value::Int(2)).unwrap().unwrap();
    assert_eq!(bob.get("gpa"), Some(&Value::Double(2.9)));

    db.update_by_str("students", "1", &single("name", "alicia")).unwrap();
    let alice = db.get("students", &Value::Int(1)).unwrap().unwrap();
    assert_eq!(alice.get("name"), Some(&Value::from("alicia")));

    assert_eq!(db.delete("students", &single("id", 1)).unwrap(), 1);
    assert!(db.get("students", &Value::Int(1)).unwrap().is_none());
}

#[test]
fn test_update_by_str_rejects_unparsable_key() {
    let (db, _dir) = create_db(4);
    db.create_table(students()).unwrap();
    db.insert("students", &row(1, "alice", 3.1)).unwrap();

    let result = db.update_by_str("students", "one", &single("name", "x"));

    assert!(matches!(result, Err(StoreError::InvalidTuple(_))));
}

#[test]
fn test_select_through_database() {
    let (db, _dir) = create_db(2);
    db.create_table(students()).unwrap();
    for (id, name, gpa) in [(1, "a", 1.0), (2, "b", 2.0), (3, "c", 3.0), (4, "d", 4.0)] {
        db.insert("students", &row(id, name, gpa)).unwrap();
    }

    let found = db
        .select(
            "students",
            &[Constraint::new("gpa", CompareOp::Ge, 2.5)],
            LogicalOp::And,
        )
        .unwrap();

    let keys: Vec<&Value> = found.iter().map(|t| t.primary_key()).collect();
    assert_eq!(keys, vec![&Value::Int(3), &Value::Int(4)]);
}

// =============================================================================
// Persistence Tests
// =============================================================================

#[test]
fn test_reopen_restores_rows_and_indices() {
    let dir = TempDir::new().unwrap();
    {
        let db = Database::open(config(&dir, 3)).unwrap();
        db.create_table(students()).unwrap();
        db.create_index("students", "by_name", vec!["name".to_string()])
            .unwrap();
        for id in 1..=10 {
            let name = if id % 2 == 0 { "even" } else { "odd" };
            db.insert("students", &row(id, name, 2.0)).unwrap();
        }
        db.delete("students", &single("id", 5)).unwrap();
    }

    let db = Database::open(config(&dir, 3)).unwrap();

    assert_eq!(db.table_names(), vec!["students".to_string()]);
    let (len, evens) = db
        .with_table("students", |t| {
            t.verify().unwrap();
            let index = t.index("by_name").unwrap();
            (t.len(), index.lookup(&[Value::from("even")]).len())
        })
        .unwrap();
    assert_eq!(len, 9);
    assert_eq!(evens, 5);
    assert!(db.get("students", &Value::Int(5)).unwrap().is_none());
    assert!(db.get("students", &Value::Int(10)).unwrap().is_some());
}

#[test]
fn test_catalog_tracks_page_directory() {
    let (db, _dir) = create_db(2);
    db.create_table(students()).unwrap();
    for id in 1..=5 {
        db.insert("students", &row(id, "x", 1.0)).unwrap();
    }

    let catalog = Database::read_catalog(&db.catalog_path("students")).unwrap();
    assert_eq!(catalog.pages, vec!["0", "1", "2"]);
    assert_eq!(db.store().page_ids("students").unwrap(), vec!["0", "1", "2"]);

    db.delete("students", &single("id", 5)).unwrap();

    let catalog = Database::read_catalog(&db.catalog_path("students")).unwrap();
    assert_eq!(catalog.pages, vec!["0", "1"]);
    assert_eq!(catalog.next_page_id, 3);
    assert!(!db.store().page_path("students", "2").exists());
}

#[test]
fn test_multiple_tables_reopen() {
    let dir = TempDir::new().unwrap();
    {
        let db = Database::open(config(&dir, 4)).unwrap();
        db.create_table(students()).unwrap();
        db.create_table(
            Schema::new(
                "courses",
                "code",
                vec![ColumnDef::new("code", ColumnType::Text)],
            )
            .unwrap(),
        )
        .unwrap();
        db.insert("courses", &single("code", "CSEN 601")).unwrap();
    }

    let db = Database::open(config(&dir, 4)).unwrap();

    assert_eq!(
        db.table_names(),
        vec!["courses".to_string(), "students".to_string()]
    );
    assert!(db
        .get("courses", &Value::from("CSEN 601"))
        .unwrap()
        .is_some());
}

#[test]
fn test_failed_delete_reports_its_own_error_when_catalog_write_fails() {
    let (db, _dir) = create_db(1);
    db.create_table(students()).unwrap();
    db.insert("students", &row(1, "a", 1.0)).unwrap();
    db.insert("students", &row(2, "b", 2.0)).unwrap();

    // page "1" empties cleanly, then page "0" cannot remove its image
    fs::remove_file(db.store().page_path("students", "0")).unwrap();
    // a non-empty directory in place of the catalog makes the rewrite fail
    let catalog = db.catalog_path("students");
    fs::remove_file(&catalog).unwrap();
    fs::create_dir(&catalog).unwrap();
    fs::write(catalog.join("blocker"), b"x").unwrap();

    let result = db.delete("students", &ColumnValues::new());

    assert!(matches!(result, Err(StoreError::Persistence(_))));
    let (len, pages) = db
        .with_table("students", |t| (t.len(), t.page_count()))
        .unwrap();
    assert_eq!(len, 1);
    assert_eq!(pages, 1);
}

// =============================================================================
// Concurrency Tests
// =============================================================================

#[test]
fn test_concurrent_inserts() {
    let (db, _dir) = create_db(8);
    db.create_table(students()).unwrap();
    let db = Arc::new(db);

    let handles: Vec<_> = (0..4)
        .map(|worker| {
            let db = Arc::clone(&db);
            thread::spawn(move || {
                for i in 0..50 {
                    let id = i * 4 + worker;
                    db.insert("students", &row(id, "w", 1.0)).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let (len, pages) = db
        .with_table("students", |t| {
            t.verify().unwrap();
            (t.len(), t.page_count())
        })
        .unwrap();
    assert_eq!(len, 200);
    assert!(pages >= 25);
}
