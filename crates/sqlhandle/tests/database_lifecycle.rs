use sqlhandle::prelude::*;
use sqlhandle::{StateErrorKind, Statement};
use tempfile::TempDir;

fn temp_dir() -> TempDir {
    tempfile::tempdir().expect("create temp dir")
}

#[test]
fn open_close_reopen_on_files() {
    let dir = temp_dir();
    let first = dir.path().join("test.db");
    let second = dir.path().join("test2.db");

    let mut db = Database::new();
    assert!(!db.is_open());
    db.open(&first).unwrap();
    assert!(db.is_open());
    db.close().unwrap();
    assert!(!db.is_open());

    db.open(&second).unwrap();
    assert!(db.is_open());
    assert_eq!(db.path(), second.to_str());
    db.close().unwrap();
    assert!(!db.is_open());

    let mut db2 = Database::open_file(&first).unwrap();
    assert!(db2.is_open());
    match db2.open(&second) {
        Err(Error::State(e)) => {
            assert_eq!(e.kind, StateErrorKind::AlreadyOpen);
            assert_eq!(e.object, "Database");
        }
        other => panic!("expected already-open error, got {other:?}"),
    }
    assert!(db2.is_open());
    assert_eq!(db2.path(), first.to_str());
    db2.close().unwrap();
    assert!(!db2.is_open());

    assert!(first.exists());
    assert!(second.exists());
}

#[test]
fn closed_database_rejects_operations() {
    let mut db = Database::open_memory().unwrap();
    db.close().unwrap();

    for err in [
        db.execute("SELECT 1").unwrap_err(),
        db.prepare("SELECT 1").map(|_| ()).unwrap_err(),
        db.last_insert_rowid().map(|_| ()).unwrap_err(),
        db.changes().map(|_| ()).unwrap_err(),
    ] {
        assert!(err.is_state_error());
        assert_eq!(err.to_string(), "Database is not open");
    }
    db.close().unwrap();
}

#[test]
fn statement_close_is_observable_and_final() {
    let dir = temp_dir();
    let db = Database::open_file(dir.path().join("test.db")).unwrap();
    let mut stmt: Statement<'_> = db
        .prepare("CREATE TABLE IF NOT EXISTS test (id, value);")
        .unwrap();
    assert!(stmt.is_open());
    stmt.close();
    assert!(!stmt.is_open());
    assert!(stmt.execute().is_err());
    assert!(stmt.column_count().is_err());
}

#[test]
fn dropped_handles_release_the_file() {
    let dir = temp_dir();
    let path = dir.path().join("test.db");
    {
        let db = Database::open_file(&path).unwrap();
        db.execute("CREATE TABLE t (x)").unwrap();
        let mut stmt = db.prepare("INSERT INTO t VALUES (?)").unwrap();
        stmt.bind(1, 1).unwrap();
        stmt.execute().unwrap();
    }
    // A fresh connection sees the committed row and can take a write lock
    let db = Database::open_file(&path).unwrap();
    db.execute("BEGIN EXCLUSIVE; COMMIT;").unwrap();
    let rows = db.query("SELECT x FROM t", &[]).unwrap();
    assert_eq!(rows.len(), 1);
}

#[test]
fn connect_with_config() {
    let dir = temp_dir();
    let path = dir.path().join("config.db");
    let json = serde_json::json!({
        "path": path.to_str().unwrap(),
        "busy_timeout_ms": 100,
        "extended_result_codes": true,
    });
    let config = DatabaseConfig::from_json(&json.to_string()).unwrap();
    let db = Database::connect(&config).unwrap();
    assert!(db.is_open());
    assert!(!db.is_memory());
    assert!(db.is_autocommit().unwrap());
    assert!(path.exists());

    let memory = Database::connect(&DatabaseConfig::memory()).unwrap();
    assert!(memory.is_memory());
}

#[test]
fn read_only_database_cannot_be_created_or_written() {
    let dir = temp_dir();
    let path = dir.path().join("ro.db");
    let read_only = DatabaseConfig::file(path.to_str().unwrap()).flags(OpenFlags::read_only());

    let err = Database::connect(&read_only).unwrap_err();
    assert_eq!(err.code(), Some(14));

    Database::open_file(&path)
        .unwrap()
        .execute("CREATE TABLE t (x)")
        .unwrap();

    let db = Database::connect(&read_only).unwrap();
    let err = db.execute("INSERT INTO t VALUES (1)").unwrap_err();
    match err {
        Error::Database(e) => assert_eq!(e.kind, sqlhandle::DatabaseErrorKind::ReadOnly),
        other => panic!("expected read-only error, got {other:?}"),
    }
}
