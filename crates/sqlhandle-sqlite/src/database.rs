//! The connection handle.
//!
//! A [`Database`] owns at most one native `sqlite3*`. It starts either closed
//! ([`Database::new`]) or open ([`Database::open_file`], [`Database::connect`]),
//! can be closed and reopened, and closes itself on drop.
//!
//! Statements borrow the database they were prepared on, so the borrow
//! checker rejects closing a database while a statement is alive:
//!
//! ```compile_fail
//! use sqlhandle_sqlite::Database;
//!
//! let mut db = Database::open_memory().unwrap();
//! let stmt = db.prepare("SELECT 1").unwrap();
//! db.close().unwrap();
//! drop(stmt);
//! ```
//!
//! and a statement cannot outlive its database:
//!
//! ```compile_fail
//! use sqlhandle_sqlite::Database;
//!
//! let stmt = {
//!     let db = Database::open_memory().unwrap();
//!     db.prepare("SELECT 1").unwrap()
//! };
//! ```

#![allow(clippy::borrow_as_ptr)] // FFI out-parameters

use crate::config::{DatabaseConfig, MEMORY_PATH};
use crate::error;
use crate::ffi;
use crate::statement::Statement;
use sqlhandle_core::{Error, Openable, Result, Row, Value};
use std::ffi::{CStr, CString, c_int};
use std::path::Path;
use std::ptr;

const OBJECT_NAME: &str = "Database";

/// A connection to a SQLite database.
pub struct Database {
    db: *mut ffi::sqlite3,
    path: Option<String>,
    /// Errors carry extended result codes
    extended_codes: bool,
}

// SAFETY: the bundled library is built in serialized mode, and a Database is
// only ever used through its single owner. It is deliberately not Sync:
// statements hold `&Database` and must stay on the owning thread.
unsafe impl Send for Database {}

impl Database {
    /// Create a closed database. Call [`Database::open`] before using it.
    pub fn new() -> Self {
        Self {
            db: ptr::null_mut(),
            path: None,
            extended_codes: false,
        }
    }

    /// Open (creating if needed) the database file at `path`.
    pub fn open_file(path: impl AsRef<Path>) -> Result<Self> {
        let mut db = Self::new();
        db.open(path)?;
        Ok(db)
    }

    /// Open a private in-memory database.
    pub fn open_memory() -> Result<Self> {
        Self::connect(&DatabaseConfig::memory())
    }

    /// Open a database described by `config`.
    pub fn connect(config: &DatabaseConfig) -> Result<Self> {
        let mut db = Self::new();
        db.open_with(config)?;
        Ok(db)
    }

    /// Open the database file at `path` with default settings.
    ///
    /// The file is created if it does not exist. Fails with an
    /// `AlreadyOpen` state error if this database is open; the current
    /// connection is left untouched in that case.
    pub fn open(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path_to_str(path.as_ref())?;
        self.open_with(&DatabaseConfig::file(path))
    }

    /// Open a database described by `config`.
    #[tracing::instrument(level = "debug", skip(self, config), fields(path = %config.path))]
    pub fn open_with(&mut self, config: &DatabaseConfig) -> Result<()> {
        if self.is_open() {
            return Err(Error::already_open(OBJECT_NAME));
        }

        let c_path = CString::new(config.path.as_str()).map_err(|_| {
            Error::InvalidInput("database path contains a NUL byte".to_string())
        })?;

        let mut db: *mut ffi::sqlite3 = ptr::null_mut();
        let flags = config.flags.to_sqlite_flags();

        // SAFETY: c_path is a valid C string and db a valid out-pointer
        let rc = unsafe { ffi::sqlite3_open_v2(c_path.as_ptr(), &mut db, flags, ptr::null()) };

        if db.is_null() {
            return Err(Error::OutOfMemory);
        }

        if rc != ffi::SQLITE_OK {
            // SAFETY: a failed open still yields a handle that carries the
            // message and must be closed
            let err = unsafe {
                let err = error::connection_error(db, rc, config.extended_result_codes, None);
                ffi::sqlite3_close(db);
                err
            };
            tracing::debug!(error = %err, "Failed to open database");
            return Err(err);
        }

        if config.extended_result_codes {
            // SAFETY: db is valid
            unsafe { ffi::sqlite3_extended_result_codes(db, 1) };
        }

        if config.busy_timeout_ms > 0 {
            let ms = c_int::try_from(config.busy_timeout_ms).unwrap_or(c_int::MAX);
            // SAFETY: db is valid
            unsafe { ffi::sqlite3_busy_timeout(db, ms) };
        }

        self.db = db;
        self.path = Some(config.path.clone());
        self.extended_codes = config.extended_result_codes;
        tracing::debug!("Opened database");
        Ok(())
    }

    /// Close the connection if it is open.
    ///
    /// If SQLite refuses to close (`SQLITE_BUSY`), the error is returned and
    /// the database stays open.
    pub fn close(&mut self) -> Result<()> {
        if self.db.is_null() {
            return Ok(());
        }

        // SAFETY: db is valid; no statement borrows self while we hold &mut
        let rc = unsafe { ffi::sqlite3_close(self.db) };
        if rc != ffi::SQLITE_OK {
            // SAFETY: the handle is still open after a failed close
            return Err(unsafe { error::connection_error(self.db, rc, self.extended_codes, None) });
        }

        self.db = ptr::null_mut();
        tracing::debug!(path = self.path.as_deref().unwrap_or_default(), "Closed database");
        Ok(())
    }

    /// Path of the most recently opened database.
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    pub fn is_memory(&self) -> bool {
        self.path.as_deref() == Some(MEMORY_PATH)
    }

    /// Execute SQL that returns no values.
    ///
    /// `sql` may hold several statements separated by semicolons; they run in
    /// order and execution stops at the first failure. Use
    /// [`Database::prepare`] to read results.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn execute(&self, sql: &str) -> Result<()> {
        self.require_open()?;
        let c_sql = sql_to_cstring(sql)?;

        let mut errmsg: *mut std::ffi::c_char = ptr::null_mut();

        // SAFETY: db is open and all pointers are valid
        let rc = unsafe {
            ffi::sqlite3_exec(self.db, c_sql.as_ptr(), None, ptr::null_mut(), &mut errmsg)
        };

        if rc != ffi::SQLITE_OK {
            let msg = if errmsg.is_null() {
                ffi::error_string(rc).to_string()
            } else {
                // SAFETY: errmsg was allocated by SQLite and must be freed by it
                unsafe {
                    let msg = CStr::from_ptr(errmsg).to_string_lossy().into_owned();
                    ffi::sqlite3_free(errmsg.cast());
                    msg
                }
            };
            // SAFETY: db is open
            let extended = unsafe { error::extended_code(self.db, rc, self.extended_codes) };
            return Err(error::database_error(rc, extended, msg, Some(sql)));
        }

        Ok(())
    }

    /// Compile `sql` into a statement.
    ///
    /// Only the first statement in `sql` is compiled; anything after it is
    /// ignored. Placeholders (`?`, `?NNN`, `:name`, `@name`, `$name`) can be
    /// bound on the returned [`Statement`].
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn prepare(&self, sql: &str) -> Result<Statement<'_>> {
        self.require_open()?;
        let c_sql = sql_to_cstring(sql)?;
        let len = c_int::try_from(c_sql.as_bytes().len())
            .map_err(|_| Error::InvalidInput("SQL text is too long".to_string()))?;

        let mut stmt: *mut ffi::sqlite3_stmt = ptr::null_mut();

        // SAFETY: db is open and all pointers are valid
        let rc = unsafe {
            ffi::sqlite3_prepare_v2(self.db, c_sql.as_ptr(), len, &mut stmt, ptr::null_mut())
        };

        if rc != ffi::SQLITE_OK {
            // SAFETY: db is open
            return Err(unsafe { error::connection_error(self.db, rc, self.extended_codes, Some(sql)) });
        }

        if stmt.is_null() {
            return Err(Error::InvalidInput(
                "SQL contains no statement".to_string(),
            ));
        }

        tracing::debug!("Prepared statement");
        Ok(Statement::new(self, stmt, sql))
    }

    /// Rowid of the most recent successful INSERT on this connection.
    pub fn last_insert_rowid(&self) -> Result<i64> {
        self.require_open()?;
        // SAFETY: db is open
        Ok(unsafe { ffi::sqlite3_last_insert_rowid(self.db) })
    }

    /// Rows changed by the most recent INSERT, UPDATE or DELETE.
    pub fn changes(&self) -> Result<u64> {
        self.require_open()?;
        // SAFETY: db is open
        let n = unsafe { ffi::sqlite3_changes(self.db) };
        Ok(u64::try_from(n).unwrap_or(0))
    }

    /// Rows changed since the connection was opened.
    pub fn total_changes(&self) -> Result<u64> {
        self.require_open()?;
        // SAFETY: db is open
        let n = unsafe { ffi::sqlite3_total_changes(self.db) };
        Ok(u64::try_from(n).unwrap_or(0))
    }

    /// Whether the connection is outside an explicit transaction.
    pub fn is_autocommit(&self) -> Result<bool> {
        self.require_open()?;
        // SAFETY: db is open
        Ok(unsafe { ffi::sqlite3_get_autocommit(self.db) } != 0)
    }

    /// Prepare, bind `params` by position, and collect every result row.
    pub fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        let mut stmt = self.prepare(sql)?;
        stmt.bind_all(params)?;
        stmt.execute()?.into_rows()
    }

    /// Prepare, bind `params` by position, run to completion, and return the
    /// number of rows changed.
    pub fn execute_with(&self, sql: &str, params: &[Value]) -> Result<u64> {
        let mut stmt = self.prepare(sql)?;
        stmt.bind_all(params)?;
        stmt.run()
    }

    /// Like [`Database::execute_with`], returning the new rowid.
    pub fn insert(&self, sql: &str, params: &[Value]) -> Result<i64> {
        self.execute_with(sql, params)?;
        self.last_insert_rowid()
    }

    pub(crate) fn raw(&self) -> *mut ffi::sqlite3 {
        self.db
    }

    pub(crate) fn extended_codes(&self) -> bool {
        self.extended_codes
    }
}

impl Default for Database {
    fn default() -> Self {
        Self::new()
    }
}

impl Openable for Database {
    fn is_open(&self) -> bool {
        !self.db.is_null()
    }

    fn object_name(&self) -> &'static str {
        OBJECT_NAME
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("path", &self.path)
            .field("open", &self.is_open())
            .finish()
    }
}

impl Drop for Database {
    fn drop(&mut self) {
        if !self.db.is_null() {
            // SAFETY: db is valid, and every Statement borrowing self has
            // already been dropped and finalized
            let rc = unsafe { ffi::sqlite3_close(self.db) };
            if rc != ffi::SQLITE_OK {
                tracing::warn!(
                    code = rc,
                    path = self.path.as_deref().unwrap_or_default(),
                    "Failed to close database on drop"
                );
            }
            self.db = ptr::null_mut();
        }
    }
}

fn path_to_str(path: &Path) -> Result<&str> {
    path.to_str().ok_or_else(|| {
        Error::InvalidInput(format!(
            "database path is not valid UTF-8: {}",
            path.display()
        ))
    })
}

fn sql_to_cstring(sql: &str) -> Result<CString> {
    CString::new(sql).map_err(|_| Error::InvalidInput("SQL contains a NUL byte".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OpenFlags;
    use sqlhandle_core::{DatabaseErrorKind, StateErrorKind};

    fn assert_send<T: Send>() {}

    #[test]
    fn test_new_is_closed() {
        let db = Database::new();
        assert!(!db.is_open());
        assert_eq!(db.path(), None);
        match db.execute("SELECT 1") {
            Err(Error::State(e)) => {
                assert_eq!(e.kind, StateErrorKind::NotOpen);
                assert_eq!(e.object, "Database");
            }
            other => panic!("expected not-open error, got {other:?}"),
        }
        assert!(db.prepare("SELECT 1").is_err());
        assert!(db.last_insert_rowid().is_err());
    }

    #[test]
    fn test_open_memory() {
        let db = Database::open_memory().unwrap();
        assert!(db.is_open());
        assert!(db.is_memory());
        assert_eq!(db.path(), Some(":memory:"));
        assert!(db.is_autocommit().unwrap());
        assert_send::<Database>();
    }

    #[test]
    fn test_open_twice_is_rejected() {
        let mut db = Database::open_memory().unwrap();
        match db.open_with(&DatabaseConfig::memory()) {
            Err(Error::State(e)) => assert_eq!(e.kind, StateErrorKind::AlreadyOpen),
            other => panic!("expected already-open error, got {other:?}"),
        }
        assert!(db.is_open());
    }

    #[test]
    fn test_close_is_idempotent() {
        let mut db = Database::open_memory().unwrap();
        db.close().unwrap();
        assert!(!db.is_open());
        db.close().unwrap();
        assert!(db.execute("SELECT 1").unwrap_err().is_state_error());
    }

    #[test]
    fn test_reopen_after_close() {
        let mut db = Database::open_memory().unwrap();
        db.execute("CREATE TABLE t (x)").unwrap();
        db.close().unwrap();
        db.open_with(&DatabaseConfig::memory()).unwrap();
        // A fresh in-memory database has no tables
        let err = db.execute("INSERT INTO t VALUES (1)").unwrap_err();
        assert!(err.to_string().contains("no such table"));
    }

    #[test]
    fn test_execute_batch_and_counters() {
        let db = Database::open_memory().unwrap();
        db.execute(
            "CREATE TABLE test (id INTEGER PRIMARY KEY, name TEXT);
             INSERT INTO test (name) VALUES ('Alice'), ('Bob');",
        )
        .unwrap();
        assert_eq!(db.changes().unwrap(), 2);
        assert_eq!(db.last_insert_rowid().unwrap(), 2);
        assert_eq!(db.total_changes().unwrap(), 2);
    }

    #[test]
    fn test_execute_error_carries_sql() {
        let db = Database::open_memory().unwrap();
        let err = db.execute("SELEC nonsense").unwrap_err();
        assert_eq!(err.code(), Some(ffi::SQLITE_ERROR));
        assert_eq!(err.sql(), Some("SELEC nonsense"));
        assert!(err.to_string().contains("syntax error"));
    }

    #[test]
    fn test_prepare_errors() {
        let db = Database::open_memory().unwrap();
        let err = db.prepare("SELECT * FROM missing").unwrap_err();
        assert!(err.to_string().contains("no such table: missing"));
        assert_eq!(err.sql(), Some("SELECT * FROM missing"));

        assert!(matches!(
            db.prepare("   -- only a comment"),
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            db.prepare("SELECT '\0'"),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_query_and_insert_helpers() {
        let db = Database::open_memory().unwrap();
        db.execute("CREATE TABLE test (id INTEGER PRIMARY KEY, name TEXT, age INTEGER)")
            .unwrap();

        let id = db
            .insert(
                "INSERT INTO test (name, age) VALUES (?, ?)",
                &[Value::from("Alice"), Value::from(30)],
            )
            .unwrap();
        assert_eq!(id, 1);

        let changed = db
            .execute_with("UPDATE test SET age = age + ?", &[Value::from(1)])
            .unwrap();
        assert_eq!(changed, 1);

        let rows = db
            .query("SELECT name, age FROM test WHERE id = ?", &[Value::from(id)])
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get_named::<String>("name").unwrap(), "Alice");
        assert_eq!(rows[0].get_named::<i64>("age").unwrap(), 31);
    }

    #[test]
    fn test_constraint_error_kind() {
        let db = Database::connect(&DatabaseConfig::memory().extended_result_codes(true)).unwrap();
        db.execute("CREATE TABLE u (name TEXT UNIQUE)").unwrap();
        db.execute("INSERT INTO u VALUES ('a')").unwrap();
        match db.execute_with("INSERT INTO u VALUES (?)", &[Value::from("a")]) {
            Err(Error::Database(e)) => {
                assert_eq!(e.kind, DatabaseErrorKind::Constraint);
                assert_eq!(e.code, ffi::SQLITE_CONSTRAINT);
                // SQLITE_CONSTRAINT_UNIQUE
                assert_eq!(e.extended_code, ffi::SQLITE_CONSTRAINT | (8 << 8));
            }
            other => panic!("expected constraint error, got {other:?}"),
        }
    }

    #[test]
    fn test_primary_code_without_extended_codes() {
        let db = Database::open_memory().unwrap();
        db.execute("CREATE TABLE u (name TEXT UNIQUE)").unwrap();
        db.execute("INSERT INTO u VALUES ('a')").unwrap();

        let from_step = db
            .execute_with("INSERT INTO u VALUES (?)", &[Value::from("a")])
            .unwrap_err();
        let from_exec = db.execute("INSERT INTO u VALUES ('a')").unwrap_err();
        for err in [from_step, from_exec] {
            match err {
                Error::Database(e) => {
                    assert_eq!(e.kind, DatabaseErrorKind::Constraint);
                    assert_eq!(e.code, ffi::SQLITE_CONSTRAINT);
                    assert_eq!(e.extended_code, ffi::SQLITE_CONSTRAINT);
                }
                other => panic!("expected constraint error, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_open_flags_read_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flags.db");
        let path = path.to_str().unwrap();

        let missing = DatabaseConfig::file(path).flags(OpenFlags::read_write());
        match Database::connect(&missing) {
            Err(Error::Database(e)) => assert_eq!(e.kind, DatabaseErrorKind::CantOpen),
            other => panic!("expected cannot-open error, got {other:?}"),
        }

        let db = Database::open_file(path).unwrap();
        db.execute("CREATE TABLE test (id INTEGER)").unwrap();
        drop(db);

        let db = Database::connect(&DatabaseConfig::file(path).flags(OpenFlags::read_only()))
            .unwrap();
        assert!(db.query("SELECT * FROM test", &[]).unwrap().is_empty());
        match db.execute("INSERT INTO test VALUES (1)") {
            Err(Error::Database(e)) => assert_eq!(e.kind, DatabaseErrorKind::ReadOnly),
            other => panic!("expected read-only error, got {other:?}"),
        }
    }

    #[test]
    fn test_drop_releases_lock() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lock.db");
        let path = path.to_str().unwrap();
        let config = DatabaseConfig::file(path).busy_timeout(0);

        let holder = Database::connect(&config).unwrap();
        holder.execute("CREATE TABLE t (x)").unwrap();
        let mut stmt = holder.prepare("SELECT x FROM t").unwrap();
        stmt.execute().unwrap();
        holder.execute("BEGIN EXCLUSIVE").unwrap();

        let other = Database::connect(&config).unwrap();
        assert!(other.execute("INSERT INTO t VALUES (1)").unwrap_err().is_busy());

        drop(stmt);
        drop(holder);
        other.execute("INSERT INTO t VALUES (1)").unwrap();
        assert_eq!(other.changes().unwrap(), 1);
    }

    #[test]
    fn test_debug_does_not_expose_handle() {
        let db = Database::open_memory().unwrap();
        let s = format!("{:?}", db);
        assert!(s.contains("open: true"));
        assert!(s.contains(":memory:"));
    }
}
