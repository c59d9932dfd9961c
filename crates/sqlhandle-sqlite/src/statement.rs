//! The prepared statement handle.
//!
//! A [`Statement`] is created open by [`Database::prepare`] and finalized by
//! [`Statement::close`] or on drop. Binding uses 1-based parameter indices,
//! or parameter names including their prefix (`:id`, `@id`, `$id`).
//!
//! ```
//! use sqlhandle_sqlite::Database;
//!
//! let db = Database::open_memory()?;
//! db.execute("CREATE TABLE test (id, value)")?;
//!
//! let mut insert = db.prepare("INSERT INTO test (id, value) VALUES (:id, ?2)")?;
//! insert.bind(":id", 1)?;
//! insert.bind(2, "test value")?;
//! insert.execute()?;
//!
//! let mut select = db.prepare("SELECT id, value FROM test")?;
//! let mut rows = select.execute()?;
//! while rows.can_read() {
//!     assert_eq!(rows.read_int(0)?, 1);
//!     assert_eq!(rows.read_string(1)?, "test value");
//!     rows.next()?;
//! }
//! # Ok::<(), sqlhandle_core::Error>(())
//! ```

use crate::database::Database;
use crate::error;
use crate::ffi;
use crate::result_set::ResultSet;
use crate::types;
use sqlhandle_core::error::{RangeError, RangeTarget};
use sqlhandle_core::{Error, Openable, Result, Value};
use std::ffi::{CStr, CString, c_int};
use std::ptr;

const OBJECT_NAME: &str = "Statement";

/// A compiled SQL statement bound to the [`Database`] it was prepared on.
pub struct Statement<'db> {
    conn: &'db Database,
    stmt: *mut ffi::sqlite3_stmt,
    sql: String,
    /// The last step produced a row that can be read
    has_row: bool,
    /// Stepped at least once since the last reset
    stepped: bool,
}

/// Something that identifies a bind parameter.
///
/// Implemented for 1-based positions (`usize`, `i32`) and for parameter names
/// (`&str`, `String`). Names are resolved with
/// [`Statement::parameter_index`].
pub trait BindIndex {
    fn resolve(&self, stmt: &Statement<'_>) -> Result<c_int>;
}

impl BindIndex for usize {
    fn resolve(&self, stmt: &Statement<'_>) -> Result<c_int> {
        c_int::try_from(*self).map_err(|_| {
            Error::Range(RangeError {
                target: RangeTarget::Parameter,
                index: i64::try_from(*self).unwrap_or(i64::MAX),
                count: stmt.parameter_count().unwrap_or(0),
            })
        })
    }
}

impl BindIndex for i32 {
    fn resolve(&self, _stmt: &Statement<'_>) -> Result<c_int> {
        Ok(*self)
    }
}

impl BindIndex for &str {
    fn resolve(&self, stmt: &Statement<'_>) -> Result<c_int> {
        let index = stmt.parameter_index(self)?;
        c_int::try_from(index).map_err(|_| Error::UnknownParameter((*self).to_string()))
    }
}

impl BindIndex for String {
    fn resolve(&self, stmt: &Statement<'_>) -> Result<c_int> {
        self.as_str().resolve(stmt)
    }
}

impl BindIndex for &String {
    fn resolve(&self, stmt: &Statement<'_>) -> Result<c_int> {
        self.as_str().resolve(stmt)
    }
}

impl<'db> Statement<'db> {
    pub(crate) fn new(conn: &'db Database, stmt: *mut ffi::sqlite3_stmt, sql: &str) -> Self {
        Self {
            conn,
            stmt,
            sql: sql.to_string(),
            has_row: false,
            stepped: false,
        }
    }

    /// SQL text this statement was prepared from.
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// The database this statement belongs to.
    pub fn database(&self) -> &'db Database {
        self.conn
    }

    /// Bind `value` to the parameter identified by `index`.
    ///
    /// Fails with `Range` for an index outside `1..=parameter_count()`,
    /// `UnknownParameter` for a name the statement does not declare, and
    /// `OutOfMemory` if SQLite cannot copy the value.
    ///
    /// Binding after the statement has run rewinds it first; other bindings
    /// are kept.
    pub fn bind<I, V>(&mut self, index: I, value: V) -> Result<()>
    where
        I: BindIndex,
        V: Into<Value>,
    {
        let index = self.begin_bind(&index)?;
        self.bind_value_at(index, &value.into())
    }

    /// Bind a 32-bit integer.
    pub fn bind_int(&mut self, index: impl BindIndex, value: i32) -> Result<()> {
        let index = self.begin_bind(&index)?;
        // SAFETY: stmt is open
        let rc = unsafe { ffi::sqlite3_bind_int(self.stmt, index, value) };
        self.finish_bind(index, rc)
    }

    pub fn bind_int64(&mut self, index: impl BindIndex, value: i64) -> Result<()> {
        self.bind(index, Value::Integer(value))
    }

    pub fn bind_double(&mut self, index: impl BindIndex, value: f64) -> Result<()> {
        self.bind(index, Value::Real(value))
    }

    /// Bind text without an intermediate `Value`.
    pub fn bind_text(&mut self, index: impl BindIndex, value: &str) -> Result<()> {
        let index = self.begin_bind(&index)?;
        // SAFETY: stmt is open
        let rc = unsafe { types::bind_text(self.stmt, index, value) };
        self.finish_bind(index, rc)
    }

    /// Bind a blob without an intermediate `Value`.
    pub fn bind_blob(&mut self, index: impl BindIndex, value: &[u8]) -> Result<()> {
        let index = self.begin_bind(&index)?;
        // SAFETY: stmt is open
        let rc = unsafe { types::bind_blob(self.stmt, index, value) };
        self.finish_bind(index, rc)
    }

    pub fn bind_null(&mut self, index: impl BindIndex) -> Result<()> {
        self.bind(index, Value::Null)
    }

    /// Bind `params` to positions `1..=params.len()`.
    pub fn bind_all(&mut self, params: &[Value]) -> Result<()> {
        self.require_open()?;
        for (i, param) in params.iter().enumerate() {
            self.bind(i + 1, param.clone())?;
        }
        Ok(())
    }

    /// Bind each `(name, value)` pair by parameter name.
    pub fn bind_named(&mut self, params: &[(&str, Value)]) -> Result<()> {
        for (name, value) in params {
            let index = self.begin_bind(name)?;
            self.bind_value_at(index, value)?;
        }
        Ok(())
    }

    /// Reset every parameter to NULL.
    pub fn clear_bindings(&mut self) -> Result<()> {
        self.require_open()?;
        // SAFETY: stmt is open
        unsafe { ffi::sqlite3_clear_bindings(self.stmt) };
        Ok(())
    }

    /// Number of parameters, i.e. the largest valid bind index.
    pub fn parameter_count(&self) -> Result<usize> {
        self.require_open()?;
        // SAFETY: stmt is open
        let n = unsafe { ffi::sqlite3_bind_parameter_count(self.stmt) };
        Ok(usize::try_from(n).unwrap_or(0))
    }

    /// 1-based index of the parameter called `name` (prefix included).
    pub fn parameter_index(&self, name: &str) -> Result<usize> {
        self.require_open()?;
        let c_name =
            CString::new(name).map_err(|_| Error::UnknownParameter(name.to_string()))?;
        // SAFETY: stmt is open and c_name is a valid C string
        let index = unsafe { ffi::sqlite3_bind_parameter_index(self.stmt, c_name.as_ptr()) };
        match usize::try_from(index) {
            Ok(0) | Err(_) => Err(Error::UnknownParameter(name.to_string())),
            Ok(index) => Ok(index),
        }
    }

    /// Name of the parameter at `index`, `None` for anonymous `?` parameters.
    pub fn parameter_name(&self, index: usize) -> Result<Option<String>> {
        let count = self.parameter_count()?;
        if index == 0 || index > count {
            return Err(Error::Range(RangeError {
                target: RangeTarget::Parameter,
                index: i64::try_from(index).unwrap_or(i64::MAX),
                count,
            }));
        }
        let index = c_int::try_from(index).unwrap_or(c_int::MAX);
        // SAFETY: stmt is open and index is in range
        let ptr = unsafe { ffi::sqlite3_bind_parameter_name(self.stmt, index) };
        if ptr.is_null() {
            return Ok(None);
        }
        // SAFETY: SQLite returns a NUL-terminated UTF-8 string owned by the statement
        Ok(Some(unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned()))
    }

    /// Number of columns in the statement's result, 0 for non-queries.
    pub fn column_count(&self) -> Result<usize> {
        self.require_open()?;
        // SAFETY: stmt is open
        let n = unsafe { ffi::sqlite3_column_count(self.stmt) };
        Ok(usize::try_from(n).unwrap_or(0))
    }

    /// Name of the result column at 0-based `index`.
    pub fn column_name(&self, index: usize) -> Result<String> {
        let count = self.column_count()?;
        if index >= count {
            return Err(Error::Range(RangeError {
                target: RangeTarget::Column,
                index: i64::try_from(index).unwrap_or(i64::MAX),
                count,
            }));
        }
        let index = c_int::try_from(index).unwrap_or(c_int::MAX);
        // SAFETY: stmt is open and index is in range
        let name = unsafe { types::column_name(self.stmt, index) };
        name.ok_or(Error::OutOfMemory)
    }

    pub fn column_names(&self) -> Result<Vec<String>> {
        (0..self.column_count()?)
            .map(|i| self.column_name(i))
            .collect()
    }

    /// Run the statement and return a cursor on its first row (if any).
    ///
    /// If the statement was already stepped, it is reset first, so every
    /// call starts from the beginning. Bindings are kept.
    pub fn execute(&mut self) -> Result<ResultSet<'_, 'db>> {
        self.require_open()?;
        if self.stepped {
            // The outcome of the previous run was already reported by step
            // SAFETY: stmt is open
            unsafe { ffi::sqlite3_reset(self.stmt) };
            self.stepped = false;
            self.has_row = false;
        }
        self.step()?;
        Ok(ResultSet::new(self))
    }

    /// Run the statement to completion, discarding any rows, and return the
    /// number of rows changed.
    pub fn run(&mut self) -> Result<u64> {
        {
            let mut rows = self.execute()?;
            while rows.can_read() {
                rows.next()?;
            }
        }
        self.conn.changes()
    }

    /// Rewind the statement so it can be executed again.
    ///
    /// Bindings are kept. Returns `false` when SQLite reports that the most
    /// recent step failed; the statement is rewound either way.
    pub fn reset(&mut self) -> Result<bool> {
        self.require_open()?;
        // SAFETY: stmt is open
        let rc = unsafe { ffi::sqlite3_reset(self.stmt) };
        self.has_row = false;
        self.stepped = false;
        tracing::trace!(sql = %self.sql, rc, "Reset statement");
        Ok(rc == ffi::SQLITE_OK)
    }

    /// Finalize the statement. Closing twice is a no-op.
    ///
    /// Finalize reports the error of the last failed step, which was already
    /// returned from that step, so it is not reported again here.
    pub fn close(&mut self) {
        if !self.stmt.is_null() {
            // SAFETY: stmt is valid and is never used after this
            unsafe { ffi::sqlite3_finalize(self.stmt) };
            self.stmt = ptr::null_mut();
            self.has_row = false;
            self.stepped = false;
            tracing::debug!(sql = %self.sql, "Finalized statement");
        }
    }

    /// Advance to the next row. Returns whether a row is available.
    pub(crate) fn step(&mut self) -> Result<bool> {
        self.require_open()?;
        // SAFETY: stmt is open
        let rc = unsafe { ffi::sqlite3_step(self.stmt) };
        self.stepped = true;
        match rc {
            ffi::SQLITE_ROW => self.has_row = true,
            ffi::SQLITE_DONE => self.has_row = false,
            _ => {
                self.has_row = false;
                // SAFETY: the connection outlives the statement
                return Err(unsafe {
                    error::connection_error(
                        self.conn.raw(),
                        rc,
                        self.conn.extended_codes(),
                        Some(&self.sql),
                    )
                });
            }
        }
        tracing::trace!(sql = %self.sql, row = self.has_row, "Stepped statement");
        Ok(self.has_row)
    }

    pub(crate) fn has_row(&self) -> bool {
        self.has_row
    }

    pub(crate) fn raw(&self) -> *mut ffi::sqlite3_stmt {
        self.stmt
    }

    /// Check the handle, rewind a finished run so SQLite accepts new values,
    /// and resolve `index`.
    fn begin_bind(&mut self, index: &impl BindIndex) -> Result<c_int> {
        self.require_open()?;
        if self.stepped {
            // SAFETY: stmt is open
            unsafe { ffi::sqlite3_reset(self.stmt) };
            self.stepped = false;
            self.has_row = false;
        }
        index.resolve(self)
    }

    fn bind_value_at(&mut self, index: c_int, value: &Value) -> Result<()> {
        // SAFETY: stmt is open
        let rc = unsafe { types::bind_value(self.stmt, index, value) };
        self.finish_bind(index, rc)
    }

    fn finish_bind(&self, index: c_int, rc: c_int) -> Result<()> {
        tracing::trace!(sql = %self.sql, index, rc, "Bound parameter");
        if rc == ffi::SQLITE_OK {
            return Ok(());
        }
        let count = self.parameter_count()?;
        // SAFETY: the connection outlives the statement
        unsafe { error::check_bind(self.conn.raw(), self.conn.extended_codes(), rc, index, count) }
    }
}

impl Openable for Statement<'_> {
    fn is_open(&self) -> bool {
        !self.stmt.is_null()
    }

    fn object_name(&self) -> &'static str {
        OBJECT_NAME
    }
}

impl std::fmt::Debug for Statement<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Statement")
            .field("sql", &self.sql)
            .field("open", &self.is_open())
            .field("has_row", &self.has_row)
            .finish()
    }
}

impl Drop for Statement<'_> {
    fn drop(&mut self) {
        self.close();
    }
}
