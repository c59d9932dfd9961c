//! Row cursor over an executed statement.

use crate::ffi;
use crate::statement::Statement;
use crate::types::{self, ColumnType};
use sqlhandle_core::error::{RangeError, RangeTarget, TypeError};
use sqlhandle_core::{ColumnInfo, Error, FromValue, Openable, Result, Row, Value};
use std::ffi::c_int;
use std::sync::Arc;

const OBJECT_NAME: &str = "ResultSet";

/// The current row of an executed [`Statement`].
///
/// The cursor holds the statement mutably, so it cannot be rebound, reset or
/// closed while rows are being read:
///
/// ```compile_fail
/// use sqlhandle_sqlite::Database;
///
/// let db = Database::open_memory().unwrap();
/// let mut stmt = db.prepare("SELECT ?").unwrap();
/// let rows = stmt.execute().unwrap();
/// stmt.bind(1, 2).unwrap();
/// rows.read_int(0).unwrap();
/// ```
pub struct ResultSet<'s, 'db> {
    stmt: &'s mut Statement<'db>,
    columns: Option<Arc<ColumnInfo>>,
}

impl<'s, 'db> ResultSet<'s, 'db> {
    pub(crate) fn new(stmt: &'s mut Statement<'db>) -> Self {
        Self {
            stmt,
            columns: None,
        }
    }

    /// Whether there is a current row to read.
    pub fn can_read(&self) -> bool {
        self.stmt.is_open() && self.stmt.has_row()
    }

    /// Move to the next row. Returns `false` once the rows are exhausted.
    pub fn next(&mut self) -> Result<bool> {
        self.stmt.require_open()?;
        if !self.stmt.has_row() {
            return Ok(false);
        }
        self.stmt.step()
    }

    /// Number of columns in the current row.
    pub fn column_count(&self) -> Result<usize> {
        self.require_row()?;
        // SAFETY: the statement is open and positioned on a row
        let n = unsafe { ffi::sqlite3_data_count(self.stmt.raw()) };
        Ok(usize::try_from(n).unwrap_or(0))
    }

    pub fn column_type(&self, index: usize) -> Result<ColumnType> {
        let col = self.column_index(index)?;
        // SAFETY: positioned on a row and col is in range
        let code = unsafe { ffi::sqlite3_column_type(self.stmt.raw(), col) };
        Ok(ColumnType::from_code(code))
    }

    /// Read a column as a 32-bit integer, converting the way SQLite does.
    pub fn read_int(&self, index: usize) -> Result<i32> {
        let col = self.column_index(index)?;
        // SAFETY: positioned on a row and col is in range
        Ok(unsafe { ffi::sqlite3_column_int(self.stmt.raw(), col) })
    }

    pub fn read_int64(&self, index: usize) -> Result<i64> {
        let col = self.column_index(index)?;
        // SAFETY: positioned on a row and col is in range
        Ok(unsafe { ffi::sqlite3_column_int64(self.stmt.raw(), col) })
    }

    pub fn read_double(&self, index: usize) -> Result<f64> {
        let col = self.column_index(index)?;
        // SAFETY: positioned on a row and col is in range
        Ok(unsafe { ffi::sqlite3_column_double(self.stmt.raw(), col) })
    }

    /// Read a column as text. Numbers are rendered by SQLite.
    ///
    /// NULL and text that is not valid UTF-8 are `Type` errors. Use
    /// [`ResultSet::read_blob`] for the raw bytes.
    pub fn read_string(&self, index: usize) -> Result<String> {
        let col = self.column_index(index)?;
        // SAFETY: positioned on a row and col is in range
        let text = unsafe { types::read_text(self.stmt.raw(), col) }
            .map_err(|e| self.with_column(index, e))?;
        text.ok_or_else(|| {
            Error::Type(TypeError {
                expected: "TEXT",
                actual: "NULL".to_string(),
                column: self.stmt.column_name(index).ok(),
            })
        })
    }

    /// Read a column as bytes. NULL reads as an empty blob.
    pub fn read_blob(&self, index: usize) -> Result<Vec<u8>> {
        let col = self.column_index(index)?;
        // SAFETY: positioned on a row and col is in range
        Ok(unsafe { types::read_blob(self.stmt.raw(), col) })
    }

    /// Read a column as a [`Value`] of its storage class.
    pub fn read_value(&self, index: usize) -> Result<Value> {
        let col = self.column_index(index)?;
        // SAFETY: positioned on a row and col is in range
        let value = unsafe { types::read_column(self.stmt.raw(), col) };
        value.map_err(|e| self.with_column(index, e))
    }

    /// Read a column and convert it with [`FromValue`].
    pub fn get<T: FromValue>(&self, index: usize) -> Result<T> {
        let value = self.read_value(index)?;
        T::from_value(&value).map_err(|e| self.with_column(index, e))
    }

    /// Snapshot the current row.
    pub fn current_row(&mut self) -> Result<Row> {
        let count = self.column_count()?;
        let values = (0..count)
            .map(|i| self.read_value(i))
            .collect::<Result<Vec<_>>>()?;
        let columns = self.columns()?;
        Ok(Row::with_columns(columns, values))
    }

    /// Collect the current row and every remaining row.
    pub fn into_rows(mut self) -> Result<Vec<Row>> {
        let mut rows = Vec::new();
        while self.can_read() {
            rows.push(self.current_row()?);
            self.next()?;
        }
        tracing::trace!(sql = %self.stmt.sql(), rows = rows.len(), "Collected rows");
        Ok(rows)
    }

    fn columns(&mut self) -> Result<Arc<ColumnInfo>> {
        if let Some(columns) = &self.columns {
            return Ok(Arc::clone(columns));
        }
        let columns = Arc::new(ColumnInfo::new(self.stmt.column_names()?));
        self.columns = Some(Arc::clone(&columns));
        Ok(columns)
    }

    fn with_column(&self, index: usize, err: Error) -> Error {
        match err {
            Error::Type(mut te) => {
                te.column = self.stmt.column_name(index).ok();
                Error::Type(te)
            }
            e => e,
        }
    }

    fn require_row(&self) -> Result<()> {
        self.stmt.require_open()?;
        if self.stmt.has_row() {
            Ok(())
        } else {
            Err(Error::no_row(OBJECT_NAME))
        }
    }

    fn column_index(&self, index: usize) -> Result<c_int> {
        let count = self.column_count()?;
        if index >= count {
            return Err(Error::Range(RangeError {
                target: RangeTarget::Column,
                index: i64::try_from(index).unwrap_or(i64::MAX),
                count,
            }));
        }
        Ok(c_int::try_from(index).unwrap_or(c_int::MAX))
    }
}

impl std::fmt::Debug for ResultSet<'_, '_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultSet")
            .field("sql", &self.stmt.sql())
            .field("can_read", &self.can_read())
            .finish()
    }
}
