//! Moving values across the FFI boundary.
//!
//! SQLite has five storage classes (INTEGER, REAL, TEXT, BLOB, NULL) which
//! map one-to-one onto [`Value`]. Text and blobs are bound with
//! `SQLITE_TRANSIENT`, so SQLite copies them and the Rust buffer may be
//! dropped as soon as the bind call returns.

use crate::ffi;
use sqlhandle_core::error::TypeError;
use sqlhandle_core::{Error, Result, Value};
use std::ffi::{CStr, c_int};

/// Storage class of a column value in the current row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Integer,
    Real,
    Text,
    Blob,
    Null,
}

impl ColumnType {
    pub(crate) fn from_code(code: c_int) -> Self {
        match code {
            ffi::SQLITE_INTEGER => ColumnType::Integer,
            ffi::SQLITE_FLOAT => ColumnType::Real,
            ffi::SQLITE_TEXT => ColumnType::Text,
            ffi::SQLITE_BLOB => ColumnType::Blob,
            _ => ColumnType::Null,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            ColumnType::Integer => "INTEGER",
            ColumnType::Real => "REAL",
            ColumnType::Text => "TEXT",
            ColumnType::Blob => "BLOB",
            ColumnType::Null => "NULL",
        }
    }
}

/// Bind UTF-8 text to a parameter.
///
/// # Safety
/// `stmt` must be a valid, non-null prepared statement handle.
pub unsafe fn bind_text(stmt: *mut ffi::sqlite3_stmt, index: c_int, text: &str) -> c_int {
    let Ok(len) = c_int::try_from(text.len()) else {
        return ffi::SQLITE_TOOBIG;
    };
    // SAFETY: stmt is valid; SQLITE_TRANSIENT makes SQLite copy the bytes
    unsafe { ffi::sqlite3_bind_text(stmt, index, text.as_ptr().cast(), len, ffi::SQLITE_TRANSIENT()) }
}

/// Bind a blob to a parameter.
///
/// # Safety
/// `stmt` must be a valid, non-null prepared statement handle.
pub unsafe fn bind_blob(stmt: *mut ffi::sqlite3_stmt, index: c_int, bytes: &[u8]) -> c_int {
    let Ok(len) = c_int::try_from(bytes.len()) else {
        return ffi::SQLITE_TOOBIG;
    };
    // SAFETY: stmt is valid; the pointer is non-null even for an empty slice,
    // so SQLite binds a zero-length blob rather than NULL
    unsafe { ffi::sqlite3_bind_blob(stmt, index, bytes.as_ptr().cast(), len, ffi::SQLITE_TRANSIENT()) }
}

/// Bind a Value to a prepared statement parameter.
///
/// # Safety
/// - `stmt` must be a valid, non-null prepared statement handle
/// - `index` is 1-based; out-of-range indices yield `SQLITE_RANGE`
pub unsafe fn bind_value(stmt: *mut ffi::sqlite3_stmt, index: c_int, value: &Value) -> c_int {
    // SAFETY: forwarded from the caller
    unsafe {
        match value {
            Value::Null => ffi::sqlite3_bind_null(stmt, index),
            Value::Integer(v) => ffi::sqlite3_bind_int64(stmt, index, *v),
            Value::Real(v) => ffi::sqlite3_bind_double(stmt, index, *v),
            Value::Text(s) => bind_text(stmt, index, s),
            Value::Blob(b) => bind_blob(stmt, index, b),
        }
    }
}

/// Read text from a column, `None` for NULL.
///
/// Text that is not valid UTF-8 is a `Type` error; its raw bytes can still
/// be read with [`read_blob`].
///
/// # Safety
/// `stmt` must have just returned `SQLITE_ROW` and `index` must be a valid
/// 0-based column index.
pub unsafe fn read_text(stmt: *mut ffi::sqlite3_stmt, index: c_int) -> Result<Option<String>> {
    // SAFETY: forwarded from the caller. column_text must come before
    // column_bytes so the byte count refers to the UTF-8 form.
    unsafe {
        let ptr = ffi::sqlite3_column_text(stmt, index);
        if ptr.is_null() {
            return Ok(None);
        }
        let len = usize::try_from(ffi::sqlite3_column_bytes(stmt, index)).unwrap_or(0);
        let slice = std::slice::from_raw_parts(ptr.cast::<u8>(), len);
        match std::str::from_utf8(slice) {
            Ok(text) => Ok(Some(text.to_string())),
            Err(e) => Err(Error::Type(TypeError {
                expected: "UTF-8 TEXT",
                actual: format!("invalid UTF-8 at byte {}", e.valid_up_to()),
                column: None,
            })),
        }
    }
}

/// Read a blob from a column. NULL reads as an empty blob.
///
/// # Safety
/// Same as [`read_text`].
pub unsafe fn read_blob(stmt: *mut ffi::sqlite3_stmt, index: c_int) -> Vec<u8> {
    // SAFETY: forwarded from the caller
    unsafe {
        let ptr = ffi::sqlite3_column_blob(stmt, index);
        let len = usize::try_from(ffi::sqlite3_column_bytes(stmt, index)).unwrap_or(0);
        if ptr.is_null() || len == 0 {
            Vec::new()
        } else {
            std::slice::from_raw_parts(ptr.cast::<u8>(), len).to_vec()
        }
    }
}

/// Read a column value by its storage class.
///
/// # Safety
/// Same as [`read_text`].
pub unsafe fn read_column(stmt: *mut ffi::sqlite3_stmt, index: c_int) -> Result<Value> {
    // SAFETY: forwarded from the caller
    unsafe {
        Ok(match ColumnType::from_code(ffi::sqlite3_column_type(stmt, index)) {
            ColumnType::Null => Value::Null,
            ColumnType::Integer => Value::Integer(ffi::sqlite3_column_int64(stmt, index)),
            ColumnType::Real => Value::Real(ffi::sqlite3_column_double(stmt, index)),
            ColumnType::Text => read_text(stmt, index)?.map_or(Value::Null, Value::Text),
            ColumnType::Blob => Value::Blob(read_blob(stmt, index)),
        })
    }
}

/// Get the column name from a statement.
///
/// # Safety
/// `stmt` must be a valid prepared statement and `index` a valid 0-based
/// column index.
pub unsafe fn column_name(stmt: *mut ffi::sqlite3_stmt, index: c_int) -> Option<String> {
    // SAFETY: forwarded from the caller
    unsafe {
        let ptr = ffi::sqlite3_column_name(stmt, index);
        if ptr.is_null() {
            None
        } else {
            Some(CStr::from_ptr(ptr).to_string_lossy().into_owned())
        }
    }
}
