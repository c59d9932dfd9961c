//! Low-level access to libsqlite3.
//!
//! The raw declarations come from `libsqlite3-sys`. This module narrows them
//! to what the handles need and adds a few safe helpers for strings the
//! library hands back.

#![allow(non_camel_case_types)]

use std::ffi::{CStr, c_int};

pub use libsqlite3_sys::{
    SQLITE_TRANSIENT, sqlite3, sqlite3_stmt,
    // Connection management
    sqlite3_busy_timeout, sqlite3_close, sqlite3_extended_result_codes,
    sqlite3_get_autocommit, sqlite3_open_v2,
    // Error handling
    sqlite3_errcode, sqlite3_errmsg, sqlite3_errstr, sqlite3_extended_errcode,
    // Statement lifecycle
    sqlite3_clear_bindings, sqlite3_finalize, sqlite3_prepare_v2, sqlite3_reset, sqlite3_step,
    // Parameter binding
    sqlite3_bind_blob, sqlite3_bind_double, sqlite3_bind_int, sqlite3_bind_int64,
    sqlite3_bind_null, sqlite3_bind_parameter_count, sqlite3_bind_parameter_index,
    sqlite3_bind_parameter_name, sqlite3_bind_text,
    // Result columns
    sqlite3_column_blob, sqlite3_column_bytes, sqlite3_column_count, sqlite3_column_double,
    sqlite3_column_int, sqlite3_column_int64, sqlite3_column_name, sqlite3_column_text,
    sqlite3_column_type, sqlite3_data_count,
    // Execution helpers
    sqlite3_exec, sqlite3_free,
    // Metadata
    sqlite3_changes, sqlite3_last_insert_rowid, sqlite3_total_changes,
    // Version info
    sqlite3_libversion, sqlite3_libversion_number,
};

pub use libsqlite3_sys::{
    // Result codes
    SQLITE_ABORT, SQLITE_AUTH, SQLITE_BUSY, SQLITE_CANTOPEN, SQLITE_CONSTRAINT, SQLITE_CORRUPT,
    SQLITE_DONE, SQLITE_ERROR, SQLITE_INTERRUPT, SQLITE_LOCKED, SQLITE_MISMATCH, SQLITE_MISUSE,
    SQLITE_NOMEM, SQLITE_NOTADB, SQLITE_NOTFOUND, SQLITE_OK, SQLITE_PERM, SQLITE_RANGE,
    SQLITE_READONLY, SQLITE_ROW, SQLITE_TOOBIG,
    // sqlite3_open_v2 flags
    SQLITE_OPEN_CREATE, SQLITE_OPEN_FULLMUTEX, SQLITE_OPEN_MEMORY, SQLITE_OPEN_NOMUTEX,
    SQLITE_OPEN_PRIVATECACHE, SQLITE_OPEN_READONLY, SQLITE_OPEN_READWRITE,
    SQLITE_OPEN_SHAREDCACHE, SQLITE_OPEN_URI,
    // Fundamental data types
    SQLITE_BLOB, SQLITE_FLOAT, SQLITE_INTEGER, SQLITE_NULL, SQLITE_TEXT,
};

/// Get the SQLite library version as a string.
pub fn version() -> &'static str {
    // SAFETY: sqlite3_libversion returns a pointer to a static string
    unsafe {
        let ptr = sqlite3_libversion();
        CStr::from_ptr(ptr).to_str().unwrap_or("unknown")
    }
}

/// Get the SQLite library version as a number, e.g. 3045000 for 3.45.0.
pub fn version_number() -> i32 {
    // SAFETY: sqlite3_libversion_number has no preconditions
    unsafe { sqlite3_libversion_number() }
}

/// The library's generic English text for a result code.
pub fn error_string(code: c_int) -> &'static str {
    // SAFETY: sqlite3_errstr returns a static string for any input code
    unsafe {
        let ptr = sqlite3_errstr(code);
        if ptr.is_null() {
            return "unknown error";
        }
        CStr::from_ptr(ptr).to_str().unwrap_or("unknown error")
    }
}

/// The most recent error message recorded on a connection.
///
/// # Safety
/// `db` must be a valid connection handle (possibly one whose open failed,
/// which is still valid until closed).
pub unsafe fn errmsg(db: *mut sqlite3) -> String {
    // SAFETY: guaranteed by the caller
    unsafe {
        let ptr = sqlite3_errmsg(db);
        if ptr.is_null() {
            return String::new();
        }
        CStr::from_ptr(ptr).to_string_lossy().into_owned()
    }
}
