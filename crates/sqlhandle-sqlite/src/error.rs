//! Translation of native result codes into [`sqlhandle_core::Error`].

use crate::ffi;
use sqlhandle_core::error::{DatabaseError, DatabaseErrorKind, RangeError, RangeTarget};
use sqlhandle_core::{Error, Result};
use std::ffi::c_int;

pub(crate) fn error_code_to_kind(code: c_int) -> DatabaseErrorKind {
    match code & 0xff {
        ffi::SQLITE_CONSTRAINT => DatabaseErrorKind::Constraint,
        ffi::SQLITE_BUSY => DatabaseErrorKind::Busy,
        ffi::SQLITE_LOCKED => DatabaseErrorKind::Locked,
        ffi::SQLITE_READONLY => DatabaseErrorKind::ReadOnly,
        ffi::SQLITE_PERM | ffi::SQLITE_AUTH => DatabaseErrorKind::Permission,
        ffi::SQLITE_NOTFOUND => DatabaseErrorKind::NotFound,
        ffi::SQLITE_CANTOPEN => DatabaseErrorKind::CantOpen,
        ffi::SQLITE_CORRUPT | ffi::SQLITE_NOTADB => DatabaseErrorKind::Corrupt,
        ffi::SQLITE_TOOBIG => DatabaseErrorKind::TooBig,
        ffi::SQLITE_INTERRUPT | ffi::SQLITE_ABORT => DatabaseErrorKind::Interrupted,
        ffi::SQLITE_MISUSE => DatabaseErrorKind::Misuse,
        ffi::SQLITE_MISMATCH => DatabaseErrorKind::Mismatch,
        _ => DatabaseErrorKind::Other,
    }
}

/// Error for a code with an explicit message.
pub(crate) fn database_error(
    code: c_int,
    extended_code: c_int,
    message: String,
    sql: Option<&str>,
) -> Error {
    // A stale extended code from an earlier call must not leak into this error
    let extended_code = if extended_code & 0xff == code & 0xff {
        extended_code
    } else {
        code
    };
    Error::Database(DatabaseError {
        kind: error_code_to_kind(code),
        code: code & 0xff,
        extended_code,
        message,
        sql: sql.map(str::to_string),
    })
}

/// Error for a code with the library's generic text for it.
pub(crate) fn code_error(code: c_int, sql: Option<&str>) -> Error {
    database_error(code, code, ffi::error_string(code).to_string(), sql)
}

/// Extended code of the last failure on `db`, or the primary `code` when the
/// connection was opened without extended result codes.
///
/// # Safety
/// `db` must be a valid connection handle.
pub(crate) unsafe fn extended_code(db: *mut ffi::sqlite3, code: c_int, extended: bool) -> c_int {
    if extended {
        // SAFETY: db is valid per the caller's contract
        unsafe { ffi::sqlite3_extended_errcode(db) }
    } else {
        code & 0xff
    }
}

/// Error for a code returned by a call on `db`, using the connection's
/// current message. `extended` selects whether the extended code is reported.
///
/// # Safety
/// `db` must be a valid connection handle or null.
pub(crate) unsafe fn connection_error(
    db: *mut ffi::sqlite3,
    code: c_int,
    extended: bool,
    sql: Option<&str>,
) -> Error {
    if db.is_null() {
        return code_error(code, sql);
    }
    // SAFETY: db is valid per the caller's contract
    let (message, extended) = unsafe { (ffi::errmsg(db), extended_code(db, code, extended)) };
    let message = if message.is_empty() {
        ffi::error_string(code).to_string()
    } else {
        message
    };
    database_error(code, extended, message, sql)
}

/// Map the result of a `sqlite3_bind_*` call.
///
/// # Safety
/// `db` must be a valid connection handle or null.
pub(crate) unsafe fn check_bind(
    db: *mut ffi::sqlite3,
    extended: bool,
    rc: c_int,
    index: c_int,
    parameter_count: usize,
) -> Result<()> {
    match rc & 0xff {
        ffi::SQLITE_OK => Ok(()),
        ffi::SQLITE_RANGE => Err(Error::Range(RangeError {
            target: RangeTarget::Parameter,
            index: i64::from(index),
            count: parameter_count,
        })),
        ffi::SQLITE_NOMEM => Err(Error::OutOfMemory),
        // SAFETY: forwarded from the caller
        _ => Err(unsafe { connection_error(db, rc, extended, None) }),
    }
}
