//! RAII handles over the SQLite C API.
//!
// FFI bindings require unsafe code
#![allow(unsafe_code)]
//!
//! Three handle types cover the whole lifecycle of a query:
//!
//! - [`Database`] owns a connection and closes it on drop
//! - [`Statement`] owns a prepared statement and borrows its `Database`
//! - [`ResultSet`] is a cursor that borrows its `Statement` mutably
//!
//! The borrows mean a statement can never outlive the connection it was
//! prepared on, and a cursor blocks rebinding until it is dropped.
//!
//! # Example
//!
//! ```
//! use sqlhandle_sqlite::Database;
//! use sqlhandle_core::Value;
//!
//! let db = Database::open_memory()?;
//! db.execute("CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT)")?;
//! let id = db.insert("INSERT INTO users (name) VALUES (?)", &[Value::from("Alice")])?;
//!
//! let mut stmt = db.prepare("SELECT name FROM users WHERE id = :id")?;
//! stmt.bind(":id", id)?;
//! let rows = stmt.execute()?;
//! assert_eq!(rows.read_string(0)?, "Alice");
//! # Ok::<(), sqlhandle_core::Error>(())
//! ```
//!
//! # Type Mapping
//!
//! | Rust Type | SQLite Type |
//! |-----------|-------------|
//! | `bool` | INTEGER (0/1) |
//! | `i8`, `i16`, `i32`, `i64` | INTEGER |
//! | `u8`, `u16`, `u32` | INTEGER |
//! | `f32`, `f64` | REAL |
//! | `String`, `&str` | TEXT |
//! | `Vec<u8>`, `&[u8]` | BLOB |
//! | `Option<T>` | NULL or T |
//!
//! # Thread Safety
//!
//! `Database` is `Send` but not `Sync`: a connection may move to another
//! thread but is only ever used from one at a time.

pub mod config;
pub mod database;
mod error;
pub mod ffi;
pub mod result_set;
pub mod statement;
pub mod types;

pub use config::{DatabaseConfig, MEMORY_PATH, OpenFlags};
pub use database::Database;
pub use result_set::ResultSet;
pub use statement::{BindIndex, Statement};
pub use types::ColumnType;

/// The linked SQLite library version, e.g. "3.46.0".
pub fn sqlite_version() -> &'static str {
    ffi::version()
}

/// The linked SQLite library version as a number, e.g. 3046000.
pub fn sqlite_version_number() -> i32 {
    ffi::version_number()
}
