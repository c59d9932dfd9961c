//! sqlhandle - safe, RAII-managed handles over the SQLite C API.
//!
//! - [`Database`] opens a connection and closes it when dropped
//! - [`Statement`] compiles SQL, binds parameters by position or name, and is
//!   finalized when dropped
//! - [`ResultSet`] walks the rows of an executed statement
//!
//! Every fallible call returns [`Result`], and misuse of a closed handle is
//! reported as an error rather than undefined behavior.
//!
//! # Quick Start
//!
//! ```
//! use sqlhandle::prelude::*;
//!
//! # let dir = tempfile::tempdir().unwrap();
//!
//! let mut db = Database::new();
//! assert!(!db.is_open());
//! db.open(dir.path().join("test.db"))?;
//!
//! db.execute("CREATE TABLE IF NOT EXISTS test (id, value)")?;
//!
//! let mut insert = db.prepare("INSERT INTO test (id, value) VALUES (:id, ?)")?;
//! insert.bind(":id", 1)?;
//! insert.bind(2, "test value")?;
//! insert.execute()?;
//! assert_ne!(db.last_insert_rowid()?, 0);
//! drop(insert);
//!
//! let mut select = db.prepare("SELECT id, value FROM test")?;
//! let rows = select.execute()?;
//! assert_eq!(rows.read_int(0)?, 1);
//! assert_eq!(rows.read_string(1)?, "test value");
//! drop(rows);
//! drop(select);
//!
//! db.close()?;
//! # Ok::<(), sqlhandle::Error>(())
//! ```

pub use sqlhandle_core::{
    ColumnInfo, ConfigError, DatabaseError, DatabaseErrorKind, Error, FromValue, Openable,
    RangeError, RangeTarget, Result, Row, StateError, StateErrorKind, TypeError, Value,
};

pub use sqlhandle_sqlite::{
    BindIndex, ColumnType, Database, DatabaseConfig, MEMORY_PATH, OpenFlags, ResultSet,
    Statement, sqlite_version, sqlite_version_number,
};

/// Prelude module for convenient imports.
///
/// ```
/// use sqlhandle::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        // Handles
        BindIndex,
        Database,
        // Configuration
        DatabaseConfig,
        // Errors
        Error,
        FromValue,
        OpenFlags,
        // Lifecycle
        Openable,
        Result,
        ResultSet,
        // Data
        Row,
        Statement,
        Value,
    };
}
