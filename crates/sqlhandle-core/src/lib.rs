//! Core types and traits for sqlhandle.
//!
//! This crate holds the engine-independent half of the library:
//!
//! - `Error` and the typed error-translation policy
//! - `Value` for the five SQLite storage classes
//! - `Row`/`FromValue` for owned result rows
//! - `Openable` for the open/closed lifecycle contract

pub mod error;
pub mod lifecycle;
pub mod row;
pub mod value;

pub use error::{
    ConfigError, DatabaseError, DatabaseErrorKind, Error, RangeError, RangeTarget, Result,
    StateError, StateErrorKind, TypeError,
};
pub use lifecycle::Openable;
pub use row::{ColumnInfo, FromValue, Row};
pub use value::Value;
