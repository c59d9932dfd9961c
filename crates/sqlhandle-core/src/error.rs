//! Error types for sqlhandle operations.
//!
//! Every failure is reported as an [`Error`]. Failing result codes from the
//! engine become [`Error::Database`]. Misuse of the open/closed lifecycle
//! becomes [`Error::State`]. Bad indices and names get their own variants so
//! callers can match on them without parsing messages.

use std::fmt;

/// The primary error type for all sqlhandle operations.
#[derive(Debug)]
pub enum Error {
    /// The engine returned a failing result code
    Database(DatabaseError),
    /// Lifecycle misuse (closed object, double open, read without a row)
    State(StateError),
    /// Parameter or column index outside the statement's range
    Range(RangeError),
    /// Named parameter that the statement does not declare
    UnknownParameter(String),
    /// The engine could not allocate memory
    OutOfMemory,
    /// A Rust value that cannot be handed to the engine
    InvalidInput(String),
    /// Column value could not be converted to the requested type
    Type(TypeError),
    /// Configuration could not be loaded
    Config(ConfigError),
}

/// A failing result code reported by the engine.
#[derive(Debug, Clone)]
pub struct DatabaseError {
    pub kind: DatabaseErrorKind,
    /// Primary result code (low byte of the extended code)
    pub code: i32,
    /// Extended result code when the connection enables extended result
    /// codes, otherwise equal to `code`
    pub extended_code: i32,
    pub message: String,
    pub sql: Option<String>,
}

/// Coarse classification of engine result codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseErrorKind {
    /// UNIQUE, NOT NULL, CHECK or FOREIGN KEY violation
    Constraint,
    /// The database file is locked by another connection
    Busy,
    /// A table is locked within the same connection
    Locked,
    /// Write attempted on a read-only database
    ReadOnly,
    /// Access permission denied or authorizer refusal
    Permission,
    /// Unknown opcode or file control
    NotFound,
    /// The database file could not be opened
    CantOpen,
    /// The database image is malformed or not a database
    Corrupt,
    /// String or blob exceeds the size limit
    TooBig,
    /// Operation interrupted
    Interrupted,
    /// Library used incorrectly
    Misuse,
    /// Data type mismatch
    Mismatch,
    /// Any other engine error
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateError {
    pub kind: StateErrorKind,
    /// Object the operation was attempted on, e.g. "Database"
    pub object: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateErrorKind {
    /// The object has been closed or was never opened
    NotOpen,
    /// Open was called on an object that is already open
    AlreadyOpen,
    /// A column read was attempted while the cursor has no current row
    NoRow,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeError {
    pub target: RangeTarget,
    pub index: i64,
    /// Number of valid positions
    pub count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeTarget {
    /// 1-based bind parameter
    Parameter,
    /// 0-based result column
    Column,
}

#[derive(Debug, Clone)]
pub struct TypeError {
    pub expected: &'static str,
    pub actual: String,
    pub column: Option<String>,
}

#[derive(Debug)]
pub struct ConfigError {
    pub message: String,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl Error {
    pub(crate) fn state(kind: StateErrorKind, object: &'static str) -> Self {
        Error::State(StateError { kind, object })
    }

    /// Error for an operation on a closed object.
    pub fn not_open(object: &'static str) -> Self {
        Self::state(StateErrorKind::NotOpen, object)
    }

    /// Error for opening an object that is already open.
    pub fn already_open(object: &'static str) -> Self {
        Self::state(StateErrorKind::AlreadyOpen, object)
    }

    /// Error for reading from a cursor without a current row.
    pub fn no_row(object: &'static str) -> Self {
        Self::state(StateErrorKind::NoRow, object)
    }

    /// Primary engine result code, if this error came from the engine.
    pub fn code(&self) -> Option<i32> {
        match self {
            Error::Database(e) => Some(e.code),
            _ => None,
        }
    }

    /// Is this a lock contention error that a retry may resolve?
    pub fn is_busy(&self) -> bool {
        matches!(
            self,
            Error::Database(DatabaseError {
                kind: DatabaseErrorKind::Busy | DatabaseErrorKind::Locked,
                ..
            })
        )
    }

    /// Is this a lifecycle misuse rather than an engine failure?
    pub fn is_state_error(&self) -> bool {
        matches!(self, Error::State(_))
    }

    /// Get the SQL that caused this error, if available
    pub fn sql(&self) -> Option<&str> {
        match self {
            Error::Database(e) => e.sql.as_deref(),
            _ => None,
        }
    }
}

impl DatabaseErrorKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            DatabaseErrorKind::Constraint => "constraint",
            DatabaseErrorKind::Busy => "busy",
            DatabaseErrorKind::Locked => "locked",
            DatabaseErrorKind::ReadOnly => "read-only",
            DatabaseErrorKind::Permission => "permission",
            DatabaseErrorKind::NotFound => "not found",
            DatabaseErrorKind::CantOpen => "cannot open",
            DatabaseErrorKind::Corrupt => "corrupt",
            DatabaseErrorKind::TooBig => "too big",
            DatabaseErrorKind::Interrupted => "interrupted",
            DatabaseErrorKind::Misuse => "misuse",
            DatabaseErrorKind::Mismatch => "mismatch",
            DatabaseErrorKind::Other => "error",
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Database(e) => write!(f, "{}", e),
            Error::State(e) => write!(f, "{}", e),
            Error::Range(e) => write!(f, "{}", e),
            Error::UnknownParameter(name) => write!(f, "No such parameter: {}", name),
            Error::OutOfMemory => write!(f, "SQLite could not allocate memory"),
            Error::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
            Error::Type(e) => write!(f, "Type error: {}", e),
            Error::Config(e) => write!(f, "Configuration error: {}", e.message),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Config(e) => e
                .source
                .as_deref()
                .map(|err| err as &(dyn std::error::Error + 'static)),
            _ => None,
        }
    }
}

impl fmt::Display for DatabaseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SQLite error {} ({}): {}",
            self.code,
            self.kind.as_str(),
            self.message
        )
    }
}

impl fmt::Display for StateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            StateErrorKind::NotOpen => write!(f, "{} is not open", self.object),
            StateErrorKind::AlreadyOpen => write!(f, "{} is already open", self.object),
            StateErrorKind::NoRow => write!(f, "{} has no current row to read", self.object),
        }
    }
}

impl fmt::Display for RangeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.target {
            RangeTarget::Parameter => write!(
                f,
                "Bind index {} out of range (statement has {} parameters)",
                self.index, self.count
            ),
            RangeTarget::Column => write!(
                f,
                "Column index {} out of range (row has {} columns)",
                self.index, self.count
            ),
        }
    }
}

impl fmt::Display for TypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(col) = &self.column {
            write!(
                f,
                "expected {} for column '{}', found {}",
                self.expected, col, self.actual
            )
        } else {
            write!(f, "expected {}, found {}", self.expected, self.actual)
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for DatabaseError {}

impl From<DatabaseError> for Error {
    fn from(err: DatabaseError) -> Self {
        Error::Database(err)
    }
}

impl From<StateError> for Error {
    fn from(err: StateError) -> Self {
        Error::State(err)
    }
}

impl From<RangeError> for Error {
    fn from(err: RangeError) -> Self {
        Error::Range(err)
    }
}

impl From<TypeError> for Error {
    fn from(err: TypeError) -> Self {
        Error::Type(err)
    }
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        Error::Config(err)
    }
}

/// Result type alias for sqlhandle operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    fn busy() -> Error {
        Error::Database(DatabaseError {
            kind: DatabaseErrorKind::Busy,
            code: 5,
            extended_code: 5,
            message: "database is locked".to_string(),
            sql: Some("INSERT INTO t VALUES (1)".to_string()),
        })
    }

    #[test]
    fn database_error_helpers() {
        let err = busy();
        assert!(err.is_busy());
        assert!(!err.is_state_error());
        assert_eq!(err.code(), Some(5));
        assert_eq!(err.sql(), Some("INSERT INTO t VALUES (1)"));
        assert_eq!(
            err.to_string(),
            "SQLite error 5 (busy): database is locked"
        );
    }

    #[test]
    fn state_errors_name_the_object() {
        assert_eq!(Error::not_open("Database").to_string(), "Database is not open");
        assert_eq!(
            Error::already_open("Database").to_string(),
            "Database is already open"
        );
        let err = Error::no_row("Statement");
        assert!(err.is_state_error());
        assert_eq!(err.code(), None);
        assert_eq!(err.to_string(), "Statement has no current row to read");
    }

    #[test]
    fn range_and_parameter_messages() {
        let err = Error::Range(RangeError {
            target: RangeTarget::Parameter,
            index: 3,
            count: 2,
        });
        assert_eq!(
            err.to_string(),
            "Bind index 3 out of range (statement has 2 parameters)"
        );
        let err = Error::UnknownParameter(":missing".to_string());
        assert_eq!(err.to_string(), "No such parameter: :missing");
    }

    #[test]
    fn config_error_exposes_source() {
        use std::error::Error as _;

        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err = Error::Config(ConfigError {
            message: "could not read config".to_string(),
            source: Some(Box::new(io)),
        });
        assert!(err.source().is_some());
        assert!(busy().source().is_none());
    }
}
