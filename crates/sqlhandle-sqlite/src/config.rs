//! Connection configuration.
//!
//! A [`DatabaseConfig`] can be built in code or loaded from JSON:
//!
//! ```
//! use sqlhandle_sqlite::DatabaseConfig;
//!
//! let config = DatabaseConfig::from_json(
//!     r#"{ "path": "app.db", "flags": { "read_only": true }, "busy_timeout_ms": 250 }"#,
//! )
//! .unwrap();
//! assert_eq!(config.path, "app.db");
//! assert!(config.flags.read_only);
//! ```

use crate::ffi;
use serde::{Deserialize, Serialize};
use sqlhandle_core::error::ConfigError;
use sqlhandle_core::{Error, Result};
use std::ffi::c_int;

/// Path SQLite treats as a private, in-memory database.
pub const MEMORY_PATH: &str = ":memory:";

const DEFAULT_BUSY_TIMEOUT_MS: u32 = 5000;

/// Configuration for opening a database connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Path to the database file, or ":memory:" for an in-memory database.
    pub path: String,
    /// Open flags (read-only, read-write, create, etc.)
    pub flags: OpenFlags,
    /// Busy timeout in milliseconds. Zero disables the busy handler.
    pub busy_timeout_ms: u32,
    /// Report extended result codes (e.g. SQLITE_CONSTRAINT_UNIQUE).
    pub extended_result_codes: bool,
}

/// Flags controlling how the database is opened.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenFlags {
    /// Open for reading only.
    pub read_only: bool,
    /// Open for reading and writing.
    pub read_write: bool,
    /// Create the database if it doesn't exist.
    pub create: bool,
    /// Enable URI filename interpretation.
    pub uri: bool,
    /// Multi-thread mode: the connection must not be used from two threads at once.
    pub no_mutex: bool,
    /// Serialized mode.
    pub full_mutex: bool,
    /// Enable shared cache mode.
    pub shared_cache: bool,
    /// Disable shared cache mode.
    pub private_cache: bool,
}

impl OpenFlags {
    pub fn read_only() -> Self {
        Self {
            read_only: true,
            ..Default::default()
        }
    }

    /// Read-write access to an existing database.
    pub fn read_write() -> Self {
        Self {
            read_write: true,
            ..Default::default()
        }
    }

    /// Read-write access, creating the file if needed.
    pub fn create_read_write() -> Self {
        Self {
            read_write: true,
            create: true,
            ..Default::default()
        }
    }

    pub(crate) fn to_sqlite_flags(self) -> c_int {
        let mut flags = 0;

        if self.read_only {
            flags |= ffi::SQLITE_OPEN_READONLY;
        }
        if self.read_write {
            flags |= ffi::SQLITE_OPEN_READWRITE;
        }
        if self.create {
            flags |= ffi::SQLITE_OPEN_CREATE;
        }
        if self.uri {
            flags |= ffi::SQLITE_OPEN_URI;
        }
        if self.no_mutex {
            flags |= ffi::SQLITE_OPEN_NOMUTEX;
        }
        if self.full_mutex {
            flags |= ffi::SQLITE_OPEN_FULLMUTEX;
        }
        if self.shared_cache {
            flags |= ffi::SQLITE_OPEN_SHAREDCACHE;
        }
        if self.private_cache {
            flags |= ffi::SQLITE_OPEN_PRIVATECACHE;
        }

        // No access mode requested: behave like sqlite3_open
        if flags & (ffi::SQLITE_OPEN_READONLY | ffi::SQLITE_OPEN_READWRITE) == 0 {
            flags |= ffi::SQLITE_OPEN_READWRITE | ffi::SQLITE_OPEN_CREATE;
        }

        flags
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: MEMORY_PATH.to_string(),
            flags: OpenFlags::create_read_write(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            extended_result_codes: false,
        }
    }
}

impl DatabaseConfig {
    /// Config for a file-based database, created if missing.
    pub fn file(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    /// Config for a private in-memory database.
    pub fn memory() -> Self {
        Self::default()
    }

    /// Load a config from a JSON document. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| {
            Error::Config(ConfigError {
                message: format!("invalid database config: {}", e),
                source: Some(Box::new(e)),
            })
        })
    }

    pub fn flags(mut self, flags: OpenFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn busy_timeout(mut self, ms: u32) -> Self {
        self.busy_timeout_ms = ms;
        self
    }

    pub fn extended_result_codes(mut self, enabled: bool) -> Self {
        self.extended_result_codes = enabled;
        self
    }

    pub fn is_memory(&self) -> bool {
        self.path == MEMORY_PATH
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_mapping() {
        assert_eq!(
            OpenFlags::read_only().to_sqlite_flags(),
            ffi::SQLITE_OPEN_READONLY
        );
        assert_eq!(
            OpenFlags::create_read_write().to_sqlite_flags(),
            ffi::SQLITE_OPEN_READWRITE | ffi::SQLITE_OPEN_CREATE
        );
        let uri = OpenFlags {
            uri: true,
            ..OpenFlags::read_write()
        };
        assert_eq!(
            uri.to_sqlite_flags(),
            ffi::SQLITE_OPEN_READWRITE | ffi::SQLITE_OPEN_URI
        );
    }

    #[test]
    fn test_empty_flags_default_to_create() {
        assert_eq!(
            OpenFlags::default().to_sqlite_flags(),
            ffi::SQLITE_OPEN_READWRITE | ffi::SQLITE_OPEN_CREATE
        );
    }

    #[test]
    fn test_builders() {
        let config = DatabaseConfig::file("data.db")
            .flags(OpenFlags::read_write())
            .busy_timeout(0)
            .extended_result_codes(true);
        assert_eq!(config.path, "data.db");
        assert_eq!(config.flags, OpenFlags::read_write());
        assert_eq!(config.busy_timeout_ms, 0);
        assert!(config.extended_result_codes);
        assert!(!config.is_memory());
        assert!(DatabaseConfig::memory().is_memory());
    }

    #[test]
    fn test_from_json_fills_defaults() {
        let config = DatabaseConfig::from_json(r#"{ "path": "x.db" }"#).unwrap();
        assert_eq!(config.path, "x.db");
        assert_eq!(config.flags, OpenFlags::create_read_write());
        assert_eq!(config.busy_timeout_ms, DEFAULT_BUSY_TIMEOUT_MS);

        let config = DatabaseConfig::from_json("{}").unwrap();
        assert_eq!(config, DatabaseConfig::default());
    }

    #[test]
    fn test_from_json_rejects_garbage() {
        let err = DatabaseConfig::from_json(r#"{ "busy_timeout_ms": "soon" }"#).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().starts_with("Configuration error: invalid database config"));
    }
}
