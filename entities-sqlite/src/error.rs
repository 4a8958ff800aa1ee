//! Error types for the storage layer.

use std::fmt;

/// Result type for storage operations.
pub type SqliteResult<T> = Result<T, SqliteError>;

/// Errors raised by the storage layer.
#[derive(Debug)]
pub enum SqliteError {
    /// A statement failed inside SQLite.
    Sqlite(tokio_rusqlite::Error),
    /// The connection string or one of its options is invalid.
    Config(String),
    /// The database could not be opened.
    Open {
        /// Database location.
        path: String,
        /// Reason reported by the driver.
        message: String,
    },
    /// `sqlite_master` returned something unexpected.
    Catalog(String),
    /// A query produced an unusable result.
    Query(String),
}

impl SqliteError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an open error.
    pub fn open(path: impl Into<String>, msg: impl fmt::Display) -> Self {
        Self::Open {
            path: path.into(),
            message: msg.to_string(),
        }
    }

    /// Create a catalog error.
    pub fn catalog(msg: impl Into<String>) -> Self {
        Self::Catalog(msg.into())
    }

    /// Create a query error.
    pub fn query(msg: impl Into<String>) -> Self {
        Self::Query(msg.into())
    }

    /// Whether SQLite itself rejected a statement.
    pub fn is_engine_error(&self) -> bool {
        matches!(self, Self::Sqlite(_))
    }

    /// Whether a constraint (unique, foreign key, not null) was violated.
    pub fn is_constraint_violation(&self) -> bool {
        match self {
            Self::Sqlite(tokio_rusqlite::Error::Rusqlite(rusqlite::Error::SqliteFailure(e, _))) => {
                e.code == rusqlite::ErrorCode::ConstraintViolation
            }
            _ => false,
        }
    }
}

impl fmt::Display for SqliteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sqlite(e) => write!(f, "SQLite error: {}", e),
            Self::Config(msg) => write!(f, "Invalid database configuration: {}", msg),
            Self::Open { path, message } => write!(f, "Failed to open '{}': {}", path, message),
            Self::Catalog(msg) => write!(f, "Unexpected catalog entry: {}", msg),
            Self::Query(msg) => write!(f, "Query error: {}", msg),
        }
    }
}

impl std::error::Error for SqliteError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Sqlite(e) => Some(e),
            _ => None,
        }
    }
}

impl From<tokio_rusqlite::Error> for SqliteError {
    fn from(err: tokio_rusqlite::Error) -> Self {
        Self::Sqlite(err)
    }
}

impl From<rusqlite::Error> for SqliteError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Sqlite(tokio_rusqlite::Error::Rusqlite(err))
    }
}
