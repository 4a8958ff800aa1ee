//! Error types for the entities facade.

use entities_migrate::MigrationError;
use entities_schema::SchemaError;
use entities_sqlite::SqliteError;
use thiserror::Error;

/// Result type alias for entities operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while opening a context or accessing rows.
#[derive(Debug, Error)]
pub enum Error {
    /// Declaration, conversion or configuration error.
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// Storage operation error.
    #[error(transparent)]
    Sqlite(#[from] SqliteError),

    /// Reconciliation or migration error.
    #[error(transparent)]
    Migration(#[from] MigrationError),

    /// Record serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The table was never declared on this context.
    #[error("Table '{0}' is not declared")]
    UnknownTable(String),

    /// A row that isn't a JSON object.
    #[error("Invalid row for table '{table}': {message}")]
    InvalidRow {
        /// Table name.
        table: String,
        /// What is wrong with the row.
        message: String,
    },
}

impl Error {
    /// Create an invalid row error.
    pub fn invalid_row(table: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidRow {
            table: table.into(),
            message: message.into(),
        }
    }

    /// Check if this is a storage operation error.
    pub fn is_storage(&self) -> bool {
        match self {
            Self::Sqlite(_) => true,
            Self::Migration(e) => e.is_storage(),
            _ => false,
        }
    }

    /// Check if this is a value conversion error.
    pub fn is_conversion(&self) -> bool {
        match self {
            Self::Schema(e) => e.is_conversion(),
            Self::Migration(MigrationError::Schema(e)) => e.is_conversion(),
            _ => false,
        }
    }

    /// Check if this is a declaration error.
    pub fn is_declaration(&self) -> bool {
        match self {
            Self::Schema(e) => e.is_declaration(),
            Self::Migration(MigrationError::Schema(e)) => e.is_declaration(),
            _ => false,
        }
    }
}
