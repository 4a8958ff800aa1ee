//! Error types for reconciliation and migration.

use entities_schema::SchemaError;
use entities_sqlite::SqliteError;
use thiserror::Error;

use crate::diff::Difference;

/// Result type alias for migration operations.
pub type MigrateResult<T> = Result<T, MigrationError>;

/// Errors that can occur while reconciling or migrating the schema.
#[derive(Debug, Error)]
pub enum MigrationError {
    /// Database operation error.
    #[error("Database error: {0}")]
    Storage(#[from] SqliteError),

    /// Declaration or conversion error.
    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    /// The change can't be expressed as a migration (renames, removals).
    #[error("Unsupported migration of table '{table}': {message}")]
    Unsupported {
        /// Table name.
        table: String,
        /// What is unsupported.
        message: String,
    },

    /// A manual migration session was rejected.
    #[error("Migration rejected: {0}")]
    Rejected(String),

    /// Differences were found under the halt policy.
    #[error("Schema differences found, halting: {}", describe(.differences))]
    Halted {
        /// The differences found.
        differences: Vec<Difference>,
    },

    /// A session was accepted without acknowledging every difference.
    #[error("Migration accepted with unacknowledged differences: {}", .0.join(", "))]
    Unacknowledged(Vec<String>),

    /// Differences need a manual migration but no handler was registered.
    #[error("No migration handler registered for: {}", describe(.differences))]
    NoHandler {
        /// The differences found.
        differences: Vec<Difference>,
    },

    /// Misuse of a migration session.
    #[error("Migration session error: {0}")]
    Session(String),

    /// The fingerprint store doesn't have the expected layout.
    #[error("Fingerprint store error: {0}")]
    StoreLayout(String),

    /// A stored scheme could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

fn describe(differences: &[Difference]) -> String {
    differences
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl MigrationError {
    /// Create an unsupported migration error.
    pub fn unsupported(table: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Unsupported {
            table: table.into(),
            message: message.into(),
        }
    }

    /// Create a session error.
    pub fn session(msg: impl Into<String>) -> Self {
        Self::Session(msg.into())
    }

    /// Create a store layout error.
    pub fn store_layout(msg: impl Into<String>) -> Self {
        Self::StoreLayout(msg.into())
    }

    /// Whether the error came from the storage engine.
    pub fn is_storage(&self) -> bool {
        matches!(self, Self::Storage(_))
    }

    /// Whether the error must abort startup.
    ///
    /// Storage errors are reported and left to the caller; everything else
    /// means the schema can't be trusted.
    pub fn is_fatal(&self) -> bool {
        !self.is_storage()
    }

    /// The differences carried by the error, if any.
    pub fn differences(&self) -> &[Difference] {
        match self {
            Self::Halted { differences } | Self::NoHandler { differences } => differences,
            _ => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_halted_display_lists_differences() {
        let err = MigrationError::Halted {
            differences: vec![
                Difference::physical("users", "table altered outside its model"),
                Difference::object("posts", "table altered by its model"),
            ],
        };
        let msg = err.to_string();
        assert!(msg.contains("users"));
        assert!(msg.contains("posts"));
        assert_eq!(err.differences().len(), 2);
    }

    #[test]
    fn test_unsupported_display() {
        let err = MigrationError::unsupported("t", "column rename");
        assert!(err.to_string().contains("'t'"));
        assert!(err.to_string().contains("column rename"));
    }

    #[test]
    fn test_is_fatal() {
        assert!(!MigrationError::Storage(SqliteError::query("boom")).is_fatal());
        assert!(MigrationError::Rejected("no".into()).is_fatal());
        assert!(MigrationError::Unacknowledged(vec!["t".into()]).is_fatal());
    }
}
