//! Error types for table declaration, value conversion and configuration.

// These warnings are false positives - the fields are used by derive macros
#![allow(unused_assignments)]

use miette::Diagnostic;
use thiserror::Error;

/// Result type for schema operations.
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Errors raised while declaring tables, generating DDL or converting values.
#[derive(Error, Debug, Diagnostic)]
pub enum SchemaError {
    /// Error reading a file.
    #[error("failed to read file: {path}")]
    #[diagnostic(code(entities::schema::io_error))]
    IoError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Error parsing a TOML configuration file.
    #[error("invalid configuration: {source}")]
    #[diagnostic(code(entities::schema::toml_error))]
    TomlError {
        #[source]
        source: toml::de::Error,
    },

    /// Malformed table model.
    #[error("invalid table model `{name}`: {message}")]
    #[diagnostic(code(entities::schema::invalid_model))]
    InvalidModel { name: String, message: String },

    /// Malformed column declaration.
    #[error("invalid column `{table}.{column}`: {message}")]
    #[diagnostic(code(entities::schema::invalid_column))]
    InvalidColumn {
        table: String,
        column: String,
        message: String,
    },

    /// Duplicate declaration.
    #[error("duplicate {kind} `{name}`")]
    #[diagnostic(code(entities::schema::duplicate))]
    Duplicate { kind: String, name: String },

    /// Name reserved for the engine's own bookkeeping.
    #[error("`{name}` is a reserved table name")]
    #[diagnostic(
        code(entities::schema::reserved_name),
        help("`entities_master` and names starting with `sqlite_` belong to the engine")
    )]
    ReservedName { name: String },

    /// A value could not be mapped to or from its declared column type.
    #[error("can't convert value for `{table}.{column}` to {target}: {message}")]
    #[diagnostic(code(entities::schema::conversion))]
    Conversion {
        table: String,
        column: String,
        target: String,
        message: String,
    },

    /// The column is not part of any declared scheme.
    #[error("unable to convert an unknown type: `{table}.{column}` is not declared")]
    #[diagnostic(code(entities::schema::unknown_column))]
    UnknownColumn { table: String, column: String },
}

impl SchemaError {
    /// Create an invalid model error.
    pub fn invalid_model(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidModel {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Create an invalid column error.
    pub fn invalid_column(
        table: impl Into<String>,
        column: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidColumn {
            table: table.into(),
            column: column.into(),
            message: message.into(),
        }
    }

    /// Create a duplicate declaration error.
    pub fn duplicate(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self::Duplicate {
            kind: kind.into(),
            name: name.into(),
        }
    }

    /// Create a conversion error.
    pub fn conversion(
        table: impl Into<String>,
        column: impl Into<String>,
        target: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Conversion {
            table: table.into(),
            column: column.into(),
            target: target.into(),
            message: message.into(),
        }
    }

    /// Create an unknown column error.
    pub fn unknown_column(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self::UnknownColumn {
            table: table.into(),
            column: column.into(),
        }
    }

    /// Whether this error was raised while declaring a model.
    pub fn is_declaration(&self) -> bool {
        matches!(
            self,
            Self::InvalidModel { .. }
                | Self::InvalidColumn { .. }
                | Self::Duplicate { .. }
                | Self::ReservedName { .. }
        )
    }

    /// Whether this error was raised while converting a value.
    pub fn is_conversion(&self) -> bool {
        matches!(self, Self::Conversion { .. } | Self::UnknownColumn { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversion_display_names_column() {
        let err = SchemaError::conversion("users", "active", "boolean", "got 7");
        let msg = err.to_string();
        assert!(msg.contains("users.active"));
        assert!(msg.contains("boolean"));
    }

    #[test]
    fn test_unknown_column_display() {
        let err = SchemaError::unknown_column("users", "nickname");
        assert!(err.to_string().contains("unknown type"));
        assert!(err.is_conversion());
        assert!(!err.is_declaration());
    }

    #[test]
    fn test_declaration_classification() {
        assert!(SchemaError::invalid_model("t", "no columns").is_declaration());
        assert!(SchemaError::duplicate("table", "t").is_declaration());
        assert!(
            SchemaError::ReservedName {
                name: "entities_master".into()
            }
            .is_declaration()
        );
    }
}
