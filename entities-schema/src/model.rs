//! Table model declarations.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{SchemaError, SchemaResult};
use crate::kind::ColumnKind;

/// Name of the table the engine keeps its fingerprints in.
pub const MASTER_TABLE: &str = "entities_master";

/// Check whether a name is reserved for the engine itself.
pub fn is_reserved_name(name: &str) -> bool {
    name.eq_ignore_ascii_case(MASTER_TABLE) || name.to_ascii_lowercase().starts_with("sqlite_")
}

/// Check whether a name is a plain SQL identifier.
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// A foreign key target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKey {
    /// Referenced table.
    pub table: String,
    /// Referenced column.
    pub column: String,
}

impl ForeignKey {
    /// Create a new foreign key target.
    pub fn new(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            column: column.into(),
        }
    }
}

/// Per-column overrides of the inferred column definition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ColumnMapping {
    /// Explicit physical type.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub sql_type: Option<String>,
    /// Explicit nullability. Only `Some(false)` changes the generated DDL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nullable: Option<bool>,
    /// Add a named uniqueness constraint.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub unique: bool,
    /// Add a foreign key constraint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub foreign: Option<ForeignKey>,
}

impl ColumnMapping {
    /// Create an empty mapping.
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the physical type.
    pub fn sql_type(mut self, sql_type: impl Into<String>) -> Self {
        self.sql_type = Some(sql_type.into());
        self
    }

    /// Set nullability.
    pub fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = Some(nullable);
        self
    }

    /// Mark the column `NOT NULL`.
    pub fn not_null(self) -> Self {
        self.nullable(false)
    }

    /// Mark the column unique.
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Reference another table's column.
    pub fn references(mut self, table: impl Into<String>, column: impl Into<String>) -> Self {
        self.foreign = Some(ForeignKey::new(table, column));
        self
    }

    /// Whether the mapping forces `NOT NULL`.
    pub fn is_not_null(&self) -> bool {
        self.nullable == Some(false)
    }
}

/// A declared column.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    name: String,
    sample: Value,
    kind: ColumnKind,
}

impl Column {
    /// Create a column, inferring its kind from the sample.
    pub fn new(name: impl Into<String>, sample: Value) -> Self {
        let kind = ColumnKind::infer(&sample);
        Self {
            name: name.into(),
            sample,
            kind,
        }
    }

    /// Column name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The representative sample the column was declared with.
    pub fn sample(&self) -> &Value {
        &self.sample
    }

    /// The inferred kind.
    pub fn kind(&self) -> ColumnKind {
        self.kind
    }
}

/// A declared logical table.
///
/// ```
/// use entities_schema::{ColumnMapping, TableModel};
/// use serde_json::json;
///
/// let model = TableModel::new("users")
///     .column("id", json!(0))
///     .column_with("email", json!(""), ColumnMapping::new().unique())
///     .column("active", json!(false));
///
/// assert_eq!(model.primary_column().map(|c| c.name()), Some("id"));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct TableModel {
    name: String,
    columns: Vec<Column>,
    mapping: IndexMap<String, ColumnMapping>,
    primary: Option<String>,
}

impl TableModel {
    /// Create an empty model.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            mapping: IndexMap::new(),
            primary: None,
        }
    }

    /// Build a model from a scheme object of `column -> sample` pairs.
    pub fn from_json(name: impl Into<String>, scheme: Value) -> SchemaResult<Self> {
        let name = name.into();
        match scheme {
            Value::Object(map) => Ok(map
                .into_iter()
                .fold(Self::new(name), |model, (column, sample)| {
                    model.column(column, sample)
                })),
            other => Err(SchemaError::invalid_model(
                name,
                format!("scheme must be an object, got {}", other),
            )),
        }
    }

    /// Build a model from a full declaration object:
    /// `{"name": .., "scheme": {..}, "mapping": {..}, "primary": ..}`.
    ///
    /// Both `name` and `scheme` are mandatory.
    pub fn from_declaration(declaration: &Value) -> SchemaResult<Self> {
        let name = declaration
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| SchemaError::invalid_model("<unnamed>", "missing table name"))?;

        let scheme = declaration
            .get("scheme")
            .cloned()
            .ok_or_else(|| SchemaError::invalid_model(name, "missing scheme"))?;

        let mut model = Self::from_json(name, scheme)?;

        if let Some(mapping) = declaration.get("mapping") {
            let mapping: IndexMap<String, ColumnMapping> =
                serde_json::from_value(mapping.clone()).map_err(|e| {
                    SchemaError::invalid_model(name, format!("invalid mapping: {}", e))
                })?;
            for (column, m) in mapping {
                model = model.map(column, m);
            }
        }

        match declaration.get("primary") {
            None | Some(Value::Null) => {}
            Some(Value::String(primary)) => model = model.primary(primary.as_str()),
            Some(other) => {
                return Err(SchemaError::invalid_model(
                    name,
                    format!("primary must be a column name, got {}", other),
                ));
            }
        }

        Ok(model)
    }

    /// Declare a column.
    pub fn column(mut self, name: impl Into<String>, sample: Value) -> Self {
        self.columns.push(Column::new(name, sample));
        self
    }

    /// Declare a column together with its mapping.
    pub fn column_with(self, name: impl Into<String>, sample: Value, mapping: ColumnMapping) -> Self {
        let name = name.into();
        self.column(name.clone(), sample).map(name, mapping)
    }

    /// Set the mapping of a column.
    pub fn map(mut self, column: impl Into<String>, mapping: ColumnMapping) -> Self {
        self.mapping.insert(column.into(), mapping);
        self
    }

    /// Set the primary key column.
    pub fn primary(mut self, column: impl Into<String>) -> Self {
        self.primary = Some(column.into());
        self
    }

    /// Table name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared columns, in declaration order.
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Get a column by name.
    pub fn get_column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Get the mapping of a column.
    pub fn mapping(&self, column: &str) -> Option<&ColumnMapping> {
        self.mapping.get(column)
    }

    /// The primary key column: the explicit one, else the first declared.
    pub fn primary_column(&self) -> Option<&Column> {
        match &self.primary {
            Some(primary) => self.get_column(primary),
            None => self.columns.first(),
        }
    }

    /// Whether a column is the primary key.
    pub fn is_primary(&self, column: &str) -> bool {
        self.primary_column().is_some_and(|c| c.name == column)
    }

    /// The physical type of a column: its mapping override, else the inferred type.
    pub fn sql_type(&self, column: &Column) -> String {
        self.mapping(&column.name)
            .and_then(|m| m.sql_type.clone())
            .unwrap_or_else(|| column.kind.physical_type().to_string())
    }

    /// The scheme as a JSON object of `column -> sample`.
    pub fn scheme(&self) -> Map<String, Value> {
        self.columns
            .iter()
            .map(|c| (c.name.clone(), c.sample.clone()))
            .collect()
    }

    /// Check the declaration for errors.
    pub fn validate(&self) -> SchemaResult<()> {
        if self.name.is_empty() {
            return Err(SchemaError::invalid_model("<unnamed>", "missing table name"));
        }
        if !is_identifier(&self.name) {
            return Err(SchemaError::invalid_model(
                &self.name,
                "table name must be a plain identifier",
            ));
        }
        if is_reserved_name(&self.name) {
            return Err(SchemaError::ReservedName {
                name: self.name.clone(),
            });
        }
        if self.columns.is_empty() {
            return Err(SchemaError::invalid_model(&self.name, "missing scheme"));
        }

        let mut seen = std::collections::HashSet::new();
        for column in &self.columns {
            if !is_identifier(&column.name) {
                return Err(SchemaError::invalid_column(
                    &self.name,
                    &column.name,
                    "column name must be a plain identifier",
                ));
            }
            if !seen.insert(column.name.as_str()) {
                return Err(SchemaError::duplicate(
                    "column",
                    format!("{}.{}", self.name, column.name),
                ));
            }
        }

        if let Some(primary) = &self.primary {
            if self.get_column(primary).is_none() {
                return Err(SchemaError::invalid_column(
                    &self.name,
                    primary,
                    "primary key names an undeclared column",
                ));
            }
        }

        // AUTOINCREMENT is only accepted on an INTEGER PRIMARY KEY.
        if let Some(primary) = self.primary_column() {
            if !self.sql_type(primary).eq_ignore_ascii_case("INTEGER") {
                return Err(SchemaError::invalid_column(
                    &self.name,
                    primary.name(),
                    "primary key column must have INTEGER type",
                ));
            }
        }

        for (column, mapping) in &self.mapping {
            if self.get_column(column).is_none() {
                return Err(SchemaError::invalid_column(
                    &self.name,
                    column,
                    "mapping names an undeclared column",
                ));
            }
            if let Some(fk) = &mapping.foreign {
                if !is_identifier(&fk.table) || !is_identifier(&fk.column) {
                    return Err(SchemaError::invalid_column(
                        &self.name,
                        column,
                        "foreign key must reference plain identifiers",
                    ));
                }
            }
        }

        Ok(())
    }
}
