//! The schema registry.

use indexmap::IndexMap;
use serde_json::Value;

use crate::error::{SchemaError, SchemaResult};
use crate::model::{Column, TableModel};
use crate::value::StoredValue;

/// The ordered set of declared table models.
///
/// The registry is the single place models are looked up by name; it is
/// passed explicitly to the DDL generator, the reconciliation engine and the
/// row mapper.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    tables: IndexMap<String, TableModel>,
}

impl SchemaRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and register a model.
    pub fn register(&mut self, model: TableModel) -> SchemaResult<()> {
        model.validate()?;
        if self.tables.contains_key(model.name()) {
            return Err(SchemaError::duplicate("table", model.name()));
        }
        tracing::debug!(table = model.name(), columns = model.columns().len(), "registered table model");
        self.tables.insert(model.name().to_string(), model);
        Ok(())
    }

    /// Re-validate every registered model.
    pub fn validate(&self) -> SchemaResult<()> {
        self.tables.values().try_for_each(TableModel::validate)
    }

    /// Get a model by table name.
    pub fn get(&self, name: &str) -> Option<&TableModel> {
        self.tables.get(name)
    }

    /// Check whether a table is declared.
    pub fn contains(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    /// Iterate models in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &TableModel> {
        self.tables.values()
    }

    /// Declared table names, in declaration order.
    pub fn names(&self) -> Vec<&str> {
        self.tables.keys().map(String::as_str).collect()
    }

    /// Number of declared tables.
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// Whether no tables are declared.
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Look up a declared column.
    pub fn column(&self, table: &str, column: &str) -> SchemaResult<&Column> {
        self.get(table)
            .and_then(|model| model.get_column(column))
            .ok_or_else(|| SchemaError::unknown_column(table, column))
    }

    /// Convert a stored value of `table.column` into its logical form.
    pub fn convert_inbound(&self, table: &str, column: &str, stored: &StoredValue) -> SchemaResult<Value> {
        self.column(table, column)?
            .kind()
            .from_stored(table, column, stored)
    }

    /// Convert a logical value of `table.column` into its stored form.
    pub fn convert_outbound(&self, table: &str, column: &str, value: &Value) -> SchemaResult<StoredValue> {
        self.column(table, column)?
            .kind()
            .to_stored(table, column, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn registry() -> SchemaRegistry {
        let mut registry = SchemaRegistry::new();
        registry
            .register(TableModel::from_json("t", json!({"id": 0, "uid": "", "active": false})).unwrap())
            .unwrap();
        registry
    }

    #[test]
    fn test_register_rejects_duplicates() {
        let mut registry = registry();
        let err = registry
            .register(TableModel::new("t").column("id", json!(0)))
            .unwrap_err();
        assert!(matches!(err, SchemaError::Duplicate { .. }));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_register_validates() {
        let mut registry = SchemaRegistry::new();
        assert!(registry.register(TableModel::new("empty")).is_err());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_convert_inbound() {
        let registry = registry();
        let v = registry
            .convert_inbound("t", "active", &StoredValue::Integer(1))
            .unwrap();
        assert_eq!(v, json!(true));
    }

    #[test]
    fn test_convert_outbound() {
        let registry = registry();
        let v = registry.convert_outbound("t", "uid", &json!("a")).unwrap();
        assert_eq!(v, StoredValue::Text("a".into()));
    }

    #[test]
    fn test_unknown_column_fails() {
        let registry = registry();
        let err = registry
            .convert_outbound("t", "missing", &json!(1))
            .unwrap_err();
        assert!(matches!(err, SchemaError::UnknownColumn { .. }));
        assert!(
            registry
                .convert_inbound("nope", "id", &StoredValue::Integer(1))
                .is_err()
        );
    }
}
