//! Typed rows and row collections.

use entities_schema::{SchemaRegistry, TableModel};
use entities_sqlite::SqliteRow;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};

use crate::error::Result;

/// A row converted to logical values.
///
/// Holds one value per declared column, in declaration order. Columns the
/// stored row lacks hold their kind's zero value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowEntity {
    #[serde(skip)]
    table: String,
    #[serde(flatten)]
    values: Map<String, Value>,
}

impl RowEntity {
    /// Build an entity from a stored row.
    pub fn from_row(registry: &SchemaRegistry, model: &TableModel, row: &SqliteRow) -> Result<Self> {
        let mut values = Map::with_capacity(model.columns().len());
        for column in model.columns() {
            let value = match row.get(column.name()) {
                Some(stored) => registry.convert_inbound(model.name(), column.name(), stored)?,
                None => column.kind().zero_value(),
            };
            values.insert(column.name().to_string(), value);
        }

        Ok(Self {
            table: model.name().to_string(),
            values,
        })
    }

    /// The table the row came from.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Get a column value.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.values.get(column)
    }

    /// All column values.
    pub fn values(&self) -> &Map<String, Value> {
        &self.values
    }

    /// The row as a JSON object.
    pub fn to_json(&self) -> Value {
        Value::Object(self.values.clone())
    }

    /// Consume the entity, returning its values.
    pub fn into_values(self) -> Map<String, Value> {
        self.values
    }

    /// Deserialize the row into a record type.
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_value(self.to_json())?)
    }
}

impl std::ops::Index<&str> for RowEntity {
    type Output = Value;

    fn index(&self, column: &str) -> &Value {
        self.values.get(column).unwrap_or(&Value::Null)
    }
}

/// Entities fetched from one table.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Rows {
    table: String,
    entities: Vec<RowEntity>,
}

impl Rows {
    /// Wrap fetched entities.
    pub fn new(table: impl Into<String>, entities: Vec<RowEntity>) -> Self {
        Self {
            table: table.into(),
            entities,
        }
    }

    /// The table the rows came from.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// The first entity matching the predicate.
    pub fn first<F>(&self, predicate: F) -> Option<&RowEntity>
    where
        F: Fn(&RowEntity) -> bool,
    {
        self.entities.iter().find(|e| predicate(e))
    }

    /// The last entity matching the predicate.
    pub fn last<F>(&self, predicate: F) -> Option<&RowEntity>
    where
        F: Fn(&RowEntity) -> bool,
    {
        self.entities.iter().rev().find(|e| predicate(e))
    }

    /// Entities matching the predicate.
    #[doc(alias = "where")]
    pub fn filter<F>(&self, predicate: F) -> Rows
    where
        F: Fn(&RowEntity) -> bool,
    {
        Rows::new(
            self.table.clone(),
            self.entities.iter().filter(|e| predicate(e)).cloned().collect(),
        )
    }

    /// Number of entities matching the predicate.
    pub fn count<F>(&self, predicate: F) -> usize
    where
        F: Fn(&RowEntity) -> bool,
    {
        self.entities.iter().filter(|e| predicate(e)).count()
    }

    /// A window of at most `limit` entities starting at `offset`.
    pub fn page(&self, offset: usize, limit: usize) -> Rows {
        Rows::new(
            self.table.clone(),
            self.entities.iter().skip(offset).take(limit).cloned().collect(),
        )
    }

    /// Number of entities.
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Whether there are no entities.
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Iterate over the entities.
    pub fn iter(&self) -> std::slice::Iter<'_, RowEntity> {
        self.entities.iter()
    }

    /// Consume into the entities.
    pub fn into_vec(self) -> Vec<RowEntity> {
        self.entities
    }

    /// Deserialize every entity into a record type.
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<Vec<T>> {
        self.entities.iter().map(RowEntity::deserialize).collect()
    }

    /// `{"table": .., "rows": [..]}`.
    pub fn to_json(&self) -> Value {
        json!({
            "table": self.table,
            "rows": self.entities.iter().map(RowEntity::to_json).collect::<Vec<_>>(),
        })
    }
}

impl IntoIterator for Rows {
    type Item = RowEntity;
    type IntoIter = std::vec::IntoIter<RowEntity>;

    fn into_iter(self) -> Self::IntoIter {
        self.entities.into_iter()
    }
}

impl<'a> IntoIterator for &'a Rows {
    type Item = &'a RowEntity;
    type IntoIter = std::slice::Iter<'a, RowEntity>;

    fn into_iter(self) -> Self::IntoIter {
        self.entities.iter()
    }
}
