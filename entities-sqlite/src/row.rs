//! Raw rows as read from SQLite.

use entities_schema::StoredValue;
use indexmap::IndexMap;
use serde_json::Value as JsonValue;

/// A row of stored values keyed by column name, in result-column order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SqliteRow {
    values: IndexMap<String, StoredValue>,
}

impl SqliteRow {
    /// Create an empty row.
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a row from a result set with the given column names.
    pub fn from_row(row: &rusqlite::Row<'_>, columns: &[String]) -> rusqlite::Result<Self> {
        let mut values = IndexMap::with_capacity(columns.len());
        for (i, column) in columns.iter().enumerate() {
            values.insert(column.clone(), crate::types::get_value_at_index(row, i)?);
        }
        Ok(Self { values })
    }

    /// Set a column value.
    pub fn with(mut self, column: impl Into<String>, value: impl Into<StoredValue>) -> Self {
        self.values.insert(column.into(), value.into());
        self
    }

    /// Get a column value.
    pub fn get(&self, column: &str) -> Option<&StoredValue> {
        self.values.get(column)
    }

    /// Get a text column.
    pub fn get_text(&self, column: &str) -> Option<&str> {
        self.get(column).and_then(StoredValue::as_text)
    }

    /// Check whether the row has a column.
    pub fn contains(&self, column: &str) -> bool {
        self.values.contains_key(column)
    }

    /// Column names, in order.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Iterate over `(column, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &StoredValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the row has no columns.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// A JSON view of the raw values. Blobs become byte arrays.
    pub fn to_json(&self) -> JsonValue {
        let map = self
            .values
            .iter()
            .map(|(k, v)| {
                let value = match v {
                    StoredValue::Null => JsonValue::Null,
                    StoredValue::Integer(i) => JsonValue::from(*i),
                    StoredValue::Real(r) => JsonValue::from(*r),
                    StoredValue::Text(s) => JsonValue::from(s.as_str()),
                    StoredValue::Blob(b) => JsonValue::from(b.clone()),
                };
                (k.clone(), value)
            })
            .collect();
        JsonValue::Object(map)
    }
}

impl IntoIterator for SqliteRow {
    type Item = (String, StoredValue);
    type IntoIter = indexmap::map::IntoIter<String, StoredValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_row_accessors() {
        let row = SqliteRow::new()
            .with("id", 1i64)
            .with("name", "ada")
            .with("note", None::<String>);

        assert_eq!(row.len(), 3);
        assert_eq!(row.get("id"), Some(&StoredValue::Integer(1)));
        assert_eq!(row.get_text("name"), Some("ada"));
        assert!(row.contains("note"));
        assert_eq!(row.columns().collect::<Vec<_>>(), vec!["id", "name", "note"]);
    }

    #[test]
    fn test_row_to_json() {
        let row = SqliteRow::new()
            .with("id", 1i64)
            .with("data", vec![1u8, 2])
            .with("ratio", 0.5);
        assert_eq!(row.to_json(), json!({"id": 1, "data": [1, 2], "ratio": 0.5}));
    }
}
