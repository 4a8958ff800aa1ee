//! Conversion between stored values and SQLite values.

use entities_schema::StoredValue;
use rusqlite::types::{Value, ValueRef};

/// Convert a stored value to a SQLite value.
pub fn to_sqlite(value: &StoredValue) -> Value {
    match value {
        StoredValue::Null => Value::Null,
        StoredValue::Integer(i) => Value::Integer(*i),
        StoredValue::Real(r) => Value::Real(*r),
        StoredValue::Text(s) => Value::Text(s.clone()),
        StoredValue::Blob(b) => Value::Blob(b.clone()),
    }
}

/// Convert an owned list of stored values into SQLite parameters.
pub fn to_sqlite_params(values: Vec<StoredValue>) -> Vec<Value> {
    values
        .into_iter()
        .map(|value| match value {
            StoredValue::Null => Value::Null,
            StoredValue::Integer(i) => Value::Integer(i),
            StoredValue::Real(r) => Value::Real(r),
            StoredValue::Text(s) => Value::Text(s),
            StoredValue::Blob(b) => Value::Blob(b),
        })
        .collect()
}

/// Convert a SQLite value reference to a stored value.
///
/// Text that is not valid UTF-8 is decoded lossily.
pub fn from_sqlite(value: ValueRef<'_>) -> StoredValue {
    match value {
        ValueRef::Null => StoredValue::Null,
        ValueRef::Integer(i) => StoredValue::Integer(i),
        ValueRef::Real(r) => StoredValue::Real(r),
        ValueRef::Text(bytes) => StoredValue::Text(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => StoredValue::Blob(bytes.to_vec()),
    }
}

/// Get a stored value from a row at the given column index.
pub fn get_value_at_index(row: &rusqlite::Row<'_>, index: usize) -> rusqlite::Result<StoredValue> {
    row.get_ref(index).map(from_sqlite)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_sqlite() {
        assert_eq!(to_sqlite(&StoredValue::Null), Value::Null);
        assert_eq!(to_sqlite(&StoredValue::Integer(42)), Value::Integer(42));
        assert_eq!(
            to_sqlite(&StoredValue::Text("hello".into())),
            Value::Text("hello".into())
        );
        assert_eq!(to_sqlite(&StoredValue::Blob(vec![1])), Value::Blob(vec![1]));
    }

    #[test]
    fn test_to_sqlite_params() {
        let params = to_sqlite_params(vec![StoredValue::Integer(1), StoredValue::Real(0.5)]);
        assert_eq!(params, vec![Value::Integer(1), Value::Real(0.5)]);
    }

    #[test]
    fn test_from_sqlite() {
        assert_eq!(from_sqlite(ValueRef::Null), StoredValue::Null);
        assert_eq!(from_sqlite(ValueRef::Integer(7)), StoredValue::Integer(7));
        assert_eq!(from_sqlite(ValueRef::Real(1.5)), StoredValue::Real(1.5));
        assert_eq!(
            from_sqlite(ValueRef::Text(b"{\"k\":1}")),
            StoredValue::Text("{\"k\":1}".into())
        );
        assert_eq!(from_sqlite(ValueRef::Blob(&[0, 255])), StoredValue::Blob(vec![0, 255]));
    }
}
