//! Column kinds inferred from sample values, and the conversion rules
//! between logical values and their stored representation.
//!
//! A table scheme declares each column with a representative default value.
//! The *shape* of that sample decides everything else about the column:
//!
//! | Sample                         | Kind         | Physical type | Zero value |
//! |--------------------------------|--------------|---------------|------------|
//! | `true` / `false`               | `Boolean`    | `INTEGER`     | `false`    |
//! | number, or numeric-looking text| `Integer`    | `INTEGER`     | `0`        |
//! | other text                     | `Text`       | `TEXT`        | `""`       |
//! | array                          | `Array`      | `TEXT`        | `[]`       |
//! | object                         | `Structured` | `TEXT`        | `{}`       |
//! | anything else (`null`)         | `Binary`     | `BLOB`        | `null`     |
//!
//! Note that a numeric-looking string sample such as `"42"` yields an
//! `Integer` column.

use std::fmt;
use std::sync::LazyLock;

use regex_lite::Regex;
use serde_json::{Map, Number, Value};

use crate::error::{SchemaError, SchemaResult};
use crate::value::StoredValue;

static NUMERIC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^-?[\d.]+(?:e-?\d+)?$").expect("numeric pattern is a valid regex")
});

/// Check whether text matches the signed decimal/exponent pattern.
pub fn is_numeric_text(text: &str) -> bool {
    NUMERIC.is_match(text)
}

/// The closed set of column kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnKind {
    /// Stored as 0/1 integers.
    Boolean,
    /// Integer affinity; holds any numeric value.
    Integer,
    /// Plain text.
    Text,
    /// JSON array serialized to text.
    Array,
    /// JSON object serialized to text.
    Structured,
    /// Opaque bytes.
    Binary,
}

/// Why a single value failed to convert.
struct Failure {
    target: &'static str,
    message: String,
}

impl Failure {
    fn new(target: &'static str, message: impl Into<String>) -> Self {
        Self {
            target,
            message: message.into(),
        }
    }
}

impl ColumnKind {
    /// Infer the kind of a column from its sample value.
    pub fn infer(sample: &Value) -> Self {
        match sample {
            Value::Bool(_) => Self::Boolean,
            Value::Number(n) if is_numeric_text(&n.to_string()) => Self::Integer,
            Value::String(s) if is_numeric_text(s) => Self::Integer,
            Value::String(_) => Self::Text,
            Value::Array(_) => Self::Array,
            Value::Object(_) => Self::Structured,
            _ => Self::Binary,
        }
    }

    /// The SQLite type used for this kind in DDL.
    pub fn physical_type(self) -> &'static str {
        match self {
            Self::Boolean | Self::Integer => "INTEGER",
            Self::Text | Self::Array | Self::Structured => "TEXT",
            Self::Binary => "BLOB",
        }
    }

    /// The value used for a column that is missing from a stored row.
    pub fn zero_value(self) -> Value {
        match self {
            Self::Boolean => Value::Bool(false),
            Self::Integer => Value::Number(0.into()),
            Self::Text => Value::String(String::new()),
            Self::Array => Value::Array(Vec::new()),
            Self::Structured => Value::Object(Map::new()),
            Self::Binary => Value::Null,
        }
    }

    /// Convert a stored value into its logical form.
    ///
    /// A stored NULL always converts to a logical `null`.
    pub fn from_stored(self, table: &str, column: &str, stored: &StoredValue) -> SchemaResult<Value> {
        self.inbound(stored).map_err(|f| {
            SchemaError::conversion(table, column, f.target, f.message)
        })
    }

    /// Convert a logical value into its stored form.
    ///
    /// A logical `null` always converts to a stored NULL.
    pub fn to_stored(self, table: &str, column: &str, value: &Value) -> SchemaResult<StoredValue> {
        self.outbound(value).map_err(|f| {
            SchemaError::conversion(table, column, f.target, f.message)
        })
    }

    fn inbound(self, stored: &StoredValue) -> Result<Value, Failure> {
        if stored.is_null() {
            return Ok(Value::Null);
        }

        match self {
            Self::Boolean => match stored {
                StoredValue::Integer(0) => Ok(Value::Bool(false)),
                StoredValue::Integer(1) => Ok(Value::Bool(true)),
                StoredValue::Real(r) if *r == 0.0 => Ok(Value::Bool(false)),
                StoredValue::Real(r) if *r == 1.0 => Ok(Value::Bool(true)),
                StoredValue::Text(s) => parse_bool_text(s)
                    .map(Value::Bool)
                    .ok_or_else(|| Failure::new("boolean", format!("unexpected text '{}'", s))),
                other => Err(Failure::new(
                    "boolean",
                    format!("unexpected {} '{}'", other.type_name(), other),
                )),
            },
            Self::Integer => match stored {
                StoredValue::Integer(i) => Ok(Value::Number((*i).into())),
                StoredValue::Real(r) => real_to_number(*r)
                    .map(Value::Number)
                    .ok_or_else(|| Failure::new("number", format!("'{}' is not numeric", r))),
                StoredValue::Text(s) => parse_numeric_text(s)
                    .map(Value::Number)
                    .ok_or_else(|| Failure::new("number", format!("'{}' is not numeric", s))),
                other => Err(Failure::new(
                    "number",
                    format!("unexpected {} value", other.type_name()),
                )),
            },
            Self::Text => Ok(Value::String(match stored {
                StoredValue::Text(s) => s.clone(),
                StoredValue::Blob(b) => String::from_utf8_lossy(b).into_owned(),
                other => other.to_string(),
            })),
            Self::Array | Self::Structured => match stored {
                StoredValue::Text(s) => serde_json::from_str(s).map_err(|e| {
                    Failure::new(self.target_name(), format!("invalid JSON text: {}", e))
                }),
                other => Ok(passthrough(other)),
            },
            Self::Binary => Ok(passthrough(stored)),
        }
    }

    fn outbound(self, value: &Value) -> Result<StoredValue, Failure> {
        if value.is_null() {
            return Ok(StoredValue::Null);
        }

        match self {
            Self::Boolean => match value {
                Value::Bool(b) => Ok(StoredValue::from(*b)),
                Value::Number(n) if n.as_i64() == Some(0) => Ok(StoredValue::from(false)),
                Value::Number(n) if n.as_i64() == Some(1) => Ok(StoredValue::from(true)),
                Value::String(s) => parse_bool_text(s)
                    .map(StoredValue::from)
                    .ok_or_else(|| Failure::new("boolean", format!("unexpected text '{}'", s))),
                other => Err(Failure::new("boolean", format!("unexpected value {}", other))),
            },
            Self::Integer => {
                let number = match value {
                    Value::Number(n) if is_numeric_text(&n.to_string()) => Some(n.clone()),
                    Value::String(s) => parse_numeric_text(s),
                    _ => None,
                };
                match number {
                    Some(n) => Ok(number_to_stored(&n)),
                    None => Err(Failure::new("number", format!("{} is not numeric", value))),
                }
            }
            Self::Text => Ok(StoredValue::Text(match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })),
            Self::Array | Self::Structured => serde_json::to_string(value)
                .map(StoredValue::Text)
                .map_err(|e| Failure::new(self.target_name(), e.to_string())),
            Self::Binary => match value {
                Value::String(s) => Ok(StoredValue::Blob(s.as_bytes().to_vec())),
                Value::Array(items) => items
                    .iter()
                    .map(|item| item.as_u64().and_then(|b| u8::try_from(b).ok()))
                    .collect::<Option<Vec<u8>>>()
                    .map(StoredValue::Blob)
                    .ok_or_else(|| Failure::new("binary", "array items must be bytes")),
                other => Err(Failure::new("binary", format!("unexpected value {}", other))),
            },
        }
    }

    fn target_name(self) -> &'static str {
        match self {
            Self::Boolean => "boolean",
            Self::Integer => "number",
            Self::Text => "string",
            Self::Array => "array",
            Self::Structured => "object",
            Self::Binary => "binary",
        }
    }
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.target_name())
    }
}

fn parse_bool_text(text: &str) -> Option<bool> {
    match text {
        "0" | "false" => Some(false),
        "1" | "true" => Some(true),
        _ => None,
    }
}

fn parse_numeric_text(text: &str) -> Option<Number> {
    if !is_numeric_text(text) {
        return None;
    }
    if let Ok(i) = text.parse::<i64>() {
        return Some(i.into());
    }
    text.parse::<f64>().ok().and_then(Number::from_f64)
}

fn real_to_number(r: f64) -> Option<Number> {
    Number::from_f64(r).filter(|n| is_numeric_text(&n.to_string()))
}

fn number_to_stored(n: &Number) -> StoredValue {
    match n.as_i64() {
        Some(i) => StoredValue::Integer(i),
        None => StoredValue::Real(n.as_f64().unwrap_or_default()),
    }
}

fn passthrough(stored: &StoredValue) -> Value {
    match stored {
        StoredValue::Null => Value::Null,
        StoredValue::Integer(i) => Value::Number((*i).into()),
        StoredValue::Real(r) => Number::from_f64(*r).map_or(Value::Null, Value::Number),
        StoredValue::Text(s) => Value::String(s.clone()),
        StoredValue::Blob(b) => Value::Array(b.iter().map(|byte| Value::from(*byte)).collect()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_infer_kind() {
        assert_eq!(ColumnKind::infer(&json!(false)), ColumnKind::Boolean);
        assert_eq!(ColumnKind::infer(&json!(0)), ColumnKind::Integer);
        assert_eq!(ColumnKind::infer(&json!(-2.5)), ColumnKind::Integer);
        assert_eq!(ColumnKind::infer(&json!("42")), ColumnKind::Integer);
        assert_eq!(ColumnKind::infer(&json!("")), ColumnKind::Text);
        assert_eq!(ColumnKind::infer(&json!([])), ColumnKind::Array);
        assert_eq!(ColumnKind::infer(&json!({})), ColumnKind::Structured);
        assert_eq!(ColumnKind::infer(&Value::Null), ColumnKind::Binary);
    }

    #[test]
    fn test_physical_types() {
        assert_eq!(ColumnKind::Boolean.physical_type(), "INTEGER");
        assert_eq!(ColumnKind::Integer.physical_type(), "INTEGER");
        assert_eq!(ColumnKind::Text.physical_type(), "TEXT");
        assert_eq!(ColumnKind::Array.physical_type(), "TEXT");
        assert_eq!(ColumnKind::Structured.physical_type(), "TEXT");
        assert_eq!(ColumnKind::Binary.physical_type(), "BLOB");
    }

    #[test]
    fn test_zero_values() {
        assert_eq!(ColumnKind::Boolean.zero_value(), json!(false));
        assert_eq!(ColumnKind::Integer.zero_value(), json!(0));
        assert_eq!(ColumnKind::Text.zero_value(), json!(""));
        assert_eq!(ColumnKind::Array.zero_value(), json!([]));
        assert_eq!(ColumnKind::Structured.zero_value(), json!({}));
        assert_eq!(ColumnKind::Binary.zero_value(), Value::Null);
    }

    #[test]
    fn test_numeric_pattern() {
        assert!(is_numeric_text("0"));
        assert!(is_numeric_text("-12.5"));
        assert!(is_numeric_text("1e-7"));
        assert!(!is_numeric_text("12a"));
        assert!(!is_numeric_text("true"));
        assert!(!is_numeric_text(""));
    }

    #[test]
    fn test_boolean_inbound_accepts_integers_and_text() {
        let kind = ColumnKind::Boolean;
        for (stored, expected) in [
            (StoredValue::Integer(1), true),
            (StoredValue::Integer(0), false),
            (StoredValue::Text("true".into()), true),
            (StoredValue::Text("0".into()), false),
        ] {
            assert_eq!(kind.from_stored("t", "c", &stored).unwrap(), json!(expected));
        }
    }

    #[test]
    fn test_boolean_inbound_rejects_other_integers() {
        let err = ColumnKind::Boolean
            .from_stored("t", "active", &StoredValue::Integer(7))
            .unwrap_err();
        assert!(err.is_conversion());
        assert!(err.to_string().contains("t.active"));
    }

    #[test]
    fn test_integer_inbound_rejects_non_numeric_text() {
        let err = ColumnKind::Integer
            .from_stored("t", "n", &StoredValue::Text("abc".into()))
            .unwrap_err();
        assert!(err.to_string().contains("number"));
    }

    #[test]
    fn test_integer_inbound_parses_numeric_text() {
        let v = ColumnKind::Integer
            .from_stored("t", "n", &StoredValue::Text("-3".into()))
            .unwrap();
        assert_eq!(v, json!(-3));
    }

    #[test]
    fn test_text_inbound_coerces() {
        let v = ColumnKind::Text
            .from_stored("t", "c", &StoredValue::Integer(5))
            .unwrap();
        assert_eq!(v, json!("5"));
    }

    #[test]
    fn test_structured_inbound_parses_text() {
        let v = ColumnKind::Structured
            .from_stored("t", "c", &StoredValue::Text(r#"{"a":1}"#.into()))
            .unwrap();
        assert_eq!(v, json!({"a": 1}));
    }

    #[test]
    fn test_array_inbound_rejects_bad_json() {
        assert!(
            ColumnKind::Array
                .from_stored("t", "c", &StoredValue::Text("[1,".into()))
                .is_err()
        );
    }

    #[test]
    fn test_null_converts_to_null_both_ways() {
        for kind in [
            ColumnKind::Boolean,
            ColumnKind::Integer,
            ColumnKind::Text,
            ColumnKind::Array,
            ColumnKind::Structured,
            ColumnKind::Binary,
        ] {
            assert_eq!(kind.from_stored("t", "c", &StoredValue::Null).unwrap(), Value::Null);
            assert_eq!(kind.to_stored("t", "c", &Value::Null).unwrap(), StoredValue::Null);
        }
    }

    #[test]
    fn test_outbound_boolean() {
        let kind = ColumnKind::Boolean;
        assert_eq!(kind.to_stored("t", "c", &json!(true)).unwrap(), StoredValue::Integer(1));
        assert_eq!(kind.to_stored("t", "c", &json!("false")).unwrap(), StoredValue::Integer(0));
        assert!(kind.to_stored("t", "c", &json!("yes")).is_err());
    }

    #[test]
    fn test_outbound_integer() {
        let kind = ColumnKind::Integer;
        assert_eq!(kind.to_stored("t", "c", &json!(12)).unwrap(), StoredValue::Integer(12));
        assert_eq!(kind.to_stored("t", "c", &json!("12")).unwrap(), StoredValue::Integer(12));
        assert_eq!(kind.to_stored("t", "c", &json!(1.5)).unwrap(), StoredValue::Real(1.5));
        assert!(kind.to_stored("t", "c", &json!(true)).is_err());
    }

    #[test]
    fn test_outbound_serializes_structures() {
        assert_eq!(
            ColumnKind::Array.to_stored("t", "c", &json!([1, 2])).unwrap(),
            StoredValue::Text("[1,2]".into())
        );
        assert_eq!(
            ColumnKind::Structured.to_stored("t", "c", &json!({"k": "v"})).unwrap(),
            StoredValue::Text(r#"{"k":"v"}"#.into())
        );
    }

    #[test]
    fn test_outbound_binary() {
        assert_eq!(
            ColumnKind::Binary.to_stored("t", "c", &json!([1, 255])).unwrap(),
            StoredValue::Blob(vec![1, 255])
        );
        assert!(ColumnKind::Binary.to_stored("t", "c", &json!([256])).is_err());
    }

    #[test]
    fn test_round_trip_per_kind() {
        let cases = [
            (ColumnKind::Boolean, json!(true)),
            (ColumnKind::Boolean, json!(false)),
            (ColumnKind::Integer, json!(-17)),
            (ColumnKind::Integer, json!(2.25)),
            (ColumnKind::Text, json!("hello")),
            (ColumnKind::Array, json!([1, "two", [3]])),
            (ColumnKind::Structured, json!({"b": 1, "a": {"nested": true}})),
        ];

        for (kind, value) in cases {
            let stored = kind.to_stored("t", "c", &value).unwrap();
            let back = kind.from_stored("t", "c", &stored).unwrap();
            assert_eq!(back, value, "round trip failed for {:?}", kind);
        }
    }
}
