//! Physical values as they travel to and from the storage engine.

use std::fmt;

/// A value in its stored, physical representation.
///
/// This mirrors the storage classes of SQLite without depending on a driver,
/// so conversion rules can be expressed and tested independently of it.
#[derive(Debug, Clone, PartialEq)]
pub enum StoredValue {
    /// SQL NULL.
    Null,
    /// 64-bit signed integer.
    Integer(i64),
    /// 64-bit float.
    Real(f64),
    /// UTF-8 text.
    Text(String),
    /// Raw bytes.
    Blob(Vec<u8>),
}

impl StoredValue {
    /// Check if this is NULL.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Get the text content, if this is text.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Get the integer content, if this is an integer.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Name of the storage class, for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Integer(_) => "integer",
            Self::Real(_) => "real",
            Self::Text(_) => "text",
            Self::Blob(_) => "blob",
        }
    }
}

impl fmt::Display for StoredValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "NULL"),
            Self::Integer(i) => write!(f, "{}", i),
            Self::Real(r) => write!(f, "{}", r),
            Self::Text(s) => write!(f, "{}", s),
            Self::Blob(b) => write!(f, "<{} bytes>", b.len()),
        }
    }
}

impl From<i64> for StoredValue {
    fn from(v: i64) -> Self {
        Self::Integer(v)
    }
}

impl From<bool> for StoredValue {
    fn from(v: bool) -> Self {
        Self::Integer(i64::from(v))
    }
}

impl From<f64> for StoredValue {
    fn from(v: f64) -> Self {
        Self::Real(v)
    }
}

impl From<String> for StoredValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<&str> for StoredValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<Vec<u8>> for StoredValue {
    fn from(v: Vec<u8>) -> Self {
        Self::Blob(v)
    }
}

impl<T: Into<StoredValue>> From<Option<T>> for StoredValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Self::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_bool_is_integer() {
        assert_eq!(StoredValue::from(true), StoredValue::Integer(1));
        assert_eq!(StoredValue::from(false), StoredValue::Integer(0));
    }

    #[test]
    fn test_from_option() {
        assert_eq!(StoredValue::from(None::<String>), StoredValue::Null);
        assert_eq!(
            StoredValue::from(Some("x")),
            StoredValue::Text("x".to_string())
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(StoredValue::Null.to_string(), "NULL");
        assert_eq!(StoredValue::Blob(vec![1, 2, 3]).to_string(), "<3 bytes>");
    }
}
