//! Storage classes, typed values and ordered parameter lists.

use rusqlite::types::{Type, ValueRef};
use std::fmt;

/// SQLite storage class, used both for declared column types and for the
/// observed type of a runtime value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SqlType {
    Integer,
    Float,
    Text,
    Blob,
    /// Declares a typeless column that accepts any value.
    Null,
    /// No declared type. Properties of this type are never persisted.
    Unknown,
}

impl SqlType {
    /// Type name used in a column definition. Empty for typeless and
    /// unknown columns.
    pub fn to_sql(&self) -> &'static str {
        match self {
            SqlType::Integer => "INTEGER",
            SqlType::Float => "REAL",
            SqlType::Text => "TEXT",
            SqlType::Blob => "BLOB",
            SqlType::Null | SqlType::Unknown => "",
        }
    }

    pub fn is_persistent(&self) -> bool {
        !matches!(self, SqlType::Unknown)
    }
}

impl fmt::Display for SqlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SqlType::Integer => "integer",
            SqlType::Float => "float",
            SqlType::Text => "text",
            SqlType::Blob => "blob",
            SqlType::Null => "null",
            SqlType::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

impl From<Type> for SqlType {
    fn from(ty: Type) -> Self {
        match ty {
            Type::Null => SqlType::Null,
            Type::Integer => SqlType::Integer,
            Type::Real => SqlType::Float,
            Type::Text => SqlType::Text,
            Type::Blob => SqlType::Blob,
        }
    }
}

/// A value bound to a statement parameter or read from a result column.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Integer(i64),
    Float(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl Value {
    /// Storage class of this value.
    pub fn sql_type(&self) -> SqlType {
        match self {
            Value::Null => SqlType::Null,
            Value::Integer(_) => SqlType::Integer,
            Value::Float(_) => SqlType::Float,
            Value::Text(_) => SqlType::Text,
            Value::Blob(_) => SqlType::Blob,
        }
    }

    /// Whether this value may be bound to a column declared as `declared`.
    ///
    /// NULL binds anywhere and typeless columns take anything. Integers widen
    /// into float columns; every other pairing must match exactly.
    pub fn is_coercible_to(&self, declared: SqlType) -> bool {
        match (self.sql_type(), declared) {
            (_, SqlType::Unknown) => false,
            (SqlType::Null, _) | (_, SqlType::Null) => true,
            (SqlType::Integer, SqlType::Float) => true,
            (observed, declared) => observed == declared,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(v) => Some(*v),
            _ => None,
        }
    }

    /// Float view of the value; integers are widened.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            Value::Integer(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_blob(&self) -> Option<&[u8]> {
        match self {
            Value::Blob(v) => Some(v),
            _ => None,
        }
    }
}

impl From<ValueRef<'_>> for Value {
    fn from(value: ValueRef<'_>) -> Self {
        match value {
            ValueRef::Null => Value::Null,
            ValueRef::Integer(v) => Value::Integer(v),
            ValueRef::Real(v) => Value::Float(v),
            ValueRef::Text(v) => Value::Text(String::from_utf8_lossy(v).into_owned()),
            ValueRef::Blob(v) => Value::Blob(v.to_vec()),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(i64::from(v))
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Integer(i64::from(v))
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Integer(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(f64::from(v))
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Blob(v)
    }
}

impl From<&[u8]> for Value {
    fn from(v: &[u8]) -> Self {
        Value::Blob(v.to_vec())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

/// Ordered (key, value) pairs handed to create and update operations.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Params {
    values: Vec<(String, Value)>,
}

impl Params {
    /// Create a new Params object
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a named value, replacing any earlier value for the same key
    pub fn with_value(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: &str, value: impl Into<Value>) {
        let value = value.into();
        match self.values.iter_mut().find(|(key, _)| key == name) {
            Some(slot) => slot.1 = value,
            None => self.values.push((name.to_string(), value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.iter().map(|(key, _)| key.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(key, value)| (key.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Convenience macro for building [`Params`].
///
/// Usage: `params! { "id" => 1_i64, "name" => "Ann" }`
#[macro_export]
macro_rules! params {
    ($($key:expr => $val:expr),* $(,)?) => {
        $crate::Params::new()$(.with_value($key, $val))*
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coercion_rules() {
        assert!(Value::Integer(1).is_coercible_to(SqlType::Integer));
        assert!(Value::Integer(1).is_coercible_to(SqlType::Float));
        assert!(!Value::Float(1.5).is_coercible_to(SqlType::Integer));
        assert!(!Value::Text("1".into()).is_coercible_to(SqlType::Integer));
        assert!(!Value::Blob(vec![1]).is_coercible_to(SqlType::Text));
        assert!(Value::Null.is_coercible_to(SqlType::Blob));
        assert!(Value::Text("x".into()).is_coercible_to(SqlType::Null));
        assert!(!Value::Null.is_coercible_to(SqlType::Unknown));
    }

    #[test]
    fn test_conversions() {
        assert_eq!(Value::from(true), Value::Integer(1));
        assert_eq!(Value::from(None::<String>), Value::Null);
        assert_eq!(Value::from(Some("a")), Value::Text("a".to_string()));
        assert_eq!(Value::from(&b"ab"[..]).as_blob(), Some(&b"ab"[..]));
        assert_eq!(Value::Integer(2).as_float(), Some(2.0));
        assert_eq!(Value::Text("2".into()).as_integer(), None);
    }

    #[test]
    fn test_params_replace_keeps_position() {
        let params = crate::params! { "id" => 1_i64, "name" => "Ann", "id" => 2_i64 };
        assert_eq!(params.len(), 2);
        assert_eq!(params.keys().collect::<Vec<_>>(), vec!["id", "name"]);
        assert_eq!(params.get("id"), Some(&Value::Integer(2)));
    }
}
