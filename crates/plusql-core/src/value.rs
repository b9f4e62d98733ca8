//! Cell values decoded from shell output.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A single cell of a result row.
///
/// The shell output carries no type system. A cell is numeric only when the
/// shell right-aligned it, and every number (integer or not) becomes a
/// `Double`. Everything else is text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// A right-aligned cell with no content
    Null,

    /// Numeric cell
    Double(f64),

    /// Text cell, surrounding whitespace removed
    Text(String),
}

impl Value {
    /// Check if this value is NULL.
    pub const fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Get the type name of this value.
    pub const fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "NULL",
            Value::Double(_) => "NUMBER",
            Value::Text(_) => "TEXT",
        }
    }

    /// Try to convert this value to an f64.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Double(v) => Some(*v),
            _ => None,
        }
    }

    /// Try to convert this value to an i64.
    ///
    /// Succeeds only for numbers with no fractional part that fit in an i64.
    #[allow(clippy::cast_possible_truncation)]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Double(v) if v.fract() == 0.0 && v.abs() < 9.223_372_036_854_776e18 => {
                Some(*v as i64)
            }
            _ => None,
        }
    }

    /// Try to get this value as a string reference.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Double(v) => write!(f, "{}", v),
            Value::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
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

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accessors() {
        assert_eq!(Value::Double(7.0).as_i64(), Some(7));
        assert_eq!(Value::Double(7.5).as_i64(), None);
        assert_eq!(Value::Double(7.5).as_f64(), Some(7.5));
        assert_eq!(Value::from("SMITH").as_str(), Some("SMITH"));
        assert_eq!(Value::from("7").as_f64(), None);
        assert!(Value::from(None::<f64>).is_null());
    }

    #[test]
    fn test_type_names() {
        assert_eq!(Value::Null.type_name(), "NULL");
        assert_eq!(Value::Double(1.0).type_name(), "NUMBER");
        assert_eq!(Value::from("x").type_name(), "TEXT");
    }

    #[test]
    fn test_json_shape() {
        assert_eq!(serde_json::to_string(&Value::Null).unwrap(), "null");
        assert_eq!(serde_json::to_string(&Value::Double(1.5)).unwrap(), "1.5");
        assert_eq!(
            serde_json::to_string(&Value::from("KING")).unwrap(),
            "\"KING\""
        );

        let back: Value = serde_json::from_str("\"KING\"").unwrap();
        assert_eq!(back, Value::from("KING"));
        let back: Value = serde_json::from_str("2.25").unwrap();
        assert_eq!(back, Value::Double(2.25));
    }
}
