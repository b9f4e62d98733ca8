//! Result row representation.

use crate::Result;
use crate::error::{Error, TypeError};
use crate::value::Value;
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::collections::HashMap;
use std::sync::Arc;

/// Column metadata shared across all rows in a result set.
///
/// Names are unique. When a header repeats a name, the later cell overwrites
/// the earlier one in place, so a row never has more columns than distinct
/// header names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnInfo {
    /// Column names in order of first appearance
    names: Vec<String>,
    /// Name -> index mapping for O(1) lookup
    name_to_index: HashMap<String, usize>,
}

impl ColumnInfo {
    /// Create new column info from a list of column names.
    ///
    /// Duplicate names keep the position of their first occurrence.
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut info = Self::default();
        for name in names {
            info.push(name.into());
        }
        info
    }

    fn push(&mut self, name: String) -> usize {
        if let Some(&index) = self.name_to_index.get(&name) {
            return index;
        }
        let index = self.names.len();
        self.name_to_index.insert(name.clone(), index);
        self.names.push(name);
        index
    }

    /// Get the number of columns.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Check if there are no columns.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Get the index of a column by name.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.name_to_index.get(name).copied()
    }

    /// Get the name of a column by index.
    pub fn name_at(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(String::as_str)
    }

    /// Check if a column exists.
    pub fn contains(&self, name: &str) -> bool {
        self.name_to_index.contains_key(name)
    }

    /// Get all column names.
    pub fn names(&self) -> &[String] {
        &self.names
    }
}

/// A single row of a result set: column name to cell value, in header order.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    /// Column values in order
    values: Vec<Value>,
    /// Column metadata, shared when rows agree on it
    columns: Arc<ColumnInfo>,
}

impl Row {
    /// Create a new row with the given columns and values.
    pub fn new(column_names: Vec<String>, values: Vec<Value>) -> Self {
        Self::from_pairs(column_names.into_iter().zip(values))
    }

    /// Create a row from `(name, value)` pairs with mapping semantics.
    ///
    /// A repeated name overwrites the earlier value and keeps its position.
    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, Value)>,
        S: Into<String>,
    {
        let mut columns = ColumnInfo::default();
        let mut values: Vec<Value> = Vec::new();
        for (name, value) in pairs {
            let index = columns.push(name.into());
            if index == values.len() {
                values.push(value);
            } else {
                values[index] = value;
            }
        }
        Self {
            values,
            columns: Arc::new(columns),
        }
    }

    /// Create a new row with shared column metadata.
    ///
    /// `values` must line up with `columns`; extra values are dropped.
    pub fn with_columns(columns: Arc<ColumnInfo>, mut values: Vec<Value>) -> Self {
        values.truncate(columns.len());
        Self { values, columns }
    }

    /// Get the column metadata.
    pub fn column_info(&self) -> Arc<ColumnInfo> {
        Arc::clone(&self.columns)
    }

    /// Get the number of columns in this row.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if this row is empty.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Get a value by column index.
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Get a value by column name.
    pub fn get_by_name(&self, name: &str) -> Option<&Value> {
        self.columns.index_of(name).and_then(|i| self.values.get(i))
    }

    /// Check if a column exists by name.
    pub fn contains_column(&self, name: &str) -> bool {
        self.columns.index_of(name).is_some_and(|i| i < self.values.len())
    }

    /// Get a typed value by column index.
    #[allow(clippy::result_large_err)]
    pub fn get_as<T: FromValue>(&self, index: usize) -> Result<T> {
        let value = self.get(index).ok_or_else(|| {
            Error::Type(TypeError {
                expected: std::any::type_name::<T>(),
                actual: format!(
                    "index {} out of bounds (row has {} columns)",
                    index,
                    self.len()
                ),
                column: None,
            })
        })?;
        T::from_value(value)
    }

    /// Get a typed value by column name.
    #[allow(clippy::result_large_err)]
    pub fn get_named<T: FromValue>(&self, name: &str) -> Result<T> {
        let value = self.get_by_name(name).ok_or_else(|| {
            Error::Type(TypeError {
                expected: std::any::type_name::<T>(),
                actual: format!("column '{}' not found", name),
                column: Some(name.to_string()),
            })
        })?;
        T::from_value(value).map_err(|e| match e {
            Error::Type(mut te) => {
                te.column = Some(name.to_string());
                Error::Type(te)
            }
            e => e,
        })
    }

    /// Get all column names present in this row.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns
            .names()
            .iter()
            .take(self.values.len())
            .map(String::as_str)
    }

    /// Iterate over all values.
    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.values.iter()
    }

    /// Iterate over (column_name, value) pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns
            .names()
            .iter()
            .map(String::as_str)
            .zip(self.values.iter())
    }

    /// Render the row as a JSON object, keys in column order.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.iter()
                .map(|(name, value)| {
                    let json = match value {
                        Value::Null => serde_json::Value::Null,
                        Value::Double(v) => serde_json::Number::from_f64(*v)
                            .map_or(serde_json::Value::Null, serde_json::Value::Number),
                        Value::Text(s) => serde_json::Value::String(s.clone()),
                    };
                    (name.to_string(), json)
                })
                .collect(),
        )
    }
}

impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (name, value) in self.iter() {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// Trait for converting from a `Value` to a typed value.
pub trait FromValue: Sized {
    /// Convert from a Value, returning an error if the conversion fails.
    #[allow(clippy::result_large_err)]
    fn from_value(value: &Value) -> Result<Self>;
}

fn mismatch(expected: &'static str, value: &Value) -> Error {
    Error::Type(TypeError {
        expected,
        actual: value.type_name().to_string(),
        column: None,
    })
}

impl FromValue for f64 {
    fn from_value(value: &Value) -> Result<Self> {
        value.as_f64().ok_or_else(|| mismatch("f64", value))
    }
}

impl FromValue for i64 {
    fn from_value(value: &Value) -> Result<Self> {
        value.as_i64().ok_or_else(|| mismatch("i64", value))
    }
}

impl FromValue for String {
    fn from_value(value: &Value) -> Result<Self> {
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| mismatch("String", value))
    }
}

impl FromValue for Value {
    fn from_value(value: &Value) -> Result<Self> {
        Ok(value.clone())
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: &Value) -> Result<Self> {
        if value.is_null() {
            Ok(None)
        } else {
            T::from_value(value).map(Some)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn emp_row() -> Row {
        Row::new(
            vec!["EMPNO".to_string(), "ENAME".to_string(), "COMM".to_string()],
            vec![Value::Double(7839.0), Value::from("KING"), Value::Null],
        )
    }

    #[test]
    fn test_row_access() {
        let row = emp_row();
        assert_eq!(row.len(), 3);
        assert_eq!(row.get(1), Some(&Value::from("KING")));
        assert_eq!(row.get_by_name("EMPNO"), Some(&Value::Double(7839.0)));
        assert!(row.contains_column("COMM"));
        assert!(!row.contains_column("SAL"));
        assert_eq!(
            row.column_names().collect::<Vec<_>>(),
            ["EMPNO", "ENAME", "COMM"]
        );
    }

    #[test]
    fn test_typed_access() {
        let row = emp_row();
        assert_eq!(row.get_named::<i64>("EMPNO").unwrap(), 7839);
        assert_eq!(row.get_named::<String>("ENAME").unwrap(), "KING");
        assert_eq!(row.get_named::<Option<f64>>("COMM").unwrap(), None);
        assert_eq!(row.get_as::<f64>(0).unwrap(), 7839.0);

        let err = row.get_named::<f64>("ENAME").unwrap_err();
        match err {
            Error::Type(te) => {
                assert_eq!(te.column.as_deref(), Some("ENAME"));
                assert_eq!(te.actual, "TEXT");
            }
            other => panic!("expected type error, got {other:?}"),
        }
        assert!(row.get_as::<String>(9).is_err());
        assert!(row.get_named::<String>("SAL").is_err());
    }

    #[test]
    fn test_duplicate_names_overwrite_in_place() {
        let row = Row::from_pairs([
            ("A", Value::from("first")),
            ("B", Value::from("b")),
            ("A", Value::from("second")),
        ]);
        assert_eq!(row.len(), 2);
        assert_eq!(row.column_names().collect::<Vec<_>>(), ["A", "B"]);
        assert_eq!(row.get_by_name("A"), Some(&Value::from("second")));
    }

    #[test]
    fn test_with_columns_shares_metadata() {
        let columns = Arc::new(ColumnInfo::new(["X", "Y"]));
        let a = Row::with_columns(Arc::clone(&columns), vec![Value::Double(1.0)]);
        let b = Row::with_columns(
            Arc::clone(&columns),
            vec![Value::Double(1.0), Value::Double(2.0), Value::Double(3.0)],
        );
        assert!(Arc::ptr_eq(&a.column_info(), &b.column_info()));
        assert_eq!(a.len(), 1);
        assert_eq!(a.column_names().collect::<Vec<_>>(), ["X"]);
        assert_eq!(b.len(), 2);
    }

    #[test]
    fn test_json() {
        let row = emp_row();
        assert_eq!(
            row.to_json(),
            serde_json::json!({"EMPNO": 7839.0, "ENAME": "KING", "COMM": null})
        );
        assert_eq!(
            serde_json::to_string(&row).unwrap(),
            r#"{"EMPNO":7839.0,"ENAME":"KING","COMM":null}"#
        );
    }

    #[test]
    fn test_json_keeps_column_order() {
        let row = Row::new(
            vec!["ZED".to_string(), "ALPHA".to_string(), "MID".to_string()],
            vec![Value::Double(1.0), Value::from("2"), Value::Null],
        );
        let json = row.to_json();
        let keys: Vec<&str> = json
            .as_object()
            .unwrap()
            .keys()
            .map(String::as_str)
            .collect();
        assert_eq!(keys, ["ZED", "ALPHA", "MID"]);
        assert_eq!(
            serde_json::to_string(&json).unwrap(),
            r#"{"ZED":1.0,"ALPHA":"2","MID":null}"#
        );
        assert_eq!(
            serde_json::to_string(&json).unwrap(),
            serde_json::to_string(&row).unwrap()
        );
    }
}
