//! Typed entity property values.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The named properties of an entity, excluding its keys and system fields.
pub type Properties = BTreeMap<String, PropertyValue>;

/// A single typed property value.
///
/// The variants mirror the primitive types a table service stores natively.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum PropertyValue {
    String(String),
    DateTime(DateTime<Utc>),
    Int32(i32),
    Int64(i64),
    Double(f64),
    Boolean(bool),
}

impl PropertyValue {
    /// Returns the string value, if this is a string property.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the timestamp, if this is a date/time property.
    pub fn as_datetime(&self) -> Option<DateTime<Utc>> {
        match self {
            PropertyValue::DateTime(dt) => Some(*dt),
            _ => None,
        }
    }

    /// Returns the integer value, widening `Int32`.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            PropertyValue::Int32(v) => Some(i64::from(*v)),
            PropertyValue::Int64(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the boolean value, if this is a boolean property.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PropertyValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Short name of the stored type, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            PropertyValue::String(_) => "String",
            PropertyValue::DateTime(_) => "DateTime",
            PropertyValue::Int32(_) => "Int32",
            PropertyValue::Int64(_) => "Int64",
            PropertyValue::Double(_) => "Double",
            PropertyValue::Boolean(_) => "Boolean",
        }
    }

    /// Compare two values of compatible kinds.
    ///
    /// Integers compare across widths and against doubles. Values of
    /// unrelated kinds are unordered.
    pub fn compare(&self, other: &PropertyValue) -> Option<Ordering> {
        use PropertyValue::*;

        match (self, other) {
            (String(a), String(b)) => Some(a.cmp(b)),
            (DateTime(a), DateTime(b)) => Some(a.cmp(b)),
            (Boolean(a), Boolean(b)) => Some(a.cmp(b)),
            (Double(a), Double(b)) => a.partial_cmp(b),
            (Double(a), b) => b.as_i64().and_then(|b| a.partial_cmp(&(b as f64))),
            (a, Double(b)) => a.as_i64().and_then(|a| (a as f64).partial_cmp(b)),
            (a, b) => match (a.as_i64(), b.as_i64()) {
                (Some(a), Some(b)) => Some(a.cmp(&b)),
                _ => None,
            },
        }
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        PropertyValue::String(value)
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        PropertyValue::String(value.to_string())
    }
}

impl From<DateTime<Utc>> for PropertyValue {
    fn from(value: DateTime<Utc>) -> Self {
        PropertyValue::DateTime(value)
    }
}

impl From<i32> for PropertyValue {
    fn from(value: i32) -> Self {
        PropertyValue::Int32(value)
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        PropertyValue::Int64(value)
    }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        PropertyValue::Double(value)
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        PropertyValue::Boolean(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn compares_same_kind() {
        let a = PropertyValue::from("apple");
        let b = PropertyValue::from("banana");
        assert_eq!(a.compare(&b), Some(Ordering::Less));

        let early = PropertyValue::from(Utc.with_ymd_and_hms(2000, 1, 1, 0, 0, 0).unwrap());
        let late = PropertyValue::from(Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap());
        assert_eq!(late.compare(&early), Some(Ordering::Greater));
    }

    #[test]
    fn compares_numeric_widths() {
        assert_eq!(
            PropertyValue::Int32(5).compare(&PropertyValue::Int64(5)),
            Some(Ordering::Equal)
        );
        assert_eq!(
            PropertyValue::Int64(2).compare(&PropertyValue::Double(2.5)),
            Some(Ordering::Less)
        );
    }

    #[test]
    fn unrelated_kinds_are_unordered() {
        assert_eq!(
            PropertyValue::from("5").compare(&PropertyValue::Int32(5)),
            None
        );
    }

    #[test]
    fn tagged_json_shape() {
        let json = serde_json::to_value(PropertyValue::Int64(7)).unwrap();
        assert_eq!(json, serde_json::json!({"type": "Int64", "value": 7}));
    }
}
