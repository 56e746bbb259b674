//! Table entities and the sample record projection.
//!
//! An [`Entity`] is the generic unit a table store reads and writes: the
//! partition/row key pair, the system fields the store maintains, and a map
//! of typed properties. Typed records such as [`SampleRecord`] are projected
//! onto entities by explicit encode/decode functions.

mod property;
pub mod sample;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Result;
use crate::error::InvalidInputError;

pub use property::{Properties, PropertyValue};
pub use sample::{NAMES_DELIMITER, SampleRecord};

/// System property holding the partition key.
pub const PARTITION_KEY: &str = "PartitionKey";
/// System property holding the row key.
pub const ROW_KEY: &str = "RowKey";
/// System property holding the last-modified time.
pub const TIMESTAMP: &str = "Timestamp";

const MAX_KEY_BYTES: usize = 1024;

/// One row of a table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    /// Partition half of the entity identity.
    pub partition_key: String,

    /// Row half of the entity identity, unique within the partition.
    pub row_key: String,

    /// Last-modified time, maintained by the store.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,

    /// Opaque version tag, maintained by the store.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,

    /// User properties.
    #[serde(default)]
    pub properties: Properties,
}

impl Entity {
    /// Create an empty entity with validated keys.
    pub fn new(partition_key: impl Into<String>, row_key: impl Into<String>) -> Result<Self> {
        let partition_key = partition_key.into();
        let row_key = row_key.into();
        validate_key(&partition_key)?;
        validate_key(&row_key)?;

        Ok(Self {
            partition_key,
            row_key,
            timestamp: None,
            etag: None,
            properties: Properties::new(),
        })
    }

    /// Set a user property, rejecting the reserved system names.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<PropertyValue>) -> Result<()> {
        let name = name.into();
        validate_property_name(&name)?;
        self.properties.insert(name, value.into());
        Ok(())
    }

    /// Returns a user property by name.
    pub fn get(&self, name: &str) -> Option<&PropertyValue> {
        self.properties.get(name)
    }

    /// Resolve a property by name, including the system properties.
    ///
    /// Filters address keys and the timestamp the same way they address
    /// user properties.
    pub fn resolve(&self, name: &str) -> Option<PropertyValue> {
        match name {
            PARTITION_KEY => Some(PropertyValue::String(self.partition_key.clone())),
            ROW_KEY => Some(PropertyValue::String(self.row_key.clone())),
            TIMESTAMP => self.timestamp.map(PropertyValue::DateTime),
            _ => self.properties.get(name).cloned(),
        }
    }

    /// Check keys and property names.
    pub fn validate(&self) -> Result<()> {
        validate_key(&self.partition_key)?;
        validate_key(&self.row_key)?;
        for name in self.properties.keys() {
            validate_property_name(name)?;
        }
        Ok(())
    }

    /// Overlay the properties of `update` onto this entity.
    ///
    /// Properties absent from `update` are kept. System fields are left for
    /// the store to maintain.
    pub fn merge(&mut self, update: &Entity) {
        for (name, value) in &update.properties {
            self.properties.insert(name.clone(), value.clone());
        }
    }
}

/// Validate a partition or row key.
///
/// Keys may be empty, are limited to 1 KiB, and may not contain `/`, `\`,
/// `#`, `?` or control characters.
pub fn validate_key(key: &str) -> Result<()> {
    if key.len() > MAX_KEY_BYTES {
        return Err(InvalidInputError::Key {
            value: key.to_string(),
            reason: format!("must be at most {} bytes", MAX_KEY_BYTES),
        }
        .into());
    }

    if let Some(c) = key
        .chars()
        .find(|c| matches!(c, '/' | '\\' | '#' | '?') || c.is_control())
    {
        return Err(InvalidInputError::Key {
            value: key.to_string(),
            reason: format!("contains disallowed character {:?}", c),
        }
        .into());
    }

    Ok(())
}

fn validate_property_name(name: &str) -> Result<()> {
    if matches!(name, PARTITION_KEY | ROW_KEY | TIMESTAMP) {
        return Err(InvalidInputError::Property {
            name: name.to_string(),
            reason: "is a reserved system property".to_string(),
        }
        .into());
    }

    if name.is_empty() || name.contains('@') {
        return Err(InvalidInputError::Property {
            name: name.to_string(),
            reason: "is not a valid property name".to_string(),
        }
        .into());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_bad_keys() {
        assert!(Entity::new("Sample", "a/b").is_err());
        assert!(Entity::new("Sam#ple", "x").is_err());
        assert!(Entity::new("Sample", "tab\there").is_err());
        assert!(Entity::new("x".repeat(1025), "y").is_err());
    }

    #[test]
    fn reserved_property_names() {
        let mut entity = Entity::new("Sample", "1").unwrap();
        assert!(entity.insert("RowKey", "2").is_err());
        assert!(entity.insert("Name@odata.type", "Edm.String").is_err());
        assert!(entity.insert("Name", "value").is_ok());
    }

    #[test]
    fn resolve_system_properties() {
        let mut entity = Entity::new("Sample", "42").unwrap();
        entity.insert("Count", 3i32).unwrap();

        assert_eq!(entity.resolve("RowKey"), Some(PropertyValue::from("42")));
        assert_eq!(entity.resolve("Count"), Some(PropertyValue::Int32(3)));
        assert_eq!(entity.resolve("Timestamp"), None);
        assert_eq!(entity.resolve("Missing"), None);
    }

    #[test]
    fn merge_keeps_unmentioned_properties() {
        let mut existing = Entity::new("Sample", "1").unwrap();
        existing.insert("A", "old").unwrap();
        existing.insert("B", "kept").unwrap();

        let mut update = Entity::new("Sample", "1").unwrap();
        update.insert("A", "new").unwrap();
        update.insert("C", true).unwrap();

        existing.merge(&update);

        assert_eq!(existing.get("A"), Some(&PropertyValue::from("new")));
        assert_eq!(existing.get("B"), Some(&PropertyValue::from("kept")));
        assert_eq!(existing.get("C"), Some(&PropertyValue::Boolean(true)));
    }
}
