//! The sample record and its entity codec.
//!
//! A [`SampleRecord`] carries a list of names in memory but persists them as a
//! single `;`-joined `NamesList` column. The projection is maintained only at
//! the storage boundary: [`encode`] runs immediately before a write and
//! [`decode`] immediately after a read.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::warn;
use uuid::Uuid;

use super::{Entity, PropertyValue};
use crate::Result;
use crate::error::InvalidInputError;

/// Separator between names in the persisted `NamesList` column.
pub const NAMES_DELIMITER: char = ';';

/// Partition every sample record is created in.
pub const SAMPLE_PARTITION: &str = "Sample";

/// Persisted column holding the joined names.
pub const NAMES_LIST: &str = "NamesList";

/// Persisted column holding the next date.
pub const NEXT_DATE: &str = "NextDate";

/// One sample row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SampleRecord {
    pub partition_key: String,
    pub row_key: String,

    /// Persisted projection of `names`.
    pub names_list: Option<String>,

    /// In-memory names; written only through `names_list`.
    pub names: Vec<String>,

    pub next_date: DateTime<Utc>,
}

impl SampleRecord {
    /// Create a record in the sample partition with a fresh row key.
    pub fn new() -> Self {
        Self {
            partition_key: SAMPLE_PARTITION.to_string(),
            row_key: Uuid::new_v4().to_string(),
            names_list: None,
            names: Vec::new(),
            next_date: DateTime::<Utc>::default(),
        }
    }

    /// Replace the in-memory names.
    pub fn with_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.names = names.into_iter().map(Into::into).collect();
        self
    }

    /// Set the next date.
    pub fn with_next_date(mut self, next_date: DateTime<Utc>) -> Self {
        self.next_date = next_date;
        self
    }
}

impl Default for SampleRecord {
    fn default() -> Self {
        Self::new()
    }
}

/// Project a record onto an entity, ready to be written.
///
/// When `names` is non-empty, `names_list` is refreshed from it first. An
/// empty `names` leaves `names_list` as it was, so a record read back and
/// written again without touching its names keeps its stored list.
///
/// # Errors
///
/// Returns [`InvalidInputError::Delimiter`] if a name contains
/// [`NAMES_DELIMITER`], and [`InvalidInputError::Property`] if `names` is a
/// single empty string, which would be stored as an empty list and read back
/// as no names. The record is left unchanged in both cases. Invalid keys are
/// rejected as well.
pub fn encode(record: &mut SampleRecord) -> Result<Entity> {
    let mut entity = Entity::new(record.partition_key.clone(), record.row_key.clone())?;

    if !record.names.is_empty() {
        if let Some(name) = record.names.iter().find(|n| n.contains(NAMES_DELIMITER)) {
            return Err(InvalidInputError::Delimiter {
                value: name.clone(),
                delimiter: NAMES_DELIMITER,
            }
            .into());
        }

        if let [only] = record.names.as_slice()
            && only.is_empty()
        {
            return Err(InvalidInputError::Property {
                name: NAMES_LIST.to_string(),
                reason: "a single empty name would read back as no names".to_string(),
            }
            .into());
        }

        let mut buf = [0u8; 4];
        let separator: &str = NAMES_DELIMITER.encode_utf8(&mut buf);
        record.names_list = Some(record.names.join(separator));
    }

    if let Some(list) = &record.names_list {
        entity.insert(NAMES_LIST, list.as_str())?;
    }
    entity.insert(NEXT_DATE, record.next_date)?;

    Ok(entity)
}

/// Rebuild a record from an entity that was just read.
///
/// A non-empty `NamesList` is split on [`NAMES_DELIMITER`] into `names`,
/// keeping empty segments. Columns with an unexpected type are skipped and
/// leave the field at its default.
pub fn decode(entity: Entity) -> SampleRecord {
    let mut record = SampleRecord {
        partition_key: entity.partition_key,
        row_key: entity.row_key,
        names_list: None,
        names: Vec::new(),
        next_date: DateTime::<Utc>::default(),
    };

    match entity.properties.get(NAMES_LIST) {
        Some(PropertyValue::String(list)) => record.names_list = Some(list.clone()),
        Some(other) => warn!(
            row_key = %record.row_key,
            kind = other.kind(),
            "Ignoring NamesList with unexpected type"
        ),
        None => {}
    }

    match entity.properties.get(NEXT_DATE) {
        Some(PropertyValue::DateTime(dt)) => record.next_date = *dt,
        Some(other) => warn!(
            row_key = %record.row_key,
            kind = other.kind(),
            "Ignoring NextDate with unexpected type"
        ),
        None => {}
    }

    if let Some(list) = record.names_list.as_deref().filter(|l| !l.is_empty()) {
        record.names = list.split(NAMES_DELIMITER).map(str::to_string).collect();
    }

    record
}
