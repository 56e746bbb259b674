//! OData JSON entity encoding.
//!
//! The table service exchanges entities as flat JSON objects. Types JSON
//! cannot express natively travel as strings with a sibling
//! `<name>@odata.type` annotation.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Deserialize;
use serde_json::{Map, Value};

use tabkit_core::Result;
use tabkit_core::entity::{Entity, PARTITION_KEY, PropertyValue, ROW_KEY, TIMESTAMP};
use tabkit_core::error::{Error, InvalidInputError};

const TYPE_SUFFIX: &str = "@odata.type";
const ETAG: &str = "odata.etag";

const EDM_DATETIME: &str = "Edm.DateTime";
const EDM_INT64: &str = "Edm.Int64";
const EDM_DOUBLE: &str = "Edm.Double";

/// Response body of a table query.
#[derive(Debug, Deserialize)]
pub(crate) struct QueryResponse {
    #[serde(default)]
    pub value: Vec<Map<String, Value>>,
}

/// Error body of a failed request.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorResponse {
    #[serde(rename = "odata.error")]
    pub error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorDetail {
    pub code: Option<String>,
    pub message: Option<ErrorMessage>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorMessage {
    pub value: Option<String>,
}

/// Encode an entity as an OData JSON object.
pub(crate) fn to_json(entity: &Entity) -> Map<String, Value> {
    let mut map = Map::new();
    map.insert(PARTITION_KEY.to_string(), Value::from(entity.partition_key.as_str()));
    map.insert(ROW_KEY.to_string(), Value::from(entity.row_key.as_str()));

    for (name, value) in &entity.properties {
        let (json, edm_type) = match value {
            PropertyValue::String(s) => (Value::from(s.as_str()), None),
            PropertyValue::DateTime(dt) => (Value::from(format_datetime(dt)), Some(EDM_DATETIME)),
            PropertyValue::Int32(v) => (Value::from(*v), None),
            PropertyValue::Int64(v) => (Value::from(v.to_string()), Some(EDM_INT64)),
            PropertyValue::Double(v) => (Value::from(*v), Some(EDM_DOUBLE)),
            PropertyValue::Boolean(b) => (Value::from(*b), None),
        };

        if let Some(edm_type) = edm_type {
            map.insert(format!("{}{}", name, TYPE_SUFFIX), Value::from(edm_type));
        }
        map.insert(name.clone(), json);
    }

    map
}

/// Decode an OData JSON object into an entity.
pub(crate) fn from_json(mut map: Map<String, Value>) -> Result<Entity> {
    let partition_key = take_string(&mut map, PARTITION_KEY)?;
    let row_key = take_string(&mut map, ROW_KEY)?;

    let mut entity = Entity::new(partition_key, row_key)?;

    if let Some(Value::String(ts)) = map.remove(TIMESTAMP) {
        entity.timestamp = Some(parse_datetime(TIMESTAMP, &ts)?);
    }
    if let Some(Value::String(etag)) = map.remove(ETAG) {
        entity.etag = Some(etag);
    }

    let annotations: Map<String, Value> = map
        .iter()
        .filter(|(k, _)| k.ends_with(TYPE_SUFFIX))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();

    for (name, json) in map {
        if name.contains('@') || name.starts_with("odata.") {
            continue;
        }

        let edm_type = annotations
            .get(&format!("{}{}", name, TYPE_SUFFIX))
            .and_then(Value::as_str);

        let value = decode_value(&name, json, edm_type)?;
        entity.properties.insert(name, value);
    }

    Ok(entity)
}

fn decode_value(name: &str, json: Value, edm_type: Option<&str>) -> Result<PropertyValue> {
    match (edm_type, json) {
        (Some(EDM_DATETIME), Value::String(s)) => {
            Ok(PropertyValue::DateTime(parse_datetime(name, &s)?))
        }
        (Some(EDM_INT64), Value::String(s)) => s
            .parse()
            .map(PropertyValue::Int64)
            .map_err(|_| invalid(name, format!("'{}' is not an Int64", s))),
        (Some(EDM_DOUBLE), Value::String(s)) => s
            .parse()
            .map(PropertyValue::Double)
            .map_err(|_| invalid(name, format!("'{}' is not a Double", s))),
        (Some(EDM_DOUBLE), Value::Number(n)) => n
            .as_f64()
            .map(PropertyValue::Double)
            .ok_or_else(|| invalid(name, "number out of range".to_string())),
        // Guid and Binary values are kept in their string form.
        (_, Value::String(s)) => Ok(PropertyValue::String(s)),
        (_, Value::Bool(b)) => Ok(PropertyValue::Boolean(b)),
        (_, Value::Number(n)) => {
            if let Some(v) = n.as_i64() {
                Ok(i32::try_from(v)
                    .map(PropertyValue::Int32)
                    .unwrap_or(PropertyValue::Int64(v)))
            } else {
                n.as_f64()
                    .map(PropertyValue::Double)
                    .ok_or_else(|| invalid(name, "number out of range".to_string()))
            }
        }
        (_, other) => Err(invalid(name, format!("unsupported JSON value {}", other))),
    }
}

fn take_string(map: &mut Map<String, Value>, name: &str) -> Result<String> {
    match map.remove(name) {
        Some(Value::String(s)) => Ok(s),
        _ => Err(invalid(name, "missing or not a string".to_string())),
    }
}

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

fn parse_datetime(name: &str, s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| invalid(name, format!("'{}' is not a date/time: {}", s, e)))
}

fn invalid(name: &str, reason: String) -> Error {
    Error::InvalidInput(InvalidInputError::Property {
        name: name.to_string(),
        reason,
    })
}
