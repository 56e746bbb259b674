//! Storage configuration.

use serde::{Deserialize, Deserializer};

use crate::types::{SasToken, StorageUrl, TableName};
use crate::Result;

/// Name of the table the sample workflow uses.
pub const DEFAULT_TABLE: &str = "Test";

/// Everything needed to reach one table.
///
/// Built once by the caller and handed to whatever constructs the store.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Endpoint or `file://` directory of the store.
    #[serde(default)]
    pub storage: StorageUrl,

    /// Table the workflow reads and writes.
    #[serde(default = "default_table")]
    pub table: TableName,

    /// Shared access signature appended to network requests.
    #[serde(default, deserialize_with = "deserialize_sas")]
    pub sas: Option<SasToken>,

    /// Maximum entities per query segment.
    #[serde(default)]
    pub page_size: Option<u32>,
}

impl StorageConfig {
    /// Configuration for the local emulator and the default table.
    pub fn emulator() -> Self {
        Self {
            storage: StorageUrl::emulator(),
            table: default_table(),
            sas: None,
            page_size: None,
        }
    }

    /// Build a configuration from raw strings.
    pub fn new(storage: &str, table: &str, sas: Option<String>) -> Result<Self> {
        Ok(Self {
            storage: StorageUrl::new(storage)?,
            table: TableName::new(table)?,
            sas: sas.filter(|s| !s.is_empty()).map(SasToken::new),
            page_size: None,
        })
    }

    /// Set the segment size.
    pub fn with_page_size(mut self, page_size: Option<u32>) -> Self {
        self.page_size = page_size;
        self
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self::emulator()
    }
}

fn default_table() -> TableName {
    TableName::new(DEFAULT_TABLE).expect("default table name is valid")
}

fn deserialize_sas<'de, D>(deserializer: D) -> std::result::Result<Option<SasToken>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.is_empty()).map(SasToken::new))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_emulator() {
        let config: StorageConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.storage, StorageUrl::emulator());
        assert_eq!(config.table.as_str(), "Test");
        assert!(config.sas.is_none());
    }

    #[test]
    fn deserializes_all_fields() {
        let config: StorageConfig = serde_json::from_str(
            r#"{"storage": "file:///tmp/tables", "table": "Orders", "sas": "?sv=1", "page_size": 10}"#,
        )
        .unwrap();
        assert!(config.storage.is_local());
        assert_eq!(config.table.as_str(), "Orders");
        assert_eq!(config.sas.unwrap().as_query(), "sv=1");
        assert_eq!(config.page_size, Some(10));
    }

    #[test]
    fn rejects_invalid_table() {
        assert!(StorageConfig::new("file:///tmp/tables", "x", None).is_err());
    }

    #[test]
    fn empty_sas_is_none() {
        let config = StorageConfig::new("file:///tmp/tables", "Test", Some(String::new())).unwrap();
        assert!(config.sas.is_none());
    }
}
