//! Filesystem storage for the file-backed table store.
//!
//! Layout under the root directory:
//!
//! ```text
//! tables/<table>/.lock
//! tables/<table>/k<hex(partition key)>/k<hex(row key)>.json
//! ```
//!
//! Keys are hex-encoded so that any valid key is a safe file name and so that
//! sorting directory entries by name orders entities by key bytes, which is
//! the order the table service returns them in.

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

use chrono::Utc;
use fs2::FileExt;
use tracing::{debug, instrument, trace};
use uuid::Uuid;

use tabkit_core::Result;
use tabkit_core::entity::Entity;
use tabkit_core::error::{Error, InvalidInputError, ProtocolError, TransportError};
use tabkit_core::paging::{ContinuationToken, Page};
use tabkit_core::query::Query;
use tabkit_core::types::TableName;

/// Segment size used when the query sets no `take`.
pub const DEFAULT_PAGE_SIZE: u32 = 1000;

const KEY_PREFIX: char = 'k';
const ENTITY_EXTENSION: &str = "json";

fn map_io(err: std::io::Error) -> Error {
    Error::Transport(TransportError::Io(err))
}

/// Filesystem-backed storage for a local table store.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Create a new file store at the given root directory.
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Get the root directory path.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn tables_dir(&self) -> PathBuf {
        self.root.join("tables")
    }

    fn table_dir(&self, table: &TableName) -> PathBuf {
        self.tables_dir().join(table.as_str())
    }

    fn lock_path(&self, table: &TableName) -> PathBuf {
        self.table_dir(table).join(".lock")
    }

    fn entity_path(&self, table: &TableName, partition_key: &str, row_key: &str) -> PathBuf {
        self.table_dir(table)
            .join(encode_key(partition_key))
            .join(format!("{}.{}", encode_key(row_key), ENTITY_EXTENSION))
    }

    /// Returns true if the table directory exists.
    pub fn table_exists(&self, table: &TableName) -> bool {
        self.table_dir(table).is_dir()
    }

    fn ensure_table(&self, table: &TableName) -> Result<()> {
        if self.table_exists(table) {
            Ok(())
        } else {
            Err(ProtocolError::table_not_found(table.as_str()).into())
        }
    }

    // ========================================================================
    // Table Management
    // ========================================================================

    #[instrument(skip(self))]
    pub fn create_table(&self, table: &TableName) -> Result<bool> {
        let dir = self.table_dir(table);

        if dir.is_dir() {
            trace!("Table already exists");
            return Ok(false);
        }

        fs::create_dir_all(&dir).map_err(map_io)?;
        debug!(path = %dir.display(), "Created table");

        Ok(true)
    }

    // ========================================================================
    // Entity Operations
    // ========================================================================

    fn read_entity(path: &Path) -> Result<Entity> {
        let content = fs::read_to_string(path).map_err(map_io)?;
        Ok(serde_json::from_str(&content)?)
    }

    #[cfg(test)]
    fn get_entity(
        &self,
        table: &TableName,
        partition_key: &str,
        row_key: &str,
    ) -> Result<Option<Entity>> {
        self.ensure_table(table)?;

        let path = self.entity_path(table, partition_key, row_key);
        if !path.exists() {
            return Ok(None);
        }

        Self::read_entity(&path).map(Some)
    }

    /// Insert `entity`, or merge its properties into the stored one.
    #[instrument(skip(self, entity), fields(pk = %entity.partition_key, rk = %entity.row_key))]
    pub fn insert_or_merge(&self, table: &TableName, entity: &Entity) -> Result<()> {
        entity.validate()?;
        self.ensure_table(table)?;

        let lock_file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(self.lock_path(table))
            .map_err(map_io)?;

        lock_file.lock_exclusive().map_err(map_io)?;

        let path = self.entity_path(table, &entity.partition_key, &entity.row_key);

        let mut stored = if path.exists() {
            let mut existing = Self::read_entity(&path)?;
            existing.merge(entity);
            existing
        } else {
            Entity {
                timestamp: None,
                etag: None,
                ..entity.clone()
            }
        };

        stored.timestamp = Some(Utc::now());
        stored.etag = Some(format!("W/\"{}\"", Uuid::new_v4()));

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(map_io)?;
        }

        let content = serde_json::to_string_pretty(&stored)?;
        let temp_path = path.with_extension("tmp");
        fs::write(&temp_path, &content).map_err(map_io)?;
        fs::rename(&temp_path, &path).map_err(map_io)?;

        lock_file.unlock().map_err(map_io)?;

        debug!("Stored entity");

        Ok(())
    }

    /// Read one segment of `query`, starting at `token`.
    ///
    /// Entities are visited in key order. Up to `page_size` matching
    /// entities are returned; if any entity remains after the last one
    /// visited, the continuation points at it.
    #[instrument(skip(self, query, token), fields(table = %query.table))]
    pub fn query_segment(
        &self,
        query: &Query,
        token: Option<&ContinuationToken>,
        page_size: u32,
    ) -> Result<Page<Entity>> {
        self.ensure_table(&query.table)?;

        let limit = query.take.unwrap_or(page_size).max(1) as usize;
        let start_pk = token.map(|t| encode_key(&t.next_partition_key));
        let start_rk = token
            .and_then(|t| t.next_row_key.as_deref())
            .map(encode_key);

        let mut items = Vec::new();

        for partition in sorted_entries(&self.table_dir(&query.table), true)? {
            if start_pk.as_ref().is_some_and(|start| &partition < start) {
                continue;
            }
            let same_partition = start_pk.as_ref() == Some(&partition);

            let partition_dir = self.table_dir(&query.table).join(&partition);
            for file in sorted_entries(&partition_dir, false)? {
                let Some(row) = file
                    .strip_suffix(ENTITY_EXTENSION)
                    .and_then(|stem| stem.strip_suffix('.'))
                else {
                    continue;
                };

                if same_partition && start_rk.as_deref().is_some_and(|start| row < start) {
                    continue;
                }

                if items.len() == limit {
                    let continuation = ContinuationToken::new(
                        decode_key(&partition)?,
                        Some(decode_key(row)?),
                    );
                    trace!(count = items.len(), "Segment full");
                    return Ok(Page::new(items, Some(continuation)));
                }

                let entity = Self::read_entity(&partition_dir.join(&file))?;
                if query.matches(&entity) {
                    items.push(entity);
                }
            }
        }

        trace!(count = items.len(), "Final segment");
        Ok(Page::last(items))
    }
}

/// Names of the entries of `dir` that start with the key prefix, sorted.
///
/// `dirs` selects directories (partitions) or files (entities).
fn sorted_entries(dir: &Path, dirs: bool) -> Result<Vec<String>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut names: Vec<String> = fs::read_dir(dir)
        .map_err(map_io)?
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_dir() == dirs)
        .filter_map(|e| e.file_name().into_string().ok())
        .filter(|name| name.starts_with(KEY_PREFIX))
        .filter(|name| dirs || name.ends_with(ENTITY_EXTENSION))
        .collect();

    names.sort();
    Ok(names)
}

/// Encode a key as a prefixed lowercase hex file name.
fn encode_key(key: &str) -> String {
    let mut out = String::with_capacity(1 + key.len() * 2);
    out.push(KEY_PREFIX);
    for byte in key.as_bytes() {
        out.push_str(&format!("{:02x}", byte));
    }
    out
}

fn decode_key(name: &str) -> Result<String> {
    let invalid = || -> Error {
        InvalidInputError::Key {
            value: name.to_string(),
            reason: "not a stored key name".to_string(),
        }
        .into()
    };

    let hex = name.strip_prefix(KEY_PREFIX).ok_or_else(invalid)?;
    if hex.len() % 2 != 0 {
        return Err(invalid());
    }

    let bytes = (0..hex.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| invalid()))
        .collect::<Result<Vec<u8>>>()?;

    String::from_utf8(bytes).map_err(|_| invalid())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabkit_core::entity::PropertyValue;
    use tabkit_core::query::Filter;
    use tempfile::TempDir;

    fn table() -> TableName {
        TableName::new("Test").unwrap()
    }

    fn entity(pk: &str, rk: &str, n: i32) -> Entity {
        let mut entity = Entity::new(pk, rk).unwrap();
        entity.insert("N", n).unwrap();
        entity
    }

    fn store_with_rows(rows: &[(&str, &str, i32)]) -> (TempDir, FileStore) {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path());
        store.create_table(&table()).unwrap();
        for (pk, rk, n) in rows {
            store.insert_or_merge(&table(), &entity(pk, rk, *n)).unwrap();
        }
        (dir, store)
    }

    #[test]
    fn key_encoding_round_trips() {
        for key in ["", "Sample", "a b;c", "ünïcødé"] {
            assert_eq!(decode_key(&encode_key(key)).unwrap(), key);
        }
        assert!(decode_key("zz").is_err());
        assert!(decode_key("k0").is_err());
    }

    #[test]
    fn key_encoding_preserves_order() {
        let mut keys = vec!["b", "a", "ab", "", "B"];
        let mut encoded: Vec<_> = keys.iter().map(|k| encode_key(k)).collect();
        keys.sort();
        encoded.sort();
        let decoded: Vec<_> = encoded.iter().map(|e| decode_key(e).unwrap()).collect();
        assert_eq!(decoded, keys);
    }

    #[test]
    fn create_table_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path());

        assert!(store.create_table(&table()).unwrap());
        assert!(!store.create_table(&table()).unwrap());
        assert!(store.table_exists(&table()));
    }

    #[test]
    fn insert_requires_table() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path());

        let err = store
            .insert_or_merge(&table(), &entity("p", "r", 1))
            .unwrap_err();

        assert!(err.is_not_found());
    }

    #[test]
    fn merge_keeps_existing_properties() {
        let (_dir, store) = store_with_rows(&[("p", "r", 1)]);

        let mut update = Entity::new("p", "r").unwrap();
        update.insert("Extra", "x").unwrap();
        store.insert_or_merge(&table(), &update).unwrap();

        let stored = store.get_entity(&table(), "p", "r").unwrap().unwrap();
        assert_eq!(stored.get("N"), Some(&PropertyValue::Int32(1)));
        assert_eq!(stored.get("Extra"), Some(&PropertyValue::from("x")));
        assert!(stored.timestamp.is_some());
        assert!(stored.etag.is_some());
    }

    #[test]
    fn segments_follow_key_order() {
        let (_dir, store) = store_with_rows(&[("b", "1", 3), ("a", "2", 2), ("a", "1", 1)]);
        let query = Query::new(table());

        let page = store.query_segment(&query, None, 2).unwrap();
        let keys: Vec<_> = page
            .items
            .iter()
            .map(|e| (e.partition_key.as_str(), e.row_key.as_str()))
            .collect();
        assert_eq!(keys, vec![("a", "1"), ("a", "2")]);
        assert_eq!(
            page.continuation,
            Some(ContinuationToken::new("b", Some("1".to_string())))
        );

        let page = store
            .query_segment(&query, page.continuation.as_ref(), 2)
            .unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].partition_key, "b");
        assert!(page.is_last());
    }

    #[test]
    fn exact_fit_has_no_continuation() {
        let (_dir, store) = store_with_rows(&[("a", "1", 1), ("a", "2", 2)]);

        let page = store.query_segment(&Query::new(table()), None, 2).unwrap();

        assert_eq!(page.items.len(), 2);
        assert!(page.is_last());
    }

    #[test]
    fn filter_applies_within_segment() {
        let (_dir, store) = store_with_rows(&[("a", "1", 1), ("a", "2", 5), ("a", "3", 9)]);
        let query = Query::new(table()).with_filter(Filter::gt("N", 4i32));

        let page = store.query_segment(&query, None, 10).unwrap();

        let ns: Vec<_> = page.items.iter().map(|e| e.get("N").cloned()).collect();
        assert_eq!(
            ns,
            vec![Some(PropertyValue::Int32(5)), Some(PropertyValue::Int32(9))]
        );
    }

    #[test]
    fn take_overrides_page_size() {
        let (_dir, store) = store_with_rows(&[("a", "1", 1), ("a", "2", 2), ("a", "3", 3)]);
        let query = Query::new(table()).with_take(1);

        let page = store.query_segment(&query, None, 1000).unwrap();

        assert_eq!(page.items.len(), 1);
        assert!(!page.is_last());
    }

    #[test]
    fn query_missing_table_is_not_found() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path());

        let err = store
            .query_segment(&Query::new(table()), None, 10)
            .unwrap_err();

        assert!(err.is_not_found());
    }
}
