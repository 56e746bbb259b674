//! tabkit-file - Filesystem-backed table store.
//!
//! Stands in for the storage emulator during local development and tests:
//! tables are directories, entities are JSON files, and queries are served in
//! segments with continuation tokens just like the network service.

mod store;
mod table;

pub use store::{DEFAULT_PAGE_SIZE, FileStore};
pub use table::FileTableStore;
