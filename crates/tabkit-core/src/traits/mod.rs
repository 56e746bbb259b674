//! Core traits for table store behavior.

mod table;

pub use table::{TableSegments, TableStore};
