//! tabkit-http - HTTP-backed table store.
//!
//! Talks to the table service REST API, either on the local storage emulator
//! or on a cloud account, using OData JSON payloads and continuation headers.

mod client;
mod odata;
mod table;

pub use client::{API_VERSION, TableClient};
pub use table::HttpTableStore;
