//! Error types for tabkit.
//!
//! This module provides a unified error type with explicit variants for
//! transport, protocol, and input validation errors.

use std::fmt;
use thiserror::Error;

/// The unified error type for tabkit operations.
///
/// Every table store and the paging helpers report failures through this
/// type, so callers can match on the category without knowing the backend.
#[derive(Debug, Error)]
pub enum Error {
    /// Transport errors (connection, timeout, filesystem I/O).
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Protocol errors (service error responses, unexpected payloads).
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Input validation errors (bad table name, key, URL or property).
    #[error("invalid input: {0}")]
    InvalidInput(#[from] InvalidInputError),
}

impl Error {
    /// Returns the service error code when this is a protocol error.
    pub fn code(&self) -> Option<&str> {
        match self {
            Error::Protocol(err) => err.code.as_deref(),
            _ => None,
        }
    }

    /// Returns true if the error reports a missing table or entity.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::Protocol(err) if err.status == 404)
    }
}

/// Transport-level errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Network connection failed.
    #[error("connection failed: {message}")]
    Connection { message: String },

    /// Request timed out.
    #[error("request timed out")]
    Timeout,

    /// Generic HTTP error.
    #[error("HTTP error: {message}")]
    Http { message: String },

    /// Local filesystem error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Protocol-level errors reported by a table service.
#[derive(Debug)]
pub struct ProtocolError {
    /// HTTP status code (or its equivalent for local stores).
    pub status: u16,
    /// Service error code, e.g. `TableNotFound`.
    pub code: Option<String>,
    /// Error message from the service.
    pub message: Option<String>,
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HTTP {}", self.status)?;
        if let Some(ref code) = self.code {
            write!(f, " [{}]", code)?;
        }
        if let Some(ref message) = self.message {
            write!(f, ": {}", message)?;
        }
        Ok(())
    }
}

impl std::error::Error for ProtocolError {}

impl ProtocolError {
    /// Create a new protocol error.
    pub fn new(status: u16, code: Option<String>, message: Option<String>) -> Self {
        Self {
            status,
            code,
            message,
        }
    }

    /// A 404 `TableNotFound` error for the given table.
    pub fn table_not_found(table: &str) -> Self {
        Self::new(
            404,
            Some("TableNotFound".to_string()),
            Some(format!("Table {} not found", table)),
        )
    }

    /// Check if the service reported that the table already exists.
    pub fn is_table_exists(&self) -> bool {
        self.status == 409 && self.code.as_deref() == Some("TableAlreadyExists")
    }
}

/// Input validation errors.
#[derive(Debug, Error)]
pub enum InvalidInputError {
    /// Invalid table name.
    #[error("invalid table name '{value}': {reason}")]
    TableName { value: String, reason: String },

    /// Invalid partition or row key.
    #[error("invalid key '{value}': {reason}")]
    Key { value: String, reason: String },

    /// Invalid storage URL.
    #[error("invalid storage URL '{value}': {reason}")]
    StorageUrl { value: String, reason: String },

    /// Missing or mistyped entity property.
    #[error("invalid property '{name}': {reason}")]
    Property { name: String, reason: String },

    /// A list element contains the list delimiter and cannot be joined losslessly.
    #[error("value '{value}' contains the delimiter '{delimiter}'")]
    Delimiter { value: String, delimiter: char },

    /// Generic invalid input.
    #[error("invalid input: {message}")]
    Other { message: String },
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::InvalidInput(InvalidInputError::Other {
            message: err.to_string(),
        })
    }
}
