//! Table name type.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, InvalidInputError};

/// A validated table name.
///
/// Table names are 3 to 63 ASCII alphanumeric characters and must start
/// with a letter. The name `tables` is reserved by the service.
///
/// # Example
///
/// ```
/// use tabkit_core::TableName;
///
/// let table = TableName::new("Test").unwrap();
/// assert_eq!(table.as_str(), "Test");
/// assert!(TableName::new("1abc").is_err());
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TableName(String);

impl TableName {
    /// Create a new table name from a string, validating the format.
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not a valid table name.
    pub fn new(s: impl Into<String>) -> Result<Self, Error> {
        let s = s.into();
        Self::validate(&s)?;
        Ok(Self(s))
    }

    /// Returns the table name as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn validate(s: &str) -> Result<(), Error> {
        let invalid = |reason: &str| -> Error {
            InvalidInputError::TableName {
                value: s.to_string(),
                reason: reason.to_string(),
            }
            .into()
        };

        if s.len() < 3 || s.len() > 63 {
            return Err(invalid("must be between 3 and 63 characters"));
        }

        if !s.starts_with(|c: char| c.is_ascii_alphabetic()) {
            return Err(invalid("must start with a letter"));
        }

        if !s.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(invalid("may only contain letters and digits"));
        }

        if s.eq_ignore_ascii_case("tables") {
            return Err(invalid("is reserved"));
        }

        Ok(())
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TableName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for TableName {
    type Error = Error;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<TableName> for String {
    fn from(table: TableName) -> Self {
        table.0
    }
}

impl AsRef<str> for TableName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
