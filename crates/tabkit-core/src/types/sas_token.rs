//! Shared access signature token.

use std::fmt;

/// A shared access signature query string appended to every request.
///
/// The token is passed through verbatim; tabkit never signs requests itself.
///
/// # Security
///
/// - Never logged or displayed in Debug output
/// - Treat as opaque; do not parse or inspect
#[derive(Clone, PartialEq, Eq)]
pub struct SasToken(String);

impl SasToken {
    /// Create a SAS token, stripping a leading `?` if present.
    pub fn new(token: impl Into<String>) -> Self {
        let token = token.into();
        match token.strip_prefix('?') {
            Some(rest) => Self(rest.to_string()),
            None => Self(token),
        }
    }

    /// Returns the query string without the leading `?`.
    ///
    /// # Security
    ///
    /// Use only when constructing request URLs.
    pub fn as_query(&self) -> &str {
        &self.0
    }
}

// Hide token value in Debug output
impl fmt::Debug for SasToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SasToken").field(&"[REDACTED]").finish()
    }
}
