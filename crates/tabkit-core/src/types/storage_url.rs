//! Storage endpoint URL type.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use url::Url;

use crate::error::{Error, InvalidInputError};

/// Table endpoint of the local storage emulator's well-known development account.
pub const EMULATOR_TABLE_ENDPOINT: &str = "http://127.0.0.1:10002/devstoreaccount1";

const LOOPBACK_HOSTS: [&str; 3] = ["localhost", "127.0.0.1", "[::1]"];

/// Where a table store lives: a table service endpoint or a `file://` directory.
///
/// Service endpoints keep their path, so the emulator's account segment
/// survives in every resource URL. Plain `http` is only accepted on a
/// loopback host. The SAS token travels separately, so a query string here
/// is rejected.
///
/// ```
/// use tabkit_core::StorageUrl;
///
/// let emulator = StorageUrl::new("http://127.0.0.1:10002/devstoreaccount1").unwrap();
/// assert_eq!(emulator.resource("Tables").unwrap().as_str(),
///            "http://127.0.0.1:10002/devstoreaccount1/Tables");
///
/// assert!(StorageUrl::new("file:///tmp/tables").unwrap().is_local());
/// assert!(StorageUrl::new("http://example.com").is_err());
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct StorageUrl(Url);

impl StorageUrl {
    pub fn new(s: impl AsRef<str>) -> Result<Self, Error> {
        let s = s.as_ref();
        let invalid = |reason: &str| -> Error {
            InvalidInputError::StorageUrl {
                value: s.to_string(),
                reason: reason.to_string(),
            }
            .into()
        };

        let url = Url::parse(s).map_err(|e| invalid(&e.to_string()))?;

        match url.scheme() {
            "file" if url.path().is_empty() => Err(invalid("file:// URL must have a path")),
            "file" => Ok(Self(url)),
            "https" | "http" => {
                let host = url.host_str().ok_or_else(|| invalid("must have a host"))?;
                if url.scheme() == "http" && !LOOPBACK_HOSTS.contains(&host) {
                    return Err(invalid("plain http is only allowed on a loopback host"));
                }
                if url.query().is_some() {
                    return Err(invalid("pass the SAS token separately, not in the URL"));
                }
                Ok(Self(url))
            }
            _ => Err(invalid("scheme must be https, http or file")),
        }
    }

    /// The local storage emulator endpoint.
    pub fn emulator() -> Self {
        Self(Url::parse(EMULATOR_TABLE_ENDPOINT).expect("emulator endpoint is a valid URL"))
    }

    /// URL of `resource` below this endpoint, appended as one path segment.
    ///
    /// Characters that are not allowed in a path segment (spaces, `%`) are
    /// percent-encoded; OData punctuation such as `(`, `'` and `=` is kept.
    pub fn resource(&self, resource: &str) -> Result<Url, Error> {
        let mut url = self.0.clone();
        url.path_segments_mut()
            .map_err(|()| InvalidInputError::StorageUrl {
                value: self.0.to_string(),
                reason: "cannot address resources below this URL".to_string(),
            })?
            .pop_if_empty()
            .push(resource);
        Ok(url)
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// True for `file://` stores.
    pub fn is_local(&self) -> bool {
        self.0.scheme() == "file"
    }

    /// Directory of a `file://` store; `None` for service endpoints.
    pub fn to_file_path(&self) -> Option<PathBuf> {
        if self.is_local() {
            self.0.to_file_path().ok()
        } else {
            None
        }
    }
}

impl Default for StorageUrl {
    fn default() -> Self {
        Self::emulator()
    }
}

impl fmt::Display for StorageUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for StorageUrl {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl Serialize for StorageUrl {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.0.as_str())
    }
}

impl<'de> Deserialize<'de> for StorageUrl {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        StorageUrl::new(&s).map_err(serde::de::Error::custom)
    }
}

impl AsRef<str> for StorageUrl {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}
