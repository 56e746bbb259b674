//! Table service HTTP client implementation.

use chrono::Utc;
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde_json::{Value, json};
use tracing::{debug, instrument, trace};
use url::Url;

use tabkit_core::Result;
use tabkit_core::entity::Entity;
use tabkit_core::error::{Error, ProtocolError, TransportError};
use tabkit_core::paging::{ContinuationToken, Page};
use tabkit_core::query::Query;
use tabkit_core::types::{SasToken, StorageUrl, TableName};

use crate::odata::{self, ErrorResponse, QueryResponse};

/// Service version requested on every call.
pub const API_VERSION: &str = "2019-02-02";

const ACCEPT_MINIMAL_METADATA: &str = "application/json;odata=minimalmetadata";
const DATA_SERVICE_VERSION: &str = "3.0;NetFx";

// Header names are matched case-insensitively but must be declared in lowercase.
const HEADER_NEXT_PARTITION_KEY: &str = "x-ms-continuation-nextpartitionkey";
const HEADER_NEXT_ROW_KEY: &str = "x-ms-continuation-nextrowkey";

// The request URL carries the SAS signature, so it never reaches the message.
fn map_reqwest(err: reqwest::Error) -> Error {
    let err = err.without_url();
    let transport = if err.is_timeout() {
        TransportError::Timeout
    } else if err.is_connect() {
        TransportError::Connection {
            message: err.to_string(),
        }
    } else {
        TransportError::Http {
            message: err.to_string(),
        }
    };
    Error::Transport(transport)
}

fn merge_method() -> Method {
    Method::from_bytes(b"MERGE").expect("MERGE is a valid method token")
}

/// HTTP client for one table service endpoint.
#[derive(Debug, Clone)]
pub struct TableClient {
    client: reqwest::Client,
    storage: StorageUrl,
    sas: Option<SasToken>,
}

impl TableClient {
    /// Create a new client for the given endpoint.
    pub fn new(storage: StorageUrl, sas: Option<SasToken>) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(concat!("tabkit/", env!("CARGO_PKG_VERSION")))
            .build()
            .expect("failed to build HTTP client");

        Self {
            client,
            storage,
            sas,
        }
    }

    /// Returns the endpoint this client is configured for.
    pub fn storage(&self) -> &StorageUrl {
        &self.storage
    }

    /// Create `table`; returns false if it already existed.
    #[instrument(skip(self), fields(storage = %self.storage))]
    pub async fn create_table(&self, table: &TableName) -> Result<bool> {
        let url = self.url("Tables", &[])?;
        debug!(%table, "Creating table");

        let request = self
            .client
            .post(url)
            .header("Prefer", "return-no-content")
            .json(&json!({ "TableName": table.as_str() }));

        match self.send(request).await {
            Ok(_) => Ok(true),
            Err(Error::Protocol(err)) if err.is_table_exists() => {
                trace!("Table already exists");
                Ok(false)
            }
            Err(err) => Err(err),
        }
    }

    /// Merge `entity` into the row with its keys, inserting it if absent.
    #[instrument(skip(self, entity), fields(storage = %self.storage, pk = %entity.partition_key, rk = %entity.row_key))]
    pub async fn merge_entity(&self, table: &TableName, entity: &Entity) -> Result<()> {
        entity.validate()?;

        let resource = format!(
            "{}(PartitionKey='{}',RowKey='{}')",
            table,
            quote(&entity.partition_key),
            quote(&entity.row_key)
        );
        let url = self.url(&resource, &[])?;
        debug!("Merging entity");

        let body = Value::Object(odata::to_json(entity));
        let request = self.client.request(merge_method(), url).json(&body);

        self.send(request).await?;
        Ok(())
    }

    /// Fetch one segment of `query`, resuming at `token`.
    #[instrument(skip(self, query, token), fields(storage = %self.storage, table = %query.table))]
    pub async fn query_entities(
        &self,
        query: &Query,
        token: Option<&ContinuationToken>,
        page_size: Option<u32>,
    ) -> Result<Page<Entity>> {
        let mut params = Vec::new();
        if let Some(filter) = &query.filter {
            params.push(("$filter", filter.to_odata()));
        }
        if let Some(top) = query.take.or(page_size) {
            params.push(("$top", top.to_string()));
        }
        if let Some(token) = token {
            params.push(("NextPartitionKey", token.next_partition_key.clone()));
            if let Some(row_key) = &token.next_row_key {
                params.push(("NextRowKey", row_key.clone()));
            }
        }

        let url = self.url(&format!("{}()", query.table), &params)?;
        debug!(resuming = token.is_some(), "Querying entities");
        trace!(?params, "query parameters");

        let response = self.send(self.client.get(url)).await?;
        let continuation = continuation_from(response.headers());
        let body: QueryResponse = response.json().await.map_err(map_reqwest)?;

        let items = body
            .value
            .into_iter()
            .map(odata::from_json)
            .collect::<Result<Vec<_>>>()?;

        trace!(count = items.len(), more = continuation.is_some(), "Segment received");
        Ok(Page::new(items, continuation))
    }

    /// Build a resource URL with the SAS token and query parameters.
    fn url(&self, resource: &str, params: &[(&str, String)]) -> Result<Url> {
        let mut url = self.storage.resource(resource)?;

        // The token is already URL-encoded and goes in as-is.
        if let Some(sas) = &self.sas {
            url.set_query(Some(sas.as_query()));
        }

        if !params.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (name, value) in params {
                pairs.append_pair(name, value);
            }
        }

        Ok(url)
    }

    fn standard_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_MINIMAL_METADATA));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert("x-ms-version", HeaderValue::from_static(API_VERSION));
        headers.insert(
            "dataserviceversion",
            HeaderValue::from_static(DATA_SERVICE_VERSION),
        );
        headers.insert(
            "maxdataserviceversion",
            HeaderValue::from_static(DATA_SERVICE_VERSION),
        );
        headers
    }

    /// Send a request and turn non-success statuses into protocol errors.
    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let date = Utc::now().format("%a, %d %b %Y %H:%M:%S GMT").to_string();
        let response = request
            .headers(Self::standard_headers())
            .header("x-ms-date", date)
            .send()
            .await
            .map_err(map_reqwest)?;

        let status = response.status();
        trace!(status = %status, "Table service response");

        if status.is_success() {
            Ok(response)
        } else {
            Err(Error::Protocol(Self::parse_error_response(status, response).await))
        }
    }

    async fn parse_error_response(status: StatusCode, response: Response) -> ProtocolError {
        let status = status.as_u16();

        match response.json::<ErrorResponse>().await {
            Ok(body) => ProtocolError::new(
                status,
                body.error.code,
                body.error.message.and_then(|m| m.value),
            ),
            Err(_) => ProtocolError::new(status, None, None),
        }
    }
}

/// Quote a key as an OData string literal body.
fn quote(key: &str) -> String {
    key.replace('\'', "''")
}

fn continuation_from(headers: &HeaderMap) -> Option<ContinuationToken> {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    };

    let next_partition_key = header(HEADER_NEXT_PARTITION_KEY)?;
    Some(ContinuationToken::new(
        next_partition_key,
        header(HEADER_NEXT_ROW_KEY),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_creation() {
        let storage = StorageUrl::emulator();
        let client = TableClient::new(storage.clone(), None);
        assert_eq!(client.storage().as_str(), storage.as_str());
    }

    #[test]
    fn url_keeps_sas_then_appends_params() {
        let client = TableClient::new(
            StorageUrl::emulator(),
            Some(SasToken::new("?sv=2019-02-02&sig=abc%3D")),
        );

        let url = client
            .url("Test()", &[("$top", "5".to_string())])
            .unwrap();

        assert_eq!(
            url.as_str(),
            "http://127.0.0.1:10002/devstoreaccount1/Test()?sv=2019-02-02&sig=abc%3D&%24top=5"
        );
    }

    #[test]
    fn url_without_params_has_no_query() {
        let client = TableClient::new(StorageUrl::emulator(), None);
        let url = client.url("Tables", &[]).unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:10002/devstoreaccount1/Tables");
    }

    #[test]
    fn filter_values_survive_encoding() {
        let client = TableClient::new(StorageUrl::emulator(), None);
        let filter = "NextDate gt datetime'2020-01-01T00:00:00Z'";

        let url = client
            .url("Test()", &[("$filter", filter.to_string())])
            .unwrap();

        assert_eq!(
            url.query(),
            Some("%24filter=NextDate+gt+datetime%272020-01-01T00%3A00%3A00Z%27")
        );
        let (name, value) = url.query_pairs().next().unwrap();
        assert_eq!(name, "$filter");
        assert_eq!(value, filter);
    }

    #[test]
    fn quotes_keys() {
        assert_eq!(quote("O'Brien"), "O''Brien");
    }

    #[test]
    fn entity_resource_is_path_encoded() {
        let client = TableClient::new(StorageUrl::emulator(), None);
        let resource = format!("Test(PartitionKey='{}',RowKey='{}')", quote("O'Brien"), quote("a b"));

        let url = client.url(&resource, &[]).unwrap();

        assert_eq!(
            url.path(),
            "/devstoreaccount1/Test(PartitionKey='O''Brien',RowKey='a%20b')"
        );
    }

    #[test]
    fn continuation_requires_partition_key() {
        let mut headers = HeaderMap::new();
        assert!(continuation_from(&headers).is_none());

        headers.insert(HEADER_NEXT_PARTITION_KEY, HeaderValue::from_static("1!12!U2FtcGxl"));
        headers.insert(HEADER_NEXT_ROW_KEY, HeaderValue::from_static("1!8!cm93"));

        assert_eq!(
            continuation_from(&headers),
            Some(ContinuationToken::new(
                "1!12!U2FtcGxl",
                Some("1!8!cm93".to_string())
            ))
        );
    }
}
