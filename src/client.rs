// 📡 Currency feeds for the table client
//
// `HttpFeed` talks to the REST API; `LocalFeed` calls the query layer
// in-process. Both return records in the order the server produced;
// the client never re-sorts.

use crate::config::ClientConfig;
use crate::dataset::{CurrencyProvider, CurrencyRecord};
use crate::query::{CurrencyQuery, QueryError, SortParams, SortSpec};
use anyhow::{Context, Result};
use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashSet;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Cannot connect to backend server at {url}. Please ensure the backend is running.")]
    Unreachable { url: String },

    #[error("Server responded with status {status}: {message}")]
    Server { status: u16, message: String },

    #[error("Invalid response from server: {0}")]
    Decode(String),

    #[error("Request failed: {0}")]
    Transport(String),

    #[error(transparent)]
    Query(#[from] QueryError),
}

impl FetchError {
    pub fn is_unreachable(&self) -> bool {
        matches!(self, FetchError::Unreachable { .. })
    }
}

/// Source of currency rows for the table.
pub trait CurrencyFeed {
    /// Fetch all records; `sort` is forwarded only when set.
    fn fetch(&self, sort: Option<SortSpec>) -> Result<Vec<CurrencyRecord>, FetchError>;

    /// Fetch records through the validated sort operation.
    fn fetch_sorted(&self, sort: SortSpec) -> Result<Vec<CurrencyRecord>, FetchError> {
        self.fetch(Some(sort))
    }

    /// Distinct currency codes, first-occurrence order.
    fn fetch_currencies(&self) -> Result<Vec<String>, FetchError> {
        let mut seen = HashSet::new();
        Ok(self
            .fetch(None)?
            .into_iter()
            .map(|r| r.currency)
            .filter(|code| seen.insert(code.clone()))
            .collect())
    }

    /// Where the rows come from, for the header bar.
    fn describe(&self) -> String;
}

impl<F: CurrencyFeed + ?Sized> CurrencyFeed for Box<F> {
    fn fetch(&self, sort: Option<SortSpec>) -> Result<Vec<CurrencyRecord>, FetchError> {
        (**self).fetch(sort)
    }

    fn fetch_sorted(&self, sort: SortSpec) -> Result<Vec<CurrencyRecord>, FetchError> {
        (**self).fetch_sorted(sort)
    }

    fn fetch_currencies(&self) -> Result<Vec<String>, FetchError> {
        (**self).fetch_currencies()
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

// ============================================================================
// HTTP FEED
// ============================================================================

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    success: bool,
    #[serde(default)]
    data: T,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Turn a raw response into its `data` payload or a typed failure.
fn decode<T: DeserializeOwned + Default>(status: u16, body: &str) -> Result<T, FetchError> {
    let envelope: Option<Envelope<T>> = serde_json::from_str(body).ok();

    if !(200..300).contains(&status) {
        let message = envelope
            .and_then(|e| e.message.or(e.error))
            .unwrap_or_else(|| format!("HTTP error! status: {status}"));
        return Err(FetchError::Server { status, message });
    }

    let envelope = envelope.ok_or_else(|| FetchError::Decode(truncate(body, 80)))?;
    if !envelope.success {
        return Err(FetchError::Server {
            status,
            message: envelope
                .message
                .unwrap_or_else(|| "Failed to fetch data".to_string()),
        });
    }

    Ok(envelope.data)
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max).collect();
        format!("{cut}...")
    }
}

#[derive(Debug, Clone)]
pub struct HttpFeed {
    client: Client,
    base_url: String,
}

impl HttpFeed {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: config.api_base_url.clone(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// GET `path` under the base URL and decode the envelope's `data`.
    fn get<T: DeserializeOwned + Default>(
        &self,
        path: &str,
        sort: Option<SortSpec>,
    ) -> Result<T, FetchError> {
        let url = self.endpoint(path);
        let mut request = self
            .client
            .get(&url)
            .header(CONTENT_TYPE, "application/json");

        if let Some(spec) = sort {
            request = request.query(&SortParams::from(spec));
        }

        debug!(%url, ?sort, "fetching currency data");

        let response = request.send().map_err(|err| {
            if err.is_connect() || err.is_timeout() {
                FetchError::Unreachable {
                    url: self.base_url.clone(),
                }
            } else {
                FetchError::Transport(err.to_string())
            }
        })?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .map_err(|err| FetchError::Transport(err.to_string()))?;

        decode(status, &body)
    }
}

impl CurrencyFeed for HttpFeed {
    fn fetch(&self, sort: Option<SortSpec>) -> Result<Vec<CurrencyRecord>, FetchError> {
        self.get("", sort)
    }

    fn fetch_sorted(&self, sort: SortSpec) -> Result<Vec<CurrencyRecord>, FetchError> {
        self.get("/sort", Some(sort))
    }

    fn fetch_currencies(&self) -> Result<Vec<String>, FetchError> {
        self.get("/currencies", None)
    }

    fn describe(&self) -> String {
        self.base_url.clone()
    }
}

// ============================================================================
// LOCAL FEED
// ============================================================================

/// In-process feed over the unvalidated list query.
#[derive(Debug)]
pub struct LocalFeed<P> {
    query: CurrencyQuery<P>,
}

impl<P: CurrencyProvider> LocalFeed<P> {
    pub fn new(provider: P) -> Self {
        Self {
            query: CurrencyQuery::new(provider),
        }
    }
}

impl<P: CurrencyProvider> CurrencyFeed for LocalFeed<P> {
    fn fetch(&self, sort: Option<SortSpec>) -> Result<Vec<CurrencyRecord>, FetchError> {
        let params = sort.map(SortParams::from).unwrap_or_default();
        Ok(self.query.list(&params)?.records)
    }

    fn fetch_sorted(&self, sort: SortSpec) -> Result<Vec<CurrencyRecord>, FetchError> {
        Ok(self.query.sorted(&SortParams::from(sort))?.records)
    }

    fn fetch_currencies(&self) -> Result<Vec<String>, FetchError> {
        Ok(self.query.currencies()?)
    }

    fn describe(&self) -> String {
        "local dataset".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::CurrencyDataset;
    use crate::sort::{SortKey, SortOrder};
    use std::time::Duration;

    #[test]
    fn test_decode_success() {
        let body = r#"{"success":true,"data":[{"id":2,"currency":"MYR","amount":899.0,"displayAmount":"899.00","locality":"Malaysia"}],"count":1,"sortBy":null,"order":null}"#;
        let records: Vec<CurrencyRecord> = decode(200, body).unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].currency, "MYR");
        assert_eq!(records[0].display_amount, "899.00");
    }

    #[test]
    fn test_decode_error_status_uses_message() {
        let body = r#"{"success":false,"error":"Invalid sortBy parameter","message":"sortBy must be either \"currency\" or \"amount\""}"#;
        match decode::<Vec<CurrencyRecord>>(400, body).unwrap_err() {
            FetchError::Server { status, message } => {
                assert_eq!(status, 400);
                assert!(message.starts_with("sortBy must be"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_decode_error_status_without_body() {
        match decode::<Vec<CurrencyRecord>>(502, "<html>bad gateway</html>").unwrap_err() {
            FetchError::Server { status, message } => {
                assert_eq!(status, 502);
                assert_eq!(message, "HTTP error! status: 502");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_decode_unsuccessful_envelope() {
        let body = r#"{"success":false,"message":"nope"}"#;
        let err = decode::<Vec<CurrencyRecord>>(200, body).unwrap_err();
        assert!(matches!(err, FetchError::Server { status: 200, .. }));
    }

    #[test]
    fn test_decode_garbage() {
        let err = decode::<Vec<CurrencyRecord>>(200, "not json").unwrap_err();
        assert!(matches!(err, FetchError::Decode(_)));
    }

    #[test]
    fn test_decode_codes() {
        let body = r#"{"success":true,"data":["AUD","MYR","GBP","EUR"],"count":4}"#;
        let codes: Vec<String> = decode(200, body).unwrap();
        assert_eq!(codes, vec!["AUD", "MYR", "GBP", "EUR"]);

        let missing = r#"{"success":false,"error":"Route not found","message":"No route matches /x"}"#;
        let err = decode::<Vec<String>>(404, missing).unwrap_err();
        assert!(matches!(err, FetchError::Server { status: 404, .. }));
    }

    #[test]
    fn test_http_feed_endpoints() {
        let config = ClientConfig {
            api_base_url: "http://localhost:5001/api/v1/currency".to_string(),
            timeout: Duration::from_secs(1),
        };
        let feed = HttpFeed::new(&config).unwrap();

        assert_eq!(feed.endpoint(""), "http://localhost:5001/api/v1/currency");
        assert_eq!(
            feed.endpoint("/sort"),
            "http://localhost:5001/api/v1/currency/sort"
        );
        assert_eq!(
            feed.endpoint("/currencies"),
            "http://localhost:5001/api/v1/currency/currencies"
        );
    }

    #[test]
    fn test_local_feed_sorted_and_currencies() {
        let feed = LocalFeed::new(CurrencyDataset::canonical());

        let sorted = feed
            .fetch_sorted(SortSpec::new(SortKey::Currency, SortOrder::Desc))
            .unwrap();
        let codes: Vec<&str> = sorted.iter().map(|r| r.currency.as_str()).collect();
        assert_eq!(codes, vec!["MYR", "GBP", "EUR", "AUD"]);

        assert_eq!(
            feed.fetch_currencies().unwrap(),
            vec!["AUD", "MYR", "GBP", "EUR"]
        );
    }

    #[test]
    fn test_boxed_feed_default_currencies() {
        struct ListOnly;

        impl CurrencyFeed for ListOnly {
            fn fetch(&self, _sort: Option<SortSpec>) -> Result<Vec<CurrencyRecord>, FetchError> {
                Ok(vec![
                    CurrencyRecord::new(1, "AUD", 1.0, "1.00", "a"),
                    CurrencyRecord::new(2, "GBP", 2.0, "2.00", "b"),
                    CurrencyRecord::new(3, "AUD", 3.0, "3.00", "c"),
                ])
            }

            fn describe(&self) -> String {
                "list only".to_string()
            }
        }

        let feed: Box<dyn CurrencyFeed> = Box::new(ListOnly);
        assert_eq!(feed.fetch_currencies().unwrap(), vec!["AUD", "GBP"]);
        let spec = SortSpec::new(SortKey::Amount, SortOrder::Asc);
        assert_eq!(feed.fetch_sorted(spec).unwrap().len(), 3);
    }

    #[test]
    fn test_local_feed_forwards_sort() {
        let feed = LocalFeed::new(CurrencyDataset::canonical());

        let canonical = feed.fetch(None).unwrap();
        assert_eq!(canonical[0].currency, "AUD");

        let sorted = feed
            .fetch(Some(SortSpec::new(SortKey::Amount, SortOrder::Asc)))
            .unwrap();
        let codes: Vec<&str> = sorted.iter().map(|r| r.currency.as_str()).collect();
        assert_eq!(codes, vec!["MYR", "AUD", "EUR", "GBP"]);
    }

    #[test]
    fn test_http_feed_unreachable() {
        let config = ClientConfig {
            api_base_url: "http://127.0.0.1:1/api/v1/currency".to_string(),
            timeout: Duration::from_secs(2),
        };
        let feed = HttpFeed::new(&config).unwrap();

        let err = feed.fetch(None).unwrap_err();
        assert!(err.is_unreachable(), "{err:?}");
        assert!(err.to_string().contains("127.0.0.1:1"));

        let err = feed.fetch_currencies().unwrap_err();
        assert!(err.is_unreachable(), "{err:?}");
        let spec = SortSpec::new(SortKey::Amount, SortOrder::Desc);
        assert!(feed.fetch_sorted(spec).unwrap_err().is_unreachable());
    }
}
