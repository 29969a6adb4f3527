//! Symbol search client

use super::{SymbolSearch, http_client, with_bearer};
use crate::config::ClientConfig;
use crate::error::{ReportError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use url::Url;

/// One symbol found by a search
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchCandidate {
    pub exchange: String,
    /// Unique within one result set
    pub symbol: String,
    pub short_name: Option<String>,
    pub long_name: Option<String>,
    pub sector: Option<String>,
    pub quote_type: Option<String>,
}

impl SearchCandidate {
    /// Long name, else short name, else the symbol
    pub fn display_name(&self) -> &str {
        self.long_name
            .as_deref()
            .or(self.short_name.as_deref())
            .unwrap_or(self.symbol.as_str())
    }
}

/// Search result item as the backend sends it.
///
/// The backend forwards provider fields mostly untouched, so both snake and
/// camel spellings show up.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawCandidate {
    exchange: Option<String>,
    symbol: Option<String>,
    #[serde(alias = "shortName")]
    shortname: Option<String>,
    #[serde(alias = "longName")]
    longname: Option<String>,
    sector: Option<String>,
    #[serde(alias = "quoteType")]
    quote_type: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl RawCandidate {
    fn into_candidate(self) -> Option<SearchCandidate> {
        let symbol = non_empty(self.symbol)?;
        Some(SearchCandidate {
            exchange: self.exchange.unwrap_or_default(),
            symbol,
            short_name: non_empty(self.shortname),
            long_name: non_empty(self.longname),
            sector: non_empty(self.sector),
            quote_type: non_empty(self.quote_type),
        })
    }
}

/// Normalize a search response body into candidates.
///
/// Anything other than a JSON array yields an empty list; items that are not
/// objects or have no symbol are skipped.
pub fn parse_search_results(body: &str) -> Vec<SearchCandidate> {
    let value: serde_json::Value = match serde_json::from_str(body) {
        Ok(value) => value,
        Err(e) => {
            warn!("Search response is not JSON, treating as empty: {e}");
            return Vec::new();
        }
    };

    let serde_json::Value::Array(items) = value else {
        debug!("Search response is not an array, treating as empty");
        return Vec::new();
    };

    items
        .into_iter()
        .filter_map(|item| serde_json::from_value::<RawCandidate>(item).ok())
        .filter_map(RawCandidate::into_candidate)
        .collect()
}

/// `reqwest` search client
#[derive(Debug, Clone)]
pub struct SymbolSearchClient {
    client: Client,
    endpoint: Url,
    query_param: String,
}

impl SymbolSearchClient {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        Ok(Self {
            client: http_client(config.request_timeout)?,
            endpoint: config.search_url()?,
            query_param: config.search_query_param.clone(),
        })
    }
}

#[async_trait]
impl SymbolSearch for SymbolSearchClient {
    async fn search(&self, query: &str, token: Option<&str>) -> Result<Vec<SearchCandidate>> {
        debug!("Searching symbols for {query:?}");

        let request = self
            .client
            .get(self.endpoint.clone())
            .query(&[(self.query_param.as_str(), query)]);

        let response = with_bearer(request, token)
            .send()
            .await
            .map_err(|e| ReportError::network("search request failed", e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ReportError::Network(format!("search failed: HTTP {status}")));
        }

        let body = response
            .text()
            .await
            .map_err(|e| ReportError::network("search response unreadable", e))?;

        let results = parse_search_results(&body);
        debug!("Search for {query:?} returned {} candidates", results.len());
        Ok(results)
    }
}
