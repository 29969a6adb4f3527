//! HTTP clients for the report API
//!
//! Each endpoint sits behind a small trait so the debouncer and orchestrator
//! can be driven by in-memory fakes; the `*Client` types are the `reqwest`
//! implementations used in production.

pub mod auth;
pub mod document;
pub mod report;
pub mod search;

use crate::error::{ReportError, Result};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use std::time::Duration;

pub use auth::AuthClient;
pub use document::DocumentClient;
pub use report::{ReportClient, ReportRequest};
pub use search::{SearchCandidate, SymbolSearchClient};

use crate::envelope::ReportData;

/// Symbol lookup
#[async_trait]
pub trait SymbolSearch: Send + Sync {
    async fn search(&self, query: &str, token: Option<&str>) -> Result<Vec<SearchCandidate>>;
}

/// Report generation
#[async_trait]
pub trait ReportSource: Send + Sync {
    async fn fetch_report(&self, request: &ReportRequest, token: Option<&str>)
    -> Result<ReportData>;
}

/// Raw report document retrieval
#[async_trait]
pub trait DocumentSource: Send + Sync {
    /// Fetch the document at `url` as text. `url` is used verbatim.
    async fn fetch_document(&self, url: &str) -> Result<String>;
}

pub(crate) fn http_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| ReportError::Config(format!("Failed to create HTTP client: {e}")))
}

/// Attach the bearer credential when there is one; the server rejects
/// unauthenticated calls itself.
pub(crate) fn with_bearer(builder: RequestBuilder, token: Option<&str>) -> RequestBuilder {
    match token {
        Some(token) => builder.bearer_auth(token),
        None => builder,
    }
}
