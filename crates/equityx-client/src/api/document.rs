//! Report document client
//!
//! Report links are self-authorizing (pre-signed), so no bearer credential is
//! attached here, and the body is read as text rather than decoded as JSON.

use super::{DocumentSource, http_client};
use crate::config::ClientConfig;
use crate::error::{ReportError, Result};
use async_trait::async_trait;
use equityx_utils::redact_url;
use reqwest::Client;
use reqwest::header::ACCEPT;
use tracing::debug;

/// `reqwest` client for report documents
#[derive(Debug, Clone)]
pub struct DocumentClient {
    client: Client,
}

impl DocumentClient {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        Ok(Self {
            client: http_client(config.request_timeout)?,
        })
    }
}

#[async_trait]
impl DocumentSource for DocumentClient {
    async fn fetch_document(&self, url: &str) -> Result<String> {
        debug!("Fetching report document {}", redact_url(url));

        let response = self
            .client
            .get(url)
            .header(ACCEPT, "text/html, */*")
            .send()
            .await
            .map_err(|e| ReportError::RenderFetch(e.without_url().to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ReportError::RenderFetch(format!("HTTP {status}")));
        }

        response
            .text()
            .await
            .map_err(|e| ReportError::RenderFetch(e.without_url().to_string()))
    }
}
