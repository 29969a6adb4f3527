//! Report generation client

use super::{ReportSource, http_client, with_bearer};
use crate::config::ClientConfig;
use crate::envelope::{RawReportEnvelope, ReportData};
use crate::error::{ReportError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

/// A request for one stock report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportRequest {
    stock_name: String,
    ticker: String,
    actor_id: String,
}

impl ReportRequest {
    /// Build a request, rejecting a blank stock name or ticker
    pub fn new(
        stock_name: impl Into<String>,
        ticker: impl Into<String>,
        actor_id: impl Into<String>,
    ) -> Result<Self> {
        let stock_name = stock_name.into();
        let ticker = ticker.into();

        if stock_name.trim().is_empty() {
            return Err(ReportError::Validation("stock name is empty".to_string()));
        }
        if ticker.trim().is_empty() {
            return Err(ReportError::Validation("ticker is empty".to_string()));
        }

        Ok(Self {
            stock_name,
            ticker,
            actor_id: actor_id.into(),
        })
    }

    pub fn stock_name(&self) -> &str {
        &self.stock_name
    }

    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    pub fn actor_id(&self) -> &str {
        &self.actor_id
    }

    fn query(&self) -> [(&'static str, &str); 3] {
        [
            ("stockname", self.stock_name.as_str()),
            ("ticker_symbol", self.ticker.as_str()),
            ("actor_id", self.actor_id.as_str()),
        ]
    }
}

/// `reqwest` report client
#[derive(Debug, Clone)]
pub struct ReportClient {
    client: Client,
    endpoint: Url,
    timeout: Duration,
}

impl ReportClient {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        Ok(Self {
            client: http_client(config.report_timeout)?,
            endpoint: config.report_url(),
            timeout: config.report_timeout,
        })
    }
}

#[async_trait]
impl ReportSource for ReportClient {
    async fn fetch_report(
        &self,
        request: &ReportRequest,
        token: Option<&str>,
    ) -> Result<ReportData> {
        info!(
            "Requesting report for {} ({})",
            request.stock_name(),
            request.ticker()
        );

        let builder = self
            .client
            .get(self.endpoint.clone())
            .query(&request.query())
            .timeout(self.timeout);

        let response = with_bearer(builder, token)
            .send()
            .await
            .map_err(|e| ReportError::network("report request failed", e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ReportError::Network(format!("report request failed: HTTP {status}")));
        }

        let body = response
            .text()
            .await
            .map_err(|e| ReportError::network("report response unreadable", e))?;

        let envelope = RawReportEnvelope::from_body(&body)?;
        debug!(
            "Report envelope for {}: message={:?}, chunks={}",
            request.ticker(),
            envelope.message,
            envelope.chunks.as_ref().map_or(0, |c| c.len())
        );

        envelope.into_report()
    }
}
