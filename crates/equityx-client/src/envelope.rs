//! Chunked report payloads
//!
//! The report endpoint does not return the report as JSON directly. It returns
//! an envelope whose `response` array holds fragments of one JSON document,
//! split wherever the upstream size limit happened to fall (often mid-token,
//! sometimes inside an escape sequence). The fragments are meaningful only
//! when concatenated in array order, untouched.

use crate::error::{ReportError, Result};
use serde::{Deserialize, Serialize};

/// Ordered fragments of one logical JSON document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReportChunks(Vec<String>);

impl ReportChunks {
    pub fn new(chunks: Vec<String>) -> Self {
        Self(chunks)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Concatenate the fragments in order, without trimming or separators
    pub fn reassemble(&self) -> String {
        self.0.concat()
    }

    /// Reassemble and decode the report
    pub fn parse(&self) -> Result<ReportData> {
        if self.is_empty() {
            return Err(ReportError::Parse("report response has no chunks".to_string()));
        }

        let document = self.reassemble();
        serde_json::from_str(&document).map_err(|e| {
            ReportError::Parse(format!(
                "invalid report document ({} chunks, {} bytes): {e}",
                self.len(),
                document.len()
            ))
        })
    }
}

impl From<Vec<String>> for ReportChunks {
    fn from(chunks: Vec<String>) -> Self {
        Self(chunks)
    }
}

/// Body returned by the report endpoint
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawReportEnvelope {
    #[serde(default)]
    pub message: String,

    /// `null` when the analysis produced nothing
    #[serde(rename = "response", default)]
    pub chunks: Option<ReportChunks>,
}

impl RawReportEnvelope {
    /// Decode an envelope from a raw response body
    pub fn from_body(body: &str) -> Result<Self> {
        serde_json::from_str(body)
            .map_err(|e| ReportError::Parse(format!("invalid report envelope: {e}")))
    }

    /// Reassemble the chunks and decode the report they carry
    pub fn into_report(self) -> Result<ReportData> {
        match self.chunks {
            Some(chunks) => chunks.parse(),
            None => Err(ReportError::Parse(format!(
                "report response is empty (message: {:?})",
                self.message
            ))),
        }
    }
}

/// A generated report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportData {
    /// Prose summary of the analysis
    pub summary: String,

    /// Link to the full HTML report.
    ///
    /// Usually pre-signed with an expiry in its query string. Kept verbatim;
    /// never parse or rewrite it.
    pub report: String,
}
