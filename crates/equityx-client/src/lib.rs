//! Stock report client
//!
//! Client side of the equity-report service: debounced symbol search,
//! report generation, rendering of the report document, and a short history
//! of recent lookups.
//!
//! # Architecture
//!
//! - [`SearchDebouncer`] collapses keystrokes into one [`SymbolSearch`] call
//!   per quiet period.
//! - [`ReportOrchestrator`] requests a report, reassembles its chunked JSON
//!   payload, records the lookup in [`RecentSearchStore`] and hands the
//!   report link to [`ReportRenderer`].
//! - [`ReportRenderer`] fetches the HTML document behind a revocable content
//!   handle.
//! - [`Dashboard`] exposes all of it as the events of one report screen.
//!
//! Credentials come from an injected [`SessionGate`]; state is published on
//! `tokio::sync::watch` channels.
//!
//! # Example
//!
//! ```rust,ignore
//! use equityx_client::{ClientConfig, Dashboard, SubmitOutcome, TokenSession};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ClientConfig::default().with_env()?;
//!     let session = Arc::new(TokenSession::from_env());
//!     let dashboard = Dashboard::from_config(&config, session)?;
//!
//!     dashboard.set_form("Apple Inc", "AAPL");
//!     if let SubmitOutcome::Ready { data, .. } = dashboard.on_submit_report().await? {
//!         println!("{}", data.summary);
//!     }
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod config;
pub mod dashboard;
pub mod debounce;
pub mod envelope;
pub mod error;
pub mod history;
pub mod orchestrator;
pub mod renderer;
pub mod session;

// Re-export main types for convenience
pub use api::{
    AuthClient, DocumentClient, DocumentSource, ReportClient, ReportRequest, ReportSource,
    SearchCandidate, SymbolSearch, SymbolSearchClient,
};
pub use config::ClientConfig;
pub use dashboard::{Dashboard, ReportForm};
pub use debounce::{SearchDebouncer, SearchState};
pub use envelope::{RawReportEnvelope, ReportChunks, ReportData};
pub use error::{ErrorKind, ReportError, Result};
pub use history::{RecentSearchStore, SearchHistoryEntry};
pub use orchestrator::{ReportOrchestrator, ReportState, SubmitOutcome};
pub use renderer::{ContentHandle, ContentStore, RenderedReportArtifact, ReportRenderer};
pub use session::{SessionGate, TokenSession, require_authenticated};
