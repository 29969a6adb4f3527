//! Report request orchestration
//!
//! A submission runs validate → fetch → reassemble and parse → record in
//! history → render, strictly in that order. Rendering never starts on
//! partial data. Every submission takes a new sequence number; the state is
//! only touched by the submission that is still the latest, so a slow earlier
//! response can never overwrite a newer one.

use crate::api::{ReportRequest, ReportSource};
use crate::envelope::ReportData;
use crate::error::{ReportError, Result};
use crate::history::RecentSearchStore;
use crate::renderer::{ContentBlob, ContentHandle, RenderedReportArtifact, ReportRenderer};
use crate::session::SessionGate;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Snapshot of the report panel
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportState {
    /// A report request is in flight
    pub generating: bool,
    /// The report document is being fetched for display
    pub rendering: bool,
    /// Latest submitted request
    pub request: Option<ReportRequest>,
    /// Latest successfully parsed report
    pub data: Option<ReportData>,
    /// Request that produced `data`
    pub data_request: Option<ReportRequest>,
    /// Handle of the artifact currently on display
    pub artifact: Option<ContentHandle>,
    /// Failure of the latest report request
    pub error: Option<ReportError>,
    /// Failure of the latest render, independent of `error`
    pub render_error: Option<ReportError>,
    pub sequence: u64,
}

/// How a submission ended when it did not fail
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// Blank stock name or ticker; nothing was sent
    Skipped,
    /// A newer submission took over while this one was in flight
    Superseded,
    /// The report arrived; `rendered` tells whether its document could be shown
    Ready { data: ReportData, rendered: bool },
}

/// Default name for a downloaded report
pub fn default_download_name(ticker: Option<&str>) -> String {
    let ticker = ticker.map(str::trim).filter(|t| !t.is_empty()).unwrap_or("stock");
    format!("{ticker}-report.html")
}

/// Drives report requests and owns the displayed artifact
pub struct ReportOrchestrator {
    reports: Arc<dyn ReportSource>,
    renderer: ReportRenderer,
    history: Arc<RecentSearchStore>,
    session: Arc<dyn SessionGate>,
    actor_id: String,
    state: watch::Sender<ReportState>,
    artifact: Mutex<Option<RenderedReportArtifact>>,
}

impl ReportOrchestrator {
    pub fn new(
        reports: Arc<dyn ReportSource>,
        renderer: ReportRenderer,
        history: Arc<RecentSearchStore>,
        session: Arc<dyn SessionGate>,
        actor_id: impl Into<String>,
    ) -> Self {
        let (state, _) = watch::channel(ReportState::default());
        Self {
            reports,
            renderer,
            history,
            session,
            actor_id: actor_id.into(),
            state,
            artifact: Mutex::new(None),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<ReportState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> ReportState {
        self.state.borrow().clone()
    }

    pub fn history(&self) -> &RecentSearchStore {
        &self.history
    }

    pub fn renderer(&self) -> &ReportRenderer {
        &self.renderer
    }

    /// Rendered document currently on display
    pub fn artifact_blob(&self) -> Option<Arc<ContentBlob>> {
        self.artifact
            .lock()
            .ok()?
            .as_ref()
            .and_then(RenderedReportArtifact::blob)
    }

    /// Request a report for `stock_name` / `ticker`, then record and render it.
    ///
    /// A blank name or ticker is a silent no-op. Network and parse failures
    /// are returned and also published in [`ReportState::error`]; a render
    /// failure is not an error of the submission and shows up only in
    /// [`ReportState::render_error`].
    pub async fn submit(&self, stock_name: &str, ticker: &str) -> Result<SubmitOutcome> {
        let request = match ReportRequest::new(stock_name, ticker, self.actor_id.as_str()) {
            Ok(request) => request,
            Err(e) => {
                debug!("Not submitting: {e}");
                return Ok(SubmitOutcome::Skipped);
            }
        };

        let mut sequence = 0;
        self.state.send_modify(|state| {
            state.sequence += 1;
            sequence = state.sequence;
            state.generating = true;
            state.error = None;
            state.request = Some(request.clone());
        });

        let token = self.session.token();
        let outcome = self.reports.fetch_report(&request, token.as_deref()).await;

        let data = match outcome {
            Ok(data) => data,
            Err(e) => {
                let current = self.update_if_current(sequence, |state| {
                    state.generating = false;
                    state.error = Some(e.clone());
                });
                if !current {
                    return Ok(SubmitOutcome::Superseded);
                }
                warn!("Report for {} failed: {e}", request.ticker());
                return Err(e);
            }
        };

        if !self.is_current(sequence) {
            debug!("Dropping superseded report #{sequence}");
            return Ok(SubmitOutcome::Superseded);
        }

        if let Err(e) = self.record_history(&request).await {
            warn!("Could not record {} in history: {e}", request.ticker());
        }

        let current = self.update_if_current(sequence, |state| {
            state.generating = false;
            state.data = Some(data.clone());
            state.data_request = Some(request.clone());
            state.render_error = None;
        });
        if !current {
            return Ok(SubmitOutcome::Superseded);
        }
        info!("Report ready for {} ({})", request.stock_name(), request.ticker());

        let rendered = self.render(sequence, &data.report).await.is_ok();
        Ok(SubmitOutcome::Ready { data, rendered })
    }

    /// Fetch and display the current report's document again
    pub async fn retry_render(&self) -> Result<()> {
        let (sequence, url) = {
            let state = self.state.borrow();
            let data = state
                .data
                .as_ref()
                .ok_or_else(|| ReportError::Validation("no report to render".to_string()))?;
            (state.sequence, data.report.clone())
        };
        self.render(sequence, &url).await
    }

    /// Save the current report's document under `filename` in the download
    /// directory
    pub async fn download(&self, filename: Option<&str>) -> Result<PathBuf> {
        let (url, ticker) = {
            let state = self.state.borrow();
            let data = state
                .data
                .as_ref()
                .ok_or_else(|| ReportError::Validation("no report to download".to_string()))?;
            let ticker = state.data_request.as_ref().map(|r| r.ticker().to_string());
            (data.report.clone(), ticker)
        };

        let filename = match filename {
            Some(name) => name.to_string(),
            None => default_download_name(ticker.as_deref()),
        };
        self.renderer.download_as(&url, &filename).await
    }

    /// Release the displayed artifact and ignore anything still in flight
    pub fn close(&self) {
        if let Some(artifact) = self.artifact.lock().ok().and_then(|mut slot| slot.take()) {
            artifact.release();
        }
        self.state.send_modify(|state| {
            state.sequence += 1;
            state.generating = false;
            state.rendering = false;
            state.artifact = None;
        });
        debug!("Report view closed");
    }

    async fn render(&self, sequence: u64, url: &str) -> Result<()> {
        if !self.update_if_current(sequence, |state| state.rendering = true) {
            return Ok(());
        }

        match self.renderer.render(url).await {
            Ok(artifact) => {
                let handle = artifact.handle();
                let mut slot = self
                    .artifact
                    .lock()
                    .map_err(|e| ReportError::Storage(format!("Lock error: {e}")))?;

                // Checked under the slot lock so close() cannot interleave
                let current = self.update_if_current(sequence, |state| {
                    state.rendering = false;
                    state.artifact = Some(handle);
                    state.render_error = None;
                });
                if !current {
                    // the new artifact is dropped and revoked here
                    return Ok(());
                }
                if let Some(previous) = slot.replace(artifact) {
                    previous.release();
                }
                Ok(())
            }
            Err(e) => {
                warn!("Rendering report failed: {e}");
                self.update_if_current(sequence, |state| {
                    state.rendering = false;
                    state.render_error = Some(e.clone());
                });
                Err(e)
            }
        }
    }

    /// History storage does blocking file IO
    async fn record_history(&self, request: &ReportRequest) -> Result<()> {
        let history = Arc::clone(&self.history);
        let stock_name = request.stock_name().to_string();
        let ticker = request.ticker().to_string();
        tokio::task::spawn_blocking(move || history.record(&stock_name, &ticker))
            .await
            .map_err(|e| ReportError::Storage(format!("history task failed: {e}")))?
            .map(|_| ())
    }

    fn is_current(&self, sequence: u64) -> bool {
        self.state.borrow().sequence == sequence
    }

    fn update_if_current(&self, sequence: u64, update: impl FnOnce(&mut ReportState)) -> bool {
        self.state.send_if_modified(|state| {
            if state.sequence != sequence {
                return false;
            }
            update(state);
            true
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::envelope::ReportChunks;
    use crate::error::ErrorKind;
    use crate::renderer::tests::FakeDocuments;
    use crate::session::TokenSession;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::time::Duration;

    const APPLE_URL: &str = "https://host/report.html?Sig=apple";
    const MSFT_URL: &str = "https://host/msft.html?Sig=msft";

    /// Report backend answering per ticker with raw chunks or an error
    #[derive(Default)]
    pub(crate) struct FakeReports {
        pub(crate) chunks: HashMap<String, Vec<String>>,
        pub(crate) failures: HashMap<String, ReportError>,
        pub(crate) latency: HashMap<String, Duration>,
        pub(crate) requests: Mutex<Vec<(ReportRequest, Option<String>)>>,
    }

    impl FakeReports {
        pub(crate) fn with_report(mut self, ticker: &str, summary: &str, url: &str) -> Self {
            let document = serde_json::json!({ "summary": summary, "report": url }).to_string();
            // three uneven fragments, split mid-token
            let (a, rest) = document.split_at(7);
            let (b, c) = rest.split_at(rest.len() / 2);
            self.chunks.insert(
                ticker.to_string(),
                vec![a.to_string(), b.to_string(), c.to_string()],
            );
            self
        }

        pub(crate) fn request_count(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl ReportSource for FakeReports {
        async fn fetch_report(
            &self,
            request: &ReportRequest,
            token: Option<&str>,
        ) -> Result<ReportData> {
            self.requests
                .lock()
                .unwrap()
                .push((request.clone(), token.map(str::to_string)));
            if let Some(latency) = self.latency.get(request.ticker()) {
                tokio::time::sleep(*latency).await;
            }
            if let Some(e) = self.failures.get(request.ticker()) {
                return Err(e.clone());
            }
            match self.chunks.get(request.ticker()) {
                Some(chunks) => ReportChunks::new(chunks.clone()).parse(),
                None => Err(ReportError::Network("report request failed: HTTP 404".to_string())),
            }
        }
    }

    pub(crate) struct Harness {
        pub(crate) orchestrator: ReportOrchestrator,
        pub(crate) reports: Arc<FakeReports>,
        pub(crate) docs: Arc<FakeDocuments>,
        pub(crate) _dir: tempfile::TempDir,
    }

    pub(crate) fn harness(reports: FakeReports, docs: FakeDocuments) -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let reports = Arc::new(reports);
        let docs = Arc::new(docs);
        let orchestrator = ReportOrchestrator::new(
            reports.clone(),
            ReportRenderer::new(docs.clone(), dir.path()),
            Arc::new(RecentSearchStore::in_memory(5)),
            Arc::new(TokenSession::with_token("jwt-1")),
            "noventiqteam_123",
        );
        Harness {
            orchestrator,
            reports,
            docs,
            _dir: dir,
        }
    }

    fn apple() -> Harness {
        harness(
            FakeReports::default().with_report("AAPL", "Hold.", APPLE_URL),
            FakeDocuments::with_page(APPLE_URL, "<h1>Apple</h1>"),
        )
    }

    #[tokio::test]
    async fn test_submit_end_to_end() {
        let h = apple();
        let outcome = h.orchestrator.submit("Apple Inc", "AAPL").await.unwrap();

        let SubmitOutcome::Ready { data, rendered } = outcome else {
            panic!("expected a report, got {outcome:?}");
        };
        assert!(rendered);
        assert_eq!(data.summary, "Hold.");
        assert_eq!(data.report, APPLE_URL);

        let history = h.orchestrator.history().list();
        assert_eq!(history[0].stock_name, "Apple Inc");
        assert_eq!(history[0].ticker, "AAPL");

        let state = h.orchestrator.state();
        assert!(!state.generating);
        assert!(!state.rendering);
        assert_eq!(state.data, Some(data));
        assert!(state.artifact.is_some());
        assert_eq!(
            h.orchestrator.artifact_blob().unwrap().text(),
            Some("<h1>Apple</h1>")
        );

        let requests = h.reports.requests.lock().unwrap();
        assert_eq!(requests[0].0.actor_id(), "noventiqteam_123");
        assert_eq!(requests[0].1.as_deref(), Some("jwt-1"));
    }

    #[tokio::test]
    async fn test_blank_fields_are_a_silent_no_op() {
        let h = apple();
        assert_eq!(
            h.orchestrator.submit("", "AAPL").await.unwrap(),
            SubmitOutcome::Skipped
        );
        assert_eq!(
            h.orchestrator.submit("Apple Inc", " ").await.unwrap(),
            SubmitOutcome::Skipped
        );
        assert_eq!(h.reports.request_count(), 0);
        assert_eq!(h.orchestrator.state(), ReportState::default());
    }

    #[tokio::test]
    async fn test_network_and_parse_failures_are_distinct() {
        let mut reports = FakeReports::default();
        reports.chunks.insert(
            "BAD".to_string(),
            vec![r#"{"summary": "x", "#.to_string(), r#""report": "#.to_string()],
        );
        let h = harness(reports, FakeDocuments::default());

        let err = h.orchestrator.submit("Nowhere", "GONE").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Network);
        let state = h.orchestrator.state();
        assert!(!state.generating);
        assert_eq!(state.error, Some(err));

        let err = h.orchestrator.submit("Broken", "BAD").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Parse);
        assert!(!h.orchestrator.state().generating);

        // nothing recorded or rendered on failure
        assert!(h.orchestrator.history().list().is_empty());
        assert_eq!(h.docs.fetch_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_generating_flag_spans_the_request() {
        let mut reports = FakeReports::default().with_report("AAPL", "Hold.", APPLE_URL);
        reports.latency.insert("AAPL".to_string(), Duration::from_secs(5));
        let h = harness(reports, FakeDocuments::with_page(APPLE_URL, "<p/>"));

        let observe = async {
            tokio::time::sleep(Duration::from_secs(1)).await;
            h.orchestrator.state().generating
        };
        let (outcome, during) = tokio::join!(h.orchestrator.submit("Apple Inc", "AAPL"), observe);

        assert!(during);
        assert!(matches!(outcome, Ok(SubmitOutcome::Ready { .. })));
        assert!(!h.orchestrator.state().generating);
    }

    #[tokio::test]
    async fn test_render_failure_keeps_previous_artifact() {
        let h = harness(
            FakeReports::default()
                .with_report("AAPL", "Hold.", APPLE_URL)
                .with_report("MSFT", "Buy.", MSFT_URL),
            FakeDocuments::with_page(APPLE_URL, "<h1>Apple</h1>"),
        );

        h.orchestrator.submit("Apple Inc", "AAPL").await.unwrap();
        let shown = h.orchestrator.state().artifact;

        let outcome = h.orchestrator.submit("Microsoft", "MSFT").await.unwrap();
        assert!(matches!(outcome, SubmitOutcome::Ready { rendered: false, .. }));

        let state = h.orchestrator.state();
        assert_eq!(state.data.unwrap().summary, "Buy.");
        assert_eq!(state.artifact, shown);
        assert!(matches!(state.render_error, Some(ReportError::RenderFetch(_))));
        assert!(state.error.is_none());
        assert_eq!(
            h.orchestrator.artifact_blob().unwrap().text(),
            Some("<h1>Apple</h1>")
        );
    }

    #[tokio::test]
    async fn test_new_artifact_releases_old_one() {
        let h = harness(
            FakeReports::default()
                .with_report("AAPL", "Hold.", APPLE_URL)
                .with_report("MSFT", "Buy.", MSFT_URL),
            FakeDocuments::with_page(APPLE_URL, "<h1>Apple</h1>"),
        );
        h.docs.set_page(MSFT_URL, "<h1>Microsoft</h1>");

        h.orchestrator.submit("Apple Inc", "AAPL").await.unwrap();
        let first = h.orchestrator.state().artifact.unwrap();
        h.orchestrator.submit("Microsoft", "MSFT").await.unwrap();
        let second = h.orchestrator.state().artifact.unwrap();

        let store = h.orchestrator.renderer().store();
        assert_ne!(first, second);
        assert!(store.get(first).is_none());
        assert_eq!(store.live_count(), 1);
    }

    #[tokio::test]
    async fn test_retry_render_after_failure() {
        let h = harness(
            FakeReports::default().with_report("AAPL", "Hold.", APPLE_URL),
            FakeDocuments::default(),
        );

        h.orchestrator.submit("Apple Inc", "AAPL").await.unwrap();
        assert!(h.orchestrator.state().render_error.is_some());

        h.docs.set_page(APPLE_URL, "<h1>Apple</h1>");
        h.orchestrator.retry_render().await.unwrap();

        let state = h.orchestrator.state();
        assert!(state.render_error.is_none());
        assert!(state.artifact.is_some());
        // the report itself was not requested again
        assert_eq!(h.reports.request_count(), 1);
    }

    #[tokio::test]
    async fn test_retry_without_report_is_validation_error() {
        let h = apple();
        let err = h.orchestrator.retry_render().await.unwrap_err();
        assert!(matches!(err, ReportError::Validation(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_latest_submission_wins() {
        let mut reports = FakeReports::default()
            .with_report("AAPL", "Hold.", APPLE_URL)
            .with_report("MSFT", "Buy.", MSFT_URL);
        reports.latency.insert("AAPL".to_string(), Duration::from_secs(3));
        reports.latency.insert("MSFT".to_string(), Duration::from_millis(100));
        let h = harness(reports, FakeDocuments::with_page(APPLE_URL, "<p>a</p>"));
        h.docs.set_page(MSFT_URL, "<p>m</p>");

        let later = async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            h.orchestrator.submit("Microsoft", "MSFT").await
        };
        let (first, second) = tokio::join!(h.orchestrator.submit("Apple Inc", "AAPL"), later);

        assert_eq!(first.unwrap(), SubmitOutcome::Superseded);
        assert!(matches!(second.unwrap(), SubmitOutcome::Ready { rendered: true, .. }));

        let state = h.orchestrator.state();
        assert_eq!(state.data.unwrap().summary, "Buy.");
        assert!(!state.generating);
        assert_eq!(h.orchestrator.artifact_blob().unwrap().text(), Some("<p>m</p>"));
        assert_eq!(h.orchestrator.renderer().store().live_count(), 1);
        // only the winning lookup is recorded
        let history = h.orchestrator.history().list();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].ticker, "MSFT");
    }

    #[tokio::test]
    async fn test_download_uses_ticker_name() {
        let h = apple();
        h.orchestrator.submit("Apple Inc", "AAPL").await.unwrap();

        let path = h.orchestrator.download(None).await.unwrap();
        assert!(path.ends_with("AAPL-report.html"));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "<h1>Apple</h1>");
        // only the displayed artifact stays live
        assert_eq!(h.orchestrator.renderer().store().live_count(), 1);

        let path = h.orchestrator.download(Some("apple.html")).await.unwrap();
        assert!(path.ends_with("apple.html"));
    }

    #[tokio::test]
    async fn test_download_after_failed_submit_saves_shown_report() {
        let h = apple();
        h.orchestrator.submit("Apple Inc", "AAPL").await.unwrap();

        // MSFT has no report, so the request fails
        let err = h.orchestrator.submit("Microsoft", "MSFT").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Network);

        let state = h.orchestrator.state();
        assert_eq!(state.request.as_ref().map(ReportRequest::ticker), Some("MSFT"));
        assert_eq!(state.data_request.as_ref().map(ReportRequest::ticker), Some("AAPL"));

        let path = h.orchestrator.download(None).await.unwrap();
        assert!(path.ends_with("AAPL-report.html"));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "<h1>Apple</h1>");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_submit_records_history_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let history_path = dir.path().join("history.json");
        let orchestrator = ReportOrchestrator::new(
            Arc::new(FakeReports::default().with_report("AAPL", "Hold.", APPLE_URL)),
            ReportRenderer::new(
                Arc::new(FakeDocuments::with_page(APPLE_URL, "<p/>")),
                dir.path(),
            ),
            Arc::new(RecentSearchStore::at_path(&history_path, 5)),
            Arc::new(TokenSession::new()),
            "noventiqteam_123",
        );

        orchestrator.submit("Apple Inc", "AAPL").await.unwrap();

        let saved: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&history_path).unwrap()).unwrap();
        assert_eq!(saved[0]["stockName"], "Apple Inc");
        assert_eq!(saved[0]["ticker"], "AAPL");
    }

    #[tokio::test]
    async fn test_close_releases_artifact() {
        let h = apple();
        h.orchestrator.submit("Apple Inc", "AAPL").await.unwrap();
        assert_eq!(h.orchestrator.renderer().store().live_count(), 1);

        h.orchestrator.close();
        assert_eq!(h.orchestrator.renderer().store().live_count(), 0);
        assert!(h.orchestrator.state().artifact.is_none());
        assert!(h.orchestrator.artifact_blob().is_none());
    }

    #[test]
    fn test_default_download_name() {
        assert_eq!(default_download_name(Some("AAPL")), "AAPL-report.html");
        assert_eq!(default_download_name(Some("  ")), "stock-report.html");
        assert_eq!(default_download_name(None), "stock-report.html");
    }
}
