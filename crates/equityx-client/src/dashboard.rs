//! Dashboard controller
//!
//! The inbound events of the report screen as methods on one value. It holds
//! the form fields and forwards each event to the debouncer, the orchestrator
//! or the history store.

use crate::api::{DocumentClient, ReportClient, SearchCandidate, SymbolSearchClient};
use crate::config::ClientConfig;
use crate::debounce::{SearchDebouncer, SearchState};
use crate::error::Result;
use crate::history::{RecentSearchStore, SearchHistoryEntry};
use crate::orchestrator::{ReportOrchestrator, ReportState, SubmitOutcome};
use crate::renderer::ReportRenderer;
use crate::session::SessionGate;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};
use tokio::sync::watch;
use tracing::{debug, info};

/// Stock name and ticker as entered in the report form
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportForm {
    pub stock_name: String,
    pub ticker: String,
}

pub struct Dashboard {
    form: RwLock<ReportForm>,
    debouncer: SearchDebouncer,
    orchestrator: ReportOrchestrator,
    session: Arc<dyn SessionGate>,
}

impl Dashboard {
    pub fn new(
        debouncer: SearchDebouncer,
        orchestrator: ReportOrchestrator,
        session: Arc<dyn SessionGate>,
    ) -> Self {
        Self {
            form: RwLock::new(ReportForm::default()),
            debouncer,
            orchestrator,
            session,
        }
    }

    /// Wire the HTTP clients, file-backed history and renderer for `config`
    pub fn from_config(config: &ClientConfig, session: Arc<dyn SessionGate>) -> Result<Self> {
        config.validate()?;

        let debouncer = SearchDebouncer::from_config(
            Arc::new(SymbolSearchClient::new(config)?),
            session.clone(),
            config,
        );
        let renderer = ReportRenderer::new(
            Arc::new(DocumentClient::new(config)?),
            config.download_dir.clone(),
        );
        let history = Arc::new(RecentSearchStore::at_path(
            config.history_path.clone(),
            config.history_capacity,
        ));
        let orchestrator = ReportOrchestrator::new(
            Arc::new(ReportClient::new(config)?),
            renderer,
            history,
            session.clone(),
            config.actor_id.clone(),
        );

        info!("Dashboard ready against {}", config.api_base_url);
        Ok(Self::new(debouncer, orchestrator, session))
    }

    pub fn form(&self) -> ReportForm {
        self.form.read().map(|form| form.clone()).unwrap_or_default()
    }

    /// Overwrite both form fields
    pub fn set_form(&self, stock_name: &str, ticker: &str) {
        if let Ok(mut form) = self.form.write() {
            form.stock_name = stock_name.to_string();
            form.ticker = ticker.to_string();
        }
    }

    pub fn on_search_input(&self, text: &str) {
        self.debouncer.on_input(text);
    }

    /// Fill the form from a search result and close the result list
    pub fn on_select_candidate(&self, candidate: &SearchCandidate) {
        self.set_form(candidate.display_name(), &candidate.symbol);
        self.debouncer.reset();
        debug!("Selected {}", candidate.symbol);
    }

    /// Submit the form as it stands
    pub async fn on_submit_report(&self) -> Result<SubmitOutcome> {
        let form = self.form();
        self.orchestrator.submit(&form.stock_name, &form.ticker).await
    }

    /// Save the current report. Defaults to `<ticker>-report.html`.
    pub async fn on_download_report(&self, filename: Option<&str>) -> Result<PathBuf> {
        self.orchestrator.download(filename).await
    }

    pub async fn retry_render(&self) -> Result<()> {
        self.orchestrator.retry_render().await
    }

    /// Fill the form from a history entry without submitting
    pub fn load_recent(&self, entry: &SearchHistoryEntry) {
        self.set_form(&entry.stock_name, &entry.ticker);
    }

    pub fn recent_searches(&self) -> Vec<SearchHistoryEntry> {
        self.orchestrator.history().list()
    }

    pub fn clear_history(&self) -> Result<()> {
        self.orchestrator.history().clear()
    }

    pub fn search_state(&self) -> SearchState {
        self.debouncer.state()
    }

    pub fn report_state(&self) -> ReportState {
        self.orchestrator.state()
    }

    pub fn subscribe_search(&self) -> watch::Receiver<SearchState> {
        self.debouncer.subscribe()
    }

    pub fn subscribe_report(&self) -> watch::Receiver<ReportState> {
        self.orchestrator.subscribe()
    }

    pub fn orchestrator(&self) -> &ReportOrchestrator {
        &self.orchestrator
    }

    pub fn session(&self) -> &dyn SessionGate {
        self.session.as_ref()
    }

    /// Sign out and tear the view down
    pub fn logout(&self) {
        self.session.logout();
        self.debouncer.reset();
        self.close();
    }

    /// Release the displayed report and cancel any pending search
    pub fn close(&self) {
        self.debouncer.cancel();
        self.orchestrator.close();
    }
}

impl Drop for Dashboard {
    fn drop(&mut self) {
        self.close();
    }
}
