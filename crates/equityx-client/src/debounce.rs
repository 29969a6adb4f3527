//! Debounced symbol search
//!
//! Keystrokes restart a single pending timer; only when input has been quiet
//! for the configured delay is one search dispatched, with the latest text.
//! Dispatched searches are never cancelled. Each input bumps a sequence
//! number and a response is applied only if its sequence is still the latest,
//! so a slow early response cannot overwrite a newer one.

use crate::api::{SearchCandidate, SymbolSearch};
use crate::config::ClientConfig;
use crate::error::ReportError;
use crate::session::SessionGate;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Snapshot of the search box
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchState {
    /// Latest input text
    pub query: String,
    pub results: Vec<SearchCandidate>,
    /// A search for the latest input is in flight
    pub searching: bool,
    /// Failure of the latest search, if it failed
    pub error: Option<ReportError>,
    /// Sequence number of the latest input
    pub sequence: u64,
}

struct Shared {
    search: Arc<dyn SymbolSearch>,
    session: Arc<dyn SessionGate>,
    state: watch::Sender<SearchState>,
}

impl Shared {
    async fn dispatch(self: Arc<Self>, sequence: u64, query: String) {
        let started = self.state.send_if_modified(|state| {
            if state.sequence != sequence {
                return false;
            }
            state.searching = true;
            state.error = None;
            true
        });
        if !started {
            return;
        }

        debug!("Searching symbols for {query:?} (#{sequence})");
        let token = self.session.token();
        let outcome = self.search.search(&query, token.as_deref()).await;

        let applied = self.state.send_if_modified(|state| {
            if state.sequence != sequence {
                return false;
            }
            state.searching = false;
            match &outcome {
                Ok(results) => {
                    state.results = results.clone();
                    state.error = None;
                }
                Err(e) => {
                    state.results.clear();
                    state.error = Some(e.clone());
                }
            }
            true
        });

        match outcome {
            Ok(results) if applied => debug!("{} candidates for {query:?}", results.len()),
            Err(e) if applied => warn!("Symbol search for {query:?} failed: {e}"),
            _ => debug!("Dropped stale search response #{sequence}"),
        }
    }
}

/// Turns a stream of keystrokes into at most one search per quiet period
pub struct SearchDebouncer {
    shared: Arc<Shared>,
    delay: Duration,
    min_query_len: usize,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl SearchDebouncer {
    pub fn new(
        search: Arc<dyn SymbolSearch>,
        session: Arc<dyn SessionGate>,
        delay: Duration,
        min_query_len: usize,
    ) -> Self {
        let (state, _) = watch::channel(SearchState::default());
        Self {
            shared: Arc::new(Shared {
                search,
                session,
                state,
            }),
            delay,
            min_query_len,
            pending: Mutex::new(None),
        }
    }

    pub fn from_config(
        search: Arc<dyn SymbolSearch>,
        session: Arc<dyn SessionGate>,
        config: &ClientConfig,
    ) -> Self {
        Self::new(search, session, config.search_debounce, config.min_query_len)
    }

    pub fn subscribe(&self) -> watch::Receiver<SearchState> {
        self.shared.state.subscribe()
    }

    /// Current snapshot
    pub fn state(&self) -> SearchState {
        self.shared.state.borrow().clone()
    }

    /// Feed one keystroke's worth of input.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn on_input(&self, query: &str) {
        self.cancel();

        let short = query.chars().count() < self.min_query_len;
        let mut sequence = 0;
        self.shared.state.send_modify(|state| {
            state.sequence += 1;
            sequence = state.sequence;
            state.query = query.to_string();
            if short {
                state.results.clear();
                state.searching = false;
                state.error = None;
            }
        });
        if short {
            return;
        }

        let shared = Arc::clone(&self.shared);
        let delay = self.delay;
        let query = query.to_string();
        let timer = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // Detached so a later keystroke aborts only the timer, never the request
            tokio::spawn(shared.dispatch(sequence, query));
        });

        if let Ok(mut pending) = self.pending.lock() {
            *pending = Some(timer);
        }
    }

    /// Clear query and results, e.g. after a candidate was picked
    pub fn reset(&self) {
        self.cancel();
        self.shared.state.send_modify(|state| {
            state.sequence += 1;
            state.query.clear();
            state.results.clear();
            state.searching = false;
            state.error = None;
        });
    }

    /// Cancel the pending timer, if any
    pub fn cancel(&self) {
        if let Some(timer) = self.pending.lock().ok().and_then(|mut pending| pending.take()) {
            timer.abort();
        }
    }

    /// Whether a timer is waiting to fire
    pub fn has_pending(&self) -> bool {
        self.pending
            .lock()
            .map(|pending| pending.as_ref().is_some_and(|timer| !timer.is_finished()))
            .unwrap_or(false)
    }
}

impl Drop for SearchDebouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::Result;
    use crate::session::TokenSession;
    use async_trait::async_trait;
    use std::collections::HashMap;

    /// Symbol search returning one candidate per query, with optional latency
    #[derive(Default)]
    pub(crate) struct FakeSearch {
        pub(crate) calls: Mutex<Vec<(String, Option<String>)>>,
        pub(crate) latency: HashMap<String, Duration>,
        pub(crate) failing: Vec<String>,
    }

    impl FakeSearch {
        pub(crate) fn queries(&self) -> Vec<String> {
            self.calls.lock().unwrap().iter().map(|(q, _)| q.clone()).collect()
        }
    }

    pub(crate) fn candidate(symbol: &str, name: &str) -> SearchCandidate {
        SearchCandidate {
            exchange: "NMS".to_string(),
            symbol: symbol.to_string(),
            short_name: None,
            long_name: Some(name.to_string()),
            sector: None,
            quote_type: Some("EQUITY".to_string()),
        }
    }

    #[async_trait]
    impl SymbolSearch for FakeSearch {
        async fn search(&self, query: &str, token: Option<&str>) -> Result<Vec<SearchCandidate>> {
            self.calls
                .lock()
                .unwrap()
                .push((query.to_string(), token.map(str::to_string)));
            if let Some(latency) = self.latency.get(query) {
                tokio::time::sleep(*latency).await;
            }
            if self.failing.iter().any(|q| q == query) {
                return Err(ReportError::Network("search failed: HTTP 503".to_string()));
            }
            Ok(vec![candidate(&query.to_uppercase(), query)])
        }
    }

    fn debouncer(search: Arc<FakeSearch>) -> SearchDebouncer {
        SearchDebouncer::new(
            search,
            Arc::new(TokenSession::with_token("jwt-7")),
            Duration::from_millis(300),
            2,
        )
    }

    async fn settle(rx: &mut watch::Receiver<SearchState>, f: impl FnMut(&SearchState) -> bool) {
        tokio::time::timeout(Duration::from_secs(30), rx.wait_for(f))
            .await
            .expect("state never settled")
            .unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_dispatches_once_with_last_value() {
        let search = Arc::new(FakeSearch::default());
        let debouncer = debouncer(search.clone());
        let mut rx = debouncer.subscribe();

        for text in ["a", "ap", "app", "appl"] {
            debouncer.on_input(text);
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        settle(&mut rx, |s| !s.results.is_empty()).await;
        tokio::time::sleep(Duration::from_secs(1)).await;

        assert_eq!(search.queries(), vec!["appl"]);
        let state = debouncer.state();
        assert_eq!(state.results[0].symbol, "APPL");
        assert!(!state.searching);

        // token read from the session at dispatch time
        let calls = search.calls.lock().unwrap();
        assert_eq!(calls[0].1.as_deref(), Some("jwt-7"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_short_input_cancels_and_clears() {
        let search = Arc::new(FakeSearch::default());
        let debouncer = debouncer(search.clone());
        let mut rx = debouncer.subscribe();

        debouncer.on_input("tsla");
        settle(&mut rx, |s| !s.results.is_empty()).await;

        debouncer.on_input("tsm");
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(debouncer.has_pending());

        debouncer.on_input("t");
        assert!(!debouncer.has_pending());
        let state = debouncer.state();
        assert!(state.results.is_empty());
        assert!(!state.searching);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(search.queries(), vec!["tsla"]);

        debouncer.on_input("tsla");
        tokio::time::sleep(Duration::from_millis(100)).await;
        debouncer.on_input("");
        assert!(!debouncer.has_pending());
        let state = debouncer.state();
        assert!(state.query.is_empty());
        assert!(state.results.is_empty());

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(search.queries(), vec!["tsla"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_searching_flag_transitions() {
        let search = Arc::new(FakeSearch {
            latency: HashMap::from([("msft".to_string(), Duration::from_secs(1))]),
            ..Default::default()
        });
        let debouncer = debouncer(search);
        let mut rx = debouncer.subscribe();

        debouncer.on_input("msft");
        assert!(!debouncer.state().searching);

        settle(&mut rx, |s| s.searching).await;
        settle(&mut rx, |s| !s.searching).await;
        assert_eq!(debouncer.state().results.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_response_is_ignored() {
        let search = Arc::new(FakeSearch {
            latency: HashMap::from([
                ("ap".to_string(), Duration::from_secs(2)),
                ("apple".to_string(), Duration::from_millis(100)),
            ]),
            ..Default::default()
        });
        let debouncer = debouncer(search.clone());
        let mut rx = debouncer.subscribe();

        debouncer.on_input("ap");
        tokio::time::sleep(Duration::from_millis(350)).await;
        debouncer.on_input("apple");
        settle(&mut rx, |s| !s.results.is_empty()).await;

        // let the slow "ap" response land
        tokio::time::sleep(Duration::from_secs(3)).await;

        assert_eq!(search.queries(), vec!["ap", "apple"]);
        let state = debouncer.state();
        assert_eq!(state.results.len(), 1);
        assert_eq!(state.results[0].symbol, "APPLE");
        assert!(!state.searching);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_search_converges_to_empty() {
        let search = Arc::new(FakeSearch {
            failing: vec!["zzzz".to_string()],
            ..Default::default()
        });
        let debouncer = debouncer(search);
        let mut rx = debouncer.subscribe();

        debouncer.on_input("zzzz");
        settle(&mut rx, |s| s.error.is_some()).await;

        let state = debouncer.state();
        assert!(state.results.is_empty());
        assert!(!state.searching);
        assert!(matches!(state.error, Some(ReportError::Network(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_drops_in_flight_result() {
        let search = Arc::new(FakeSearch {
            latency: HashMap::from([("nvda".to_string(), Duration::from_secs(1))]),
            ..Default::default()
        });
        let debouncer = debouncer(search);
        let mut rx = debouncer.subscribe();

        debouncer.on_input("nvda");
        settle(&mut rx, |s| s.searching).await;
        debouncer.reset();

        tokio::time::sleep(Duration::from_secs(2)).await;
        let state = debouncer.state();
        assert!(state.query.is_empty());
        assert!(state.results.is_empty());
        assert!(!state.searching);
    }
}
