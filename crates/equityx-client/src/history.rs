//! Recent-search history
//!
//! A short, most-recent-first list of past lookups, unique by
//! `(stock_name, ticker)`, persisted between sessions as a JSON array of
//! `{stockName, ticker, date}` objects.

use crate::error::{ReportError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, RwLock};
use tracing::{debug, warn};

/// Default number of entries kept
pub const DEFAULT_CAPACITY: usize = 5;

/// One past lookup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHistoryEntry {
    pub stock_name: String,
    pub ticker: String,
    /// When the lookup was recorded, serialized as an ISO-8601 string
    pub date: DateTime<Utc>,
}

impl SearchHistoryEntry {
    fn same_pair(&self, stock_name: &str, ticker: &str) -> bool {
        self.stock_name == stock_name && self.ticker == ticker
    }
}

/// Durable slot holding the serialized history
pub trait HistoryStorage: Send + Sync {
    /// Raw persisted value; `None` when nothing is stored or it cannot be read
    fn load(&self) -> Option<String>;

    fn save(&self, data: &str) -> Result<()>;

    fn clear(&self) -> Result<()>;
}

/// History kept in a JSON file
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl HistoryStorage for FileStorage {
    fn load(&self) -> Option<String> {
        match std::fs::read_to_string(&self.path) {
            Ok(data) => Some(data),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => {
                warn!("Cannot read history file {}: {e}", self.path.display());
                None
            }
        }
    }

    fn save(&self, data: &str) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                ReportError::Storage(format!("cannot create {}: {e}", parent.display()))
            })?;
        }

        // Write then rename; readers never see a partial list
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, data)
            .and_then(|()| std::fs::rename(&tmp, &self.path))
            .map_err(|e| {
                ReportError::Storage(format!("cannot write {}: {e}", self.path.display()))
            })
    }

    fn clear(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ReportError::Storage(format!(
                "cannot remove {}: {e}",
                self.path.display()
            ))),
        }
    }
}

/// History kept in memory only
#[derive(Debug, Default)]
pub struct MemoryStorage {
    data: RwLock<Option<String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with a raw persisted value, corrupt or not
    pub fn with_data(data: impl Into<String>) -> Self {
        Self {
            data: RwLock::new(Some(data.into())),
        }
    }
}

impl HistoryStorage for MemoryStorage {
    fn load(&self) -> Option<String> {
        self.data.read().ok().and_then(|data| data.clone())
    }

    fn save(&self, data: &str) -> Result<()> {
        let mut slot = self
            .data
            .write()
            .map_err(|e| ReportError::Storage(format!("Lock error: {e}")))?;
        *slot = Some(data.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let mut slot = self
            .data
            .write()
            .map_err(|e| ReportError::Storage(format!("Lock error: {e}")))?;
        *slot = None;
        Ok(())
    }
}

/// Bounded, deduplicated most-recent-first list of lookups
pub struct RecentSearchStore {
    storage: Box<dyn HistoryStorage>,
    capacity: usize,
    // serializes read-modify-write within this process
    write_lock: Mutex<()>,
}

impl RecentSearchStore {
    pub fn new(storage: Box<dyn HistoryStorage>, capacity: usize) -> Self {
        Self {
            storage,
            capacity: capacity.max(1),
            write_lock: Mutex::new(()),
        }
    }

    /// Store backed by a JSON file
    pub fn at_path(path: impl Into<PathBuf>, capacity: usize) -> Self {
        Self::new(Box::new(FileStorage::new(path)), capacity)
    }

    /// Store that forgets everything when dropped
    pub fn in_memory(capacity: usize) -> Self {
        Self::new(Box::new(MemoryStorage::new()), capacity)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Persisted entries, most recent first; empty when absent or corrupt
    pub fn list(&self) -> Vec<SearchHistoryEntry> {
        let Some(raw) = self.storage.load() else {
            return Vec::new();
        };
        if raw.trim().is_empty() {
            return Vec::new();
        }

        match serde_json::from_str::<Vec<SearchHistoryEntry>>(&raw) {
            Ok(mut entries) => {
                entries.truncate(self.capacity);
                entries
            }
            Err(e) => {
                warn!("Discarding unreadable search history: {e}");
                Vec::new()
            }
        }
    }

    /// Record a lookup at the current time
    pub fn record(&self, stock_name: &str, ticker: &str) -> Result<Vec<SearchHistoryEntry>> {
        self.record_at(stock_name, ticker, Utc::now())
    }

    /// Record a lookup with an explicit timestamp.
    ///
    /// Any earlier entry for the same pair (exact, case-sensitive match) is
    /// removed, the new entry goes to the front and the list is cut to
    /// capacity before it is persisted.
    pub fn record_at(
        &self,
        stock_name: &str,
        ticker: &str,
        date: DateTime<Utc>,
    ) -> Result<Vec<SearchHistoryEntry>> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|e| ReportError::Storage(format!("Lock error: {e}")))?;

        let mut entries = self.list();
        entries.retain(|entry| !entry.same_pair(stock_name, ticker));
        entries.insert(
            0,
            SearchHistoryEntry {
                stock_name: stock_name.to_string(),
                ticker: ticker.to_string(),
                date,
            },
        );
        entries.truncate(self.capacity);

        let data = serde_json::to_string(&entries)
            .map_err(|e| ReportError::Storage(format!("cannot serialize history: {e}")))?;
        self.storage.save(&data)?;

        debug!("Recorded {stock_name} ({ticker}); history has {} entries", entries.len());
        Ok(entries)
    }

    /// Remove every entry
    pub fn clear(&self) -> Result<()> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|e| ReportError::Storage(format!("Lock error: {e}")))?;
        self.storage.clear()
    }
}

impl std::fmt::Debug for RecentSearchStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecentSearchStore")
            .field("capacity", &self.capacity)
            .finish_non_exhaustive()
    }
}
