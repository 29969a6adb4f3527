//! Report rendering
//!
//! A report link points at an HTML document. Rendering fetches it as text and
//! keeps it in a [`ContentStore`] behind a revocable [`ContentHandle`], which
//! a UI layer can display or hand to a viewer. Handles hold memory until they
//! are revoked; [`RenderedReportArtifact`] revokes its handle on release or
//! drop so that replacing an artifact always frees the old one.

use crate::api::DocumentSource;
use crate::error::{ReportError, Result};
use equityx_utils::redact_url;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// MIME type of rendered reports
pub const HTML_CONTENT_TYPE: &str = "text/html";

/// Transient reference to content held in a [`ContentStore`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentHandle(Uuid);

impl ContentHandle {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// URL-style name for the handle, e.g. `blob:equityx/<uuid>`
    pub fn url(&self) -> String {
        format!("blob:equityx/{}", self.0)
    }
}

impl fmt::Display for ContentHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url())
    }
}

/// Bytes tagged with a content type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentBlob {
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl ContentBlob {
    /// Contents as UTF-8 text, if they are
    pub fn text(&self) -> Option<&str> {
        std::str::from_utf8(&self.bytes).ok()
    }
}

/// Registry of live content handles
#[derive(Debug, Clone, Default)]
pub struct ContentStore {
    blobs: Arc<RwLock<HashMap<ContentHandle, Arc<ContentBlob>>>>,
}

impl ContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a blob and return a handle for it
    pub fn create(&self, content_type: impl Into<String>, bytes: Vec<u8>) -> ContentHandle {
        let handle = ContentHandle::new();
        let blob = Arc::new(ContentBlob {
            content_type: content_type.into(),
            bytes,
        });
        if let Ok(mut blobs) = self.blobs.write() {
            blobs.insert(handle, blob);
        }
        handle
    }

    pub fn get(&self, handle: ContentHandle) -> Option<Arc<ContentBlob>> {
        self.blobs.read().ok()?.get(&handle).cloned()
    }

    /// Release a handle. Returns `false` if it was already gone.
    pub fn revoke(&self, handle: ContentHandle) -> bool {
        self.blobs
            .write()
            .ok()
            .and_then(|mut blobs| blobs.remove(&handle))
            .is_some()
    }

    /// Number of handles not yet revoked
    pub fn live_count(&self) -> usize {
        self.blobs.read().map(|blobs| blobs.len()).unwrap_or_default()
    }
}

/// A rendered report owning exactly one content handle
pub struct RenderedReportArtifact {
    handle: ContentHandle,
    store: ContentStore,
    size: usize,
}

impl RenderedReportArtifact {
    pub fn handle(&self) -> ContentHandle {
        self.handle
    }

    pub fn url(&self) -> String {
        self.handle.url()
    }

    /// Size of the rendered document in bytes
    pub fn size(&self) -> usize {
        self.size
    }

    /// The rendered blob, while the handle is live
    pub fn blob(&self) -> Option<Arc<ContentBlob>> {
        self.store.get(self.handle)
    }

    /// Revoke the handle now
    pub fn release(self) {
        drop(self);
    }
}

impl Drop for RenderedReportArtifact {
    fn drop(&mut self) {
        if self.store.revoke(self.handle) {
            debug!("Released {}", self.handle);
        }
    }
}

impl fmt::Debug for RenderedReportArtifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderedReportArtifact")
            .field("handle", &self.handle)
            .field("size", &self.size)
            .finish()
    }
}

/// Check a download filename: a plain file name, no directories
pub fn validate_filename(filename: &str) -> Result<()> {
    let invalid = filename.trim().is_empty()
        || filename == "."
        || filename == ".."
        || filename.contains(['/', '\\'])
        || Path::new(filename).file_name().is_none();
    if invalid {
        return Err(ReportError::Validation(format!(
            "invalid download filename {filename:?}"
        )));
    }
    Ok(())
}

/// Fetches report documents and turns them into artifacts or files
pub struct ReportRenderer {
    documents: Arc<dyn DocumentSource>,
    store: ContentStore,
    download_dir: PathBuf,
}

impl ReportRenderer {
    pub fn new(documents: Arc<dyn DocumentSource>, download_dir: impl Into<PathBuf>) -> Self {
        Self {
            documents,
            store: ContentStore::new(),
            download_dir: download_dir.into(),
        }
    }

    /// Use a shared store instead of a private one
    pub fn with_store(mut self, store: ContentStore) -> Self {
        self.store = store;
        self
    }

    pub fn store(&self) -> &ContentStore {
        &self.store
    }

    pub fn download_dir(&self) -> &Path {
        &self.download_dir
    }

    /// Fetch the document at `report_url` and hold it behind a new handle.
    ///
    /// On failure nothing is created, so whatever the caller is currently
    /// showing stays valid.
    pub async fn render(&self, report_url: &str) -> Result<RenderedReportArtifact> {
        let html = self.documents.fetch_document(report_url).await?;
        let size = html.len();
        let handle = self.store.create(HTML_CONTENT_TYPE, html.into_bytes());

        info!("Rendered {} as {handle} ({size} bytes)", redact_url(report_url));
        Ok(RenderedReportArtifact {
            handle,
            store: self.store.clone(),
            size,
        })
    }

    /// Fetch the document again and save it as `filename` in the download
    /// directory.
    ///
    /// Uses its own temporary handle, revoked once the save was attempted,
    /// whether it succeeded or not.
    pub async fn download_as(&self, report_url: &str, filename: &str) -> Result<PathBuf> {
        validate_filename(filename)?;

        let html = self.documents.fetch_document(report_url).await?;
        let handle = self.store.create(HTML_CONTENT_TYPE, html.into_bytes());

        let saved = self.save(handle, filename).await;
        self.store.revoke(handle);

        match &saved {
            Ok(path) => info!("Saved report to {}", path.display()),
            Err(e) => warn!("Saving report as {filename} failed: {e}"),
        }
        saved
    }

    async fn save(&self, handle: ContentHandle, filename: &str) -> Result<PathBuf> {
        let blob = self
            .store
            .get(handle)
            .ok_or_else(|| ReportError::Io(format!("{handle} was revoked before saving")))?;

        tokio::fs::create_dir_all(&self.download_dir).await?;
        let path = self.download_dir.join(filename);
        tokio::fs::write(&path, &blob.bytes).await?;
        Ok(path)
    }
}

impl fmt::Debug for ReportRenderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReportRenderer")
            .field("download_dir", &self.download_dir)
            .field("live_handles", &self.store.live_count())
            .finish_non_exhaustive()
    }
}
