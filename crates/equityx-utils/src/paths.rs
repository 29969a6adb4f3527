//! Application data locations

use std::path::PathBuf;

/// Directory name used under the platform data directory
pub const APP_DIR_NAME: &str = "equityx";

/// Per-user data directory for the application.
///
/// Falls back to a relative `.equityx` directory when the platform exposes no
/// data directory (minimal containers, some CI runners).
pub fn app_data_dir() -> PathBuf {
    dirs::data_dir().map_or_else(
        || PathBuf::from(format!(".{APP_DIR_NAME}")),
        |dir| dir.join(APP_DIR_NAME),
    )
}

/// Default location of the persisted recent-search list
pub fn default_history_path() -> PathBuf {
    app_data_dir().join("recent_searches.json")
}
