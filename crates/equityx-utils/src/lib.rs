//! Shared utilities for the equityx workspace
//!
//! Logging setup, application data directories and small helpers used by both
//! the client library and the command-line front end.

pub mod logging;
pub mod paths;

pub use logging::{init_tracing, init_tracing_json, redact_url};
pub use paths::{APP_DIR_NAME, app_data_dir, default_history_path};
