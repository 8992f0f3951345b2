//! Browser embedder runtime.
//!
//! Tracks browsing sessions across the view and frame ids content processes
//! report, and runs the decisions that need the embedding application's
//! input: popup creation, storage quota, certificate errors and navigation.
//! Handler answers are delivered on the executor the engine expects them on.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub mod client;
pub mod handler;
pub mod navigation;
pub mod permission;
pub mod popup;
pub mod registry;
pub mod threading;

pub use client::EmbedderClient;
pub use handler::{
    BrowserHost, BrowserSettings, Client, Frame, LifeSpanHandler, PopupDecision, RequestHandler,
};
pub use registry::{SessionId, SessionMatch, SessionRegistry};
pub use threading::{BrowserThread, BrowserThreads, RequestCallback, ThreadError, ThreadOptions};

#[derive(Error, Debug)]
pub enum EmbedderError {
    #[error("Executor error: {0}")]
    Thread(#[from] ThreadError),
    #[error("Failed to read config {path}: {source}")]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid config: {0}")]
    ConfigParse(#[from] serde_json::Error),
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("Decision abandoned: {0}")]
    DecisionDropped(String),
}

pub type Result<T> = std::result::Result<T, EmbedderError>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbedderConfig {
    /// Resolve ids registered on a session's guest mapping.
    pub enable_guest_views: bool,
    pub default_browser_settings: BrowserSettings,
    pub ui_thread_name: String,
    pub io_thread_name: String,
    /// Panic when an operation runs on the wrong executor instead of logging.
    pub strict_thread_checks: bool,
}

impl Default for EmbedderConfig {
    fn default() -> Self {
        Self {
            enable_guest_views: true,
            default_browser_settings: BrowserSettings::default(),
            ui_thread_name: "embedder-ui".to_string(),
            io_thread_name: "embedder-io".to_string(),
            strict_thread_checks: true,
        }
    }
}

impl EmbedderConfig {
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| EmbedderError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&contents)
    }

    pub fn from_json_str(contents: &str) -> Result<Self> {
        Ok(serde_json::from_str(contents)?)
    }

    pub fn thread_options(&self) -> ThreadOptions {
        ThreadOptions {
            ui_name: self.ui_thread_name.clone(),
            io_name: self.io_thread_name.clone(),
            strict_checks: self.strict_thread_checks,
        }
    }
}
