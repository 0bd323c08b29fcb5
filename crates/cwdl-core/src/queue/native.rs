//! Contract with the native download subsystem.

use async_trait::async_trait;
use serde::Serialize;

use super::task::NativeHandle;
use crate::error::Result;

/// What to do when the target filename already exists. The queue never
/// replaces an existing file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictAction {
    /// Pick a free `name (n).ext`.
    Uniquify,
}

/// One download handed to the native subsystem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    pub url: String,
    pub filename: String,
    pub conflict_action: ConflictAction,
    /// Ask the user where to save. The queue always sends `false`.
    pub prompt_user: bool,
}

impl DownloadRequest {
    pub fn new(url: impl Into<String>, filename: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            filename: filename.into(),
            conflict_action: ConflictAction::Uniquify,
            prompt_user: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadState {
    Complete,
    Interrupted,
}

/// Completion notice for a started download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadEvent {
    pub handle: NativeHandle,
    pub state: DownloadState,
    pub error: Option<String>,
}

impl DownloadEvent {
    pub fn complete(handle: NativeHandle) -> Self {
        Self { handle, state: DownloadState::Complete, error: None }
    }

    pub fn interrupted(handle: NativeHandle, error: impl Into<String>) -> Self {
        Self { handle, state: DownloadState::Interrupted, error: Some(error.into()) }
    }
}

/// Native download primitive driven by the queue.
///
/// `download` resolves with a handle once the download has started (or, for
/// synchronous implementations, finished). A rejection must be reported as
/// [`Error::DownloadRejected`](crate::Error::DownloadRejected).
#[async_trait]
pub trait NativeDownloader: Send + Sync {
    async fn download(&self, request: DownloadRequest) -> Result<NativeHandle>;
}
