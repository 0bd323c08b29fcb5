//! Serialized download queue with bounded retries.
//!
//! [`DownloadQueue`] is a cheap, cloneable handle to an engine task that owns
//! all task records. At most one task is `Downloading` at any time; failed
//! downloads are retried with a growing pause until the retry budget is spent,
//! after which the task stays around as `FailedPermanent` until cleared.

mod curl_downloader;
mod engine;
mod native;
mod policy;
mod task;

pub use curl_downloader::{target_path, CurlDownloader, TEMP_SUFFIX};
pub use native::{ConflictAction, DownloadEvent, DownloadRequest, DownloadState, NativeDownloader};
pub use policy::{Confirmation, QueuePolicy};
pub use task::{NativeHandle, Task, TaskEvent, TaskId, TaskStatus};

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::error::{Error, Result};
use crate::url_model::{sanitize_filename, strip_signature, OSS_MARKER};
use engine::{Command, Engine};

/// Handle to a running download queue.
#[derive(Debug, Clone)]
pub struct DownloadQueue {
    commands: mpsc::UnboundedSender<Command>,
    events: mpsc::UnboundedSender<DownloadEvent>,
}

impl DownloadQueue {
    /// Starts the engine on the current tokio runtime.
    ///
    /// The returned join handle completes after [`shutdown`](Self::shutdown)
    /// (or once every queue handle is dropped) and the in-flight download settled.
    pub fn spawn<D>(native: D, policy: QueuePolicy) -> (Self, JoinHandle<()>)
    where
        D: NativeDownloader + 'static,
    {
        let (commands, command_rx) = mpsc::unbounded_channel();
        let (events, event_rx) = mpsc::unbounded_channel();
        let join = tokio::spawn(Engine::run(Arc::new(native), policy, command_rx, event_rx));
        (Self { commands, events }, join)
    }

    /// Queues a download and returns its id without waiting for it.
    ///
    /// The URL has its signing parameters stripped and the filename is
    /// sanitized. Fails with [`Error::InvalidInput`] on an empty or
    /// unparseable URL or an empty filename.
    pub fn enqueue(&self, url: &str, filename: &str) -> Result<TaskId> {
        let url = url.trim();
        if url.is_empty() {
            return Err(Error::InvalidInput("empty url".into()));
        }
        url::Url::parse(url).map_err(|e| Error::InvalidInput(format!("{}: {}", url, e)))?;
        if filename.trim().is_empty() {
            return Err(Error::InvalidInput("empty filename".into()));
        }
        let url = strip_signature(url);
        if url.contains(OSS_MARKER) {
            return Err(Error::InvalidInput(format!("unresolved signed url: {}", url)));
        }

        let task = Task::new(url, sanitize_filename(filename));
        let id = task.id.clone();
        self.send(Command::Enqueue(task))?;
        Ok(id)
    }

    /// Copies of all tasks in insertion order.
    pub async fn snapshot(&self) -> Result<Vec<Task>> {
        self.request(Command::Snapshot).await
    }

    pub async fn task(&self, id: &TaskId) -> Result<Option<Task>> {
        let id = id.clone();
        self.request(|reply| Command::Get(id, reply)).await
    }

    /// Removes a permanently failed task; other states are left alone.
    pub async fn clear(&self, id: &TaskId) -> Result<bool> {
        let id = id.clone();
        self.request(|reply| Command::Clear(id, reply)).await
    }

    /// Removes every permanently failed task, returning how many went.
    pub async fn clear_failed(&self) -> Result<usize> {
        self.request(Command::ClearFailed).await
    }

    /// Resolves once nothing is pending, downloading or waiting for a retry.
    pub async fn wait_idle(&self) -> Result<()> {
        self.request(Command::WaitIdle).await
    }

    /// Channel on which a native collaborator reports completion events.
    pub fn event_sender(&self) -> mpsc::UnboundedSender<DownloadEvent> {
        self.events.clone()
    }

    /// Asks the engine to stop once the in-flight download settled.
    pub fn shutdown(&self) {
        let _ = self.commands.send(Command::Shutdown);
    }

    fn send(&self, cmd: Command) -> Result<()> {
        self.commands.send(cmd).map_err(|_| Error::EngineStopped)
    }

    async fn request<T>(&self, make: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T> {
        let (tx, rx) = oneshot::channel();
        self.send(make(tx))?;
        rx.await.map_err(|_| Error::EngineStopped)
    }
}
