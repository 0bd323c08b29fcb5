//! Download task record and its state machine.

use std::fmt;

use chrono::Utc;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Identifier handed out by the native download subsystem once a transfer started.
pub type NativeHandle = u64;

const ID_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Opaque task identifier: `<ms timestamp>-<7 lowercase alphanumerics>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    pub fn generate() -> Self {
        let mut rng = rand::rng();
        let suffix: String = (0..7)
            .map(|_| ID_ALPHABET[rng.random_range(0..ID_ALPHABET.len())] as char)
            .collect();
        TaskId(format!("{}-{}", Utc::now().timestamp_millis(), suffix))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TaskId {
    fn from(s: &str) -> Self {
        TaskId(s.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Downloading,
    Succeeded,
    FailedRetryable,
    FailedPermanent,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Downloading => "downloading",
            TaskStatus::Succeeded => "succeeded",
            TaskStatus::FailedRetryable => "failed_retryable",
            TaskStatus::FailedPermanent => "failed_permanent",
        }
    }

    /// No further transitions happen from this state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Succeeded | TaskStatus::FailedPermanent)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inputs to [`Task::apply`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskEvent {
    /// Picked by a worker pass.
    Dispatched,
    /// Native download started and returned a handle.
    Started(NativeHandle),
    /// Download confirmed finished.
    Completed,
    /// Native rejection or interruption.
    Failed(String),
    /// Backoff elapsed; a retryable task becomes eligible again.
    Requeued,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Task {
    pub id: TaskId,
    pub url: String,
    pub filename: String,
    pub status: TaskStatus,
    pub retry_count: u32,
    pub last_error: Option<String>,
    pub native_handle: Option<NativeHandle>,
    /// Milliseconds since the Unix epoch.
    pub created_at: i64,
}

impl Task {
    /// New `Pending` task. Inputs are expected to be validated already.
    pub fn new(url: String, filename: String) -> Self {
        Task {
            id: TaskId::generate(),
            url,
            filename,
            status: TaskStatus::Pending,
            retry_count: 0,
            last_error: None,
            native_handle: None,
            created_at: Utc::now().timestamp_millis(),
        }
    }

    /// Applies `event`; returns false (and changes nothing) when the event
    /// does not fit the current state.
    ///
    /// A failure while retries remain bumps `retry_count` and parks the task
    /// in `FailedRetryable`; once `max_retries` retries are spent the task
    /// becomes `FailedPermanent` with `retry_count == max_retries`.
    pub fn apply(&mut self, event: TaskEvent, max_retries: u32) -> bool {
        match (self.status, event) {
            (TaskStatus::Pending, TaskEvent::Dispatched) => {
                self.status = TaskStatus::Downloading;
                self.native_handle = None;
            }
            (TaskStatus::Downloading, TaskEvent::Started(handle)) if self.native_handle.is_none() => {
                self.native_handle = Some(handle);
            }
            (TaskStatus::Downloading, TaskEvent::Completed) => {
                self.status = TaskStatus::Succeeded;
            }
            (TaskStatus::Downloading, TaskEvent::Failed(reason)) => {
                self.last_error = Some(reason);
                if self.retry_count < max_retries {
                    self.retry_count += 1;
                    self.status = TaskStatus::FailedRetryable;
                } else {
                    self.status = TaskStatus::FailedPermanent;
                }
            }
            (TaskStatus::FailedRetryable, TaskEvent::Requeued) => {
                self.status = TaskStatus::Pending;
                self.native_handle = None;
            }
            _ => return false,
        }
        true
    }
}
