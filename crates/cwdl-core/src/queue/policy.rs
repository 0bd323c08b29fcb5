use std::time::Duration;

use serde::{Deserialize, Serialize};

/// When a started native download counts as finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confirmation {
    /// Obtaining a handle settles the task (the downloader returns after the transfer).
    #[default]
    OnStart,
    /// The task stays `Downloading` until a completion event for its handle arrives.
    OnEvent,
}

/// Timing and retry parameters of the download queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueuePolicy {
    /// Retries after the first failed attempt.
    pub max_retries: u32,
    /// Pause after every settled task.
    pub inter_task_delay: Duration,
    /// Extra pause per retry already spent.
    pub retry_backoff: Duration,
    /// Cap on the extra retry pause.
    pub max_backoff: Duration,
    /// Idle watchdog period.
    pub watchdog_period: Duration,
    pub confirmation: Confirmation,
}

impl Default for QueuePolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            inter_task_delay: Duration::from_secs(1),
            retry_backoff: Duration::from_secs(2),
            max_backoff: Duration::from_secs(30),
            watchdog_period: Duration::from_secs(60),
            confirmation: Confirmation::OnStart,
        }
    }
}

impl QueuePolicy {
    /// Policy without any pauses; handy for tests and one-shot batch runs.
    pub fn immediate() -> Self {
        Self {
            inter_task_delay: Duration::ZERO,
            retry_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
            ..Self::default()
        }
    }

    /// Pause before the next pass once a task settled.
    ///
    /// `retry_count` is the task's count after the failure; it only matters
    /// when the task is going to be retried.
    pub fn delay_after(&self, retry_count: u32, retried: bool) -> Duration {
        if !retried {
            return self.inter_task_delay;
        }
        let backoff = self.retry_backoff.saturating_mul(retry_count).min(self.max_backoff);
        self.inter_task_delay + backoff
    }
}
