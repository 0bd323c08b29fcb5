//! Batch submission: resolve a list of viewer links and queue the results.

use std::time::Duration;

use serde::Serialize;

use crate::probe::Probe;
use crate::queue::{DownloadQueue, TaskId};
use crate::resolver::Resolver;
use crate::url_model::decode_html_amp;

/// What happened to one input URL.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum BatchOutcome {
    Queued {
        task_id: TaskId,
        url: String,
        filename: String,
        warnings: Vec<String>,
    },
    Failed {
        error: String,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchEntry {
    pub source: String,
    #[serde(flatten)]
    pub outcome: BatchOutcome,
}

impl BatchEntry {
    pub fn is_queued(&self) -> bool {
        matches!(self.outcome, BatchOutcome::Queued { .. })
    }
}

/// Resolves and queues `urls` in order, pausing `stagger` between resolutions.
///
/// Failures are recorded per URL and never stop the batch.
pub async fn submit_batch<P: Probe>(
    resolver: &Resolver<P>,
    queue: &DownloadQueue,
    urls: &[String],
    stagger: Duration,
) -> Vec<BatchEntry> {
    let sources: Vec<String> = urls
        .iter()
        .map(|u| decode_html_amp(u.trim()))
        .filter(|u| !u.is_empty())
        .collect();

    let mut entries = Vec::with_capacity(sources.len());
    for (i, source) in sources.into_iter().enumerate() {
        if i > 0 && !stagger.is_zero() {
            tokio::time::sleep(stagger).await;
        }
        let outcome = match resolver.resolve_or_default(&source).await {
            Ok(link) => match queue.enqueue(&link.url, &link.filename) {
                Ok(task_id) => BatchOutcome::Queued {
                    task_id,
                    url: link.url,
                    filename: link.filename,
                    warnings: link.warnings,
                },
                Err(e) => BatchOutcome::Failed { error: e.to_string() },
            },
            Err(e) => BatchOutcome::Failed { error: e.to_string() },
        };
        match &outcome {
            BatchOutcome::Queued { task_id, filename, .. } => {
                tracing::info!(source = %source, task_id = %task_id, filename = %filename, "batch item queued");
            }
            BatchOutcome::Failed { error } => {
                tracing::warn!(source = %source, error = %error, "batch item failed to resolve");
            }
        }
        entries.push(BatchEntry { source, outcome });
    }
    entries
}
