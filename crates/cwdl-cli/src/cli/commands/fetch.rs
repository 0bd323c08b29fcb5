//! `cwdl fetch` – resolve viewer links and download them through the queue.

use anyhow::{Context, Result};
use cwdl_core::batch::{submit_batch, BatchEntry, BatchOutcome};
use cwdl_core::config::CwdlConfig;
use cwdl_core::queue::{CurlDownloader, DownloadQueue, Task, TaskStatus};
use cwdl_core::scan::scan_viewer_links;
use cwdl_core::Resolver;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug)]
pub struct FetchArgs {
    pub urls: Vec<String>,
    pub from_page: Option<PathBuf>,
    pub download_dir: Option<PathBuf>,
    pub stagger_ms: Option<u64>,
    pub report: Option<PathBuf>,
}

#[derive(Serialize)]
struct FetchReport<'a> {
    download_dir: &'a Path,
    resolutions: &'a [BatchEntry],
    tasks: &'a [Task],
}

#[derive(Debug, PartialEq, Eq)]
struct Summary {
    queued: usize,
    unresolved: usize,
    failed_downloads: usize,
}

impl Summary {
    fn new(entries: &[BatchEntry], tasks: &[Task]) -> Self {
        let queued = entries.iter().filter(|e| e.is_queued()).count();
        Summary {
            queued,
            unresolved: entries.len() - queued,
            failed_downloads: tasks
                .iter()
                .filter(|t| t.status == TaskStatus::FailedPermanent)
                .count(),
        }
    }

    fn is_clean(&self) -> bool {
        self.unresolved == 0 && self.failed_downloads == 0
    }
}

/// Command-line URLs first, then links scanned from the page, without repeats.
fn gather_urls(urls: &[String], from_page: Option<&Path>) -> Result<Vec<String>> {
    let mut all: Vec<String> = urls.to_vec();
    if let Some(path) = from_page {
        let page =
            fs::read_to_string(path).with_context(|| format!("read page: {}", path.display()))?;
        let found = scan_viewer_links(&page);
        tracing::info!(page = %path.display(), links = found.len(), "scanned page for viewer links");
        all.extend(found);
    }
    let mut seen = std::collections::HashSet::new();
    all.retain(|u| seen.insert(u.trim().to_string()));
    Ok(all)
}

pub async fn run_fetch(cfg: &CwdlConfig, args: FetchArgs) -> Result<()> {
    let urls = gather_urls(&args.urls, args.from_page.as_deref())?;
    if urls.is_empty() {
        anyhow::bail!("no viewer links given (pass URLs or --from-page FILE)");
    }

    let download_dir = match args.download_dir.or_else(|| cfg.download_dir.clone()) {
        Some(dir) => dir,
        None => std::env::current_dir().context("current directory")?,
    };
    let stagger = args
        .stagger_ms
        .map(Duration::from_millis)
        .unwrap_or_else(|| cfg.batch_stagger());

    let resolver = Resolver::with_http_options(cfg.probe_options());
    let native = CurlDownloader::new(&download_dir, cfg.download_options());
    let (queue, engine) = DownloadQueue::spawn(native, cfg.queue_policy());

    println!("Resolving {} link(s) into {}", urls.len(), download_dir.display());
    let entries = submit_batch(&resolver, &queue, &urls, stagger).await;
    for entry in &entries {
        match &entry.outcome {
            BatchOutcome::Queued { filename, warnings, .. } => {
                println!("queued   {}", filename);
                for param in warnings {
                    println!("         warning: unrecognised signing parameter {}", param);
                }
            }
            BatchOutcome::Failed { error } => {
                println!("failed   {}\n         {}", entry.source, error);
            }
        }
    }

    queue.wait_idle().await?;
    let tasks = queue.snapshot().await?;
    queue.shutdown();
    engine.await.context("queue engine")?;

    for task in tasks.iter().filter(|t| t.status == TaskStatus::FailedPermanent) {
        println!(
            "download failed after {} retries: {} ({})",
            task.retry_count,
            task.filename,
            task.last_error.as_deref().unwrap_or("unknown error")
        );
    }

    if let Some(path) = &args.report {
        let report = FetchReport {
            download_dir: &download_dir,
            resolutions: &entries,
            tasks: &tasks,
        };
        let json = serde_json::to_string_pretty(&report)?;
        fs::write(path, json).with_context(|| format!("write report: {}", path.display()))?;
    }

    let summary = Summary::new(&entries, &tasks);
    println!(
        "{} downloaded, {} failed to resolve, {} failed to download",
        summary.queued - summary.failed_downloads,
        summary.unresolved,
        summary.failed_downloads
    );
    if !summary.is_clean() {
        anyhow::bail!(
            "{} link(s) failed to resolve, {} download(s) failed",
            summary.unresolved,
            summary.failed_downloads
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gather_merges_page_links() {
        let dir = tempfile::tempdir().unwrap();
        let page = dir.path().join("course.html");
        fs::write(
            &page,
            r#"<a href="https://vip.ow365.cn/?furl=a&amp;ssl=1">a</a>
               <a href="https://vip.ow365.cn/?furl=b&amp;ssl=1">b</a>"#,
        )
        .unwrap();
        let urls = gather_urls(&["https://vip.ow365.cn/?furl=a&ssl=1".to_string()], Some(&page)).unwrap();
        assert_eq!(
            urls,
            vec![
                "https://vip.ow365.cn/?furl=a&ssl=1".to_string(),
                "https://vip.ow365.cn/?furl=b&ssl=1".to_string(),
            ]
        );
    }

    #[test]
    fn gather_missing_page_is_an_error() {
        assert!(gather_urls(&[], Some(Path::new("/nonexistent/cwdl/page.html"))).is_err());
    }

    #[test]
    fn summary_counts() {
        let entries = vec![
            BatchEntry {
                source: "a".into(),
                outcome: BatchOutcome::Queued {
                    task_id: "1-aaaaaaa".into(),
                    url: "https://cdn.example.com/a.pptx".into(),
                    filename: "a.pptx".into(),
                    warnings: Vec::new(),
                },
            },
            BatchEntry {
                source: "b".into(),
                outcome: BatchOutcome::Failed { error: "unexpected upstream status 404".into() },
            },
        ];
        let mut failed = Task::new("https://cdn.example.com/a.pptx".into(), "a.pptx".into());
        failed.status = TaskStatus::FailedPermanent;

        let summary = Summary::new(&entries, &[failed]);
        assert_eq!(summary, Summary { queued: 1, unresolved: 1, failed_downloads: 1 });
        assert!(!summary.is_clean());
        assert!(Summary::new(&entries[..1], &[]).is_clean());
    }
}
