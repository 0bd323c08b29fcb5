//! Integration test: resolve and download through the queue with the curl downloader.

mod common;

use common::stub_server::{self, Route};
use cwdl_core::http::HttpOptions;
use cwdl_core::queue::{CurlDownloader, DownloadQueue, QueuePolicy, TaskStatus};
use cwdl_core::Resolver;
use tempfile::tempdir;

fn body() -> Vec<u8> {
    (0u8..=255).cycle().take(48 * 1024).collect()
}

#[tokio::test]
async fn downloads_and_uniquifies_colliding_names() {
    let server = stub_server::start(vec![
        ("/files/deck.pptx", Route::Body { status: 200, body: body() }),
        ("/dl", Route::Redirect { status: 302, location: "/files/deck.pptx".into() }),
    ]);
    let dir = tempdir().unwrap();
    let native = CurlDownloader::new(dir.path(), HttpOptions::default());
    let (queue, _engine) = DownloadQueue::spawn(native, QueuePolicy::immediate());

    queue.enqueue(&server.url("/files/deck.pptx"), "deck.pptx").unwrap();
    queue.enqueue(&server.url("/dl"), "deck.pptx").unwrap();
    queue.wait_idle().await.unwrap();

    assert!(queue.snapshot().await.unwrap().is_empty());
    assert_eq!(std::fs::read(dir.path().join("deck.pptx")).unwrap(), body());
    assert_eq!(std::fs::read(dir.path().join("deck (1).pptx")).unwrap(), body());
    let leftovers: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .flatten()
        .filter(|e| e.file_name().to_string_lossy().ends_with(".part"))
        .collect();
    assert!(leftovers.is_empty());
}

#[tokio::test]
async fn http_errors_exhaust_retries() {
    let server = stub_server::start(vec![]);
    let dir = tempdir().unwrap();
    let native = CurlDownloader::new(dir.path(), HttpOptions::default());
    let policy = QueuePolicy { max_retries: 1, ..QueuePolicy::immediate() };
    let (queue, _engine) = DownloadQueue::spawn(native, policy);

    let id = queue.enqueue(&server.url("/files/missing.pdf"), "missing.pdf").unwrap();
    queue.wait_idle().await.unwrap();

    let task = queue.task(&id).await.unwrap().expect("failed task is retained");
    assert_eq!(task.status, TaskStatus::FailedPermanent);
    assert_eq!(task.retry_count, 1);
    assert!(task.last_error.as_deref().unwrap_or("").contains("HTTP 404"));
    assert_eq!(server.requests().len(), 2);
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn resolved_link_downloads_under_derived_name() {
    let server = stub_server::start(vec![
        (
            "/viewer",
            Route::Redirect {
                status: 302,
                location: "/AbC-1700000000000-Week%201.pptx?OSSAccessKeyId=X&Expires=1&Signature=Z".into(),
            },
        ),
        ("/AbC-1700000000000-Week%201.pptx", Route::Body { status: 200, body: body() }),
    ]);
    let resolver = Resolver::with_http_options(HttpOptions::default());
    let link = resolver.resolve(&server.url("/viewer?furl=x&ssl=1")).await.unwrap();
    assert_eq!(link.filename, "Week 1.pptx");
    assert!(!link.url.contains("OSSAccessKeyId"));

    let dir = tempdir().unwrap();
    let native = CurlDownloader::new(dir.path(), HttpOptions::default());
    let (queue, _engine) = DownloadQueue::spawn(native, QueuePolicy::immediate());
    queue.enqueue(&link.url, &link.filename).unwrap();
    queue.wait_idle().await.unwrap();

    assert_eq!(std::fs::read(dir.path().join("Week 1.pptx")).unwrap(), body());
}
