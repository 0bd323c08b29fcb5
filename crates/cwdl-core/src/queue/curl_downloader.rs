//! libcurl-backed native downloader.
//!
//! Each request runs as one blocking GET (redirects followed) that streams
//! into `<dir>/<name>.part` and is renamed to the final name on success.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use super::native::{ConflictAction, DownloadRequest, NativeDownloader};
use super::task::NativeHandle;
use crate::error::Error;
use crate::http::HttpOptions;

/// Temporary file suffix used before the final rename.
pub const TEMP_SUFFIX: &str = ".part";

/// Writes downloads into a directory with libcurl.
#[derive(Debug)]
pub struct CurlDownloader {
    download_dir: PathBuf,
    options: HttpOptions,
    next_handle: AtomicU64,
}

impl CurlDownloader {
    pub fn new(download_dir: impl Into<PathBuf>, options: HttpOptions) -> Self {
        Self {
            download_dir: download_dir.into(),
            options,
            next_handle: AtomicU64::new(1),
        }
    }

    pub fn download_dir(&self) -> &Path {
        &self.download_dir
    }
}

#[async_trait]
impl NativeDownloader for CurlDownloader {
    async fn download(&self, request: DownloadRequest) -> crate::Result<NativeHandle> {
        let handle = self.next_handle.fetch_add(1, Ordering::Relaxed);
        let dir = self.download_dir.clone();
        let options = self.options.clone();
        let url = request.url.clone();

        let saved = tokio::task::spawn_blocking(move || download_to_dir(&request, &dir, &options))
            .await
            .map_err(|e| Error::DownloadRejected(format!("download task join: {}", e)))?
            .map_err(|e| Error::DownloadRejected(format!("{:#}", e)))?;

        tracing::debug!(handle, url = %url, path = %saved.display(), "download finished");
        Ok(handle)
    }
}

/// Picks the path the download is written to.
///
/// A taken `name.ext` becomes `name (1).ext`, `name (2).ext`, ... until a
/// path that is neither an existing file nor an in-progress `.part`.
pub fn target_path(dir: &Path, filename: &str) -> PathBuf {
    let first = dir.join(filename);
    if !is_taken(&first) {
        return first;
    }
    let (stem, ext) = match filename.rfind('.') {
        Some(i) if i > 0 => (&filename[..i], &filename[i..]),
        _ => (filename, ""),
    };
    (1u32..)
        .map(|n| dir.join(format!("{} ({}){}", stem, n, ext)))
        .find(|p| !is_taken(p))
        .unwrap_or(first)
}

fn is_taken(path: &Path) -> bool {
    path.exists() || part_path(path).exists()
}

fn part_path(path: &Path) -> PathBuf {
    let mut os = path.as_os_str().to_owned();
    os.push(TEMP_SUFFIX);
    PathBuf::from(os)
}

/// URL as libcurl wants it: spaces and other unescaped characters encoded.
fn wire_url(url: &str) -> String {
    url::Url::parse(url)
        .map(|u| u.to_string())
        .unwrap_or_else(|_| url.replace(' ', "%20"))
}

/// Downloads `request` into `dir`, returning the final path.
fn download_to_dir(request: &DownloadRequest, dir: &Path, options: &HttpOptions) -> Result<PathBuf> {
    fs::create_dir_all(dir)
        .with_context(|| format!("create download dir: {}", dir.display()))?;
    let final_path = match request.conflict_action {
        ConflictAction::Uniquify => target_path(dir, &request.filename),
    };
    let temp_path = part_path(&final_path);

    let result = fetch_into(&wire_url(&request.url), &temp_path, options);
    if let Err(e) = result {
        let _ = fs::remove_file(&temp_path);
        return Err(e);
    }

    fs::rename(&temp_path, &final_path).with_context(|| {
        format!("rename {} -> {}", temp_path.display(), final_path.display())
    })?;
    Ok(final_path)
}

fn fetch_into(url: &str, temp_path: &Path, options: &HttpOptions) -> Result<u64> {
    let mut file = File::create(temp_path)
        .with_context(|| format!("create temp file: {}", temp_path.display()))?;
    let mut written: u64 = 0;
    let mut write_error: Option<std::io::Error> = None;

    let mut easy = curl::easy::Easy::new();
    easy.url(url).context("invalid URL")?;
    easy.get(true)?;
    easy.follow_location(true)?;
    easy.max_redirections(10)?;
    options.apply(&mut easy, &[])?;

    let performed = {
        let mut transfer = easy.transfer();
        transfer.write_function(|data| match file.write_all(data) {
            Ok(()) => {
                written += data.len() as u64;
                Ok(data.len())
            }
            Err(e) => {
                write_error = Some(e);
                Ok(0) // abort transfer
            }
        })?;
        transfer.perform()
    };
    if let Some(e) = write_error {
        return Err(e).context("write download body");
    }
    performed.context("GET request failed")?;

    let code = easy.response_code().context("no response code")?;
    if !(200..300).contains(&code) {
        anyhow::bail!("GET {} returned HTTP {}", url, code);
    }
    file.flush().context("flush download")?;
    Ok(written)
}
