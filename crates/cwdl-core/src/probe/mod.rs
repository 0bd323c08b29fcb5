//! Redirect probe against the viewer link.
//!
//! Issues a single GET with libcurl, redirect following off, and reports the
//! status, the `Location` header and (for 200 responses) the body text.

mod parse;

use async_trait::async_trait;
use std::str;

use crate::error::{Error, Result};
use crate::http::HttpOptions;

/// Bodies larger than this are truncated; the links we look for sit near the top.
const MAX_BODY_BYTES: usize = 4 * 1024 * 1024;

const NO_CACHE_HEADERS: &[&str] = &["Cache-Control: no-cache", "Pragma: no-cache"];

/// What the upstream answered to the probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResponse {
    pub status: u32,
    /// `Location` header, made absolute against the probed URL when relative.
    pub location: Option<String>,
    /// Response body decoded as lossy UTF-8 (possibly truncated).
    pub body: String,
}

impl ProbeResponse {
    pub fn is_redirect(&self) -> bool {
        matches!(self.status, 301 | 302 | 307 | 308)
    }
}

/// Network seam of the resolver.
#[async_trait]
pub trait Probe: Send + Sync {
    async fn probe(&self, url: &str) -> Result<ProbeResponse>;
}

/// Probe backed by libcurl; the blocking transfer runs on tokio's blocking pool.
#[derive(Debug, Clone, Default)]
pub struct CurlProbe {
    options: HttpOptions,
}

impl CurlProbe {
    pub fn new(options: HttpOptions) -> Self {
        Self { options }
    }
}

#[async_trait]
impl Probe for CurlProbe {
    async fn probe(&self, url: &str) -> Result<ProbeResponse> {
        let url = url.to_string();
        let options = self.options.clone();
        tokio::task::spawn_blocking(move || probe_blocking(&url, &options))
            .await
            .map_err(|e| Error::NetworkFailure(format!("probe task join: {}", e)))?
    }
}

/// Performs the probe request in the current thread.
pub fn probe_blocking(url: &str, options: &HttpOptions) -> Result<ProbeResponse> {
    let mut headers: Vec<String> = Vec::new();
    let mut body: Vec<u8> = Vec::new();

    let mut easy = curl::easy::Easy::new();
    easy.url(url)?;
    easy.get(true)?;
    easy.follow_location(false)?;
    easy.fresh_connect(true)?;
    options.apply(&mut easy, NO_CACHE_HEADERS)?;

    {
        let mut transfer = easy.transfer();
        transfer.header_function(|data| {
            if let Ok(s) = str::from_utf8(data) {
                headers.push(s.trim_end().to_string());
            }
            true
        })?;
        transfer.write_function(|data| {
            let room = MAX_BODY_BYTES.saturating_sub(body.len());
            body.extend_from_slice(&data[..data.len().min(room)]);
            Ok(data.len())
        })?;
        transfer.perform()?;
    }

    let status = easy.response_code()?;
    let location = parse::parse_location(&headers).map(|loc| absolutize(url, &loc));
    tracing::debug!(url, status, location = ?location, "probe response");

    Ok(ProbeResponse {
        status,
        location,
        body: String::from_utf8_lossy(&body).into_owned(),
    })
}

/// Resolves a relative `Location` against the request URL.
fn absolutize(base: &str, location: &str) -> String {
    url::Url::parse(base)
        .and_then(|b| b.join(location))
        .map(|u| u.to_string())
        .unwrap_or_else(|_| location.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redirect_statuses() {
        for status in [301, 302, 307, 308] {
            let r = ProbeResponse { status, location: None, body: String::new() };
            assert!(r.is_redirect());
        }
        let r = ProbeResponse { status: 303, location: None, body: String::new() };
        assert!(!r.is_redirect());
    }

    #[test]
    fn absolutize_relative_location() {
        assert_eq!(
            absolutize("https://vip.ow365.cn/?furl=a&ssl=0", "/files/a.pptx"),
            "https://vip.ow365.cn/files/a.pptx"
        );
    }

    #[test]
    fn absolutize_keeps_absolute_location() {
        let loc = "https://cdn.example.com/AbCd12-1700000000000-x.pptx?OSSAccessKeyId=X";
        assert_eq!(absolutize("https://vip.ow365.cn/?ssl=0", loc), loc);
    }
}
