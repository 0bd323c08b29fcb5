//! Individual extraction strategies.

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

use crate::url_model::{strip_signing_params, OSS_MARKER};

static CANONICAL_RESOURCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"https?://[A-Za-z0-9.-]*teachermate\.(?:com\.cn|cn)/[A-Za-z0-9]+-\d+-[^"'\s<>?]+(?:\?[^"'\s<>]+)?"#,
    )
    .unwrap()
});

static SHORT_RESOURCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"https?://[A-Za-z0-9.-]*teachermate\.(?:com\.cn|cn)/[A-Za-z0-9]+-\d+(?:\?[^"'\s<>]+)?"#)
        .unwrap()
});

static ANY_HTTP: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"https?://[^\s"'<>]+"#).unwrap());

/// One way of pulling a download URL out of redirect or body text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Cut a signed storage URL just before `?OSSAccessKeyId`.
    OssMarker,
    /// `<id>-<digits>-<name>` resource on the courseware host.
    CanonicalResource,
    /// `<id>-<digits>` resource on the courseware host.
    ShortResource,
    /// The whole text is one absolute URL; drop its signing parameters.
    SignedAbsolute,
    /// First http(s) URL anywhere in the text.
    AnyHttp,
}

impl Strategy {
    /// Raw match for this strategy, before `%20` decoding.
    pub fn extract(&self, text: &str) -> Option<String> {
        match self {
            Strategy::OssMarker => oss_marker_candidate(text),
            Strategy::CanonicalResource => CANONICAL_RESOURCE.find(text).map(|m| m.as_str().to_string()),
            Strategy::ShortResource => SHORT_RESOURCE.find(text).map(|m| m.as_str().to_string()),
            Strategy::SignedAbsolute => signed_absolute(text),
            Strategy::AnyHttp => ANY_HTTP.find(text).map(|m| m.as_str().to_string()),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Strategy::OssMarker => "oss_marker",
            Strategy::CanonicalResource => "canonical_resource",
            Strategy::ShortResource => "short_resource",
            Strategy::SignedAbsolute => "signed_absolute",
            Strategy::AnyHttp => "any_http",
        }
    }
}

/// The URL in front of the first `?OSSAccessKeyId`, starting at the last
/// `https://` before it. Never returns a string containing the marker.
pub fn oss_marker_candidate(text: &str) -> Option<String> {
    if !text.contains(OSS_MARKER) {
        return None;
    }
    let cut = text.find(&format!("?{}", OSS_MARKER))?;
    if cut == 0 {
        return None;
    }
    let start = text[..cut].rfind("https://")?;
    let candidate = &text[start..cut];
    if candidate.contains(OSS_MARKER) {
        return None;
    }
    Some(candidate.to_string())
}

fn signed_absolute(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() || trimmed.contains(char::is_whitespace) {
        return None;
    }
    let parsed = Url::parse(trimmed).ok()?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return None;
    }
    Some(strip_signing_params(&parsed).to_string())
}
