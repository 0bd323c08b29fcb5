//! Link classification predicates.

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

const VIEWER_HOST: &str = "vip.ow365.cn";
const FINAL_HOST_SUFFIXES: &[&str] = &["teachermate.com.cn", "teachermate.cn"];
const OFFICE_PREVIEW_HOSTS: &[&str] = &["view.officeapps.live.com", "office.com", "office365.com"];

static OFFICE_SRC: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[?&]src=([^&#]+)").unwrap());

fn host_of(url: &str) -> Option<String> {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_ascii_lowercase()))
}

fn host_matches(host: &str, suffix: &str) -> bool {
    host == suffix || host.ends_with(&format!(".{}", suffix))
}

fn is_viewer_host(url: &str) -> bool {
    host_of(url).is_some_and(|h| h == VIEWER_HOST)
}

/// Viewer link as it appears on a course page (`ssl=` flag present).
pub fn is_viewer_link(url: &str) -> bool {
    is_viewer_host(url) && url.contains("ssl=")
}

/// Viewer link after the stage-1 rewrite (`ssl=0`).
pub fn is_intermediate_link(url: &str) -> bool {
    is_viewer_host(url) && url.contains("ssl=0")
}

/// Direct link on the courseware storage host.
pub fn is_final_link(url: &str) -> bool {
    host_of(url).is_some_and(|h| FINAL_HOST_SUFFIXES.iter().any(|s| host_matches(&h, s)))
}

/// When `url` is an Office online preview page, the document URL it wraps.
pub fn office_preview_source(url: &str) -> Option<String> {
    let host = host_of(url)?;
    if !OFFICE_PREVIEW_HOSTS.iter().any(|s| host_matches(&host, s)) {
        return None;
    }
    let caps = OFFICE_SRC.captures(url)?;
    let decoded = urlencoding::decode(&caps[1]).ok()?.into_owned();
    let decoded = decoded.trim().to_string();
    if decoded.is_empty() {
        None
    } else {
        Some(decoded)
    }
}
