//! URL modeling: link classification, signature stripping and filename derivation.
//!
//! Everything here is pure string/URL work; no network access.

mod classify;
mod path;
mod sanitize;
mod signing;

use std::sync::LazyLock;

use chrono::{DateTime, Datelike, Utc};
use regex::Regex;

use crate::error::{Error, Result};

pub use classify::{is_final_link, is_intermediate_link, is_viewer_link, office_preview_source};
pub use path::{last_path_segment, query_param};
pub use sanitize::{
    clean_filename, has_extension, sanitize_filename, truncate_preserving_extension,
    MAX_FILENAME_CHARS,
};
pub use signing::{
    strip_signature, strip_signing_params, unknown_signature_params, OSS_MARKER, SIGNING_PARAMS,
};

/// `<id>-<ms timestamp>-<name>`: the name is everything after the second dash.
static NAMED_RESOURCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9]+-\d+-(.+)$").unwrap());

/// `<id>-<ms timestamp>` with no name.
static TIMESTAMP_RESOURCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9]+-(\d+)$").unwrap());

/// Generated name used when nothing usable can be derived.
pub fn default_filename() -> String {
    format!("courseware_{}.pptx", Utc::now().timestamp_millis())
}

/// Replaces literal `%20` sequences with spaces.
pub fn decode_spaces(s: &str) -> String {
    s.replace("%20", " ")
}

/// Decodes `&amp;` entities left over from HTML attributes.
pub fn decode_html_amp(s: &str) -> String {
    s.replace("&amp;", "&")
}

/// Rewrites the first `ssl=1` to `ssl=0`; anything else passes through.
pub fn rewrite_ssl_flag(url: &str) -> String {
    url.replacen("ssl=1", "ssl=0", 1)
}

fn timestamp_name(digits: &str) -> String {
    let stamp = digits
        .parse::<i64>()
        .ok()
        .and_then(DateTime::<Utc>::from_timestamp_millis)
        .filter(|dt| dt.year() > 2000);
    match stamp {
        Some(dt) => format!("courseware_{}", dt.format("%Y%m%d_%H%M")),
        None => format!("courseware_{}", digits),
    }
}

fn name_from_segment(segment: &str) -> String {
    if let Some(caps) = NAMED_RESOURCE.captures(segment) {
        return caps[1].to_string();
    }
    if let Some(caps) = TIMESTAMP_RESOURCE.captures(segment) {
        return timestamp_name(&caps[1]);
    }
    segment.to_string()
}

/// Extension guessed from hints in the source and resolved URLs.
fn inferred_extension(resolved_url: &str, source_url: &str) -> &'static str {
    let raw = source_url.to_ascii_lowercase();
    let resolved = resolved_url.to_ascii_lowercase();
    if raw.contains("=pdf") || resolved.contains("pdf") {
        ".pdf"
    } else if raw.contains("=doc") || resolved.contains("doc") {
        ".docx"
    } else if raw.contains("=xls") || resolved.contains("xls") || resolved.contains("excel") {
        ".xlsx"
    } else {
        ".pptx"
    }
}

/// Derives the target filename for a resolved URL.
///
/// `fname` wins when present; otherwise the last path segment is decoded,
/// with the `<id>-<ts>-<name>` and `<id>-<ts>` forms recognised. A name
/// without an extension gets one inferred from `source_url` and
/// `resolved_url`. Fails with [`Error::EmptyFilename`] when no usable name
/// remains after cleaning.
pub fn derive_filename(resolved_url: &str, source_url: &str) -> Result<String> {
    let candidate = query_param(resolved_url, "fname")
        .filter(|v| !v.trim().is_empty())
        .or_else(|| last_path_segment(resolved_url).map(|seg| name_from_segment(&seg)))
        .unwrap_or_default();

    let cleaned = clean_filename(&candidate);
    if cleaned.is_empty() {
        return Err(Error::EmptyFilename);
    }
    if has_extension(&cleaned) {
        return Ok(cleaned);
    }
    let with_ext = format!("{}{}", cleaned, inferred_extension(resolved_url, source_url));
    Ok(clean_filename(&with_ext))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ssl_flag_rewrite() {
        assert_eq!(
            rewrite_ssl_flag("https://vip.ow365.cn/?furl=a&ssl=1&x=ssl=1"),
            "https://vip.ow365.cn/?furl=a&ssl=0&x=ssl=1"
        );
        assert_eq!(rewrite_ssl_flag("https://vip.ow365.cn/?furl=a"), "https://vip.ow365.cn/?furl=a");
        assert_eq!(rewrite_ssl_flag("https://h/?ssl=10"), "https://h/?ssl=00");
    }

    #[test]
    fn named_resource_segment() {
        let name = derive_filename(
            "https://cdn.example.com/AbCd12-1700000000000-MySlides.pptx",
            "https://vip.ow365.cn/?furl=x&ssl=1",
        )
        .unwrap();
        assert_eq!(name, "MySlides.pptx");
    }

    #[test]
    fn timestamp_segment_is_formatted_utc() {
        let name = derive_filename(
            "https://x.teachermate.com.cn/fN5Ke-1739834885236",
            "https://vip.ow365.cn/?furl=x&ssl=1",
        )
        .unwrap();
        assert_eq!(name, "courseware_20250217_2328.pptx");
    }

    #[test]
    fn early_timestamp_keeps_digits() {
        let name = derive_filename("https://x.teachermate.cn/ab1-12345", "").unwrap();
        assert_eq!(name, "courseware_12345.pptx");
    }

    #[test]
    fn fname_query_wins() {
        let name = derive_filename(
            "https://cdn.example.com/AbCd-1-ignored.pptx?fname=%E7%AC%AC3%E7%AB%A0.pdf",
            "",
        )
        .unwrap();
        assert_eq!(name, "第3章.pdf");
    }

    #[test]
    fn extension_hints() {
        assert_eq!(
            derive_filename("https://cdn.example.com/report", "https://vip.ow365.cn/?type=pdf").unwrap(),
            "report.pdf"
        );
        assert_eq!(derive_filename("https://cdn.example.com/docs/notes", "").unwrap(), "notes.docx");
        assert_eq!(derive_filename("https://cdn.example.com/excel/grades", "").unwrap(), "grades.xlsx");
        assert_eq!(derive_filename("https://cdn.example.com/lecture", "").unwrap(), "lecture.pptx");
    }

    #[test]
    fn literal_spaces_and_reserved_chars() {
        let name = derive_filename("https://cdn.example.com/x-1-My Slides: part*1.pptx", "").unwrap();
        assert_eq!(name, "My Slides_ part_1.pptx");
    }

    #[test]
    fn empty_name_is_an_error() {
        assert!(matches!(
            derive_filename("https://cdn.example.com/", ""),
            Err(Error::EmptyFilename)
        ));
        assert!(matches!(
            derive_filename("https://cdn.example.com/...", ""),
            Err(Error::EmptyFilename)
        ));
    }

    #[test]
    fn derived_names_are_safe() {
        let long = format!("https://cdn.example.com/{}", "z".repeat(400));
        let urls = [
            "https://cdn.example.com/AbCd12-1700000000000-a%2Fb%3Cc%3E.pptx",
            "https://cdn.example.com/a?fname=..%2F..%2Fetc%2Fpasswd",
            "https://x.teachermate.cn/fN5Ke-1739834885236",
            long.as_str(),
        ];
        for url in urls {
            let name = derive_filename(url, "").unwrap();
            assert!(!name.is_empty(), "{url}");
            assert!(name.chars().count() <= MAX_FILENAME_CHARS, "{url}");
            assert!(has_extension(&name), "{url}: {name}");
            assert!(!name.contains(['/', '\\', ':', '*', '?', '"', '<', '>', '|']), "{url}: {name}");
        }
    }

    #[test]
    fn default_name_shape() {
        let name = default_filename();
        assert!(name.starts_with("courseware_"));
        assert!(name.ends_with(".pptx"));
    }
}
