//! Viewer link discovery in saved course page sources.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::url_model::{decode_html_amp, query_param};

static VIEWER_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"https?://vip\.ow365\.cn[^"'\s)<>]+"#).unwrap());

/// Viewer links carrying `ssl=1`, in first-seen order without duplicates.
pub fn scan_viewer_links(page_source: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    VIEWER_LINK
        .find_iter(page_source)
        .map(|m| decode_html_amp(m.as_str()))
        .filter(|link| link.contains("ssl=1"))
        .filter(|link| seen.insert(link.clone()))
        .collect()
}

/// Display label for a viewer link: its decoded `fname`, when present.
pub fn viewer_link_label(url: &str) -> Option<String> {
    query_param(url, "fname").filter(|name| !name.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <a href="https://vip.ow365.cn/?i=1&amp;furl=https%3A%2F%2Fa&amp;fname=%E8%AF%BE%E4%BB%B61.pptx&amp;ssl=1">one</a>
        <div style="background:url(https://vip.ow365.cn/?i=1&furl=b&ssl=1)"></div>
        <a href='https://vip.ow365.cn/?i=1&amp;furl=https%3A%2F%2Fa&amp;fname=%E8%AF%BE%E4%BB%B61.pptx&amp;ssl=1'>dup</a>
        <a href="https://vip.ow365.cn/?i=1&furl=c&ssl=0">already rewritten</a>
        <a href="https://example.com/?ssl=1">other host</a>
    "#;

    #[test]
    fn finds_decodes_and_dedups() {
        let links = scan_viewer_links(PAGE);
        assert_eq!(
            links,
            vec![
                "https://vip.ow365.cn/?i=1&furl=https%3A%2F%2Fa&fname=%E8%AF%BE%E4%BB%B61.pptx&ssl=1".to_string(),
                "https://vip.ow365.cn/?i=1&furl=b&ssl=1".to_string(),
            ]
        );
    }

    #[test]
    fn empty_page() {
        assert!(scan_viewer_links("<html></html>").is_empty());
    }

    #[test]
    fn labels() {
        let links = scan_viewer_links(PAGE);
        assert_eq!(viewer_link_label(&links[0]).as_deref(), Some("课件1.pptx"));
        assert_eq!(viewer_link_label(&links[1]), None);
    }
}
