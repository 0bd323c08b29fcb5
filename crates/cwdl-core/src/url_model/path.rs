//! Filename hints from URL path and query.

/// Extracts the last path segment of a URL, percent-decoded.
///
/// Query and fragment are ignored. URLs that do not parse (e.g. carrying
/// characters the upstream never escaped) fall back to plain string splitting.
pub fn last_path_segment(url: &str) -> Option<String> {
    let raw = match url::Url::parse(url) {
        Ok(parsed) => parsed
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .map(str::to_string)?,
        Err(_) => {
            let without_query = url.split(['?', '#']).next().unwrap_or(url);
            without_query.rsplit('/').next()?.to_string()
        }
    };
    if raw.is_empty() || raw == "." || raw == ".." {
        return None;
    }
    Some(percent_decode_lossy(&raw))
}

/// Value of query parameter `key`, fully percent-decoded.
///
/// The upstream sometimes double-encodes `fname`; a second decoding pass is
/// applied while `%XX` sequences remain.
pub fn query_param(url: &str, key: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    let (_, value) = parsed.query_pairs().find(|(k, _)| k == key)?;
    let mut value = value.into_owned();
    if value.contains('%') {
        value = percent_decode_lossy(&value);
    }
    Some(value)
}

fn percent_decode_lossy(s: &str) -> String {
    urlencoding::decode(s)
        .map(|c| c.into_owned())
        .unwrap_or_else(|_| s.to_string())
}
