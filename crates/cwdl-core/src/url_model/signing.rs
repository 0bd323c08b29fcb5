//! Storage signing parameters: stripping and drift detection.

use url::Url;

use crate::extract::oss_marker_candidate;

use super::decode_spaces;

/// Query keys that authorize a time-limited storage URL (compared lowercase).
pub const SIGNING_PARAMS: &[&str] = &["ossaccesskeyid", "accesskeyid", "expires", "signature"];

/// Query keys we expect to see on viewer and storage links (compared lowercase).
const KNOWN_PARAMS: &[&str] = &[
    "ossaccesskeyid",
    "expires",
    "signature",
    "ssl",
    "fname",
    "furl",
    "fid",
    "convert",
    "previewtype",
];

/// Marker of a signed object-storage link.
pub const OSS_MARKER: &str = "OSSAccessKeyId";

fn is_signing_key(raw_key: &str) -> bool {
    let key = urlencoding::decode(raw_key)
        .map(|k| k.to_ascii_lowercase())
        .unwrap_or_else(|_| raw_key.to_ascii_lowercase());
    SIGNING_PARAMS.contains(&key.as_str())
}

/// Removes signing parameters from `url`, leaving every other pair as written.
/// An emptied query is dropped entirely (no trailing `?`).
pub fn strip_signing_params(url: &Url) -> Url {
    let mut out = url.clone();
    let Some(query) = url.query() else {
        return out;
    };
    let kept: Vec<&str> = query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .filter(|pair| !is_signing_key(pair.split('=').next().unwrap_or(pair)))
        .collect();
    if kept.is_empty() {
        out.set_query(None);
    } else {
        out.set_query(Some(&kept.join("&")));
    }
    out
}

/// Strips signing parameters from a resolved URL.
///
/// Uses the OSS marker cut when it applies, otherwise parses the URL and
/// drops the signing parameters; unparseable input is cut at the first `?`.
/// Parseable results are always in `Url` serialized form, so running it on
/// its own output changes nothing.
pub fn strip_signature(url: &str) -> String {
    let candidate = if url.contains(OSS_MARKER) {
        oss_marker_candidate(url)
    } else {
        None
    };
    let url = candidate.as_deref().unwrap_or(url);
    match Url::parse(url) {
        Ok(parsed) => decode_spaces(strip_signing_params(&parsed).as_str()),
        Err(_) => decode_spaces(url.split('?').next().unwrap_or(url)),
    }
}

/// Query keys that look like new signing parameters the upstream introduced.
///
/// A key is suspicious when it is not known and either contains an uppercase
/// letter or is longer than 10 characters.
pub fn unknown_signature_params(url: &str) -> Vec<String> {
    let Ok(parsed) = Url::parse(url) else {
        return Vec::new();
    };
    let mut found: Vec<String> = Vec::new();
    for (key, _) in parsed.query_pairs() {
        let lower = key.to_ascii_lowercase();
        if KNOWN_PARAMS.contains(&lower.as_str()) {
            continue;
        }
        let suspicious = key.chars().any(|c| c.is_ascii_uppercase()) || key.chars().count() > 10;
        if suspicious && !found.iter().any(|k| k == key.as_ref()) {
            found.push(key.into_owned());
        }
    }
    found
}
