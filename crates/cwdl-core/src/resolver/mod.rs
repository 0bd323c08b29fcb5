//! URL resolution pipeline.
//!
//! viewer link -> `ssl` rewrite -> redirect probe -> embedded-link extraction
//! -> signature stripping -> filename derivation. Every call is independent;
//! nothing is cached and nothing is retried here.

use serde::Serialize;
use url::Url;

use crate::error::{Error, Result};
use crate::extract::Extractor;
use crate::http::HttpOptions;
use crate::probe::{CurlProbe, Probe};
use crate::url_model::{
    default_filename, derive_filename, is_final_link, is_intermediate_link, office_preview_source,
    rewrite_ssl_flag, strip_signature, unknown_signature_params,
};

/// Direct download location plus the name to save it under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedLink {
    pub url: String,
    pub filename: String,
    /// The redirect target matched no extraction strategy and was kept as-is.
    pub unresolved: bool,
    /// Query keys that look like signing parameters we do not know about.
    pub warnings: Vec<String>,
}

/// Resolved URL before a filename has been attached.
struct ResolvedUrl {
    url: String,
    unresolved: bool,
    warnings: Vec<String>,
}

/// Turns viewer links into direct download links.
pub struct Resolver<P = CurlProbe> {
    probe: P,
    extractor: Extractor,
}

impl Resolver<CurlProbe> {
    /// Resolver probing over libcurl with the given request options.
    pub fn with_http_options(options: HttpOptions) -> Self {
        Self::new(CurlProbe::new(options))
    }
}

impl<P: Probe> Resolver<P> {
    pub fn new(probe: P) -> Self {
        Self::with_extractor(probe, Extractor::default())
    }

    pub fn with_extractor(probe: P, extractor: Extractor) -> Self {
        Self { probe, extractor }
    }

    /// Resolves `raw_url` into a direct URL and a sanitized filename.
    pub async fn resolve(&self, raw_url: &str) -> Result<ResolvedLink> {
        let source = validate_input(raw_url)?;
        let resolved = self.resolve_url(&source).await?;
        let filename = derive_filename(&resolved.url, &source)?;
        Ok(finish(resolved, filename))
    }

    /// Like [`resolve`](Self::resolve), but an underivable filename is
    /// replaced by a generated `courseware_<ms>.pptx`.
    pub async fn resolve_or_default(&self, raw_url: &str) -> Result<ResolvedLink> {
        let source = validate_input(raw_url)?;
        let resolved = self.resolve_url(&source).await?;
        let filename = match derive_filename(&resolved.url, &source) {
            Ok(name) => name,
            Err(Error::EmptyFilename) => {
                let name = default_filename();
                tracing::debug!(url = %resolved.url, filename = %name, "using generated filename");
                name
            }
            Err(e) => return Err(e),
        };
        Ok(finish(resolved, filename))
    }

    async fn resolve_url(&self, source: &str) -> Result<ResolvedUrl> {
        let target = match office_preview_source(source) {
            Some(inner) => {
                tracing::debug!(preview = source, src = %inner, "unwrapped office preview link");
                inner
            }
            None => source.to_string(),
        };

        let rewritten = rewrite_ssl_flag(&target);
        if !is_intermediate_link(&rewritten) {
            tracing::debug!(url = %rewritten, "probe target is not an intermediate viewer link");
        }

        let response = self.probe.probe(&rewritten).await?;
        let extraction = if response.is_redirect() {
            let location = response.location.ok_or(Error::MissingLocationHeader)?;
            self.extractor.extract(&location)
        } else if response.status == 200 {
            let extraction = self.extractor.extract(&response.body);
            if !extraction.is_resolved() {
                return Err(Error::NoExtractableUrl);
            }
            extraction
        } else {
            return Err(Error::UnexpectedUpstreamStatus(response.status));
        };

        let unresolved = !extraction.is_resolved();
        let url = strip_signature(&extraction.url);
        let warnings = if is_final_link(&url) {
            Vec::new()
        } else {
            unknown_signature_params(&url)
        };
        if !warnings.is_empty() {
            tracing::warn!(url = %url, params = ?warnings, "unrecognised signature-like query parameters");
        }
        tracing::debug!(url = %url, unresolved, "resolved download url");

        Ok(ResolvedUrl { url, unresolved, warnings })
    }
}

fn finish(resolved: ResolvedUrl, filename: String) -> ResolvedLink {
    ResolvedLink {
        url: resolved.url,
        filename,
        unresolved: resolved.unresolved,
        warnings: resolved.warnings,
    }
}

/// Trims `raw` and checks it is an absolute http(s) URL.
fn validate_input(raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidInput("empty url".into()));
    }
    let parsed =
        Url::parse(trimmed).map_err(|e| Error::InvalidInput(format!("{}: {}", trimmed, e)))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(Error::InvalidInput(format!("unsupported scheme: {}", parsed.scheme())));
    }
    Ok(trimmed.to_string())
}
