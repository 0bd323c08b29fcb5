//! Request options shared by the redirect probe and the curl downloader.

use std::time::Duration;

/// Ambient request settings applied to every curl handle we create.
#[derive(Debug, Clone, Default)]
pub struct HttpOptions {
    /// Cookie string sent as-is (the session the viewer page was loaded with).
    pub cookie: Option<String>,
    /// User-Agent override.
    pub user_agent: Option<String>,
    /// Overall transfer deadline; None leaves libcurl's default (no deadline).
    pub timeout: Option<Duration>,
}

impl HttpOptions {
    /// Applies options plus `extra_headers` ("Name: value") to a curl handle.
    pub(crate) fn apply(
        &self,
        easy: &mut curl::easy::Easy,
        extra_headers: &[&str],
    ) -> Result<(), curl::Error> {
        if let Some(cookie) = &self.cookie {
            easy.cookie(cookie)?;
        }
        if let Some(agent) = &self.user_agent {
            easy.useragent(agent)?;
        }
        if let Some(timeout) = self.timeout {
            easy.timeout(timeout)?;
        }
        if !extra_headers.is_empty() {
            let mut list = curl::easy::List::new();
            for header in extra_headers {
                list.append(header)?;
            }
            easy.http_headers(list)?;
        }
        Ok(())
    }
}
