//! Error taxonomy shared by the resolver and the download queue.

/// Errors surfaced by the core.
///
/// Resolver failures are returned to the caller immediately. Queue failures
/// (`DownloadRejected`) are retried by the engine and end up as task state,
/// they never cross the queue's public operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Missing or malformed URL/filename at a public boundary.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Redirect response without a `Location` header.
    #[error("redirect response carried no Location header")]
    MissingLocationHeader,

    /// Probe returned a status that is neither a redirect nor 200.
    #[error("unexpected upstream status {0}")]
    UnexpectedUpstreamStatus(u32),

    /// 200 response whose body contained no recognisable link.
    #[error("no extractable download URL in upstream response")]
    NoExtractableUrl,

    /// Transport-level failure during the redirect probe.
    #[error("network failure: {0}")]
    NetworkFailure(String),

    /// Filename derivation produced nothing usable.
    #[error("could not derive a filename")]
    EmptyFilename,

    /// The native download primitive rejected or failed a download.
    #[error("download rejected: {0}")]
    DownloadRejected(String),

    /// The queue engine is no longer running.
    #[error("download queue engine has stopped")]
    EngineStopped,
}

impl Error {
    /// True for failures the queue retries on its own.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::DownloadRejected(_))
    }
}

impl From<curl::Error> for Error {
    fn from(e: curl::Error) -> Self {
        Error::NetworkFailure(e.to_string())
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
