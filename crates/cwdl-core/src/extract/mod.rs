//! Embedded-link extraction.
//!
//! Redirect targets and viewer response bodies carry the real document URL in
//! a handful of shapes. [`Extractor`] tries an ordered list of [`Strategy`]
//! values and returns the first hit; the list is plain data, so supporting a
//! new shape means adding a variant and a list entry.

mod strategy;

pub use strategy::{oss_marker_candidate, Strategy};

use crate::url_model::decode_spaces;

/// Result of running the extractor over a piece of text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    pub url: String,
    /// Strategy that matched; `None` means the input came back unchanged.
    pub strategy: Option<Strategy>,
}

impl Extraction {
    pub fn is_resolved(&self) -> bool {
        self.strategy.is_some()
    }
}

/// Ordered extraction strategies, first match wins.
#[derive(Debug, Clone)]
pub struct Extractor {
    strategies: Vec<Strategy>,
}

impl Default for Extractor {
    fn default() -> Self {
        Self::with_strategies(vec![
            Strategy::OssMarker,
            Strategy::CanonicalResource,
            Strategy::ShortResource,
            Strategy::SignedAbsolute,
            Strategy::AnyHttp,
        ])
    }
}

impl Extractor {
    pub fn with_strategies(strategies: Vec<Strategy>) -> Self {
        Self { strategies }
    }

    pub fn strategies(&self) -> &[Strategy] {
        &self.strategies
    }

    /// Runs the strategies over `text` in order.
    pub fn extract(&self, text: &str) -> Extraction {
        for strategy in &self.strategies {
            if let Some(found) = strategy.extract(text) {
                tracing::debug!(strategy = strategy.name(), "extracted candidate url");
                return Extraction {
                    url: decode_spaces(&found),
                    strategy: Some(*strategy),
                };
            }
        }
        Extraction {
            url: text.to_string(),
            strategy: None,
        }
    }
}
