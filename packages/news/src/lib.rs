#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! News headline retrieval and normalization.
//!
//! [`client::FeedClient`] fetches a keyword-scoped RSS feed;
//! [`parser::parse_feed`] extracts a bounded, ordered list of [`FeedItem`]s
//! from the raw markup. Every failure here is recoverable: the statistics
//! half of the system keeps serving when headlines are unavailable.

pub mod client;
pub mod parser;

use serde::{Deserialize, Serialize};

/// Errors that can occur while fetching or parsing the news feed.
#[derive(Debug, thiserror::Error)]
pub enum NewsError {
    /// The feed host could not be reached.
    #[error("network unavailable: {0}")]
    NetworkUnavailable(String),

    /// The feed endpoint answered with a non-success status.
    #[error("feed endpoint returned HTTP {0}")]
    HttpError(u16),

    /// The request exceeded the configured timeout.
    #[error("feed request timed out")]
    Timeout,

    /// The document cannot be parsed as feed markup at all.
    #[error("malformed feed: {0}")]
    MalformedFeed(String),
}

impl From<reqwest::Error> for NewsError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            return Self::Timeout;
        }
        if let Some(status) = e.status() {
            return Self::HttpError(status.as_u16());
        }
        Self::NetworkUnavailable(e.to_string())
    }
}

/// One normalized headline record extracted from the feed.
///
/// Constructed fresh on every parse, never cached or persisted. Ordering
/// among items is feed-provided (assumed reverse-chronological) and
/// preserved as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedItem {
    /// Headline text.
    pub title: String,
    /// Publish timestamp exactly as the feed provided it, never reparsed.
    pub published_at: String,
    /// Link to the article.
    pub url: String,
    /// Name of the publishing outlet.
    pub source_name: String,
    /// The outlet's site URL, from the source element's `url` attribute.
    pub source_url: String,
}
