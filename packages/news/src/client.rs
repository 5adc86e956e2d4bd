//! Keyword-scoped feed fetching.
//!
//! Performs a single HTTP GET against the feed endpoint and returns the
//! raw response body. No retry is performed at this layer; a caller
//! wanting resilience wraps [`FeedClient::fetch`] in its own
//! retry-with-backoff.

use std::time::Duration;

use crate::NewsError;

/// Default feed endpoint (Google News RSS search).
pub const DEFAULT_ENDPOINT: &str = "https://news.google.com/rss/search";

/// Per-request timeout. Without one, an unresponsive feed host would hang
/// the calling handler indefinitely.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Locale parameters embedded into every feed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedLocale {
    /// Interface language (`hl`).
    pub language: String,
    /// Geographic edition (`gl`).
    pub country: String,
    /// Combined edition id (`ceid`).
    pub edition: String,
}

impl Default for FeedLocale {
    /// The Mexican Spanish edition the reference deployment targets.
    fn default() -> Self {
        Self {
            language: "es-419".to_owned(),
            country: "MX".to_owned(),
            edition: "MX:es".to_owned(),
        }
    }
}

/// Client for the keyword-scoped news feed.
///
/// Holds only an HTTP client and immutable configuration; concurrent
/// `fetch` calls share no mutable state.
#[derive(Debug, Clone)]
pub struct FeedClient {
    client: reqwest::Client,
    endpoint: String,
    locale: FeedLocale,
}

impl FeedClient {
    /// Creates a client against [`DEFAULT_ENDPOINT`] with the default
    /// locale and an explicit request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`NewsError`] if the underlying HTTP client cannot be
    /// constructed.
    pub fn new() -> Result<Self, NewsError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            endpoint: DEFAULT_ENDPOINT.to_owned(),
            locale: FeedLocale::default(),
        })
    }

    /// Overrides the feed endpoint URL.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: &str) -> Self {
        endpoint.clone_into(&mut self.endpoint);
        self
    }

    /// Overrides the locale parameters.
    #[must_use]
    pub fn with_locale(mut self, locale: FeedLocale) -> Self {
        self.locale = locale;
        self
    }

    /// Returns the configured endpoint URL.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Fetches the raw feed for a keyword query. Exactly one attempt; the
    /// keyword is percent-encoded into the query string by the request
    /// builder.
    ///
    /// # Errors
    ///
    /// Returns [`NewsError::NetworkUnavailable`] when the host cannot be
    /// reached, [`NewsError::Timeout`] when the request exceeds the
    /// timeout, [`NewsError::HttpError`] on a non-success status.
    pub async fn fetch(&self, query: &str) -> Result<Vec<u8>, NewsError> {
        log::debug!("fetching feed for query '{query}'");

        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("q", query),
                ("hl", self.locale.language.as_str()),
                ("gl", self.locale.country.as_str()),
                ("ceid", self.locale.edition.as_str()),
            ])
            .send()
            .await?
            .error_for_status()?;

        let bytes = response.bytes().await?;
        log::debug!("feed response: {} bytes", bytes.len());

        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_locale_targets_mexican_spanish_edition() {
        let locale = FeedLocale::default();
        assert_eq!(locale.language, "es-419");
        assert_eq!(locale.country, "MX");
        assert_eq!(locale.edition, "MX:es");
    }

    #[test]
    fn endpoint_override_applies() {
        let client = FeedClient::new()
            .unwrap()
            .with_endpoint("http://localhost:8080/rss");
        assert_eq!(client.endpoint(), "http://localhost:8080/rss");
    }

    #[tokio::test]
    async fn unreachable_host_is_network_unavailable() {
        // Nothing listens on this port; the connection is refused
        // immediately rather than timing out.
        let client = FeedClient::new()
            .unwrap()
            .with_endpoint("http://127.0.0.1:9/rss");

        let err = client.fetch("robo de camiones").await.unwrap_err();
        assert!(
            matches!(err, NewsError::NetworkUnavailable(_)),
            "expected NetworkUnavailable, got {err:?}"
        );
    }
}
