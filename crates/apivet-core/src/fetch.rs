//! External reference prefetch
//!
//! Before resolution, every external document reachable through `$ref`s is
//! fetched and parsed into the run's [`DocumentSet`]. Fetching happens in
//! waves: each wave fetches the locations referenced by the documents loaded
//! so far, concurrently, until no new location appears. The set is the cache,
//! so each location is fetched at most once per run.

use crate::error::{PipelineError, PipelineResult};
use apivet_schemas::{Document, DocumentParser, DocumentSet, Format, LoaderError, LoaderResult};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{debug, instrument, warn};
use url::Url;

/// Where external documents come from
#[async_trait]
pub trait ExternalSource: Send + Sync {
    /// Fetch the text at `location`
    async fn fetch(&self, location: &Url) -> LoaderResult<String>;
}

/// Limit on a whole HTTP request for one external document
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Reads `file:` URLs from disk and `http(s):` URLs over the network
#[derive(Debug, Clone)]
pub struct DefaultSource {
    client: reqwest::Client,
    timeout: Option<Duration>,
}

impl DefaultSource {
    /// HTTP requests give up after [`DEFAULT_TIMEOUT`]
    pub fn new() -> Self {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    /// Use a request timeout; falls back to a plain client if the builder fails
    pub fn with_timeout(timeout: Duration) -> Self {
        match reqwest::Client::builder().timeout(timeout).build() {
            Ok(client) => Self {
                client,
                timeout: Some(timeout),
            },
            Err(err) => {
                warn!(error = %err, "HTTP client without request timeout");
                Self::with_client(reqwest::Client::new())
            }
        }
    }

    /// Use a preconfigured client as is
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client, timeout: None }
    }

    /// Request timeout, when this source set one
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }
}

impl Default for DefaultSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ExternalSource for DefaultSource {
    async fn fetch(&self, location: &Url) -> LoaderResult<String> {
        match location.scheme() {
            "file" => {
                let path = location
                    .to_file_path()
                    .map_err(|_| LoaderError::invalid_location(location.as_str(), "not a local file path"))?;
                tokio::fs::read_to_string(&path)
                    .await
                    .map_err(|e| LoaderError::io_error(path.display().to_string(), e))
            }
            "http" | "https" => {
                let response = self
                    .client
                    .get(location.clone())
                    .send()
                    .await
                    .and_then(|response| response.error_for_status())
                    .map_err(|e| LoaderError::fetch_error(location.as_str(), e.to_string()))?;
                response
                    .text()
                    .await
                    .map_err(|e| LoaderError::fetch_error(location.as_str(), e.to_string()))
            }
            scheme => Err(LoaderError::fetch_error(
                location.as_str(),
                format!("unsupported scheme '{}'", scheme),
            )),
        }
    }
}

/// Parse fetched text, by extension when the URL has a known one
pub fn parse_external(text: &str, location: &Url) -> LoaderResult<Document> {
    let parser = DocumentParser::new();
    match Format::from_url(location) {
        Some(format) => parser.parse_content(text, format, Some(location.clone())),
        None => parser
            .parse_with_fallback(text, Some(location.clone()))
            .map(|(document, _)| document),
    }
}

/// Load every external document reachable from `set`
///
/// Returns the number of documents fetched. The first failure, in reference
/// order, is returned as an input error; the remaining fetches are aborted.
#[instrument(skip_all)]
pub async fn prefetch(set: &mut DocumentSet, source: Arc<dyn ExternalSource>) -> PipelineResult<usize> {
    let mut fetched = 0;
    let mut wave = 0;

    loop {
        let pending = set.pending_locations();
        if pending.is_empty() {
            break;
        }
        wave += 1;
        debug!(wave, locations = pending.len(), "fetching external documents");

        let mut tasks = JoinSet::new();
        for (slot, location) in pending.iter().cloned().enumerate() {
            let source = Arc::clone(&source);
            tasks.spawn(async move {
                let result = match source.fetch(&location).await {
                    Ok(text) => parse_external(&text, &location),
                    Err(err) => Err(err),
                };
                (slot, result)
            });
        }

        let mut results: Vec<Option<LoaderResult<Document>>> = pending.iter().map(|_| None).collect();
        while let Some(joined) = tasks.join_next().await {
            let (slot, result) = joined?;
            results[slot] = Some(result);
        }

        for (location, result) in pending.iter().zip(results) {
            let document = result
                .ok_or_else(|| PipelineError::task(format!("no result for '{}'", location)))??;
            set.insert_external(location, document);
            fetched += 1;
        }
    }

    Ok(fetched)
}
