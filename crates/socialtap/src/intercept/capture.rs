//! Response capture: correlate an installed route with its JSON response.

use serde_json::Value;
use tracing::{debug, warn};

use super::{CapturedResponse, RouteHandle, RouteRule};
use crate::browser::ContextController;
use crate::budget::CallBudget;
use crate::error::{ScrapeError, ScrapeResult};
use crate::normalize::{first_of, first_text, lookup, Path};

/// How a call site treats missing structure in a captured document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapturePolicy {
    /// Absent required structure aborts the call with `MissingData`.
    Strict,
    /// Absent structure resolves to `None`; the call site must gate the
    /// result with [`has_minimal_data`].
    Lenient,
}

/// A parsed response body.
#[derive(Debug, Clone)]
pub struct RawDocument {
    source: String,
    root: Value,
}

impl RawDocument {
    pub fn new(source: impl Into<String>, root: Value) -> Self {
        Self {
            source: source.into(),
            root,
        }
    }

    pub fn parse(response: &CapturedResponse) -> ScrapeResult<Self> {
        let root = serde_json::from_str(&response.body)?;
        Ok(Self::new(response.url.clone(), root))
    }

    pub fn root(&self) -> &Value {
        &self.root
    }

    /// URL the document was captured from.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Resolve `path` under `policy`.
    pub fn locate(&self, path: Path<'_>, policy: CapturePolicy) -> ScrapeResult<Option<&Value>> {
        match (lookup(&self.root, path), policy) {
            (Some(v), _) => Ok(Some(v)),
            (None, CapturePolicy::Lenient) => Ok(None),
            (None, CapturePolicy::Strict) => Err(self.missing(path)),
        }
    }

    /// Strict lookup.
    pub fn require(&self, path: Path<'_>) -> ScrapeResult<&Value> {
        lookup(&self.root, path).ok_or_else(|| self.missing(path))
    }

    fn missing(&self, path: Path<'_>) -> ScrapeError {
        let url = self.source.split('?').next().unwrap_or(&self.source);
        ScrapeError::MissingData(format!("`{}` absent from {url}", path.join(".")))
    }
}

/// Paths that carry the main text of a record.
const TEXT_PATHS: &[Path<'static>] = &[&["legacy", "full_text"], &["desc"]];

/// Paths of counters; any one present counts as a defined metric.
const METRIC_PATHS: &[Path<'static>] = &[
    &["legacy", "reply_count"],
    &["legacy", "favorite_count"],
    &["legacy", "retweet_count"],
    &["legacy", "quote_count"],
    &["legacy", "bookmark_count"],
    &["views", "count"],
    &["stats", "diggCount"],
    &["stats", "playCount"],
];

/// Paths of the author handle.
const HANDLE_PATHS: &[Path<'static>] = &[
    &["core", "user_results", "result", "legacy", "screen_name"],
    &["core", "user_results", "result", "core", "screen_name"],
    &["author", "uniqueId"],
];

/// Whether a leniently captured record carries anything worth returning:
/// non-empty text, a defined metric, or a non-empty author handle.
pub fn has_minimal_data(record: &Value) -> bool {
    first_text(record, TEXT_PATHS).is_some()
        || first_of(record, METRIC_PATHS).is_some()
        || first_text(record, HANDLE_PATHS).is_some()
}

/// Installs capture-only routes and awaits their JSON responses.
pub struct ResponseCapture;

impl ResponseCapture {
    /// Capture GET responses matching `glob` without altering the requests.
    pub async fn install(context: &dyn ContextController, glob: &str) -> ScrapeResult<RouteHandle> {
        debug!(pattern = glob, "installing response capture");
        context.route(RouteRule::new(glob).method("GET")).await
    }

    /// First successful JSON response on `handle`.
    ///
    /// Non-2xx responses and unparsable bodies are skipped; the budget bounds
    /// how long the wait can last.
    pub async fn await_json(
        handle: &mut RouteHandle,
        budget: &CallBudget,
    ) -> ScrapeResult<RawDocument> {
        let pattern = handle.pattern.as_str().to_string();
        budget
            .run(async {
                loop {
                    let response = handle.recv().await.ok_or_else(|| {
                        ScrapeError::Extraction(format!(
                            "route {pattern} closed before a response was captured"
                        ))
                    })?;
                    if !(200..300).contains(&response.status) {
                        warn!(status = response.status, url = %response.url, "skipping non-success capture");
                        continue;
                    }
                    match RawDocument::parse(&response) {
                        Ok(doc) => {
                            debug!(url = %response.url, bytes = response.body.len(), "captured response");
                            return Ok(doc);
                        }
                        Err(e) => {
                            warn!(url = %response.url, "unparsable capture body: {e}");
                        }
                    }
                }
            })
            .await
    }
}
