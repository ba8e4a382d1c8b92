//! Outgoing request rewriting.
//!
//! X GraphQL calls carry their arguments as a JSON document in the
//! `variables` query parameter. A [`QueryRewrite`] decodes that parameter,
//! mutates it and re-encodes it before the request leaves the browser.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;
use url::Url;

use super::{RouteHandle, RouteRule};
use crate::browser::ContextController;
use crate::error::ScrapeResult;

type Mutator = dyn Fn(&mut Value) + Send + Sync;

/// Mutation of one JSON-encoded query parameter.
#[derive(Clone)]
pub struct QueryRewrite {
    param: String,
    mutate: Arc<Mutator>,
}

impl QueryRewrite {
    pub fn new(param: &str, mutate: impl Fn(&mut Value) + Send + Sync + 'static) -> Self {
        Self {
            param: param.to_string(),
            mutate: Arc::new(mutate),
        }
    }

    /// Force `field` of the decoded object to `value`, whatever it held.
    pub fn force_field(param: &str, field: &str, value: Value) -> Self {
        let field = field.to_string();
        Self::new(param, move |doc| {
            if let Some(obj) = doc.as_object_mut() {
                obj.insert(field.clone(), value.clone());
            }
        })
    }

    /// Newest-first ordering for X conversation threads.
    pub fn recency_ranking() -> Self {
        Self::force_field("variables", "rankingMode", Value::from("Recency"))
    }

    pub fn param(&self) -> &str {
        &self.param
    }

    /// Rewritten URL, or `None` when the parameter is absent or not JSON.
    pub fn apply(&self, url: &str) -> Option<String> {
        let mut parsed = Url::parse(url).ok()?;
        let raw = parsed
            .query_pairs()
            .find(|(k, _)| k == self.param.as_str())
            .map(|(_, v)| v.into_owned())?;

        let mut doc: Value = serde_json::from_str(&raw).ok()?;
        (self.mutate)(&mut doc);
        let encoded = serde_json::to_string(&doc).ok()?;

        let pairs: Vec<(String, String)> = parsed
            .query_pairs()
            .map(|(k, v)| {
                if k == self.param.as_str() {
                    (k.into_owned(), encoded.clone())
                } else {
                    (k.into_owned(), v.into_owned())
                }
            })
            .collect();
        parsed.query_pairs_mut().clear().extend_pairs(pairs);
        Some(parsed.to_string())
    }
}

impl fmt::Debug for QueryRewrite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryRewrite")
            .field("param", &self.param)
            .finish_non_exhaustive()
    }
}

/// Installs rewriting routes on a browsing context.
pub struct RequestRewriter;

impl RequestRewriter {
    /// Rewrite every GET matching `glob` for the lifetime of the context.
    ///
    /// Must run before the navigation that triggers the call. The returned
    /// handle also receives the responses to the rewritten requests.
    pub async fn install(
        context: &dyn ContextController,
        glob: &str,
        rewrite: QueryRewrite,
    ) -> ScrapeResult<RouteHandle> {
        debug!(pattern = glob, param = rewrite.param(), "installing request rewrite");
        context
            .route(RouteRule::new(glob).method("GET").rewrite(rewrite))
            .await
    }
}
