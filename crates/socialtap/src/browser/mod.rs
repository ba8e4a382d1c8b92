//! Browser capabilities consumed by the engine.
//!
//! Defines the `ContextFactory`, `ContextController` and `PageController`
//! traits that abstract over the browser engine (Chromium via chromiumoxide
//! in production, a scripted stand-in in tests).

pub mod chromium;
pub mod storage_state;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::ScrapeResult;
use crate::intercept::{RouteHandle, RouteId, RouteRule};
use crate::types::Platform;

/// When a navigation counts as finished.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WaitPolicy {
    #[default]
    DomContentLoaded,
    Load,
}

/// Creates isolated browsing contexts.
#[async_trait]
pub trait ContextFactory: Send + Sync {
    /// Create a fresh context with no routes installed, carrying the stored
    /// session of `platform`.
    async fn create(&self, platform: Platform) -> ScrapeResult<Box<dyn ContextController>>;
    /// Number of contexts currently open.
    fn active_contexts(&self) -> usize;
}

/// An isolated browsing context (own cookies, own routes).
#[async_trait]
pub trait ContextController: Send + Sync {
    /// Install an interception rule. Responses to matching requests are
    /// delivered on the returned handle until the rule is removed.
    async fn route(&self, rule: RouteRule) -> ScrapeResult<RouteHandle>;
    /// Remove a rule; its handle sees end of stream.
    async fn unroute(&self, id: RouteId) -> ScrapeResult<()>;
    /// Open a page inside this context.
    async fn new_page(&self) -> ScrapeResult<Box<dyn PageController>>;
    /// Close the context and every page in it.
    async fn close(self: Box<Self>) -> ScrapeResult<()>;
}

/// A single page.
#[async_trait]
pub trait PageController: Send + Sync {
    async fn navigate(&mut self, url: &str, wait: WaitPolicy) -> ScrapeResult<()>;
    /// Evaluate a script in the page and return its JSON value.
    async fn evaluate(&self, script: &str) -> ScrapeResult<Value>;
    async fn close(self: Box<Self>) -> ScrapeResult<()>;
}
