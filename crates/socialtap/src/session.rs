//! One call's page inside its pooled context.

use std::time::Duration;

use serde_json::Value;
use tracing::debug;

use crate::browser::{ContextController, PageController, WaitPolicy};
use crate::budget::CallBudget;
use crate::error::ScrapeResult;
use crate::intercept::{QueryRewrite, RawDocument, RequestRewriter, ResponseCapture, RouteHandle};

/// Page, context and budget of a single extraction call.
///
/// Every awaited browser step goes through the call budget. Routes must be
/// installed before the [`Session::visit`] that triggers them.
pub struct Session<'a> {
    context: &'a dyn ContextController,
    page: Box<dyn PageController>,
    budget: &'a CallBudget,
    settle: Duration,
}

impl<'a> Session<'a> {
    pub async fn open(
        context: &'a dyn ContextController,
        budget: &'a CallBudget,
        settle: Duration,
    ) -> ScrapeResult<Self> {
        let page = budget.run(context.new_page()).await?;
        Ok(Self {
            context,
            page,
            budget,
            settle,
        })
    }

    pub fn budget(&self) -> &CallBudget {
        self.budget
    }

    /// Navigate until DOM content is loaded, then wait the settle delay so the
    /// front-end can issue its API calls.
    pub async fn visit(&mut self, url: &str) -> ScrapeResult<()> {
        debug!(url, "visiting");
        let page = &mut self.page;
        self.budget
            .run(page.navigate(url, WaitPolicy::DomContentLoaded))
            .await?;
        self.budget.sleep(self.settle).await
    }

    pub async fn evaluate(&self, script: &str) -> ScrapeResult<Value> {
        self.budget.run(self.page.evaluate(script)).await
    }

    /// Rewrite-and-capture route for `glob`.
    pub async fn rewrite(&self, glob: &str, rewrite: QueryRewrite) -> ScrapeResult<RouteHandle> {
        self.budget
            .run(RequestRewriter::install(self.context, glob, rewrite))
            .await
    }

    /// Capture-only route for `glob`.
    pub async fn capture(&self, glob: &str) -> ScrapeResult<RouteHandle> {
        self.budget
            .run(ResponseCapture::install(self.context, glob))
            .await
    }

    pub async fn await_json(&self, handle: &mut RouteHandle) -> ScrapeResult<RawDocument> {
        ResponseCapture::await_json(handle, self.budget).await
    }

    /// Remove a route once its response is in.
    pub async fn drop_route(&self, handle: RouteHandle) -> ScrapeResult<()> {
        self.budget.run(self.context.unroute(handle.id)).await
    }

    pub async fn close(self) -> ScrapeResult<()> {
        self.page.close().await
    }
}
