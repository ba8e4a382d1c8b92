//! Extraction orchestrator.
//!
//! `scrape` classifies the URL, resolves the handler from the dispatch table,
//! takes a context from the pool and runs the handler inside one deadline and
//! cancellation scope. Errors always propagate to the caller.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;
use tracing::{info, info_span, warn, Instrument};

use crate::browser::chromium::ChromiumBrowser;
use crate::browser::ContextFactory;
use crate::budget::CallBudget;
use crate::config::EngineConfig;
use crate::error::{ScrapeError, ScrapeResult};
use crate::model::ScrapeOutput;
use crate::platform::Handler;
use crate::pool::ContextPool;
use crate::router::classify;
use crate::session::Session;
use crate::types::{Action, Platform, TargetRef};

/// Upper bound on closing a page or context once a call has finished.
pub const CLEANUP_GRACE: Duration = Duration::from_secs(5);

pub struct Scraper {
    pool: ContextPool,
    settle_delay: Duration,
    deadline: Duration,
    cleanup_grace: Duration,
}

impl Scraper {
    pub fn new(pool: ContextPool, settle_delay: Duration, deadline: Duration) -> Self {
        Self {
            pool,
            settle_delay,
            deadline,
            cleanup_grace: CLEANUP_GRACE,
        }
    }

    pub fn with_cleanup_grace(mut self, grace: Duration) -> Self {
        self.cleanup_grace = grace;
        self
    }

    /// Build on any context factory with the timings of `config`.
    pub fn with_factory(factory: Arc<dyn ContextFactory>, config: &EngineConfig) -> Self {
        Self::new(
            ContextPool::new(factory, config.pool_size),
            config.settle_delay,
            config.deadline,
        )
    }

    /// Launch Chromium and build a scraper on it.
    pub async fn launch(config: &EngineConfig) -> ScrapeResult<Self> {
        let browser = ChromiumBrowser::launch(config).await?;
        Ok(Self::with_factory(Arc::new(browser), config))
    }

    pub fn pool(&self) -> &ContextPool {
        &self.pool
    }

    /// Classify and validate a request without touching the browser.
    pub fn target(
        platform: Platform,
        url: &str,
        action: Action,
        target_identity: Option<&str>,
    ) -> ScrapeResult<TargetRef> {
        let url = url.trim();
        let kind = classify(platform, url)?;
        let target = TargetRef {
            platform,
            url: url.to_string(),
            kind,
            action,
            target_identity: target_identity
                .map(str::trim)
                .filter(|t| !t.trim_start_matches('@').is_empty())
                .map(String::from),
        };
        if action.needs_target_identity() && target.target_identity.is_none() {
            return Err(ScrapeError::TargetIdentityRequired(action));
        }
        Ok(target)
    }

    pub async fn scrape(
        &self,
        platform: Platform,
        url: &str,
        action: Action,
        target_identity: Option<&str>,
    ) -> ScrapeResult<ScrapeOutput> {
        self.scrape_with_cancel(platform, url, action, target_identity, CancellationToken::new())
            .await
    }

    /// As [`Scraper::scrape`], stopping early when `cancel` fires.
    pub async fn scrape_with_cancel(
        &self,
        platform: Platform,
        url: &str,
        action: Action,
        target_identity: Option<&str>,
        cancel: CancellationToken,
    ) -> ScrapeResult<ScrapeOutput> {
        let target = Self::target(platform, url, action, target_identity)?;
        let handler = Handler::for_target(&target)?;
        let span = info_span!("scrape", %platform, %action, kind = %target.kind, url = %target.url);
        self.execute(handler, target, cancel).instrument(span).await
    }

    async fn execute(
        &self,
        handler: Handler,
        target: TargetRef,
        cancel: CancellationToken,
    ) -> ScrapeResult<ScrapeOutput> {
        let started = Instant::now();
        let budget = CallBudget::new(self.deadline, cancel);
        let pooled = self.pool.acquire(target.platform, &budget).await?;

        let result = async {
            let mut session = Session::open(pooled.context(), &budget, self.settle_delay).await?;
            let output = handler.run(&mut session, &target).await;
            bounded_cleanup("page close", self.cleanup_grace, session.close()).await;
            output
        }
        .await;

        bounded_cleanup("context release", self.cleanup_grace, pooled.release()).await;

        let elapsed_ms = started.elapsed().as_millis() as u64;
        match &result {
            Ok(_) => info!(elapsed_ms, ?handler, "scrape completed"),
            Err(e) => info!(elapsed_ms, code = e.code(), "scrape failed: {e}"),
        }
        result
    }
}

/// Run a teardown step for at most `grace`; failures are logged, never returned.
async fn bounded_cleanup<F>(step: &str, grace: Duration, cleanup: F)
where
    F: Future<Output = ScrapeResult<()>>,
{
    match tokio::time::timeout(grace, cleanup).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!("{step} failed: {e}"),
        Err(_) => warn!(grace_ms = grace.as_millis() as u64, "{step} timed out"),
    }
}
