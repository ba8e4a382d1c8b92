//! The extraction capability the transports call into.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use socialtap::{ScrapeOutput, ScrapeResult, Scraper};

use crate::validate::ValidatedRequest;

#[async_trait]
pub trait ScrapeBackend: Send + Sync {
    async fn scrape(
        &self,
        request: &ValidatedRequest,
        cancel: CancellationToken,
    ) -> ScrapeResult<ScrapeOutput>;

    /// `(available, capacity)` of the context pool, when there is one.
    fn pool_status(&self) -> Option<(usize, usize)> {
        None
    }
}

#[async_trait]
impl ScrapeBackend for Scraper {
    async fn scrape(
        &self,
        request: &ValidatedRequest,
        cancel: CancellationToken,
    ) -> ScrapeResult<ScrapeOutput> {
        self.scrape_with_cancel(
            request.platform,
            &request.url,
            request.action,
            request.user_target.as_deref(),
            cancel,
        )
        .await
    }

    fn pool_status(&self) -> Option<(usize, usize)> {
        Some((self.pool().available(), self.pool().capacity()))
    }
}
