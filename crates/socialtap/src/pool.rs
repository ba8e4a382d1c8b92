//! Bounded pool of browsing contexts.
//!
//! The pool is admission control: at most `capacity` contexts are open at
//! once. Contexts are never reused; each call gets a fresh one and closes it
//! on release.

use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, warn};

use crate::browser::{ContextController, ContextFactory};
use crate::budget::CallBudget;
use crate::error::{ScrapeError, ScrapeResult};
use crate::types::Platform;

pub struct ContextPool {
    factory: Arc<dyn ContextFactory>,
    permits: Arc<Semaphore>,
    capacity: usize,
}

impl ContextPool {
    pub fn new(factory: Arc<dyn ContextFactory>, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            factory,
            permits: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Slots not currently held by a call.
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    /// Wait for a slot (bounded by `budget`) and open a context in it.
    pub async fn acquire(&self, platform: Platform, budget: &CallBudget) -> ScrapeResult<PooledContext> {
        let permits = Arc::clone(&self.permits);
        let permit = budget
            .run(async move {
                permits
                    .acquire_owned()
                    .await
                    .map_err(|_| ScrapeError::Browser("context pool is closed".into()))
            })
            .await?;
        let context = budget.run(self.factory.create(platform)).await?;
        debug!(%platform, available = self.available(), "context acquired");
        Ok(PooledContext {
            context: Some(context),
            _permit: permit,
        })
    }

    /// Refuse new acquisitions; held contexts are unaffected.
    pub fn close(&self) {
        self.permits.close();
    }
}

/// A context holding one pool slot until released.
pub struct PooledContext {
    context: Option<Box<dyn ContextController>>,
    _permit: OwnedSemaphorePermit,
}

impl PooledContext {
    pub fn context(&self) -> &dyn ContextController {
        match &self.context {
            Some(ctx) => ctx.as_ref(),
            None => unreachable!("context is only taken by release or drop"),
        }
    }

    /// Close the context and free the slot.
    pub async fn release(mut self) -> ScrapeResult<()> {
        match self.context.take() {
            Some(ctx) => ctx.close().await,
            None => Ok(()),
        }
    }
}

impl Drop for PooledContext {
    fn drop(&mut self) {
        // Dropped without release (call aborted mid-flight): close in the
        // background. The slot frees immediately with the permit.
        if let Some(ctx) = self.context.take() {
            match tokio::runtime::Handle::try_current() {
                Ok(rt) => {
                    rt.spawn(async move {
                        if let Err(e) = ctx.close().await {
                            warn!("background context close failed: {e}");
                        }
                    });
                }
                Err(_) => warn!("context dropped outside a runtime; not closed"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::PageController;
    use crate::intercept::{RouteHandle, RouteId, RouteRule};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio_test::assert_ok;
    use tokio_util::sync::CancellationToken;

    #[derive(Default)]
    struct CountingFactory {
        open: Arc<AtomicUsize>,
    }

    struct CountingContext {
        open: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl ContextFactory for CountingFactory {
        async fn create(&self, _platform: Platform) -> ScrapeResult<Box<dyn ContextController>> {
            self.open.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(CountingContext {
                open: Arc::clone(&self.open),
            }))
        }
        fn active_contexts(&self) -> usize {
            self.open.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ContextController for CountingContext {
        async fn route(&self, rule: RouteRule) -> ScrapeResult<RouteHandle> {
            Ok(RouteHandle::channel(&rule).0)
        }
        async fn unroute(&self, _id: RouteId) -> ScrapeResult<()> {
            Ok(())
        }
        async fn new_page(&self) -> ScrapeResult<Box<dyn PageController>> {
            Err(ScrapeError::Browser("no pages".into()))
        }
        async fn close(self: Box<Self>) -> ScrapeResult<()> {
            self.open.fetch_sub(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_acquire_release_frees_slot() {
        let factory = Arc::new(CountingFactory::default());
        let pool = ContextPool::new(factory.clone(), 2);
        let budget = CallBudget::unbounded();

        let a = assert_ok!(pool.acquire(Platform::Twitter, &budget).await);
        let b = assert_ok!(pool.acquire(Platform::Tiktok, &budget).await);
        assert_eq!(pool.available(), 0);
        assert_eq!(factory.active_contexts(), 2);

        assert_ok!(a.release().await);
        assert_eq!(pool.available(), 1);
        assert_eq!(factory.active_contexts(), 1);
        assert_ok!(b.release().await);
        assert_eq!(pool.available(), 2);
    }

    #[tokio::test]
    async fn test_full_pool_waits_until_deadline() {
        let pool = ContextPool::new(Arc::new(CountingFactory::default()), 1);
        let held = assert_ok!(pool.acquire(Platform::Twitter, &CallBudget::unbounded()).await);
        let budget = CallBudget::new(Duration::from_millis(20), CancellationToken::new());
        let err = pool.acquire(Platform::Twitter, &budget).await.err().unwrap();
        assert!(matches!(err, ScrapeError::Timeout(_)));
        assert_ok!(held.release().await);
    }

    #[tokio::test]
    async fn test_dropped_context_closes_in_background() {
        let factory = Arc::new(CountingFactory::default());
        let pool = ContextPool::new(factory.clone(), 1);
        drop(pool.acquire(Platform::Twitter, &CallBudget::unbounded()).await.unwrap());
        assert_eq!(pool.available(), 1);
        for _ in 0..10 {
            if factory.active_contexts() == 0 {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(factory.active_contexts(), 0);
    }
}
