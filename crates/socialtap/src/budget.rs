//! Per-call deadline and cancellation.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::{ScrapeError, ScrapeResult};

/// Deadline and cancellation token shared by every step of one call.
///
/// Each awaited step (navigation, settle delay, capture) runs through
/// [`CallBudget::run`], so the whole call stops at the deadline or on
/// cancellation, whichever comes first.
#[derive(Debug, Clone)]
pub struct CallBudget {
    deadline: Option<Instant>,
    total: Duration,
    cancel: CancellationToken,
}

impl CallBudget {
    pub fn new(total: Duration, cancel: CancellationToken) -> Self {
        Self {
            deadline: Some(Instant::now() + total),
            total,
            cancel,
        }
    }

    /// No deadline and a token nobody cancels.
    pub fn unbounded() -> Self {
        Self {
            deadline: None,
            total: Duration::MAX,
            cancel: CancellationToken::new(),
        }
    }

    pub fn token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    /// Drive `step` until it finishes, the deadline passes or the call is
    /// cancelled.
    pub async fn run<T, F>(&self, step: F) -> ScrapeResult<T>
    where
        F: Future<Output = ScrapeResult<T>>,
    {
        let bounded = async {
            match self.deadline {
                Some(deadline) => tokio::time::timeout_at(deadline, step)
                    .await
                    .map_err(|_| ScrapeError::Timeout(self.total))?,
                None => step.await,
            }
        };
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(ScrapeError::Cancelled),
            result = bounded => result,
        }
    }

    /// Interruptible sleep.
    pub async fn sleep(&self, delay: Duration) -> ScrapeResult<()> {
        self.run(async {
            tokio::time::sleep(delay).await;
            Ok(())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    #[tokio::test]
    async fn test_deadline_elapses() {
        let budget = CallBudget::new(Duration::from_millis(20), CancellationToken::new());
        let err = assert_err!(budget.sleep(Duration::from_secs(5)).await);
        assert!(matches!(err, ScrapeError::Timeout(d) if d == Duration::from_millis(20)));
    }

    #[tokio::test]
    async fn test_cancel_wins() {
        let token = CancellationToken::new();
        let budget = CallBudget::new(Duration::from_secs(30), token.clone());
        token.cancel();
        let err = assert_err!(budget.sleep(Duration::from_secs(10)).await);
        assert!(matches!(err, ScrapeError::Cancelled));
    }

    #[tokio::test]
    async fn test_step_result_passes_through() {
        let budget = CallBudget::unbounded();
        assert_eq!(assert_ok!(budget.run(async { Ok(7) }).await), 7);
        assert!(budget.remaining().is_none());
    }
}
