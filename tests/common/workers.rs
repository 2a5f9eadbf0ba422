//! Worker fixtures shared by the integration suites.

use async_trait::async_trait;
use std::time::Duration;

use renderloom::workers::{Worker, WorkerError, WorkerOutlet};

/// Emits `(job, 1) .. (job, limit)` as fast as the queue accepts, yielding
/// between sends so single-threaded test runtimes interleave fairly.
pub struct CounterWorker {
    pub job: &'static str,
    pub limit: u64,
}

#[async_trait]
impl Worker for CounterWorker {
    type Output = (&'static str, u64);

    fn matches(&self, other: &Self) -> bool {
        self.job == other.job
    }

    async fn run(&self, outlet: WorkerOutlet<(&'static str, u64)>) -> Result<(), WorkerError> {
        for n in 1..=self.limit {
            if outlet.send((self.job, n)).await.is_err() {
                break;
            }
            tokio::task::yield_now().await;
        }
        Ok(())
    }
}

/// Emits a single `1`, then terminates with a failure.
pub struct FailingWorker {
    pub job: &'static str,
}

#[async_trait]
impl Worker for FailingWorker {
    type Output = u64;

    fn matches(&self, other: &Self) -> bool {
        self.job == other.job
    }

    async fn run(&self, outlet: WorkerOutlet<u64>) -> Result<(), WorkerError> {
        let _ = outlet.send(1).await;
        Err(WorkerError::msg("boom"))
    }
}

/// Infinite periodic counter; only cancellation stops it.
pub struct Ticker {
    pub job: &'static str,
    pub period_ms: u64,
}

#[async_trait]
impl Worker for Ticker {
    type Output = u64;

    fn matches(&self, other: &Self) -> bool {
        self.job == other.job
    }

    async fn run(&self, outlet: WorkerOutlet<u64>) -> Result<(), WorkerError> {
        let mut n = 0u64;
        loop {
            tokio::time::sleep(Duration::from_millis(self.period_ms)).await;
            n += 1;
            if outlet.send(n).await.is_err() {
                break;
            }
        }
        Ok(())
    }
}
