//! Bounded worker pool implementation.

use serde::Serialize;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;

use super::error::WorkerError;

/// Status of a worker pool.
#[derive(Debug, Clone, Serialize)]
pub struct PoolStatus {
    /// Pool name.
    pub name: String,
    /// Number of jobs currently holding a slot.
    pub active_jobs: usize,
    /// Maximum concurrent jobs.
    pub max_concurrent: usize,
    /// Number of jobs waiting for a slot.
    pub queued_jobs: usize,
    /// Total jobs completed since the pool was created.
    pub total_processed: u64,
    /// Total jobs that panicked or were cancelled.
    pub total_failed: u64,
}

#[derive(Default)]
struct PoolStats {
    active: AtomicU64,
    queued: AtomicU64,
    total_processed: AtomicU64,
    total_failed: AtomicU64,
}

/// Decrements a counter when dropped, so cancelled callers don't leak counts.
struct CounterGuard<'a>(&'a AtomicU64);

impl<'a> CounterGuard<'a> {
    fn enter(counter: &'a AtomicU64) -> Self {
        counter.fetch_add(1, Ordering::Relaxed);
        Self(counter)
    }
}

impl Drop for CounterGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::Relaxed);
    }
}

/// A bounded pool for blocking calls and process waits.
///
/// Cloning is cheap; clones share slots and statistics.
#[derive(Clone)]
pub struct WorkerPool {
    name: Arc<str>,
    max_concurrent: usize,
    semaphore: Arc<Semaphore>,
    stats: Arc<PoolStats>,
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("name", &self.name)
            .field("max_concurrent", &self.max_concurrent)
            .finish()
    }
}

impl WorkerPool {
    /// Creates a pool that runs at most `max_concurrent` jobs at once.
    ///
    /// A zero limit is raised to one.
    pub fn new(name: impl Into<String>, max_concurrent: usize) -> Self {
        let max_concurrent = max_concurrent.max(1);
        let name: String = name.into();
        Self {
            name: Arc::from(name),
            max_concurrent,
            semaphore: Arc::new(Semaphore::new(max_concurrent)),
            stats: Arc::new(PoolStats::default()),
        }
    }

    /// Runs a blocking closure on the runtime's blocking threads.
    ///
    /// The caller yields until a slot is free and the closure has returned.
    pub async fn run_blocking<F, T>(&self, f: F) -> Result<T, WorkerError>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let permit = {
            let _queued = CounterGuard::enter(&self.stats.queued);
            Arc::clone(&self.semaphore)
                .acquire_owned()
                .await
                .map_err(|_| WorkerError::Closed)?
        };

        let _active = CounterGuard::enter(&self.stats.active);
        let result = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            f()
        })
        .await;

        match result {
            Ok(value) => {
                self.stats.total_processed.fetch_add(1, Ordering::Relaxed);
                Ok(value)
            }
            Err(e) => {
                self.stats.total_failed.fetch_add(1, Ordering::Relaxed);
                Err(WorkerError::Panicked {
                    reason: e.to_string(),
                })
            }
        }
    }

    /// Runs an async job while holding one of the pool's slots.
    pub async fn run<Fut>(&self, job: Fut) -> Result<Fut::Output, WorkerError>
    where
        Fut: Future,
    {
        let _permit = {
            let _queued = CounterGuard::enter(&self.stats.queued);
            self.semaphore
                .acquire()
                .await
                .map_err(|_| WorkerError::Closed)?
        };

        let _active = CounterGuard::enter(&self.stats.active);
        let output = job.await;
        self.stats.total_processed.fetch_add(1, Ordering::Relaxed);
        Ok(output)
    }

    /// Closes the pool. Jobs already holding a slot run to completion.
    pub fn close(&self) {
        self.semaphore.close();
    }

    /// Returns the maximum number of concurrent jobs.
    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    /// Returns a snapshot of the pool's counters.
    pub fn status(&self) -> PoolStatus {
        PoolStatus {
            name: self.name.to_string(),
            active_jobs: self.stats.active.load(Ordering::Relaxed) as usize,
            max_concurrent: self.max_concurrent,
            queued_jobs: self.stats.queued.load(Ordering::Relaxed) as usize,
            total_processed: self.stats.total_processed.load(Ordering::Relaxed),
            total_failed: self.stats.total_failed.load(Ordering::Relaxed),
        }
    }
}
