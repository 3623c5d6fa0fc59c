//! Bounded pool for blocking library work.
//!
//! Jobs run on tokio's blocking threads, but at most `size` of them at a
//! time. The permit travels into the job, so a caller that stops waiting
//! does not free the slot before the job is actually done.

use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;

use crate::error::PoolError;

pub const DEFAULT_WORKERS: usize = 4;

#[derive(Debug, Clone)]
pub struct WorkerPool {
    permits: Arc<Semaphore>,
    size: usize,
}

impl WorkerPool {
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        Self {
            permits: Arc::new(Semaphore::new(size)),
            size,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    /// Run a blocking closure once a worker slot is free.
    pub async fn run<F, T>(&self, job: F) -> Result<T, PoolError>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let permit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| PoolError::Closed)?;
        let handle = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            job()
        });
        Ok(handle.await?)
    }

    /// Hold a worker slot for the duration of an async operation.
    pub async fn run_async<Fut>(&self, fut: Fut) -> Result<Fut::Output, PoolError>
    where
        Fut: Future,
    {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| PoolError::Closed)?;
        Ok(fut.await)
    }
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self::new(DEFAULT_WORKERS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn runs_jobs_and_returns_results() {
        let pool = WorkerPool::new(2);
        let out = pool.run(|| 2 + 2).await.unwrap();
        assert_eq!(out, 4);
        assert_eq!(pool.available(), 2);
    }

    #[tokio::test]
    async fn never_exceeds_its_size() {
        let pool = WorkerPool::new(2);
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let mut tasks = Vec::new();
        for _ in 0..8 {
            let pool = pool.clone();
            let running = running.clone();
            let peak = peak.clone();
            tasks.push(tokio::spawn(async move {
                pool.run(move || {
                    let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    std::thread::sleep(Duration::from_millis(20));
                    running.fetch_sub(1, Ordering::SeqCst);
                })
                .await
            }));
        }
        for t in tasks {
            t.await.unwrap().unwrap();
        }
        assert!(peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn panicking_job_is_an_error() {
        let pool = WorkerPool::new(1);
        let result = pool.run(|| -> u32 { panic!("boom") }).await;
        assert!(matches!(result, Err(PoolError::Join(_))));
        // the slot is released again
        assert_eq!(pool.run(|| 1).await.unwrap(), 1);
    }

    #[test]
    fn zero_size_is_clamped() {
        assert_eq!(WorkerPool::new(0).size(), 1);
    }
}
