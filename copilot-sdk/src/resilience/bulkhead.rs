//! Concurrency limiting for fan-out work
//!
//! A bulkhead bounds how many operations run at once against the
//! backends. Callers that submit more work simply wait for a permit.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::Semaphore;

use crate::error::{Result, ServiceError};

/// Bulkhead for isolating concurrent calls
#[derive(Debug, Clone)]
pub struct Bulkhead {
    name: String,
    max_concurrency: usize,
    current: Arc<AtomicUsize>,
    semaphore: Arc<Semaphore>,
}

impl Bulkhead {
    /// Creates a new bulkhead. A limit of zero is raised to one.
    pub fn new(name: impl Into<String>, max_concurrency: usize) -> Self {
        let max_concurrency = max_concurrency.max(1);
        Self {
            name: name.into(),
            max_concurrency,
            current: Arc::new(AtomicUsize::new(0)),
            semaphore: Arc::new(Semaphore::new(max_concurrency)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    pub fn current_concurrency(&self) -> usize {
        self.current.load(Ordering::Relaxed)
    }

    pub fn available_permits(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Run one operation once a permit is available
    pub async fn execute<F, Fut, T>(&self, operation: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let _permit = self.semaphore.acquire().await.map_err(|_| {
            ServiceError::internal(format!("Bulkhead {} has been closed", self.name))
        })?;

        let current = self.current.fetch_add(1, Ordering::Relaxed) + 1;
        log::trace!(
            "Bulkhead {} running {}/{}",
            self.name,
            current,
            self.max_concurrency
        );

        let result = operation().await;
        self.current.fetch_sub(1, Ordering::Relaxed);
        result
    }

    /// Apply `f` to every item with at most `max_concurrency` in flight.
    /// Outputs keep the order of the inputs.
    pub async fn run_all<I, F, Fut, T>(&self, items: I, f: F) -> Vec<T>
    where
        I: IntoIterator,
        F: Fn(I::Item) -> Fut,
        Fut: Future<Output = T>,
    {
        let tasks = items.into_iter().map(|item| {
            let fut = f(item);
            async move {
                let _permit = self.semaphore.acquire().await.ok();
                self.current.fetch_add(1, Ordering::Relaxed);
                let output = fut.await;
                self.current.fetch_sub(1, Ordering::Relaxed);
                output
            }
        });

        join_all(tasks).await
    }
}
