// Copyright © 2025 lituus-io <spicyzhug@gmail.com>
// All Rights Reserved.
// Licensed under PolyForm Noncommercial 1.0.0

//! Concurrency limit for outbound completion calls

use std::sync::Arc;
use tokio::sync::{AcquireError, Semaphore, SemaphorePermit};

/// Bounds how many completion calls are in flight at once.
///
/// Shared by every role that talks through one client, so scorer fan-out
/// and rater execution cannot exceed the provider's budget together.
#[derive(Clone)]
pub struct LMPool {
    semaphore: Arc<Semaphore>,
    max_concurrent: usize,
}

impl LMPool {
    /// Create a pool; zero is raised to one.
    pub fn new(max_concurrent: usize) -> Self {
        let max_concurrent = max_concurrent.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(max_concurrent)),
            max_concurrent,
        }
    }

    /// Wait for a slot.
    pub async fn acquire(&self) -> Result<SemaphorePermit<'_>, AcquireError> {
        self.semaphore.acquire().await
    }

    /// Slots currently free
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Get max concurrent requests
    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }
}

impl Default for LMPool {
    fn default() -> Self {
        Self::new(4)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_permits_are_released() {
        let pool = LMPool::new(2);
        {
            let _a = pool.acquire().await.unwrap();
            let _b = pool.acquire().await.unwrap();
            assert_eq!(pool.available(), 0);
        }
        assert_eq!(pool.available(), 2);
    }

    #[test]
    fn test_zero_is_clamped() {
        let pool = LMPool::new(0);
        assert_eq!(pool.max_concurrent(), 1);
        assert_eq!(pool.available(), 1);
    }

    #[tokio::test]
    async fn test_clones_share_slots() {
        let pool = LMPool::new(1);
        let other = pool.clone();
        let _held = pool.acquire().await.unwrap();
        assert_eq!(other.available(), 0);
    }
}
