// SPDX-FileCopyrightText: 2026 Blufio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bounded pool for flush and follow-up dispatches.
//!
//! Polling loops hand work to the pool and return immediately; a semaphore
//! caps how many dispatches run at once and a [`TaskTracker`] lets shutdown
//! wait for the ones in flight. [`QueuedIds`] keeps one queued dispatch
//! per conversation on an instance.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashSet;
use tokio::sync::Semaphore;
use tokio_util::task::TaskTracker;
use tracing::{debug, warn};

/// A cloneable handle to a shared dispatch pool.
#[derive(Debug, Clone)]
pub struct DispatchPool {
    permits: Arc<Semaphore>,
    tracker: TaskTracker,
    max_concurrent: usize,
}

impl DispatchPool {
    /// Create a pool running at most `max_concurrent` dispatches at a time.
    pub fn new(max_concurrent: usize) -> Self {
        let max_concurrent = max_concurrent.max(1);
        Self {
            permits: Arc::new(Semaphore::new(max_concurrent)),
            tracker: TaskTracker::new(),
            max_concurrent,
        }
    }

    /// Queue a dispatch. Never waits for a permit on the caller's task.
    pub fn spawn<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let permits = self.permits.clone();
        self.tracker.spawn(async move {
            let Ok(_permit) = permits.acquire_owned().await else {
                debug!("dispatch pool closed, dropping task");
                return;
            };
            task.await;
        });
    }

    /// Number of dispatches queued or running.
    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    /// Wait for every dispatch queued so far, then accept new ones again.
    pub async fn drain(&self) {
        self.tracker.close();
        self.tracker.wait().await;
        self.tracker.reopen();
    }

    /// Stop accepting work and wait up to `timeout` for in-flight dispatches.
    ///
    /// Returns `true` if everything finished in time.
    pub async fn shutdown(&self, timeout: Duration) -> bool {
        self.tracker.close();
        match tokio::time::timeout(timeout, self.tracker.wait()).await {
            Ok(()) => true,
            Err(_) => {
                warn!(
                    remaining = self.tracker.len(),
                    "dispatch pool shutdown timed out"
                );
                false
            }
        }
    }
}

/// Conversation ids with a dispatch queued or running on this instance.
#[derive(Debug, Clone, Default)]
pub struct QueuedIds {
    ids: Arc<DashSet<String>>,
}

impl QueuedIds {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `id` queued, or `None` if it already is. The mark is cleared when
    /// the guard drops, including when the dispatch holding it panics.
    pub fn try_queue(&self, id: &str) -> Option<QueuedGuard> {
        self.ids.insert(id.to_string()).then(|| QueuedGuard {
            ids: self.ids.clone(),
            id: id.to_string(),
        })
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Holds one id in a [`QueuedIds`] set.
#[derive(Debug)]
pub struct QueuedGuard {
    ids: Arc<DashSet<String>>,
    id: String,
}

impl QueuedGuard {
    pub fn id(&self) -> &str {
        &self.id
    }
}

impl Drop for QueuedGuard {
    fn drop(&mut self) {
        self.ids.remove(&self.id);
    }
}
