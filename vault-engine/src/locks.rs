//! Per-resource write serialization.
//!
//! One async mutex per resource, created on demand and evicted once the last
//! holder or waiter lets go. Writers to different resources never share a
//! mutex, so they never wait on each other.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use vault_types::ResourceId;

type LockMap = DashMap<ResourceId, Arc<Mutex<()>>>;

#[derive(Default)]
pub(crate) struct ResourceLocks {
    locks: Arc<LockMap>,
}

impl ResourceLocks {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `resource_id`.
    pub(crate) async fn acquire(&self, resource_id: &ResourceId) -> ResourceGuard {
        let mutex = self
            .locks
            .entry(resource_id.clone())
            .or_default()
            .value()
            .clone();
        let guard = mutex.lock_owned().await;

        ResourceGuard {
            locks: Arc::clone(&self.locks),
            resource_id: resource_id.clone(),
            guard: Some(guard),
        }
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.locks.len()
    }
}

pub(crate) struct ResourceGuard {
    locks: Arc<LockMap>,
    resource_id: ResourceId,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for ResourceGuard {
    fn drop(&mut self) {
        // Release first so the strong count reflects only other users
        drop(self.guard.take());
        self.locks
            .remove_if(&self.resource_id, |_, mutex| Arc::strong_count(mutex) == 1);
    }
}
