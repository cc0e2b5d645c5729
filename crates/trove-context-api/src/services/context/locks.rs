use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

use crate::session::SessionId;
use crate::utils::error::ContextError;

/// One async mutex per session; sessions never contend with each other.
pub struct SessionLocks {
    locks: DashMap<SessionId, Arc<Mutex<()>>>,
    acquire_timeout: Duration,
}

impl SessionLocks {
    pub fn new(acquire_timeout: Duration) -> Self {
        Self {
            locks: DashMap::new(),
            acquire_timeout,
        }
    }

    pub async fn acquire(&self, session: &SessionId) -> Result<OwnedMutexGuard<()>, ContextError> {
        // Clone the Arc out so no shard lock is held across the await
        let lock = self
            .locks
            .entry(session.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();

        tokio::time::timeout(self.acquire_timeout, lock.lock_owned())
            .await
            .map_err(|_| {
                ContextError::StorageUnavailable(format!(
                    "session {} busy for more than {:?}",
                    session, self.acquire_timeout
                ))
            })
    }

    /// Drop registry entries nobody holds or waits on. Returns how many were dropped.
    pub fn release_idle(&self) -> usize {
        let before = self.locks.len();
        self.locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        let released = before.saturating_sub(self.locks.len());
        if released > 0 {
            debug!("Released {} idle session locks", released);
        }
        released
    }

    /// Drop one session's entry unless a guard or waiter still holds it.
    pub fn forget(&self, session: &SessionId) -> bool {
        self.locks
            .remove_if(session, |_, lock| Arc::strong_count(lock) == 1)
            .is_some()
    }

    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}
