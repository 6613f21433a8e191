use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::trace;
use ziwan_core::UserId;

/// Per-user exclusion for space creation.
///
/// Each user id maps to a reference-counted mutex. An entry lives only while
/// some request holds or waits for it, so the map stays as small as the
/// number of users with creations in flight.
///
/// The exclusion is process-local. Deployments with several instances still
/// rely on the store's unique key for the one-space-per-type rule.
#[derive(Debug, Default)]
pub struct UserLocks {
    locks: DashMap<UserId, Arc<Mutex<()>>>,
}

impl UserLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits up to `wait` for exclusive access for `user`.
    ///
    /// Returns `None` if the wait expired.
    pub async fn acquire(&self, user: UserId, wait: Duration) -> Option<UserLockGuard<'_>> {
        let entry = EntryRef {
            locks: &self.locks,
            user,
            lock: Some(Arc::clone(self.locks.entry(user).or_default().value())),
        };
        let lock = Arc::clone(entry.lock.as_ref()?);

        match tokio::time::timeout(wait, lock.lock_owned()).await {
            Ok(guard) => {
                trace!(user_id = %user, "acquired space creation lock");
                Some(UserLockGuard {
                    _guard: guard,
                    _entry: entry,
                })
            }
            Err(_) => None,
        }
    }

    /// Number of users that currently hold or wait for a lock.
    pub fn in_flight(&self) -> usize {
        self.locks.len()
    }
}

/// Exclusive access for one user. Released on drop.
#[derive(Debug)]
pub struct UserLockGuard<'a> {
    // fields drop in order: the mutex is released before the entry is pruned
    _guard: OwnedMutexGuard<()>,
    _entry: EntryRef<'a>,
}

#[derive(Debug)]
struct EntryRef<'a> {
    locks: &'a DashMap<UserId, Arc<Mutex<()>>>,
    user: UserId,
    lock: Option<Arc<Mutex<()>>>,
}

impl Drop for EntryRef<'_> {
    fn drop(&mut self) {
        drop(self.lock.take());
        // the predicate runs under the shard lock, so no new waiter can clone
        // the Arc between the count check and the removal
        self.locks
            .remove_if(&self.user, |_, lock| Arc::strong_count(lock) == 1);
    }
}
