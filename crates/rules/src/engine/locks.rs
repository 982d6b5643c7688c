//! Per-profile mutual exclusion for `RuleEngine::process`.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use kindle_core::ProfileId;
use tokio::sync::OwnedMutexGuard;

/// Lazily created async mutex per profile id.
///
/// The outer `std::sync::Mutex` only guards the map and is never held across
/// an await. Entries nobody holds or waits on are dropped on the next
/// `acquire`, so the map tracks busy profiles only.
#[derive(Debug, Default)]
pub(crate) struct ProfileLocks {
    locks: Mutex<HashMap<ProfileId, Arc<tokio::sync::Mutex<()>>>>,
}

impl ProfileLocks {
    pub(crate) async fn acquire(&self, profile_id: ProfileId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut map = self.locks.lock().expect("profile lock map poisoned");
            // Guards and waiters each hold a clone, so a count of 1 means idle.
            map.retain(|_, lock| Arc::strong_count(lock) > 1);
            Arc::clone(map.entry(profile_id).or_default())
        };
        lock.lock_owned().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn same_profile_waits_other_profile_does_not() {
        let locks = Arc::new(ProfileLocks::default());
        let held = locks.acquire(1).await;

        // A different profile is independent.
        let other = tokio::time::timeout(Duration::from_millis(50), locks.acquire(2)).await;
        assert!(other.is_ok());

        // The same profile blocks until the first guard drops.
        let blocked = tokio::time::timeout(Duration::from_millis(50), locks.acquire(1)).await;
        assert!(blocked.is_err());

        drop(held);
        let reacquired = tokio::time::timeout(Duration::from_millis(50), locks.acquire(1)).await;
        assert!(reacquired.is_ok());
    }

    #[tokio::test]
    async fn idle_profiles_are_pruned() {
        let locks = ProfileLocks::default();
        for profile_id in 1..=50 {
            drop(locks.acquire(profile_id).await);
        }
        let held = locks.acquire(51).await;
        assert_eq!(locks.locks.lock().unwrap().len(), 1);
        drop(held);
    }
}
