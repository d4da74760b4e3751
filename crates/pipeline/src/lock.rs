//! Per-city mutual exclusion for the publish path.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

use common::City;

#[derive(Debug, Default, Clone)]
pub struct CityLocks {
    locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

/// Held for the duration of one run. Dropping it releases the city and
/// removes the entry when nobody else holds or awaits it.
#[derive(Debug)]
pub struct CityGuard {
    key: String,
    locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl CityLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, city: &City) -> CityGuard {
        let key = city.cache_key();
        // Clone out so the shard lock is not held across the await.
        let mutex = self.locks.entry(key.clone()).or_default().value().clone();
        let guard = mutex.lock_owned().await;
        CityGuard {
            key,
            locks: self.locks.clone(),
            guard: Some(guard),
        }
    }

    /// Cities with a run in flight or queued.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

impl Drop for CityGuard {
    fn drop(&mut self) {
        drop(self.guard.take());
        // Only the map's own handle left means no holder and no waiter.
        self.locks
            .remove_if(&self.key, |_, m| Arc::strong_count(m) == 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn city(name: &str) -> City {
        City::parse(name).unwrap()
    }

    #[tokio::test]
    async fn test_entry_removed_after_release() {
        let locks = CityLocks::new();
        let guard = locks.acquire(&city("Lisboa")).await;
        assert_eq!(locks.len(), 1);
        drop(guard);
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn test_same_city_serializes() {
        let locks = CityLocks::new();
        let first = locks.acquire(&city("Lisboa")).await;

        let waiter = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _g = locks.acquire(&city("LISBOA")).await;
            })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!waiter.is_finished());

        drop(first);
        waiter.await.unwrap();
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn test_different_cities_do_not_block() {
        let locks = CityLocks::new();
        let _a = locks.acquire(&city("Lisboa")).await;
        let b = tokio::time::timeout(Duration::from_secs(1), locks.acquire(&city("Porto"))).await;
        assert!(b.is_ok());
        assert_eq!(locks.len(), 2);
    }
}
