//! In-process store for development and tests.
//!
//! Expiry is measured with `tokio::time::Instant`, so tests running with a
//! paused clock can move TTLs forward with `tokio::time::advance`.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use super::{Expiry, KvStore, StoreError, StoreOp, ttl_secs};

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Instant,
}

impl Entry {
    fn new(value: String, ttl: Duration) -> Self {
        Self {
            value,
            expires_at: Instant::now() + Duration::from_secs(ttl_secs(ttl)),
        }
    }

    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// HashMap-backed store; one mutex makes every method atomic
#[derive(Debug, Default)]
pub struct InMemoryStore {
    entries: Mutex<HashMap<String, Entry>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, Entry>>, StoreError> {
        self.entries.lock().map_err(|_| StoreError::Poisoned)
    }

    /// Live entry at `key`, dropping it if it has expired
    fn live<'a>(map: &'a mut HashMap<String, Entry>, key: &str) -> Option<&'a mut Entry> {
        let now = Instant::now();
        if map.get(key).is_some_and(|e| !e.is_live(now)) {
            map.remove(key);
        }
        map.get_mut(key)
    }

    fn write(map: &mut HashMap<String, Entry>, op: &StoreOp) {
        match op {
            StoreOp::Set { key, value, ttl } => {
                map.insert(key.clone(), Entry::new(value.clone(), *ttl));
            }
            StoreOp::Del(keys) => {
                for key in keys {
                    map.remove(key);
                }
            }
        }
    }
}

#[async_trait]
impl KvStore for InMemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut map = self.lock()?;
        Ok(Self::live(&mut map, key).map(|e| e.value.clone()))
    }

    async fn ttl(&self, key: &str) -> Result<Option<Expiry>, StoreError> {
        let mut map = self.lock()?;
        let now = Instant::now();
        Ok(Self::live(&mut map, key)
            .map(|e| Expiry::In(e.expires_at.saturating_duration_since(now))))
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        let mut map = self.lock()?;
        map.insert(key.to_string(), Entry::new(value.to_string(), ttl));
        Ok(())
    }

    async fn del(&self, keys: &[String]) -> Result<(), StoreError> {
        let mut map = self.lock()?;
        Self::write(&mut map, &StoreOp::Del(keys.to_vec()));
        Ok(())
    }

    async fn del_if_eq(
        &self,
        key: &str,
        expected: &str,
        also: &[String],
    ) -> Result<bool, StoreError> {
        let mut map = self.lock()?;

        let matches = Self::live(&mut map, key).is_some_and(|e| e.value == expected);
        if matches {
            map.remove(key);
            Self::write(&mut map, &StoreOp::Del(also.to_vec()));
        }
        Ok(matches)
    }

    async fn incr_capped(
        &self,
        key: &str,
        cap: u64,
        ttl: Duration,
    ) -> Result<Option<u64>, StoreError> {
        let mut map = self.lock()?;

        let current = match Self::live(&mut map, key) {
            Some(entry) => entry.value.parse::<u64>().map_err(|_| StoreError::Corrupt {
                key: key.to_string(),
                value: entry.value.clone(),
            })?,
            None => 0,
        };

        if current >= cap {
            return Ok(None);
        }

        let next = current + 1;
        map.insert(key.to_string(), Entry::new(next.to_string(), ttl));
        Ok(Some(next))
    }

    async fn apply(&self, ops: &[StoreOp]) -> Result<(), StoreError> {
        let mut map = self.lock()?;
        for op in ops {
            Self::write(&mut map, op);
        }
        Ok(())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.lock().map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_set_get_expire() {
        let store = InMemoryStore::new();
        store.set_ex("otp:a@b.io", "4821", Duration::from_secs(300)).await.unwrap();

        assert_eq!(store.get("otp:a@b.io").await.unwrap(), Some("4821".to_string()));
        assert_eq!(
            store.ttl("otp:a@b.io").await.unwrap(),
            Some(Expiry::In(Duration::from_secs(300)))
        );

        tokio::time::advance(Duration::from_secs(299)).await;
        assert_eq!(
            store.ttl("otp:a@b.io").await.unwrap(),
            Some(Expiry::In(Duration::from_secs(1)))
        );

        // Expired keys read as absent
        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(store.get("otp:a@b.io").await.unwrap(), None);
        assert_eq!(store.ttl("otp:a@b.io").await.unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_incr_capped_stops_at_cap() {
        let store = InMemoryStore::new();
        let ttl = Duration::from_secs(60);

        assert_eq!(store.incr_capped("n", 2, ttl).await.unwrap(), Some(1));
        assert_eq!(store.incr_capped("n", 2, ttl).await.unwrap(), Some(2));
        assert_eq!(store.incr_capped("n", 2, ttl).await.unwrap(), None);

        // Value untouched at the cap
        assert_eq!(store.get("n").await.unwrap(), Some("2".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_incr_capped_refreshes_ttl() {
        let store = InMemoryStore::new();
        let ttl = Duration::from_secs(60);

        store.incr_capped("n", 5, ttl).await.unwrap();
        tokio::time::advance(Duration::from_secs(50)).await;
        store.incr_capped("n", 5, ttl).await.unwrap();

        assert_eq!(store.ttl("n").await.unwrap(), Some(Expiry::In(ttl)));

        // Window restarts once the counter expires
        tokio::time::advance(ttl).await;
        assert_eq!(store.incr_capped("n", 5, ttl).await.unwrap(), Some(1));
    }

    #[tokio::test]
    async fn test_incr_capped_rejects_non_integer() {
        let store = InMemoryStore::new();
        store.set_ex("n", "abc", Duration::from_secs(60)).await.unwrap();

        let err = store.incr_capped("n", 5, Duration::from_secs(60)).await.unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { .. }));
    }

    #[tokio::test]
    async fn test_apply_batch() {
        let store = InMemoryStore::new();
        let ttl = Duration::from_secs(60);
        store.set_ex("otp:x", "1234", ttl).await.unwrap();
        store.set_ex("attempts:x", "1", ttl).await.unwrap();

        store
            .apply(&[
                StoreOp::set("lock:x", "locked", ttl),
                StoreOp::Del(vec!["otp:x".into(), "attempts:x".into()]),
            ])
            .await
            .unwrap();

        assert_eq!(store.get("lock:x").await.unwrap(), Some("locked".to_string()));
        assert_eq!(store.get("otp:x").await.unwrap(), None);
        assert_eq!(store.get("attempts:x").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_del_if_eq_only_on_match() {
        let store = InMemoryStore::new();
        let ttl = Duration::from_secs(60);
        store.set_ex("otp:x", "4821", ttl).await.unwrap();
        store.set_ex("attempts:x", "1", ttl).await.unwrap();
        let also = ["attempts:x".to_string()];

        assert!(!store.del_if_eq("otp:x", "1111", &also).await.unwrap());
        assert_eq!(store.get("attempts:x").await.unwrap(), Some("1".to_string()));

        assert!(store.del_if_eq("otp:x", "4821", &also).await.unwrap());
        assert_eq!(store.get("otp:x").await.unwrap(), None);
        assert_eq!(store.get("attempts:x").await.unwrap(), None);

        // Gone keys never match
        assert!(!store.del_if_eq("otp:x", "4821", &also).await.unwrap());
    }

    #[tokio::test]
    async fn test_concurrent_incr_capped_never_overshoots() {
        let store = std::sync::Arc::new(InMemoryStore::new());
        let ttl = Duration::from_secs(60);

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.incr_capped("n", 3, ttl).await.unwrap() })
            })
            .collect();

        let mut granted = 0;
        for handle in handles {
            if handle.await.unwrap().is_some() {
                granted += 1;
            }
        }

        assert_eq!(granted, 3);
        assert_eq!(store.get("n").await.unwrap(), Some("3".to_string()));
    }
}
