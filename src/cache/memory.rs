//! In-process cache backend

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{CacheError, CacheGateway};

#[derive(Debug)]
struct MemoryEntry {
    value: Vec<u8>,
    /// `None` = never expires
    expires_at: Option<Instant>,
}

impl MemoryEntry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|expires_at| now >= expires_at)
    }
}

/// Process-local cache with lazy expiry
///
/// Clones share the same storage.
#[derive(Debug, Clone, Default)]
pub struct MemoryCache {
    entries: Arc<RwLock<HashMap<String, MemoryEntry>>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries, expired ones included until next read
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl CacheGateway for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let now = Instant::now();
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                None => return Ok(None),
                Some(entry) if !entry.is_expired(now) => return Ok(Some(entry.value.clone())),
                Some(_) => {}
            }
        }

        // Expired: drop it, unless a writer replaced it in the meantime
        let mut entries = self.entries.write().await;
        if entries.get(key).is_some_and(|entry| entry.is_expired(now)) {
            entries.remove(key);
        }
        Ok(None)
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl_secs: Option<u64>) -> Result<(), CacheError> {
        // A TTL too large to represent never expires
        let expires_at =
            ttl_secs.and_then(|secs| Instant::now().checked_add(Duration::from_secs(secs)));
        self.entries
            .write()
            .await
            .insert(key.to_string(), MemoryEntry { value, expires_at });
        Ok(())
    }

    async fn ping(&self) -> Result<(), CacheError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_get_missing_key_is_none() {
        let cache = MemoryCache::new();
        assert!(cache.get("FLIGHT_XX1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_entry_without_ttl_persists() {
        let cache = MemoryCache::new();
        cache.set("AIRPORT_YVR", b"{}".to_vec(), None).await.unwrap();

        assert_eq!(cache.get("AIRPORT_YVR").await.unwrap(), Some(b"{}".to_vec()));
    }

    #[tokio::test]
    async fn test_fresh_entry_is_returned() {
        let cache = MemoryCache::new();
        cache.set("FLIGHT_AC39", b"fresh".to_vec(), Some(1380)).await.unwrap();

        assert_eq!(cache.get("FLIGHT_AC39").await.unwrap(), Some(b"fresh".to_vec()));
    }

    #[tokio::test]
    async fn test_expired_entry_is_removed() {
        let cache = MemoryCache::new();
        cache.set("FLIGHT_AC39", b"stale".to_vec(), Some(0)).await.unwrap();

        assert!(cache.get("FLIGHT_AC39").await.unwrap().is_none());
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_last_write_wins() {
        let cache = MemoryCache::new();
        cache.set("FLIGHT_AC39", b"first".to_vec(), None).await.unwrap();
        cache.set("FLIGHT_AC39", b"second".to_vec(), None).await.unwrap();

        assert_eq!(cache.get("FLIGHT_AC39").await.unwrap(), Some(b"second".to_vec()));
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_clones_share_storage() {
        let cache = MemoryCache::new();
        let clone = cache.clone();
        clone.set("AIRPORT_AKL", b"{}".to_vec(), None).await.unwrap();

        assert!(cache.get("AIRPORT_AKL").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_huge_ttl_never_expires() {
        let cache = MemoryCache::new();
        cache.set("AIRPORT_YVR", b"{}".to_vec(), Some(u64::MAX)).await.unwrap();

        assert_eq!(cache.get("AIRPORT_YVR").await.unwrap(), Some(b"{}".to_vec()));
    }

    #[tokio::test]
    async fn test_ping_is_ok() {
        assert!(MemoryCache::new().ping().await.is_ok());
    }
}
