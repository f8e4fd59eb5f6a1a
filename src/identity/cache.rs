use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use super::resolver::DisplayIdentity;
use crate::clock::Clock;

struct CacheEntry {
    identity: DisplayIdentity,
    expires_at: DateTime<Utc>,
}

/// TTL cache for resolved identities.
///
/// An explicit object with a constructor-injected clock, passed by
/// reference where it is needed.
pub struct IdentityCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl IdentityCache {
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
            clock,
        }
    }

    pub async fn get(&self, user_id: &str) -> Option<DisplayIdentity> {
        let entries = self.entries.read().await;
        let entry = entries.get(user_id)?;
        if entry.expires_at <= self.clock.now() {
            return None;
        }
        Some(entry.identity.clone())
    }

    pub async fn insert(&self, identity: DisplayIdentity) {
        let expires_at = self.clock.now() + self.ttl;
        let mut entries = self.entries.write().await;
        entries.insert(
            identity.user_id().to_string(),
            CacheEntry {
                identity,
                expires_at,
            },
        );
    }

    /// Removes every expired entry; returns how many were evicted.
    pub async fn evict_expired(&self) -> usize {
        let now = self.clock.now();
        let mut entries = self.entries.write().await;
        let initial = entries.len();
        entries.retain(|_, entry| entry.expires_at > now);
        let evicted = initial - entries.len();
        if evicted > 0 {
            debug!(evicted, "Evicted expired identity cache entries");
        }
        evicted
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
