use chrono::Duration;
use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, instrument};

use super::cache::IdentityCache;
use super::resolver::{DisplayIdentity, IdentityResolver};
use crate::clock::Clock;

#[derive(Debug, Clone)]
pub struct IdentityServiceConfig {
    pub cache_ttl: Duration,
    pub lookup_timeout: std::time::Duration,
    /// Upper bound on in-flight lookups when resolving a batch.
    pub batch_size: usize,
}

impl Default for IdentityServiceConfig {
    fn default() -> Self {
        Self {
            cache_ttl: Duration::minutes(5),
            lookup_timeout: std::time::Duration::from_millis(300),
            batch_size: 5,
        }
    }
}

/// Cache-first identity resolution over the external resolver.
///
/// Lookups are bounded in time and concurrency so a stalled resolver can
/// never block the score-mutation path.
pub struct IdentityService {
    resolver: Arc<dyn IdentityResolver>,
    cache: IdentityCache,
    config: IdentityServiceConfig,
}

impl IdentityService {
    pub fn new(
        resolver: Arc<dyn IdentityResolver>,
        clock: Arc<dyn Clock>,
        config: IdentityServiceConfig,
    ) -> Self {
        let cache = IdentityCache::new(config.cache_ttl, clock);
        Self {
            resolver,
            cache,
            config,
        }
    }

    /// Cache-first resolution. `None` when the lookup fails or times out;
    /// failed lookups are not cached.
    #[instrument(skip(self))]
    pub async fn resolve_display(&self, user_id: &str) -> Option<DisplayIdentity> {
        if let Some(hit) = self.cache.get(user_id).await {
            return Some(hit);
        }

        let lookup = self.resolver.resolve(user_id);
        match tokio::time::timeout(self.config.lookup_timeout, lookup).await {
            Ok(Ok(profile)) => {
                let identity = DisplayIdentity::Resolved {
                    user_id: user_id.to_string(),
                    display_name: profile.display_name,
                    avatar_url: profile.avatar_url,
                };
                self.cache.insert(identity.clone()).await;
                Some(identity)
            }
            Ok(Err(e)) => {
                debug!(user_id, error = %e, "Identity lookup failed");
                None
            }
            Err(_) => {
                debug!(user_id, "Identity lookup timed out");
                None
            }
        }
    }

    /// Resolution that degrades to a generated fallback identity instead of
    /// failing. Fallbacks are never cached.
    pub async fn resolve_or_fallback(&self, user_id: &str) -> DisplayIdentity {
        match self.resolve_display(user_id).await {
            Some(identity) => identity,
            None => DisplayIdentity::Fallback {
                user_id: user_id.to_string(),
                display_name: petname::Petnames::default().generate_one(2, "-"),
            },
        }
    }

    /// Resolves a batch with bounded concurrency. Users whose lookup failed
    /// are absent from the result.
    pub async fn resolve_many(&self, user_ids: &[String]) -> HashMap<String, DisplayIdentity> {
        stream::iter(user_ids.iter().cloned())
            .map(|user_id| async move {
                let resolved = self.resolve_display(&user_id).await;
                (user_id, resolved)
            })
            .buffer_unordered(self.config.batch_size.max(1))
            .filter_map(|(user_id, resolved)| async move {
                resolved.map(|identity| (user_id, identity))
            })
            .collect()
            .await
    }

    pub fn cache(&self) -> &IdentityCache {
        &self.cache
    }
}
