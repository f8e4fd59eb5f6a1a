use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// A display identity, carried with its provenance tag so readers never
/// have to sniff which fields happen to be present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DisplayIdentity {
    Resolved {
        user_id: String,
        display_name: String,
        avatar_url: Option<String>,
    },
    Fallback {
        user_id: String,
        display_name: String,
    },
}

impl DisplayIdentity {
    pub fn user_id(&self) -> &str {
        match self {
            DisplayIdentity::Resolved { user_id, .. } => user_id,
            DisplayIdentity::Fallback { user_id, .. } => user_id,
        }
    }

    pub fn display_name(&self) -> &str {
        match self {
            DisplayIdentity::Resolved { display_name, .. } => display_name,
            DisplayIdentity::Fallback { display_name, .. } => display_name,
        }
    }

    pub fn avatar_url(&self) -> Option<&str> {
        match self {
            DisplayIdentity::Resolved { avatar_url, .. } => avatar_url.as_deref(),
            DisplayIdentity::Fallback { .. } => None,
        }
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum ResolutionError {
    #[error("identity lookup failed for {user_id}: {reason}")]
    LookupFailed { user_id: String, reason: String },
}

#[derive(Debug, Clone)]
pub struct ResolvedProfile {
    pub display_name: String,
    pub avatar_url: Option<String>,
}

/// External identity-resolution collaborator: best-effort, cacheable.
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    async fn resolve(&self, user_id: &str) -> Result<ResolvedProfile, ResolutionError>;
}

/// In-memory resolver for development and testing.
pub struct StaticIdentityResolver {
    profiles: RwLock<HashMap<String, ResolvedProfile>>,
}

impl Default for StaticIdentityResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl StaticIdentityResolver {
    pub fn new() -> Self {
        Self {
            profiles: RwLock::new(HashMap::new()),
        }
    }

    pub fn with_profiles(profiles: Vec<(String, ResolvedProfile)>) -> Self {
        Self {
            profiles: RwLock::new(profiles.into_iter().collect()),
        }
    }

    pub async fn insert(&self, user_id: &str, profile: ResolvedProfile) {
        let mut profiles = self.profiles.write().await;
        profiles.insert(user_id.to_string(), profile);
    }
}

#[async_trait]
impl IdentityResolver for StaticIdentityResolver {
    async fn resolve(&self, user_id: &str) -> Result<ResolvedProfile, ResolutionError> {
        let profiles = self.profiles.read().await;
        profiles
            .get(user_id)
            .cloned()
            .ok_or_else(|| ResolutionError::LookupFailed {
                user_id: user_id.to_string(),
                reason: "unknown user".to_string(),
            })
    }
}
