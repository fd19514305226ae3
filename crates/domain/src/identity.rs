//! Caller identity resolution.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::UserId;
use tokio::sync::RwLock;

/// An authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: UserId,
    pub email: String,
}

impl Identity {
    pub fn new(user_id: UserId, email: impl Into<String>) -> Self {
        Self {
            user_id,
            email: email.into(),
        }
    }
}

/// Resolves an opaque credential to the caller it belongs to.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Returns `None` for an unknown or revoked credential.
    async fn resolve(&self, credential: &str) -> Option<Identity>;
}

/// Identity provider backed by a credential table held in memory.
#[derive(Clone, Default)]
pub struct InMemoryIdentityProvider {
    credentials: Arc<RwLock<HashMap<String, Identity>>>,
}

impl InMemoryIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, credential: impl Into<String>, identity: Identity) {
        self.credentials
            .write()
            .await
            .insert(credential.into(), identity);
    }

    pub async fn revoke(&self, credential: &str) {
        self.credentials.write().await.remove(credential);
    }
}

#[async_trait]
impl IdentityProvider for InMemoryIdentityProvider {
    async fn resolve(&self, credential: &str) -> Option<Identity> {
        self.credentials.read().await.get(credential).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn resolves_known_credentials_only() {
        let provider = InMemoryIdentityProvider::new();
        let ada = Identity::new(UserId::new("ada").unwrap(), "ada@example.com");
        provider.insert("token-ada", ada.clone()).await;

        assert_eq!(provider.resolve("token-ada").await, Some(ada));
        assert_eq!(provider.resolve("token-unknown").await, None);

        provider.revoke("token-ada").await;
        assert_eq!(provider.resolve("token-ada").await, None);
    }
}
