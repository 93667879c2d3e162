//! Caller identity resolution.
//!
//! Identity management itself is an external collaborator; the core
//! only needs a verified tenant id (or none, for public booking
//! links).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct CallerIdentity {
    pub id: Uuid,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Resolves a bearer token to a verified caller, or `None` for
    /// anonymous/public access.
    async fn caller_identity(&self, token: &str) -> Option<CallerIdentity>;
}

/// Token-to-tenant map standing in for the hosted identity provider.
/// Used by the dev server and tests.
#[derive(Default)]
pub struct StaticTokenProvider {
    tokens: RwLock<HashMap<String, Uuid>>,
}

impl StaticTokenProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(&self, token: &str, tenant_id: Uuid) {
        self.tokens.write().await.insert(token.to_string(), tenant_id);
    }
}

#[async_trait]
impl IdentityProvider for StaticTokenProvider {
    async fn caller_identity(&self, token: &str) -> Option<CallerIdentity> {
        self.tokens
            .read()
            .await
            .get(token)
            .map(|id| CallerIdentity { id: *id })
    }
}
