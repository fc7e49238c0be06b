//! In-memory connection store.

use async_trait::async_trait;
use dashmap::DashMap;

use super::{ConnectionStore, StoreError, StoreResult};
use crate::models::SsoConnection;

/// DashMap-backed store keyed by `(tenant, client_id)`.
///
/// Suitable for single-node deployments and tests. Entries are lost on
/// restart, which is acceptable because the federation backend remains the
/// source of truth and can serve logins without the cache.
#[derive(Default)]
pub struct MemoryConnectionStore {
    connections: DashMap<(String, String), SsoConnection>,
}

impl MemoryConnectionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConnectionStore for MemoryConnectionStore {
    async fn put(&self, connection: SsoConnection) -> StoreResult<()> {
        let key = (connection.tenant.clone(), connection.client_id.clone());
        self.connections.insert(key, connection);
        Ok(())
    }

    async fn get(&self, tenant: &str, client_id: &str) -> StoreResult<SsoConnection> {
        self.connections
            .get(&(tenant.to_string(), client_id.to_string()))
            .map(|entry| entry.value().clone())
            .ok_or(StoreError::NotFound)
    }

    async fn list(&self, tenant: &str) -> StoreResult<Vec<SsoConnection>> {
        Ok(self
            .connections
            .iter()
            .filter(|entry| entry.key().0 == tenant)
            .map(|entry| entry.value().clone())
            .collect())
    }

    async fn remove(&self, tenant: &str, client_id: &str) -> StoreResult<()> {
        self.connections
            .remove(&(tenant.to_string(), client_id.to_string()))
            .map(|_| ())
            .ok_or(StoreError::NotFound)
    }
}
