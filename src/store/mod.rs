//! Connection store: the tenant-scoped local cache of SSO connections.
//!
//! The federation backend is the source of truth for connection records; the
//! store is a local cache/index used by the admin API for fast listing. All
//! operations are keyed by `(tenant, client_id)` — tenant is never optional,
//! so cross-tenant reads and writes are structurally impossible.

mod memory;

use async_trait::async_trait;
pub use memory::MemoryConnectionStore;
use thiserror::Error;

use crate::models::SsoConnection;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Connection not found")]
    NotFound,

    /// Transient infrastructure failure. Retryable by the caller; the core
    /// never retries on its own.
    #[error("Connection store unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence seam for connection records.
///
/// Implementations must scope every operation by tenant. The in-tree
/// [`MemoryConnectionStore`] serves single-node deployments and tests;
/// durable backends plug in behind this trait.
#[async_trait]
pub trait ConnectionStore: Send + Sync {
    /// Insert or replace the record for `(connection.tenant, connection.client_id)`.
    async fn put(&self, connection: SsoConnection) -> StoreResult<()>;

    /// Fetch one connection. `StoreError::NotFound` if absent.
    async fn get(&self, tenant: &str, client_id: &str) -> StoreResult<SsoConnection>;

    /// All connections for a tenant, in no particular order.
    async fn list(&self, tenant: &str) -> StoreResult<Vec<SsoConnection>>;

    /// Remove one connection. `StoreError::NotFound` if absent.
    async fn remove(&self, tenant: &str, client_id: &str) -> StoreResult<()>;
}
