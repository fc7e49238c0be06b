//! Directory seams over the application's user and membership database.
//!
//! The wider platform owns users and organizations; this broker only needs
//! the narrow interface below. Everything behind these traits is an
//! asynchronous I/O boundary (network/database in production).

mod memory;

use async_trait::async_trait;
pub use memory::MemoryDirectory;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{InternalRole, LocalUser, MembershipSource, OrgMembership};

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("User not found")]
    NotFound,

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Directory unavailable: {0}")]
    Unavailable(String),
}

pub type DirectoryResult<T> = Result<T, DirectoryError>;

/// Input for creating a user record.
#[derive(Debug, Clone)]
pub struct NewLocalUser {
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    /// SSO-provisioned accounts carry no password credential.
    pub has_password: bool,
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

/// User lookup and mutation, as needed by the identity resolver.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Exact email match, case-insensitive.
    async fn find_by_email(&self, email: &str) -> DirectoryResult<Option<LocalUser>>;

    async fn get_by_id(&self, id: Uuid) -> DirectoryResult<Option<LocalUser>>;

    async fn create(&self, input: NewLocalUser) -> DirectoryResult<LocalUser>;

    /// Replace the user's metadata bag wholesale. Callers are responsible
    /// for merging; the resolver never calls this with a partial bag.
    async fn update_metadata(
        &self,
        id: Uuid,
        metadata: serde_json::Map<String, serde_json::Value>,
    ) -> DirectoryResult<LocalUser>;
}

/// Organization membership storage, as needed by the session provisioner.
///
/// These are dumb storage operations; the idempotence and no-downgrade
/// rules live in the provisioner.
#[async_trait]
pub trait MembershipDirectory: Send + Sync {
    async fn get_membership(
        &self,
        user_id: Uuid,
        tenant: &str,
    ) -> DirectoryResult<Option<OrgMembership>>;

    async fn insert_membership(&self, membership: OrgMembership) -> DirectoryResult<()>;

    async fn update_role(
        &self,
        user_id: Uuid,
        tenant: &str,
        role: InternalRole,
    ) -> DirectoryResult<()>;
}

/// Convenience constructor for JIT memberships.
impl OrgMembership {
    pub fn jit(user_id: Uuid, tenant: &str, role: InternalRole) -> Self {
        Self {
            user_id,
            tenant: tenant.to_string(),
            role,
            source: MembershipSource::Jit,
            joined_at: chrono::Utc::now(),
        }
    }
}
