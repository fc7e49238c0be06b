//! In-memory user/membership directory.

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use uuid::Uuid;

use super::{DirectoryError, DirectoryResult, MembershipDirectory, NewLocalUser, UserDirectory};
use crate::models::{InternalRole, LocalUser, OrgMembership};

/// DashMap-backed directory for single-node use and tests.
///
/// Email lookups are indexed by the lowercased address so the
/// case-insensitive contract holds without scanning.
#[derive(Default)]
pub struct MemoryDirectory {
    users: DashMap<Uuid, LocalUser>,
    by_email: DashMap<String, Uuid>,
    memberships: DashMap<(Uuid, String), OrgMembership>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserDirectory for MemoryDirectory {
    async fn find_by_email(&self, email: &str) -> DirectoryResult<Option<LocalUser>> {
        let Some(id) = self.by_email.get(&email.to_lowercase()).map(|e| *e.value()) else {
            return Ok(None);
        };
        Ok(self.users.get(&id).map(|e| e.value().clone()))
    }

    async fn get_by_id(&self, id: Uuid) -> DirectoryResult<Option<LocalUser>> {
        Ok(self.users.get(&id).map(|e| e.value().clone()))
    }

    async fn create(&self, input: NewLocalUser) -> DirectoryResult<LocalUser> {
        let email_key = input.email.to_lowercase();
        if self.by_email.contains_key(&email_key) {
            return Err(DirectoryError::Conflict(format!(
                "User with email {} already exists",
                input.email
            )));
        }

        let now = Utc::now();
        let user = LocalUser {
            id: Uuid::new_v4(),
            email: input.email,
            first_name: input.first_name,
            last_name: input.last_name,
            has_password: input.has_password,
            metadata: input.metadata,
            created_at: now,
            updated_at: now,
        };
        self.by_email.insert(email_key, user.id);
        self.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn update_metadata(
        &self,
        id: Uuid,
        metadata: serde_json::Map<String, serde_json::Value>,
    ) -> DirectoryResult<LocalUser> {
        let mut entry = self.users.get_mut(&id).ok_or(DirectoryError::NotFound)?;
        entry.metadata = metadata;
        entry.updated_at = Utc::now();
        Ok(entry.value().clone())
    }
}

#[async_trait]
impl MembershipDirectory for MemoryDirectory {
    async fn get_membership(
        &self,
        user_id: Uuid,
        tenant: &str,
    ) -> DirectoryResult<Option<OrgMembership>> {
        Ok(self
            .memberships
            .get(&(user_id, tenant.to_string()))
            .map(|e| e.value().clone()))
    }

    async fn insert_membership(&self, membership: OrgMembership) -> DirectoryResult<()> {
        let key = (membership.user_id, membership.tenant.clone());
        if self.memberships.contains_key(&key) {
            return Err(DirectoryError::Conflict(
                "Membership already exists".to_string(),
            ));
        }
        self.memberships.insert(key, membership);
        Ok(())
    }

    async fn update_role(
        &self,
        user_id: Uuid,
        tenant: &str,
        role: InternalRole,
    ) -> DirectoryResult<()> {
        let mut entry = self
            .memberships
            .get_mut(&(user_id, tenant.to_string()))
            .ok_or(DirectoryError::NotFound)?;
        entry.role = role;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(email: &str) -> NewLocalUser {
        NewLocalUser {
            email: email.to_string(),
            first_name: None,
            last_name: None,
            has_password: false,
            metadata: serde_json::Map::new(),
        }
    }

    #[tokio::test]
    async fn test_email_lookup_is_case_insensitive() {
        let dir = MemoryDirectory::new();
        let created = dir.create(new_user("Dr.House@Hospital.com")).await.unwrap();

        let found = dir.find_by_email("dr.house@hospital.com").await.unwrap();
        assert_eq!(found.map(|u| u.id), Some(created.id));
    }

    #[tokio::test]
    async fn test_duplicate_email_is_conflict() {
        let dir = MemoryDirectory::new();
        dir.create(new_user("a@hospital.com")).await.unwrap();

        let err = dir.create(new_user("A@HOSPITAL.COM")).await.unwrap_err();
        assert!(matches!(err, DirectoryError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_membership_insert_and_update_role() {
        let dir = MemoryDirectory::new();
        let user = dir.create(new_user("a@hospital.com")).await.unwrap();

        dir.insert_membership(OrgMembership::jit(user.id, "org_1", InternalRole::Member))
            .await
            .unwrap();
        dir.update_role(user.id, "org_1", InternalRole::Admin)
            .await
            .unwrap();

        let membership = dir.get_membership(user.id, "org_1").await.unwrap().unwrap();
        assert_eq!(membership.role, InternalRole::Admin);
    }
}
