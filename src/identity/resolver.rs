//! Identity resolver: validated SSO profile → durable local user.
//!
//! Resolution is keyed on the email address (exact, case-insensitive): the
//! email is the only identifier shared between the IdP and the local user
//! database. Existing users get their SSO metadata refreshed; unknown users
//! are created password-less with `created_via_sso`.

use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use uuid::Uuid;

use crate::{
    directory::{DirectoryError, NewLocalUser, UserDirectory},
    models::{InternalRole, SsoAttributes, SsoProfile},
};

#[derive(Debug, Error)]
pub enum ResolverError {
    /// The user store rejected the create/update. Fatal for the login
    /// attempt: no session is issued on top of a half-provisioned user.
    #[error("User provisioning failed: {0}")]
    ProvisioningFailed(String),
}

impl From<DirectoryError> for ResolverError {
    fn from(e: DirectoryError) -> Self {
        ResolverError::ProvisioningFailed(e.to_string())
    }
}

/// Map external role strings onto the internal role enum.
///
/// Case-insensitive lookup against a fixed table; the first input role with
/// a mapping wins, so the outcome is input-order-dependent. Unmapped or
/// empty input yields `Member` — ambiguity never escalates privilege.
pub fn map_roles_to_internal(roles: &[String]) -> InternalRole {
    for role in roles {
        match role.to_lowercase().as_str() {
            "owner" => return InternalRole::Owner,
            "admin" | "administrator" | "manager" => return InternalRole::Admin,
            "user" | "member" => return InternalRole::Member,
            _ => continue,
        }
    }
    InternalRole::Member
}

/// Resolves SSO profiles to local user records.
pub struct IdentityResolver {
    directory: Arc<dyn UserDirectory>,
}

impl IdentityResolver {
    pub fn new(directory: Arc<dyn UserDirectory>) -> Self {
        Self { directory }
    }

    /// Find-or-create the local user for a validated profile.
    ///
    /// Returns the durable user id. Idempotent per email: repeated logins
    /// with the same address resolve to the same record.
    #[tracing::instrument(skip(self, profile), fields(email = %profile.email))]
    pub async fn resolve_or_create_user(
        &self,
        profile: &SsoProfile,
        provider: &str,
    ) -> Result<Uuid, ResolverError> {
        match self.directory.find_by_email(&profile.email).await? {
            Some(user) => self.refresh_existing(user.id, user.metadata, profile, provider).await,
            None => match self.create_sso_user(profile, provider).await {
                Ok(id) => Ok(id),
                // Lost a race against a concurrent first login for the same
                // email; the winner's record is the one to update.
                Err(DirectoryError::Conflict(_)) => {
                    let user = self
                        .directory
                        .find_by_email(&profile.email)
                        .await?
                        .ok_or_else(|| {
                            ResolverError::ProvisioningFailed(
                                "User vanished after creation conflict".to_string(),
                            )
                        })?;
                    self.refresh_existing(user.id, user.metadata, profile, provider)
                        .await
                }
                Err(e) => Err(e.into()),
            },
        }
    }

    /// Refresh SSO metadata on an existing user without touching any
    /// unrelated metadata keys.
    async fn refresh_existing(
        &self,
        user_id: Uuid,
        mut metadata: serde_json::Map<String, serde_json::Value>,
        profile: &SsoProfile,
        provider: &str,
    ) -> Result<Uuid, ResolverError> {
        sso_attributes(profile, provider, false).merge_into(&mut metadata);
        merge_raw_claims(&mut metadata, profile);

        self.directory.update_metadata(user_id, metadata).await?;
        tracing::debug!(user_id = %user_id, "Refreshed SSO metadata for existing user");
        Ok(user_id)
    }

    async fn create_sso_user(
        &self,
        profile: &SsoProfile,
        provider: &str,
    ) -> Result<Uuid, DirectoryError> {
        let mut metadata = serde_json::Map::new();
        sso_attributes(profile, provider, true).merge_into(&mut metadata);
        merge_raw_claims(&mut metadata, profile);

        let user = self
            .directory
            .create(NewLocalUser {
                email: profile.email.clone(),
                first_name: profile.first_name.clone(),
                last_name: profile.last_name.clone(),
                // SSO-only account: no password credential exists
                has_password: false,
                metadata,
            })
            .await?;

        tracing::info!(user_id = %user.id, "Created SSO-provisioned user");
        Ok(user.id)
    }
}

fn sso_attributes(profile: &SsoProfile, provider: &str, created: bool) -> SsoAttributes {
    SsoAttributes {
        sso_provider: Some(provider.to_string()),
        sso_user_id: Some(profile.id.clone()),
        sso_roles: Some(profile.roles.clone()),
        sso_groups: Some(profile.groups.clone()),
        last_sso_login: Some(Utc::now()),
        created_via_sso: created.then_some(true),
    }
}

/// Keep the provider's full claim set for audit under a single key, so it
/// can never collide with application-owned metadata.
fn merge_raw_claims(
    metadata: &mut serde_json::Map<String, serde_json::Value>,
    profile: &SsoProfile,
) {
    if !profile.raw.is_empty() {
        metadata.insert(
            "sso_claims".to_string(),
            serde_json::Value::Object(profile.raw.clone()),
        );
    }
}
